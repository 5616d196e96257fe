use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Notify};

use crate::error::Error;
use crate::net::BoxSocket;
use crate::options::{ConnectOptions, SslMode};
use crate::protocol::server::ServerMessage;
use crate::protocol::text::{ComQuit, LocalInfileData};
use crate::protocol::ClientMessage;

mod auth;
mod codec;
mod context;
mod establish;
mod exchange;
mod queue;
mod stream;

#[cfg(feature = "tls")]
mod tls;

pub use context::ServerVersion;
pub use exchange::{ExchangeHandler, ExchangeStream, Exchangeable, HandlerSignal};

use codec::DuplexCodec;
use context::{ConnectionContext, Lifecycle};
use exchange::OnceExchange;
use queue::{Request, RequestQueue, RequestTask};
use stream::MySqlStream;

// max_packet_size announced in the handshake response; one envelope
const MAX_PACKET_SIZE: u32 = 16_777_215;

/// A handle to one MySQL connection.
///
/// The handle is cheap to clone and may be used from any task; all wire
/// activity runs on a single I/O task that owns the socket, the
/// pipeline, and the per-connection state. Concurrent exchanges are
/// serialised in submission order by the request queue.
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

/// State reachable from both the caller side and the I/O task.
pub(crate) struct Shared {
    pub(crate) queue: RequestQueue,

    // Single-writer flag: a close (graceful or forced) has begun; new
    // exchanges are refused
    closing: AtomicBool,

    // Hard-cancel signal for the I/O task
    force_closing: AtomicBool,
    force_close: Notify,

    connected: AtomicBool,
    closed: watch::Receiver<bool>,

    ssl_unsupported: bool,
    connection_id: u32,
    server_version: ServerVersion,
    close_timeout: Duration,
}

impl Shared {
    /// Whether new exchanges may be admitted.
    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.closing.load(Ordering::SeqCst)
    }

    // Resolves when a force close is requested; the permit is sticky so
    // a signal sent before anyone listens is not lost
    async fn cancelled(&self) {
        loop {
            if self.force_closing.load(Ordering::SeqCst) {
                return;
            }

            self.force_close.notified().await;
        }
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("connection_id", &self.shared.connection_id)
            .field("server_version", &self.shared.server_version)
            .finish()
    }
}

impl Client {
    /// Opens a TCP connection and drives the handshake to completion.
    /// Resolution of the returned future is the login-success signal;
    /// the connection is then in the command phase.
    pub async fn connect(options: &ConnectOptions) -> Result<Client, Error> {
        let socket = TcpStream::connect((options.host.as_str(), options.port)).await?;
        socket.set_nodelay(true)?;

        Self::establish(Box::new(socket), options).await
    }

    /// Drives the handshake over an already-connected transport.
    ///
    /// This is the seam the connection engine exposes to alternative
    /// transports (and to tests, which hand it an in-memory duplex).
    pub async fn establish(socket: BoxSocket, options: &ConnectOptions) -> Result<Client, Error> {
        let mut stream = MySqlStream::new(socket, options.write_buffer_limit);
        let mut codec = DuplexCodec::new();
        let mut context = ConnectionContext::new(options.collation);

        let ssl_active =
            establish::establish(&mut stream, &mut codec, &mut context, options).await?;

        let ssl_unsupported = options.ssl_mode == SslMode::Preferred && !ssl_active;

        let (closed_tx, closed_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            queue: RequestQueue::new(),
            closing: AtomicBool::new(false),
            force_closing: AtomicBool::new(false),
            force_close: Notify::new(),
            connected: AtomicBool::new(true),
            closed: closed_rx,
            ssl_unsupported,
            connection_id: context.connection_id,
            server_version: context.server_version,
            close_timeout: options.close_timeout,
        });

        let worker = Worker {
            stream,
            codec,
            context,
            shared: Arc::clone(&shared),
            closed_tx,
        };

        tokio::spawn(worker.run());

        Ok(Client { shared })
    }

    /// Submits a request and returns the lazy sequence of items its
    /// handler produces. Nothing touches the wire until first poll; a
    /// closing or closed client fails the exchange with
    /// [`Error::ExchangeClosed`].
    pub fn exchange<H>(&self, request: ClientMessage, handler: H) -> ExchangeStream<H>
    where
        H: ExchangeHandler,
    {
        ExchangeStream::new(
            Arc::clone(&self.shared),
            Request::Message(request),
            handler,
        )
    }

    /// Submits a bidirectional exchange: the [`Exchangeable`] produces
    /// outbound requests over the exchange's lifetime (execute/fetch
    /// streaming, local-infile replies) while the handler consumes the
    /// merged response stream.
    pub fn exchange_flow<E, H>(&self, flow: E, handler: H) -> ExchangeStream<H>
    where
        E: Exchangeable,
        H: ExchangeHandler,
    {
        ExchangeStream::new(
            Arc::clone(&self.shared),
            Request::Flow(Box::new(flow)),
            handler,
        )
    }

    /// Closes gracefully: refuses new exchanges, enqueues `COM_QUIT`
    /// behind whatever is in flight, and waits for the engine to wind
    /// down. Falls back to [`force_close`](Self::force_close) when that
    /// does not complete within the configured window.
    pub async fn close(&self) -> Result<(), Error> {
        let already_closing = self.shared.closing.swap(true, Ordering::SeqCst);

        if !already_closing && self.shared.connected.load(Ordering::SeqCst) {
            // Privileged submission: the admission gate is already shut
            let (tx, _rx) = mpsc::unbounded_channel();
            self.shared.queue.submit(RequestTask {
                request: Request::Message(ClientMessage::Quit(ComQuit)),
                tx,
            });
        }

        let done = tokio::time::timeout(self.shared.close_timeout, self.wait_closed()).await;

        if done.is_err() {
            tracing::warn!("graceful close timed out; forcing");
            return self.force_close().await;
        }

        Ok(())
    }

    /// Closes the transport immediately without sending anything.
    /// In-flight and queued exchanges fail with
    /// [`Error::ExchangeClosed`].
    pub async fn force_close(&self) -> Result<(), Error> {
        self.shared.closing.store(true, Ordering::SeqCst);
        self.shared.force_closing.store(true, Ordering::SeqCst);
        self.shared.force_close.notify_one();

        self.wait_closed().await;

        Ok(())
    }

    async fn wait_closed(&self) {
        let mut closed = self.shared.closed.clone();

        while !*closed.borrow() {
            if closed.changed().await.is_err() {
                return;
            }
        }
    }

    /// Whether the connection is open and admitting exchanges.
    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// Whether TLS was preferred but the server turned out not to
    /// support it and the connection continued in cleartext.
    pub fn ssl_unsupported(&self) -> bool {
        self.shared.ssl_unsupported
    }

    /// The connection id assigned by the server in its greeting.
    pub fn connection_id(&self) -> u32 {
        self.shared.connection_id
    }

    /// The server version from the greeting.
    pub fn server_version(&self) -> ServerVersion {
        self.shared.server_version
    }
}

/// The I/O task: owns the stream, the codec, and the connection
/// context; serves one exchange at a time off the queue.
struct Worker {
    stream: MySqlStream,
    codec: DuplexCodec,
    context: ConnectionContext,
    shared: Arc<Shared>,
    closed_tx: watch::Sender<bool>,
}

impl Worker {
    async fn run(mut self) {
        let (reason, in_flight) = self.command_loop().await;

        self.context.transition(Lifecycle::Disconnecting);

        self.shared.closing.store(true, Ordering::SeqCst);
        self.shared.connected.store(false, Ordering::SeqCst);

        // Queue first, then the in-flight stream, so handlers observe
        // exactly one terminal signal after the queue stops admitting
        self.shared.queue.dispose(&Error::ExchangeClosed);

        if let Some(tx) = in_flight {
            let _ = tx.send(Err(reason.duplicate()));
        }

        self.stream.shutdown().await;
        self.context.transition(Lifecycle::Closed);

        match reason {
            Error::ExpectedClosed => tracing::debug!("connection closed"),
            reason => tracing::debug!(%reason, "connection closed"),
        }

        let _ = self.closed_tx.send(true);
    }

    /// Serves exchanges until the connection dies; returns the drain
    /// error and, if an exchange was in flight, its delivery channel.
    async fn command_loop(
        &mut self,
    ) -> (
        Error,
        Option<mpsc::UnboundedSender<Result<ServerMessage, Error>>>,
    ) {
        loop {
            let shared = Arc::clone(&self.shared);

            let task = tokio::select! {
                _ = shared.cancelled() => return (Error::ExchangeClosed, None),

                task = shared.queue.next() => match task {
                    Some(task) => task,
                    None => return (Error::ExchangeClosed, None),
                },
            };

            let RequestTask { request, tx } = task;
            let is_quit = matches!(&request, Request::Message(ClientMessage::Quit(_)));

            let served = tokio::select! {
                _ = shared.cancelled() => Err(Error::ExchangeClosed),

                served = Self::serve(
                    &mut self.stream,
                    &mut self.codec,
                    &mut self.context,
                    request,
                    &tx,
                ) => served,
            };

            match served {
                Ok(()) => {
                    drop(tx);

                    if is_quit {
                        return (Error::ExpectedClosed, None);
                    }

                    self.shared.queue.run();
                }

                // Exchange-local failure at a clean wire boundary; the
                // connection stays healthy
                Err(error) if !error.is_fatal() => {
                    let _ = tx.send(Err(error));
                    drop(tx);

                    self.shared.queue.run();
                }

                Err(error) => {
                    let reason = match error {
                        Error::UnexpectedClosed => self.close_reason(),

                        Error::Io(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                            self.close_reason()
                        }

                        other => other,
                    };

                    return (reason, Some(tx));
                }
            }
        }
    }

    // Classify a transport close by who initiated it
    fn close_reason(&self) -> Error {
        if self.shared.closing.load(Ordering::SeqCst) {
            Error::ExpectedClosed
        } else {
            Error::UnexpectedClosed
        }
    }

    /// Serves one exchange: emit requests, decode and deliver the
    /// response stream, continue to drain after cancellation, and stop
    /// at the terminator.
    async fn serve(
        stream: &mut MySqlStream,
        codec: &mut DuplexCodec,
        context: &mut ConnectionContext,
        request: Request,
        tx: &mpsc::UnboundedSender<Result<ServerMessage, Error>>,
    ) -> Result<(), Error> {
        // A new client-initiated exchange restarts sequence ids
        stream.reset_sequence();

        let mut flow: Box<dyn Exchangeable> = match request {
            Request::Message(message) => Box::new(OnceExchange::new(message)),
            Request::Flow(flow) => flow,
        };

        while let Some(message) = flow.next_request() {
            let expects_response = message.expects_response();

            codec.observe_request(&message);
            stream.write_message(&message)?;
            stream.flush().await?;

            if !expects_response {
                continue;
            }

            loop {
                let packet = stream
                    .recv_packet()
                    .await?
                    .ok_or(Error::UnexpectedClosed)?;

                let decoded = codec.decode(packet)?;
                let done = decoded.completes_exchange;

                // Server status rides on every OK and EOF
                match &decoded.message {
                    ServerMessage::Ok(ok) => context.status = ok.status,
                    ServerMessage::Eof(eof) => context.status = eof.status,
                    _ => {}
                }

                let needs_infile_reply =
                    matches!(decoded.message, ServerMessage::LocalInfileRequest(_));

                let replies = flow.on_message(&decoded.message);

                if tx.send(Ok(decoded.message)).is_err() {
                    // Cancelled: delivery is severed, but the wire is
                    // drained to the terminator so the next exchange
                    // starts on a clean boundary
                    tracing::trace!("exchange cancelled; draining");
                }

                if needs_infile_reply && replies.is_empty() {
                    // Nothing will stream the file: decline with the
                    // empty terminator so the server can answer
                    Self::reply(stream, &ClientMessage::LocalInfileData(LocalInfileData {
                        data: Bytes::new(),
                    }))?;
                    stream.flush().await?;
                } else {
                    for message in &replies {
                        Self::reply(stream, message)?;
                    }

                    if !replies.is_empty() {
                        stream.flush().await?;
                    }
                }

                if done {
                    break;
                }
            }
        }

        Ok(())
    }

    // Mid-cycle writes cannot fail softly: a partial conversation would
    // desynchronise the stream
    fn reply(stream: &mut MySqlStream, message: &ClientMessage) -> Result<(), Error> {
        stream.write_message(message).map_err(|error| match error {
            Error::BackpressureOverflow => {
                err_protocol!("outbound buffer overflow mid-exchange")
            }

            other => other,
        })
    }
}
