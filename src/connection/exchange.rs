use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::mpsc;

use crate::connection::queue::{Request, RequestTask};
use crate::connection::Shared;
use crate::error::Error;
use crate::protocol::server::ServerMessage;
use crate::protocol::ClientMessage;

/// A stateful translator from server messages to caller items.
///
/// The handler sees every message of one exchange in wire order and
/// pushes zero or more items per message; returning
/// [`HandlerSignal::Complete`] ends the caller-visible sequence early
/// (the engine still drains the remaining wire messages internally).
pub trait ExchangeHandler: Send {
    type Output: Send;

    fn on_message(
        &mut self,
        message: ServerMessage,
        out: &mut Vec<Self::Output>,
    ) -> Result<HandlerSignal, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerSignal {
    /// Keep delivering messages.
    Continue,

    /// The handler saw its terminal message; end the output sequence.
    Complete,
}

/// A bidirectional exchange contract: produces outbound client messages
/// over the lifetime of the exchange and observes the server messages
/// that come back.
///
/// Used for conversations that are not one-request-one-response, such as
/// execute/fetch streaming over a statement cursor or answering a
/// `LOCAL INFILE` request with file content.
pub trait Exchangeable: Send + 'static {
    /// The next top-level request. Called at activation and again after
    /// each response cycle terminates; `None` completes the exchange.
    fn next_request(&mut self) -> Option<ClientMessage>;

    /// Observes one server message mid-cycle, optionally producing
    /// immediate replies (for example file-content chunks answering a
    /// local-infile request). Replies must not expect their own
    /// response cycle.
    fn on_message(&mut self, message: &ServerMessage) -> Vec<ClientMessage> {
        let _ = message;
        Vec::new()
    }
}

/// A single-message exchangeable; what [`Client::exchange`] wraps a
/// plain request into.
///
/// [`Client::exchange`]: crate::Client::exchange
pub(crate) struct OnceExchange {
    request: Option<ClientMessage>,
}

impl OnceExchange {
    pub(crate) fn new(request: ClientMessage) -> Self {
        Self {
            request: Some(request),
        }
    }
}

impl Exchangeable for OnceExchange {
    fn next_request(&mut self) -> Option<ClientMessage> {
        self.request.take()
    }
}

/// A lazy sequence of handler outputs for one exchange.
///
/// Nothing is submitted until first poll; cancellation is dropping the
/// stream, which severs delivery immediately while the engine drains
/// the response to its terminator and releases the queue slot.
pub struct ExchangeStream<H>
where
    H: ExchangeHandler,
{
    state: State,
    handler: H,
    ready: VecDeque<H::Output>,
    done: bool,
}

enum State {
    Pending {
        shared: Arc<Shared>,
        request: Option<Request>,
    },

    Active {
        rx: mpsc::UnboundedReceiver<Result<ServerMessage, Error>>,
    },

    // Dropping the receiver severs delivery; the engine drains the rest
    Finished,
}

impl<H> ExchangeStream<H>
where
    H: ExchangeHandler,
{
    pub(crate) fn new(shared: Arc<Shared>, request: Request, handler: H) -> Self {
        Self {
            state: State::Pending {
                shared,
                request: Some(request),
            },
            handler,
            ready: VecDeque::new(),
            done: false,
        }
    }
}

impl<H> Stream for ExchangeStream<H>
where
    H: ExchangeHandler + Unpin,
    H::Output: Unpin,
{
    type Item = Result<H::Output, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(item) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            if this.done {
                return Poll::Ready(None);
            }

            match &mut this.state {
                State::Pending { shared, request } => {
                    let request = request.take().expect("exchange submitted twice");

                    // Admission gate: a closing or closed client fails
                    // the exchange deterministically, disposing any
                    // buffers the request owns
                    if !shared.is_connected() {
                        if request.is_disposable() {
                            tracing::trace!("releasing buffers owned by an unadmitted request");
                        }

                        drop(request);
                        this.done = true;
                        this.state = State::Finished;

                        return Poll::Ready(Some(Err(Error::ExchangeClosed)));
                    }

                    let (tx, rx) = mpsc::unbounded_channel();
                    shared.queue.submit(RequestTask { request, tx });

                    this.state = State::Active { rx };
                }

                State::Active { rx } => match rx.poll_recv(cx) {
                    Poll::Pending => return Poll::Pending,

                    // Channel closed by the engine: the exchange
                    // terminated without the handler signalling; the
                    // sequence simply ends
                    Poll::Ready(None) => {
                        this.done = true;
                        this.state = State::Finished;
                    }

                    Poll::Ready(Some(Err(error))) => {
                        this.done = true;
                        this.state = State::Finished;

                        return Poll::Ready(Some(Err(error)));
                    }

                    Poll::Ready(Some(Ok(message))) => {
                        let mut produced = Vec::new();

                        match this.handler.on_message(message, &mut produced) {
                            Ok(HandlerSignal::Continue) => {
                                this.ready.extend(produced);
                            }

                            Ok(HandlerSignal::Complete) => {
                                this.ready.extend(produced);
                                this.done = true;
                                this.state = State::Finished;
                            }

                            Err(error) => {
                                this.done = true;
                                this.state = State::Finished;

                                return Poll::Ready(Some(Err(error)));
                            }
                        }
                    }
                },

                State::Finished => {
                    this.done = true;

                    return Poll::Ready(None);
                }
            }
        }
    }
}
