use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::Error;
use crate::net::BoxSocket;
use crate::protocol::envelope::{write_envelopes, EnvelopeSlicer, LogicalPacket, MAX_ENVELOPE_SIZE};
use crate::protocol::{Capabilities, Encode};

/// The framed byte pipe under one connection.
///
/// Owns the transport, the inbound envelope slicer, the buffered
/// outbound frame buffer, and the packet sequence counter shared by both
/// directions of a request/response cycle.
pub(crate) struct MySqlStream {
    // Only vacant for the instant the TLS upgrade swaps transports
    socket: Option<BoxSocket>,
    slicer: EnvelopeSlicer,

    // Outbound envelopes accumulate here until flushed
    wbuf: Vec<u8>,
    write_buffer_limit: usize,

    // Next sequence id; reset to 0 at each exchange boundary and kept in
    // step with inbound envelopes otherwise
    seq: u8,

    pub(crate) capabilities: Capabilities,
}

impl MySqlStream {
    pub(crate) fn new(socket: BoxSocket, write_buffer_limit: usize) -> Self {
        Self {
            socket: Some(socket),
            slicer: EnvelopeSlicer::new(),
            wbuf: Vec::with_capacity(1024),
            write_buffer_limit,
            seq: 0,
            capabilities: Capabilities::empty(),
        }
    }

    fn socket_mut(&mut self) -> &mut BoxSocket {
        self.socket.as_mut().expect("transport detached")
    }

    /// Starts a new client-initiated exchange: sequence ids restart at 0.
    pub(crate) fn reset_sequence(&mut self) {
        self.seq = 0;
        self.slicer.reset_sequence();
    }

    /// Encodes a message and frames it into the outbound buffer,
    /// splitting payloads of 16 MiB or more across envelopes.
    ///
    /// Fails fast with a backpressure error when the buffered bytes
    /// would pass the configured limit; nothing of the message reaches
    /// the buffer in that case, so the wire stays consistent.
    pub(crate) fn write_message<T>(&mut self, message: &T) -> Result<(), Error>
    where
        T: Encode,
    {
        let mut payload = Vec::new();
        message.encode(&mut payload, self.capabilities);

        let framed = payload.len() + 4 * (payload.len() / MAX_ENVELOPE_SIZE + 1);
        if self.wbuf.len() + framed > self.write_buffer_limit {
            return Err(Error::BackpressureOverflow);
        }

        write_envelopes(&mut self.wbuf, &payload, &mut self.seq);

        // ids we consumed are ids the server's reply continues from
        self.slicer.set_expected_seq(self.seq);

        Ok(())
    }

    pub(crate) async fn flush(&mut self) -> Result<(), Error> {
        if self.wbuf.is_empty() {
            return Ok(());
        }

        let wbuf = std::mem::take(&mut self.wbuf);
        let socket = self.socket_mut();

        socket.write_all(&wbuf).await?;
        socket.flush().await?;

        self.wbuf = wbuf;
        self.wbuf.clear();

        Ok(())
    }

    /// Receives the next logical packet, reassembling continuation
    /// envelopes. Returns `None` when the peer half-closed at an
    /// envelope boundary; a close mid-envelope is a hard error.
    pub(crate) async fn recv_packet(&mut self) -> Result<Option<LogicalPacket>, Error> {
        loop {
            if let Some(packet) = self.slicer.next_packet()? {
                // our next write answers this packet
                self.seq = packet.seq.wrapping_add(1);
                return Ok(Some(packet));
            }

            let socket = self.socket.as_mut().expect("transport detached");
            let read = socket.read_buf(self.slicer.buffer_mut()).await?;

            if read == 0 {
                if self.slicer.buffer_mut().is_empty() {
                    return Ok(None);
                }

                return Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
            }
        }
    }

    /// Receives a packet, treating a close as an error. Used in the
    /// connection phase where the peer must answer.
    pub(crate) async fn expect_packet(&mut self) -> Result<LogicalPacket, Error> {
        self.recv_packet().await?.ok_or(Error::UnexpectedClosed)
    }

    /// Detaches the transport so the TLS upgrade can wrap it;
    /// [`attach_socket`](Self::attach_socket) must follow before any
    /// further I/O.
    #[cfg(feature = "tls")]
    pub(crate) fn detach_socket(&mut self) -> BoxSocket {
        self.socket.take().expect("transport detached")
    }

    #[cfg(feature = "tls")]
    pub(crate) fn attach_socket(&mut self, socket: BoxSocket) {
        self.socket = Some(socket);
    }

    pub(crate) async fn shutdown(&mut self) {
        if let Some(socket) = self.socket.as_mut() {
            let _ = socket.shutdown().await;
        }
    }
}
