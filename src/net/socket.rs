use tokio::io::{AsyncRead, AsyncWrite};

/// A byte-oriented full-duplex transport the engine can drive.
///
/// Implemented for anything that is readable, writable, and sendable to
/// the I/O task; in production this is a `TcpStream` (optionally wrapped
/// in TLS mid-handshake), in tests an in-memory duplex pipe.
pub trait Socket: AsyncRead + AsyncWrite + Send + Unpin {}

impl<S> Socket for S where S: AsyncRead + AsyncWrite + Send + Unpin {}

pub type BoxSocket = Box<dyn Socket>;
