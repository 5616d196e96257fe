//! Error and Result types.

use std::fmt::{self, Debug, Display, Formatter};
use std::io;

/// A specialized `Result` type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All the ways a connection engine operation can fail.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Error communicating with the server.
    #[error("error communicating with the server: {0}")]
    Io(#[from] io::Error),

    /// Unexpected or invalid data was received from the server. This
    /// indicates either a driver bug or a corrupted connection; the
    /// connection is closed when this is raised by the decode path.
    #[error("encountered unexpected or invalid data: {0}")]
    Protocol(Box<str>),

    /// An error packet (`0xFF`) was returned by the server. Terminates the
    /// current exchange only; the connection remains usable.
    #[error("error returned from the server: {0}")]
    Database(Box<MySqlDatabaseError>),

    /// An exchange was submitted to a client that is closing or closed.
    #[error("cannot exchange on a closed connection")]
    ExchangeClosed,

    /// The server closed the connection while a command was outstanding.
    #[error("connection unexpectedly closed by the server")]
    UnexpectedClosed,

    /// The server closed the connection after we sent `COM_QUIT`.
    #[error("connection closed after quit")]
    ExpectedClosed,

    /// TLS upgrade failed, or TLS was required and the server does not
    /// support it.
    #[error("error during TLS negotiation: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server rejected our authentication response.
    #[error("authentication failed: {0}")]
    AuthFailed(Box<str>),

    /// The outbound buffer limit was exceeded while emitting a request.
    #[error("outbound buffer overflow while writing a request")]
    BackpressureOverflow,

    /// A graceful close did not complete within the configured window.
    #[error("operation timed out")]
    Timeout,
}

impl Error {
    pub(crate) fn tls<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Tls(err.into())
    }

    /// Whether this error is fatal to the connection (as opposed to
    /// terminating only the current exchange).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Database(_) | Error::BackpressureOverflow)
    }

    /// An equivalent error for fanning one failure out to several
    /// waiting exchanges.
    pub(crate) fn duplicate(&self) -> Error {
        match self {
            Error::Io(err) => Error::Io(io::Error::new(err.kind(), err.to_string())),
            Error::Protocol(msg) => Error::Protocol(msg.clone()),
            Error::Database(err) => Error::Database(Box::new(MySqlDatabaseError {
                error_code: err.error_code,
                sql_state: err.sql_state.clone(),
                message: err.message.clone(),
            })),
            Error::ExchangeClosed => Error::ExchangeClosed,
            Error::UnexpectedClosed => Error::UnexpectedClosed,
            Error::ExpectedClosed => Error::ExpectedClosed,
            Error::Tls(err) => Error::Tls(err.to_string().into()),
            Error::AuthFailed(msg) => Error::AuthFailed(msg.clone()),
            Error::BackpressureOverflow => Error::BackpressureOverflow,
            Error::Timeout => Error::Timeout,
        }
    }
}

/// An error returned from the server as an ERR packet.
///
/// Carries the vendor error code and the five-character SQLSTATE in
/// addition to the human-readable message.
pub struct MySqlDatabaseError {
    pub(crate) error_code: u16,
    pub(crate) sql_state: Option<Box<str>>,
    pub(crate) message: Box<str>,
}

impl MySqlDatabaseError {
    /// The primary, human-readable error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The vendor-specific error code.
    pub fn code(&self) -> u16 {
        self.error_code
    }

    /// The SQLSTATE associated with this error, if the server sent one.
    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }
}

impl Debug for MySqlDatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlDatabaseError")
            .field("code", &self.error_code)
            .field("sql_state", &self.sql_state)
            .field("message", &self.message)
            .finish()
    }
}

impl Display for MySqlDatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.sql_state {
            Some(state) => write!(f, "{} ({}): {}", self.error_code, state, self.message),
            None => write!(f, "{}: {}", self.error_code, self.message),
        }
    }
}

impl From<MySqlDatabaseError> for Error {
    fn from(err: MySqlDatabaseError) -> Self {
        Error::Database(Box::new(err))
    }
}

macro_rules! err_protocol {
    ($($args:tt)*) => {
        $crate::error::Error::Protocol(format!($($args)*).into_boxed_str())
    };
}
