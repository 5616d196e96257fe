use crate::protocol::connect::HandshakeResponse;
use crate::protocol::statement::{ComStmtClose, ComStmtExecute, ComStmtFetch, ComStmtPrepare};
use crate::protocol::text::{
    ComChangeUser, ComInitDb, ComPing, ComQuery, ComQuit, ComResetConnection, LocalInfileData,
};
use crate::protocol::{Capabilities, Encode};

/// A client-to-server message.
///
/// Every variant serialises itself into one or more envelopes through
/// [`Encode`]; the stream applies framing and sequence ids.
#[derive(Debug)]
pub enum ClientMessage {
    /// The full handshake response (connection phase).
    HandshakeResponse(HandshakeResponse),

    /// A raw authentication payload continuing a plugin round-trip.
    AuthContinue(Vec<u8>),

    /// A text-protocol query.
    Query(ComQuery),

    /// Prepare a statement.
    Prepare(ComStmtPrepare),

    /// Execute a prepared statement.
    Execute(ComStmtExecute),

    /// Fetch rows from a statement cursor.
    Fetch(ComStmtFetch),

    /// Deallocate a prepared statement (no server reply).
    StmtClose(ComStmtClose),

    /// Reset session state.
    ResetConnection(ComResetConnection),

    /// Re-authenticate as a different user.
    ChangeUser(ComChangeUser),

    /// Select a default schema.
    InitDb(ComInitDb),

    /// Liveness check.
    Ping(ComPing),

    /// Graceful exit (the server answers by closing the connection).
    Quit(ComQuit),

    /// A chunk of file content answering a `LOCAL INFILE` request.
    LocalInfileData(LocalInfileData),
}

impl ClientMessage {
    pub fn query(sql: impl Into<Box<str>>) -> Self {
        ClientMessage::Query(ComQuery { query: sql.into() })
    }

    pub fn prepare(sql: impl Into<Box<str>>) -> Self {
        ClientMessage::Prepare(ComStmtPrepare { query: sql.into() })
    }

    pub fn ping() -> Self {
        ClientMessage::Ping(ComPing)
    }

    /// Whether the server answers this message at all. `COM_QUIT` is
    /// answered by a close, and `COM_STMT_CLOSE` by silence; exchanges
    /// carrying them complete as soon as the bytes are flushed.
    pub(crate) fn expects_response(&self) -> bool {
        !matches!(
            self,
            ClientMessage::Quit(_) | ClientMessage::StmtClose(_) | ClientMessage::LocalInfileData(_)
        )
    }

    /// Whether this message owns payload buffers that must be released
    /// if it is disposed before reaching the wire.
    pub fn is_disposable(&self) -> bool {
        matches!(
            self,
            ClientMessage::Execute(_)
                | ClientMessage::LocalInfileData(_)
                | ClientMessage::AuthContinue(_)
        )
    }

    /// Whether the decoder should frame result rows with the binary
    /// protocol after this message.
    pub(crate) fn is_binary(&self) -> bool {
        matches!(self, ClientMessage::Execute(_) | ClientMessage::Fetch(_))
    }
}

impl Encode for ClientMessage {
    fn encode(&self, buf: &mut Vec<u8>, capabilities: Capabilities) {
        match self {
            ClientMessage::HandshakeResponse(m) => m.encode(buf, capabilities),
            ClientMessage::AuthContinue(payload) => buf.extend_from_slice(payload),
            ClientMessage::Query(m) => m.encode(buf, capabilities),
            ClientMessage::Prepare(m) => m.encode(buf, capabilities),
            ClientMessage::Execute(m) => m.encode(buf, capabilities),
            ClientMessage::Fetch(m) => m.encode(buf, capabilities),
            ClientMessage::StmtClose(m) => m.encode(buf, capabilities),
            ClientMessage::ResetConnection(m) => m.encode(buf, capabilities),
            ClientMessage::ChangeUser(m) => m.encode(buf, capabilities),
            ClientMessage::InitDb(m) => m.encode(buf, capabilities),
            ClientMessage::Ping(m) => m.encode(buf, capabilities),
            ClientMessage::Quit(m) => m.encode(buf, capabilities),
            ClientMessage::LocalInfileData(m) => m.encode(buf, capabilities),
        }
    }
}
