use crate::protocol::connect::{AuthMoreData, AuthSwitchRequest, HandshakeGreeting};
use crate::protocol::response::{
    ColumnCount, ColumnDefinition, EofPacket, ErrPacket, LocalInfileRequest, OkPacket, Row,
};
use crate::protocol::statement::PrepareOk;

/// A server-to-client message, as interpreted by the duplex codec.
///
/// The wire encoding is context-sensitive: the same leading byte means
/// different things in different phases, so these variants only exist
/// downstream of the codec's decode mode.
#[derive(Debug)]
pub enum ServerMessage {
    /// The initial greeting (protocol 10).
    HandshakeGreeting(HandshakeGreeting),

    /// Affirmative completion; also terminates result sets when
    /// `DEPRECATE_EOF` is negotiated.
    Ok(OkPacket),

    /// Legacy metadata/result terminator.
    Eof(EofPacket),

    /// An error raised by the server.
    Error(ErrPacket),

    /// The server asks the client to stream a local file.
    LocalInfileRequest(LocalInfileRequest),

    /// Start of a result set.
    ColumnCount(ColumnCount),

    /// One column of result metadata.
    ColumnDefinition(ColumnDefinition),

    /// One undecoded result row (text or binary framing).
    Row(Row),

    /// Successful statement preparation.
    PrepareOk(PrepareOk),

    /// The server asks the client to switch authentication plugins.
    AuthSwitch(AuthSwitchRequest),

    /// Plugin-specific data mid-authentication.
    AuthMoreData(AuthMoreData),
}

impl ServerMessage {
    /// Converts a server-raised error packet into the crate error,
    /// passing every other message through.
    pub fn ok(self) -> Result<ServerMessage, crate::error::Error> {
        match self {
            ServerMessage::Error(err) => {
                Err(crate::error::MySqlDatabaseError::from(err).into())
            }

            message => Ok(message),
        }
    }
}
