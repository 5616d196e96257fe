use crate::error::Error;
use crate::protocol::connect::{AuthMoreData, AuthSwitchRequest, HandshakeGreeting};
use crate::protocol::envelope::LogicalPacket;
use crate::protocol::response::{
    ColumnCount, ColumnDefinition, EofPacket, ErrPacket, LocalInfileRequest, OkPacket, Row,
};
use crate::protocol::server::ServerMessage;
use crate::protocol::statement::PrepareOk;
use crate::protocol::{Capabilities, ClientMessage, Status};

/// How the next inbound packet is to be interpreted.
///
/// The same leading byte means different things in different phases, so
/// decoding is driven by this mode, which transitions on both emitted
/// server messages and outbound commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeMode {
    /// Connection opened; the server speaks first.
    AwaitGreeting,

    /// Handshake response (or auth continuation) sent.
    AwaitAuthReply,

    /// A command went out; the reply header decides what follows.
    AwaitCommandReply { binary: bool },

    /// `COM_STMT_PREPARE` went out; `0x00` here is a prepare-ok, not an
    /// OK packet.
    AwaitPrepareReply,

    /// Consuming column (or parameter) definitions.
    AwaitResultMetadata {
        remaining: u64,
        eof_pending: bool,
        next: AfterMetadata,
    },

    /// Consuming result rows until the terminator.
    AwaitResultRows { binary: bool },

    /// The server asked for a local file; the next reply arrives once
    /// the client finishes streaming it.
    AwaitLocalInfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AfterMetadata {
    /// Result-set metadata: rows follow.
    Rows { binary: bool },

    /// Prepare parameter metadata: column metadata follows.
    Metadata { remaining: u64 },

    /// Prepare metadata exhausted: the exchange is complete.
    Complete,
}

/// One decoded server message plus scheduling information for the
/// exchange that is consuming it.
pub(crate) struct Decoded {
    pub(crate) message: ServerMessage,

    /// The terminator for the in-flight exchange has been seen; the
    /// queue slot may be released once this message is delivered.
    pub(crate) completes_exchange: bool,
}

impl Decoded {
    fn next(message: ServerMessage) -> Self {
        Self {
            message,
            completes_exchange: false,
        }
    }

    fn terminal(message: ServerMessage) -> Self {
        Self {
            message,
            completes_exchange: true,
        }
    }
}

/// The inbound half of the duplex codec: decodes logical packets into
/// server messages under the current mode and negotiated capabilities.
///
/// The outbound half lives on the stream ([`write_message`]); the codec
/// arbitrates the mode for both by observing the commands that go out.
///
/// [`write_message`]: crate::connection::stream::MySqlStream::write_message
pub(crate) struct DuplexCodec {
    mode: DecodeMode,
    pub(crate) capabilities: Capabilities,
}

impl DuplexCodec {
    pub(crate) fn new() -> Self {
        Self {
            mode: DecodeMode::AwaitGreeting,
            capabilities: Capabilities::empty(),
        }
    }

    #[cfg(test)]
    pub(crate) fn mode(&self) -> DecodeMode {
        self.mode
    }

    #[cfg(test)]
    pub(crate) fn set_mode(&mut self, mode: DecodeMode) {
        self.mode = mode;
    }

    /// Positions the decoder for the reply to an outbound command.
    pub(crate) fn observe_request(&mut self, message: &ClientMessage) {
        self.mode = match message {
            ClientMessage::Prepare(_) => DecodeMode::AwaitPrepareReply,

            // Re-authentication runs the connection-phase protocol
            ClientMessage::ChangeUser(_) => DecodeMode::AwaitAuthReply,

            // A fetch reply is rows immediately, with no result-set
            // header in front of them
            ClientMessage::Fetch(_) => DecodeMode::AwaitResultRows { binary: true },

            message => DecodeMode::AwaitCommandReply {
                binary: message.is_binary(),
            },
        };
    }

    fn deprecate_eof(&self) -> bool {
        self.capabilities.contains(Capabilities::DEPRECATE_EOF)
    }

    /// Decodes one logical packet under the current mode.
    pub(crate) fn decode(&mut self, packet: LogicalPacket) -> Result<Decoded, Error> {
        let header = packet
            .first_byte()
            .ok_or_else(|| err_protocol!("unexpected empty packet from the server"))?;

        match self.mode {
            DecodeMode::AwaitGreeting => {
                if header == 0xFF {
                    return self.decode_err(&packet);
                }

                let greeting = HandshakeGreeting::decode(&packet.contiguous())?;
                self.mode = DecodeMode::AwaitAuthReply;

                Ok(Decoded::next(ServerMessage::HandshakeGreeting(greeting)))
            }

            DecodeMode::AwaitAuthReply => match header {
                0x00 => {
                    let ok = OkPacket::decode(&packet.contiguous())?;
                    self.mode = DecodeMode::AwaitCommandReply { binary: false };

                    Ok(Decoded::terminal(ServerMessage::Ok(ok)))
                }

                0xFF => self.decode_err(&packet),

                0xFE => Ok(Decoded::next(ServerMessage::AuthSwitch(
                    AuthSwitchRequest::decode(&packet.contiguous())?,
                ))),

                0x01 => Ok(Decoded::next(ServerMessage::AuthMoreData(
                    AuthMoreData::decode(&packet.contiguous())?,
                ))),

                _ => Err(err_protocol!(
                    "unexpected packet 0x{:02X} during authentication",
                    header
                )),
            },

            DecodeMode::AwaitCommandReply { binary } => match header {
                0x00 if packet.total_len() >= 7 => self.decode_terminal_ok(&packet),

                0xFF => self.decode_err(&packet),

                0xFB => {
                    let request = LocalInfileRequest::decode(&packet.contiguous())?;
                    self.mode = DecodeMode::AwaitLocalInfile;

                    Ok(Decoded::next(ServerMessage::LocalInfileRequest(request)))
                }

                0xFE if packet.total_len() < 9 => {
                    // A bare EOF here is a pre-DEPRECATE_EOF OK
                    let eof = EofPacket::decode(&packet.contiguous())?;
                    self.mode = DecodeMode::AwaitCommandReply { binary: false };

                    Ok(Decoded::terminal(ServerMessage::Eof(eof)))
                }

                _ => {
                    let count = ColumnCount::decode(&packet.contiguous())?;

                    self.mode = DecodeMode::AwaitResultMetadata {
                        remaining: count.columns,
                        eof_pending: !self.deprecate_eof(),
                        next: AfterMetadata::Rows { binary },
                    };

                    Ok(Decoded::next(ServerMessage::ColumnCount(count)))
                }
            },

            DecodeMode::AwaitPrepareReply => match header {
                0xFF => self.decode_err(&packet),

                0x00 => {
                    let ok = PrepareOk::decode(&packet.contiguous())?;

                    let params = u64::from(ok.params);
                    let columns = u64::from(ok.columns);

                    let done = if params > 0 {
                        self.mode = DecodeMode::AwaitResultMetadata {
                            remaining: params,
                            eof_pending: !self.deprecate_eof(),
                            next: if columns > 0 {
                                AfterMetadata::Metadata { remaining: columns }
                            } else {
                                AfterMetadata::Complete
                            },
                        };
                        false
                    } else if columns > 0 {
                        self.mode = DecodeMode::AwaitResultMetadata {
                            remaining: columns,
                            eof_pending: !self.deprecate_eof(),
                            next: AfterMetadata::Complete,
                        };
                        false
                    } else {
                        self.mode = DecodeMode::AwaitCommandReply { binary: false };
                        true
                    };

                    Ok(Decoded {
                        message: ServerMessage::PrepareOk(ok),
                        completes_exchange: done,
                    })
                }

                _ => Err(err_protocol!(
                    "unexpected packet 0x{:02X} in reply to a prepare",
                    header
                )),
            },

            DecodeMode::AwaitResultMetadata {
                remaining,
                eof_pending,
                next,
            } => {
                if remaining == 0 {
                    // only reachable while awaiting the legacy terminator
                    if header != 0xFE {
                        return Err(err_protocol!(
                            "expected metadata EOF (0xFE); received 0x{:02X}",
                            header
                        ));
                    }

                    let eof = EofPacket::decode(&packet.contiguous())?;
                    let done = self.advance_metadata(next);

                    return Ok(Decoded {
                        message: ServerMessage::Eof(eof),
                        completes_exchange: done,
                    });
                }

                if header == 0xFF {
                    return self.decode_err(&packet);
                }

                let column = ColumnDefinition::decode(&packet.contiguous())?;

                let remaining = remaining - 1;
                let done = if remaining == 0 && !eof_pending {
                    self.advance_metadata(next)
                } else {
                    self.mode = DecodeMode::AwaitResultMetadata {
                        remaining,
                        eof_pending,
                        next,
                    };
                    false
                };

                Ok(Decoded {
                    message: ServerMessage::ColumnDefinition(column),
                    completes_exchange: done,
                })
            }

            DecodeMode::AwaitResultRows { binary } => match header {
                0xFF => self.decode_err(&packet),

                0xFE if !self.deprecate_eof() && packet.total_len() < 9 => {
                    let eof = EofPacket::decode(&packet.contiguous())?;

                    if eof.status.contains(Status::SERVER_MORE_RESULTS_EXISTS) {
                        self.mode = DecodeMode::AwaitCommandReply { binary };

                        Ok(Decoded::next(ServerMessage::Eof(eof)))
                    } else {
                        self.mode = DecodeMode::AwaitCommandReply { binary: false };

                        Ok(Decoded::terminal(ServerMessage::Eof(eof)))
                    }
                }

                0xFE if self.deprecate_eof() && packet.total_len() < crate::MAX_ENVELOPE_SIZE as u64 => {
                    self.decode_terminal_ok(&packet)
                }

                _ => Ok(Decoded::next(ServerMessage::Row(Row::new(packet, binary)))),
            },

            DecodeMode::AwaitLocalInfile => match header {
                0x00 => self.decode_terminal_ok(&packet),
                0xFF => self.decode_err(&packet),

                _ => Err(err_protocol!(
                    "unexpected packet 0x{:02X} after local file streaming",
                    header
                )),
            },
        }
    }

    // A result-set terminator or command OK; MORE_RESULTS keeps the
    // exchange open for the next result set
    fn decode_terminal_ok(&mut self, packet: &LogicalPacket) -> Result<Decoded, Error> {
        let binary = match self.mode {
            DecodeMode::AwaitCommandReply { binary } | DecodeMode::AwaitResultRows { binary } => {
                binary
            }
            _ => false,
        };

        let ok = OkPacket::decode(&packet.contiguous())?;

        if ok.status.contains(Status::SERVER_MORE_RESULTS_EXISTS) {
            self.mode = DecodeMode::AwaitCommandReply { binary };

            Ok(Decoded::next(ServerMessage::Ok(ok)))
        } else {
            self.mode = DecodeMode::AwaitCommandReply { binary: false };

            Ok(Decoded::terminal(ServerMessage::Ok(ok)))
        }
    }

    fn decode_err(&mut self, packet: &LogicalPacket) -> Result<Decoded, Error> {
        let err = ErrPacket::decode(&packet.contiguous())?;
        self.mode = DecodeMode::AwaitCommandReply { binary: false };

        Ok(Decoded::terminal(ServerMessage::Error(err)))
    }

    // Step past an exhausted metadata block; returns whether the
    // exchange is complete
    fn advance_metadata(&mut self, next: AfterMetadata) -> bool {
        match next {
            AfterMetadata::Rows { binary } => {
                self.mode = DecodeMode::AwaitResultRows { binary };
                false
            }

            AfterMetadata::Metadata { remaining } => {
                self.mode = DecodeMode::AwaitResultMetadata {
                    remaining,
                    eof_pending: !self.deprecate_eof(),
                    next: AfterMetadata::Complete,
                };
                false
            }

            AfterMetadata::Complete => {
                self.mode = DecodeMode::AwaitCommandReply { binary: false };
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use matches::assert_matches;

    use super::{DecodeMode, DuplexCodec};
    use crate::protocol::envelope::LogicalPacket;
    use crate::protocol::server::ServerMessage;
    use crate::protocol::{Capabilities, ClientMessage};

    fn packet(seq: u8, payload: &[u8]) -> LogicalPacket {
        LogicalPacket::new(seq, vec![Bytes::copy_from_slice(payload)])
    }

    fn command_codec(capabilities: Capabilities) -> DuplexCodec {
        let mut codec = DuplexCodec::new();
        codec.capabilities = capabilities;
        codec.set_mode(DecodeMode::AwaitCommandReply { binary: false });
        codec
    }

    #[test]
    fn it_decodes_a_text_result_set_with_deprecate_eof() {
        let mut codec = command_codec(Capabilities::PROTOCOL_41 | Capabilities::DEPRECATE_EOF);
        codec.observe_request(&ClientMessage::query("SELECT 1"));

        // column count: 1
        let d = codec.decode(packet(1, b"\x01")).unwrap();
        assert_matches!(d.message, ServerMessage::ColumnCount(_));
        assert!(!d.completes_exchange);

        // column definition
        let d = codec
            .decode(packet(
                2,
                b"\x03def\x00\x00\x00\x011\x00\x0c\x3f\x00\x01\x00\x00\x00\x08\x81\x00\x00\x00\x00",
            ))
            .unwrap();
        assert_matches!(d.message, ServerMessage::ColumnDefinition(_));
        assert!(!d.completes_exchange);

        // one text row: "1"
        let d = codec.decode(packet(3, b"\x011")).unwrap();
        assert_matches!(d.message, ServerMessage::Row(_));
        assert!(!d.completes_exchange);

        // OK wearing the EOF marker terminates the result
        let d = codec.decode(packet(4, b"\xfe\x00\x00\x02\x00\x00\x00")).unwrap();
        assert_matches!(d.message, ServerMessage::Ok(_));
        assert!(d.completes_exchange);
    }

    #[test]
    fn it_decodes_a_text_result_set_with_legacy_eof() {
        let mut codec = command_codec(Capabilities::PROTOCOL_41);
        codec.observe_request(&ClientMessage::query("SELECT 1"));

        codec.decode(packet(1, b"\x01")).unwrap();

        let d = codec
            .decode(packet(
                2,
                b"\x03def\x00\x00\x00\x011\x00\x0c\x3f\x00\x01\x00\x00\x00\x08\x81\x00\x00\x00\x00",
            ))
            .unwrap();
        assert!(!d.completes_exchange);

        // metadata EOF
        let d = codec.decode(packet(3, b"\xfe\x00\x00\x02\x00")).unwrap();
        assert_matches!(d.message, ServerMessage::Eof(_));
        assert!(!d.completes_exchange);

        let d = codec.decode(packet(4, b"\x011")).unwrap();
        assert_matches!(d.message, ServerMessage::Row(_));

        // result EOF
        let d = codec.decode(packet(5, b"\xfe\x00\x00\x02\x00")).unwrap();
        assert_matches!(d.message, ServerMessage::Eof(_));
        assert!(d.completes_exchange);
    }

    #[test]
    fn it_terminates_an_exchange_on_a_server_error() {
        let mut codec = command_codec(Capabilities::PROTOCOL_41 | Capabilities::DEPRECATE_EOF);
        codec.observe_request(&ClientMessage::query("SELECT * FROM missing"));

        let d = codec
            .decode(packet(1, b"\xff\x7a\x04#42S02Table 'missing' doesn't exist"))
            .unwrap();

        assert_matches!(d.message, ServerMessage::Error(_));
        assert!(d.completes_exchange);
        assert_eq!(codec.mode(), DecodeMode::AwaitCommandReply { binary: false });
    }

    #[test]
    fn it_keeps_the_exchange_open_across_multiple_result_sets() {
        let mut codec = command_codec(Capabilities::PROTOCOL_41 | Capabilities::DEPRECATE_EOF);
        codec.observe_request(&ClientMessage::query("SELECT 1; SELECT 2"));

        // OK with SERVER_MORE_RESULTS_EXISTS does not complete
        let d = codec.decode(packet(1, b"\x00\x00\x00\x0a\x00\x00\x00")).unwrap();
        assert_matches!(d.message, ServerMessage::Ok(_));
        assert!(!d.completes_exchange);

        // final OK does
        let d = codec.decode(packet(2, b"\x00\x00\x00\x02\x00\x00\x00")).unwrap();
        assert!(d.completes_exchange);
    }

    #[test]
    fn it_walks_prepare_metadata() {
        let mut codec = command_codec(Capabilities::PROTOCOL_41 | Capabilities::DEPRECATE_EOF);
        codec.observe_request(&ClientMessage::prepare("SELECT ? + ?"));

        // prepare-ok: id 1, 1 column, 2 params
        let d = codec
            .decode(packet(1, b"\x00\x01\x00\x00\x00\x01\x00\x02\x00\x00\x00\x00"))
            .unwrap();
        assert_matches!(d.message, ServerMessage::PrepareOk(_));
        assert!(!d.completes_exchange);

        let param =
            b"\x03def\x00\x00\x00\x01?\x00\x0c\x3f\x00\x00\x00\x00\x00\xfd\x80\x00\x00\x00\x00";

        // two parameter definitions, then one column definition
        assert!(!codec.decode(packet(2, param)).unwrap().completes_exchange);
        assert!(!codec.decode(packet(3, param)).unwrap().completes_exchange);

        let d = codec.decode(packet(4, param)).unwrap();
        assert_matches!(d.message, ServerMessage::ColumnDefinition(_));
        assert!(d.completes_exchange);
    }

    #[test]
    fn it_reads_fetch_replies_as_binary_rows() {
        let mut codec = command_codec(Capabilities::PROTOCOL_41 | Capabilities::DEPRECATE_EOF);
        codec.observe_request(&ClientMessage::Fetch(
            crate::protocol::statement::ComStmtFetch {
                statement_id: 1,
                rows: 10,
            },
        ));

        // a binary row leads with 0x00; it must not be taken for an OK
        let d = codec.decode(packet(1, b"\x00\x00\x01\x00\x00\x00\x00\x00\x00\x00")).unwrap();
        assert_matches!(d.message, ServerMessage::Row(_));
        assert!(!d.completes_exchange);

        let d = codec.decode(packet(2, b"\xfe\x00\x00\x02\x00\x00\x00")).unwrap();
        assert_matches!(d.message, ServerMessage::Ok(_));
        assert!(d.completes_exchange);
    }

    #[test]
    fn it_transitions_to_local_infile_mode() {
        let mut codec = command_codec(Capabilities::PROTOCOL_41 | Capabilities::DEPRECATE_EOF);
        codec.observe_request(&ClientMessage::query("LOAD DATA LOCAL INFILE ..."));

        let d = codec.decode(packet(1, b"\xfbdata.csv")).unwrap();
        assert_matches!(d.message, ServerMessage::LocalInfileRequest(_));
        assert!(!d.completes_exchange);
        assert_eq!(codec.mode(), DecodeMode::AwaitLocalInfile);

        let d = codec.decode(packet(3, b"\x00\x05\x00\x02\x00\x00\x00")).unwrap();
        assert_matches!(d.message, ServerMessage::Ok(_));
        assert!(d.completes_exchange);
    }
}
