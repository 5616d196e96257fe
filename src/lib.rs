//! A reactive MySQL connection engine.
//!
//! This crate implements the core of a non-blocking MySQL client: the
//! envelope codec that frames and reassembles wire packets, the exchange
//! scheduler that serialises concurrent callers onto a strictly sequential
//! connection, the in-band TLS upgrade, a field reader able to stream
//! column values out of logical packets larger than 2 GiB, and the
//! lifecycle state machine that moves a connection from handshake through
//! the command phase to an orderly shutdown.
//!
//! It deliberately stops below the level of query APIs and type
//! conversion: callers speak [`ClientMessage`]/[`ServerMessage`] through
//! [`Client::exchange`] and decode column bytes through [`FieldValue`].

#[macro_use]
mod error;

mod connection;
mod io;
mod net;
mod options;

pub mod protocol;

pub use connection::{
    Client, ExchangeHandler, ExchangeStream, Exchangeable, HandlerSignal, ServerVersion,
};
pub use error::{Error, MySqlDatabaseError, Result};
pub use net::{BoxSocket, Socket};
pub use options::{ConnectOptions, SslMode};
pub use protocol::envelope::MAX_ENVELOPE_SIZE;
pub use protocol::field_reader::FieldReader;
pub use protocol::field_value::FieldValue;
pub use protocol::response::Row;
pub use protocol::server::ServerMessage;
pub use protocol::ClientMessage;
pub use protocol::{Capabilities, Status};
