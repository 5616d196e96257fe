mod capabilities;
mod client;
mod encode;
mod field;
mod status;
mod type_id;

pub use capabilities::Capabilities;
pub use client::ClientMessage;
pub use encode::Encode;
pub use field::FieldFlags;
pub use status::Status;
pub use type_id::TypeId;

pub mod connect;
pub mod envelope;
pub mod field_reader;
pub mod field_value;
pub mod response;
pub mod server;
pub mod statement;
pub mod text;
