use crate::protocol::Capabilities;

/// Serialisation of a client-to-server message body.
///
/// Implementations write the packet payload only; envelope framing and
/// sequence ids are applied by the stream when the payload is split.
pub trait Encode {
    fn encode(&self, buf: &mut Vec<u8>, capabilities: Capabilities);
}

impl Encode for &'_ [u8] {
    fn encode(&self, buf: &mut Vec<u8>, _: Capabilities) {
        buf.extend_from_slice(self);
    }
}
