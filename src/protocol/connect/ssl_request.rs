use byteorder::LittleEndian;

use crate::io::BufMut;
use crate::protocol::{Capabilities, Encode};

/// The truncated handshake response sent in clear to request a TLS
/// upgrade; the full response follows on the encrypted channel.
// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_ssl_request.html
#[derive(Debug)]
pub struct SslRequest {
    pub max_packet_size: u32,
    pub client_collation: u8,
}

impl Encode for SslRequest {
    fn encode(&self, buf: &mut Vec<u8>, capabilities: Capabilities) {
        // SSL must be in the negotiated set or the request is meaningless
        debug_assert!(capabilities.contains(Capabilities::SSL));

        // client capabilities : int<4>
        buf.put_u32::<LittleEndian>(capabilities.bits());

        // max packet size : int<4>
        buf.put_u32::<LittleEndian>(self.max_packet_size);

        // client character collation : int<1>
        buf.put_u8(self.client_collation);

        // reserved : string<23>
        buf.advance(23);
    }
}
