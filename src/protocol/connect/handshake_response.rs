use byteorder::LittleEndian;

use crate::io::{BufMut, BufMutExt};
use crate::protocol::{Capabilities, Encode};

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_handshake_response.html
// https://mariadb.com/kb/en/connection/#handshake-response-packet
#[derive(Debug)]
pub struct HandshakeResponse {
    pub max_packet_size: u32,
    pub client_collation: u8,
    pub username: Box<str>,
    pub database: Option<Box<str>>,
    pub auth_plugin_name: Box<str>,
    pub auth_response: Vec<u8>,
}

impl Encode for HandshakeResponse {
    fn encode(&self, buf: &mut Vec<u8>, capabilities: Capabilities) {
        // client capabilities : int<4>
        buf.put_u32::<LittleEndian>(capabilities.bits());

        // max packet size : int<4>
        buf.put_u32::<LittleEndian>(self.max_packet_size);

        // client character collation : int<1>
        buf.put_u8(self.client_collation);

        // reserved : string<23>
        buf.advance(23);

        // username : string<NUL>
        buf.put_str_nul(&self.username);

        if capabilities.contains(Capabilities::PLUGIN_AUTH_LENENC_DATA) {
            // auth_response : string<lenenc>
            buf.put_bytes_lenenc::<LittleEndian>(&self.auth_response);
        } else if capabilities.contains(Capabilities::SECURE_CONNECTION) {
            // auth_response_length : int<1>
            buf.put_u8(self.auth_response.len() as u8);

            // auth_response : string<{auth_response_length}>
            buf.put_bytes(&self.auth_response);
        } else {
            // no auth : int<1>
            buf.put_u8(0);
        }

        if capabilities.contains(Capabilities::CONNECT_WITH_DB) {
            if let Some(database) = &self.database {
                // database : string<NUL>
                buf.put_str_nul(database);
            }
        }

        if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            // client_plugin_name : string<NUL>
            buf.put_str_nul(&self.auth_plugin_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Capabilities, Encode, HandshakeResponse};

    #[test]
    fn it_encodes_the_capability_intersection_first() {
        let capabilities = Capabilities::PROTOCOL_41
            | Capabilities::PLUGIN_AUTH
            | Capabilities::SECURE_CONNECTION
            | Capabilities::CONNECT_WITH_DB;

        let p = HandshakeResponse {
            max_packet_size: 16_777_215,
            client_collation: 45,
            username: "root".into(),
            database: Some("todos".into()),
            auth_plugin_name: "mysql_native_password".into(),
            auth_response: Vec::new(),
        };

        let mut buf = Vec::new();
        p.encode(&mut buf, capabilities);

        assert_eq!(&buf[..4], capabilities.bits().to_le_bytes());
        assert_eq!(&buf[4..8], 16_777_215u32.to_le_bytes());
        assert_eq!(buf[8], 45);

        // 23 reserved bytes, then the NUL-terminated username
        assert!(buf[9..32].iter().all(|&b| b == 0));
        assert_eq!(&buf[32..37], b"root\x00");

        // empty auth response, database, plugin name
        assert_eq!(&buf[37..], b"\x00todos\x00mysql_native_password\x00");
    }
}
