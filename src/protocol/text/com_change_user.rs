use byteorder::LittleEndian;

use crate::io::{BufMut, BufMutExt};
use crate::protocol::{Capabilities, Encode};

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_change_user.html
#[derive(Debug)]
pub struct ComChangeUser {
    pub username: Box<str>,
    pub database: Option<Box<str>>,
    pub collation: u8,
    pub auth_plugin_name: Box<str>,
    pub auth_response: Vec<u8>,
}

impl Encode for ComChangeUser {
    fn encode(&self, buf: &mut Vec<u8>, capabilities: Capabilities) {
        // COM_CHANGE_USER : int<1>
        buf.put_u8(0x11);

        // username : string<NUL>
        buf.put_str_nul(&self.username);

        if capabilities.contains(Capabilities::SECURE_CONNECTION) {
            // auth_response_length : int<1>
            buf.put_u8(self.auth_response.len() as u8);

            // auth_response : string<{auth_response_length}>
            buf.put_bytes(&self.auth_response);
        } else {
            // auth_response : string<NUL> (pre-4.1, never negotiated here)
            buf.put_bytes(&self.auth_response);
            buf.put_u8(0);
        }

        // database : string<NUL>
        buf.put_str_nul(self.database.as_deref().unwrap_or(""));

        // client character collation : int<2>
        buf.put_u16::<LittleEndian>(u16::from(self.collation));

        if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            // client_plugin_name : string<NUL>
            buf.put_str_nul(&self.auth_plugin_name);
        }

        if capabilities.contains(Capabilities::CONNECT_ATTRS) {
            // zero attributes : int<lenenc>
            buf.put_uint_lenenc::<LittleEndian>(0);
        }
    }
}
