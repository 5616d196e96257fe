use crate::io::BufMut;
use crate::protocol::{Capabilities, Encode};

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_reset_connection.html
#[derive(Debug)]
pub struct ComResetConnection;

impl Encode for ComResetConnection {
    fn encode(&self, buf: &mut Vec<u8>, _: Capabilities) {
        // COM_RESET_CONNECTION : int<1>
        buf.put_u8(0x1F);
    }
}
