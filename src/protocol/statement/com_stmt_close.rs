use byteorder::LittleEndian;

use crate::io::BufMut;
use crate::protocol::{Capabilities, Encode};

/// Deallocate a prepared statement. The server sends no reply.
// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_stmt_close.html
#[derive(Debug)]
pub struct ComStmtClose {
    pub statement_id: u32,
}

impl Encode for ComStmtClose {
    fn encode(&self, buf: &mut Vec<u8>, _: Capabilities) {
        // COM_STMT_CLOSE : int<1>
        buf.put_u8(0x19);

        // statement_id : int<4>
        buf.put_u32::<LittleEndian>(self.statement_id);
    }
}
