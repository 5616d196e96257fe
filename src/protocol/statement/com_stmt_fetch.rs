use byteorder::LittleEndian;

use crate::io::BufMut;
use crate::protocol::{Capabilities, Encode};

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_stmt_fetch.html
#[derive(Debug)]
pub struct ComStmtFetch {
    pub statement_id: u32,
    pub rows: u32,
}

impl Encode for ComStmtFetch {
    fn encode(&self, buf: &mut Vec<u8>, _: Capabilities) {
        // COM_STMT_FETCH : int<1>
        buf.put_u8(0x1C);

        // statement_id : int<4>
        buf.put_u32::<LittleEndian>(self.statement_id);

        // rows to fetch : int<4>
        buf.put_u32::<LittleEndian>(self.rows);
    }
}
