use byteorder::LittleEndian;
use bytes::Bytes;

use crate::io::BufMut;
use crate::protocol::{Capabilities, Encode};

bitflags::bitflags! {
    // https://dev.mysql.com/doc/dev/mysql-server/8.0.12/mysql__com_8h.html#a3e5e9e744ff6f7b989a604fd669977da
    // https://mariadb.com/kb/en/library/com_stmt_execute/#flag
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Cursor: u8 {
        const NO_CURSOR = 0;
        const READ_ONLY = 1;
        const FOR_UPDATE = 2;
        const SCROLLABLE = 4;
    }
}

/// Execute a prepared statement.
///
/// The parameter block (NULL bitmap, types, and values) is carried
/// opaque; binding application values into the binary format belongs to
/// the external value codec.
// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_stmt_execute.html
#[derive(Debug)]
pub struct ComStmtExecute {
    pub statement_id: u32,
    pub cursor: Cursor,
    pub params: Bytes,
}

impl Encode for ComStmtExecute {
    fn encode(&self, buf: &mut Vec<u8>, _: Capabilities) {
        // COM_STMT_EXECUTE : int<1>
        buf.put_u8(0x17);

        // statement_id : int<4>
        buf.put_u32::<LittleEndian>(self.statement_id);

        // cursor : int<1>
        buf.put_u8(self.cursor.bits());

        // iterations (always 1) : int<4>
        buf.put_u32::<LittleEndian>(1);

        // null bitmap, types, values : byte<n>
        buf.put_bytes(&self.params);
    }
}
