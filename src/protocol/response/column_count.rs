use byteorder::LittleEndian;

use crate::error::Error;
use crate::io::BufExt;

/// The first packet of a result set: the number of columns to follow.
// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_query_response_text_resultset.html
#[derive(Debug)]
pub struct ColumnCount {
    pub columns: u64,
}

impl ColumnCount {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self, Error> {
        let columns = buf
            .get_uint_lenenc::<LittleEndian>()?
            .ok_or_else(|| err_protocol!("unexpected NULL marker in a column count"))?;

        Ok(Self { columns })
    }
}
