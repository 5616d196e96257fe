use byteorder::LittleEndian;

use crate::error::Error;
use crate::io::Buf;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_stmt_prepare.html#sect_protocol_com_stmt_prepare_response_ok
#[derive(Debug)]
pub struct PrepareOk {
    pub statement_id: u32,
    pub columns: u16,
    pub params: u16,
    pub warnings: u16,
}

impl PrepareOk {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self, Error> {
        let header = buf.get_u8()?;
        if header != 0x00 {
            return Err(err_protocol!(
                "expected PREPARE OK (0x00); received 0x{:X}",
                header
            ));
        }

        let statement_id = buf.get_u32::<LittleEndian>()?;
        let columns = buf.get_u16::<LittleEndian>()?;
        let params = buf.get_u16::<LittleEndian>()?;

        // reserved : string<1>
        buf.advance(1);

        let warnings = buf.get_u16::<LittleEndian>()?;

        Ok(Self {
            statement_id,
            columns,
            params,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::PrepareOk;

    const PREPARE_OK: &[u8] = b"\x00\x01\x00\x00\x00\x01\x00\x02\x00\x00\x00\x00";

    #[test]
    fn it_decodes_a_prepare_ok() {
        let p = PrepareOk::decode(PREPARE_OK).unwrap();

        assert_eq!(p.statement_id, 1);
        assert_eq!(p.columns, 1);
        assert_eq!(p.params, 2);
        assert_eq!(p.warnings, 0);
    }
}
