use byteorder::LittleEndian;

use crate::error::Error;
use crate::io::Buf;
use crate::protocol::Status;

/// The legacy result-set terminator; replaced by an OK packet with an
/// EOF marker when `DEPRECATE_EOF` is negotiated.
// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_basic_eof_packet.html
// https://mariadb.com/kb/en/eof_packet/
#[derive(Debug)]
pub struct EofPacket {
    pub warnings: u16,
    pub status: Status,
}

impl EofPacket {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self, Error> {
        let header = buf.get_u8()?;
        if header != 0xFE {
            return Err(err_protocol!(
                "expected EOF (0xFE); received 0x{:X}",
                header
            ));
        }

        let warnings = buf.get_u16::<LittleEndian>()?;
        let status = Status::from_bits_truncate(buf.get_u16::<LittleEndian>()?);

        Ok(Self { warnings, status })
    }
}
