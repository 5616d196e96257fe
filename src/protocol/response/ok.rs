use byteorder::LittleEndian;

use crate::error::Error;
use crate::io::{Buf, BufExt};
use crate::protocol::Status;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_basic_ok_packet.html
// https://mariadb.com/kb/en/ok_packet/
#[derive(Debug)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status: Status,
    pub warnings: u16,
    pub info: Box<str>,
}

impl OkPacket {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self, Error> {
        let header = buf.get_u8()?;

        // 0xFE is an OK packet wearing the deprecated-EOF marker
        if header != 0x00 && header != 0xFE {
            return Err(err_protocol!(
                "expected OK (0x00 or 0xFE); received 0x{:X}",
                header
            ));
        }

        let affected_rows = buf.get_uint_lenenc::<LittleEndian>()?.unwrap_or(0);
        let last_insert_id = buf.get_uint_lenenc::<LittleEndian>()?.unwrap_or(0);
        let status = Status::from_bits_truncate(buf.get_u16::<LittleEndian>()?);
        let warnings = buf.get_u16::<LittleEndian>()?;

        // Human-readable status; with SESSION_TRACK this is followed by
        // session state info we do not surface
        let info = buf.get_str_eof().unwrap_or_default().into();

        Ok(Self {
            affected_rows,
            last_insert_id,
            status,
            warnings,
            info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{OkPacket, Status};

    const OK_HANDSHAKE: &[u8] = b"\x00\x00\x00\x02\x00\x00\x00";

    #[test]
    fn it_decodes_a_handshake_ok() {
        let p = OkPacket::decode(OK_HANDSHAKE).unwrap();

        assert_eq!(p.affected_rows, 0);
        assert_eq!(p.last_insert_id, 0);
        assert_eq!(p.warnings, 0);
        assert!(p.status.contains(Status::SERVER_STATUS_AUTOCOMMIT));
        assert!(p.info.is_empty());
    }

    #[test]
    fn it_decodes_affected_rows_and_more_results() {
        // 3 affected, insert id 7, MORE_RESULTS | AUTOCOMMIT
        let p = OkPacket::decode(b"\x00\x03\x07\x0A\x00\x01\x00").unwrap();

        assert_eq!(p.affected_rows, 3);
        assert_eq!(p.last_insert_id, 7);
        assert_eq!(p.warnings, 1);
        assert!(p.status.contains(Status::SERVER_MORE_RESULTS_EXISTS));
    }
}
