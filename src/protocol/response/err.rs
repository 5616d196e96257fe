use byteorder::LittleEndian;

use crate::error::{Error, MySqlDatabaseError};
use crate::io::Buf;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_basic_err_packet.html
// https://mariadb.com/kb/en/err_packet/
#[derive(Debug)]
pub struct ErrPacket {
    pub error_code: u16,
    pub sql_state: Option<Box<str>>,
    pub error_message: Box<str>,
}

impl ErrPacket {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self, Error> {
        let header = buf.get_u8()?;
        if header != 0xFF {
            return Err(err_protocol!(
                "expected ERR (0xFF); received 0x{:X}",
                header
            ));
        }

        let error_code = buf.get_u16::<LittleEndian>()?;

        // The SQLSTATE marker is absent in errors raised during the
        // connection phase
        let sql_state = if buf.first() == Some(&b'#') {
            buf.advance(1);
            Some(buf.get_str(5)?.into())
        } else {
            None
        };

        let error_message = buf.get_str_eof()?.into();

        Ok(Self {
            error_code,
            sql_state,
            error_message,
        })
    }
}

impl From<ErrPacket> for MySqlDatabaseError {
    fn from(packet: ErrPacket) -> Self {
        MySqlDatabaseError {
            error_code: packet.error_code,
            sql_state: packet.sql_state,
            message: packet.error_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ErrPacket;

    const ERR_HANDSHAKE_UNKNOWN_DB: &[u8] = b"\xff\x19\x04#42000Unknown database 'unknown'";
    const ERR_AUTH: &[u8] = b"\xff\x15\x04Access denied for user 'root'@'localhost'";

    #[test]
    fn it_decodes_an_err_with_sql_state() {
        let p = ErrPacket::decode(ERR_HANDSHAKE_UNKNOWN_DB).unwrap();

        assert_eq!(p.error_code, 1049);
        assert_eq!(p.sql_state.as_deref(), Some("42000"));
        assert_eq!(&*p.error_message, "Unknown database 'unknown'");
    }

    #[test]
    fn it_decodes_a_connection_phase_err_without_sql_state() {
        let p = ErrPacket::decode(ERR_AUTH).unwrap();

        assert_eq!(p.error_code, 1045);
        assert_eq!(p.sql_state, None);
        assert_eq!(
            &*p.error_message,
            "Access denied for user 'root'@'localhost'"
        );
    }
}
