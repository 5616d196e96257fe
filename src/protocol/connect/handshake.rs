use byteorder::LittleEndian;

use crate::error::Error;
use crate::io::Buf;
use crate::protocol::{Capabilities, Status};

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_handshake_v10.html
// https://mariadb.com/kb/en/connection/#initial-handshake-packet
#[derive(Debug)]
pub struct HandshakeGreeting {
    pub protocol_version: u8,
    pub server_version: Box<str>,
    pub connection_id: u32,
    pub server_capabilities: Capabilities,
    pub server_default_collation: u8,
    pub status: Status,
    pub auth_plugin_name: Option<Box<str>>,
    pub auth_plugin_data: Box<[u8]>,
}

impl HandshakeGreeting {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self, Error> {
        let protocol_version = buf.get_u8()?;

        if protocol_version != 10 {
            return Err(err_protocol!(
                "unsupported protocol version {}; the engine requires protocol 10 (server 5.5+)",
                protocol_version
            ));
        }

        let server_version = buf.get_str_nul()?.into();
        let connection_id = buf.get_u32::<LittleEndian>()?;

        let mut scramble = Vec::with_capacity(20);

        // scramble first part : string<8>
        scramble.extend_from_slice(buf.get_bytes(8)?);

        // reserved : string<1>
        buf.advance(1);

        // capability_flags_1 : int<2>
        let capabilities_1 = buf.get_u16::<LittleEndian>()?;
        let mut capabilities = Capabilities::from_bits_truncate(capabilities_1.into());

        // character_set : int<1>
        let char_set = buf.get_u8()?;

        // status_flags : int<2>
        let status = Status::from_bits_truncate(buf.get_u16::<LittleEndian>()?);

        // capability_flags_2 : int<2>
        let capabilities_2 = buf.get_u16::<LittleEndian>()?;
        capabilities |= Capabilities::from_bits_truncate(u32::from(capabilities_2) << 16);

        let auth_plugin_data_len = if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            // plugin data length : int<1>
            buf.get_u8()?
        } else {
            // 0x00 : int<1>
            buf.advance(1);
            0
        };

        // reserved : string<10>
        buf.advance(10);

        if capabilities.contains(Capabilities::SECURE_CONNECTION) {
            // scramble 2nd part : string<n> ( len = max(12, plugin data length - 9) )
            let len = ((auth_plugin_data_len as isize) - 9).max(12) as usize;
            scramble.extend_from_slice(buf.get_bytes(len)?);

            // reserved : string<1>
            buf.advance(1);
        }

        let auth_plugin_name = if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            Some(buf.get_str_nul()?.into())
        } else {
            None
        };

        Ok(Self {
            protocol_version,
            server_version,
            connection_id,
            server_capabilities: capabilities,
            server_default_collation: char_set,
            status,
            auth_plugin_name,
            auth_plugin_data: scramble.into_boxed_slice(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Capabilities, HandshakeGreeting, Status};

    const HANDSHAKE_MYSQL_8_0_18: &[u8] = b"\n8.0.18\x00\x19\x00\x00\x00\x114aB0c\x06g\x00\xff\xff\xff\x02\x00\xff\xc7\x15\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00tL\x03s\x0f[4\rl4. \x00caching_sha2_password\x00";
    const HANDSHAKE_MARIA_DB_10_4_7: &[u8] = b"\n5.5.5-10.4.7-MariaDB-1:10.4.7+maria~bionic\x00\x0b\x00\x00\x00t6L\\j\"dS\x00\xfe\xf7\x08\x02\x00\xff\x81\x15\x00\x00\x00\x00\x00\x00\x07\x00\x00\x00U14Oph9\"<H5n\x00mysql_native_password\x00";

    #[test]
    fn it_decodes_a_mysql_8_0_18_greeting() {
        let p = HandshakeGreeting::decode(HANDSHAKE_MYSQL_8_0_18).unwrap();

        assert_eq!(p.protocol_version, 10);
        assert_eq!(&*p.server_version, "8.0.18");
        assert_eq!(p.connection_id, 25);
        assert_eq!(p.server_default_collation, 255);

        assert!(p.status.contains(Status::SERVER_STATUS_AUTOCOMMIT));

        assert!(p.server_capabilities.contains(
            Capabilities::PROTOCOL_41
                | Capabilities::PLUGIN_AUTH
                | Capabilities::SECURE_CONNECTION
                | Capabilities::DEPRECATE_EOF
                | Capabilities::SSL
        ));

        assert_eq!(p.auth_plugin_name.as_deref(), Some("caching_sha2_password"));

        assert_eq!(
            &*p.auth_plugin_data,
            &[17, 52, 97, 66, 48, 99, 6, 103, 116, 76, 3, 115, 15, 91, 52, 13, 108, 52, 46, 32]
        );
    }

    #[test]
    fn it_decodes_a_mariadb_10_4_7_greeting() {
        let p = HandshakeGreeting::decode(HANDSHAKE_MARIA_DB_10_4_7).unwrap();

        assert_eq!(p.protocol_version, 10);
        assert_eq!(
            &*p.server_version,
            "5.5.5-10.4.7-MariaDB-1:10.4.7+maria~bionic"
        );

        assert_eq!(p.server_default_collation, 8);

        assert!(p
            .server_capabilities
            .contains(Capabilities::PROTOCOL_41 | Capabilities::PLUGIN_AUTH));

        assert_eq!(p.auth_plugin_name.as_deref(), Some("mysql_native_password"));

        assert_eq!(
            &*p.auth_plugin_data,
            &[
                116, 54, 76, 92, 106, 34, 100, 83, 85, 49, 52, 79, 112, 104, 57, 34, 60, 72, 53,
                110,
            ]
        );
    }

    #[test]
    fn it_rejects_an_unknown_protocol_version() {
        assert!(HandshakeGreeting::decode(b"\x09ancient\x00").is_err());
    }
}
