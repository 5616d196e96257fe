use crate::error::Error;
use crate::io::Buf;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_auth_switch_request.html
#[derive(Debug)]
pub struct AuthSwitchRequest {
    pub plugin_name: Box<str>,
    pub plugin_data: Box<[u8]>,
}

impl AuthSwitchRequest {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self, Error> {
        let header = buf.get_u8()?;
        if header != 0xFE {
            return Err(err_protocol!(
                "expected AUTH SWITCH (0xFE); received 0x{:X}",
                header
            ));
        }

        let plugin_name = buf.get_str_nul()?.into();

        // The challenge is (optionally) NUL-terminated; the terminator is
        // not part of the plugin data
        let mut plugin_data = buf.get_bytes(buf.len())?;
        if plugin_data.last() == Some(&0) {
            plugin_data = &plugin_data[..plugin_data.len() - 1];
        }

        Ok(Self {
            plugin_name,
            plugin_data: plugin_data.to_owned().into_boxed_slice(),
        })
    }
}

/// Extra data from the server mid-authentication (`0x01` header);
/// interpretation belongs to the active plugin.
// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_auth_more_data.html
#[derive(Debug)]
pub struct AuthMoreData {
    pub data: Box<[u8]>,
}

impl AuthMoreData {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self, Error> {
        let header = buf.get_u8()?;
        if header != 0x01 {
            return Err(err_protocol!(
                "expected AUTH MORE DATA (0x01); received 0x{:X}",
                header
            ));
        }

        Ok(Self {
            data: buf.get_bytes(buf.len())?.to_owned().into_boxed_slice(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::AuthSwitchRequest;

    const AUTH_SWITCH: &[u8] = b"\xFEmysql_native_password\x00abcdefgh12345678090\x00";

    #[test]
    fn it_decodes_an_auth_switch_request() {
        let p = AuthSwitchRequest::decode(AUTH_SWITCH).unwrap();

        assert_eq!(&*p.plugin_name, "mysql_native_password");
        assert_eq!(&*p.plugin_data, b"abcdefgh12345678090");
    }
}
