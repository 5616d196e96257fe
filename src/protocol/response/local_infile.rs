use crate::error::Error;
use crate::io::Buf;

/// The server's request that the client stream a local file
/// (`LOAD DATA LOCAL INFILE`).
// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_query_response_local_infile_request.html
#[derive(Debug)]
pub struct LocalInfileRequest {
    pub filename: Box<str>,
}

impl LocalInfileRequest {
    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self, Error> {
        let header = buf.get_u8()?;
        if header != 0xFB {
            return Err(err_protocol!(
                "expected LOCAL INFILE request (0xFB); received 0x{:X}",
                header
            ));
        }

        let filename = buf.get_str_eof()?.into();

        Ok(Self { filename })
    }
}
