use bytes::Bytes;

use crate::io::BufMut;
use crate::protocol::{Capabilities, Encode};

/// One chunk of file content answering a `LOCAL INFILE` request.
///
/// The content is raw; an empty chunk is the terminator after which the
/// server answers with OK or ERR.
// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_query_response_local_infile_request.html
#[derive(Debug)]
pub struct LocalInfileData {
    pub data: Bytes,
}

impl Encode for LocalInfileData {
    fn encode(&self, buf: &mut Vec<u8>, _: Capabilities) {
        // file content : string<EOF>
        buf.put_bytes(&self.data);
    }
}
