use bytes::{Bytes, BytesMut};

use crate::error::Error;
use crate::protocol::envelope::LogicalPacket;
use crate::protocol::field_value::{FieldValue, LARGE_THRESHOLD};

/// Streams field values out of one logical packet.
///
/// Two concrete modes are selected by the total readable size:
///
/// - **Normal** (`<= i32::MAX` bytes): the buffer list is treated as one
///   logical view and the cursor is a single flat index.
/// - **Large** (`> i32::MAX` bytes): the cursor is a
///   `(buffer_index, offset)` pair and contiguous reads are refused;
///   consumers take values through [`read_size_fixed_field`], which
///   references spans across buffers without copying.
///
/// The reader holds a reference count on every underlying buffer;
/// cloning retains them transitively, and dropping the last handle (and
/// every [`FieldValue`] read out of it) releases each buffer exactly
/// once.
///
/// [`read_size_fixed_field`]: Self::read_size_fixed_field
#[derive(Debug, Clone)]
pub enum FieldReader {
    Normal(NormalFieldReader),
    Large(LargeFieldReader),
}

impl FieldReader {
    /// Wraps the payload buffers of a reassembled logical packet,
    /// selecting the mode by total size.
    pub fn new(packet: LogicalPacket) -> Self {
        Self::from_buffers(packet.into_buffers())
    }

    pub fn from_buffers(buffers: Vec<Bytes>) -> Self {
        let total: u64 = buffers.iter().map(|b| b.len() as u64).sum();

        if total > LARGE_THRESHOLD {
            FieldReader::Large(LargeFieldReader {
                buffers,
                index: 0,
                offset: 0,
            })
        } else {
            FieldReader::Normal(NormalFieldReader {
                buffers,
                total: total as usize,
                cursor: 0,
            })
        }
    }

    pub fn remaining(&self) -> u64 {
        match self {
            FieldReader::Normal(r) => (r.total - r.cursor) as u64,
            FieldReader::Large(r) => r.remaining(),
        }
    }

    /// Reads one unsigned byte without advancing the cursor.
    pub fn peek_u8(&self) -> Result<u8, Error> {
        match self {
            FieldReader::Normal(r) => r.peek_u8(),
            FieldReader::Large(r) => r.peek_u8(),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let byte = self.peek_u8()?;
        self.skip(1)?;

        Ok(byte)
    }

    /// Advances the cursor by `n` bytes.
    pub fn skip(&mut self, n: u64) -> Result<(), Error> {
        if n > self.remaining() {
            return Err(err_protocol!(
                "attempted to skip {} bytes with {} remaining",
                n,
                self.remaining()
            ));
        }

        match self {
            FieldReader::Normal(r) => r.cursor += n as usize,
            FieldReader::Large(r) => r.advance(n),
        }

        Ok(())
    }

    /// Reads `n` bytes into one contiguous buffer.
    ///
    /// Only available in normal mode; a large reader refuses, as its
    /// content cannot be addressed by a single allocation. Use
    /// [`read_size_fixed_field`](Self::read_size_fixed_field) instead.
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes, Error> {
        match self {
            FieldReader::Normal(r) => r.read_bytes(n),

            FieldReader::Large(_) => Err(err_protocol!(
                "fixed byte read of {} refused on a large field reader",
                n
            )),
        }
    }

    /// Reads a field of a known size, referencing spans of the
    /// underlying buffers without copying.
    pub fn read_size_fixed_field(&mut self, len: u64) -> Result<FieldValue, Error> {
        if len > self.remaining() {
            return Err(err_protocol!(
                "field of {} bytes exceeds the {} remaining in the packet",
                len,
                self.remaining()
            ));
        }

        let spans = match self {
            FieldReader::Normal(r) => {
                let (mut index, mut offset) = r.locate();
                let spans = take_spans(&r.buffers, &mut index, &mut offset, len);
                r.cursor += len as usize;
                spans
            }

            FieldReader::Large(r) => take_spans(&r.buffers, &mut r.index, &mut r.offset, len),
        };

        Ok(FieldValue::from_buffers(spans))
    }

    /// Reads a length-encoded field: a varint length prefix (1, 3, 4, or
    /// 9 bytes) followed by that many payload bytes. `0xFB` denotes NULL.
    pub fn read_lenenc_field(&mut self) -> Result<FieldValue, Error> {
        match self.read_lenenc_uint()? {
            None => Ok(FieldValue::Null),
            Some(len) => self.read_size_fixed_field(len),
        }
    }

    /// Reads a length-encoded integer, possibly spanning buffers.
    /// `None` is the NULL marker (`0xFB`).
    pub fn read_lenenc_uint(&mut self) -> Result<Option<u64>, Error> {
        Ok(match self.read_u8()? {
            0xFB => None,
            0xFC => Some(self.read_uint_le(2)?),
            0xFD => Some(self.read_uint_le(3)?),
            0xFE => Some(self.read_uint_le(8)?),
            0xFF => {
                return Err(err_protocol!(
                    "0xFF is not a valid length-encoded integer header"
                ));
            }

            value => Some(u64::from(value)),
        })
    }

    fn read_uint_le(&mut self, n: usize) -> Result<u64, Error> {
        let mut val = 0u64;
        for i in 0..n {
            val |= u64::from(self.read_u8()?) << (8 * i);
        }

        Ok(val)
    }
}

/// Cursor over a logical view of at most `i32::MAX` bytes.
#[derive(Debug, Clone)]
pub struct NormalFieldReader {
    buffers: Vec<Bytes>,
    // Total size; the flat cursor runs in [0, total]
    total: usize,
    cursor: usize,
}

impl NormalFieldReader {
    fn peek_u8(&self) -> Result<u8, Error> {
        let (index, offset) = self.locate();

        self.buffers
            .get(index)
            .and_then(|buf| buf.get(offset).copied())
            .ok_or_else(|| err_protocol!("read past the end of the packet"))
    }

    // Translate the flat cursor to (buffer, offset)
    fn locate(&self) -> (usize, usize) {
        let mut rest = self.cursor;

        for (index, buf) in self.buffers.iter().enumerate() {
            if rest < buf.len() {
                return (index, rest);
            }

            rest -= buf.len();
        }

        (self.buffers.len(), 0)
    }

    fn read_bytes(&mut self, n: usize) -> Result<Bytes, Error> {
        if n > self.total - self.cursor {
            return Err(err_protocol!(
                "attempted to read {} bytes with {} remaining",
                n,
                self.total - self.cursor
            ));
        }

        let (mut index, mut offset) = self.locate();
        let spans = take_spans(&self.buffers, &mut index, &mut offset, n as u64);
        self.cursor += n;

        Ok(match spans.len() {
            0 => Bytes::new(),
            1 => spans.into_iter().next().unwrap(),
            _ => {
                let mut joined = BytesMut::with_capacity(n);
                for span in &spans {
                    joined.extend_from_slice(span);
                }

                joined.freeze()
            }
        })
    }
}

/// Cursor over a buffer list whose total size exceeds `i32::MAX`.
#[derive(Debug, Clone)]
pub struct LargeFieldReader {
    buffers: Vec<Bytes>,
    index: usize,
    offset: usize,
}

impl LargeFieldReader {
    fn remaining(&self) -> u64 {
        let mut total = 0u64;

        for (index, buf) in self.buffers.iter().enumerate().skip(self.index) {
            total += buf.len() as u64;
            if index == self.index {
                total -= self.offset as u64;
            }
        }

        total
    }

    fn peek_u8(&self) -> Result<u8, Error> {
        let mut index = self.index;
        let mut offset = self.offset;

        loop {
            let buf = self
                .buffers
                .get(index)
                .ok_or_else(|| err_protocol!("read past the end of the packet"))?;

            match buf.get(offset) {
                Some(byte) => return Ok(*byte),
                None => {
                    index += 1;
                    offset = 0;
                }
            }
        }
    }

    fn advance(&mut self, mut n: u64) {
        while n > 0 && self.index < self.buffers.len() {
            let avail = self.buffers[self.index].len() - self.offset;

            if n < avail as u64 {
                self.offset += n as usize;
                return;
            }

            n -= avail as u64;
            self.index += 1;
            self.offset = 0;
        }
    }
}

// Collect `len` bytes starting at (index, offset) as reference-counted
// spans, advancing the cursor.
fn take_spans(buffers: &[Bytes], index: &mut usize, offset: &mut usize, mut len: u64) -> Vec<Bytes> {
    let mut spans = Vec::new();

    while len > 0 {
        let buf = &buffers[*index];
        let avail = buf.len() - *offset;

        if avail == 0 {
            *index += 1;
            *offset = 0;
            continue;
        }

        let take = u64::min(avail as u64, len) as usize;
        spans.push(buf.slice(*offset..*offset + take));

        *offset += take;
        len -= take as u64;

        if *offset == buf.len() {
            *index += 1;
            *offset = 0;
        }
    }

    spans
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use matches::assert_matches;

    use super::FieldReader;
    use crate::protocol::field_value::FieldValue;

    #[test]
    fn it_reads_lenenc_fields_within_one_buffer() {
        // "1" then NULL then "ab"
        let mut reader =
            FieldReader::from_buffers(vec![Bytes::from_static(b"\x011\xFB\x02ab")]);

        let one = reader.read_lenenc_field().unwrap();
        assert_eq!(one.contiguous().unwrap(), "1");

        assert!(reader.read_lenenc_field().unwrap().is_null());

        let ab = reader.read_lenenc_field().unwrap();
        assert_eq!(ab.contiguous().unwrap(), "ab");

        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn it_reads_a_field_crossing_buffer_boundaries() {
        let mut reader = FieldReader::from_buffers(vec![
            Bytes::from_static(b"\x05he"),
            Bytes::from_static(b"llo"),
        ]);

        let value = reader.read_lenenc_field().unwrap();

        assert_matches!(value, FieldValue::Normal(_));
        assert_eq!(value.buffers().len(), 2);
        assert_eq!(value.contiguous().unwrap(), "hello");
    }

    #[test]
    fn it_reads_a_varint_prefix_split_across_buffers() {
        // 0xFC length prefix with its two length bytes in separate buffers
        let mut reader = FieldReader::from_buffers(vec![
            Bytes::from_static(b"\xFC\x03"),
            Bytes::from_static(b"\x00abc"),
        ]);

        let value = reader.read_lenenc_field().unwrap();

        assert_eq!(value.contiguous().unwrap(), "abc");
    }

    #[test]
    fn it_peeks_and_skips() {
        let mut reader = FieldReader::from_buffers(vec![Bytes::from_static(b"\x00\x07")]);

        assert_eq!(reader.peek_u8().unwrap(), 0x00);
        assert_eq!(reader.peek_u8().unwrap(), 0x00);

        reader.skip(1).unwrap();
        assert_eq!(reader.peek_u8().unwrap(), 0x07);
    }

    #[test]
    fn it_selects_large_mode_past_the_threshold() {
        // 129 shared handles to one 16 MiB allocation: 2 GiB + 16 MiB of
        // logical payload with only 16 MiB resident
        let chunk = Bytes::from(vec![0u8; 1 << 24]);
        let buffers: Vec<Bytes> = std::iter::repeat(chunk).take(129).collect();

        let reader = FieldReader::from_buffers(buffers);

        assert_matches!(reader, FieldReader::Large(_));
        assert_eq!(reader.remaining(), 129 << 24);
    }

    #[test]
    fn it_streams_a_field_larger_than_two_gib() {
        let chunk = Bytes::from(vec![0u8; 1 << 24]);
        let total: u64 = 135 << 24; // ~2.11 GiB
        let buffers: Vec<Bytes> = std::iter::repeat(chunk).take(135).collect();

        let mut reader = FieldReader::from_buffers(buffers);

        // Contiguous reads are refused in large mode
        assert!(reader.read_bytes(16).is_err());

        let value = reader.read_size_fixed_field(total).unwrap();

        assert_matches!(value, FieldValue::Large(_));
        assert_eq!(value.total_len(), total);
        assert_eq!(value.buffers().len(), 135);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn it_refuses_reads_past_the_end() {
        let mut reader = FieldReader::from_buffers(vec![Bytes::from_static(b"abc")]);

        assert!(reader.read_size_fixed_field(4).is_err());
        assert!(reader.skip(4).is_err());
    }
}
