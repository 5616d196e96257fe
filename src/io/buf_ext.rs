use std::io;

use byteorder::ByteOrder;

use crate::io::{Buf, BufMut};

/// Length-encoded ("lenenc") reads specific to the MySQL wire protocol.
///
/// A length-encoded integer is 1, 3, 4, or 9 bytes wide depending on its
/// leading byte; `0xFB` marks a NULL value in row context, surfaced here
/// as `None`.
pub trait BufExt<'a>: Buf<'a> {
    fn get_uint_lenenc<T: ByteOrder>(&mut self) -> io::Result<Option<u64>>;

    fn get_str_lenenc<T: ByteOrder>(&mut self) -> io::Result<Option<&'a str>>;
}

impl<'a> BufExt<'a> for &'a [u8] {
    fn get_uint_lenenc<T: ByteOrder>(&mut self) -> io::Result<Option<u64>> {
        Ok(match self.get_u8()? {
            0xFB => None,
            0xFC => Some(u64::from(self.get_u16::<T>()?)),
            0xFD => Some(u64::from(self.get_u24::<T>()?)),
            0xFE => Some(self.get_u64::<T>()?),

            value => Some(u64::from(value)),
        })
    }

    fn get_str_lenenc<T: ByteOrder>(&mut self) -> io::Result<Option<&'a str>> {
        self.get_uint_lenenc::<T>()?
            .map(move |len| self.get_str(len as usize))
            .transpose()
    }
}

pub trait BufMutExt: BufMut {
    fn put_uint_lenenc<T: ByteOrder>(&mut self, val: u64);

    fn put_bytes_lenenc<T: ByteOrder>(&mut self, val: &[u8]);
}

impl BufMutExt for Vec<u8> {
    fn put_uint_lenenc<T: ByteOrder>(&mut self, val: u64) {
        if val < 0xFB {
            self.put_u8(val as u8);
        } else if val <= u16::MAX as u64 {
            self.put_u8(0xFC);
            self.put_u16::<T>(val as u16);
        } else if val <= 0xFF_FF_FF {
            self.put_u8(0xFD);
            self.put_u24::<T>(val as u32);
        } else {
            self.put_u8(0xFE);
            self.put_u64::<T>(val);
        }
    }

    fn put_bytes_lenenc<T: ByteOrder>(&mut self, val: &[u8]) {
        self.put_uint_lenenc::<T>(val.len() as u64);
        self.put_bytes(val);
    }
}

#[cfg(test)]
mod tests {
    use byteorder::LittleEndian;

    use super::{BufExt, BufMutExt};

    #[test]
    fn it_round_trips_lenenc_boundaries() {
        // Boundary values for each of the four encodings, plus u64::MAX.
        for val in [
            0,
            1,
            0xFA,
            0xFB,
            0xFF,
            0x1_00,
            0xFF_FF,
            0x1_00_00,
            0xFF_FF_FF,
            0x1_00_00_00,
            u64::MAX,
        ] {
            let mut buf = Vec::new();
            buf.put_uint_lenenc::<LittleEndian>(val);

            let mut slice = &buf[..];
            let read = slice.get_uint_lenenc::<LittleEndian>().unwrap();

            assert_eq!(read, Some(val));
            assert!(slice.is_empty());
        }
    }

    #[test]
    fn it_reads_null_marker() {
        let mut buf: &[u8] = &[0xFB];

        assert_eq!(buf.get_uint_lenenc::<LittleEndian>().unwrap(), None);
    }

    #[test]
    fn it_uses_the_narrowest_encoding() {
        let mut buf = Vec::new();
        buf.put_uint_lenenc::<LittleEndian>(0xFA);
        assert_eq!(buf.len(), 1);

        buf.clear();
        buf.put_uint_lenenc::<LittleEndian>(0xFB);
        assert_eq!(buf, [0xFC, 0xFB, 0x00]);

        buf.clear();
        buf.put_uint_lenenc::<LittleEndian>(0x10_00_00);
        assert_eq!(buf, [0xFD, 0x00, 0x00, 0x10]);
    }
}
