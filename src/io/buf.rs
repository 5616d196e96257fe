use std::{io, str};

use byteorder::ByteOrder;
use memchr::memchr;

fn eof() -> io::Error {
    io::ErrorKind::UnexpectedEof.into()
}

pub trait Buf<'a> {
    fn advance(&mut self, cnt: usize);

    fn get_u8(&mut self) -> io::Result<u8>;

    fn get_u16<T: ByteOrder>(&mut self) -> io::Result<u16>;

    fn get_u24<T: ByteOrder>(&mut self) -> io::Result<u32>;

    fn get_u32<T: ByteOrder>(&mut self) -> io::Result<u32>;

    fn get_u64<T: ByteOrder>(&mut self) -> io::Result<u64>;

    fn get_str(&mut self, len: usize) -> io::Result<&'a str>;

    fn get_str_nul(&mut self) -> io::Result<&'a str>;

    /// Reads a string terminated by NUL or, if none is present, by the end
    /// of the buffer. Used for trailing fields several packets carry.
    fn get_str_eof(&mut self) -> io::Result<&'a str>;

    fn get_bytes(&mut self, len: usize) -> io::Result<&'a [u8]>;
}

impl<'a> Buf<'a> for &'a [u8] {
    fn advance(&mut self, cnt: usize) {
        *self = &self[cnt..];
    }

    fn get_u8(&mut self) -> io::Result<u8> {
        let val = *self.first().ok_or_else(eof)?;
        self.advance(1);

        Ok(val)
    }

    fn get_u16<T: ByteOrder>(&mut self) -> io::Result<u16> {
        if self.len() < 2 {
            return Err(eof());
        }

        let val = T::read_u16(self);
        self.advance(2);

        Ok(val)
    }

    fn get_u24<T: ByteOrder>(&mut self) -> io::Result<u32> {
        if self.len() < 3 {
            return Err(eof());
        }

        let val = T::read_u24(self);
        self.advance(3);

        Ok(val)
    }

    fn get_u32<T: ByteOrder>(&mut self) -> io::Result<u32> {
        if self.len() < 4 {
            return Err(eof());
        }

        let val = T::read_u32(self);
        self.advance(4);

        Ok(val)
    }

    fn get_u64<T: ByteOrder>(&mut self) -> io::Result<u64> {
        if self.len() < 8 {
            return Err(eof());
        }

        let val = T::read_u64(self);
        self.advance(8);

        Ok(val)
    }

    fn get_str(&mut self, len: usize) -> io::Result<&'a str> {
        str::from_utf8(self.get_bytes(len)?)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }

    fn get_str_nul(&mut self) -> io::Result<&'a str> {
        let len = memchr(b'\0', self).ok_or(io::ErrorKind::InvalidData)?;
        let s = &self.get_str(len + 1)?[..len];

        Ok(s)
    }

    fn get_str_eof(&mut self) -> io::Result<&'a str> {
        match memchr(b'\0', self) {
            Some(len) => {
                let s = &self.get_str(len + 1)?[..len];
                Ok(s)
            }

            None => self.get_str(self.len()),
        }
    }

    fn get_bytes(&mut self, len: usize) -> io::Result<&'a [u8]> {
        if self.len() < len {
            return Err(eof());
        }

        let buf = &self[..len];
        self.advance(len);

        Ok(buf)
    }
}
