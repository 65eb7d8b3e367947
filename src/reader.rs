//! Sequential big-endian reader over a bounded byte slice.
use byteorder::{BigEndian, ByteOrder};

use crate::error::{DecodeError, Result};

/// `BinaryCursor` hands out exactly the bytes asked for or fails with
/// `TruncatedInput`; it never returns a short read.
///
/// Cursors created with `sub_cursor` remember their absolute offset in the
/// original input so errors raised deep inside a nested attribute still point
/// at the right byte.
#[derive(Debug, Clone)]
pub struct BinaryCursor<'a> {
    bytes: &'a [u8],
    position: usize,
    // Absolute offset of `bytes[0]` in the outermost input.
    base: usize,
}

impl<'a> BinaryCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            position: 0,
            base: 0,
        }
    }

    /// Absolute offset of the next byte to be read.
    pub fn position(&self) -> usize {
        self.base + self.position
    }

    /// Number of bytes left in this cursor.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read exactly `n` bytes.
    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(DecodeError::TruncatedInput {
                offset: self.position(),
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.position..self.position + n];
        self.position += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_exact(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.read_exact(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.read_exact(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.read_exact(4)?))
    }

    /// Consume `n` bytes and return a fresh cursor bounded to them. Reads on
    /// the returned cursor can never run past those `n` bytes.
    pub fn sub_cursor(&mut self, n: usize) -> Result<BinaryCursor<'a>> {
        let base = self.position();
        let bytes = self.read_exact(n)?;
        Ok(BinaryCursor {
            bytes,
            position: 0,
            base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_integers() {
        let bytes = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34, 0xFF, 0x80];
        let mut cursor = BinaryCursor::new(&bytes);
        assert_eq!(cursor.read_u32().unwrap(), 0xCAFEBABE);
        assert_eq!(cursor.read_u16().unwrap(), 52);
        assert_eq!(cursor.read_u8().unwrap(), 0xFF);
        assert_eq!(cursor.read_i8().unwrap(), -128);
        assert!(cursor.is_empty());
    }

    #[test]
    fn short_read_is_truncated_input() {
        let bytes = [0xCA, 0xFE, 0xBA];
        let mut cursor = BinaryCursor::new(&bytes);
        match cursor.read_u32() {
            Err(DecodeError::TruncatedInput {
                offset,
                needed,
                available,
            }) => {
                assert_eq!((offset, needed, available), (0, 4, 3));
            }
            other => panic!("expected TruncatedInput, got {:?}", other),
        }
        // A failed read does not move the cursor.
        assert_eq!(cursor.remaining(), 3);
    }

    #[test]
    fn sub_cursor_is_bounded_and_keeps_offsets() {
        let bytes = [0, 0, 1, 2, 3, 4];
        let mut cursor = BinaryCursor::new(&bytes);
        cursor.read_u16().unwrap();
        let mut inner = cursor.sub_cursor(2).unwrap();
        assert_eq!(cursor.position(), 4);
        assert_eq!(inner.position(), 2);
        assert_eq!(inner.read_u8().unwrap(), 1);
        match inner.read_u16() {
            Err(DecodeError::TruncatedInput { offset, .. }) => assert_eq!(offset, 3),
            other => panic!("expected TruncatedInput, got {:?}", other),
        }
        assert_eq!(cursor.read_u16().unwrap(), 0x0304);
    }
}
