//! Bounds-checked reads over an event payload.
//!
//! Layouts are little-endian and tightly packed. Each read advances the
//! cursor and fails with [`DecodeError::Truncated`] instead of reading past
//! the end of the span.

use crate::error::DecodeError;

pub struct PayloadReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self
            .offset
            .checked_add(N)
            .filter(|&end| end <= self.data.len())
            .ok_or(DecodeError::Truncated {
                offset: self.offset,
                want: N,
            })?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.offset..end]);
        self.offset = end;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(i8::from_le_bytes(self.take::<1>()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take::<4>()?))
    }

    pub fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.offset,
                want: len,
            });
        }
        self.offset += len;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_little_endian() {
        let data = [0x01, 0x78, 0x56, 0x34, 0x12, 0xff];
        let mut r = PayloadReader::new(&data);
        assert_eq!(r.read_u8().unwrap(), 0x01);
        assert_eq!(r.read_u32().unwrap(), 0x12345678);
        assert_eq!(r.read_i8().unwrap(), -1);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_under_read_fails_without_advancing() {
        let data = [0u8; 3];
        let mut r = PayloadReader::new(&data);
        r.skip(1).unwrap();
        assert_eq!(
            r.read_u32(),
            Err(DecodeError::Truncated { offset: 1, want: 4 })
        );
        assert_eq!(r.offset(), 1);
        assert!(r.skip(3).is_err());
        assert_eq!(r.read_u8().unwrap(), 0);
        assert_eq!(r.read_u8().unwrap(), 0);
    }

    #[test]
    fn test_empty_payload() {
        let mut r = PayloadReader::new(&[]);
        assert!(r.read_u8().is_err());
        assert!(r.read_u32().is_err());
        assert!(r.skip(0).is_ok());
    }
}
