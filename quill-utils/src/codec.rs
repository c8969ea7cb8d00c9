//! Variable-length integer encoding used by every length prefix and id on the wire.

use std::io::{Error, ErrorKind, Read, Result, Write};

use crate::serial::{ReadFrom, WriteTo};

/// A 32-bit integer written as 7-bit groups, least significant group first.
///
/// Negative values always take the full five bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarInt(pub i32);

impl VarInt {
    /// The maximum number of bytes a `VarInt` can occupy.
    pub const MAX_SIZE: usize = 5;

    /// Number of bytes this value occupies once written.
    #[must_use]
    pub const fn written_size(self) -> usize {
        let bits = 32 - (self.0 as u32).leading_zeros() as usize;
        if bits == 0 { 1 } else { bits.div_ceil(7) }
    }

    /// Reads a `VarInt` that is used as a length or count and must not be negative.
    pub fn read_len(data: &mut impl Read) -> Result<usize> {
        let VarInt(len) = Self::read(data)?;
        usize::try_from(len).map_err(|_| {
            Error::new(ErrorKind::InvalidData, format!("Negative length prefix {len}"))
        })
    }
}

impl From<i32> for VarInt {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl WriteTo for VarInt {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        let mut value = self.0 as u32;
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                return writer.write_all(&[byte]);
            }
            writer.write_all(&[byte | 0x80])?;
        }
    }
}

impl ReadFrom for VarInt {
    fn read(data: &mut impl Read) -> Result<Self> {
        let mut value = 0u32;
        for i in 0..Self::MAX_SIZE {
            let byte = u8::read(data)?;
            value |= u32::from(byte & 0x7F) << (i * 7);
            if byte & 0x80 == 0 {
                return Ok(Self(value as i32));
            }
        }
        Err(Error::new(ErrorKind::InvalidData, "VarInt is too big"))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn encode(value: i32) -> Vec<u8> {
        let mut buf = Vec::new();
        VarInt(value).write(&mut buf).expect("writing to a Vec cannot fail");
        buf
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode(0), [0x00]);
        assert_eq!(encode(1), [0x01]);
        assert_eq!(encode(127), [0x7F]);
        assert_eq!(encode(128), [0x80, 0x01]);
        assert_eq!(encode(255), [0xFF, 0x01]);
        assert_eq!(encode(2_147_483_647), [0xFF, 0xFF, 0xFF, 0xFF, 0x07]);
        assert_eq!(encode(-1), [0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn test_written_size_matches_encoding() {
        for value in [0, 1, 127, 128, 16_383, 16_384, i32::MAX, -1, i32::MIN] {
            assert_eq!(VarInt(value).written_size(), encode(value).len(), "{value}");
        }
    }

    #[test]
    fn test_rejects_overlong_input() {
        let mut data = Cursor::new(vec![0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert!(VarInt::read(&mut data).is_err());
    }

    #[test]
    fn test_read_len_rejects_negative() {
        let mut data = Cursor::new(encode(-5));
        assert!(VarInt::read_len(&mut data).is_err());

        let mut data = Cursor::new(encode(300));
        assert_eq!(VarInt::read_len(&mut data).expect("valid length"), 300);
    }
}
