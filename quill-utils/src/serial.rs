//! Wire serialization traits and the primitive encodings shared by all packets.
//!
//! Integers are big-endian, UUIDs are their 16 raw bytes, instants are epoch
//! milliseconds as an `i64`, strings and byte arrays carry a [`VarInt`] length
//! prefix.

use std::io::{Error, ErrorKind, Read, Result, Write};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::codec::VarInt;

/// A value that can be written to the wire.
pub trait WriteTo {
    /// Writes `self` to `writer`.
    fn write(&self, writer: &mut impl Write) -> Result<()>;
}

/// A value that can be read back from the wire.
pub trait ReadFrom: Sized {
    /// Reads a value from `data`.
    fn read(data: &mut impl Read) -> Result<Self>;
}

fn invalid(msg: String) -> Error {
    Error::new(ErrorKind::InvalidData, msg)
}

macro_rules! impl_be_int {
    ($($ty:ty),*) => {
        $(
            impl WriteTo for $ty {
                fn write(&self, writer: &mut impl Write) -> Result<()> {
                    writer.write_all(&self.to_be_bytes())
                }
            }

            impl ReadFrom for $ty {
                fn read(data: &mut impl Read) -> Result<Self> {
                    let mut buf = [0u8; size_of::<$ty>()];
                    data.read_exact(&mut buf)?;
                    Ok(<$ty>::from_be_bytes(buf))
                }
            }
        )*
    };
}

impl_be_int!(u8, i8, i32, i64, u64);

impl WriteTo for bool {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        u8::from(*self).write(writer)
    }
}

impl ReadFrom for bool {
    fn read(data: &mut impl Read) -> Result<Self> {
        match u8::read(data)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(invalid(format!("Invalid boolean byte {other}"))),
        }
    }
}

impl WriteTo for Uuid {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(self.as_bytes())
    }
}

impl ReadFrom for Uuid {
    fn read(data: &mut impl Read) -> Result<Self> {
        let mut buf = [0u8; 16];
        data.read_exact(&mut buf)?;
        Ok(Uuid::from_bytes(buf))
    }
}

impl WriteTo for DateTime<Utc> {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        self.timestamp_millis().write(writer)
    }
}

impl ReadFrom for DateTime<Utc> {
    fn read(data: &mut impl Read) -> Result<Self> {
        let millis = i64::read(data)?;
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| invalid(format!("Instant {millis} is out of range")))
    }
}

impl<T: WriteTo> WriteTo for Option<T> {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        match self {
            Some(value) => {
                true.write(writer)?;
                value.write(writer)
            }
            None => false.write(writer),
        }
    }
}

impl<T: ReadFrom> ReadFrom for Option<T> {
    fn read(data: &mut impl Read) -> Result<Self> {
        if bool::read(data)? {
            Ok(Some(T::read(data)?))
        } else {
            Ok(None)
        }
    }
}

/// Writes a string whose length in UTF-16 code units may not exceed `max_len`.
pub fn write_bounded_str(writer: &mut impl Write, value: &str, max_len: usize) -> Result<()> {
    let units = value.encode_utf16().count();
    if units > max_len {
        return Err(invalid(format!(
            "String too big (was {units} characters, max {max_len})"
        )));
    }
    write_byte_array(writer, value.as_bytes())
}

/// Reads a string written by [`write_bounded_str`] with the same `max_len`.
pub fn read_bounded_string(data: &mut impl Read, max_len: usize) -> Result<String> {
    let bytes = read_byte_array(data, max_len * 3)?;
    let value = String::from_utf8(bytes)
        .map_err(|e| invalid(format!("String is not valid UTF-8: {e}")))?;
    let units = value.encode_utf16().count();
    if units > max_len {
        return Err(invalid(format!(
            "The received string was longer than the maximum allowed ({units} > {max_len})"
        )));
    }
    Ok(value)
}

/// Writes a [`VarInt`]-prefixed byte array.
pub fn write_byte_array(writer: &mut impl Write, bytes: &[u8]) -> Result<()> {
    VarInt(bytes.len() as i32).write(writer)?;
    writer.write_all(bytes)
}

/// Reads a [`VarInt`]-prefixed byte array of at most `max_len` bytes.
pub fn read_byte_array(data: &mut impl Read, max_len: usize) -> Result<Vec<u8>> {
    let len = VarInt::read_len(data)?;
    if len > max_len {
        return Err(invalid(format!(
            "ByteArray with size {len} is bigger than allowed {max_len}"
        )));
    }
    let mut bytes = vec![0u8; len];
    data.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// Writes a [`VarInt`]-prefixed list, refusing more than `max_len` elements.
pub fn write_list<T: WriteTo>(writer: &mut impl Write, items: &[T], max_len: usize) -> Result<()> {
    if items.len() > max_len {
        return Err(invalid(format!(
            "List with {} elements is bigger than allowed {max_len}",
            items.len()
        )));
    }
    VarInt(items.len() as i32).write(writer)?;
    for item in items {
        item.write(writer)?;
    }
    Ok(())
}

/// Reads a [`VarInt`]-prefixed list of at most `max_len` elements.
pub fn read_list<T: ReadFrom>(data: &mut impl Read, max_len: usize) -> Result<Vec<T>> {
    let len = VarInt::read_len(data)?;
    if len > max_len {
        return Err(invalid(format!(
            "List with size {len} is bigger than allowed {max_len}"
        )));
    }
    (0..len).map(|_| T::read(data)).collect()
}
