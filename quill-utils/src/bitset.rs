//! A growable bit set with two wire layouts: a fixed little-endian byte field
//! (acknowledgment windows) and a prefixed array of 64-bit words (filter masks).

use std::io::{Error, ErrorKind, Read, Result, Write};

use smallvec::SmallVec;

use crate::codec::VarInt;
use crate::serial::{ReadFrom, WriteTo};

/// Bit set stored as 64-bit words, lowest bit first.
///
/// Trailing zero words are never kept, so two sets with the same bits compare equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: SmallVec<[u64; 1]>,
}

impl BitSet {
    /// Creates an empty bit set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bit set from raw words, lowest bits first.
    #[must_use]
    pub fn from_words(words: &[u64]) -> Self {
        let mut set = Self {
            words: SmallVec::from_slice(words),
        };
        set.trim();
        set
    }

    /// The backing words, lowest bits first, without trailing zero words.
    #[must_use]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Returns whether bit `index` is set.
    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        self.words
            .get(index / 64)
            .is_some_and(|word| word & (1 << (index % 64)) != 0)
    }

    /// Sets bit `index`.
    pub fn set(&mut self, index: usize) {
        let word = index / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (index % 64);
    }

    /// Clears bit `index`.
    pub fn clear(&mut self, index: usize) {
        if let Some(word) = self.words.get_mut(index / 64) {
            *word &= !(1 << (index % 64));
            self.trim();
        }
    }

    /// Index of the highest set bit plus one, or 0 when no bit is set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.last().map_or(0, |last| {
            (self.words.len() - 1) * 64 + (64 - last.leading_zeros() as usize)
        })
    }

    /// Returns whether no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of set bits.
    #[must_use]
    pub fn cardinality(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Iterates the indices of set bits in increasing order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(|&index| self.get(index))
    }

    /// Writes exactly `size.div_ceil(8)` bytes, bit `i` in byte `i / 8`.
    ///
    /// Fails if a bit at or above `size` is set.
    pub fn write_fixed(&self, writer: &mut impl Write, size: usize) -> Result<()> {
        if self.len() > size {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("BitSet is larger than expected size ({} > {size})", self.len()),
            ));
        }
        let bytes: Vec<u8> = (0..size.div_ceil(8))
            .map(|i| {
                self.words
                    .get(i / 8)
                    .map_or(0, |word| (word >> ((i % 8) * 8)) as u8)
            })
            .collect();
        writer.write_all(&bytes)
    }

    /// Reads a bit set written by [`write_fixed`](Self::write_fixed) with the same `size`.
    pub fn read_fixed(data: &mut impl Read, size: usize) -> Result<Self> {
        let mut bytes = vec![0u8; size.div_ceil(8)];
        data.read_exact(&mut bytes)?;
        let mut words: SmallVec<[u64; 1]> = SmallVec::from_elem(0, bytes.len().div_ceil(8));
        for (i, byte) in bytes.into_iter().enumerate() {
            words[i / 8] |= u64::from(byte) << ((i % 8) * 8);
        }
        let mut set = Self { words };
        set.trim();
        Ok(set)
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = Self::new();
        for index in iter {
            set.set(index);
        }
        set
    }
}

impl WriteTo for BitSet {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        VarInt(self.words.len() as i32).write(writer)?;
        for word in &self.words {
            (*word as i64).write(writer)?;
        }
        Ok(())
    }
}

impl ReadFrom for BitSet {
    fn read(data: &mut impl Read) -> Result<Self> {
        let len = VarInt::read_len(data)?;
        // A VarInt-prefixed array larger than a packet cannot be legitimate.
        if len > 0x20_0000 / 8 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("BitSet with {len} words is too large"),
            ));
        }
        let words = (0..len)
            .map(|_| i64::read(data).map(|word| word as u64))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_words(&words))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_len_and_cardinality() {
        let mut set = BitSet::new();
        assert_eq!(set.len(), 0);
        assert!(set.is_empty());

        set.set(3);
        set.set(70);
        assert_eq!(set.len(), 71);
        assert_eq!(set.cardinality(), 2);
        assert_eq!(set.iter_ones().collect::<Vec<_>>(), vec![3, 70]);

        set.clear(70);
        assert_eq!(set.len(), 4);
        assert_eq!(set.words(), &[0b1000]);
    }

    #[test]
    fn test_fixed_layout_is_little_endian_bytes() {
        let set: BitSet = [0, 9, 19].into_iter().collect();
        let mut buf = Vec::new();
        set.write_fixed(&mut buf, 20).expect("fits in 20 bits");
        assert_eq!(buf, [0b0000_0001, 0b0000_0010, 0b0000_1000]);

        let read = BitSet::read_fixed(&mut Cursor::new(buf), 20).expect("three bytes");
        assert_eq!(read, set);
    }

    #[test]
    fn test_fixed_rejects_oversized_set() {
        let set: BitSet = [20].into_iter().collect();
        assert!(set.write_fixed(&mut Vec::new(), 20).is_err());
    }

    #[test]
    fn test_word_layout() {
        let set: BitSet = [1, 64].into_iter().collect();
        let mut buf = Vec::new();
        set.write(&mut buf).expect("writing to a Vec cannot fail");
        assert_eq!(buf.len(), 1 + 16);
        assert_eq!(buf[0], 2);
        assert_eq!(BitSet::read(&mut Cursor::new(buf)).expect("valid"), set);
    }
}
