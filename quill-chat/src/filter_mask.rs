//! Redaction masks applied on top of signed content.

use std::borrow::Cow;
use std::io::{Error, ErrorKind, Read, Result, Write};

use quill_utils::BitSet;
use quill_utils::codec::VarInt;
use quill_utils::serial::{ReadFrom, WriteTo};

/// Character shown in place of a filtered one.
pub const FILTERED_CHAR: char = '#';

/// Which characters of a message a filter hid. The signed content is never changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FilterMask {
    /// Nothing is filtered.
    #[default]
    PassThrough,
    /// The whole message is hidden.
    FullyFiltered,
    /// Characters whose bit is set are hidden.
    PartiallyFiltered(BitSet),
}

impl FilterMask {
    const PASS_THROUGH_ID: i32 = 0;
    const FULLY_FILTERED_ID: i32 = 1;
    const PARTIALLY_FILTERED_ID: i32 = 2;

    /// Masks the given character positions.
    #[must_use]
    pub fn partially(filtered: BitSet) -> Self {
        if filtered.is_empty() {
            Self::PassThrough
        } else {
            Self::PartiallyFiltered(filtered)
        }
    }

    /// Marks character `index` as filtered.
    pub fn set_filtered(&mut self, index: usize) {
        match self {
            Self::FullyFiltered => {}
            Self::PartiallyFiltered(mask) => mask.set(index),
            Self::PassThrough => *self = Self::PartiallyFiltered([index].into_iter().collect()),
        }
    }

    /// The text to display, or `None` if nothing of it may be shown.
    #[must_use]
    pub fn apply<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
        match self {
            Self::PassThrough => Some(Cow::Borrowed(text)),
            Self::FullyFiltered => None,
            Self::PartiallyFiltered(mask) => Some(Cow::Owned(
                text.chars()
                    .enumerate()
                    .map(|(i, c)| if mask.get(i) { FILTERED_CHAR } else { c })
                    .collect(),
            )),
        }
    }

    /// Whether nothing is filtered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::PassThrough)
    }

    /// Whether the whole message is hidden.
    #[must_use]
    pub const fn is_fully_filtered(&self) -> bool {
        matches!(self, Self::FullyFiltered)
    }
}

impl WriteTo for FilterMask {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        match self {
            Self::PassThrough => VarInt(Self::PASS_THROUGH_ID).write(writer),
            Self::FullyFiltered => VarInt(Self::FULLY_FILTERED_ID).write(writer),
            Self::PartiallyFiltered(mask) => {
                VarInt(Self::PARTIALLY_FILTERED_ID).write(writer)?;
                mask.write(writer)
            }
        }
    }
}

impl ReadFrom for FilterMask {
    fn read(data: &mut impl Read) -> Result<Self> {
        match VarInt::read(data)?.0 {
            Self::PASS_THROUGH_ID => Ok(Self::PassThrough),
            Self::FULLY_FILTERED_ID => Ok(Self::FullyFiltered),
            Self::PARTIALLY_FILTERED_ID => Ok(Self::PartiallyFiltered(BitSet::read(data)?)),
            other => Err(Error::new(
                ErrorKind::InvalidData,
                format!("Unknown filter mask type {other}"),
            )),
        }
    }
}
