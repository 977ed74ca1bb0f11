//! Interpretation of DICOM data sets as streams of tokens.
//!
//! A data set is read as a flat sequence of [`DataToken`]s:
//! element headers followed by their value,
//! and start/end markers around sequences, items and pixel sequences.
//! The same tokens drive the [`DataSetWriter`].
use dicomkit_core::header::{DataElementHeader, Length};
use dicomkit_core::Tag;
use std::fmt;

pub mod read;
pub mod write;

pub use self::read::{DataSetReader, DataSetReaderOptions};
pub use self::write::DataSetWriter;

/// A token of a DICOM data set stream.
///
/// Value payloads borrow from the source (or the data being written).
/// Offsets are absolute byte positions in the source stream
/// and are ignored when writing.
#[derive(Debug, Clone)]
pub enum DataToken<'a> {
    /// The header of a primitive element, followed by its value.
    ElementHeader {
        header: DataElementHeader,
        offset: u64,
    },
    /// The value of the last primitive element header.
    PrimitiveValue(&'a [u8]),
    /// The beginning of a sequence element.
    SequenceStart { tag: Tag, len: Length, offset: u64 },
    /// The beginning of an encapsulated pixel data element.
    PixelSequenceStart { tag: Tag, offset: u64 },
    /// The end of a sequence or a pixel sequence.
    SequenceEnd,
    /// The beginning of a new item in the sequence.
    ItemStart { len: Length, offset: u64 },
    /// The end of an item.
    ItemEnd,
    /// The basic offset table of a pixel sequence,
    /// empty if the first item has no value.
    OffsetTable(Vec<u32>),
    /// A pixel data fragment.
    /// The offset is that of the fragment's item header.
    ItemValue { data: &'a [u8], offset: u64 },
}

impl fmt::Display for DataToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataToken::PrimitiveValue(v) => write!(f, "PrimitiveValue({} bytes)", v.len()),
            DataToken::ItemValue { data, .. } => write!(f, "ItemValue({} bytes)", data.len()),
            other => write!(f, "{:?}", other),
        }
    }
}

/// This implementation treats undefined lengths as equal.
impl PartialEq<Self> for DataToken<'_> {
    fn eq(&self, other: &Self) -> bool {
        use DataToken::*;
        match (self, other) {
            (
                ElementHeader {
                    header: h1,
                    offset: o1,
                },
                ElementHeader {
                    header: h2,
                    offset: o2,
                },
            ) => h1.tag == h2.tag && h1.vr == h2.vr && h1.len.inner_eq(h2.len) && o1 == o2,
            (
                SequenceStart {
                    tag: tag1,
                    len: len1,
                    offset: o1,
                },
                SequenceStart {
                    tag: tag2,
                    len: len2,
                    offset: o2,
                },
            ) => tag1 == tag2 && len1.inner_eq(*len2) && o1 == o2,
            (
                PixelSequenceStart {
                    tag: tag1,
                    offset: o1,
                },
                PixelSequenceStart {
                    tag: tag2,
                    offset: o2,
                },
            ) => tag1 == tag2 && o1 == o2,
            (ItemStart { len: len1, offset: o1 }, ItemStart { len: len2, offset: o2 }) => {
                len1.inner_eq(*len2) && o1 == o2
            }
            (PrimitiveValue(v1), PrimitiveValue(v2)) => v1 == v2,
            (OffsetTable(t1), OffsetTable(t2)) => t1 == t2,
            (
                ItemValue {
                    data: d1,
                    offset: o1,
                },
                ItemValue {
                    data: d2,
                    offset: o2,
                },
            ) => d1 == d2 && o1 == o2,
            (ItemEnd, ItemEnd) | (SequenceEnd, SequenceEnd) => true,
            _ => false,
        }
    }
}

/// The type of delimiter: sequence or item.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SeqTokenType {
    Sequence,
    Item,
}
