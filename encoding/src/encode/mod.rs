//! This module contains all DICOM data element encoding logic.

use byteordered::Endianness;
use dicomkit_core::header::DataElementHeader;
use dicomkit_core::{Tag, VR};
use snafu::{Backtrace, Snafu};
use std::io::{self, Write};

pub mod basic;
pub mod explicit_be;
pub mod explicit_le;
pub mod implicit_le;

/// Module-level error type:
/// for errors which may occur while encoding DICOM data.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Failed to write Data Set tag"))]
    WriteTag {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write header of element {}", tag))]
    WriteHeader {
        tag: Tag,
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write item header"))]
    WriteItemHeader {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write item delimiter"))]
    WriteItemDelimiter {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write sequence delimiter"))]
    WriteSequenceDelimiter {
        backtrace: Backtrace,
        source: io::Error,
    },
    /// The value does not fit in the 16-bit length field of its representation.
    #[snafu(display("Value of {} ({}) is too long: {} bytes", tag, vr, len))]
    ValueTooLong {
        tag: Tag,
        vr: VR,
        len: u32,
        backtrace: Backtrace,
    },
    /// Synthetic representations and undefined lengths
    /// cannot be written as a primitive element header.
    #[snafu(display("Cannot encode header of {} with representation {}", tag, vr))]
    UnencodableHeader {
        tag: Tag,
        vr: VR,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Type trait for an encoder of basic data properties.
/// Unlike `Encode` (and similar to `BasicDecode`), this trait is not object
/// safe because it's better to just provide a dynamic implementation.
pub trait BasicEncode {
    /// Retrieve the encoder's endianness.
    fn endianness(&self) -> Endianness;

    /// Encode an unsigned short value to the given writer.
    fn encode_us<W>(&self, to: W, value: u16) -> io::Result<()>
    where
        W: Write;

    /// Encode an unsigned long value to the given writer.
    fn encode_ul<W>(&self, to: W, value: u32) -> io::Result<()>
    where
        W: Write;

    /// Encode an unsigned very long value to the given writer.
    fn encode_uv<W>(&self, to: W, value: u64) -> io::Result<()>
    where
        W: Write;

    /// Encode a signed short value to the given writer.
    fn encode_ss<W>(&self, to: W, value: i16) -> io::Result<()>
    where
        W: Write;

    /// Encode a signed long value to the given writer.
    fn encode_sl<W>(&self, to: W, value: i32) -> io::Result<()>
    where
        W: Write;

    /// Encode a signed very long value to the given writer.
    fn encode_sv<W>(&self, to: W, value: i64) -> io::Result<()>
    where
        W: Write;

    /// Encode a single precision float value to the given writer.
    fn encode_fl<W>(&self, to: W, value: f32) -> io::Result<()>
    where
        W: Write;

    /// Encode a double precision float value to the given writer.
    fn encode_fd<W>(&self, to: W, value: f64) -> io::Result<()>
    where
        W: Write;

    /// Encode a DICOM attribute tag (group, then element).
    fn encode_tag<W>(&self, mut to: W, tag: Tag) -> io::Result<()>
    where
        W: Write,
    {
        self.encode_us(&mut to, tag.group())?;
        self.encode_us(to, tag.element())
    }
}

/// Type trait for a data element encoder.
pub trait Encode {
    /// Encode and write an element tag.
    fn encode_tag<W>(&self, to: W, tag: Tag) -> Result<()>
    where
        W: Write;

    /// Encode and write a data element header to the given destination.
    /// Returns the number of bytes effectively written on success.
    ///
    /// The synthetic `PX` representation is written as `OB`.
    fn encode_element_header<W>(&self, to: W, de: DataElementHeader) -> Result<usize>
    where
        W: Write;

    /// Encode and write a DICOM sequence item header to the given destination.
    fn encode_item_header<W>(&self, to: W, len: u32) -> Result<()>
    where
        W: Write;

    /// Encode and write a DICOM sequence item delimiter to the given destination.
    fn encode_item_delimiter<W>(&self, to: W) -> Result<()>
    where
        W: Write;

    /// Encode and write a DICOM sequence delimiter to the given destination.
    fn encode_sequence_delimiter<W>(&self, to: W) -> Result<()>
    where
        W: Write;
}

/// Type trait for a data element encoder to a single known writer type `W`.
///
/// Unlike [`Encode`], this trait is object safe.
pub trait EncodeTo<W: ?Sized> {
    /// Encode and write an element tag.
    fn encode_tag(&self, to: &mut W, tag: Tag) -> Result<()>;

    /// Encode and write a data element header to the given destination.
    /// Returns the number of bytes effectively written on success.
    fn encode_element_header(&self, to: &mut W, de: DataElementHeader) -> Result<usize>;

    /// Encode and write a DICOM sequence item header to the given destination.
    fn encode_item_header(&self, to: &mut W, len: u32) -> Result<()>;

    /// Encode and write a DICOM sequence item delimiter to the given destination.
    fn encode_item_delimiter(&self, to: &mut W) -> Result<()>;

    /// Encode and write a DICOM sequence delimiter to the given destination.
    fn encode_sequence_delimiter(&self, to: &mut W) -> Result<()>;
}

impl<T: ?Sized, W: ?Sized> EncodeTo<W> for Box<T>
where
    T: EncodeTo<W>,
{
    fn encode_tag(&self, to: &mut W, tag: Tag) -> Result<()> {
        (**self).encode_tag(to, tag)
    }

    fn encode_element_header(&self, to: &mut W, de: DataElementHeader) -> Result<usize> {
        (**self).encode_element_header(to, de)
    }

    fn encode_item_header(&self, to: &mut W, len: u32) -> Result<()> {
        (**self).encode_item_header(to, len)
    }

    fn encode_item_delimiter(&self, to: &mut W) -> Result<()> {
        (**self).encode_item_delimiter(to)
    }

    fn encode_sequence_delimiter(&self, to: &mut W) -> Result<()> {
        (**self).encode_sequence_delimiter(to)
    }
}

/// Implement [`EncodeTo`] for every writer type
/// in terms of the encoder's [`Encode`] implementation.
macro_rules! impl_encode_to {
    ($t: ty) => {
        impl<W: ?Sized> $crate::encode::EncodeTo<W> for $t
        where
            W: std::io::Write,
        {
            fn encode_tag(&self, to: &mut W, tag: dicomkit_core::Tag) -> $crate::encode::Result<()> {
                $crate::encode::Encode::encode_tag(self, to, tag)
            }

            fn encode_element_header(
                &self,
                to: &mut W,
                de: dicomkit_core::header::DataElementHeader,
            ) -> $crate::encode::Result<usize> {
                $crate::encode::Encode::encode_element_header(self, to, de)
            }

            fn encode_item_header(&self, to: &mut W, len: u32) -> $crate::encode::Result<()> {
                $crate::encode::Encode::encode_item_header(self, to, len)
            }

            fn encode_item_delimiter(&self, to: &mut W) -> $crate::encode::Result<()> {
                $crate::encode::Encode::encode_item_delimiter(self, to)
            }

            fn encode_sequence_delimiter(&self, to: &mut W) -> $crate::encode::Result<()> {
                $crate::encode::Encode::encode_sequence_delimiter(self, to)
            }
        }
    };
}

pub(crate) use impl_encode_to;

/// The value representation to put in an explicit VR header,
/// checking that the header can be encoded at all.
pub(crate) fn explicit_header_vr(de: &DataElementHeader) -> Result<VR> {
    use snafu::ensure;
    let vr = match de.vr {
        VR::PX => VR::OB,
        VR::NONE => return UnencodableHeaderSnafu { tag: de.tag, vr: de.vr }.fail(),
        vr => vr,
    };
    ensure!(
        vr.has_explicit_32bit_length() || de.len.0 <= u32::from(u16::MAX),
        ValueTooLongSnafu {
            tag: de.tag,
            vr,
            len: de.len.0,
        }
    );
    Ok(vr)
}
