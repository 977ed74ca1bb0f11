//! Stateful encoding of DICOM content into a writer.

use dicomkit_core::header::{DataElementHeader, Length};
use dicomkit_core::{Tag, VR};
use dicomkit_encoding::encode::basic::BasicEncoder;
use dicomkit_encoding::encode::explicit_le::ExplicitVRLittleEndianEncoder;
use dicomkit_encoding::encode::{self, BasicEncode};
use dicomkit_encoding::transfer_syntax::{DynEncoder, TransferSyntax};
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};
use std::io::Write;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not encode header of element {}", tag))]
    EncodeHeader {
        tag: Tag,
        #[snafu(backtrace)]
        source: encode::Error,
    },
    #[snafu(display("Could not encode item delimitation"))]
    EncodeDelimiter {
        #[snafu(backtrace)]
        source: encode::Error,
    },
    #[snafu(display("Could not write value of element {}", tag))]
    WriteValue {
        tag: Tag,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Value of {} has {} bytes, which cannot be encoded", tag, len))]
    ValueTooLong {
        tag: Tag,
        len: usize,
        backtrace: Backtrace,
    },
    #[snafu(display("Unsupported transfer syntax {} ({})", name, uid))]
    UnsupportedTransferSyntax {
        uid: &'static str,
        name: &'static str,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A stateful encoder of DICOM content,
/// binding a header encoder and a byte order to a destination.
pub struct StatefulEncoder<W> {
    to: W,
    encoder: DynEncoder<W>,
    basic: BasicEncoder,
    bytes_written: u64,
}

impl<W> std::fmt::Debug for StatefulEncoder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatefulEncoder")
            .field("basic", &self.basic)
            .field("bytes_written", &self.bytes_written)
            .finish()
    }
}

impl<W> StatefulEncoder<W>
where
    W: Write,
{
    /// Create a new stateful encoder from its parts.
    pub fn new(to: W, encoder: DynEncoder<W>, basic: BasicEncoder) -> Self {
        StatefulEncoder {
            to,
            encoder,
            basic,
            bytes_written: 0,
        }
    }

    /// Create a new stateful encoder for the given transfer syntax.
    pub fn new_with_ts<B>(to: W, ts: &TransferSyntax<B>) -> Result<Self> {
        let encoder = ts.encoder_for().context(UnsupportedTransferSyntaxSnafu {
            uid: ts.uid(),
            name: ts.name(),
        })?;
        Ok(Self::new(to, encoder, BasicEncoder::new(ts.endianness())))
    }

    /// Create a new stateful encoder for the file meta group,
    /// which is always in _Explicit VR Little Endian_.
    pub fn file_header_encoder(to: W) -> Self {
        Self::new(
            to,
            Box::new(ExplicitVRLittleEndianEncoder::default()),
            BasicEncoder::new(dicomkit_encoding::Endianness::Little),
        )
    }

    /// The basic encoder, for writing numbers in this stream's byte order.
    pub fn basic(&self) -> BasicEncoder {
        self.basic
    }

    /// The number of bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Retrieve the underlying writer.
    pub fn into_inner(self) -> W {
        self.to
    }

    /// Encode and write a data element header.
    pub fn encode_element_header(&mut self, header: DataElementHeader) -> Result<()> {
        let bytes = self
            .encoder
            .encode_element_header(&mut self.to, header)
            .context(EncodeHeaderSnafu { tag: header.tag })?;
        self.bytes_written += bytes as u64;
        Ok(())
    }

    /// Encode and write an item header.
    pub fn encode_item_header(&mut self, len: Length) -> Result<()> {
        self.encoder
            .encode_item_header(&mut self.to, len.0)
            .context(EncodeDelimiterSnafu)?;
        self.bytes_written += 8;
        Ok(())
    }

    /// Encode and write an item delimiter.
    pub fn encode_item_delimiter(&mut self) -> Result<()> {
        self.encoder
            .encode_item_delimiter(&mut self.to)
            .context(EncodeDelimiterSnafu)?;
        self.bytes_written += 8;
        Ok(())
    }

    /// Encode and write a sequence delimiter.
    pub fn encode_sequence_delimiter(&mut self) -> Result<()> {
        self.encoder
            .encode_sequence_delimiter(&mut self.to)
            .context(EncodeDelimiterSnafu)?;
        self.bytes_written += 8;
        Ok(())
    }

    /// Write raw bytes which belong to the value of the element `tag`.
    pub fn write_bytes(&mut self, tag: Tag, bytes: &[u8]) -> Result<()> {
        self.to.write_all(bytes).context(WriteValueSnafu { tag })?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Write a whole primitive element:
    /// its header with an even length, the value,
    /// and a trailing padding byte when the value has an odd length.
    pub fn write_element(&mut self, tag: Tag, vr: VR, value: &[u8]) -> Result<()> {
        let padded = value.len() + (value.len() & 1);
        let len = u32::try_from(padded)
            .ok()
            .filter(|l| *l != u32::MAX)
            .context(ValueTooLongSnafu { tag, len: padded })?;
        self.encode_element_header(DataElementHeader::new(tag, vr, Length(len)))?;
        self.write_bytes(tag, value)?;
        if value.len() & 1 == 1 {
            self.write_bytes(tag, &[vr.padding_byte()])?;
        }
        Ok(())
    }

    /// Write a 32-bit unsigned integer in this stream's byte order.
    pub fn write_ul(&mut self, tag: Tag, value: u32) -> Result<()> {
        self.basic
            .encode_ul(&mut self.to, value)
            .context(WriteValueSnafu { tag })?;
        self.bytes_written += 4;
        Ok(())
    }
}
