//! Stateful decoding over an in-memory DICOM byte stream.
//!
//! The decoder keeps the whole stream as a byte slice,
//! so that values and pixel data fragments can be
//! handed out as sub-slices without copying.

use dicomkit_core::header::{DataElementHeader, Length, SequenceItemHeader};
use dicomkit_core::Tag;
use dicomkit_encoding::decode::basic::BasicDecoder;
use dicomkit_encoding::decode::explicit_le::ExplicitVRLittleEndianDecoder;
use dicomkit_encoding::decode::{self, BasicDecode};
use dicomkit_encoding::transfer_syntax::{DynDecoder, TransferSyntax};
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};
use tracing::warn;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not decode element header at offset {:#x}", position))]
    DecodeElementHeader {
        position: u64,
        #[snafu(backtrace)]
        source: decode::Error,
    },
    #[snafu(display("Could not decode item header at offset {:#x}", position))]
    DecodeItemHeader {
        position: u64,
        #[snafu(backtrace)]
        source: decode::Error,
    },
    #[snafu(display(
        "Value of {} bytes at offset {:#x} exceeds the {} remaining bytes",
        len,
        position,
        available
    ))]
    ValueOutOfBounds {
        position: u64,
        len: u32,
        available: usize,
        backtrace: Backtrace,
    },
    #[snafu(display("Could not read {} bytes at offset {:#x}", len, position))]
    ReadNumber {
        position: u64,
        len: u32,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Unsupported transfer syntax {} ({})", name, uid))]
    UnsupportedTransferSyntax {
        uid: &'static str,
        name: &'static str,
        backtrace: Backtrace,
    },
}

impl Error {
    /// The absolute byte offset in the stream where the fault was found.
    pub fn position(&self) -> Option<u64> {
        match self {
            Error::DecodeElementHeader { position, .. }
            | Error::DecodeItemHeader { position, .. }
            | Error::ValueOutOfBounds { position, .. }
            | Error::ReadNumber { position, .. } => Some(*position),
            Error::UnsupportedTransferSyntax { .. } => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A stateful decoder of a DICOM data set held in memory.
///
/// Element headers are decoded with the transfer syntax' header codec,
/// while the byte order of numbers
/// is handled by the accompanying basic decoder.
pub struct StatefulDecoder<'a> {
    data: &'a [u8],
    position: usize,
    base_offset: u64,
    decoder: DynDecoder<&'a [u8]>,
    basic: BasicDecoder,
}

impl std::fmt::Debug for StatefulDecoder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatefulDecoder")
            .field("len", &self.data.len())
            .field("position", &self.position)
            .field("base_offset", &self.base_offset)
            .field("basic", &self.basic)
            .finish()
    }
}

impl<'a> StatefulDecoder<'a> {
    /// Create a new stateful decoder from its parts.
    ///
    /// `base_offset` is the absolute position of `data[0]`
    /// in the original stream, used for reporting.
    pub fn new(
        data: &'a [u8],
        decoder: DynDecoder<&'a [u8]>,
        basic: BasicDecoder,
        base_offset: u64,
    ) -> Self {
        StatefulDecoder {
            data,
            position: 0,
            base_offset,
            decoder,
            basic,
        }
    }

    /// Create a new stateful decoder for data in the given transfer syntax.
    pub fn new_with_ts<B>(data: &'a [u8], ts: &TransferSyntax<B>, base_offset: u64) -> Result<Self> {
        let decoder = ts.decoder_for().context(UnsupportedTransferSyntaxSnafu {
            uid: ts.uid(),
            name: ts.name(),
        })?;
        Ok(Self::new(data, decoder, ts.basic_decoder(), base_offset))
    }

    /// Create a new stateful decoder for the file meta group,
    /// which is always in _Explicit VR Little Endian_.
    pub fn file_header_decoder(data: &'a [u8], base_offset: u64) -> Self {
        Self::new(
            data,
            Box::new(ExplicitVRLittleEndianDecoder::default()),
            BasicDecoder::LE(Default::default()),
            base_offset,
        )
    }

    /// The absolute position of the decoder in the stream.
    pub fn position(&self) -> u64 {
        self.base_offset + self.position as u64
    }

    /// The position relative to the start of the held data.
    pub fn local_position(&self) -> usize {
        self.position
    }

    /// The bytes which were not consumed yet.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    /// Whether all bytes were consumed.
    pub fn is_at_end(&self) -> bool {
        self.position >= self.data.len()
    }

    /// The basic decoder, for interpreting values in this stream's byte order.
    pub fn basic(&self) -> BasicDecoder {
        self.basic
    }

    /// Consume every remaining byte.
    pub fn skip_to_end(&mut self) {
        self.position = self.data.len();
    }

    /// Decode the next data element header.
    ///
    /// A 4-byte length which overruns the stream
    /// while the 2-byte length field would fit
    /// is taken to come from a writer
    /// which used the short header layout for a long VR,
    /// and the header is read again as such.
    pub fn decode_header(&mut self) -> Result<DataElementHeader> {
        let start = self.position;
        let mut source = self.remaining();
        let (mut header, bytes_read) =
            self.decoder
                .decode_header(&mut source)
                .context(DecodeElementHeaderSnafu {
                    position: self.position(),
                })?;
        self.position = start + bytes_read;

        if bytes_read == 12 {
            if let Some(len) = header.len.get() {
                let available = self.data.len() - self.position;
                if len as usize > available {
                    let short = &self.data[start + 6..start + 8];
                    let short_len = self.basic.decode_us(short).context(ReadNumberSnafu {
                        position: self.base_offset + start as u64 + 6,
                        len: 2_u32,
                    })?;
                    if usize::from(short_len) <= self.data.len() - (start + 8) {
                        warn!(
                            "Element {} at offset {:#x} declares {} bytes, using 2-byte length {}",
                            header.tag,
                            self.base_offset + start as u64,
                            len,
                            short_len
                        );
                        header.len = Length(u32::from(short_len));
                        self.position = start + 8;
                    }
                }
            }
        }

        Ok(header)
    }

    /// Decode the next item header or sequence delimiter.
    pub fn decode_item_header(&mut self) -> Result<SequenceItemHeader> {
        let mut source = self.remaining();
        let header = self
            .decoder
            .decode_item_header(&mut source)
            .context(DecodeItemHeaderSnafu {
                position: self.position(),
            })?;
        self.position += 8;
        Ok(header)
    }

    /// Peek the next tag without consuming it.
    pub fn peek_tag(&self) -> Option<Tag> {
        let mut source = self.remaining();
        self.decoder.decode_tag(&mut source).ok()
    }

    /// Whether the next 8 bytes are all zeros,
    /// which marks trailing padding after the data set.
    pub fn at_zero_padding(&self) -> bool {
        let rest = self.remaining();
        rest.len() >= 8 && rest[..8].iter().all(|&b| b == 0)
    }

    /// Take the next `len` bytes as a value.
    pub fn read_value_bytes(&mut self, len: u32) -> Result<&'a [u8]> {
        let available = self.data.len() - self.position;
        if len as usize > available {
            return ValueOutOfBoundsSnafu {
                position: self.position(),
                len,
                available,
            }
            .fail();
        }
        let value = &self.data[self.position..self.position + len as usize];
        self.position += len as usize;
        Ok(value)
    }

    /// Read `len` bytes as a list of 32-bit unsigned integers,
    /// as found in a basic offset table.
    pub fn read_u32_vec(&mut self, len: u32) -> Result<Vec<u32>> {
        let position = self.position();
        let bytes = self.read_value_bytes(len)?;
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                self.basic
                    .decode_ul(chunk)
                    .context(ReadNumberSnafu { position, len })
            })
            .collect()
    }
}
