//! Writing of a DICOM data set from a stream of tokens.
//!
//! Sequences and items are always written with undefined length,
//! closed by their delimiters.
//! Primitive values are padded to an even length,
//! so the header length is taken from the value rather than the token.
use crate::stateful::encode::{Error as EncoderError, StatefulEncoder};
use dicomkit_core::header::{DataElementHeader, Length};
use dicomkit_core::{Tag, VR};
use dicomkit_encoding::transfer_syntax::TransferSyntax;
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};
use std::io::Write;

use super::{DataToken, SeqTokenType};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not create encoder"))]
    CreateEncoder {
        #[snafu(backtrace)]
        source: EncoderError,
    },
    #[snafu(display("Could not write token {}", token))]
    WriteToken {
        token: String,
        #[snafu(backtrace)]
        source: EncoderError,
    },
    #[snafu(display("Unexpected token {}", token))]
    UnexpectedToken { token: String, backtrace: Backtrace },
    #[snafu(display("Pixel data fragment of {} bytes is too long", len))]
    FragmentTooLong { len: usize, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A writer of DICOM data set tokens.
#[derive(Debug)]
pub struct DataSetWriter<W> {
    printer: StatefulEncoder<W>,
    seq_tokens: Vec<SeqTokenType>,
    last_de: Option<DataElementHeader>,
}

impl<W> DataSetWriter<W>
where
    W: Write,
{
    /// Create a new data set writer over the given stateful encoder.
    pub fn new(printer: StatefulEncoder<W>) -> Self {
        DataSetWriter {
            printer,
            seq_tokens: Vec::new(),
            last_de: None,
        }
    }

    /// Create a new data set writer
    /// for data in the given transfer syntax.
    pub fn with_ts<B>(to: W, ts: &TransferSyntax<B>) -> Result<Self> {
        let printer = StatefulEncoder::new_with_ts(to, ts).context(CreateEncoderSnafu)?;
        Ok(Self::new(printer))
    }

    /// The number of bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.printer.bytes_written()
    }

    /// Retrieve the underlying writer.
    pub fn into_inner(self) -> W {
        self.printer.into_inner()
    }

    /// Feed the given sequence of tokens to the writer.
    pub fn write_sequence<'a, I>(&mut self, tokens: I) -> Result<()>
    where
        I: IntoIterator<Item = DataToken<'a>>,
    {
        for token in tokens {
            self.write(token)?;
        }
        Ok(())
    }

    /// Feed one token to the writer.
    pub fn write(&mut self, token: DataToken<'_>) -> Result<()> {
        let description = || token.to_string();
        match &token {
            DataToken::ElementHeader { header, .. } => {
                if self.last_de.is_some() {
                    return UnexpectedTokenSnafu {
                        token: description(),
                    }
                    .fail();
                }
                self.last_de = Some(*header);
            }
            DataToken::PrimitiveValue(value) => {
                let header = self.last_de.take().context(UnexpectedTokenSnafu {
                    token: description(),
                })?;
                self.printer
                    .write_element(header.tag, header.vr, value)
                    .context(WriteTokenSnafu {
                        token: description(),
                    })?;
            }
            DataToken::SequenceStart { tag, .. } => {
                self.write_undefined_header(*tag, VR::SQ, &token)?;
                self.seq_tokens.push(SeqTokenType::Sequence);
            }
            DataToken::PixelSequenceStart { tag, .. } => {
                self.write_undefined_header(*tag, VR::PX, &token)?;
                self.seq_tokens.push(SeqTokenType::Sequence);
            }
            DataToken::ItemStart { .. } => {
                self.printer
                    .encode_item_header(Length::UNDEFINED)
                    .context(WriteTokenSnafu {
                        token: description(),
                    })?;
                self.seq_tokens.push(SeqTokenType::Item);
            }
            DataToken::ItemEnd => {
                self.expect_open(SeqTokenType::Item, &token)?;
                self.printer
                    .encode_item_delimiter()
                    .context(WriteTokenSnafu {
                        token: description(),
                    })?;
            }
            DataToken::SequenceEnd => {
                self.expect_open(SeqTokenType::Sequence, &token)?;
                self.printer
                    .encode_sequence_delimiter()
                    .context(WriteTokenSnafu {
                        token: description(),
                    })?;
            }
            DataToken::OffsetTable(table) => {
                let len = table.len() * 4;
                let len = u32::try_from(len)
                    .ok()
                    .context(FragmentTooLongSnafu { len })?;
                self.printer
                    .encode_item_header(Length(len))
                    .context(WriteTokenSnafu {
                        token: description(),
                    })?;
                for offset in table {
                    self.printer
                        .write_ul(Tag::ITEM, *offset)
                        .context(WriteTokenSnafu {
                            token: description(),
                        })?;
                }
            }
            DataToken::ItemValue { data, .. } => {
                let padded = data.len() + (data.len() & 1);
                let len = u32::try_from(padded)
                    .ok()
                    .filter(|l| *l != u32::MAX)
                    .context(FragmentTooLongSnafu { len: padded })?;
                self.printer
                    .encode_item_header(Length(len))
                    .context(WriteTokenSnafu {
                        token: description(),
                    })?;
                self.printer
                    .write_bytes(Tag::ITEM, data)
                    .context(WriteTokenSnafu {
                        token: description(),
                    })?;
                if data.len() & 1 == 1 {
                    self.printer
                        .write_bytes(Tag::ITEM, &[0])
                        .context(WriteTokenSnafu {
                            token: description(),
                        })?;
                }
            }
        }
        Ok(())
    }

    fn write_undefined_header(&mut self, tag: Tag, vr: VR, token: &DataToken<'_>) -> Result<()> {
        self.printer
            .encode_element_header(DataElementHeader::new(tag, vr, Length::UNDEFINED))
            .context(WriteTokenSnafu {
                token: token.to_string(),
            })
    }

    fn expect_open(&mut self, typ: SeqTokenType, token: &DataToken<'_>) -> Result<()> {
        match self.seq_tokens.pop() {
            Some(open) if open == typ => Ok(()),
            _ => UnexpectedTokenSnafu {
                token: token.to_string(),
            }
            .fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::read::DataSetReader;
    use crate::stateful::decode::StatefulDecoder;

    fn writer() -> DataSetWriter<Vec<u8>> {
        DataSetWriter::new(StatefulEncoder::file_header_encoder(Vec::new()))
    }

    #[test]
    fn write_sequence_with_delimiters() {
        let mut writer = writer();
        writer
            .write_sequence(vec![
                DataToken::SequenceStart {
                    tag: Tag(0x0008, 0x1140),
                    len: Length(10),
                    offset: 0,
                },
                DataToken::ItemStart {
                    len: Length(2),
                    offset: 0,
                },
                DataToken::ElementHeader {
                    header: DataElementHeader::new(Tag(0x0008, 0x1155), VR::UI, Length(1)),
                    offset: 0,
                },
                DataToken::PrimitiveValue(b"1"),
                DataToken::ItemEnd,
                DataToken::SequenceEnd,
            ])
            .unwrap();
        let out = writer.into_inner();

        #[rustfmt::skip]
        let expected: &[u8] = &[
            // (0008,1140) SQ, undefined length
            0x08, 0x00, 0x40, 0x11, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
            // item, undefined length
            0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF,
            // (0008,1155) UI "1\0"
            0x08, 0x00, 0x55, 0x11, b'U', b'I', 0x02, 0x00, b'1', 0x00,
            // item delimiter
            0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00,
            // sequence delimiter
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_eq!(out, expected);
    }

    #[test]
    fn pixel_sequence_round_trip() {
        let mut writer = writer();
        writer
            .write_sequence(vec![
                DataToken::PixelSequenceStart {
                    tag: Tag::PIXEL_DATA,
                    offset: 0,
                },
                DataToken::OffsetTable(vec![0]),
                DataToken::ItemValue {
                    data: &[1, 2, 3],
                    offset: 0,
                },
                DataToken::SequenceEnd,
            ])
            .unwrap();
        let out = writer.into_inner();
        // header 12, offset table 8 + 4, fragment 8 + 4, delimiter 8
        assert_eq!(out.len(), 44);
        assert_eq!(&out[4..6], b"OB");

        let parser = StatefulDecoder::file_header_decoder(&out, 0);
        let tokens: Vec<_> = DataSetReader::new(parser, Default::default())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            tokens,
            vec![
                DataToken::PixelSequenceStart {
                    tag: Tag::PIXEL_DATA,
                    offset: 0,
                },
                DataToken::OffsetTable(vec![0]),
                DataToken::ItemValue {
                    data: &[1, 2, 3, 0],
                    offset: 24,
                },
                DataToken::SequenceEnd,
            ]
        );
    }

    #[test]
    fn value_without_header_is_rejected() {
        let mut writer = writer();
        let err = writer.write(DataToken::PrimitiveValue(b"1")).unwrap_err();
        assert!(matches!(err, Error::UnexpectedToken { .. }));
        let err = writer.write(DataToken::ItemEnd).unwrap_err();
        assert!(matches!(err, Error::UnexpectedToken { .. }));
    }
}
