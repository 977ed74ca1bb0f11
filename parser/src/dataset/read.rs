//! Sequential reading of a DICOM data set as a stream of tokens.
//!
//! The reader walks the data set with a stack of open sequences and items,
//! closing defined-length ones by position
//! and undefined-length ones by their delimiters.
use crate::stateful::decode::{Error as DecoderError, StatefulDecoder};
use dicomkit_core::header::{DataElementHeader, Length, SequenceItemHeader};
use dicomkit_core::{Tag, VR};
use dicomkit_dictionary_std::tags;
use dicomkit_encoding::decode::BasicDecode;
use dicomkit_encoding::transfer_syntax::TransferSyntax;
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};
use tracing::{debug, warn};

use super::{DataToken, SeqTokenType};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not create decoder"))]
    CreateDecoder {
        #[snafu(backtrace)]
        source: DecoderError,
    },
    #[snafu(display("Could not read item header"))]
    ReadItemHeader {
        #[snafu(backtrace)]
        source: DecoderError,
    },
    #[snafu(display("Could not read element header"))]
    ReadHeader {
        #[snafu(backtrace)]
        source: DecoderError,
    },
    #[snafu(display("Could not read value of element tagged {}", tag))]
    ReadValue {
        tag: Tag,
        #[snafu(backtrace)]
        source: DecoderError,
    },
    #[snafu(display("Could not read pixel data item value"))]
    ReadItemValue {
        #[snafu(backtrace)]
        source: DecoderError,
    },
    #[snafu(display(
        "Inconsistent sequence end: expected end at {:#x} but read up to {:#x}",
        end_of_sequence,
        bytes_read
    ))]
    InconsistentSequenceEnd {
        end_of_sequence: u64,
        bytes_read: u64,
        backtrace: Backtrace,
    },
    #[snafu(display("Unexpected item tag {} at offset {:#x}", tag, position))]
    UnexpectedItemTag {
        tag: Tag,
        position: u64,
        backtrace: Backtrace,
    },
    #[snafu(display("Unexpected delimiter {} at offset {:#x}", tag, position))]
    UnexpectedDelimiter {
        tag: Tag,
        position: u64,
        backtrace: Backtrace,
    },
    #[snafu(display("Undefined pixel data item length at offset {:#x}", position))]
    UndefinedItemLength { position: u64, backtrace: Backtrace },
    #[snafu(display("Unexpected end of data at offset {:#x}", position))]
    UnexpectedEnd { position: u64, backtrace: Backtrace },
    #[snafu(display(
        "Tag {} at offset {:#x} is not greater than previous tag {}",
        tag,
        position,
        previous
    ))]
    TagOrder {
        tag: Tag,
        previous: Tag,
        position: u64,
        backtrace: Backtrace,
    },
}

impl Error {
    /// The absolute byte offset in the stream where the fault was found.
    pub fn position(&self) -> Option<u64> {
        match self {
            Error::CreateDecoder { .. } => None,
            Error::ReadItemHeader { source }
            | Error::ReadHeader { source }
            | Error::ReadValue { source, .. }
            | Error::ReadItemValue { source } => source.position(),
            Error::InconsistentSequenceEnd { bytes_read, .. } => Some(*bytes_read),
            Error::UnexpectedItemTag { position, .. }
            | Error::UnexpectedDelimiter { position, .. }
            | Error::UndefinedItemLength { position, .. }
            | Error::UnexpectedEnd { position, .. }
            | Error::TagOrder { position, .. } => Some(*position),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A reader-specific token representing a sequence or item start.
#[derive(Debug, Copy, Clone, PartialEq)]
struct SeqToken {
    /// Whether it is the start of a sequence or the start of an item.
    typ: SeqTokenType,
    /// The length of the value, as indicated by the starting element,
    /// can be unknown.
    len: Length,
    /// Whether this sequence token is part of an encapsulated pixel data.
    pixel_data: bool,
    /// The absolute position of the sequence or item value data.
    base_offset: u64,
}

/// What the reader remembers about each open data set (root or item).
#[derive(Debug, Default, Copy, Clone)]
struct Level {
    last_tag: Option<Tag>,
    bits_allocated: Option<u16>,
}

/// The set of options for the data set reader.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct DataSetReaderOptions {
    /// stop after this root-level element
    pub load_until: Option<Tag>,
}

impl DataSetReaderOptions {
    /// Stop reading after the root-level element with the given tag
    /// (or at the first root-level element past it).
    pub fn load_until(mut self, tag: Tag) -> Self {
        self.load_until = Some(tag);
        self
    }
}

/// A reader of the structure of a DICOM data set held in memory.
///
/// The reader fuses after the first error.
#[derive(Debug)]
pub struct DataSetReader<'a> {
    /// the stateful decoder
    parser: StatefulDecoder<'a>,
    /// the options of this reader
    options: DataSetReaderOptions,
    /// whether the reader is expecting an item header next (or a sequence delimiter)
    in_sequence: bool,
    /// whether the reader is expecting the basic offset table of a pixel sequence next
    offset_table_next: bool,
    /// whether a check for a sequence or item delimitation is pending
    delimiter_check_pending: bool,
    /// a stack of delimiters
    seq_delimiters: Vec<SeqToken>,
    /// one entry for the root data set and one per open item
    levels: Vec<Level>,
    /// fuse the iteration process if true
    hard_break: bool,
    /// the root-level element in `load_until` was read
    stop_at_root: bool,
    /// header of the primitive value to read next
    last_header: Option<DataElementHeader>,
}

impl<'a> DataSetReader<'a> {
    /// Create a new data set reader over the given stateful decoder.
    pub fn new(parser: StatefulDecoder<'a>, options: DataSetReaderOptions) -> Self {
        DataSetReader {
            parser,
            options,
            in_sequence: false,
            offset_table_next: false,
            delimiter_check_pending: false,
            seq_delimiters: Vec::new(),
            levels: vec![Level::default()],
            hard_break: false,
            stop_at_root: false,
            last_header: None,
        }
    }

    /// Create a new data set reader over bytes in the given transfer syntax.
    ///
    /// `base_offset` is the absolute position of `data[0]`.
    pub fn new_with_ts<B>(
        data: &'a [u8],
        ts: &TransferSyntax<B>,
        base_offset: u64,
        options: DataSetReaderOptions,
    ) -> Result<Self> {
        let parser =
            StatefulDecoder::new_with_ts(data, ts, base_offset).context(CreateDecoderSnafu)?;
        Ok(Self::new(parser, options))
    }

    /// The absolute position of the reader in the stream.
    pub fn position(&self) -> u64 {
        self.parser.position()
    }

    /// The bytes which were not read.
    pub fn remaining(&self) -> &'a [u8] {
        self.parser.remaining()
    }

    fn next_token(&mut self) -> Option<Result<DataToken<'a>>> {
        if let Some(header) = self.last_header.take() {
            return Some(self.read_value(header));
        }

        // item or sequence delimitation logic for defined lengths
        if self.delimiter_check_pending {
            match self.update_seq_delimiters() {
                Err(e) => return Some(Err(e)),
                Ok(Some(token)) => return Some(Ok(token)),
                Ok(None) => { /* no-op */ }
            }
        }

        if self.in_sequence {
            return Some(self.read_item_start());
        }

        if let Some(SeqToken {
            pixel_data: true, ..
        }) = self.seq_delimiters.last()
        {
            return Some(self.read_pixel_item());
        }

        self.read_element_header()
    }

    fn update_seq_delimiters(&mut self) -> Result<Option<DataToken<'a>>> {
        if let Some(sd) = self.seq_delimiters.last() {
            if let Some(len) = sd.len.get() {
                let end_of_sequence = sd.base_offset + u64::from(len);
                let bytes_read = self.parser.position();
                if end_of_sequence == bytes_read {
                    let token = match sd.typ {
                        SeqTokenType::Sequence => {
                            self.in_sequence = false;
                            DataToken::SequenceEnd
                        }
                        SeqTokenType::Item => {
                            self.in_sequence = true;
                            self.levels.pop();
                            DataToken::ItemEnd
                        }
                    };
                    self.seq_delimiters.pop();
                    // the enclosing sequence or item may end here too,
                    // so the check stays pending
                    return Ok(Some(token));
                } else if end_of_sequence < bytes_read {
                    return InconsistentSequenceEndSnafu {
                        end_of_sequence,
                        bytes_read,
                    }
                    .fail();
                }
            }
        }
        self.delimiter_check_pending = false;
        Ok(None)
    }

    fn read_item_start(&mut self) -> Result<DataToken<'a>> {
        let position = self.parser.position();
        if self.parser.is_at_end() {
            return UnexpectedEndSnafu { position }.fail();
        }
        match self.parser.decode_item_header().context(ReadItemHeaderSnafu)? {
            SequenceItemHeader::Item { len } => {
                self.in_sequence = false;
                self.seq_delimiters.push(SeqToken {
                    typ: SeqTokenType::Item,
                    len,
                    pixel_data: false,
                    base_offset: self.parser.position(),
                });
                self.levels.push(Level::default());
                // items can be empty
                if len.get() == Some(0) {
                    self.delimiter_check_pending = true;
                }
                Ok(DataToken::ItemStart {
                    len,
                    offset: position,
                })
            }
            SequenceItemHeader::ItemDelimiter => UnexpectedDelimiterSnafu {
                tag: Tag::ITEM_DELIMITER,
                position,
            }
            .fail(),
            SequenceItemHeader::SequenceDelimiter => {
                self.seq_delimiters.pop();
                self.in_sequence = false;
                // items can end after a nested sequence ends
                self.delimiter_check_pending = true;
                Ok(DataToken::SequenceEnd)
            }
        }
    }

    fn read_pixel_item(&mut self) -> Result<DataToken<'a>> {
        let position = self.parser.position();
        if self.parser.is_at_end() {
            return UnexpectedEndSnafu { position }.fail();
        }
        match self.parser.decode_item_header().context(ReadItemHeaderSnafu)? {
            SequenceItemHeader::Item { len } => {
                let len = len.get().context(UndefinedItemLengthSnafu { position })?;
                if self.offset_table_next {
                    self.offset_table_next = false;
                    let table = self
                        .parser
                        .read_u32_vec(len)
                        .context(ReadItemValueSnafu)?;
                    Ok(DataToken::OffsetTable(table))
                } else {
                    let data = self
                        .parser
                        .read_value_bytes(len)
                        .context(ReadItemValueSnafu)?;
                    Ok(DataToken::ItemValue {
                        data,
                        offset: position,
                    })
                }
            }
            SequenceItemHeader::SequenceDelimiter => {
                self.seq_delimiters.pop();
                self.offset_table_next = false;
                self.delimiter_check_pending = true;
                Ok(DataToken::SequenceEnd)
            }
            SequenceItemHeader::ItemDelimiter => UnexpectedDelimiterSnafu {
                tag: Tag::ITEM_DELIMITER,
                position,
            }
            .fail(),
        }
    }

    fn read_element_header(&mut self) -> Option<Result<DataToken<'a>>> {
        let at_root = self.seq_delimiters.is_empty();
        loop {
            let position = self.parser.position();
            if at_root {
                if self.stop_at_root || self.parser.is_at_end() {
                    return None;
                }
                if self.parser.at_zero_padding() {
                    debug!("Trailing zero padding at offset {:#x}", position);
                    self.parser.skip_to_end();
                    return None;
                }
                let rest = self.parser.remaining().len();
                if rest < 8 {
                    warn!("Ignoring {} trailing bytes at offset {:#x}", rest, position);
                    self.parser.skip_to_end();
                    return None;
                }
            } else if self.parser.is_at_end() {
                return Some(UnexpectedEndSnafu { position }.fail());
            }

            let header = match self.parser.decode_header().context(ReadHeaderSnafu) {
                Ok(header) => header,
                Err(e) => return Some(Err(e)),
            };

            match header.tag {
                Tag::ITEM_DELIMITER if at_root => {
                    warn!("Item delimiter out of sequence at offset {:#x}", position);
                    continue;
                }
                Tag::SEQUENCE_DELIMITER if at_root => {
                    warn!("Sequence delimiter in root data set at offset {:#x}", position);
                    continue;
                }
                Tag::ITEM_DELIMITER => {
                    // end of an item of undefined length
                    self.seq_delimiters.pop();
                    self.levels.pop();
                    self.in_sequence = true;
                    self.delimiter_check_pending = true;
                    return Some(Ok(DataToken::ItemEnd));
                }
                Tag::SEQUENCE_DELIMITER => {
                    return Some(
                        UnexpectedDelimiterSnafu {
                            tag: header.tag,
                            position,
                        }
                        .fail(),
                    );
                }
                Tag::ITEM => {
                    return Some(
                        UnexpectedItemTagSnafu {
                            tag: header.tag,
                            position,
                        }
                        .fail(),
                    );
                }
                _ => {}
            }

            if at_root {
                if let Some(until) = self.options.load_until {
                    if header.tag > until {
                        return None;
                    }
                    if header.tag == until {
                        self.stop_at_root = true;
                    }
                }
            }

            return Some(self.classify_header(header, position, at_root));
        }
    }

    fn classify_header(
        &mut self,
        mut header: DataElementHeader,
        position: u64,
        at_root: bool,
    ) -> Result<DataToken<'a>> {
        let level = self
            .levels
            .last_mut()
            .context(UnexpectedEndSnafu { position })?;
        if let Some(previous) = level.last_tag {
            if header.tag <= previous {
                if !at_root {
                    return TagOrderSnafu {
                        tag: header.tag,
                        previous,
                        position,
                    }
                    .fail();
                }
                warn!(
                    "Tag {} at offset {:#x} is out of order (after {})",
                    header.tag, position, previous
                );
            }
        }
        level.last_tag = Some(level.last_tag.map_or(header.tag, |t| t.max(header.tag)));
        let bits_allocated = level.bits_allocated;

        if header.tag == Tag::PIXEL_DATA && header.len.is_undefined() {
            // encapsulated pixel data, expecting offset table
            self.seq_delimiters.push(SeqToken {
                typ: SeqTokenType::Sequence,
                len: Length::UNDEFINED,
                pixel_data: true,
                base_offset: self.parser.position(),
            });
            self.offset_table_next = true;
            return Ok(DataToken::PixelSequenceStart {
                tag: header.tag,
                offset: position,
            });
        }

        if header.vr == VR::SQ || header.len.is_undefined() {
            self.seq_delimiters.push(SeqToken {
                typ: SeqTokenType::Sequence,
                len: header.len,
                pixel_data: false,
                base_offset: self.parser.position(),
            });
            self.in_sequence = true;
            // sequences can be empty
            if header.len.get() == Some(0) {
                self.delimiter_check_pending = true;
            }
            return Ok(DataToken::SequenceStart {
                tag: header.tag,
                len: header.len,
                offset: position,
            });
        }

        if header.tag == Tag::PIXEL_DATA
            && header.vr == VR::OB
            && bits_allocated.map_or(false, |bits| bits > 8)
        {
            header.vr = VR::OW;
        }

        self.last_header = Some(header);
        Ok(DataToken::ElementHeader {
            header,
            offset: position,
        })
    }

    fn read_value(&mut self, header: DataElementHeader) -> Result<DataToken<'a>> {
        let value = self
            .parser
            .read_value_bytes(header.len.0)
            .context(ReadValueSnafu { tag: header.tag })?;
        if header.tag == tags::BITS_ALLOCATED && value.len() >= 2 {
            let bits = self.parser.basic().decode_us(value).ok();
            if let Some(level) = self.levels.last_mut() {
                level.bits_allocated = bits;
            }
        }
        // sequences can end after this token
        self.delimiter_check_pending = true;
        Ok(DataToken::PrimitiveValue(value))
    }
}

impl<'a> Iterator for DataSetReader<'a> {
    type Item = Result<DataToken<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.hard_break {
            return None;
        }
        let token = self.next_token();
        if !matches!(token, Some(Ok(_))) {
            self.hard_break = true;
        }
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicomkit_core::header::DataElementHeader;

    fn read_all(data: &[u8], options: DataSetReaderOptions) -> Vec<Result<DataToken<'_>>> {
        let parser = StatefulDecoder::file_header_decoder(data, 0);
        DataSetReader::new(parser, options).collect()
    }

    fn tokens(data: &[u8]) -> Vec<DataToken<'_>> {
        read_all(data, Default::default())
            .into_iter()
            .collect::<Result<_>>()
            .expect("should read all tokens")
    }

    #[rustfmt::skip]
    const SEQUENCES: &[u8] = &[
        // (0008,0060) Modality CS "MR"
        0x08, 0x00, 0x60, 0x00, b'C', b'S', 0x02, 0x00, b'M', b'R',
        // (0008,1140) ReferencedImageSequence SQ, undefined length
        0x08, 0x00, 0x40, 0x11, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
        // item, undefined length
        0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF,
        // (0008,1150) ReferencedSOPClassUID UI "1.2"
        0x08, 0x00, 0x50, 0x11, b'U', b'I', 0x04, 0x00, b'1', b'.', b'2', 0x00,
        // item delimiter
        0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00,
        // item, 10 bytes
        0xFE, 0xFF, 0x00, 0xE0, 0x0A, 0x00, 0x00, 0x00,
        // (0008,1155) ReferencedSOPInstanceUID UI "1"
        0x08, 0x00, 0x55, 0x11, b'U', b'I', 0x02, 0x00, b'1', 0x00,
        // sequence delimiter
        0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        // (0010,0010) PatientName PN "Doe^J"
        0x10, 0x00, 0x10, 0x00, b'P', b'N', 0x06, 0x00, b'D', b'o', b'e', b'^', b'J', b' ',
    ];

    #[test]
    fn read_sequence_of_items() {
        let tokens = tokens(SEQUENCES);
        let expected = vec![
            DataToken::ElementHeader {
                header: DataElementHeader::new(Tag(0x0008, 0x0060), VR::CS, Length(2)),
                offset: 0,
            },
            DataToken::PrimitiveValue(b"MR"),
            DataToken::SequenceStart {
                tag: Tag(0x0008, 0x1140),
                len: Length::UNDEFINED,
                offset: 10,
            },
            DataToken::ItemStart {
                len: Length::UNDEFINED,
                offset: 22,
            },
            DataToken::ElementHeader {
                header: DataElementHeader::new(Tag(0x0008, 0x1150), VR::UI, Length(4)),
                offset: 30,
            },
            DataToken::PrimitiveValue(b"1.2\0"),
            DataToken::ItemEnd,
            DataToken::ItemStart {
                len: Length(10),
                offset: 50,
            },
            DataToken::ElementHeader {
                header: DataElementHeader::new(Tag(0x0008, 0x1155), VR::UI, Length(2)),
                offset: 58,
            },
            DataToken::PrimitiveValue(b"1\0"),
            DataToken::ItemEnd,
            DataToken::SequenceEnd,
            DataToken::ElementHeader {
                header: DataElementHeader::new(Tag(0x0010, 0x0010), VR::PN, Length(6)),
                offset: 76,
            },
            DataToken::PrimitiveValue(b"Doe^J "),
        ];
        assert_eq!(tokens, expected);
    }

    #[rustfmt::skip]
    const DEFINED_SEQUENCE: &[u8] = &[
        // (0008,1140) SQ, 18 bytes
        0x08, 0x00, 0x40, 0x11, b'S', b'Q', 0x00, 0x00, 0x12, 0x00, 0x00, 0x00,
        // item, 10 bytes
        0xFE, 0xFF, 0x00, 0xE0, 0x0A, 0x00, 0x00, 0x00,
        // (0008,1155) UI "1"
        0x08, 0x00, 0x55, 0x11, b'U', b'I', 0x02, 0x00, b'1', 0x00,
        // (0008,1160) ReferencedFrameNumber IS "1 "
        0x08, 0x00, 0x60, 0x11, b'I', b'S', 0x02, 0x00, b'1', b' ',
    ];

    #[test]
    fn defined_lengths_close_by_position() {
        let tokens = tokens(DEFINED_SEQUENCE);
        assert_eq!(tokens.len(), 8);
        assert_eq!(tokens[4], DataToken::ItemEnd);
        assert_eq!(tokens[5], DataToken::SequenceEnd);
        assert!(matches!(
            tokens[6],
            DataToken::ElementHeader { header, offset: 30 } if header.tag == Tag(0x0008, 0x1160)
        ));
    }

    #[rustfmt::skip]
    const ENCAPSULATED: &[u8] = &[
        // (0028,0100) BitsAllocated US 8
        0x28, 0x00, 0x00, 0x01, b'U', b'S', 0x02, 0x00, 0x08, 0x00,
        // (7FE0,0010) PixelData OB, undefined length
        0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
        // empty basic offset table
        0xFE, 0xFF, 0x00, 0xE0, 0x00, 0x00, 0x00, 0x00,
        // fragment of 4 bytes
        0xFE, 0xFF, 0x00, 0xE0, 0x04, 0x00, 0x00, 0x00,
        0xFF, 0xD8, 0xFF, 0xD9,
        // sequence delimiter
        0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn read_encapsulated_pixel_data() {
        let tokens = tokens(ENCAPSULATED);
        assert_eq!(
            &tokens[2..],
            &[
                DataToken::PixelSequenceStart {
                    tag: Tag::PIXEL_DATA,
                    offset: 10,
                },
                DataToken::OffsetTable(vec![]),
                DataToken::ItemValue {
                    data: &[0xFF, 0xD8, 0xFF, 0xD9],
                    offset: 30,
                },
                DataToken::SequenceEnd,
            ]
        );
    }

    #[rustfmt::skip]
    const NATIVE_OB_16BIT: &[u8] = &[
        // (0028,0100) BitsAllocated US 16
        0x28, 0x00, 0x00, 0x01, b'U', b'S', 0x02, 0x00, 0x10, 0x00,
        // (7FE0,0010) PixelData OB, 4 bytes
        0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x02, 0x00,
    ];

    #[test]
    fn native_pixel_data_ob_becomes_ow() {
        let tokens = tokens(NATIVE_OB_16BIT);
        assert!(matches!(
            tokens[2],
            DataToken::ElementHeader { header, .. } if header.vr == VR::OW
        ));
    }

    #[rustfmt::skip]
    const ITEM_OUT_OF_ORDER: &[u8] = &[
        // (0008,1140) SQ, undefined length
        0x08, 0x00, 0x40, 0x11, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
        // item, undefined length
        0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF,
        // (0008,1155) UI "1"
        0x08, 0x00, 0x55, 0x11, b'U', b'I', 0x02, 0x00, b'1', 0x00,
        // (0008,1150) UI "1", lower than the previous tag
        0x08, 0x00, 0x50, 0x11, b'U', b'I', 0x02, 0x00, b'1', 0x00,
    ];

    #[test]
    fn tag_order_violation_inside_item() {
        let results = read_all(ITEM_OUT_OF_ORDER, Default::default());
        let err = results
            .into_iter()
            .find_map(|r| r.err())
            .expect("should fail");
        assert!(matches!(err, Error::TagOrder { .. }));
        assert_eq!(err.position(), Some(30));
    }

    #[rustfmt::skip]
    const STRAY_DELIMITER: &[u8] = &[
        // (0008,0060) Modality CS "MR"
        0x08, 0x00, 0x60, 0x00, b'C', b'S', 0x02, 0x00, b'M', b'R',
        // item delimiter at root
        0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00,
        // (0010,0010) PatientName PN "Doe "
        0x10, 0x00, 0x10, 0x00, b'P', b'N', 0x04, 0x00, b'D', b'o', b'e', b' ',
        // trailing zero padding
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn stray_root_delimiter_and_padding_are_skipped() {
        let tokens = tokens(STRAY_DELIMITER);
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[3], DataToken::PrimitiveValue(b"Doe "));
    }

    #[test]
    fn load_until_stops_after_tag() {
        let results = read_all(
            SEQUENCES,
            DataSetReaderOptions::default().load_until(Tag(0x0008, 0x1140)),
        );
        let tokens: Vec<_> = results.into_iter().collect::<Result<_>>().unwrap();
        assert_eq!(tokens.len(), 12);
        assert_eq!(tokens.last(), Some(&DataToken::SequenceEnd));

        let results = read_all(
            SEQUENCES,
            DataSetReaderOptions::default().load_until(Tag(0x0008, 0x0070)),
        );
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn truncated_value_is_an_error_with_offset() {
        let results = read_all(&SEQUENCES[..SEQUENCES.len() - 2], Default::default());
        let err = results.last().unwrap().as_ref().unwrap_err();
        assert!(matches!(err, Error::ReadValue { .. }));
        assert_eq!(err.position(), Some(84));
    }
}
