//! Serialization of DICOM files.
//!
//! Files are written as a 128-byte preamble with `DICM`,
//! the file meta group in explicit VR little endian,
//! then the main data set in the file's transfer syntax.
//! Sequences and items are always written with undefined length.
use crate::dataset::DataSet;
use crate::element::Value;
use crate::file::DicomFile;
use crate::meta::{write_group, FileMetaTable};
use crate::{
    BuildMetaSnafu, CreatePrinterSnafu, PrintDataSetSnafu, WriteBodySnafu, WriteError,
    WriteFileSnafu, WriteMetaSnafu, WritePreambleSnafu, WriteUnknownTransferSyntaxSnafu,
};
use dicomkit_core::{DataElementHeader, Length};
use dicomkit_dictionary_std::uids;
use dicomkit_encoding::transfer_syntax::TransferSyntax;
use dicomkit_parser::{DataSetWriter, DataToken};
use dicomkit_transfer_syntax_registry::{entries, get_registry};
use snafu::{OptionExt, ResultExt};
use std::io::{BufWriter, Write};
use std::path::Path;

type Result<T, E = WriteError> = std::result::Result<T, E>;

/// Options for writing a DICOM file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct WriteOptions {
    /// Write the 128-byte preamble and the `DICM` magic code.
    pub include_preamble: bool,
    /// Write the file meta group.
    pub write_file_meta: bool,
    /// Write the file meta elements held by the file as they are,
    /// instead of rebuilding the group from the main data set.
    pub keep_existing_meta: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            include_preamble: true,
            write_file_meta: true,
            keep_existing_meta: false,
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        WriteOptions::default()
    }

    pub fn include_preamble(mut self, include: bool) -> Self {
        self.include_preamble = include;
        self
    }

    pub fn write_file_meta(mut self, write: bool) -> Self {
        self.write_file_meta = write;
        self
    }

    pub fn keep_existing_meta(mut self, keep: bool) -> Self {
        self.keep_existing_meta = keep;
        self
    }
}

/// Serialize the file into a new byte vector.
pub fn write_bytes(file: &DicomFile, options: WriteOptions) -> Result<Vec<u8>> {
    write_to(file, Vec::new(), options)
}

/// Serialize the file to the file system.
pub fn write_file<P: AsRef<Path>>(file: &DicomFile, path: P, options: WriteOptions) -> Result<()> {
    let path = path.as_ref();
    let out = std::fs::File::create(path).context(WriteFileSnafu { filename: path })?;
    let mut out = write_to(file, BufWriter::new(out), options)?;
    out.flush().context(WriteFileSnafu { filename: path })?;
    Ok(())
}

/// Serialize the file to the given writer, returning it afterwards.
pub fn write_to<W: Write>(file: &DicomFile, mut to: W, options: WriteOptions) -> Result<W> {
    let uid = file.transfer_syntax();
    let ts = get_registry()
        .get(uid)
        .context(WriteUnknownTransferSyntaxSnafu { uid })?;

    let has_meta = file.root().tags().any(|tag| tag.group() == 0x0002);
    let keep_meta = options.write_file_meta && options.keep_existing_meta && has_meta;
    // a deflated body is only produced under a meta group which declares it
    let deflate = ts.is_deflated() && keep_meta;
    let body_ts: &TransferSyntax = if ts.is_deflated() {
        &entries::EXPLICIT_VR_LITTLE_ENDIAN
    } else {
        ts
    };

    if options.include_preamble {
        to.write_all(&[0; 128]).context(WritePreambleSnafu)?;
        to.write_all(b"DICM").context(WritePreambleSnafu)?;
    }

    if keep_meta {
        let elements = file
            .root()
            .iter()
            .take_while(|e| e.tag().group() == 0x0002)
            .map(|e| (e.tag(), e.vr(), e.value_bytes().unwrap_or_default()));
        to = write_group(to, elements).context(WriteMetaSnafu)?;
    } else if options.write_file_meta {
        let meta_ts = if ts.is_deflated() {
            uids::EXPLICIT_VR_LITTLE_ENDIAN
        } else {
            ts.uid()
        };
        let table = FileMetaTable::rebuild(file, meta_ts).context(BuildMetaSnafu)?;
        to = table.write(to).context(WriteMetaSnafu)?;
    }

    let mut tokens = Vec::new();
    dataset_tokens(file, file.root(), &mut tokens);

    if deflate {
        let mut printer = DataSetWriter::with_ts(Vec::new(), body_ts).context(CreatePrinterSnafu)?;
        printer.write_sequence(tokens).context(PrintDataSetSnafu)?;
        deflate_body(&printer.into_inner(), to)
    } else {
        let mut printer = DataSetWriter::with_ts(to, body_ts).context(CreatePrinterSnafu)?;
        printer.write_sequence(tokens).context(PrintDataSetSnafu)?;
        let mut to = printer.into_inner();
        to.flush().context(WriteBodySnafu)?;
        Ok(to)
    }
}

#[cfg(feature = "deflate")]
fn deflate_body<W: Write>(body: &[u8], to: W) -> Result<W> {
    dicomkit_transfer_syntax_registry::deflate::deflate_into(body, to).context(crate::DeflateSnafu)
}

#[cfg(not(feature = "deflate"))]
fn deflate_body<W: Write>(_body: &[u8], _to: W) -> Result<W> {
    crate::DeflateUnsupportedOnWriteSnafu.fail()
}

/// Turn a data set into writer tokens, skipping the file meta group.
fn dataset_tokens<'a>(file: &'a DicomFile, set: &'a DataSet, out: &mut Vec<DataToken<'a>>) {
    for element in set.iter().filter(|e| e.tag().group() != 0x0002) {
        let tag = element.tag();
        match element.value() {
            Value::Bytes(bytes) => {
                let len = u32::try_from(bytes.len()).map_or(Length::UNDEFINED, Length);
                out.push(DataToken::ElementHeader {
                    header: DataElementHeader::new(tag, element.vr(), len),
                    offset: 0,
                });
                out.push(DataToken::PrimitiveValue(bytes));
            }
            Value::Sequence(items) => {
                out.push(DataToken::SequenceStart {
                    tag,
                    len: Length::UNDEFINED,
                    offset: 0,
                });
                for item in items.iter().filter_map(|id| file.dataset(*id)) {
                    out.push(DataToken::ItemStart {
                        len: Length::UNDEFINED,
                        offset: 0,
                    });
                    dataset_tokens(file, item, out);
                    out.push(DataToken::ItemEnd);
                }
                out.push(DataToken::SequenceEnd);
            }
            Value::PixelSequence(pixel_sequence) => {
                out.push(DataToken::PixelSequenceStart { tag, offset: 0 });
                out.push(DataToken::OffsetTable(
                    pixel_sequence.encoded_offset_table(),
                ));
                for fragment in pixel_sequence.fragments() {
                    out.push(DataToken::ItemValue {
                        data: &fragment.data,
                        offset: 0,
                    });
                }
                out.push(DataToken::SequenceEnd);
            }
        }
    }
}
