#![allow(clippy::derive_partial_eq_without_eq)]
//! This crate contains a high-level abstraction for reading,
//! navigating, mutating and writing DICOM files.
//!
//! A [`DicomFile`] owns its main data set
//! together with every data set nested in sequence items,
//! which are addressed through [`DataSetId`] handles.
//! Elements hold their value as encoded,
//! and typed converters interpret it on demand.
//!
//! # Examples
//!
//! Read a file and fetch some attributes:
//!
//! ```no_run
//! use dicomkit_dictionary_std::tags;
//! use dicomkit_object::{read_file, ReadOptions};
//! # fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! let file = read_file("0001.dcm", ReadOptions::default())?;
//!
//! let patient_name = file.get_dataelement(tags::PATIENT_NAME).to_string();
//! let rows = file.get_dataelement_by_path("Rows")?.to_long();
//! # Ok(())
//! # }
//! ```
//!
//! Looking up an element never fails when it is absent:
//! a missing element sentinel is returned instead.
//!
//! ```
//! # use dicomkit_object::DicomFile;
//! # use dicomkit_dictionary_std::tags;
//! let file = DicomFile::new();
//! let element = file.get_dataelement(tags::PATIENT_NAME);
//! assert!(element.is_missing());
//! assert_eq!(element.to_string(), None);
//! ```
//!
//! Nested elements are reached with tag paths:
//!
//! ```no_run
//! # use dicomkit_object::{read_file, ReadOptions};
//! # fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! # let file = read_file("0001.dcm", ReadOptions::default())?;
//! let uid = file
//!     .get_dataelement_by_path("ReferencedImageSequence.0.ReferencedSOPInstanceUID")?
//!     .to_uid_string();
//! # Ok(())
//! # }
//! ```
pub mod dataset;
pub mod dump;
pub mod element;
pub mod file;
pub mod meta;
pub mod path;
pub mod pixel_sequence;
pub mod uid;
pub mod write;

pub use dataset::{DataSet, DataSetId};
pub use dicomkit_core::{Length, Tag, VR};
pub use element::{DataElement, ElementLookup, SetValueError, Value};
pub use file::{read_bytes, read_file, DicomFile, ReadOptions, TransferSyntaxError};
pub use meta::{FileMetaTable, FileMetaTableBuilder};
pub use path::PathError;
pub use pixel_sequence::{Fragment, Frame, FrameGrouping, PixelSequence};
pub use write::{write_bytes, write_file, write_to, WriteOptions};

use dicomkit_parser::dataset::{read, write as write_tokens};
use dicomkit_parser::stateful::decode;
use snafu::{Backtrace, Snafu};

/// The implementation class UID written to rebuilt file meta groups.
///
/// This UID was generated under the `2.25` root
/// and identifies files written by this crate.
pub const IMPLEMENTATION_CLASS_UID: &str = "2.25.214916104573891830270914476330683517352";

/// The implementation version name written to rebuilt file meta groups.
pub const IMPLEMENTATION_VERSION_NAME: &str = "dicomkit 0.1";

/// An error which may occur when reading a DICOM file
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ReadError {
    #[snafu(display("Could not open file '{}'", filename.display()))]
    OpenFile {
        filename: std::path::PathBuf,
        backtrace: Backtrace,
        source: std::io::Error,
    },
    #[snafu(display("Could not read file meta group element"))]
    ReadMetaElement {
        #[snafu(backtrace)]
        source: decode::Error,
    },
    #[snafu(display(
        "Undefined length of file meta element {} at offset {:#x}",
        tag,
        position
    ))]
    UndefinedMetaLength {
        tag: Tag,
        position: u64,
        backtrace: Backtrace,
    },
    #[snafu(display("Could not create data set parser"))]
    CreateParser {
        #[snafu(backtrace)]
        source: read::Error,
    },
    #[snafu(display("Could not read data set token"))]
    ReadToken {
        #[snafu(backtrace)]
        source: read::Error,
    },
    #[snafu(display("Unexpected token {} at offset {:#x}", token, position))]
    UnexpectedToken {
        token: String,
        position: u64,
        backtrace: Backtrace,
    },
    #[snafu(display("Premature data set end at offset {:#x}", position))]
    PrematureEnd { position: u64, backtrace: Backtrace },
    #[snafu(display("Could not inflate deflated data set"))]
    Inflate {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Deflated data sets are not supported in this build"))]
    DeflateUnsupported { backtrace: Backtrace },
}

impl ReadError {
    /// The absolute byte offset at which reading failed, when known.
    pub fn position(&self) -> Option<u64> {
        match self {
            ReadError::ReadMetaElement { source } => source.position(),
            ReadError::CreateParser { source } | ReadError::ReadToken { source } => {
                source.position()
            }
            ReadError::UndefinedMetaLength { position, .. }
            | ReadError::UnexpectedToken { position, .. }
            | ReadError::PrematureEnd { position, .. } => Some(*position),
            _ => None,
        }
    }
}

/// An error which may occur when writing a DICOM file
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum WriteError {
    #[snafu(display("Could not write to file '{}'", filename.display()))]
    WriteFile {
        filename: std::path::PathBuf,
        backtrace: Backtrace,
        source: std::io::Error,
    },
    #[snafu(display("Could not write file preamble"))]
    WritePreamble {
        backtrace: Backtrace,
        source: std::io::Error,
    },
    #[snafu(display("Could not build file meta group"))]
    BuildMeta {
        #[snafu(backtrace)]
        source: meta::Error,
    },
    #[snafu(display("Could not write file meta group"))]
    WriteMeta {
        #[snafu(backtrace)]
        source: meta::Error,
    },
    #[snafu(display("Could not create data set printer"))]
    CreatePrinter {
        #[snafu(backtrace)]
        source: write_tokens::Error,
    },
    #[snafu(display("Could not print data set"))]
    PrintDataSet {
        #[snafu(backtrace)]
        source: write_tokens::Error,
    },
    #[snafu(display("Could not write data set body"))]
    WriteBody {
        backtrace: Backtrace,
        source: std::io::Error,
    },
    #[snafu(display("Unknown transfer syntax `{}`", uid))]
    WriteUnknownTransferSyntax { uid: String, backtrace: Backtrace },
    #[snafu(display("Could not deflate data set"))]
    Deflate {
        backtrace: Backtrace,
        source: std::io::Error,
    },
    #[snafu(display("Deflated data sets are not supported in this build"))]
    DeflateUnsupportedOnWrite { backtrace: Backtrace },
}
