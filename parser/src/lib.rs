//! This crate works on top of the element header codecs
//! in `dicomkit-encoding`
//! to read and write DICOM data sets held in memory.
//!
//! - [`stateful`] binds a header codec and a byte order
//!   to a byte slice (for decoding) or a writer (for encoding),
//!   keeping track of the stream position.
//! - [`dataset`] interprets a data set as a stream of [`DataToken`]s,
//!   with a reader handling sequences, items
//!   and encapsulated pixel data,
//!   and a writer turning tokens back into bytes.
//!
//! Building a tree out of the tokens is left to `dicomkit-object`.
#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    unused_qualifications,
    unused_import_braces
)]

pub mod dataset;
pub mod stateful;

pub use dataset::{DataSetReader, DataSetReaderOptions, DataSetWriter, DataToken};
pub use stateful::decode::StatefulDecoder;
pub use stateful::encode::StatefulEncoder;
