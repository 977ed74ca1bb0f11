#![crate_type = "lib"]
#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    unused_qualifications,
    unused_import_braces
)]

//! This is the core library of dicomkit containing the concepts
//! shared by every other crate of the toolkit.
//!
//! The current structure of this crate is as follows:
//!
//! - [`header`] comprises the data types of a DICOM element header:
//!   attribute tags, value representations, value lengths,
//!   and the item headers used in sequences.
//! - [`dictionary`] describes the lookup port of DICOM data dictionaries,
//!   which translate attribute keywords and tags to each other,
//!   and of UID dictionaries.
//!
//! [`dictionary`]: ./dictionary/index.html
//! [`header`]: ./header/index.html

pub mod dictionary;
pub mod header;

pub use dictionary::{DataDictionary, UidDictionary};
pub use header::{DataElementHeader, Length, SequenceItemHeader, Tag, VR};
