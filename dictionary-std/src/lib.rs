//! This crate implements the standard DICOM dictionaries and constants
//! used throughout dicomkit.
//!
//! ## Run-time dictionaries
//!
//! The following modules provide definitions for dictionaries
//! which can be queried during a program's lifetime:
//!
//! - [`data_element`]: information about the DICOM attributes
//!   handled by the toolkit, including every attribute
//!   consulted by the pixel data pipeline.
//!   Private creators and group lengths are resolved generically.
//! - [`uid`]: transfer syntaxes and common storage SOP classes.
//!
//! Both are singletons behind unit types,
//! indexed on first use and immutable afterwards.
//!
//! ## Constants
//!
//! - [`tags`], which map an attribute alias to a DICOM tag
//! - [`uids`], for various normative DICOM unique identifiers
pub mod data_element;
pub mod tags;
pub mod uid;
pub mod uids;

pub use data_element::{StandardDataDictionary, StandardDataDictionaryRegistry};
pub use uid::{StandardUidDictionary, StandardUidRegistry};
