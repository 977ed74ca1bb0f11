//! Stateful decoding and encoding of DICOM content.
//!
//! These types bind an element header codec
//! to a specific source or destination,
//! keeping track of the current position in the stream.
pub mod decode;
pub mod encode;
