//! DICOM encoding and decoding primitives.
//!
//! This crate provides the element header codecs
//! for each combination of VR explicitness and byte order,
//! the [transfer syntax specifier](transfer_syntax::TransferSyntax)
//! which produces them at run-time,
//! text codecs for the Specific Character Set,
//! and the port through which pixel data codecs are plugged in
//! (see [`adapters`]).
//!
//! All APIs are based on synchronous I/O.
#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    unused_qualifications,
    unused_import_braces
)]

pub mod adapters;
pub mod decode;
pub mod encode;
pub mod text;
pub mod transfer_syntax;

pub use adapters::{CodecBackend, DynCodecBackend, Geometry, Htj2kDecoder};
pub use byteordered::Endianness;
pub use decode::Decode;
pub use encode::Encode;
pub use transfer_syntax::{Codec, TransferSyntax, TransferSyntaxIndex};
