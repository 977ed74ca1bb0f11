//! Module containing the DICOM Transfer Syntax data structure and related methods.
//!
//! The `TransferSyntax` gathers what is needed to read and write
//! a data set in a certain transfer syntax:
//! byte order, whether value representations are explicit,
//! and whether the data set or the pixel data need a codec.
//!
//! This crate does not host the table of known transfer syntaxes.
//! It lives in `dicomkit-transfer-syntax-registry`,
//! which implements [`TransferSyntaxIndex`].

use crate::adapters::DynCodecBackend;
use crate::decode::basic::BasicDecoder;
use crate::decode::{explicit_be, explicit_le, implicit_le, DecodeFrom};
use crate::encode::{self, EncodeTo};
use std::io::{Read, Write};

pub use byteordered::Endianness;

/// A decoder with its type erased.
pub type DynDecoder<S> = Box<dyn DecodeFrom<S>>;

/// An encoder with its type erased.
pub type DynEncoder<W> = Box<dyn EncodeTo<W>>;

/// A DICOM transfer syntax specifier.
/// The type parameter `B` is the pixel data codec backend.
#[derive(Debug)]
pub struct TransferSyntax<B = DynCodecBackend> {
    /// The unique identifier of the transfer syntax.
    uid: &'static str,
    /// The name of the transfer syntax.
    name: &'static str,
    /// The byte order of data.
    byte_order: Endianness,
    /// Whether the transfer syntax mandates an explicit value representation,
    /// or the VR is implicit.
    explicit_vr: bool,
    /// The transfer syntax' requirements and implemented capabilities.
    codec: Codec<B>,
}

/// Trait for containers of transfer syntax specifiers.
pub trait TransferSyntaxIndex {
    /// Obtain a DICOM transfer syntax by its respective UID.
    ///
    /// Implementations of this method should be robust to the possible
    /// presence of trailing null characters (`\0`) or spaces in `uid`.
    fn get(&self, uid: &str) -> Option<&TransferSyntax>;
}

impl<T: ?Sized> TransferSyntaxIndex for &T
where
    T: TransferSyntaxIndex,
{
    fn get(&self, uid: &str) -> Option<&TransferSyntax> {
        (**self).get(uid)
    }
}

/// A description and possible implementation regarding
/// the encoding and decoding requirements of a transfer syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum Codec<B> {
    /// No codec is required: pixel data is native.
    None,
    /// The whole data set after the file meta group is deflated.
    /// Pixel data inside it is native.
    Dataset,
    /// Pixel data is encapsulated in fragments,
    /// and decoding needs the given backend.
    /// `None` means that the codec is known
    /// but was not included in this build.
    EncapsulatedPixelData(Option<B>),
}

impl<B> TransferSyntax<B> {
    /// Create a new transfer syntax descriptor.
    ///
    /// Note that only transfer syntax implementors are expected to construct
    /// TS descriptors from scratch. For a practical usage of transfer syntaxes,
    /// one should look up an existing transfer syntax registry by UID.
    pub const fn new(
        uid: &'static str,
        name: &'static str,
        byte_order: Endianness,
        explicit_vr: bool,
        codec: Codec<B>,
    ) -> Self {
        TransferSyntax {
            uid,
            name,
            byte_order,
            explicit_vr,
            codec,
        }
    }

    /// Obtain this transfer syntax' unique identifier.
    pub const fn uid(&self) -> &'static str {
        self.uid
    }

    /// Obtain the name of this transfer syntax.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Obtain this transfer syntax' expected endianness.
    pub const fn endianness(&self) -> Endianness {
        self.byte_order
    }

    /// Whether value representations are written in the stream.
    pub const fn is_explicit_vr(&self) -> bool {
        self.explicit_vr
    }

    /// Obtain this transfer syntax' codec specification.
    pub fn codec(&self) -> &Codec<B> {
        &self.codec
    }

    /// Whether pixel data is stored natively (uncompressed, not encapsulated).
    pub fn is_native(&self) -> bool {
        matches!(self.codec, Codec::None | Codec::Dataset)
    }

    /// Whether the data set is deflated after the file meta group.
    pub fn is_deflated(&self) -> bool {
        matches!(self.codec, Codec::Dataset)
    }

    /// Whether pixel data is encapsulated.
    pub fn is_encapsulated(&self) -> bool {
        matches!(self.codec, Codec::EncapsulatedPixelData(_))
    }

    /// The pixel data codec backend, if pixel data is encapsulated
    /// and the codec is available.
    pub fn pixel_backend(&self) -> Option<&B> {
        match &self.codec {
            Codec::EncapsulatedPixelData(backend) => backend.as_ref(),
            _ => None,
        }
    }

    /// Retrieve the appropriate data element decoder for this transfer syntax.
    /// Can yield none if decoding is not supported.
    ///
    /// The resulting decoder does not consider pixel data encapsulation or
    /// data set compression rules. This means that the consumer of this method
    /// needs to inflate the source before using the decoder.
    pub fn decoder(&self) -> Option<DynDecoder<dyn Read>> {
        self.decoder_for()
    }

    /// Retrieve the appropriate data element decoder for this transfer syntax
    /// and the given source type.
    ///
    /// See [`decoder`](TransferSyntax::decoder).
    pub fn decoder_for<S>(&self) -> Option<DynDecoder<S>>
    where
        S: ?Sized + Read,
    {
        match (self.byte_order, self.explicit_vr) {
            (Endianness::Little, false) => Some(Box::new(
                implicit_le::ImplicitVRLittleEndianDecoder::default(),
            )),
            (Endianness::Little, true) => Some(Box::new(
                explicit_le::ExplicitVRLittleEndianDecoder::default(),
            )),
            (Endianness::Big, true) => {
                Some(Box::new(explicit_be::ExplicitVRBigEndianDecoder::default()))
            }
            _ => None,
        }
    }

    /// Retrieve the appropriate data element encoder for this transfer syntax.
    /// Can yield none if encoding is not supported.
    ///
    /// Deflated data sets are written by this encoder without compression.
    pub fn encoder(&self) -> Option<DynEncoder<dyn Write>> {
        self.encoder_for()
    }

    /// Retrieve the appropriate data element encoder for this transfer syntax
    /// and the given writer type.
    pub fn encoder_for<W>(&self) -> Option<DynEncoder<W>>
    where
        W: ?Sized + Write,
    {
        match (self.byte_order, self.explicit_vr) {
            (Endianness::Little, false) => Some(Box::new(
                encode::implicit_le::ImplicitVRLittleEndianEncoder::default(),
            )),
            (Endianness::Little, true) => Some(Box::new(
                encode::explicit_le::ExplicitVRLittleEndianEncoder::default(),
            )),
            (Endianness::Big, true) => Some(Box::new(
                encode::explicit_be::ExplicitVRBigEndianEncoder::default(),
            )),
            _ => None,
        }
    }

    /// Obtain a dynamic basic decoder, based on this transfer syntax' expected endianness.
    pub fn basic_decoder(&self) -> BasicDecoder {
        BasicDecoder::from(self.endianness())
    }
}
