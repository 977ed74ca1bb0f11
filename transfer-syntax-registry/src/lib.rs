//! This crate contains the DICOM transfer syntax registry.
//!
//! The transfer syntax registry maps a DICOM UID of a transfer syntax
//! into the respective transfer syntax specifier,
//! which also carries the pixel data codec backend, if any.
//! The table is fixed at compile time:
//! which codecs are available depends on the Cargo features enabled.
//!
//! ```
//! use dicomkit_encoding::TransferSyntaxIndex;
//! use dicomkit_transfer_syntax_registry::TransferSyntaxRegistry;
//!
//! let ts = TransferSyntaxRegistry.get("1.2.840.10008.1.2.1\0").unwrap();
//! assert_eq!(ts.name(), "Explicit VR Little Endian");
//! ```
#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(missing_debug_implementations, unused_qualifications)]

pub mod adapters;
#[cfg(feature = "deflate")]
pub mod deflate;
pub mod entries;

use dicomkit_encoding::transfer_syntax::{TransferSyntax, TransferSyntaxIndex};
use dicomkit_encoding::{DynCodecBackend, Htj2kDecoder};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Main implementation of a registry of DICOM transfer syntaxes.
///
/// Consumers would generally use [`TransferSyntaxRegistry`] instead.
pub struct TransferSyntaxRegistryImpl {
    m: HashMap<&'static str, TransferSyntax>,
}

impl fmt::Debug for TransferSyntaxRegistryImpl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let entries: HashMap<&str, &str> =
            self.m.iter().map(|(uid, ts)| (*uid, ts.name())).collect();
        f.debug_struct("TransferSyntaxRegistryImpl")
            .field("m", &entries)
            .finish()
    }
}

impl TransferSyntaxRegistryImpl {
    /// Obtain an iterator of all registered transfer syntaxes.
    pub fn iter(&self) -> impl Iterator<Item = &TransferSyntax> {
        self.m.values()
    }

    /// Obtain a DICOM codec by transfer syntax UID.
    pub fn get<U: AsRef<str>>(&self, uid: U) -> Option<&TransferSyntax> {
        let ts_uid = uid
            .as_ref()
            .trim_end_matches(|c: char| c.is_whitespace() || c == '\0');
        self.m.get(ts_uid)
    }

    fn register(&mut self, ts: TransferSyntax) {
        self.m.insert(ts.uid(), ts);
    }
}

impl TransferSyntaxIndex for TransferSyntaxRegistryImpl {
    #[inline]
    fn get(&self, uid: &str) -> Option<&TransferSyntax> {
        Self::get(self, uid)
    }
}

/// Zero-sized representative of the main transfer syntax registry.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct TransferSyntaxRegistry;

impl TransferSyntaxRegistry {
    /// Obtain an iterator of all registered transfer syntaxes.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &TransferSyntax> {
        get_registry().iter()
    }
}

impl TransferSyntaxIndex for TransferSyntaxRegistry {
    #[inline]
    fn get(&self, uid: &str) -> Option<&TransferSyntax> {
        get_registry().get(uid)
    }
}

lazy_static! {
    static ref REGISTRY: TransferSyntaxRegistryImpl = {
        let mut registry = TransferSyntaxRegistryImpl {
            m: HashMap::with_capacity(32),
        };
        initialize_codecs(&mut registry);
        registry
    };
}

/// Retrieve a reference to the global codec registry.
#[inline]
pub fn get_registry() -> &'static TransferSyntaxRegistryImpl {
    &REGISTRY
}

fn initialize_codecs(registry: &mut TransferSyntaxRegistryImpl) {
    use self::entries::*;

    for ts in [
        IMPLICIT_VR_LITTLE_ENDIAN,
        EXPLICIT_VR_LITTLE_ENDIAN,
        EXPLICIT_VR_BIG_ENDIAN,
        DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
        ENCAPSULATED_UNCOMPRESSED_EXPLICIT_VR_LITTLE_ENDIAN,
        RLE_LOSSLESS,
        JPEG_BASELINE,
        JPEG_EXTENDED,
        JPEG_LOSSLESS_NON_HIERARCHICAL,
        JPEG_LOSSLESS_NON_HIERARCHICAL_FIRST_ORDER_PREDICTION,
        JPEG_LS_LOSSLESS_IMAGE_COMPRESSION,
        JPEG_LS_LOSSY_IMAGE_COMPRESSION,
        JPEG_2000_IMAGE_COMPRESSION_LOSSLESS_ONLY,
        JPEG_2000_IMAGE_COMPRESSION,
        JPEG_2000_PART2_MULTI_COMPONENT_IMAGE_COMPRESSION_LOSSLESS_ONLY,
        JPEG_2000_PART2_MULTI_COMPONENT_IMAGE_COMPRESSION,
        HIGH_THROUGHPUT_JPEG_2000_IMAGE_COMPRESSION_LOSSLESS_ONLY,
        HIGH_THROUGHPUT_JPEG_2000_WITH_RPCL_OPTIONS_IMAGE_COMPRESSION_LOSSLESS_ONLY,
        HIGH_THROUGHPUT_JPEG_2000_IMAGE_COMPRESSION,
    ] {
        registry.register(ts);
    }
}

/// Look up the pixel data codec backend for a transfer syntax.
///
/// For the HTJ2K transfer syntaxes,
/// `htj2k` selects which implementation to use;
/// [`Htj2kDecoder::Auto`] picks the first one compiled in.
/// Returns `None` when the transfer syntax is unknown,
/// has native pixel data,
/// or its codec is not available in this build.
pub fn get_backend(uid: &str, htj2k: Htj2kDecoder) -> Option<DynCodecBackend> {
    let Some(ts) = get_registry().get(uid) else {
        warn!("Unknown transfer syntax `{}`", uid.trim_end_matches('\0'));
        return None;
    };
    if entries::is_htj2k(ts.uid()) {
        return match htj2k {
            Htj2kDecoder::Auto => adapters::JPEG2000,
            Htj2kDecoder::OpenJpeg => adapters::OPENJPEG,
            Htj2kDecoder::Hayro => adapters::HAYRO,
        };
    }
    ts.pixel_backend().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicomkit_encoding::CodecBackend;

    #[test]
    fn registry_holds_every_entry() {
        assert_eq!(TransferSyntaxRegistry.iter().count(), 19);
    }

    #[test]
    fn lookup_ignores_padding() {
        let ts = TransferSyntaxRegistry.get("1.2.840.10008.1.2\0").unwrap();
        assert_eq!(ts.uid(), "1.2.840.10008.1.2");
        assert!(!ts.is_explicit_vr());
        let ts = TransferSyntaxRegistry.get("1.2.840.10008.1.2.2 ").unwrap();
        assert_eq!(ts.name(), "Explicit VR Big Endian");
        assert!(TransferSyntaxRegistry.get("1.2.3.4").is_none());
    }

    #[test]
    fn native_syntaxes_have_no_backend() {
        assert!(get_backend("1.2.840.10008.1.2.1", Htj2kDecoder::Auto).is_none());
        assert!(get_backend("1.2.840.10008.1.2.1.99", Htj2kDecoder::Auto).is_none());
        let backend = get_backend("1.2.840.10008.1.2.1.98", Htj2kDecoder::Auto).unwrap();
        assert_eq!(backend.name(), "encapsulated uncompressed");
    }

    #[cfg(feature = "rle")]
    #[test]
    fn rle_backend_is_registered() {
        let backend = get_backend("1.2.840.10008.1.2.5", Htj2kDecoder::Auto).unwrap();
        assert_eq!(backend.name(), "RLE Lossless");
    }

    #[cfg(not(feature = "hayro-jpeg2000"))]
    #[test]
    fn htj2k_choice_is_honored() {
        assert!(get_backend(
            dicomkit_dictionary_std::uids::HTJ2K,
            Htj2kDecoder::Hayro
        )
        .is_none());
    }

    #[test]
    fn eoi_marker_family() {
        assert!(entries::ends_with_eoi_marker("1.2.840.10008.1.2.4.50"));
        assert!(entries::ends_with_eoi_marker("1.2.840.10008.1.2.4.203"));
        assert!(!entries::ends_with_eoi_marker("1.2.840.10008.1.2.5"));
        assert!(!entries::ends_with_eoi_marker("1.2.840.10008.1.2.4.100"));
    }
}
