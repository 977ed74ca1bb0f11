//! A list of compiled transfer syntax specifiers.
//!
//! The constants exported here refer to the library's built-in support
//! for DICOM transfer syntaxes.
//! Encapsulated transfer syntaxes whose codec was not compiled in
//! are still listed, with no backend,
//! so that their data sets can be read and written.

use crate::adapters::{self, uncompressed::UncompressedAdapter};
use byteordered::Endianness;
use dicomkit_dictionary_std::uids;
use dicomkit_encoding::transfer_syntax::{Codec, TransferSyntax};

/// Create a transfer syntax in explicit VR little endian
/// with encapsulated pixel data.
const fn encapsulated(
    uid: &'static str,
    name: &'static str,
    backend: Option<dicomkit_encoding::DynCodecBackend>,
) -> TransferSyntax {
    TransferSyntax::new(
        uid,
        name,
        Endianness::Little,
        true,
        Codec::EncapsulatedPixelData(backend),
    )
}

// -- the base transfer syntaxes --

/// Implicit VR Little Endian: Default Transfer Syntax for DICOM
pub const IMPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax::new(
    uids::IMPLICIT_VR_LITTLE_ENDIAN,
    "Implicit VR Little Endian",
    Endianness::Little,
    false,
    Codec::None,
);

/// Explicit VR Little Endian
pub const EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax::new(
    uids::EXPLICIT_VR_LITTLE_ENDIAN,
    "Explicit VR Little Endian",
    Endianness::Little,
    true,
    Codec::None,
);

/// Explicit VR Big Endian
pub const EXPLICIT_VR_BIG_ENDIAN: TransferSyntax = TransferSyntax::new(
    uids::EXPLICIT_VR_BIG_ENDIAN,
    "Explicit VR Big Endian",
    Endianness::Big,
    true,
    Codec::None,
);

/// Deflated Explicit VR Little Endian.
///
/// Reading requires the `deflate` feature.
pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax::new(
    uids::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
    "Deflated Explicit VR Little Endian",
    Endianness::Little,
    true,
    Codec::Dataset,
);

/// Encapsulated Uncompressed Explicit VR Little Endian
pub const ENCAPSULATED_UNCOMPRESSED_EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = encapsulated(
    uids::ENCAPSULATED_UNCOMPRESSED_EXPLICIT_VR_LITTLE_ENDIAN,
    "Encapsulated Uncompressed Explicit VR Little Endian",
    Some(&UncompressedAdapter),
);

// -- RLE --

/// RLE Lossless, decoded with the `rle` feature
pub const RLE_LOSSLESS: TransferSyntax =
    encapsulated(uids::RLE_LOSSLESS, "RLE Lossless", adapters::RLE);

// -- JPEG --

/// JPEG Baseline (Process 1), decoded with the `jpeg` feature
pub const JPEG_BASELINE: TransferSyntax = encapsulated(
    uids::JPEG_BASELINE8_BIT,
    "JPEG Baseline (Process 1)",
    adapters::JPEG,
);

/// JPEG Extended (Process 2 & 4), decoded with the `jpeg` feature
pub const JPEG_EXTENDED: TransferSyntax = encapsulated(
    uids::JPEG_EXTENDED12_BIT,
    "JPEG Extended (Process 2 & 4)",
    adapters::JPEG,
);

/// JPEG Lossless, Non-Hierarchical (Process 14), decoded with the `jpeg` feature
pub const JPEG_LOSSLESS_NON_HIERARCHICAL: TransferSyntax = encapsulated(
    uids::JPEG_LOSSLESS,
    "JPEG Lossless, Non-Hierarchical (Process 14)",
    adapters::JPEG,
);

/// JPEG Lossless, Non-Hierarchical, First-Order Prediction
/// (Process 14 [Selection Value 1]), decoded with the `jpeg` feature
pub const JPEG_LOSSLESS_NON_HIERARCHICAL_FIRST_ORDER_PREDICTION: TransferSyntax = encapsulated(
    uids::JPEG_LOSSLESS_SV1,
    "JPEG Lossless, Non-Hierarchical, First-Order Prediction",
    adapters::JPEG,
);

// -- JPEG-LS --

/// JPEG-LS Lossless Image Compression, decoded with the `charls` feature
pub const JPEG_LS_LOSSLESS_IMAGE_COMPRESSION: TransferSyntax = encapsulated(
    uids::JPEGLS_LOSSLESS,
    "JPEG-LS Lossless Image Compression",
    adapters::JPEG_LS,
);

/// JPEG-LS Lossy (Near-Lossless) Image Compression, decoded with the `charls` feature
pub const JPEG_LS_LOSSY_IMAGE_COMPRESSION: TransferSyntax = encapsulated(
    uids::JPEGLS_NEAR_LOSSLESS,
    "JPEG-LS Lossy (Near-Lossless) Image Compression",
    adapters::JPEG_LS,
);

// -- JPEG 2000 --

/// JPEG 2000 Image Compression (Lossless Only)
pub const JPEG_2000_IMAGE_COMPRESSION_LOSSLESS_ONLY: TransferSyntax = encapsulated(
    uids::JPEG2000_LOSSLESS,
    "JPEG 2000 Image Compression (Lossless Only)",
    adapters::JPEG2000,
);

/// JPEG 2000 Image Compression
pub const JPEG_2000_IMAGE_COMPRESSION: TransferSyntax = encapsulated(
    uids::JPEG2000,
    "JPEG 2000 Image Compression",
    adapters::JPEG2000,
);

/// JPEG 2000 Part 2 Multi-component Image Compression (Lossless Only)
pub const JPEG_2000_PART2_MULTI_COMPONENT_IMAGE_COMPRESSION_LOSSLESS_ONLY: TransferSyntax =
    encapsulated(
        uids::JPEG2000_MC_LOSSLESS,
        "JPEG 2000 Part 2 Multi-component Image Compression (Lossless Only)",
        adapters::JPEG2000,
    );

/// JPEG 2000 Part 2 Multi-component Image Compression
pub const JPEG_2000_PART2_MULTI_COMPONENT_IMAGE_COMPRESSION: TransferSyntax = encapsulated(
    uids::JPEG2000_MC,
    "JPEG 2000 Part 2 Multi-component Image Compression",
    adapters::JPEG2000,
);

// -- HTJ2K --

/// High-Throughput JPEG 2000 Image Compression (Lossless Only)
pub const HIGH_THROUGHPUT_JPEG_2000_IMAGE_COMPRESSION_LOSSLESS_ONLY: TransferSyntax =
    encapsulated(
        uids::HTJ2K_LOSSLESS,
        "High-Throughput JPEG 2000 Image Compression (Lossless Only)",
        adapters::JPEG2000,
    );

/// High-Throughput JPEG 2000 with RPCL Options Image Compression (Lossless Only)
pub const HIGH_THROUGHPUT_JPEG_2000_WITH_RPCL_OPTIONS_IMAGE_COMPRESSION_LOSSLESS_ONLY:
    TransferSyntax = encapsulated(
    uids::HTJ2K_LOSSLESS_RPCL,
    "High-Throughput JPEG 2000 with RPCL Options Image Compression (Lossless Only)",
    adapters::JPEG2000,
);

/// High-Throughput JPEG 2000 Image Compression
pub const HIGH_THROUGHPUT_JPEG_2000_IMAGE_COMPRESSION: TransferSyntax = encapsulated(
    uids::HTJ2K,
    "High-Throughput JPEG 2000 Image Compression",
    adapters::JPEG2000,
);

/// Whether the transfer syntax UID is one of the HTJ2K family,
/// whose backend can be chosen at run-time.
pub fn is_htj2k(uid: &str) -> bool {
    matches!(
        uid,
        uids::HTJ2K_LOSSLESS | uids::HTJ2K_LOSSLESS_RPCL | uids::HTJ2K
    )
}

/// Whether the transfer syntax UID belongs to a codec
/// whose frames end with an end-of-image marker (`FF D9`).
///
/// This covers JPEG, JPEG-LS, JPEG 2000 and HTJ2K.
pub fn ends_with_eoi_marker(uid: &str) -> bool {
    let Some(suffix) = uid.strip_prefix("1.2.840.10008.1.2.4.") else {
        return false;
    };
    matches!(
        suffix,
        "50" | "51" | "57" | "70" | "80" | "81" | "90" | "91" | "92" | "93" | "201" | "202" | "203"
    )
}
