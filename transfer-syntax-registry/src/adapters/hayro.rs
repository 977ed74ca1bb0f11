//! Support for JPEG 2000 and HTJ2K image decoding through `hayro-jpeg2000`.

use dicomkit_encoding::adapters::decode_error::{GeometryMismatchSnafu, UnsupportedGeometrySnafu};
use dicomkit_encoding::adapters::{CodecBackend, DecodeResult, Geometry};
use hayro_jpeg2000::{DecodeSettings, Image};
use snafu::{ensure, whatever};

/// Pure Rust backend for transfer syntaxes based on JPEG 2000.
///
/// The decoder produces 8-bit samples,
/// so only images with 8 bits allocated are accepted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HayroJpeg2000Adapter;

impl CodecBackend for HayroJpeg2000Adapter {
    fn name(&self) -> &'static str {
        "JPEG 2000 (hayro)"
    }

    /// Decode one JPEG 2000 frame.
    /// The decoder has no threading of its own,
    /// so the thread count is not used.
    fn decode(&self, encoded: &[u8], geometry: &Geometry, _threads: usize) -> DecodeResult<Vec<u8>> {
        ensure!(
            geometry.bits_allocated == 8,
            UnsupportedGeometrySnafu {
                what: "BitsAllocated",
                value: u32::from(geometry.bits_allocated),
            }
        );

        let image = match Image::new(encoded, &DecodeSettings::default()) {
            Ok(image) => image,
            Err(e) => whatever!("hayro-jpeg2000 decoder failure: {:?}", e),
        };
        ensure!(
            image.width() == u32::from(geometry.columns)
                && image.height() == u32::from(geometry.rows),
            GeometryMismatchSnafu {
                expected: format!("{}x{}", geometry.columns, geometry.rows),
                got: format!("{}x{}", image.width(), image.height()),
            }
        );

        let decoded = match image.decode() {
            Ok(decoded) => decoded,
            Err(e) => whatever!("hayro-jpeg2000 decoder failure: {:?}", e),
        };
        super::check_frame_size(geometry, &decoded)?;
        Ok(decoded)
    }
}
