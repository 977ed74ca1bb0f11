//! Support for JPEG image decoding.

use dicomkit_encoding::adapters::decode_error::GeometryMismatchSnafu;
use dicomkit_encoding::adapters::{CodecBackend, DecodeResult, Geometry};
use jpeg_decoder::{Decoder, PixelFormat};
use snafu::{ensure, whatever, OptionExt, ResultExt};

/// Backend for JPEG-based transfer syntaxes:
/// baseline, extended (8-bit only) and lossless.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JpegAdapter;

impl CodecBackend for JpegAdapter {
    fn name(&self) -> &'static str {
        "JPEG"
    }

    /// Decode one JPEG frame.
    ///
    /// Component decoding is parallelized by the decoder itself
    /// when built with `rayon`.
    fn decode(&self, encoded: &[u8], geometry: &Geometry, _threads: usize) -> DecodeResult<Vec<u8>> {
        super::check_bits_allocated(geometry)?;

        let mut decoder = Decoder::new(encoded);
        let decoded = decoder
            .decode()
            .map_err(|e| Box::new(e) as Box<_>)
            .whatever_context("JPEG decoder failure")?;
        let info = decoder
            .info()
            .whatever_context("JPEG decoder did not report image information")?;

        ensure!(
            info.width == geometry.columns && info.height == geometry.rows,
            GeometryMismatchSnafu {
                expected: format!("{}x{}", geometry.columns, geometry.rows),
                got: format!("{}x{}", info.width, info.height),
            }
        );

        let (samples_per_pixel, bytes_per_sample) = match info.pixel_format {
            PixelFormat::L8 => (1, 1),
            PixelFormat::L16 => (1, 2),
            PixelFormat::RGB24 => (3, 1),
            PixelFormat::CMYK32 => (4, 1),
            #[allow(unreachable_patterns)]
            other => whatever!("Unsupported JPEG pixel format {:?}", other),
        };
        ensure!(
            samples_per_pixel == geometry.samples_per_pixel,
            GeometryMismatchSnafu {
                expected: format!("{} samples per pixel", geometry.samples_per_pixel),
                got: format!("{} samples per pixel", samples_per_pixel),
            }
        );

        let out = match (bytes_per_sample, geometry.bytes_per_sample()) {
            (1, 1) => decoded,
            // 16-bit samples come out in big endian
            (2, 2) => decoded
                .chunks_exact(2)
                .flat_map(|pair| [pair[1], pair[0]])
                .collect(),
            // 8-bit stream in a 16-bit container
            (1, 2) => decoded.iter().flat_map(|&v| [v, 0]).collect(),
            (got, expected) => {
                return GeometryMismatchSnafu {
                    expected: format!("{} bytes per sample", expected),
                    got: format!("{} bytes per sample", got),
                }
                .fail()
            }
        };

        super::check_frame_size(geometry, &out)?;
        Ok(out)
    }
}
