//! Support for JPEG 2000 and HTJ2K image decoding through OpenJPEG.

use dicomkit_encoding::adapters::decode_error::GeometryMismatchSnafu;
use dicomkit_encoding::adapters::{CodecBackend, DecodeResult, Geometry};
use jpeg2k::Image;
use snafu::{ensure, ResultExt};
use tracing::warn;

// Check jpeg2k backend conflicts
#[cfg(all(feature = "openjp2", feature = "openjpeg-sys"))]
compile_error!(
    "feature \"openjp2\" and feature \"openjpeg-sys\" cannot be enabled at the same time"
);

/// Backend for transfer syntaxes based on JPEG 2000,
/// High-Throughput JPEG 2000 included.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Jpeg2000Adapter;

impl CodecBackend for Jpeg2000Adapter {
    fn name(&self) -> &'static str {
        "JPEG 2000 (OpenJPEG)"
    }

    /// Decode one JPEG 2000 frame.
    ///
    /// OpenJPEG picks its own number of worker threads
    /// when built with the `openjpeg-sys-threads` feature.
    /// With more than one thread,
    /// the components are interleaved in parallel
    /// on the current rayon pool.
    fn decode(&self, encoded: &[u8], geometry: &Geometry, threads: usize) -> DecodeResult<Vec<u8>> {
        super::check_bits_allocated(geometry)?;

        let image = Image::from_bytes(encoded)
            .map_err(|e| Box::new(e) as Box<_>)
            .whatever_context("jpeg2k decoder failure")?;

        ensure!(
            image.width() == u32::from(geometry.columns)
                && image.height() == u32::from(geometry.rows),
            GeometryMismatchSnafu {
                expected: format!("{}x{}", geometry.columns, geometry.rows),
                got: format!("{}x{}", image.width(), image.height()),
            }
        );

        let samples_per_pixel = usize::from(geometry.samples_per_pixel);
        let bytes_per_sample = geometry.bytes_per_sample();
        let columns = usize::from(geometry.columns);
        let mut dst = vec![0; geometry.frame_size()];

        // `get_pixels` would narrow samples down to 8 bits,
        // so components are copied one by one
        let components = image.components();
        ensure!(
            components.len() >= samples_per_pixel,
            GeometryMismatchSnafu {
                expected: format!("{} components", samples_per_pixel),
                got: format!("{} components", components.len()),
            }
        );
        if components.len() > samples_per_pixel {
            warn!(
                "JPEG 2000 image has more components than expected ({} > {})",
                components.len(),
                samples_per_pixel
            );
        }
        let components: Vec<&[i32]> = components
            .iter()
            .take(samples_per_pixel)
            .map(|component| component.data())
            .collect();

        let fill_row = |(row, out): (usize, &mut [u8])| {
            for (component_i, data) in components.iter().enumerate() {
                let samples = data
                    .get(row * columns..(row + 1) * columns)
                    .unwrap_or_default();
                for (col, sample) in samples.iter().enumerate() {
                    let offset = (col * samples_per_pixel + component_i) * bytes_per_sample;
                    if let Some(out) = out.get_mut(offset..offset + bytes_per_sample) {
                        out.copy_from_slice(&sample.to_le_bytes()[..bytes_per_sample]);
                    }
                }
            }
        };
        super::for_each_row(
            &mut dst,
            columns * samples_per_pixel * bytes_per_sample,
            threads,
            fill_row,
        );

        Ok(dst)
    }
}
