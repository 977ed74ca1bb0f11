//! Root module for the pixel data codec backends.
//!
//! Support for certain transfer syntaxes
//! is added via Cargo features.
//!
//! - [`jpeg`](jpeg) provides native JPEG decoding
//!   (baseline, extended and lossless).
//!   Requires the `jpeg` feature,
//!   enabled by default.
//! - [`jpeg2k`](jpeg2k) contains JPEG 2000 and HTJ2K support
//!   through [OpenJPEG].
//!   The `openjp2` feature provides decoding
//!   via the [Rust port of OpenJPEG][OpenJPEG-rs],
//!   which works on Linux and Mac OS, but not on Windows.
//!   Alternatively, enable the `openjpeg-sys` feature
//!   to statically link to the OpenJPEG reference implementation.
//! - [`hayro`](hayro) decodes JPEG 2000 and HTJ2K in pure Rust.
//!   Requires the `hayro-jpeg2000` feature.
//! - [`jpegls`](jpegls) decodes JPEG-LS through CharLS.
//!   Requires the `charls` feature.
//! - [`rle_lossless`](rle_lossless) provides native RLE lossless decoding.
//!   Requires the `rle` feature,
//!   enabled by default.
//!
//! [OpenJPEG]: https://github.com/uclouvain/openjpeg
//! [OpenJPEG-rs]: https://crates.io/crates/openjp2
use dicomkit_encoding::adapters::decode_error::{GeometryMismatchSnafu, UnsupportedGeometrySnafu};
use dicomkit_encoding::adapters::{DecodeResult, Geometry};
use dicomkit_encoding::DynCodecBackend;
use snafu::ensure;

#[cfg(feature = "hayro-jpeg2000")]
pub mod hayro;
#[cfg(feature = "jpeg")]
pub mod jpeg;
#[cfg(any(feature = "openjp2", feature = "openjpeg-sys"))]
pub mod jpeg2k;
#[cfg(feature = "charls")]
pub mod jpegls;
#[cfg(feature = "rle")]
pub mod rle_lossless;

pub mod uncompressed;

/// **Note:** This module is a stub.
/// Enable the `jpeg` feature to use this module.
#[cfg(not(feature = "jpeg"))]
pub mod jpeg {}

/// **Note:** This module is a stub.
/// Enable either `openjp2` or `openjpeg-sys` to use this module.
#[cfg(not(any(feature = "openjp2", feature = "openjpeg-sys")))]
pub mod jpeg2k {}

/// **Note:** This module is a stub.
/// Enable the `hayro-jpeg2000` feature to use this module.
#[cfg(not(feature = "hayro-jpeg2000"))]
pub mod hayro {}

/// **Note:** This module is a stub.
/// Enable the `rle` feature to use this module.
#[cfg(not(feature = "rle"))]
pub mod rle_lossless {}

/// **Note:** This module is a stub.
/// Enable the `charls` feature to use this module.
#[cfg(not(feature = "charls"))]
pub mod jpegls {}

/// The JPEG backend, if compiled in.
#[cfg(feature = "jpeg")]
pub const JPEG: Option<DynCodecBackend> = Some(&jpeg::JpegAdapter);
/// The JPEG backend, if compiled in.
#[cfg(not(feature = "jpeg"))]
pub const JPEG: Option<DynCodecBackend> = None;

/// The RLE Lossless backend, if compiled in.
#[cfg(feature = "rle")]
pub const RLE: Option<DynCodecBackend> = Some(&rle_lossless::RleLosslessAdapter);
/// The RLE Lossless backend, if compiled in.
#[cfg(not(feature = "rle"))]
pub const RLE: Option<DynCodecBackend> = None;

/// The OpenJPEG backend, if compiled in.
#[cfg(any(feature = "openjp2", feature = "openjpeg-sys"))]
pub const OPENJPEG: Option<DynCodecBackend> = Some(&jpeg2k::Jpeg2000Adapter);
/// The OpenJPEG backend, if compiled in.
#[cfg(not(any(feature = "openjp2", feature = "openjpeg-sys")))]
pub const OPENJPEG: Option<DynCodecBackend> = None;

/// The hayro JPEG 2000 backend, if compiled in.
#[cfg(feature = "hayro-jpeg2000")]
pub const HAYRO: Option<DynCodecBackend> = Some(&hayro::HayroJpeg2000Adapter);
/// The hayro JPEG 2000 backend, if compiled in.
#[cfg(not(feature = "hayro-jpeg2000"))]
pub const HAYRO: Option<DynCodecBackend> = None;

/// The JPEG-LS backend, if compiled in.
#[cfg(feature = "charls")]
pub const JPEG_LS: Option<DynCodecBackend> = Some(&jpegls::JpegLsAdapter);
/// The JPEG-LS backend, if compiled in.
#[cfg(not(feature = "charls"))]
pub const JPEG_LS: Option<DynCodecBackend> = None;

/// The preferred JPEG 2000 backend:
/// OpenJPEG when available, hayro otherwise.
pub const JPEG2000: Option<DynCodecBackend> = match OPENJPEG {
    Some(backend) => Some(backend),
    None => HAYRO,
};

/// Check that the backend can produce samples of this geometry.
/// Every backend here works with 8 or 16 bits allocated.
pub(crate) fn check_bits_allocated(geometry: &Geometry) -> DecodeResult<()> {
    ensure!(
        geometry.bits_allocated == 8 || geometry.bits_allocated == 16,
        UnsupportedGeometrySnafu {
            what: "BitsAllocated",
            value: u32::from(geometry.bits_allocated),
        }
    );
    Ok(())
}

/// Check that a decoded frame has the expected size in bytes.
pub(crate) fn check_frame_size(geometry: &Geometry, decoded: &[u8]) -> DecodeResult<()> {
    ensure!(
        decoded.len() == geometry.frame_size(),
        GeometryMismatchSnafu {
            expected: format!("{} bytes", geometry.frame_size()),
            got: format!("{} bytes", decoded.len()),
        }
    );
    Ok(())
}

/// Compute `f` for each index in `0..count`, in order.
/// With more than one thread,
/// the indices are spread over the current rayon pool.
#[cfg(all(feature = "rle", feature = "rayon"))]
pub(crate) fn map_indexed<T, F>(count: usize, threads: usize, f: F) -> DecodeResult<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> DecodeResult<T> + Send + Sync,
{
    use rayon::prelude::*;
    if threads > 1 {
        (0..count).into_par_iter().map(f).collect()
    } else {
        (0..count).map(f).collect()
    }
}

#[cfg(all(feature = "rle", not(feature = "rayon")))]
pub(crate) fn map_indexed<T, F>(count: usize, _threads: usize, f: F) -> DecodeResult<Vec<T>>
where
    F: Fn(usize) -> DecodeResult<T>,
{
    (0..count).map(f).collect()
}

/// Call `fill_row` with the index and bytes of each row of `dst`.
/// With more than one thread,
/// the rows are spread over the current rayon pool.
#[cfg(all(any(feature = "openjp2", feature = "openjpeg-sys"), feature = "rayon"))]
pub(crate) fn for_each_row<F>(dst: &mut [u8], row_len: usize, threads: usize, fill_row: F)
where
    F: Fn((usize, &mut [u8])) + Send + Sync,
{
    use rayon::prelude::*;
    if threads > 1 {
        dst.par_chunks_mut(row_len).enumerate().for_each(fill_row);
    } else {
        dst.chunks_mut(row_len).enumerate().for_each(fill_row);
    }
}

#[cfg(all(any(feature = "openjp2", feature = "openjpeg-sys"), not(feature = "rayon")))]
pub(crate) fn for_each_row<F>(dst: &mut [u8], row_len: usize, _threads: usize, fill_row: F)
where
    F: Fn((usize, &mut [u8])),
{
    dst.chunks_mut(row_len).enumerate().for_each(fill_row);
}


#[cfg(test)]
mod tests {
    #[cfg(feature = "rle")]
    #[test]
    fn indexed_results_keep_their_order() {
        let square = |i: usize| -> super::DecodeResult<usize> { Ok(i * i) };
        let sequential = super::map_indexed(40, 1, square).unwrap();
        let parallel = super::map_indexed(40, 4, square).unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(parallel[7], 49);
    }

    #[cfg(any(feature = "openjp2", feature = "openjpeg-sys"))]
    #[test]
    fn rows_are_filled_with_any_thread_count() {
        let fill_row = |(row, out): (usize, &mut [u8])| out.fill(row as u8);
        let mut sequential = vec![0_u8; 12];
        super::for_each_row(&mut sequential, 3, 1, fill_row);
        let mut parallel = vec![0_u8; 12];
        super::for_each_row(&mut parallel, 3, 4, fill_row);
        assert_eq!(sequential, parallel);
        assert_eq!(parallel, vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 3, 3, 3]);
    }
}
