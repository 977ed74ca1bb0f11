//! Support for JPEG-LS image decoding.

use charls::CharLS;
use dicomkit_encoding::adapters::{CodecBackend, DecodeResult, Geometry};
use snafu::ResultExt;

/// Backend for the JPEG-LS transfer syntaxes,
/// lossless and near-lossless.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JpegLsAdapter;

impl CodecBackend for JpegLsAdapter {
    fn name(&self) -> &'static str {
        "JPEG-LS"
    }

    fn decode(&self, encoded: &[u8], geometry: &Geometry, _threads: usize) -> DecodeResult<Vec<u8>> {
        super::check_bits_allocated(geometry)?;

        let decoded = CharLS::default()
            .decode(encoded)
            .map_err(|error| error.to_string())
            .with_whatever_context(|error| format!("JPEG-LS decoder failure: {}", error))?;

        super::check_frame_size(geometry, &decoded)?;
        Ok(decoded)
    }
}
