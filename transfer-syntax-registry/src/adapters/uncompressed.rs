//! Support for Encapsulated Uncompressed Explicit VR Little Endian.

use dicomkit_encoding::adapters::{CodecBackend, DecodeResult, Geometry};

/// Backend for [Encapsulated Uncompressed Explicit VR Little Endian][1].
///
/// Each frame is stored as is,
/// possibly followed by one byte of padding.
///
/// [1]: https://dicom.nema.org/medical/dicom/2023c/output/chtml/part05/sect_A.4.11.html
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UncompressedAdapter;

impl CodecBackend for UncompressedAdapter {
    fn name(&self) -> &'static str {
        "encapsulated uncompressed"
    }

    fn decode(&self, encoded: &[u8], geometry: &Geometry, _threads: usize) -> DecodeResult<Vec<u8>> {
        let frame_size = geometry.frame_size();
        let frame = encoded.get(..frame_size).unwrap_or(encoded);
        super::check_frame_size(geometry, frame)?;
        Ok(frame.to_vec())
    }
}
