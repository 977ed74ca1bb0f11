//! Support for RLE Lossless image decoding.
//!
//! See <https://dicom.nema.org/medical/dicom/2023e/output/chtml/part05/chapter_G.html>
use byteordered::byteorder::{ByteOrder, LittleEndian};
use dicomkit_encoding::adapters::decode_error::GeometryMismatchSnafu;
use dicomkit_encoding::adapters::{CodecBackend, DecodeResult, Geometry};
use snafu::{ensure, ensure_whatever, OptionExt};

/// Size of the RLE header: segment count plus 15 offsets.
const HEADER_LEN: usize = 64;

/// Backend for the RLE Lossless transfer syntax (UID `1.2.840.10008.1.2.5`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RleLosslessAdapter;

impl CodecBackend for RleLosslessAdapter {
    fn name(&self) -> &'static str {
        "RLE Lossless"
    }

    /// Decode one RLE Lossless frame.
    ///
    /// With more than one thread,
    /// the segments are unpacked in parallel
    /// on the current rayon pool.
    fn decode(&self, encoded: &[u8], geometry: &Geometry, threads: usize) -> DecodeResult<Vec<u8>> {
        super::check_bits_allocated(geometry)?;

        let bytes_per_sample = geometry.bytes_per_sample();
        let samples_per_pixel = usize::from(geometry.samples_per_pixel);
        let pixels = usize::from(geometry.rows) * usize::from(geometry.columns);

        let mut offsets = read_rle_header(encoded)?;
        ensure!(
            offsets.len() == samples_per_pixel * bytes_per_sample,
            GeometryMismatchSnafu {
                expected: format!("{} segments", samples_per_pixel * bytes_per_sample),
                got: format!("{} segments", offsets.len()),
            }
        );
        offsets.push(encoded.len() as u32);

        let segment_count = offsets.len() - 1;
        let decode_segment = |i: usize| -> DecodeResult<Vec<u8>> {
            let start = offsets[i] as usize;
            let end = offsets[i + 1] as usize;
            let segment = encoded
                .get(start..end)
                .with_whatever_context(|| format!("RLE segment #{} out of bounds", i))?;
            let decoded = unpack_bits(segment, pixels);
            ensure_whatever!(
                decoded.len() == pixels,
                "RLE segment #{} is too short ({} of {} bytes)",
                i,
                decoded.len(),
                pixels
            );
            Ok(decoded)
        };

        let segments = super::map_indexed(segment_count, threads, decode_segment)?;

        // RLE encoded data is ordered like this (for 16-bit, 3 sample):
        //  Segment: 0     | 1     | 2     | 3     | 4     | 5
        //           R MSB | R LSB | G MSB | G LSB | B MSB | B LSB
        // and comes out interleaved by pixel in little endian:
        //    LSB R MSB R LSB G MSB G LSB B MSB B | ...
        let pixel_stride = samples_per_pixel * bytes_per_sample;
        let mut dst = vec![0; pixels * pixel_stride];
        for (i, segment) in segments.iter().enumerate() {
            let sample = i / bytes_per_sample;
            let byte_in_sample = bytes_per_sample - 1 - i % bytes_per_sample;
            let start = sample * bytes_per_sample + byte_in_sample;
            for (value, out) in segment
                .iter()
                .zip(dst[start..].iter_mut().step_by(pixel_stride))
            {
                *out = *value;
            }
        }
        Ok(dst)
    }
}

/// Read the RLE header and return the segment offsets.
fn read_rle_header(fragment: &[u8]) -> DecodeResult<Vec<u32>> {
    let header = fragment
        .get(..HEADER_LEN)
        .whatever_context("RLE fragment is shorter than its header")?;
    let nr_segments = LittleEndian::read_u32(&header[0..4]) as usize;
    ensure_whatever!(
        (1..=15).contains(&nr_segments),
        "Invalid number of RLE segments: {}",
        nr_segments
    );
    let mut offsets = vec![0; nr_segments];
    LittleEndian::read_u32_into(&header[4..4 * (nr_segments + 1)], &mut offsets);
    ensure_whatever!(
        offsets.windows(2).all(|w| w[0] <= w[1])
            && offsets.first().map_or(false, |&o| o as usize >= HEADER_LEN),
        "RLE segment offsets are not in order"
    );
    Ok(offsets)
}

/// Unpack a PackBits segment,
/// stopping once `expected` bytes are produced.
fn unpack_bits(segment: &[u8], expected: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(expected);
    let mut i = 0;
    while i < segment.len() && out.len() < expected {
        let header = segment[i] as i8;
        i += 1;
        if header >= 0 {
            let end = (i + header as usize + 1).min(segment.len());
            out.extend_from_slice(&segment[i..end]);
            i = end;
        } else if header != -128 {
            // -128 is a no-op
            let count = (1 - header as isize) as usize;
            if let Some(&value) = segment.get(i) {
                out.resize(out.len() + count, value);
            }
            i += 1;
        }
    }
    out.truncate(expected);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_util::geometry;
    use dicomkit_encoding::adapters::DecodeError;

    fn rle_frame(segments: &[&[u8]]) -> Vec<u8> {
        let mut out = vec![0; HEADER_LEN];
        LittleEndian::write_u32(&mut out[0..4], segments.len() as u32);
        let mut offset = HEADER_LEN;
        for (i, segment) in segments.iter().enumerate() {
            LittleEndian::write_u32(&mut out[4 + 4 * i..8 + 4 * i], offset as u32);
            offset += segment.len();
        }
        for segment in segments {
            out.extend_from_slice(segment);
        }
        out
    }

    #[test]
    fn test_packbits() {
        let encoded = [
            0xFE, 0xAA, 0x02, 0x80, 0x00, 0x2A, 0xFD, 0xAA, 0x03, 0x80, 0x00, 0x2A, 0x22, 0xF7,
            0xAA,
        ];
        let decoded = unpack_bits(&encoded, 24);
        let expected = [
            0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0xAA, 0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0x22,
            0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
        ];
        assert_eq!(decoded, expected);
    }

    #[test]
    fn decode_16bit_monochrome() {
        // MSB segment, then LSB segment, each a literal run of 4 bytes
        let frame = rle_frame(&[
            &[0x03, 0x01, 0x03, 0x05, 0x07],
            &[0x03, 0x02, 0x04, 0x06, 0x08],
        ]);
        let geometry = geometry(2, 2, 1, 16);
        let out = RleLosslessAdapter.decode(&frame, &geometry, 0).unwrap();
        assert_eq!(out, vec![0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0x08, 0x07]);
    }

    #[test]
    fn decode_8bit_rgb_interleaves_samples() {
        // 1x2 pixels: R run of 2 x 0x10, G literal, B run of 2 x 0x30
        let frame = rle_frame(&[&[0xFF, 0x10], &[0x01, 0x20, 0x21], &[0xFF, 0x30]]);
        let geometry = geometry(1, 2, 3, 8);
        let out = RleLosslessAdapter.decode(&frame, &geometry, 0).unwrap();
        assert_eq!(out, vec![0x10, 0x20, 0x30, 0x10, 0x21, 0x30]);
    }

    #[test]
    fn threads_do_not_change_output() {
        let frame = rle_frame(&[&[0xFD, 0x7F], &[0x03, 0x00, 0x01, 0x02, 0x03]]);
        let geometry = geometry(2, 2, 1, 16);
        let single = RleLosslessAdapter.decode(&frame, &geometry, 0).unwrap();
        let multi = RleLosslessAdapter.decode(&frame, &geometry, 4).unwrap();
        assert_eq!(single, multi);
        assert_eq!(single, vec![0x00, 0x7F, 0x01, 0x7F, 0x02, 0x7F, 0x03, 0x7F]);
    }

    #[test]
    fn segment_count_must_match_geometry() {
        let frame = rle_frame(&[&[0x03, 0x01, 0x03, 0x05, 0x07]]);
        let geometry = geometry(2, 2, 1, 16);
        let err = RleLosslessAdapter.decode(&frame, &geometry, 0).unwrap_err();
        assert!(matches!(err, DecodeError::GeometryMismatch { .. }));
    }

    #[test]
    fn short_segment_is_an_error() {
        let frame = rle_frame(&[&[0x01, 0x01, 0x03]]);
        let geometry = geometry(2, 2, 1, 8);
        let err = RleLosslessAdapter.decode(&frame, &geometry, 0).unwrap_err();
        assert!(matches!(err, DecodeError::Custom { .. }));
    }
}
