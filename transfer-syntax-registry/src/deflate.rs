//! Implementation of Deflated Explicit VR Little Endian.
//!
//! The data set after the file meta group
//! is a raw deflate stream (no zlib header).
use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

/// Inflate a deflated data set.
pub fn inflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 4);
    DeflateDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

/// Deflate an encoded data set into the given writer.
pub fn deflate_into<W: Write>(data: &[u8], to: W) -> std::io::Result<W> {
    let mut encoder = DeflateEncoder::new(to, Compression::fast());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deflate_then_inflate() {
        let data: Vec<u8> = (0..200u8).chain(0..200u8).collect();
        let deflated = deflate_into(&data, Vec::new()).unwrap();
        assert_ne!(deflated, data);
        assert_eq!(inflate(&deflated).unwrap(), data);
    }

    #[test]
    fn corrupt_stream_is_an_error() {
        assert!(inflate(&[0xFF, 0xFF, 0xFF, 0xFF]).is_err());
    }
}
