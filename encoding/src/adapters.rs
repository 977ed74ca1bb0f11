//! Core module for building pixel data codec backends.
//!
//! Transfer syntaxes with encapsulated pixel data
//! are decoded by a [`CodecBackend`],
//! which receives the concatenated fragments of one frame
//! and the image [`Geometry`],
//! and produces the frame's samples in native form.
//! The backends themselves live in `dicomkit-transfer-syntax-registry`.

use snafu::Snafu;
use std::fmt;
use std::str::FromStr;

/// The possible error conditions when decoding (reading) pixel data.
///
/// Users of this type are free to handle errors based on their variant,
/// but should not make decisions based on the display message,
/// since that is not considered part of the API
/// and may change on any new release.
///
/// Implementers of codec backends
/// are recommended to choose the most fitting error variant
/// for the tested condition.
/// When no suitable variant is available,
/// the [`Custom`](DecodeError::Custom) variant may be used.
#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub), module)]
pub enum DecodeError {
    /// A custom error occurred when decoding,
    /// reported as a dynamic error value with a message.
    ///
    /// The [`whatever!`](snafu::whatever) macro can be used
    /// to easily create an error of this kind.
    #[snafu(whatever, display("{}", message))]
    Custom {
        /// The error message.
        message: String,
        /// The underlying error cause, if any.
        #[snafu(source(from(Box<dyn std::error::Error + Send + Sync + 'static>, Some)))]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    /// The image geometry is not supported by this backend.
    #[snafu(display("Unsupported {}: {}", what, value))]
    UnsupportedGeometry {
        /// The name of the offending property.
        what: &'static str,
        /// The offending value.
        value: u32,
    },

    /// The decoded image does not match the declared geometry.
    #[snafu(display(
        "Decoded image does not match the declared geometry: expected {}, got {}",
        expected,
        got
    ))]
    GeometryMismatch {
        /// What the data set declares.
        expected: String,
        /// What the encoded stream contains.
        got: String,
    },
}

/// The result of decoding (reading) pixel data
pub type DecodeResult<T, E = DecodeError> = Result<T, E>;

/// The properties of an image which a backend needs to decode a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Geometry {
    /// Rows (0028,0010)
    pub rows: u16,
    /// Columns (0028,0011)
    pub columns: u16,
    /// Samples per Pixel (0028,0002)
    pub samples_per_pixel: u16,
    /// Bits Allocated (0028,0100)
    pub bits_allocated: u16,
    /// Bits Stored (0028,0101)
    pub bits_stored: u16,
    /// Pixel Representation (0028,0103): 0 unsigned, 1 signed
    pub pixel_representation: u16,
    /// Planar Configuration (0028,0006): 0 interleaved, 1 planar
    pub planar_configuration: u16,
}

impl Geometry {
    /// The number of bytes of each sample in decoded form.
    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_allocated).div_ceil(8).max(1)
    }

    /// The number of samples in one frame.
    pub fn samples_per_frame(&self) -> usize {
        usize::from(self.rows) * usize::from(self.columns) * usize::from(self.samples_per_pixel)
    }

    /// The number of bytes of one decoded frame.
    pub fn frame_size(&self) -> usize {
        self.samples_per_frame() * self.bytes_per_sample()
    }

    /// Whether samples are signed integers.
    pub fn is_signed(&self) -> bool {
        self.pixel_representation == 1
    }
}

/// Trait object responsible for decoding the encapsulated pixel data
/// of one transfer syntax.
///
/// Backends are stateless and shared process-wide.
pub trait CodecBackend: fmt::Debug {
    /// A short name of the codec, used in error reports.
    fn name(&self) -> &'static str;

    /// Decode one frame.
    ///
    /// `encoded` is the concatenation of the frame's fragments, in order.
    /// `threads` is the number of worker threads the backend may use,
    /// where 0 and 1 both mean the calling thread.
    ///
    /// The output is a dense, row-major buffer of
    /// `rows × columns × samples_per_pixel` samples,
    /// interleaved by pixel,
    /// each sample taking `ceil(bits_allocated / 8)` bytes in little endian.
    fn decode(&self, encoded: &[u8], geometry: &Geometry, threads: usize)
        -> DecodeResult<Vec<u8>>;
}

/// Alias type for a dynamically dispatched codec backend.
pub type DynCodecBackend = &'static (dyn CodecBackend + Send + Sync);

/// The implementation to use for High-Throughput JPEG 2000 pixel data.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Htj2kDecoder {
    /// The first available implementation.
    #[default]
    Auto,
    /// OpenJPEG (through `jpeg2k`)
    OpenJpeg,
    /// The pure Rust decoder `hayro-jpeg2000`
    Hayro,
}

/// Error type for an unknown HTJ2K decoder name.
#[derive(Debug, Snafu)]
#[snafu(display("Unknown HTJ2K decoder `{}` (expected auto, openjpeg or hayro)", name))]
pub struct ParseHtj2kDecoderError {
    name: String,
}

impl FromStr for Htj2kDecoder {
    type Err = ParseHtj2kDecoderError;

    /// Names are matched ignoring case, spaces, dashes and underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "auto" | "" => Ok(Htj2kDecoder::Auto),
            "openjpeg" | "openjp2" => Ok(Htj2kDecoder::OpenJpeg),
            "hayro" | "hayrojpeg2000" => Ok(Htj2kDecoder::Hayro),
            _ => ParseHtj2kDecoderSnafu { name: s }.fail(),
        }
    }
}

impl fmt::Display for Htj2kDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Htj2kDecoder::Auto => "auto",
            Htj2kDecoder::OpenJpeg => "openjpeg",
            Htj2kDecoder::Hayro => "hayro",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_sizes() {
        let geometry = Geometry {
            rows: 4,
            columns: 3,
            samples_per_pixel: 3,
            bits_allocated: 16,
            bits_stored: 12,
            pixel_representation: 0,
            planar_configuration: 0,
        };
        assert_eq!(geometry.bytes_per_sample(), 2);
        assert_eq!(geometry.samples_per_frame(), 36);
        assert_eq!(geometry.frame_size(), 72);
        assert!(!geometry.is_signed());
    }

    #[test]
    fn htj2k_decoder_names() {
        assert_eq!("OpenJPEG".parse::<Htj2kDecoder>().unwrap(), Htj2kDecoder::OpenJpeg);
        assert_eq!("open_jp2".parse::<Htj2kDecoder>().unwrap(), Htj2kDecoder::OpenJpeg);
        assert_eq!(" Hayro ".parse::<Htj2kDecoder>().unwrap(), Htj2kDecoder::Hayro);
        assert_eq!("AUTO".parse::<Htj2kDecoder>().unwrap(), Htj2kDecoder::Auto);
        assert!("kakadu".parse::<Htj2kDecoder>().is_err());
        assert_eq!(Htj2kDecoder::OpenJpeg.to_string(), "openjpeg");
    }
}
