//! This crate decodes DICOM pixel data into typed sample arrays.
//!
//! Uncompressed pixel data is converted directly,
//! while encapsulated pixel data is handed frame by frame
//! to the codec backend registered for the file's transfer syntax.
//! Optionally, the modality transformation
//! (_Modality LUT Sequence_, or _Rescale Slope_ and _Rescale Intercept_)
//! is applied, producing `f32` samples.
//!
//! There are three ways to obtain samples:
//!
//! - [`to_array`] allocates a new [`PixelArray`];
//! - [`decode_into`] fills a caller-provided [`DecodeTarget`],
//!   whose shape and sample type must match exactly;
//! - [`to_array_view`] borrows uncompressed samples without copying.
//!
//! # Examples
//!
//! ```no_run
//! # use std::error::Error;
//! use dicomkit_object::{read_file, ReadOptions};
//! use dicomkit_pixeldata::{DecodeOptions, PixelDecoder};
//!
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let file = read_file("ct.dcm", ReadOptions::new())?;
//! let hounsfield = file.to_array(&DecodeOptions::new().scaled(true))?;
//! println!("{:?} {}", hounsfield.shape(), hounsfield.dtype());
//! #   Ok(())
//! # }
//! ```
//!
//! Decoding every frame of a multi-frame image into a reused buffer:
//!
//! ```no_run
//! # use std::error::Error;
//! use dicomkit_object::{read_file, ReadOptions};
//! use dicomkit_pixeldata::{decode_into_layout, pixel_layout, DecodeOptions, PixelArray};
//!
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let file = read_file("cine.dcm", ReadOptions::new())?;
//! let layout = pixel_layout(&file, &DecodeOptions::new().all_frames())?;
//! let mut frames = PixelArray::zeroed(layout.dtype(), layout.shape());
//! decode_into_layout(&file, &layout, &mut frames.as_target())?;
//! #   Ok(())
//! # }
//! ```
use dicomkit_encoding::adapters::DecodeError;
use dicomkit_object::DicomFile;
use snafu::{Backtrace, Snafu};

pub mod array;
pub mod attribute;
pub mod decode;
pub mod lut;
pub mod options;
pub mod transform;

pub use array::{DataType, DecodeTarget, PixelArray, PixelArrayView, PixelBuffer, PixelSample};
pub use attribute::{GetAttributeError, PixelRepresentation};
pub use decode::{
    decode_into, decode_into_layout, pixel_layout, to_array, to_array_view, FrameSelection,
    PixelLayout, Threads,
};
pub use dicomkit_encoding::Htj2kDecoder;
pub use lut::{LutError, ModalityLut};
pub use options::{DecodeOptions, FrameSentinel};
pub use transform::{ModalityTransform, Rescale};

#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Could not get required DICOM attribute"))]
    GetAttribute {
        #[snafu(backtrace)]
        source: GetAttributeError,
    },

    #[snafu(display("Invalid modality LUT"))]
    ModalityLut {
        #[snafu(backtrace)]
        source: LutError,
    },

    #[snafu(display("Non-finite rescale: slope {}, intercept {}", slope, intercept))]
    NonFiniteRescale {
        slope: f64,
        intercept: f64,
        backtrace: Backtrace,
    },

    #[snafu(display("No pixel data in file"))]
    MissingPixelData { backtrace: Backtrace },

    #[snafu(display("Unsupported BitsAllocated {}", bits_allocated))]
    UnsupportedBitsAllocated {
        bits_allocated: u16,
        backtrace: Backtrace,
    },

    #[snafu(display("Unsupported transfer syntax `{}`", uid))]
    UnsupportedTransferSyntax { uid: String, backtrace: Backtrace },

    #[snafu(display("No codec available for transfer syntax `{}`", uid))]
    MissingCodec { uid: String, backtrace: Backtrace },

    #[snafu(display("Could not decode frame #{} with {}", frame, codec))]
    Decode {
        codec: &'static str,
        frame: usize,
        source: DecodeError,
        backtrace: Backtrace,
    },

    #[snafu(display(
        "{} produced {} bytes for frame #{}, expected {}",
        codec,
        got,
        frame,
        expected
    ))]
    DecodedLength {
        codec: &'static str,
        frame: usize,
        expected: usize,
        got: usize,
        backtrace: Backtrace,
    },

    #[snafu(display("Frame #{} is missing from the pixel sequence", frame))]
    MissingFrame { frame: usize, backtrace: Backtrace },

    #[snafu(display(
        "Pixel data is too short for frame #{}: {} bytes, {} required",
        frame,
        got,
        expected
    ))]
    ShortPixelData {
        frame: usize,
        expected: usize,
        got: usize,
        backtrace: Backtrace,
    },

    #[snafu(display(
        "Image of {} frames of {}x{}x{} samples is too large",
        frames,
        rows,
        columns,
        samples_per_pixel
    ))]
    ImageTooLarge {
        rows: u16,
        columns: u16,
        samples_per_pixel: u16,
        frames: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid frame index {} for an image of {} frames", frame, frames))]
    InvalidFrame {
        frame: i64,
        frames: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("Frame index {} out of range for an image of {} frames", frame, frames))]
    FrameOutOfRange {
        frame: i64,
        frames: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid thread count {}", threads))]
    InvalidThreadCount { threads: i32, backtrace: Backtrace },

    #[cfg(feature = "rayon")]
    #[snafu(display("Could not build decode thread pool"))]
    ThreadPool {
        source: rayon::ThreadPoolBuildError,
        backtrace: Backtrace,
    },

    #[snafu(display("Target shape {:?} does not match decoded shape {:?}", found, expected))]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
        backtrace: Backtrace,
    },

    #[snafu(display("Target sample type {} does not match decoded type {}", found, expected))]
    DTypeMismatch {
        expected: DataType,
        found: DataType,
        backtrace: Backtrace,
    },

    #[snafu(display("Target buffer is not contiguous"))]
    NonContiguousBuffer { backtrace: Backtrace },

    #[snafu(display(
        "Pixel layout is stale: probed at generation {}, file is at {}",
        probed,
        current
    ))]
    StaleLayout {
        probed: u64,
        current: u64,
        backtrace: Backtrace,
    },

    #[snafu(display("Pixel data cannot be viewed without decoding: {}", reason))]
    ViewUnavailable {
        reason: &'static str,
        backtrace: Backtrace,
    },

    #[cfg(feature = "ndarray")]
    #[snafu(display("Invalid shape for ndarray"))]
    Shape {
        source: ndarray::ShapeError,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Pixel data decoding as methods of a DICOM file.
pub trait PixelDecoder {
    /// Probe the layout of the decoded pixel data.
    fn pixel_layout(&self, options: &DecodeOptions) -> Result<PixelLayout>;

    /// Decode the pixel data into a new array.
    fn to_array(&self, options: &DecodeOptions) -> Result<PixelArray>;

    /// Decode the pixel data into a caller-provided buffer.
    fn decode_into(&self, target: &mut DecodeTarget<'_>, options: &DecodeOptions) -> Result<()>;

    /// Borrow the uncompressed samples of a frame.
    fn to_array_view(&self, frame: i64) -> Result<PixelArrayView<'_>>;
}

impl PixelDecoder for DicomFile {
    fn pixel_layout(&self, options: &DecodeOptions) -> Result<PixelLayout> {
        decode::pixel_layout(self, options)
    }

    fn to_array(&self, options: &DecodeOptions) -> Result<PixelArray> {
        decode::to_array(self, options)
    }

    fn decode_into(&self, target: &mut DecodeTarget<'_>, options: &DecodeOptions) -> Result<()> {
        decode::decode_into(self, target, options)
    }

    fn to_array_view(&self, frame: i64) -> Result<PixelArrayView<'_>> {
        decode::to_array_view(self, frame)
    }
}
