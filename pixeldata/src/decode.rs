//! The pixel data decode pipeline.
//!
//! Decoding is split in two steps.
//! [`pixel_layout`] probes the file for the geometry,
//! sample type and shape of the output,
//! and resolves the options against them.
//! [`decode_into_layout`] then validates the caller's target
//! against the layout before any decode work is done,
//! and fills it frame by frame.
use crate::array::{
    with_data_type, DataType, DecodeTarget, PixelArray, PixelArrayView, PixelSample, Shape,
};
use crate::attribute::{self, PixelRepresentation};
use crate::lut::{has_modality_lut, ModalityLut};
use crate::options::{DecodeOptions, FrameSentinel};
use crate::transform::ModalityTransform;
use crate::{
    DTypeMismatchSnafu, DecodeSnafu, DecodedLengthSnafu, FrameOutOfRangeSnafu,
    GetAttributeSnafu, ImageTooLargeSnafu, InvalidFrameSnafu, InvalidThreadCountSnafu, MissingCodecSnafu,
    MissingFrameSnafu, MissingPixelDataSnafu, ModalityLutSnafu, NonFiniteRescaleSnafu, Result,
    ShapeMismatchSnafu, ShortPixelDataSnafu, StaleLayoutSnafu, UnsupportedBitsAllocatedSnafu,
    UnsupportedTransferSyntaxSnafu, ViewUnavailableSnafu,
};
use dicomkit_dictionary_std::tags;
use dicomkit_encoding::{DynCodecBackend, Endianness, Geometry, Htj2kDecoder};
use dicomkit_object::{DataElement, DicomFile, PixelSequence};
use dicomkit_transfer_syntax_registry::get_backend;
use snafu::{ensure, OptionExt, ResultExt};
use std::borrow::Cow;
use tracing::{debug, trace};

#[cfg(feature = "rayon")]
use once_cell::sync::Lazy;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "rayon")]
use std::collections::HashMap;
#[cfg(feature = "rayon")]
use std::sync::{Arc, Mutex};

/// Where decode work runs.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub enum Threads {
    /// on the calling thread only
    Calling,
    /// on every logical CPU
    All,
    /// on a dedicated pool of this many workers
    Pool(usize),
}

impl Threads {
    /// Interpret a thread count option.
    pub fn from_option(threads: i32) -> Result<Self> {
        match threads {
            -1 => Ok(Threads::All),
            0 => Ok(Threads::Calling),
            n if n > 0 => Ok(Threads::Pool(n as usize)),
            _ => InvalidThreadCountSnafu { threads }.fail(),
        }
    }

    /// The thread count handed to codec backends.
    fn backend_threads(self) -> usize {
        match self {
            Threads::Calling => 1,
            Threads::All => std::thread::available_parallelism().map_or(1, |n| n.get()),
            Threads::Pool(n) => n,
        }
    }
}

/// The frames selected for decoding.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub enum FrameSelection {
    /// one frame, by index
    Single(usize),
    /// every frame, stacked along a leading axis
    All,
}

/// The element holding the pixel samples.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
enum PixelDataKind {
    Integer,
    Float,
    DoubleFloat,
}

impl PixelDataKind {
    fn tag(self) -> dicomkit_core::Tag {
        match self {
            PixelDataKind::Integer => tags::PIXEL_DATA,
            PixelDataKind::Float => tags::FLOAT_PIXEL_DATA,
            PixelDataKind::DoubleFloat => tags::DOUBLE_FLOAT_PIXEL_DATA,
        }
    }
}

/// The outcome of probing a file for its pixel data:
/// everything needed to allocate or validate an output buffer.
///
/// A layout is only valid for the file state it was probed from.
/// Changing any pixel-affecting attribute afterwards
/// makes [`decode_into_layout`] fail with a stale layout error.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelLayout {
    geometry: Geometry,
    kind: PixelDataKind,
    encapsulated: bool,
    native_dtype: DataType,
    dtype: DataType,
    shape: Shape,
    frame_samples: usize,
    stored_frame_size: usize,
    number_of_frames: u32,
    selection: FrameSelection,
    threads: Threads,
    htj2k_decoder: Htj2kDecoder,
    transform: Option<ModalityTransform>,
    transfer_syntax: String,
    generation: u64,
}

impl PixelLayout {
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// The type of the output samples.
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// The type of the samples as stored.
    pub fn native_dtype(&self) -> DataType {
        self.native_dtype
    }

    /// The shape of the output.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The number of frames in the pixel data.
    pub fn number_of_frames(&self) -> u32 {
        self.number_of_frames
    }

    pub fn selection(&self) -> FrameSelection {
        self.selection
    }

    pub fn threads(&self) -> Threads {
        self.threads
    }

    /// Whether the pixel data is encapsulated.
    pub fn is_encapsulated(&self) -> bool {
        self.encapsulated
    }

    /// The modality transformation applied to the output, if any.
    pub fn transform(&self) -> Option<&ModalityTransform> {
        self.transform.as_ref()
    }

    /// The pixel generation of the file when it was probed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The number of samples of one output frame.
    pub fn frame_samples(&self) -> usize {
        self.frame_samples
    }

    /// The number of bytes of one stored frame.
    fn stored_frame_size(&self) -> usize {
        self.stored_frame_size
    }

    /// The indices of the selected frames, in output order.
    pub fn frames(&self) -> std::ops::Range<usize> {
        match self.selection {
            FrameSelection::Single(frame) => frame..frame + 1,
            FrameSelection::All => 0..self.number_of_frames as usize,
        }
    }
}

fn pixel_data_element(file: &DicomFile) -> Result<(PixelDataKind, &DataElement)> {
    [
        PixelDataKind::Integer,
        PixelDataKind::Float,
        PixelDataKind::DoubleFloat,
    ]
    .into_iter()
    .find_map(|kind| file.get_dataelement(kind.tag()).element().map(|e| (kind, e)))
    .context(MissingPixelDataSnafu)
}

fn native_dtype(kind: PixelDataKind, bits_allocated: u16, signed: bool) -> Result<DataType> {
    Ok(match (kind, bits_allocated, signed) {
        (PixelDataKind::Float, _, _) => DataType::F32,
        (PixelDataKind::DoubleFloat, _, _) => DataType::F64,
        (_, 8, false) => DataType::U8,
        (_, 8, true) => DataType::I8,
        (_, 16, false) => DataType::U16,
        (_, 16, true) => DataType::I16,
        (_, 32, false) => DataType::U32,
        (_, 32, true) => DataType::I32,
        _ => return UnsupportedBitsAllocatedSnafu { bits_allocated }.fail(),
    })
}

fn resolve_frame(frame: i64, frames: u32, sentinel: FrameSentinel) -> Result<FrameSelection> {
    match frame {
        -1 if sentinel == FrameSentinel::AllFrames => Ok(FrameSelection::All),
        -1 if frames == 1 => Ok(FrameSelection::Single(0)),
        -1 => InvalidFrameSnafu { frame, frames }.fail(),
        f if f >= 0 => {
            ensure!(f < i64::from(frames), FrameOutOfRangeSnafu { frame, frames });
            Ok(FrameSelection::Single(f as usize))
        }
        _ => InvalidFrameSnafu { frame, frames }.fail(),
    }
}

fn modality_transform(file: &DicomFile, signed: bool) -> Result<Option<ModalityTransform>> {
    if has_modality_lut(file) {
        let lut = ModalityLut::from_file(file, signed).context(ModalityLutSnafu)?;
        return Ok(lut.map(ModalityTransform::Lut));
    }
    match attribute::rescale(file).context(GetAttributeSnafu)? {
        Some(rescale) => {
            ensure!(
                rescale.slope.is_finite() && rescale.intercept.is_finite(),
                NonFiniteRescaleSnafu {
                    slope: rescale.slope,
                    intercept: rescale.intercept,
                }
            );
            Ok(Some(ModalityTransform::Rescale(rescale)))
        }
        None => Ok(None),
    }
}

/// Probe the file for the layout of its decoded pixel data,
/// resolving the frame, scaling and thread options.
///
/// No pixel data is decoded.
pub fn pixel_layout(file: &DicomFile, options: &DecodeOptions) -> Result<PixelLayout> {
    let threads = Threads::from_option(options.threads)?;
    let (kind, element) = pixel_data_element(file)?;

    let rows = attribute::rows(file).context(GetAttributeSnafu)?;
    let columns = attribute::cols(file).context(GetAttributeSnafu)?;
    let samples_per_pixel = attribute::samples_per_pixel(file).context(GetAttributeSnafu)?;
    let planar_configuration = attribute::planar_configuration(file).context(GetAttributeSnafu)?;
    let pixel_representation =
        attribute::pixel_representation(file).context(GetAttributeSnafu)?;
    let signed = pixel_representation == PixelRepresentation::Signed;
    let bits_allocated = match kind {
        PixelDataKind::Integer => attribute::bits_allocated(file).context(GetAttributeSnafu)?,
        PixelDataKind::Float => 32,
        PixelDataKind::DoubleFloat => 64,
    };
    let bits_stored = attribute::bits_stored(file, bits_allocated).context(GetAttributeSnafu)?;
    let native_dtype = native_dtype(kind, bits_allocated, signed)?;

    let pixel_sequence = element.pixel_sequence();
    let number_of_frames = match pixel_sequence {
        Some(sequence) if file.get_dataelement(tags::NUMBER_OF_FRAMES).is_missing() => {
            sequence.number_of_frames().max(1) as u32
        }
        _ => attribute::number_of_frames(file).context(GetAttributeSnafu)?,
    };
    let selection = resolve_frame(options.frame, number_of_frames, options.frame_sentinel)?;

    let transform = if options.scaled && samples_per_pixel == 1 {
        modality_transform(file, signed)?
    } else {
        None
    };
    let dtype = if transform.is_some() {
        DataType::F32
    } else {
        native_dtype
    };

    let too_large = ImageTooLargeSnafu {
        rows,
        columns,
        samples_per_pixel,
        frames: number_of_frames,
    };
    let selected_frames = match selection {
        FrameSelection::Single(_) => 1,
        FrameSelection::All => number_of_frames as usize,
    };
    let frame_samples = usize::from(rows)
        .checked_mul(usize::from(columns))
        .and_then(|n| n.checked_mul(usize::from(samples_per_pixel)))
        .context(too_large)?;
    let stored_frame_size = frame_samples
        .checked_mul(native_dtype.size())
        .context(too_large)?;
    // every frame must be addressable in the stored value
    stored_frame_size
        .checked_mul(number_of_frames as usize)
        .context(too_large)?;
    let output_size = frame_samples
        .checked_mul(selected_frames)
        .and_then(|n| n.checked_mul(dtype.size()))
        .filter(|&n| n <= isize::MAX as usize)
        .context(too_large)?;

    let mut shape = Shape::new();
    if selection == FrameSelection::All {
        shape.push(number_of_frames as usize);
    }
    shape.push(usize::from(rows));
    shape.push(usize::from(columns));
    if samples_per_pixel > 1 {
        shape.push(usize::from(samples_per_pixel));
    }

    let layout = PixelLayout {
        geometry: Geometry {
            rows,
            columns,
            samples_per_pixel,
            bits_allocated,
            bits_stored,
            pixel_representation: signed as u16,
            planar_configuration,
        },
        kind,
        encapsulated: pixel_sequence.is_some(),
        native_dtype,
        dtype,
        shape,
        frame_samples,
        stored_frame_size,
        number_of_frames,
        selection,
        threads,
        htj2k_decoder: options.htj2k_decoder,
        transform,
        transfer_syntax: file.transfer_syntax().to_string(),
        generation: file.pixel_generation(),
    };
    debug!(
        "Pixel layout of {}: {:?} {} ({} frames, {:?}, {} bytes)",
        file.name(),
        layout.shape(),
        layout.dtype,
        number_of_frames,
        selection,
        output_size
    );
    Ok(layout)
}

/// Decode the pixel data into a newly allocated array.
pub fn to_array(file: &DicomFile, options: &DecodeOptions) -> Result<PixelArray> {
    let layout = pixel_layout(file, options)?;
    FrameSource::new(file, &layout)?.check_frames(&layout)?;
    let mut array = PixelArray::zeroed(layout.dtype, layout.shape());
    decode_into_layout(file, &layout, &mut array.as_target())?;
    Ok(array)
}

/// Decode the pixel data into a caller-provided buffer,
/// which must match the decoded shape and sample type exactly.
pub fn decode_into(
    file: &DicomFile,
    target: &mut DecodeTarget<'_>,
    options: &DecodeOptions,
) -> Result<()> {
    let layout = pixel_layout(file, options)?;
    decode_into_layout(file, &layout, target)
}

/// Decode the pixel data into a caller-provided buffer,
/// using a layout probed earlier.
///
/// The target is validated against the layout before any decoding.
pub fn decode_into_layout(
    file: &DicomFile,
    layout: &PixelLayout,
    target: &mut DecodeTarget<'_>,
) -> Result<()> {
    let generation = file.pixel_generation();
    ensure!(
        generation == layout.generation,
        StaleLayoutSnafu {
            probed: layout.generation,
            current: generation,
        }
    );
    ensure!(
        target.dtype() == layout.dtype,
        DTypeMismatchSnafu {
            expected: layout.dtype,
            found: target.dtype(),
        }
    );
    ensure!(
        target.shape() == layout.shape(),
        ShapeMismatchSnafu {
            expected: layout.shape().to_vec(),
            found: target.shape().to_vec(),
        }
    );
    let data = target.data_mut()?;
    let source = FrameSource::new(file, layout)?;
    source.check_frames(layout)?;

    with_data_type!(layout.dtype, T => {
        let out = T::target_slice(data).context(DTypeMismatchSnafu {
            expected: layout.dtype,
            found: layout.dtype,
        })?;
        run_with_threads(layout.threads, |parallel| {
            decode_frames::<T>(&source, layout, out, parallel)
        })
    })
}

#[cfg(feature = "rayon")]
fn run_with_threads<F>(threads: Threads, work: F) -> Result<()>
where
    F: FnOnce(bool) -> Result<()> + Send,
{
    match threads {
        Threads::Calling => work(false),
        Threads::All => work(true),
        Threads::Pool(n) => thread_pool(n)?.install(|| work(n > 1)),
    }
}

/// Dedicated thread pools, by number of workers.
#[cfg(feature = "rayon")]
static THREAD_POOLS: Lazy<Mutex<HashMap<usize, Arc<rayon::ThreadPool>>>> =
    Lazy::new(Default::default);

/// Get the pool of `n` workers, building it on first use.
#[cfg(feature = "rayon")]
fn thread_pool(n: usize) -> Result<Arc<rayon::ThreadPool>> {
    let mut pools = THREAD_POOLS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(pool) = pools.get(&n) {
        return Ok(Arc::clone(pool));
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .build()
        .context(crate::ThreadPoolSnafu)?;
    debug!("Built a decode thread pool of {} workers", n);
    let pool = Arc::new(pool);
    pools.insert(n, Arc::clone(&pool));
    Ok(pool)
}

#[cfg(not(feature = "rayon"))]
fn run_with_threads<F>(_threads: Threads, work: F) -> Result<()>
where
    F: FnOnce(bool) -> Result<()>,
{
    work(false)
}

/// Access to the stored bytes of each frame.
enum FrameSource<'a> {
    Native {
        bytes: &'a [u8],
        endianness: Endianness,
    },
    Encapsulated {
        sequence: &'a PixelSequence,
        backend: DynCodecBackend,
    },
}

/// The bytes of one frame, ready for sample conversion.
struct FrameBytes<'a> {
    bytes: Cow<'a, [u8]>,
    endianness: Endianness,
    planar: bool,
}

impl<'a> FrameSource<'a> {
    fn new(file: &'a DicomFile, layout: &PixelLayout) -> Result<Self> {
        let element = file
            .get_dataelement(layout.kind.tag())
            .element()
            .context(MissingPixelDataSnafu)?;
        if let Some(sequence) = element.pixel_sequence() {
            let uid = layout.transfer_syntax.as_str();
            let Some(backend) = get_backend(uid, layout.htj2k_decoder) else {
                return match file.transfer_syntax_entry() {
                    Some(ts) => MissingCodecSnafu { uid: ts.uid() }.fail(),
                    None => UnsupportedTransferSyntaxSnafu { uid }.fail(),
                };
            };
            trace!("Decoding {} with {}", uid, backend.name());
            return Ok(FrameSource::Encapsulated { sequence, backend });
        }
        Ok(FrameSource::Native {
            bytes: element.value_bytes().unwrap_or_default(),
            endianness: element.endianness(),
        })
    }

    /// Check that every selected frame is present,
    /// before any output is allocated or written.
    fn check_frames(&self, layout: &PixelLayout) -> Result<()> {
        let Some(last) = layout.frames().last() else {
            return Ok(());
        };
        match self {
            FrameSource::Native { bytes, .. } => {
                let expected = (last + 1) * layout.stored_frame_size();
                ensure!(
                    bytes.len() >= expected,
                    ShortPixelDataSnafu {
                        frame: last,
                        expected,
                        got: bytes.len(),
                    }
                );
            }
            FrameSource::Encapsulated { sequence, .. } => {
                ensure!(
                    last < sequence.number_of_frames(),
                    MissingFrameSnafu { frame: last }
                );
            }
        }
        Ok(())
    }

    fn frame(&self, index: usize, layout: &PixelLayout, threads: usize) -> Result<FrameBytes<'a>> {
        let frame_size = layout.stored_frame_size();
        match self {
            FrameSource::Native { bytes, endianness } => {
                let start = index * frame_size;
                let end = start + frame_size;
                let bytes = bytes.get(start..end).context(ShortPixelDataSnafu {
                    frame: index,
                    expected: end,
                    got: bytes.len(),
                })?;
                Ok(FrameBytes {
                    bytes: Cow::Borrowed(bytes),
                    endianness: *endianness,
                    planar: layout.geometry.planar_configuration == 1
                        && layout.geometry.samples_per_pixel > 1,
                })
            }
            FrameSource::Encapsulated { sequence, backend } => {
                let encoded = sequence
                    .frame_encoded_bytes(index)
                    .context(MissingFrameSnafu { frame: index })?;
                let decoded = backend
                    .decode(&encoded, &layout.geometry, threads)
                    .context(DecodeSnafu {
                        codec: backend.name(),
                        frame: index,
                    })?;
                ensure!(
                    decoded.len() >= frame_size,
                    DecodedLengthSnafu {
                        codec: backend.name(),
                        frame: index,
                        expected: frame_size,
                        got: decoded.len(),
                    }
                );
                Ok(FrameBytes {
                    bytes: Cow::Owned(decoded),
                    endianness: Endianness::Little,
                    planar: false,
                })
            }
        }
    }
}

fn read_as_f64<N: PixelSample>(bytes: &[u8], endianness: Endianness) -> f64 {
    N::read(bytes, endianness).to_f64()
}

fn decode_frames<T: PixelSample>(
    source: &FrameSource<'_>,
    layout: &PixelLayout,
    out: &mut [T],
    parallel: bool,
) -> Result<()> {
    let frame_len = layout.frame_samples();
    let frames = layout.frames();
    let threads = if parallel {
        layout.threads.backend_threads()
    } else {
        1
    };
    let work = |(out, index): (&mut [T], usize)| -> Result<()> {
        let frame = source.frame(index, layout, threads)?;
        convert_frame(out, &frame, layout, parallel);
        Ok(())
    };

    #[cfg(feature = "rayon")]
    if parallel && frames.len() > 1 {
        return out
            .par_chunks_mut(frame_len)
            .zip(frames.into_par_iter())
            .try_for_each(work);
    }
    out.chunks_mut(frame_len).zip(frames).try_for_each(work)
}

/// Write the samples of one frame to `out`, row-major and interleaved.
fn convert_frame<T: PixelSample>(
    out: &mut [T],
    frame: &FrameBytes<'_>,
    layout: &PixelLayout,
    parallel: bool,
) {
    let rows = usize::from(layout.geometry.rows);
    let cols = usize::from(layout.geometry.columns);
    let spp = usize::from(layout.geometry.samples_per_pixel);
    let size = layout.native_dtype.size();
    let bytes: &[u8] = &frame.bytes;
    let endianness = frame.endianness;
    let planar = frame.planar;
    let transform = layout.transform.as_ref();
    let read_stored: fn(&[u8], Endianness) -> f64 =
        with_data_type!(layout.native_dtype, N => read_as_f64::<N>);

    let fill_row = |(row, out): (usize, &mut [T])| {
        for col in 0..cols {
            for sample in 0..spp {
                let index = if planar {
                    sample * rows * cols + row * cols + col
                } else {
                    (row * cols + col) * spp + sample
                };
                let at = index * size;
                let stored = &bytes[at..at + size];
                out[col * spp + sample] = match transform {
                    None => T::read(stored, endianness),
                    Some(transform) => {
                        T::from_f64(f64::from(transform.apply(read_stored(stored, endianness))))
                    }
                };
            }
        }
    };

    for_each_row(out, cols * spp, parallel, fill_row);
}

#[cfg(feature = "rayon")]
fn for_each_row<T, F>(out: &mut [T], row_len: usize, parallel: bool, fill_row: F)
where
    T: Send,
    F: Fn((usize, &mut [T])) + Send + Sync,
{
    if parallel {
        out.par_chunks_mut(row_len).enumerate().for_each(fill_row);
    } else {
        out.chunks_mut(row_len).enumerate().for_each(fill_row);
    }
}

#[cfg(not(feature = "rayon"))]
fn for_each_row<T, F>(out: &mut [T], row_len: usize, _parallel: bool, fill_row: F)
where
    F: Fn((usize, &mut [T])),
{
    out.chunks_mut(row_len).enumerate().for_each(fill_row);
}

/// Borrow the samples of one frame without decoding or copying them.
///
/// Only uncompressed pixel data in the host's byte order qualifies:
/// compressed or encapsulated pixel data,
/// big endian data, planar color data
/// and pixel data shorter than declared are rejected.
pub fn to_array_view(file: &DicomFile, frame: i64) -> Result<PixelArrayView<'_>> {
    let layout = pixel_layout(file, &DecodeOptions::new().frame(frame).threads(0))?;
    let unavailable = |reason: &'static str| ViewUnavailableSnafu { reason };

    let native = file.transfer_syntax_entry().is_some_and(|ts| ts.is_native());
    ensure!(native, unavailable("the transfer syntax is compressed"));
    ensure!(!layout.encapsulated, unavailable("pixel data is encapsulated"));
    let element = file
        .get_dataelement(layout.kind.tag())
        .element()
        .context(MissingPixelDataSnafu)?;
    let host_little_endian = cfg!(target_endian = "little");
    ensure!(
        layout.native_dtype.size() == 1
            || (element.endianness() == Endianness::Little && host_little_endian),
        unavailable("pixel data is not in the host's byte order")
    );
    ensure!(
        layout.geometry.planar_configuration == 0 || layout.geometry.samples_per_pixel == 1,
        unavailable("pixel data is planar")
    );

    let frame_size = layout.stored_frame_size();
    let start = layout.frames().start * frame_size;
    let bytes = element
        .value_bytes()
        .and_then(|bytes| bytes.get(start..start + frame_size))
        .context(unavailable("pixel data is shorter than declared"))?;
    PixelArrayView::new(bytes, layout.native_dtype, layout.shape())
        .context(unavailable("pixel data is not aligned for its sample type"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-1, 1, FrameSentinel::Single, Some(FrameSelection::Single(0)))]
    #[case(-1, 3, FrameSentinel::Single, None)]
    #[case(-1, 3, FrameSentinel::AllFrames, Some(FrameSelection::All))]
    #[case(2, 3, FrameSentinel::Single, Some(FrameSelection::Single(2)))]
    #[case(3, 3, FrameSentinel::Single, None)]
    #[case(-2, 3, FrameSentinel::AllFrames, None)]
    fn frame_resolution(
        #[case] frame: i64,
        #[case] frames: u32,
        #[case] sentinel: FrameSentinel,
        #[case] expected: Option<FrameSelection>,
    ) {
        assert_eq!(resolve_frame(frame, frames, sentinel).ok(), expected);
    }

    #[test]
    fn frame_errors_tell_invalid_from_out_of_range() {
        assert!(matches!(
            resolve_frame(-1, 2, FrameSentinel::Single),
            Err(crate::Error::InvalidFrame { .. })
        ));
        assert!(matches!(
            resolve_frame(5, 2, FrameSentinel::Single),
            Err(crate::Error::FrameOutOfRange { .. })
        ));
    }

    #[test]
    fn thread_counts() {
        assert_eq!(Threads::from_option(-1).unwrap(), Threads::All);
        assert_eq!(Threads::from_option(0).unwrap(), Threads::Calling);
        assert_eq!(Threads::from_option(4).unwrap(), Threads::Pool(4));
        assert!(matches!(
            Threads::from_option(-2),
            Err(crate::Error::InvalidThreadCount { threads: -2, .. })
        ));
    }

    #[test]
    fn native_sample_types() {
        assert_eq!(native_dtype(PixelDataKind::Integer, 16, true).unwrap(), DataType::I16);
        assert_eq!(native_dtype(PixelDataKind::Integer, 8, false).unwrap(), DataType::U8);
        assert_eq!(native_dtype(PixelDataKind::Float, 32, true).unwrap(), DataType::F32);
        assert_eq!(native_dtype(PixelDataKind::DoubleFloat, 64, false).unwrap(), DataType::F64);
        assert!(matches!(
            native_dtype(PixelDataKind::Integer, 12, false),
            Err(crate::Error::UnsupportedBitsAllocated { bits_allocated: 12, .. })
        ));
    }
}
