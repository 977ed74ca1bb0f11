//! Typed sample containers: owned arrays, borrowed views
//! and caller-provided decode targets.
use crate::{NonContiguousBufferSnafu, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use dicomkit_encoding::Endianness;
use num_traits::AsPrimitive;
use safe_transmute::{transmute_many_pedantic, TriviallyTransmutable};
use smallvec::SmallVec;
use std::fmt;

/// The shape of a pixel array, outermost axis first.
pub type Shape = SmallVec<[usize; 4]>;

/// The numeric type of pixel samples.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub enum DataType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl DataType {
    /// The size of one sample in bytes.
    pub fn size(self) -> usize {
        match self {
            DataType::U8 | DataType::I8 => 1,
            DataType::U16 | DataType::I16 => 2,
            DataType::U32 | DataType::I32 | DataType::F32 => 4,
            DataType::F64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::U8 => "uint8",
            DataType::I8 => "int8",
            DataType::U16 => "uint16",
            DataType::I16 => "int16",
            DataType::U32 => "uint32",
            DataType::I32 => "int32",
            DataType::F32 => "float32",
            DataType::F64 => "float64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run `$body` with `$T` bound to the Rust type of a [`DataType`].
macro_rules! with_data_type {
    ($dtype:expr, $T:ident => $body:expr) => {
        match $dtype {
            $crate::array::DataType::U8 => {
                type $T = u8;
                $body
            }
            $crate::array::DataType::I8 => {
                type $T = i8;
                $body
            }
            $crate::array::DataType::U16 => {
                type $T = u16;
                $body
            }
            $crate::array::DataType::I16 => {
                type $T = i16;
                $body
            }
            $crate::array::DataType::U32 => {
                type $T = u32;
                $body
            }
            $crate::array::DataType::I32 => {
                type $T = i32;
                $body
            }
            $crate::array::DataType::F32 => {
                type $T = f32;
                $body
            }
            $crate::array::DataType::F64 => {
                type $T = f64;
                $body
            }
        }
    };
}
pub(crate) use with_data_type;

mod private {
    pub trait Sealed {}
}

/// A Rust type which can hold pixel samples.
///
/// Implemented for `u8`, `i8`, `u16`, `i16`, `u32`, `i32`, `f32` and `f64`.
pub trait PixelSample:
    private::Sealed + TriviallyTransmutable + Copy + Default + Send + Sync + PartialEq + fmt::Debug + 'static
{
    const DATA_TYPE: DataType;

    /// Read one sample from the start of `bytes`.
    fn read(bytes: &[u8], endianness: Endianness) -> Self;

    fn to_f64(self) -> f64;

    /// Convert with saturation, as `as` does for floats.
    fn from_f64(value: f64) -> Self;

    #[doc(hidden)]
    fn wrap_vec(data: Vec<Self>) -> PixelBuffer;

    #[doc(hidden)]
    fn buffer_slice(buffer: &PixelBuffer) -> Option<&[Self]>;

    #[doc(hidden)]
    fn unwrap_vec(buffer: PixelBuffer) -> std::result::Result<Vec<Self>, PixelBuffer>;

    #[doc(hidden)]
    fn wrap_target(data: &mut [Self]) -> TargetData<'_>;

    #[doc(hidden)]
    fn target_slice<'b>(data: &'b mut TargetData<'_>) -> Option<&'b mut [Self]>;
}

macro_rules! impl_pixel_sample {
    ($t:ty, $variant:ident, |$b:ident, $e:ident| $read:expr) => {
        impl private::Sealed for $t {}

        impl PixelSample for $t {
            const DATA_TYPE: DataType = DataType::$variant;

            #[inline]
            fn read($b: &[u8], $e: Endianness) -> Self {
                $read
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self.as_()
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value.as_()
            }

            fn wrap_vec(data: Vec<Self>) -> PixelBuffer {
                PixelBuffer::$variant(data)
            }

            fn buffer_slice(buffer: &PixelBuffer) -> Option<&[Self]> {
                match buffer {
                    PixelBuffer::$variant(data) => Some(data),
                    _ => None,
                }
            }

            fn unwrap_vec(buffer: PixelBuffer) -> std::result::Result<Vec<Self>, PixelBuffer> {
                match buffer {
                    PixelBuffer::$variant(data) => Ok(data),
                    other => Err(other),
                }
            }

            fn wrap_target(data: &mut [Self]) -> TargetData<'_> {
                TargetData::$variant(data)
            }

            fn target_slice<'b>(data: &'b mut TargetData<'_>) -> Option<&'b mut [Self]> {
                match data {
                    TargetData::$variant(data) => Some(data),
                    _ => None,
                }
            }
        }
    };
}

impl_pixel_sample!(u8, U8, |b, _e| b[0]);
impl_pixel_sample!(i8, I8, |b, _e| b[0] as i8);
impl_pixel_sample!(u16, U16, |b, e| match e {
    Endianness::Little => LittleEndian::read_u16(b),
    Endianness::Big => BigEndian::read_u16(b),
});
impl_pixel_sample!(i16, I16, |b, e| match e {
    Endianness::Little => LittleEndian::read_i16(b),
    Endianness::Big => BigEndian::read_i16(b),
});
impl_pixel_sample!(u32, U32, |b, e| match e {
    Endianness::Little => LittleEndian::read_u32(b),
    Endianness::Big => BigEndian::read_u32(b),
});
impl_pixel_sample!(i32, I32, |b, e| match e {
    Endianness::Little => LittleEndian::read_i32(b),
    Endianness::Big => BigEndian::read_i32(b),
});
impl_pixel_sample!(f32, F32, |b, e| match e {
    Endianness::Little => LittleEndian::read_f32(b),
    Endianness::Big => BigEndian::read_f32(b),
});
impl_pixel_sample!(f64, F64, |b, e| match e {
    Endianness::Little => LittleEndian::read_f64(b),
    Endianness::Big => BigEndian::read_f64(b),
});

/// Owned sample storage of any [`DataType`].
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl PixelBuffer {
    /// A buffer of `len` zeroed samples.
    pub fn zeroed(dtype: DataType, len: usize) -> Self {
        with_data_type!(dtype, T => T::wrap_vec(vec![T::default(); len]))
    }

    pub fn dtype(&self) -> DataType {
        match self {
            PixelBuffer::U8(_) => DataType::U8,
            PixelBuffer::I8(_) => DataType::I8,
            PixelBuffer::U16(_) => DataType::U16,
            PixelBuffer::I16(_) => DataType::I16,
            PixelBuffer::U32(_) => DataType::U32,
            PixelBuffer::I32(_) => DataType::I32,
            PixelBuffer::F32(_) => DataType::F32,
            PixelBuffer::F64(_) => DataType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelBuffer::U8(v) => v.len(),
            PixelBuffer::I8(v) => v.len(),
            PixelBuffer::U16(v) => v.len(),
            PixelBuffer::I16(v) => v.len(),
            PixelBuffer::U32(v) => v.len(),
            PixelBuffer::I32(v) => v.len(),
            PixelBuffer::F32(v) => v.len(),
            PixelBuffer::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn as_target(&mut self) -> TargetData<'_> {
        match self {
            PixelBuffer::U8(v) => TargetData::U8(v),
            PixelBuffer::I8(v) => TargetData::I8(v),
            PixelBuffer::U16(v) => TargetData::U16(v),
            PixelBuffer::I16(v) => TargetData::I16(v),
            PixelBuffer::U32(v) => TargetData::U32(v),
            PixelBuffer::I32(v) => TargetData::I32(v),
            PixelBuffer::F32(v) => TargetData::F32(v),
            PixelBuffer::F64(v) => TargetData::F64(v),
        }
    }
}

/// Decoded pixel samples, owned, in row-major order.
///
/// The shape is `[rows, columns]` for one sample per pixel,
/// `[rows, columns, samples]` otherwise,
/// with a leading frame axis when several frames were decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelArray {
    shape: Shape,
    buffer: PixelBuffer,
}

impl PixelArray {
    /// A zero-filled array.
    pub fn zeroed(dtype: DataType, shape: &[usize]) -> Self {
        PixelArray {
            shape: Shape::from_slice(shape),
            buffer: PixelBuffer::zeroed(dtype, shape.iter().product()),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DataType {
        self.buffer.dtype()
    }

    /// The number of samples.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// The samples, if they are of type `T`.
    pub fn as_slice<T: PixelSample>(&self) -> Option<&[T]> {
        T::buffer_slice(&self.buffer)
    }

    /// The samples converted to `f64`, whatever their type.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_data_type!(self.dtype(), T => self
            .as_slice::<T>()
            .map(|s| s.iter().map(|v| v.to_f64()).collect())
            .unwrap_or_default())
    }

    /// Take the samples out of the array, if they are of type `T`.
    pub fn into_vec<T: PixelSample>(self) -> std::result::Result<Vec<T>, Self> {
        let shape = self.shape;
        T::unwrap_vec(self.buffer).map_err(|buffer| PixelArray { shape, buffer })
    }

    /// A mutable decode target over this array's storage.
    pub fn as_target(&mut self) -> DecodeTarget<'_> {
        DecodeTarget {
            shape: self.shape.clone(),
            data: self.buffer.as_target(),
            contiguous: true,
        }
    }

    /// Convert into an `ndarray` array of the given sample type.
    #[cfg(feature = "ndarray")]
    pub fn to_ndarray<T: PixelSample>(&self) -> Result<ndarray::ArrayD<T>> {
        use snafu::{OptionExt, ResultExt};
        let data = self
            .as_slice::<T>()
            .context(crate::DTypeMismatchSnafu {
                expected: self.dtype(),
                found: T::DATA_TYPE,
            })?
            .to_vec();
        ndarray::ArrayD::from_shape_vec(ndarray::IxDyn(&self.shape), data)
            .context(crate::ShapeSnafu)
    }
}

/// A read-only, zero-copy view over uncompressed pixel data
/// in the host's byte order.
#[derive(Debug, Copy, Clone)]
pub struct PixelArrayView<'a> {
    bytes: &'a [u8],
    dtype: DataType,
    shape: [usize; 3],
    ndim: usize,
}

impl<'a> PixelArrayView<'a> {
    /// Wrap `bytes` as samples of the given type,
    /// if they are suitably sized and aligned.
    pub(crate) fn new(bytes: &'a [u8], dtype: DataType, shape: &[usize]) -> Option<Self> {
        if shape.len() > 3 || bytes.len() != shape.iter().product::<usize>() * dtype.size() {
            return None;
        }
        let aligned = with_data_type!(dtype, T => transmute_many_pedantic::<T>(bytes).is_ok());
        if !aligned {
            return None;
        }
        let mut dims = [0; 3];
        dims[..shape.len()].copy_from_slice(shape);
        Some(PixelArrayView {
            bytes,
            dtype,
            shape: dims,
            ndim: shape.len(),
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape[..self.ndim]
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// The raw sample bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The samples, if they are of type `T`.
    pub fn as_slice<T: PixelSample>(&self) -> Option<&'a [T]> {
        if T::DATA_TYPE != self.dtype {
            return None;
        }
        transmute_many_pedantic::<T>(self.bytes).ok()
    }

    /// Copy the samples into an owned array.
    pub fn to_owned(&self) -> PixelArray {
        let buffer = with_data_type!(self.dtype, T => T::wrap_vec(
            self.as_slice::<T>().map(<[T]>::to_vec).unwrap_or_default()
        ));
        PixelArray {
            shape: Shape::from_slice(self.shape()),
            buffer,
        }
    }
}

/// Mutable sample storage of any [`DataType`].
#[derive(Debug)]
pub enum TargetData<'a> {
    U8(&'a mut [u8]),
    I8(&'a mut [i8]),
    U16(&'a mut [u16]),
    I16(&'a mut [i16]),
    U32(&'a mut [u32]),
    I32(&'a mut [i32]),
    F32(&'a mut [f32]),
    F64(&'a mut [f64]),
}

impl TargetData<'_> {
    pub fn dtype(&self) -> DataType {
        match self {
            TargetData::U8(_) => DataType::U8,
            TargetData::I8(_) => DataType::I8,
            TargetData::U16(_) => DataType::U16,
            TargetData::I16(_) => DataType::I16,
            TargetData::U32(_) => DataType::U32,
            TargetData::I32(_) => DataType::I32,
            TargetData::F32(_) => DataType::F32,
            TargetData::F64(_) => DataType::F64,
        }
    }
}

/// A caller-provided buffer to decode into.
///
/// Decoding only proceeds when the target is contiguous
/// and its shape and sample type match the decoded image exactly.
/// Exclusive borrowing of the storage
/// keeps it from being shared with other decodes.
#[derive(Debug)]
pub struct DecodeTarget<'a> {
    shape: Shape,
    data: TargetData<'a>,
    contiguous: bool,
}

impl<'a> DecodeTarget<'a> {
    /// A contiguous row-major target of the given shape.
    pub fn new<T: PixelSample>(data: &'a mut [T], shape: &[usize]) -> Self {
        DecodeTarget {
            shape: Shape::from_slice(shape),
            data: T::wrap_target(data),
            contiguous: true,
        }
    }

    /// A target described by element strides,
    /// which is only usable when the strides are those of a row-major layout.
    pub fn strided<T: PixelSample>(data: &'a mut [T], shape: &[usize], strides: &[isize]) -> Self {
        let mut expected = 1_isize;
        let mut contiguous = strides.len() == shape.len();
        for (dim, stride) in shape.iter().zip(strides).rev() {
            if *dim > 1 && *stride != expected {
                contiguous = false;
            }
            expected *= *dim as isize;
        }
        DecodeTarget {
            shape: Shape::from_slice(shape),
            data: T::wrap_target(data),
            contiguous,
        }
    }

    /// A target over a mutable `ndarray` view.
    #[cfg(feature = "ndarray")]
    pub fn from_ndarray<T: PixelSample>(view: ndarray::ArrayViewMutD<'a, T>) -> Self {
        let shape = Shape::from_slice(view.shape());
        match view.into_slice() {
            Some(data) => DecodeTarget {
                shape,
                data: T::wrap_target(data),
                contiguous: true,
            },
            None => DecodeTarget {
                shape,
                data: T::wrap_target(Default::default()),
                contiguous: false,
            },
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    pub fn is_contiguous(&self) -> bool {
        self.contiguous
    }

    /// The storage, provided that it is contiguous
    /// and holds exactly as many samples as the shape describes.
    pub(crate) fn data_mut(&mut self) -> Result<&mut TargetData<'a>> {
        let len = with_data_type!(self.dtype(), T => T::target_slice(&mut self.data).map_or(0, |s| s.len()));
        if !self.contiguous || len != self.shape.iter().product::<usize>() {
            return NonContiguousBufferSnafu.fail();
        }
        Ok(&mut self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn samples_read_in_either_byte_order() {
        assert_eq!(i16::read(&[0xFE, 0xFF], Endianness::Little), -2);
        assert_eq!(i16::read(&[0xFF, 0xFE], Endianness::Big), -2);
        assert_eq!(u32::read(&[1, 0, 0, 0], Endianness::Little), 1);
        assert_eq!(f32::read(&1.5_f32.to_be_bytes(), Endianness::Big), 1.5);
        assert_eq!(u8::from_f64(300.), 255);
        assert_eq!(i16::from_f64(-1.7), -1);
    }

    #[test]
    fn arrays_expose_their_samples_by_type() {
        let array = PixelArray::zeroed(DataType::I16, &[2, 3]);
        assert_eq!(array.shape(), &[2, 3]);
        assert_eq!(array.len(), 6);
        assert_eq!(array.as_slice::<i16>(), Some(&[0_i16; 6][..]));
        assert_eq!(array.as_slice::<u16>(), None);
        let array = array.into_vec::<u8>().unwrap_err();
        assert_eq!(array.into_vec::<i16>().unwrap(), vec![0; 6]);
    }

    #[test]
    fn strided_targets_must_be_row_major() {
        let mut data = [0_u16; 12];
        assert!(DecodeTarget::strided(&mut data, &[3, 4], &[4, 1]).is_contiguous());
        assert!(!DecodeTarget::strided(&mut data, &[3, 4], &[1, 3]).is_contiguous());
        assert!(!DecodeTarget::strided(&mut data, &[3, 2], &[4, 1]).is_contiguous());
        // unit axes impose no stride
        assert!(DecodeTarget::strided(&mut data, &[1, 12], &[99, 1]).is_contiguous());
    }

    #[test]
    fn targets_check_their_length() {
        let mut data = [0_u8; 5];
        let mut target = DecodeTarget::new(&mut data, &[2, 3]);
        assert!(matches!(
            target.data_mut(),
            Err(Error::NonContiguousBuffer { .. })
        ));
    }
}
