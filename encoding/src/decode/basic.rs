//! This module provides implementations for primitive decoders of data, which
//! may be in either Little Endian or Big Endian.

use super::BasicDecode;
use byteordered::{ByteOrdered, Endianness};
use std::io::Read;

type Result<T> = std::io::Result<T>;

/// A basic decoder of DICOM primitive elements in little endian.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct LittleEndianBasicDecoder;

/// A basic decoder of DICOM primitive elements in big endian.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct BigEndianBasicDecoder;

/// A basic decoder with support for both Little Endian an Big Endian
/// encoding, decided at run-time.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub enum BasicDecoder {
    /// Decode in Little Endian
    LE(LittleEndianBasicDecoder),
    /// Decode in Big Endian
    BE(BigEndianBasicDecoder),
}

impl BasicDecoder {
    /// Create a basic decoder for the given byte order.
    pub fn new(endianness: Endianness) -> Self {
        match endianness {
            Endianness::Little => LittleEndianBasicDecoder.into(),
            Endianness::Big => BigEndianBasicDecoder.into(),
        }
    }
}

impl From<Endianness> for BasicDecoder {
    fn from(endianness: Endianness) -> Self {
        BasicDecoder::new(endianness)
    }
}

impl From<LittleEndianBasicDecoder> for BasicDecoder {
    fn from(decoder: LittleEndianBasicDecoder) -> Self {
        BasicDecoder::LE(decoder)
    }
}

impl From<BigEndianBasicDecoder> for BasicDecoder {
    fn from(decoder: BigEndianBasicDecoder) -> Self {
        BasicDecoder::BE(decoder)
    }
}

/// Implement every primitive decoding method with a byte ordered reader.
macro_rules! impl_basic_decode {
    ($endianness: expr, $wrap: path) => {
        fn endianness(&self) -> Endianness {
            $endianness
        }

        fn decode_us<S: Read>(&self, source: S) -> Result<u16> {
            $wrap(source).read_u16()
        }

        fn decode_ul<S: Read>(&self, source: S) -> Result<u32> {
            $wrap(source).read_u32()
        }

        fn decode_uv<S: Read>(&self, source: S) -> Result<u64> {
            $wrap(source).read_u64()
        }

        fn decode_ss<S: Read>(&self, source: S) -> Result<i16> {
            $wrap(source).read_i16()
        }

        fn decode_sl<S: Read>(&self, source: S) -> Result<i32> {
            $wrap(source).read_i32()
        }

        fn decode_sv<S: Read>(&self, source: S) -> Result<i64> {
            $wrap(source).read_i64()
        }

        fn decode_fl<S: Read>(&self, source: S) -> Result<f32> {
            $wrap(source).read_f32()
        }

        fn decode_fd<S: Read>(&self, source: S) -> Result<f64> {
            $wrap(source).read_f64()
        }
    };
}

impl BasicDecode for LittleEndianBasicDecoder {
    impl_basic_decode!(Endianness::Little, ByteOrdered::le);
}

impl BasicDecode for BigEndianBasicDecoder {
    impl_basic_decode!(Endianness::Big, ByteOrdered::be);
}

/// Dispatch a method call to the inner decoder.
macro_rules! for_both {
    ($s: expr, |$e: ident| $f: expr) => {
        match *$s {
            BasicDecoder::LE(ref $e) => $f,
            BasicDecoder::BE(ref $e) => $f,
        }
    };
}

impl BasicDecode for BasicDecoder {
    fn endianness(&self) -> Endianness {
        match *self {
            BasicDecoder::LE(_) => Endianness::Little,
            BasicDecoder::BE(_) => Endianness::Big,
        }
    }

    fn decode_us<S: Read>(&self, source: S) -> Result<u16> {
        for_both!(self, |e| e.decode_us(source))
    }

    fn decode_ul<S: Read>(&self, source: S) -> Result<u32> {
        for_both!(self, |e| e.decode_ul(source))
    }

    fn decode_uv<S: Read>(&self, source: S) -> Result<u64> {
        for_both!(self, |e| e.decode_uv(source))
    }

    fn decode_ss<S: Read>(&self, source: S) -> Result<i16> {
        for_both!(self, |e| e.decode_ss(source))
    }

    fn decode_sl<S: Read>(&self, source: S) -> Result<i32> {
        for_both!(self, |e| e.decode_sl(source))
    }

    fn decode_sv<S: Read>(&self, source: S) -> Result<i64> {
        for_both!(self, |e| e.decode_sv(source))
    }

    fn decode_fl<S: Read>(&self, source: S) -> Result<f32> {
        for_both!(self, |e| e.decode_fl(source))
    }

    fn decode_fd<S: Read>(&self, source: S) -> Result<f64> {
        for_both!(self, |e| e.decode_fd(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicomkit_core::Tag;

    #[test]
    fn test_read_integers() {
        let data: &[u8] = &[0xC3, 0x3C, 0x33, 0xCC, 0x55, 0xAA, 0x55, 0xAA];

        let le = LittleEndianBasicDecoder;
        let be = BigEndianBasicDecoder;

        assert_eq!(le.decode_us(data).unwrap(), 0x3CC3);
        assert_eq!(be.decode_us(data).unwrap(), 0xC33C);
        assert_eq!(le.decode_ul(data).unwrap(), 0xCC333CC3);
        assert_eq!(be.decode_ul(data).unwrap(), 0xC33C33CC);
        assert_eq!(le.decode_uv(data).unwrap(), 0xAA55AA55_CC333CC3);
        assert_eq!(be.decode_uv(data).unwrap(), 0xC33C33CC_55AA55AA);

        let le = BasicDecoder::new(Endianness::Little);
        let be = BasicDecoder::new(Endianness::Big);

        assert_eq!(le.decode_ss(data).unwrap(), 0x3CC3);
        assert_eq!(be.decode_ss(data).unwrap(), -0x3CC4);
        assert_eq!(le.decode_tag(data).unwrap(), Tag(0x3CC3, 0xCC33));
        assert_eq!(be.decode_tag(data).unwrap(), Tag(0xC33C, 0x33CC));
    }

    #[test]
    fn test_read_floats() {
        let data = 1.5_f32.to_le_bytes();
        assert_eq!(LittleEndianBasicDecoder.decode_fl(&data[..]).unwrap(), 1.5);
        let data = (-2.25_f64).to_be_bytes();
        assert_eq!(BigEndianBasicDecoder.decode_fd(&data[..]).unwrap(), -2.25);
    }
}
