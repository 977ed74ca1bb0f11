//! This module provides implementations for basic encoders: little endian and big endian.

use super::BasicEncode;
use byteordered::{ByteOrdered, Endianness};
use std::io::{Result, Write};

/// A basic encoder of primitive elements in little endian.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct LittleEndianBasicEncoder;

/// A basic encoder of primitive elements in big endian.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct BigEndianBasicEncoder;

/// A basic encoder with support for both Little Endian an Big Endian
/// encoding, decided at run-time.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub enum BasicEncoder {
    /// Encode in Little Endian
    LE(LittleEndianBasicEncoder),
    /// Encode in Big Endian
    BE(BigEndianBasicEncoder),
}

impl BasicEncoder {
    /// Create a basic encoder for the given byte order.
    pub fn new(endianness: Endianness) -> Self {
        match endianness {
            Endianness::Little => BasicEncoder::LE(LittleEndianBasicEncoder),
            Endianness::Big => BasicEncoder::BE(BigEndianBasicEncoder),
        }
    }
}

impl From<Endianness> for BasicEncoder {
    fn from(endianness: Endianness) -> Self {
        BasicEncoder::new(endianness)
    }
}

macro_rules! impl_basic_encode {
    ($endianness: expr, $wrap: path) => {
        fn endianness(&self) -> Endianness {
            $endianness
        }

        fn encode_us<W: Write>(&self, to: W, value: u16) -> Result<()> {
            $wrap(to).write_u16(value)
        }

        fn encode_ul<W: Write>(&self, to: W, value: u32) -> Result<()> {
            $wrap(to).write_u32(value)
        }

        fn encode_uv<W: Write>(&self, to: W, value: u64) -> Result<()> {
            $wrap(to).write_u64(value)
        }

        fn encode_ss<W: Write>(&self, to: W, value: i16) -> Result<()> {
            $wrap(to).write_i16(value)
        }

        fn encode_sl<W: Write>(&self, to: W, value: i32) -> Result<()> {
            $wrap(to).write_i32(value)
        }

        fn encode_sv<W: Write>(&self, to: W, value: i64) -> Result<()> {
            $wrap(to).write_i64(value)
        }

        fn encode_fl<W: Write>(&self, to: W, value: f32) -> Result<()> {
            $wrap(to).write_f32(value)
        }

        fn encode_fd<W: Write>(&self, to: W, value: f64) -> Result<()> {
            $wrap(to).write_f64(value)
        }
    };
}

impl BasicEncode for LittleEndianBasicEncoder {
    impl_basic_encode!(Endianness::Little, ByteOrdered::le);
}

impl BasicEncode for BigEndianBasicEncoder {
    impl_basic_encode!(Endianness::Big, ByteOrdered::be);
}

impl BasicEncode for BasicEncoder {
    fn endianness(&self) -> Endianness {
        match self {
            BasicEncoder::LE(_) => Endianness::Little,
            BasicEncoder::BE(_) => Endianness::Big,
        }
    }

    fn encode_us<W: Write>(&self, to: W, value: u16) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness()).write_u16(value)
    }

    fn encode_ul<W: Write>(&self, to: W, value: u32) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness()).write_u32(value)
    }

    fn encode_uv<W: Write>(&self, to: W, value: u64) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness()).write_u64(value)
    }

    fn encode_ss<W: Write>(&self, to: W, value: i16) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness()).write_i16(value)
    }

    fn encode_sl<W: Write>(&self, to: W, value: i32) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness()).write_i32(value)
    }

    fn encode_sv<W: Write>(&self, to: W, value: i64) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness()).write_i64(value)
    }

    fn encode_fl<W: Write>(&self, to: W, value: f32) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness()).write_f32(value)
    }

    fn encode_fd<W: Write>(&self, to: W, value: f64) -> Result<()> {
        ByteOrdered::runtime(to, self.endianness()).write_f64(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicomkit_core::Tag;

    fn test_one_value<E, T, F>(encoder: E, value: T, method: F, bytes: &[u8])
    where
        E: BasicEncode,
        F: Fn(&E, &mut Vec<u8>, T) -> Result<()>,
    {
        let mut out = Vec::new();
        method(&encoder, &mut out, value).unwrap();
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_basic_encode() {
        test_one_value(
            LittleEndianBasicEncoder,
            0x1234_u16,
            |e, out, v| e.encode_us(out, v),
            &[0x34, 0x12],
        );
        test_one_value(
            BigEndianBasicEncoder,
            0x1234_u16,
            |e, out, v| e.encode_us(out, v),
            &[0x12, 0x34],
        );
        test_one_value(
            BasicEncoder::new(Endianness::Big),
            -2_i32,
            |e, out, v| e.encode_sl(out, v),
            &[0xFF, 0xFF, 0xFF, 0xFE],
        );
        test_one_value(
            BasicEncoder::new(Endianness::Little),
            Tag(0x0028, 0x0010),
            |e, out, v| e.encode_tag(out, v),
            &[0x28, 0x00, 0x10, 0x00],
        );
    }
}
