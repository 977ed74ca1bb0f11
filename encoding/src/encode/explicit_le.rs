//! Explicit VR Little Endian syntax transfer implementation

use crate::encode::basic::LittleEndianBasicEncoder;
use crate::encode::{
    explicit_header_vr, BasicEncode, Encode, Result, WriteHeaderSnafu, WriteItemDelimiterSnafu,
    WriteItemHeaderSnafu, WriteSequenceDelimiterSnafu, WriteTagSnafu,
};
use byteordered::byteorder::{ByteOrder, LittleEndian};
use dicomkit_core::header::DataElementHeader;
use dicomkit_core::Tag;
use snafu::ResultExt;
use std::io::Write;

/// A concrete encoder for the transfer syntax ExplicitVRLittleEndian
#[derive(Debug, Default, Clone)]
pub struct ExplicitVRLittleEndianEncoder {
    basic: LittleEndianBasicEncoder,
}

impl Encode for ExplicitVRLittleEndianEncoder {
    fn encode_tag<W>(&self, to: W, tag: Tag) -> Result<()>
    where
        W: Write,
    {
        self.basic.encode_tag(to, tag).context(WriteTagSnafu)
    }

    fn encode_element_header<W>(&self, mut to: W, de: DataElementHeader) -> Result<usize>
    where
        W: Write,
    {
        let vr = explicit_header_vr(&de)?;
        let mut buf = [0u8; 12];
        LittleEndian::write_u16(&mut buf[0..], de.tag.group());
        LittleEndian::write_u16(&mut buf[2..], de.tag.element());
        buf[4..6].copy_from_slice(&vr.to_bytes());
        let n = if vr.has_explicit_32bit_length() {
            // PS3.5 7.1.2: two reserved bytes (kept zero'd), then a 32-bit length
            LittleEndian::write_u32(&mut buf[8..], de.len.0);
            12
        } else {
            LittleEndian::write_u16(&mut buf[6..], de.len.0 as u16);
            8
        };
        to.write_all(&buf[..n])
            .context(WriteHeaderSnafu { tag: de.tag })?;
        Ok(n)
    }

    fn encode_item_header<W>(&self, mut to: W, len: u32) -> Result<()>
    where
        W: Write,
    {
        let mut buf = [0u8; 8];
        LittleEndian::write_u16(&mut buf, 0xFFFE);
        LittleEndian::write_u16(&mut buf[2..], 0xE000);
        LittleEndian::write_u32(&mut buf[4..], len);
        to.write_all(&buf).context(WriteItemHeaderSnafu)
    }

    fn encode_item_delimiter<W>(&self, mut to: W) -> Result<()>
    where
        W: Write,
    {
        let mut buf = [0u8; 8];
        LittleEndian::write_u16(&mut buf, 0xFFFE);
        LittleEndian::write_u16(&mut buf[2..], 0xE00D);
        to.write_all(&buf).context(WriteItemDelimiterSnafu)
    }

    fn encode_sequence_delimiter<W>(&self, mut to: W) -> Result<()>
    where
        W: Write,
    {
        let mut buf = [0u8; 8];
        LittleEndian::write_u16(&mut buf, 0xFFFE);
        LittleEndian::write_u16(&mut buf[2..], 0xE0DD);
        to.write_all(&buf).context(WriteSequenceDelimiterSnafu)
    }
}

crate::encode::impl_encode_to!(ExplicitVRLittleEndianEncoder);

#[cfg(test)]
mod tests {
    use super::ExplicitVRLittleEndianEncoder;
    use crate::encode::Encode;
    use dicomkit_core::header::{DataElementHeader, Length};
    use dicomkit_core::{Tag, VR};

    #[test]
    fn encode_headers() {
        let enc = ExplicitVRLittleEndianEncoder::default();
        let mut out = Vec::new();

        let bytes = enc
            .encode_element_header(
                &mut out,
                DataElementHeader::new(Tag(0x0002, 0x0002), VR::UI, Length(26)),
            )
            .unwrap();
        assert_eq!(bytes, 8);
        let bytes = enc
            .encode_element_header(
                &mut out,
                DataElementHeader::new(Tag::PIXEL_DATA, VR::PX, Length::UNDEFINED),
            )
            .unwrap();
        assert_eq!(bytes, 12);

        #[rustfmt::skip]
        let expected: &[u8] = &[
            0x02, 0x00, 0x02, 0x00, b'U', b'I', 0x1A, 0x00,
            0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
        ];
        assert_eq!(&out[..], expected);
    }

    #[test]
    fn encode_delimiters() {
        let enc = ExplicitVRLittleEndianEncoder::default();
        let mut out = Vec::new();
        enc.encode_item_header(&mut out, 0xFFFF_FFFF).unwrap();
        enc.encode_item_delimiter(&mut out).unwrap();
        enc.encode_sequence_delimiter(&mut out).unwrap();

        #[rustfmt::skip]
        let expected: &[u8] = &[
            0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00,
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_eq!(&out[..], expected);
    }
}
