//! Explicit VR Big Endian syntax transfer implementation

use crate::encode::basic::BigEndianBasicEncoder;
use crate::encode::{
    explicit_header_vr, BasicEncode, Encode, Result, WriteHeaderSnafu, WriteItemDelimiterSnafu,
    WriteItemHeaderSnafu, WriteSequenceDelimiterSnafu, WriteTagSnafu,
};
use byteordered::byteorder::{BigEndian, ByteOrder};
use dicomkit_core::header::DataElementHeader;
use dicomkit_core::Tag;
use snafu::ResultExt;
use std::io::Write;

/// A concrete encoder for the transfer syntax ExplicitVRBigEndian
#[derive(Debug, Default, Clone)]
pub struct ExplicitVRBigEndianEncoder {
    basic: BigEndianBasicEncoder,
}

impl Encode for ExplicitVRBigEndianEncoder {
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
        BigEndian::write_u16(&mut buf[0..], de.tag.group());
        BigEndian::write_u16(&mut buf[2..], de.tag.element());
        buf[4..6].copy_from_slice(&vr.to_bytes());
        let n = if vr.has_explicit_32bit_length() {
            // PS3.5 7.1.2: two reserved bytes (kept zero'd), then a 32-bit length
            BigEndian::write_u32(&mut buf[8..], de.len.0);
            12
        } else {
            BigEndian::write_u16(&mut buf[6..], de.len.0 as u16);
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
        BigEndian::write_u16(&mut buf, 0xFFFE);
        BigEndian::write_u16(&mut buf[2..], 0xE000);
        BigEndian::write_u32(&mut buf[4..], len);
        to.write_all(&buf).context(WriteItemHeaderSnafu)
    }

    fn encode_item_delimiter<W>(&self, mut to: W) -> Result<()>
    where
        W: Write,
    {
        let mut buf = [0u8; 8];
        BigEndian::write_u16(&mut buf, 0xFFFE);
        BigEndian::write_u16(&mut buf[2..], 0xE00D);
        to.write_all(&buf).context(WriteItemDelimiterSnafu)
    }

    fn encode_sequence_delimiter<W>(&self, mut to: W) -> Result<()>
    where
        W: Write,
    {
        let mut buf = [0u8; 8];
        BigEndian::write_u16(&mut buf, 0xFFFE);
        BigEndian::write_u16(&mut buf[2..], 0xE0DD);
        to.write_all(&buf).context(WriteSequenceDelimiterSnafu)
    }
}

crate::encode::impl_encode_to!(ExplicitVRBigEndianEncoder);

#[cfg(test)]
mod tests {
    use super::ExplicitVRBigEndianEncoder;
    use crate::encode::Encode;
    use dicomkit_core::header::{DataElementHeader, Length};
    use dicomkit_core::{Tag, VR};

    #[test]
    fn encode_headers() {
        let enc = ExplicitVRBigEndianEncoder::default();
        let mut out = Vec::new();
        enc.encode_element_header(
            &mut out,
            DataElementHeader::new(Tag(0x0028, 0x0010), VR::US, Length(2)),
        )
        .unwrap();
        enc.encode_element_header(
            &mut out,
            DataElementHeader::new(Tag(0x0008, 0x1140), VR::SQ, Length::UNDEFINED),
        )
        .unwrap();
        enc.encode_item_header(&mut out, 4).unwrap();

        #[rustfmt::skip]
        let expected: &[u8] = &[
            0x00, 0x28, 0x00, 0x10, b'U', b'S', 0x00, 0x02,
            0x00, 0x08, 0x11, 0x40, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFF, 0xFE, 0xE0, 0x00, 0x00, 0x00, 0x00, 0x04,
        ];
        assert_eq!(&out[..], expected);
    }
}
