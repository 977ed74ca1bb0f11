//! Text decoding and encoding under a Specific Character Set (0008,0005).
//!
//! Only single-byte repertoires without code extensions,
//! UTF-8 and GB18030 are supported.
//! ISO 2022 escape sequences are not interpreted:
//! a multi-valued Specific Character Set resolves to its first known term.

use encoding::all::{
    GB18030, ISO_8859_1, ISO_8859_2, ISO_8859_3, ISO_8859_4, ISO_8859_5, ISO_8859_6, ISO_8859_7,
    ISO_8859_8, UTF_8, WINDOWS_1254, WINDOWS_874,
};
use encoding::{DecoderTrap, EncoderTrap, EncodingRef, RawDecoder, StringWriter};
use snafu::{Backtrace, Snafu};
use std::borrow::Cow;
use tracing::warn;

/// An error type for text encoding issues.
#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(display("Could not encode text as {}: {}", charset, message))]
pub struct EncodeTextError {
    charset: &'static str,
    message: Cow<'static, str>,
    backtrace: Backtrace,
}

/// An error type for text decoding issues.
#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(display("Could not decode text as {}: {}", charset, message))]
pub struct DecodeTextError {
    charset: &'static str,
    message: Cow<'static, str>,
    backtrace: Backtrace,
}

type EncodeResult<T> = Result<T, EncodeTextError>;
type DecodeResult<T> = Result<T, DecodeTextError>;

/// A holder of encoding and decoding mechanisms for text in DICOM content.
pub trait TextCodec {
    /// The defined term of the character set,
    /// as it would appear in Specific Character Set (0008,0005).
    fn name(&self) -> &'static str;

    /// Decode the given bytes as a single string.
    /// The result may contain backslashes delimiting individual values.
    fn decode(&self, text: &[u8]) -> DecodeResult<String>;

    /// Encode a text value into bytes.
    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>>;
}

impl<T: ?Sized + TextCodec> TextCodec for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn decode(&self, text: &[u8]) -> DecodeResult<String> {
        (**self).decode(text)
    }

    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>> {
        (**self).encode(text)
    }
}

/// The character sets which can be used to decode text values.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq, PartialOrd, Ord)]
#[non_exhaustive]
pub enum SpecificCharacterSet {
    /// **ISO-IR 6**: the default character repertoire.
    #[default]
    Default,
    /// **ISO-IR 100** (ISO-8859-1): Latin alphabet no. 1
    IsoIr100,
    /// **ISO-IR 101** (ISO-8859-2): Latin alphabet no. 2
    IsoIr101,
    /// **ISO-IR 109** (ISO-8859-3): Latin alphabet no. 3
    IsoIr109,
    /// **ISO-IR 110** (ISO-8859-4): Latin alphabet no. 4
    IsoIr110,
    /// **ISO-IR 144** (ISO-8859-5): Latin/Cyrillic
    IsoIr144,
    /// **ISO-IR 127** (ISO-8859-6): Latin/Arabic
    IsoIr127,
    /// **ISO-IR 126** (ISO-8859-7): Latin/Greek
    IsoIr126,
    /// **ISO-IR 138** (ISO-8859-8): Latin/Hebrew
    IsoIr138,
    /// **ISO-IR 148** (ISO-8859-9): Latin alphabet no. 5, read as Windows-1254
    IsoIr148,
    /// **ISO-IR 166** (TIS 620-2533): Thai, read as Windows-874
    IsoIr166,
    /// **ISO-IR 192**: Unicode in UTF-8
    IsoIr192,
    /// **GB18030**: Simplified Chinese
    Gb18030,
}

impl SpecificCharacterSet {
    /// Obtain the character set identified by a single defined term.
    ///
    /// ```
    /// # use dicomkit_encoding::text::SpecificCharacterSet;
    /// let charset = SpecificCharacterSet::from_code("ISO_IR 100");
    /// assert_eq!(charset, Some(SpecificCharacterSet::IsoIr100));
    /// ```
    pub fn from_code(code: &str) -> Option<Self> {
        use self::SpecificCharacterSet::*;
        match code.trim_matches(|c: char| c == ' ' || c == '\0') {
            "" | "Default" | "ISO_IR 6" | "ISO_IR_6" | "ISO 2022 IR 6" => Some(Default),
            "ISO_IR 100" | "ISO_IR_100" | "ISO 2022 IR 100" => Some(IsoIr100),
            "ISO_IR 101" | "ISO_IR_101" | "ISO 2022 IR 101" => Some(IsoIr101),
            "ISO_IR 109" | "ISO_IR_109" | "ISO 2022 IR 109" => Some(IsoIr109),
            "ISO_IR 110" | "ISO_IR_110" | "ISO 2022 IR 110" => Some(IsoIr110),
            "ISO_IR 144" | "ISO_IR_144" | "ISO 2022 IR 144" => Some(IsoIr144),
            "ISO_IR 127" | "ISO_IR_127" | "ISO 2022 IR 127" => Some(IsoIr127),
            "ISO_IR 126" | "ISO_IR_126" | "ISO 2022 IR 126" => Some(IsoIr126),
            "ISO_IR 138" | "ISO_IR_138" | "ISO 2022 IR 138" => Some(IsoIr138),
            "ISO_IR 148" | "ISO_IR_148" | "ISO 2022 IR 148" => Some(IsoIr148),
            "ISO_IR 166" | "ISO_IR_166" | "ISO 2022 IR 166" => Some(IsoIr166),
            "ISO_IR 192" | "ISO_IR_192" => Some(IsoIr192),
            "GB18030" => Some(Gb18030),
            _ => None,
        }
    }

    /// Resolve the full value of a Specific Character Set element,
    /// which may contain several backslash-separated terms.
    ///
    /// The first non-empty term decides the character set.
    /// Unknown terms fall back to the default repertoire with a warning.
    pub fn from_element_value(value: &str) -> Self {
        let term = value
            .split('\\')
            .map(|t| t.trim_matches(|c: char| c == ' ' || c == '\0'))
            .find(|t| !t.is_empty())
            .unwrap_or("");
        match SpecificCharacterSet::from_code(term) {
            Some(charset) => charset,
            None => {
                warn!("Unsupported character set `{}`, using default repertoire", term);
                SpecificCharacterSet::Default
            }
        }
    }

    fn encoding(self) -> EncodingRef {
        use self::SpecificCharacterSet::*;
        match self {
            // ISO 8859-1 is a superset of the default repertoire
            Default | IsoIr100 => ISO_8859_1,
            IsoIr101 => ISO_8859_2,
            IsoIr109 => ISO_8859_3,
            IsoIr110 => ISO_8859_4,
            IsoIr144 => ISO_8859_5,
            IsoIr127 => ISO_8859_6,
            IsoIr126 => ISO_8859_7,
            IsoIr138 => ISO_8859_8,
            IsoIr148 => WINDOWS_1254,
            IsoIr166 => WINDOWS_874,
            IsoIr192 => UTF_8,
            Gb18030 => GB18030,
        }
    }
}

impl TextCodec for SpecificCharacterSet {
    fn name(&self) -> &'static str {
        use self::SpecificCharacterSet::*;
        match self {
            Default => "ISO_IR 6",
            IsoIr100 => "ISO_IR 100",
            IsoIr101 => "ISO_IR 101",
            IsoIr109 => "ISO_IR 109",
            IsoIr110 => "ISO_IR 110",
            IsoIr144 => "ISO_IR 144",
            IsoIr127 => "ISO_IR 127",
            IsoIr126 => "ISO_IR 126",
            IsoIr138 => "ISO_IR 138",
            IsoIr148 => "ISO_IR 148",
            IsoIr166 => "ISO_IR 166",
            IsoIr192 => "ISO_IR 192",
            Gb18030 => "GB18030",
        }
    }

    fn decode(&self, text: &[u8]) -> DecodeResult<String> {
        self.encoding()
            .decode(text, DecoderTrap::Call(decode_text_trap))
            .map_err(|message| {
                DecodeTextSnafu {
                    charset: self.name(),
                    message,
                }
                .build()
            })
    }

    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>> {
        self.encoding()
            .encode(text, EncoderTrap::Strict)
            .map_err(|message| {
                EncodeTextSnafu {
                    charset: self.name(),
                    message,
                }
                .build()
            })
    }
}

/// Undecodable bytes become an octal escape (`\ooo`).
fn decode_text_trap(
    _decoder: &mut dyn RawDecoder,
    input: &[u8],
    output: &mut dyn StringWriter,
) -> bool {
    for &c in input {
        output.write_char('\\');
        output.write_char((((c & 0o300) >> 6) + b'0') as char);
        output.write_char((((c & 0o070) >> 3) + b'0') as char);
        output.write_char(((c & 0o007) + b'0') as char);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_codec<T: TextCodec>(codec: T, string: &str, bytes: &[u8]) {
        assert_eq!(codec.encode(string).expect("encoding"), bytes);
        assert_eq!(codec.decode(bytes).expect("decoding"), string);
    }

    #[test]
    fn iso_ir_6_baseline() {
        test_codec(SpecificCharacterSet::Default, "Smith^John", b"Smith^John");
    }

    #[test]
    fn iso_ir_100_latin1() {
        test_codec(SpecificCharacterSet::IsoIr100, "Buc^Jérôme", b"Buc^J\xe9r\xf4me");
    }

    #[test]
    fn iso_ir_144_cyrillic() {
        test_codec(
            SpecificCharacterSet::IsoIr144,
            "Люксембург",
            b"\xbb\xee\xda\xe1\xd5\xdc\xd1\xe3\xe0\xd3",
        );
    }

    #[test]
    fn iso_ir_126_greek() {
        test_codec(
            SpecificCharacterSet::IsoIr126,
            "Διονυσιος",
            b"\xc4\xe9\xef\xed\xf5\xf3\xe9\xef\xf2",
        );
    }

    #[test]
    fn iso_ir_192_utf8() {
        let name = "Wang^XiaoDong=王^小東";
        test_codec(SpecificCharacterSet::IsoIr192, name, name.as_bytes());
    }

    #[test]
    fn multi_valued_terms_use_first_known() {
        assert_eq!(
            SpecificCharacterSet::from_element_value("ISO_IR 100\\ISO 2022 IR 87"),
            SpecificCharacterSet::IsoIr100
        );
        assert_eq!(
            SpecificCharacterSet::from_element_value("\\ISO 2022 IR 126"),
            SpecificCharacterSet::IsoIr126
        );
        assert_eq!(
            SpecificCharacterSet::from_element_value("ISO_IR 192 "),
            SpecificCharacterSet::IsoIr192
        );
        assert_eq!(
            SpecificCharacterSet::from_element_value("KLINGON"),
            SpecificCharacterSet::Default
        );
        assert_eq!(SpecificCharacterSet::from_element_value(""), SpecificCharacterSet::Default);
    }

    #[test]
    fn invalid_utf8_is_escaped() {
        let text = SpecificCharacterSet::IsoIr192.decode(b"A\xffB").unwrap();
        assert_eq!(text, "A\\377B");
    }
}
