//! Data elements held in memory and their typed value access.
//!
//! Every converter returns `None` when the value representation
//! does not match or the payload is malformed.
//! Binary numbers are read in the byte order of the owning data set,
//! text in its Specific Character Set.
use crate::dataset::DataSetId;
use crate::pixel_sequence::PixelSequence;
use crate::uid::is_valid_uid;
use dicomkit_core::{Length, Tag, VR};
use dicomkit_encoding::decode::basic::BasicDecoder;
use dicomkit_encoding::decode::BasicDecode;
use dicomkit_encoding::encode::basic::BasicEncoder;
use dicomkit_encoding::encode::BasicEncode;
use dicomkit_encoding::text::{EncodeTextError, SpecificCharacterSet, TextCodec};
use dicomkit_encoding::Endianness;
use itertools::Itertools;
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::str::FromStr;

/// An error raised when assigning a new value to an element.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum SetValueError {
    #[snafu(display("Cannot assign {} to element {} with VR {}", kind, tag, vr))]
    IncompatibleVr {
        kind: &'static str,
        tag: Tag,
        vr: VR,
        backtrace: Backtrace,
    },
    #[snafu(display("Value {} is out of range for VR {}", value, vr))]
    OutOfRange {
        value: String,
        vr: VR,
        backtrace: Backtrace,
    },
    #[snafu(display("Could not encode text for element {}", tag))]
    EncodeText {
        tag: Tag,
        #[snafu(backtrace)]
        source: EncodeTextError,
    },
    #[snafu(display("Could not encode number for element {}", tag))]
    EncodeNumber {
        tag: Tag,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Invalid UID `{}`", uid))]
    InvalidUid { uid: String, backtrace: Backtrace },
    #[snafu(display("Value of {} bytes is too long", len))]
    ValueTooLong { len: usize, backtrace: Backtrace },
}

pub type SetResult<T = ()> = Result<T, SetValueError>;

/// The value of a data element.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The raw bytes of a primitive element, as encoded.
    Bytes(Vec<u8>),
    /// The items of a sequence, in order.
    Sequence(Vec<DataSetId>),
    /// Encapsulated pixel data.
    PixelSequence(PixelSequence),
}

impl Value {
    /// An empty value fitting the given value representation.
    pub fn empty_for(vr: VR) -> Self {
        if vr.is_sequence() {
            Value::Sequence(Vec::new())
        } else if vr.is_pixel_sequence() {
            Value::PixelSequence(PixelSequence::default())
        } else {
            Value::Bytes(Vec::new())
        }
    }
}

/// A DICOM data element owned by a data set.
#[derive(Debug, Clone, PartialEq)]
pub struct DataElement {
    tag: Tag,
    vr: VR,
    length: Length,
    offset: u64,
    endianness: Endianness,
    charset: SpecificCharacterSet,
    value: Value,
}

/// Multi-valued text VRs split on backslashes.
fn is_multi_valued_text(vr: VR) -> bool {
    vr.is_string() && !matches!(vr, VR::LT | VR::ST | VR::UT | VR::UR)
}

fn trim_padding(text: &str) -> &str {
    text.trim_end_matches(|c: char| c == ' ' || c == '\0')
}

/// DS values convert to integers only when integral.
fn integral(value: f64) -> Option<i64> {
    let rounded = value.round();
    if !rounded.is_finite() || (value - rounded).abs() > 1e-9 {
        return None;
    }
    if rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return None;
    }
    Some(rounded as i64)
}

type ReadFn<T> = fn(&BasicDecoder, &[u8]) -> Option<T>;

impl DataElement {
    /// Create a data element from its parts.
    ///
    /// The length is derived from the value.
    /// Byte order and character set are taken from the data set
    /// once the element is inserted into one.
    pub fn new(tag: Tag, vr: VR, value: Value) -> Self {
        let length = match &value {
            Value::Bytes(bytes) => Length(bytes.len() as u32),
            _ => Length::UNDEFINED,
        };
        DataElement {
            tag,
            vr,
            length,
            offset: 0,
            endianness: Endianness::Little,
            charset: SpecificCharacterSet::Default,
            value,
        }
    }

    /// Create a data element as it was found in a stream.
    pub(crate) fn from_stream(tag: Tag, vr: VR, length: Length, offset: u64, value: Value) -> Self {
        DataElement {
            length,
            offset,
            ..DataElement::new(tag, vr, value)
        }
    }

    pub(crate) fn attach(&mut self, endianness: Endianness, charset: SpecificCharacterSet) {
        self.endianness = endianness;
        self.charset = charset;
    }

    pub(crate) fn push_item(&mut self, item: DataSetId) {
        if let Value::Sequence(items) = &mut self.value {
            items.push(item);
        }
    }

    /// The element's tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// The element's value representation.
    pub fn vr(&self) -> VR {
        self.vr
    }

    /// The value length, as read from the stream
    /// or derived from the last assigned value.
    /// Sequences and pixel sequences built in memory
    /// have an undefined length.
    pub fn length(&self) -> Length {
        self.length
    }

    /// The absolute offset of the element header in the source stream,
    /// zero for elements created in memory.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The byte order of the binary value.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// The character set used to decode text values.
    pub fn charset(&self) -> SpecificCharacterSet {
        self.charset
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.value, Value::Sequence(_))
    }

    pub fn is_pixel_sequence(&self) -> bool {
        matches!(self.value, Value::PixelSequence(_))
    }

    /// The raw value bytes of a primitive element.
    pub fn value_bytes(&self) -> Option<&[u8]> {
        match &self.value {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// The items of a sequence element, as data set handles
    /// to resolve through the owning file.
    pub fn sequence(&self) -> Option<&[DataSetId]> {
        match &self.value {
            Value::Sequence(items) if self.vr.is_sequence() => Some(items),
            _ => None,
        }
    }

    /// The encapsulated pixel data of a pixel sequence element.
    pub fn pixel_sequence(&self) -> Option<&PixelSequence> {
        match &self.value {
            Value::PixelSequence(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn pixel_sequence_mut(&mut self) -> Option<&mut PixelSequence> {
        match &mut self.value {
            Value::PixelSequence(seq) => Some(seq),
            _ => None,
        }
    }

    /// The value multiplicity (PS3.5 section 6.4).
    pub fn vm(&self) -> usize {
        let bytes = match &self.value {
            Value::Sequence(items) => return usize::from(!items.is_empty()),
            Value::PixelSequence(_) => return 1,
            Value::Bytes(bytes) => bytes,
        };
        if bytes.is_empty() {
            return 0;
        }
        match self.vr {
            VR::FD | VR::SV | VR::UV => bytes.len() / 8,
            VR::AT | VR::FL | VR::UL | VR::SL => bytes.len() / 4,
            VR::US | VR::SS => bytes.len() / 2,
            vr if is_multi_valued_text(vr) => bytes.iter().filter(|b| **b == b'\\').count() + 1,
            _ => 1,
        }
    }

    fn binary_values<T>(&self, size: usize, first: bool, read: ReadFn<T>) -> Option<Vec<T>> {
        let bytes = self.value_bytes()?;
        let basic = BasicDecoder::new(self.endianness);
        if first {
            let head = bytes.get(..size)?;
            return read(&basic, head).map(|v| vec![v]);
        }
        if bytes.is_empty() || bytes.len() % size != 0 {
            return None;
        }
        bytes
            .chunks_exact(size)
            .map(|chunk| read(&basic, chunk))
            .collect()
    }

    fn binary_integers(&self, first: bool) -> Option<Vec<i64>> {
        let (size, read): (usize, ReadFn<i64>) = match self.vr {
            VR::SS => (2, |d, b| d.decode_ss(b).ok().map(i64::from)),
            VR::US => (2, |d, b| d.decode_us(b).ok().map(i64::from)),
            VR::SL => (4, |d, b| d.decode_sl(b).ok().map(i64::from)),
            VR::UL => (4, |d, b| d.decode_ul(b).ok().map(i64::from)),
            VR::SV => (8, |d, b| d.decode_sv(b).ok()),
            VR::UV => (8, |d, b| {
                d.decode_uv(b).ok().and_then(|v| i64::try_from(v).ok())
            }),
            _ => return None,
        };
        self.binary_values(size, first, read)
    }

    /// Parse the backslash (or slash) separated numbers of a text value.
    fn text_numbers<T: FromStr>(&self) -> Option<Vec<T>> {
        let text = std::str::from_utf8(self.value_bytes()?).ok()?;
        let numbers: Vec<T> = text
            .split(|c: char| c == '\\' || c == '/')
            .map(|token| token.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0'))
            .filter(|token| !token.is_empty())
            .map(|token| token.parse().ok())
            .collect::<Option<_>>()?;
        if numbers.is_empty() {
            None
        } else {
            Some(numbers)
        }
    }

    fn integers(&self, first: bool) -> Option<Vec<i64>> {
        let mut values = match self.vr {
            VR::IS => self.text_numbers::<i64>()?,
            VR::DS => self
                .text_numbers::<f64>()?
                .into_iter()
                .map(integral)
                .collect::<Option<_>>()?,
            _ => return self.binary_integers(first),
        };
        if first {
            values.truncate(1);
        }
        Some(values)
    }

    fn doubles(&self, first: bool) -> Option<Vec<f64>> {
        match self.vr {
            VR::FL | VR::OF => {
                self.binary_values(4, first, |d, b| d.decode_fl(b).ok().map(f64::from))
            }
            VR::FD | VR::OD => self.binary_values(8, first, |d, b| d.decode_fd(b).ok()),
            VR::IS | VR::DS => {
                let mut values = self.text_numbers::<f64>()?;
                if first {
                    values.truncate(1);
                }
                Some(values)
            }
            _ => self
                .binary_integers(first)
                .map(|values| values.into_iter().map(|v| v as f64).collect()),
        }
    }

    /// The first value as a 32-bit integer.
    pub fn to_long(&self) -> Option<i32> {
        i32::try_from(self.to_longlong()?).ok()
    }

    /// The first value as a 64-bit integer.
    pub fn to_longlong(&self) -> Option<i64> {
        self.integers(true)?.first().copied()
    }

    /// The first value as a double precision float.
    pub fn to_double(&self) -> Option<f64> {
        self.doubles(true)?.first().copied()
    }

    /// All values as 32-bit integers,
    /// `None` if any of them is out of range.
    pub fn to_long_vector(&self) -> Option<Vec<i32>> {
        self.integers(false)?
            .into_iter()
            .map(|v| i32::try_from(v).ok())
            .collect()
    }

    pub fn to_longlong_vector(&self) -> Option<Vec<i64>> {
        self.integers(false)
    }

    pub fn to_double_vector(&self) -> Option<Vec<f64>> {
        self.doubles(false)
    }

    /// The first value of an AT element.
    pub fn to_tag(&self) -> Option<Tag> {
        self.to_tags(true)?.first().copied()
    }

    pub fn to_tag_vector(&self) -> Option<Vec<Tag>> {
        self.to_tags(false)
    }

    fn to_tags(&self, first: bool) -> Option<Vec<Tag>> {
        if self.vr != VR::AT {
            return None;
        }
        self.binary_values(4, first, |d, b| d.decode_tag(b).ok())
    }

    /// The whole text value decoded with the character set,
    /// trailing padding removed.
    /// Multiple values remain separated by backslashes.
    #[allow(clippy::inherent_to_string)]
    pub fn to_string(&self) -> Option<String> {
        if !self.vr.is_string() {
            return None;
        }
        let text = self.charset.decode(self.value_bytes()?).ok()?;
        Some(trim_padding(&text).to_string())
    }

    /// The individual text values, each without trailing padding.
    pub fn to_strings(&self) -> Option<Vec<String>> {
        let text = self.to_string()?;
        if !is_multi_valued_text(self.vr) {
            return Some(vec![text]);
        }
        Some(
            text.split('\\')
                .map(|value| trim_padding(value).to_string())
                .collect(),
        )
    }

    /// The value of a UI element, without padding.
    pub fn to_uid_string(&self) -> Option<String> {
        if self.vr != VR::UI {
            return None;
        }
        let text = std::str::from_utf8(self.value_bytes()?).ok()?;
        Some(
            text.trim_matches(|c: char| c == '\0' || c == ' ')
                .to_string(),
        )
    }

    fn set_encoded(&mut self, mut bytes: Vec<u8>) -> SetResult {
        if bytes.len() & 1 == 1 {
            bytes.push(self.vr.padding_byte());
        }
        let len = u32::try_from(bytes.len())
            .ok()
            .filter(|len| *len != u32::MAX)
            .context(ValueTooLongSnafu { len: bytes.len() })?;
        self.length = Length(len);
        self.value = Value::Bytes(bytes);
        Ok(())
    }

    fn ensure_vr(&self, accepted: bool, kind: &'static str) -> SetResult {
        ensure!(
            accepted,
            IncompatibleVrSnafu {
                kind,
                tag: self.tag,
                vr: self.vr
            }
        );
        Ok(())
    }

    /// Replace the value with raw bytes, already in the data set's encoding.
    pub fn set_bytes(&mut self, bytes: Vec<u8>) -> SetResult {
        self.ensure_vr(
            !self.vr.is_sequence() && !self.vr.is_pixel_sequence() && self.vr != VR::NONE,
            "raw bytes",
        )?;
        self.set_encoded(bytes)
    }

    /// Replace the value with a single text value.
    pub fn set_string(&mut self, value: &str) -> SetResult {
        self.ensure_vr(self.vr.is_string(), "text")?;
        let bytes = self
            .charset
            .encode(value)
            .context(EncodeTextSnafu { tag: self.tag })?;
        self.set_encoded(bytes)
    }

    /// Replace the value with several text values.
    pub fn set_strings<S: AsRef<str>>(&mut self, values: &[S]) -> SetResult {
        let joined = values.iter().map(AsRef::as_ref).join("\\");
        self.set_string(&joined)
    }

    /// Replace the value with a single integer.
    pub fn set_long(&mut self, value: i64) -> SetResult {
        self.set_longs(&[value])
    }

    /// Replace the value with integers,
    /// checked against the range of the value representation.
    pub fn set_longs(&mut self, values: &[i64]) -> SetResult {
        let vr = self.vr;
        let out_of_range = |v: &i64| OutOfRangeSnafu {
            value: v.to_string(),
            vr,
        };
        let basic = BasicEncoder::new(self.endianness);
        let mut bytes = Vec::new();
        match vr {
            VR::IS => {
                for v in values {
                    i32::try_from(*v).ok().with_context(|| out_of_range(v))?;
                }
                return self.set_string(&values.iter().join("\\"));
            }
            VR::DS => return self.set_string(&values.iter().join("\\")),
            VR::SS | VR::US | VR::SL | VR::UL | VR::SV | VR::UV | VR::FL | VR::FD => {}
            _ => return self.ensure_vr(false, "an integer"),
        }
        for v in values {
            let written = match vr {
                VR::SS => basic.encode_ss(&mut bytes, i16::try_from(*v).ok().with_context(|| out_of_range(v))?),
                VR::US => basic.encode_us(&mut bytes, u16::try_from(*v).ok().with_context(|| out_of_range(v))?),
                VR::SL => basic.encode_sl(&mut bytes, i32::try_from(*v).ok().with_context(|| out_of_range(v))?),
                VR::UL => basic.encode_ul(&mut bytes, u32::try_from(*v).ok().with_context(|| out_of_range(v))?),
                VR::UV => basic.encode_uv(&mut bytes, u64::try_from(*v).ok().with_context(|| out_of_range(v))?),
                VR::FL => basic.encode_fl(&mut bytes, *v as f32),
                VR::FD => basic.encode_fd(&mut bytes, *v as f64),
                _ => basic.encode_sv(&mut bytes, *v),
            };
            written.context(EncodeNumberSnafu { tag: self.tag })?;
        }
        self.set_encoded(bytes)
    }

    /// Replace the value with a single float.
    pub fn set_double(&mut self, value: f64) -> SetResult {
        self.set_doubles(&[value])
    }

    /// Replace the value with floats (FL, FD, OF, OD or DS).
    pub fn set_doubles(&mut self, values: &[f64]) -> SetResult {
        let basic = BasicEncoder::new(self.endianness);
        let mut bytes = Vec::new();
        match self.vr {
            VR::DS => return self.set_string(&values.iter().join("\\")),
            VR::FL | VR::OF => {
                for v in values {
                    basic
                        .encode_fl(&mut bytes, *v as f32)
                        .context(EncodeNumberSnafu { tag: self.tag })?;
                }
            }
            VR::FD | VR::OD => {
                for v in values {
                    basic
                        .encode_fd(&mut bytes, *v)
                        .context(EncodeNumberSnafu { tag: self.tag })?;
                }
            }
            _ => return self.ensure_vr(false, "a float"),
        }
        self.set_encoded(bytes)
    }

    pub fn set_tag(&mut self, value: Tag) -> SetResult {
        self.set_tags(&[value])
    }

    /// Replace the value of an AT element.
    pub fn set_tags(&mut self, values: &[Tag]) -> SetResult {
        self.ensure_vr(self.vr == VR::AT, "a tag")?;
        let basic = BasicEncoder::new(self.endianness);
        let mut bytes = Vec::with_capacity(values.len() * 4);
        for tag in values {
            basic
                .encode_tag(&mut bytes, *tag)
                .context(EncodeNumberSnafu { tag: self.tag })?;
        }
        self.set_encoded(bytes)
    }

    /// Replace the value of a UI element, padded with `\0`.
    pub fn set_uid(&mut self, uid: &str) -> SetResult {
        self.ensure_vr(self.vr == VR::UI, "a UID")?;
        let uid = uid.trim_end_matches(|c: char| c == '\0' || c == ' ');
        ensure!(is_valid_uid(uid), InvalidUidSnafu { uid });
        self.set_encoded(uid.as_bytes().to_vec())
    }
}

/// The outcome of looking up an element which may be missing.
///
/// A missing element has the VR `NONE`,
/// a value multiplicity of zero,
/// and converts to `false`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementLookup<'a> {
    Present(&'a DataElement),
    Missing,
}

macro_rules! delegate_converters {
    ($($name:ident -> $out:ty;)*) => {
        $(
            pub fn $name(&self) -> Option<$out> {
                self.element()?.$name()
            }
        )*
    };
}

impl<'a> ElementLookup<'a> {
    pub fn is_present(&self) -> bool {
        matches!(self, ElementLookup::Present(_))
    }

    pub fn is_missing(&self) -> bool {
        !self.is_present()
    }

    /// The element found, if any.
    pub fn element(&self) -> Option<&'a DataElement> {
        match self {
            ElementLookup::Present(element) => Some(element),
            ElementLookup::Missing => None,
        }
    }

    pub fn tag(&self) -> Option<Tag> {
        self.element().map(DataElement::tag)
    }

    pub fn vr(&self) -> VR {
        self.element().map_or(VR::NONE, DataElement::vr)
    }

    pub fn vm(&self) -> usize {
        self.element().map_or(0, DataElement::vm)
    }

    pub fn sequence(&self) -> Option<&'a [DataSetId]> {
        self.element()?.sequence()
    }

    pub fn pixel_sequence(&self) -> Option<&'a PixelSequence> {
        self.element()?.pixel_sequence()
    }

    pub fn value_bytes(&self) -> Option<&'a [u8]> {
        self.element()?.value_bytes()
    }

    delegate_converters! {
        to_long -> i32;
        to_longlong -> i64;
        to_double -> f64;
        to_long_vector -> Vec<i32>;
        to_longlong_vector -> Vec<i64>;
        to_double_vector -> Vec<f64>;
        to_tag -> Tag;
        to_tag_vector -> Vec<Tag>;
        to_string -> String;
        to_strings -> Vec<String>;
        to_uid_string -> String;
    }
}

impl<'a> From<Option<&'a DataElement>> for ElementLookup<'a> {
    fn from(element: Option<&'a DataElement>) -> Self {
        element.map_or(ElementLookup::Missing, ElementLookup::Present)
    }
}

impl From<ElementLookup<'_>> for bool {
    fn from(lookup: ElementLookup<'_>) -> bool {
        lookup.is_present()
    }
}
