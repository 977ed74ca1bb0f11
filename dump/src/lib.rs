//! DICOM data dumping library
//!
//! This is a helper library
//! for dumping the contents of DICOM files
//! in a human readable way.
//!
//! # Examples
//!
//! A quick and easy way to dump the contents of a DICOM file
//! is via [`dump_file`]
//! (or [`dump_file_to`] to print to an arbitrary writer).
//!
//! ```no_run
//! use dicomkit_object::{read_file, ReadOptions};
//! use dicomkit_dump::dump_file;
//!
//! let file = read_file("path/to/file.dcm", ReadOptions::new())?;
//! dump_file(&file)?;
//! # Result::<(), Box<dyn std::error::Error>>::Ok(())
//! ```
//!
//! See the [`DumpOptions`] builder for additional dumping options.
//!
//! ```no_run
//! use dicomkit_object::{read_file, ReadOptions};
//! use dicomkit_dump::DumpOptions;
//!
//! let file = read_file("path/to/file2.dcm", ReadOptions::new())?;
//! let mut options = DumpOptions::new();
//! // dump to stdout (width = 100)
//! options.width(100).dump_file(&file)?;
//! # Result::<(), Box<dyn std::error::Error>>::Ok(())
//! ```
use dicomkit_core::dictionary::{DataDictionary, DictionaryEntry, UidDictionary};
use dicomkit_core::VR;
use dicomkit_dictionary_std::{StandardDataDictionary, StandardUidDictionary};
use dicomkit_encoding::Endianness;
use dicomkit_object::{DataElement, DataSet, DataSetId, DicomFile, FileMetaTable, PixelSequence};
use owo_colors::*;
use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::io::{stdout, Result as IoResult, Write};
use std::str::FromStr;

/// An enum of all supported output formats for dumping DICOM data.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum DumpFormat {
    /// The main human readable format,
    /// with one indented line per element and item.
    ///
    /// Note that this format is not stabilized,
    /// and may change with subsequent versions of the crate.
    #[default]
    Main,
    /// Tab separated columns as rendered by [`DicomFile::dump`],
    /// one line per element with its full tag path.
    Table,
}

/// Options and flags to configure how to dump a DICOM file.
///
/// This is a builder which exposes the various options available
/// for printing the contents of the DICOM file in a readable way.
///
/// Once set up,
/// the [`dump_file`] or [`dump_file_to`] methods can be used
/// to finalize the DICOM data dumping process on an open file.
/// Both the file meta group and the main data set are dumped.
/// Alternatively,
/// [`dump_dataset_to`] works on a single data set of the file,
/// such as a sequence item.
///
/// [`dump_file`]: DumpOptions::dump_file
/// [`dump_file_to`]: DumpOptions::dump_file_to
/// [`dump_dataset_to`]: DumpOptions::dump_dataset_to
///
/// # Example
///
/// ```no_run
/// use dicomkit_object::{read_file, ReadOptions};
/// use dicomkit_dump::{ColorMode, DumpOptions};
///
/// let my_dicom_file = read_file("/path_to_file", ReadOptions::new())?;
/// let mut options = DumpOptions::new();
/// options
///     // maximum 120 characters per line
///     .width(120)
///     // no limit for text values
///     .no_text_limit(true)
///     // never print colored output
///     .color_mode(ColorMode::Never)
///     // dump to stdout
///     .dump_file(&my_dicom_file)?;
/// # Result::<(), Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
#[non_exhaustive]
pub struct DumpOptions {
    /// the output format
    pub format: DumpFormat,
    /// whether to produce colored output
    pub color: ColorMode,
    /// the console width to assume when trimming long values
    pub width: Option<u32>,
    /// never trim out long text values
    pub no_text_limit: bool,
    /// never trim out any values (implies `no_text_limit`)
    pub no_limit: bool,
    /// print the byte offset of each element
    pub offsets: bool,
}

impl DumpOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the output format.
    ///
    /// See the [`DumpFormat`] documentation for the list of supported formats.
    pub fn format(&mut self, format: DumpFormat) -> &mut Self {
        self.format = format;
        self
    }

    /// Set the maximum output width in number of characters.
    ///
    /// The methods [`dump_file_to`](DumpOptions::dump_file_to)
    /// and [`dump_dataset_to`](DumpOptions::dump_dataset_to)
    /// will print everything to the end,
    /// regardless of this option.
    pub fn width(&mut self, width: u32) -> &mut Self {
        self.width = Some(width);
        self
    }

    /// Set the maximum output width to automatic,
    /// based on terminal size.
    ///
    /// This is the default behavior.
    /// If a terminal width could not be determined,
    /// the default width of 120 characters is used.
    pub fn width_auto(&mut self) -> &mut Self {
        self.width = None;
        self
    }

    /// Set whether to remove the maximum width restriction for text values.
    pub fn no_text_limit(&mut self, no_text_limit: bool) -> &mut Self {
        self.no_text_limit = no_text_limit;
        self
    }

    /// Set whether to remove the maximum width restriction
    /// for all DICOM values.
    pub fn no_limit(&mut self, no_limit: bool) -> &mut Self {
        self.no_limit = no_limit;
        self
    }

    /// Set whether to print the byte offset of each element.
    pub fn offsets(&mut self, offsets: bool) -> &mut Self {
        self.offsets = offsets;
        self
    }

    /// Set the output color mode.
    pub fn color_mode(&mut self, color: ColorMode) -> &mut Self {
        self.color = color;
        self
    }

    /// Dump the contents of an open DICOM file to standard output.
    pub fn dump_file(&self, file: &DicomFile) -> IoResult<()> {
        self.dump_file_impl(stdout(), file, true)
    }

    /// Dump the contents of an open DICOM file to the given writer.
    pub fn dump_file_to(&self, to: impl Write, file: &DicomFile) -> IoResult<()> {
        self.dump_file_impl(to, file, false)
    }

    fn dump_file_impl(&self, mut to: impl Write, file: &DicomFile, to_stdout: bool) -> IoResult<()> {
        self.apply_color_override(to_stdout);
        let limits = self.limits(to_stdout);

        if self.format == DumpFormat::Table {
            let max_chars = if limits.no_limit {
                0
            } else {
                limits.width as usize
            };
            return to.write_all(file.dump(max_chars, self.offsets).as_bytes());
        }

        meta_dump(
            &mut to,
            file,
            if limits.no_limit { u32::MAX } else { limits.width },
        )?;

        writeln!(to, "{:-<58}", "")?;

        let dumper = Dumper {
            file,
            limits,
            offsets: self.offsets,
        };
        dumper.dump(&mut to, file.root(), 0, true)?;

        if let Some(message) = file.error_message() {
            writeln!(
                to,
                "{}",
                DumpValue::Invalid(format!("[reading stopped early: {}]", message))
            )?;
        }

        Ok(())
    }

    /// Dump the elements of a single data set of the file
    /// to the given writer.
    ///
    /// Does nothing if the data set does not exist.
    pub fn dump_dataset_to(&self, mut to: impl Write, file: &DicomFile, id: DataSetId) -> IoResult<()> {
        self.apply_color_override(false);
        let Some(set) = file.dataset(id) else {
            return Ok(());
        };
        let dumper = Dumper {
            file,
            limits: self.limits(false),
            offsets: self.offsets,
        };
        dumper.dump(&mut to, set, 0, false)
    }

    fn apply_color_override(&self, to_stdout: bool) {
        match (self.color, to_stdout) {
            (ColorMode::Never, _) => owo_colors::set_override(false),
            (ColorMode::Always, _) => owo_colors::set_override(true),
            (ColorMode::Auto, false) => owo_colors::set_override(false),
            (ColorMode::Auto, true) => owo_colors::unset_override(),
        }
    }

    fn limits(&self, to_stdout: bool) -> Limits {
        let width = determine_width(self.width);
        if to_stdout {
            Limits {
                width,
                no_text_limit: self.no_text_limit,
                no_limit: self.no_limit,
            }
        } else {
            Limits {
                width,
                no_text_limit: true,
                no_limit: true,
            }
        }
    }
}

/// Enumeration of output coloring modes.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub enum ColorMode {
    /// Produce colored output if supported by the destination
    /// (namely, if the destination is a terminal).
    /// When calling [`dump_file_to`](DumpOptions::dump_file_to),
    /// the output will not be colored.
    ///
    /// This is the default behavior.
    #[default]
    Auto,
    /// Never produce colored output.
    Never,
    /// Always produce colored output.
    Always,
}

impl Display for ColorMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Never => f.write_str("never"),
            ColorMode::Auto => f.write_str("auto"),
            ColorMode::Always => f.write_str("always"),
        }
    }
}

impl FromStr for ColorMode {
    type Err = ColorModeError;
    fn from_str(color: &str) -> Result<Self, Self::Err> {
        match color {
            "never" => Ok(ColorMode::Never),
            "auto" => Ok(ColorMode::Auto),
            "always" => Ok(ColorMode::Always),
            _ => Err(ColorModeError),
        }
    }
}

/// The error raised when providing an invalid color mode.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct ColorModeError;

impl Display for ColorModeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("invalid color mode")
    }
}

impl std::error::Error for ColorModeError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DumpValue<T>
where
    T: ToString,
{
    TagNum(T),
    Alias(T),
    Num(T),
    Str(T),
    DateTime(T),
    Invalid(T),
    Nothing,
}

impl<T> Display for DumpValue<T>
where
    T: Display,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        fn write_value_with_width(value: impl Display, f: &mut Formatter) -> fmt::Result {
            if let Some(width) = f.width() {
                write!(f, "{:width$}", value, width = width)
            } else {
                write!(f, "{}", value)
            }
        }

        match self {
            DumpValue::TagNum(v) => {
                let value = v.if_supports_color(Stream::Stdout, |v| v.dimmed());
                write_value_with_width(value, f)
            }
            DumpValue::Alias(v) => {
                let value = v.if_supports_color(Stream::Stdout, |v| v.bold());
                write_value_with_width(value, f)
            }
            DumpValue::Num(v) => {
                let value = v.if_supports_color(Stream::Stdout, |v| v.cyan());
                write_value_with_width(value, f)
            }
            DumpValue::Str(v) => {
                let value = v.if_supports_color(Stream::Stdout, |v| v.yellow());
                write_value_with_width(value, f)
            }
            DumpValue::DateTime(v) => {
                let value = v.if_supports_color(Stream::Stdout, |v| v.green());
                write_value_with_width(value, f)
            }
            DumpValue::Invalid(v) => {
                let value = v.if_supports_color(Stream::Stdout, |v| v.red());
                write_value_with_width(value, f)
            }
            DumpValue::Nothing => {
                let value = "(no value)".if_supports_color(Stream::Stdout, |v| v.italic());
                write_value_with_width(value, f)
            }
        }
    }
}

/// Dump the contents of a DICOM file to stdout.
///
/// Both the file meta group and the main data set are dumped.
pub fn dump_file(file: &DicomFile) -> IoResult<()> {
    DumpOptions::new().dump_file(file)
}

/// Dump the contents of a DICOM file to the given writer.
///
/// Both the file meta group and the main data set are dumped.
pub fn dump_file_to(to: impl Write, file: &DicomFile) -> IoResult<()> {
    DumpOptions::new().dump_file_to(to, file)
}

#[inline]
fn whitespace_or_null(c: char) -> bool {
    c.is_whitespace() || c == '\0'
}

fn meta_dump<W>(to: &mut W, file: &DicomFile, width: u32) -> IoResult<()>
where
    W: ?Sized + Write,
{
    let label = |text: &'static str| text.if_supports_color(Stream::Stdout, |v| v.bold()).to_string();

    let meta = match FileMetaTable::from_dataset(file.root()) {
        Ok(meta) => Some(meta),
        Err(e) => {
            tracing::debug!("No usable file meta group: {}", e);
            None
        }
    };

    if let Some(meta) = &meta {
        let sop_class_uid = meta
            .media_storage_sop_class_uid()
            .trim_end_matches(whitespace_or_null);
        match StandardUidDictionary.resolve_uid(sop_class_uid) {
            Some(info) => writeln!(
                to,
                "{}: {} ({})",
                label("Media Storage SOP Class UID"),
                sop_class_uid,
                info.name,
            )?,
            None => writeln!(
                to,
                "{}: {}",
                label("Media Storage SOP Class UID"),
                sop_class_uid,
            )?,
        }
        writeln!(
            to,
            "{}: {}",
            label("Media Storage SOP Instance UID"),
            meta.media_storage_sop_instance_uid()
                .trim_end_matches(whitespace_or_null),
        )?;
    }

    match file.transfer_syntax_entry() {
        Some(ts) => writeln!(
            to,
            "{}: {} ({})",
            label("Transfer Syntax"),
            ts.uid(),
            ts.name()
        )?,
        None => writeln!(
            to,
            "{}: {} («UNKNOWN»)",
            label("Transfer Syntax"),
            file.transfer_syntax().trim_end_matches(whitespace_or_null)
        )?,
    }

    let Some(meta) = meta else {
        writeln!(to)?;
        return Ok(());
    };

    writeln!(
        to,
        "{}: {}",
        label("Implementation Class UID"),
        meta.implementation_class_uid
            .trim_end_matches(whitespace_or_null),
    )?;

    if let Some(v) = meta.implementation_version_name.as_ref() {
        writeln!(to, "{}: {}", label("Implementation version name"), v.trim_end())?;
    }

    if let Some(v) = meta.source_application_entity_title.as_ref() {
        writeln!(
            to,
            "{}: {}",
            label("Source Application Entity Title"),
            v.trim_end()
        )?;
    }

    if let Some(v) = meta.private_information_creator_uid.as_ref() {
        writeln!(
            to,
            "{}: {}",
            label("Private Information Creator UID"),
            v.trim_end_matches(whitespace_or_null)
        )?;
    }

    if let Some(v) = meta.private_information.as_ref() {
        writeln!(
            to,
            "{}: {}",
            label("Private Information"),
            format_value_list(v.iter().map(|n| format!("{:02X}", n)), Some(width), false)
        )?;
    }

    writeln!(to)?;
    Ok(())
}

#[derive(Debug, Copy, Clone)]
struct Limits {
    width: u32,
    no_text_limit: bool,
    no_limit: bool,
}

struct Dumper<'a> {
    file: &'a DicomFile,
    limits: Limits,
    offsets: bool,
}

impl Dumper<'_> {
    fn dump<W>(&self, to: &mut W, set: &DataSet, depth: u32, skip_meta: bool) -> IoResult<()>
    where
        W: ?Sized + Write,
    {
        for elem in set {
            if skip_meta && elem.tag().group() == 0x0002 {
                continue;
            }
            self.dump_element(&mut *to, elem, depth)?;
        }
        Ok(())
    }

    fn offset_prefix(&self, elem: &DataElement) -> String {
        if self.offsets {
            format!("{} ", DumpValue::TagNum(format!("@{:08X}", elem.offset())))
        } else {
            String::new()
        }
    }

    fn dump_element<W>(&self, to: &mut W, elem: &DataElement, depth: u32) -> IoResult<()>
    where
        W: ?Sized + Write,
    {
        let Limits {
            width,
            no_text_limit,
            no_limit,
        } = self.limits;
        let indent = vec![b' '; (depth * 2) as usize];
        let tag_alias = StandardDataDictionary
            .by_tag(elem.tag())
            .map(DictionaryEntry::alias)
            .unwrap_or("«Unknown Attribute»");
        to.write_all(&indent)?;
        let offset = self.offset_prefix(elem);

        if let Some(items) = elem.sequence() {
            let count = items.len();
            writeln!(
                to,
                "{}{} {:28} {} ({} Item{})",
                offset,
                DumpValue::TagNum(elem.tag()),
                DumpValue::Alias(tag_alias),
                elem.vr(),
                count,
                if count == 1 { "" } else { "s" },
            )?;
            for id in items {
                if let Some(item) = self.file.dataset(*id) {
                    self.dump_item(&mut *to, item, depth + 2)?;
                }
            }
            to.write_all(&indent)?;
            writeln!(
                to,
                "{} {}",
                DumpValue::TagNum("(FFFE,E0DD)"),
                DumpValue::Alias("SequenceDelimitationItem"),
            )?;
        } else if let Some(seq) = elem.pixel_sequence() {
            // pixel sequence start line
            let num_items = 1 + seq.fragment_count();
            writeln!(
                to,
                "{}{} {:28} {} (PixelSequence, {} Item{}, {} Frame{})",
                offset,
                DumpValue::TagNum(elem.tag()),
                DumpValue::Alias(tag_alias),
                elem.vr(),
                num_items,
                if num_items == 1 { "" } else { "s" },
                seq.number_of_frames(),
                if seq.number_of_frames() == 1 { "" } else { "s" },
            )?;
            self.dump_pixel_sequence(&mut *to, seq, depth)?;
        } else {
            let vr = elem.vr();
            let byte_len = elem.length().0;
            writeln!(
                to,
                "{}{} {:28} {} ({},{:>3} bytes): {}",
                offset,
                DumpValue::TagNum(elem.tag()),
                DumpValue::Alias(tag_alias),
                vr,
                elem.vm(),
                byte_len,
                value_summary(
                    elem,
                    width.saturating_sub(63 + depth * 2),
                    no_text_limit,
                    no_limit,
                ),
            )?;
        }

        Ok(())
    }

    fn dump_pixel_sequence<W>(&self, to: &mut W, seq: &PixelSequence, depth: u32) -> IoResult<()>
    where
        W: ?Sized + Write,
    {
        let indent = "  ".repeat(depth as usize + 1);
        let max_characters = Some(self.limits.width)
            .filter(|_| !self.limits.no_limit)
            .map(|w| w.saturating_sub(38 + depth * 2));

        let offset_table = seq.offset_table();
        writeln!(
            to,
            "{}{} offset table ({:>2}, {:>2} bytes): {}",
            indent,
            DumpValue::TagNum("(FFFE,E000)"),
            offset_table.len(),
            offset_table.len() * 4,
            offset_table_summary(offset_table, max_characters),
        )?;

        for index in 0..seq.number_of_frames() {
            let Some(frame) = seq.frame(index) else {
                continue;
            };
            for fragment in frame.fragments() {
                writeln!(
                    to,
                    "{}{} pi #{} ({:>3} bytes): {}",
                    indent,
                    DumpValue::TagNum("(FFFE,E000)"),
                    index,
                    fragment.data.len(),
                    item_value_summary(&fragment.data, max_characters),
                )?;
            }
        }
        Ok(())
    }

    fn dump_item<W>(&self, to: &mut W, item: &DataSet, depth: u32) -> IoResult<()>
    where
        W: ?Sized + Write,
    {
        let indent: String = "  ".repeat(depth as usize);
        writeln!(
            to,
            "{}{} na {}",
            indent,
            DumpValue::TagNum("(FFFE,E000)"),
            DumpValue::Alias("Item"),
        )?;
        self.dump(to, item, depth + 1, false)?;
        writeln!(
            to,
            "{}{} {}",
            indent,
            DumpValue::TagNum("(FFFE,E00D)"),
            DumpValue::Alias("ItemDelimitationItem"),
        )?;
        Ok(())
    }
}

fn value_summary(
    elem: &DataElement,
    max_characters: u32,
    no_text_limit: bool,
    no_limit: bool,
) -> DumpValue<String> {
    let vr = elem.vr();
    let max_characters = match (no_limit, no_text_limit, vr.is_string()) {
        (true, _, _) | (false, true, true) => None,
        (false, _, _) => Some(max_characters),
    };

    if elem.value_bytes().map_or(true, |bytes| bytes.is_empty()) {
        return DumpValue::Nothing;
    }

    let invalid = || {
        DumpValue::Invalid(format_value_list(
            elem.value_bytes()
                .unwrap_or_default()
                .iter()
                .map(|n| format!("{:02X}", n)),
            max_characters,
            false,
        ))
    };

    match vr {
        VR::SS | VR::US | VR::SL | VR::UL | VR::SV | VR::UV => elem
            .to_longlong_vector()
            .map(|values| DumpValue::Num(format_value_list(values, max_characters, false)))
            .unwrap_or_else(invalid),
        VR::FL | VR::FD | VR::OF | VR::OD => elem
            .to_double_vector()
            .map(|values| DumpValue::Num(format_value_list(values, max_characters, false)))
            .unwrap_or_else(invalid),
        VR::AT => elem
            .to_tag_vector()
            .map(|values| DumpValue::Str(format_value_list(values, max_characters, false)))
            .unwrap_or_else(invalid),
        VR::OW => {
            let words = elem.value_bytes().unwrap_or_default().chunks_exact(2);
            let endianness = elem.endianness();
            DumpValue::Num(format_value_list(
                words.map(|w| {
                    let word = [w[0], w[1]];
                    let n = match endianness {
                        Endianness::Little => u16::from_le_bytes(word),
                        Endianness::Big => u16::from_be_bytes(word),
                    };
                    format!("{:04X}", n)
                }),
                max_characters,
                false,
            ))
        }
        VR::UI => match elem.to_uid_string() {
            Some(uid) => match StandardUidDictionary.resolve_uid(&uid) {
                Some(info) => DumpValue::Str(format!(
                    "{} ({})",
                    format_value_list([&uid], max_characters, true),
                    info.name
                )),
                None => DumpValue::Str(format_value_list([&uid], max_characters, true)),
            },
            None => invalid(),
        },
        VR::DA | VR::TM | VR::DT => match elem.to_strings() {
            Some(values) if values.iter().all(|v| looks_temporal(v)) => {
                DumpValue::DateTime(format_value_list(
                    values.iter().map(|s| s.trim_end_matches(whitespace_or_null)),
                    max_characters,
                    false,
                ))
            }
            Some(values) => DumpValue::Invalid(format_value_list(values, max_characters, true)),
            None => invalid(),
        },
        VR::LT | VR::ST | VR::UT => match elem.to_string() {
            Some(value) => {
                let txt = format!(
                    "\"{}\"",
                    value
                        .trim_end_matches(whitespace_or_null)
                        .replace('\n', "␊")
                        .replace('\r', "␍")
                        .replace('\0', "␀")
                        .replace(|c: char| c.is_control(), "�")
                );
                match max_characters {
                    Some(max) => DumpValue::Str(cut_str(&txt, max).into_owned()),
                    None => DumpValue::Str(txt),
                }
            }
            None => invalid(),
        },
        vr if vr.is_string() => match elem.to_strings() {
            Some(values) => DumpValue::Str(format_value_list(
                values.iter().map(|s| s.trim_end_matches(whitespace_or_null)),
                max_characters,
                true,
            )),
            None => invalid(),
        },
        _ => DumpValue::Num(format_value_list(
            elem.value_bytes()
                .unwrap_or_default()
                .iter()
                .map(|n| format!("{:02X}", n)),
            max_characters,
            false,
        )),
    }
}

/// Dates, times and date-times only hold digits and a few separators.
fn looks_temporal(value: &str) -> bool {
    let value = value.trim_end_matches(whitespace_or_null);
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | ':'))
}

fn item_value_summary(data: &[u8], max_characters: Option<u32>) -> DumpValue<String> {
    DumpValue::Num(format_value_list(
        data.iter().map(|n| format!("{:02X}", n)),
        max_characters,
        false,
    ))
}

fn offset_table_summary(data: &[u32], max_characters: Option<u32>) -> String {
    if data.is_empty() {
        format!("{}", "(empty)".if_supports_color(Stream::Stdout, |v| v.italic()))
    } else {
        format_value_list(
            data.iter().map(|n| format!("{:04X}", n)),
            max_characters,
            false,
        )
    }
}

fn format_value_list<I>(values: I, max_characters: Option<u32>, quoted: bool) -> String
where
    I: IntoIterator,
    I::IntoIter: ExactSizeIterator,
    I::Item: Display,
{
    let values = values.into_iter();
    let len = values.len();
    let mut acc_size = 0;
    let mut pieces = String::new();
    if len > 1 {
        pieces.push('[');
    }
    for piece in values {
        let mut piece = piece.to_string();
        // sanitize value piece
        piece = piece
            .replace('\n', "␊")
            .replace('\r', "␍")
            .replace('\0', "␀")
            .replace(|c: char| c.is_control(), "�");

        if acc_size > 0 {
            pieces.push_str(", ");
        }

        if quoted {
            piece = piece.replace('\"', "\\\"");
            pieces.push('"');
        }

        acc_size += piece.len();
        pieces.push_str(&piece);
        if quoted {
            pieces.push('"');
        }
        // stop earlier if applicable
        if max_characters
            .filter(|max| (*max as usize) < acc_size)
            .is_some()
        {
            break;
        }
    }
    if len > 1 {
        pieces.push(']');
    }
    if let Some(max_characters) = max_characters {
        cut_str(&pieces, max_characters).into_owned()
    } else {
        pieces
    }
}

fn cut_str(s: &str, max_characters: u32) -> Cow<str> {
    let max = (max_characters.saturating_sub(3)) as usize;
    let len = s.chars().count();

    if len > max {
        s.chars()
            .take(max)
            .chain("...".chars())
            .collect::<String>()
            .into()
    } else {
        s.into()
    }
}

fn determine_width(user_width: Option<u32>) -> u32 {
    user_width
        .or_else(|| terminal_size::terminal_size().map(|(width, _)| width.0 as u32))
        .unwrap_or(120)
}

#[cfg(test)]
mod tests {
    use dicomkit_core::VR;
    use dicomkit_dictionary_std::{tags, uids};
    use dicomkit_object::{DataSetId, DicomFile, PixelSequence, Value};

    use super::{cut_str, format_value_list, whitespace_or_null};
    use crate::{ColorMode, DumpFormat, DumpOptions};

    #[test]
    fn trims_all_whitespace() {
        assert_eq!("   ".trim_end_matches(whitespace_or_null), "");
        assert_eq!("\0".trim_end_matches(whitespace_or_null), "");
        assert_eq!("1.4.5.6\0".trim_end_matches(whitespace_or_null), "1.4.5.6");
        assert_eq!("AETITLE ".trim_end_matches(whitespace_or_null), "AETITLE");
    }

    #[test]
    fn value_lists_are_cut() {
        assert_eq!(format_value_list([1, 2, 3], None, false), "[1, 2, 3]");
        assert_eq!(format_value_list(["A"], None, true), "\"A\"");
        assert_eq!(cut_str("0123456789", 8), "01234...");
        assert_eq!(cut_str("01234", 8), "01234");
    }

    fn sample_file() -> DicomFile {
        let mut file = DicomFile::new();
        let root = file.root_mut();
        root.add_dataelement(tags::MEDIA_STORAGE_SOP_CLASS_UID, VR::UI)
            .set_uid(uids::COMPUTED_RADIOGRAPHY_IMAGE_STORAGE)
            .unwrap();
        root.add_dataelement(tags::MEDIA_STORAGE_SOP_INSTANCE_UID, VR::UI)
            .set_uid("1.2.888.123")
            .unwrap();
        root.add_dataelement(tags::TRANSFER_SYNTAX_UID, VR::UI)
            .set_uid(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .unwrap();
        root.add_dataelement(tags::IMPLEMENTATION_CLASS_UID, VR::UI)
            .set_uid("1.2.3.4")
            .unwrap();
        root.add_dataelement(tags::SOP_INSTANCE_UID, VR::UI)
            .set_uid("1.2.888.123")
            .unwrap();
        root.add_dataelement(tags::STUDY_DATE, VR::DA)
            .set_string("20170101")
            .unwrap();
        root.add_dataelement(tags::CONTENT_DATE, VR::DA);
        root.add_dataelement(tags::MODALITY, VR::CS)
            .set_string("OT")
            .unwrap();
        root.add_dataelement(tags::INSTITUTION_ADDRESS, VR::ST)
            .set_string("Country Roads 1\nWest Virginia")
            .unwrap();
        root.add_dataelement(tags::SAMPLES_PER_PIXEL, VR::US)
            .set_long(3)
            .unwrap();
        file
    }

    fn dump_lines(options: &DumpOptions, file: &DicomFile) -> Vec<String> {
        let mut out = Vec::new();
        options.dump_file_to(&mut out, file).unwrap();
        std::str::from_utf8(&out)
            .expect("output is not valid UTF-8")
            .split('\n')
            .map(String::from)
            .collect()
    }

    fn check_line(line: &str, expected: (&str, &str, &str, &str)) {
        let parts: Vec<&str> = line.split(' ').filter(|p| !p.is_empty()).collect();
        let value = line.split_once(": ").unwrap().1.trim();
        assert_eq!(&parts[..3], &[expected.0, expected.1, expected.2]);
        assert_eq!(value, expected.3);
    }

    #[test]
    fn dump_file_to_covers_meta_and_elements() {
        let file = sample_file();
        let mut options = DumpOptions::new();
        options.color_mode(ColorMode::Never);
        let lines = dump_lines(&options, &file);

        assert_eq!(
            lines[0],
            "Media Storage SOP Class UID: 1.2.840.10008.5.1.4.1.1.1 (Computed Radiography Image Storage)"
        );
        assert_eq!(lines[1], "Media Storage SOP Instance UID: 1.2.888.123");
        assert_eq!(
            lines[2],
            "Transfer Syntax: 1.2.840.10008.1.2.1 (Explicit VR Little Endian)"
        );
        assert_eq!(lines[3], "Implementation Class UID: 1.2.3.4");
        assert_eq!(lines[4], "");
        assert_eq!(
            lines[5],
            "----------------------------------------------------------"
        );

        check_line(
            &lines[6],
            ("(0008,0018)", "SOPInstanceUID", "UI", "\"1.2.888.123\""),
        );
        check_line(&lines[7], ("(0008,0020)", "StudyDate", "DA", "20170101"));
        check_line(&lines[8], ("(0008,0023)", "ContentDate", "DA", "(no value)"));
        check_line(&lines[9], ("(0008,0060)", "Modality", "CS", "\"OT\""));
        check_line(
            &lines[10],
            (
                "(0008,0081)",
                "InstitutionAddress",
                "ST",
                "\"Country Roads 1␊West Virginia\"",
            ),
        );
        check_line(&lines[11], ("(0028,0002)", "SamplesPerPixel", "US", "3"));
    }

    #[test]
    fn sequences_and_pixel_fragments_are_listed() {
        let mut file = DicomFile::new();
        let item = file
            .add_item(DataSetId::ROOT, tags::REFERENCED_IMAGE_SEQUENCE)
            .unwrap();
        file.dataset_mut(item)
            .unwrap()
            .add_dataelement(tags::REFERENCED_SOP_INSTANCE_UID, VR::UI)
            .set_uid("1.2.3")
            .unwrap();
        let mut pixels = PixelSequence::default();
        pixels.push_frame(vec![0xFF, 0xD8, 0xFF, 0xD9]);
        pixels.push_frame(vec![0xFF, 0xD8, 0x00, 0xFF, 0xD9, 0x00]);
        file.root_mut().insert(dicomkit_object::DataElement::new(
            tags::PIXEL_DATA,
            VR::PX,
            Value::PixelSequence(pixels),
        ));

        let mut out = Vec::new();
        DumpOptions::new()
            .color_mode(ColorMode::Never)
            .dump_dataset_to(&mut out, &file, DataSetId::ROOT)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert!(lines[0].starts_with("(0008,1140) ReferencedImageSequence"));
        assert!(lines[0].ends_with("(1 Item)"));
        assert!(lines[1].contains("(FFFE,E000) na Item"));
        assert!(lines[2].contains("(0008,1155) ReferencedSOPInstanceUID"));
        assert!(lines[3].contains("(FFFE,E00D) ItemDelimitationItem"));
        assert!(lines[4].contains("(FFFE,E0DD) SequenceDelimitationItem"));
        assert!(lines[5].starts_with("(7FE0,0010) PixelData"));
        assert!(lines[5].ends_with("(PixelSequence, 3 Items, 2 Frames)"));
        assert!(lines[6].contains("offset table"));
        assert!(lines[7].ends_with("pi #0 (  4 bytes): [FF, D8, FF, D9]"));
        assert!(lines[8].contains("pi #1 (  6 bytes)"));
    }

    #[test]
    fn table_format_uses_tab_separated_columns() {
        let file = sample_file();
        let mut options = DumpOptions::new();
        options
            .color_mode(ColorMode::Never)
            .format(DumpFormat::Table);
        let lines = dump_lines(&options, &file);
        assert_eq!(lines[0], "TAG\tVR\tLEN\tVM\tVALUE\tKEYWORD");
        assert!(lines[1].starts_with("'00020002'\tUI\t"));
    }

    #[test]
    fn color_mode_from_str() {
        assert_eq!("never".parse::<ColorMode>().unwrap(), ColorMode::Never);
        assert_eq!("always".parse::<ColorMode>().unwrap(), ColorMode::Always);
        assert_eq!(ColorMode::Auto.to_string(), "auto");
        assert!("sometimes".parse::<ColorMode>().is_err());
    }
}
