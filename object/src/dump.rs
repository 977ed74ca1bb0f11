//! Tabular text rendering of a file's elements.
//!
//! One line per element, tab separated:
//! tag path, VR, length, VM, optionally the offset, the value and the keyword.
//! Items of sequences follow their sequence,
//! with paths of the form `00081140.0.00081155`.
//! Frames and fragments of pixel sequences are listed below them.
use crate::dataset::DataSet;
use crate::element::DataElement;
use crate::file::DicomFile;
use crate::pixel_sequence::PixelSequence;
use dicomkit_core::dictionary::UidDictionary;
use dicomkit_core::{DataDictionary, Tag, VR};
use dicomkit_dictionary_std::{StandardDataDictionary, StandardUidDictionary};
use itertools::Itertools;
use std::fmt::Write as _;

const BINARY_PREVIEW_BYTES: usize = 64;
const MIN_VALUE_CHARS: usize = 80;
const FRAGMENT_HEAD_BYTES: usize = 16;
const FRAGMENT_TAIL_BYTES: usize = 8;
const NO_VALUE: &str = "(no value)";

fn tag_token(tag: Tag) -> String {
    format!("{:04x}{:04x}", tag.group(), tag.element())
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            ' '..='~' => out.push(c),
            c if (c as u32) < 0x100 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

fn quote(text: &str) -> String {
    format!("'{}'", escape_text(text))
}

/// Fit the value within the characters left on the line.
fn truncate_value(value: String, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value;
    }
    let quoted = value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'');
    if quoted && max_chars >= 6 {
        let inner: String = value[1..].chars().take(max_chars - 5).collect();
        return format!("'{}...'", inner);
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }
    let kept: String = value.chars().take(max_chars - 3).collect();
    kept + "..."
}

fn join_values<T: std::fmt::Display>(values: &[T]) -> String {
    if values.is_empty() {
        NO_VALUE.to_string()
    } else {
        values.iter().join("\\")
    }
}

fn numeric_value(element: &DataElement) -> Option<String> {
    let multi = element.vm() > 1;
    match element.vr() {
        VR::SS | VR::US | VR::SL | VR::UL if multi => element.to_long_vector().map(|v| join_values(&v)),
        VR::SS | VR::US | VR::SL | VR::UL => element.to_long().map(|v| v.to_string()),
        VR::SV | VR::UV if multi => element.to_longlong_vector().map(|v| join_values(&v)),
        VR::SV | VR::UV => element.to_longlong().map(|v| v.to_string()),
        VR::FL | VR::FD if multi => element.to_double_vector().map(|v| join_values(&v)),
        VR::FL | VR::FD => element.to_double().map(|v| v.to_string()),
        _ => None,
    }
}

fn binary_preview(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return NO_VALUE.to_string();
    }
    let mut out = String::from("'");
    for b in bytes.iter().take(BINARY_PREVIEW_BYTES) {
        let _ = write!(out, "\\x{:02x}", b);
    }
    if bytes.len() > BINARY_PREVIEW_BYTES {
        out.push_str("...");
    }
    out.push('\'');
    out
}

fn fragment_preview(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "(empty)".to_string();
    }
    let hex = |bytes: &[u8]| bytes.iter().map(|b| format!("{:02x}", b)).join("\\");
    if bytes.len() <= FRAGMENT_HEAD_BYTES + FRAGMENT_TAIL_BYTES {
        return hex(bytes);
    }
    format!(
        "{}...{}",
        hex(&bytes[..FRAGMENT_HEAD_BYTES]),
        hex(&bytes[bytes.len() - FRAGMENT_TAIL_BYTES..])
    )
}

/// A one-line summary of an element's value.
pub fn value_summary(element: &DataElement) -> String {
    let vr = element.vr();
    if let Some(items) = element.sequence() {
        return format!("SEQUENCE WITH {} DATASET(s)", items.len());
    }
    if let Some(pixel_sequence) = element.pixel_sequence() {
        return format!(
            "PIXEL SEQUENCE WITH {} FRAME(S)",
            pixel_sequence.number_of_frames()
        );
    }
    match vr {
        VR::AT => {
            return element
                .to_tag_vector()
                .filter(|tags| !tags.is_empty())
                .map(|tags| quote(&tags.into_iter().map(tag_token).join("\\")))
                .unwrap_or_else(|| NO_VALUE.to_string());
        }
        VR::UI => {
            return match element.to_uid_string().filter(|uid| !uid.is_empty()) {
                Some(uid) => match StandardUidDictionary.resolve_uid(&uid) {
                    Some(info) => format!("{} = {}", quote(&uid), info.name),
                    None => quote(&uid),
                },
                None => NO_VALUE.to_string(),
            };
        }
        _ => {}
    }
    if let Some(numeric) = numeric_value(element) {
        return numeric;
    }
    if vr.is_string() {
        return element
            .to_strings()
            .map(|values| values.join("\\"))
            .filter(|joined| !joined.is_empty())
            .map(|joined| quote(&joined))
            .unwrap_or_else(|| NO_VALUE.to_string());
    }
    match element.value_bytes() {
        Some(bytes) if vr.is_binary() || vr == VR::UN => binary_preview(bytes),
        _ => NO_VALUE.to_string(),
    }
}

fn pixel_sequence_lines(out: &mut String, pixel_sequence: &PixelSequence) {
    for index in 0..pixel_sequence.number_of_frames() {
        let Some(frame) = pixel_sequence.frame(index) else {
            continue;
        };
        let fragments = frame.fragments();
        let begin = fragments.first().map_or(0, |f| f.offset);
        let end = fragments
            .last()
            .map_or(begin, |f| f.offset + 8 + f.data.len() as u64);
        let _ = writeln!(
            out,
            "\tFRAME #{} ({} BYTES) WITH {} FRAGMENTS {{0x{:x} - 0x{:x}}}",
            index + 1,
            frame.encoded_len(),
            fragments.len(),
            begin,
            end
        );
        for (i, fragment) in fragments.iter().enumerate() {
            let _ = writeln!(
                out,
                "\t\tFRAGMENT #{} {{0x{:x} - 0x{:x}}} len={} \"{}\"",
                i,
                fragment.offset,
                fragment.offset + 8 + fragment.data.len() as u64,
                fragment.data.len(),
                fragment_preview(&fragment.data)
            );
        }
    }
}

struct DumpContext<'a> {
    file: &'a DicomFile,
    max_print_chars: usize,
    include_offset: bool,
}

impl DumpContext<'_> {
    fn dataset_lines(&self, out: &mut String, set: &DataSet, prefix: &str) {
        for element in set {
            let tag = element.tag();
            let path = if prefix.is_empty() {
                tag_token(tag)
            } else {
                format!("{}.{}", prefix, tag_token(tag))
            };
            let keyword = StandardDataDictionary
                .resolve_tag(tag)
                .map(|(keyword, _)| keyword.to_string())
                .unwrap_or_else(|| "-".to_string());
            let length = if element.length().is_undefined() {
                "-1".to_string()
            } else {
                element.length().0.to_string()
            };
            let head = if self.include_offset {
                format!(
                    "'{}'\t{}\t{}\t{}\t0x{:x}\t",
                    path,
                    element.vr(),
                    length,
                    element.vm(),
                    element.offset()
                )
            } else {
                format!("'{}'\t{}\t{}\t{}\t", path, element.vr(), length, element.vm())
            };
            let tail = format!("\t# {}\n", keyword);

            let mut value = value_summary(element);
            if self.max_print_chars > 0 {
                let budget = self
                    .max_print_chars
                    .max(head.len() + tail.len() + MIN_VALUE_CHARS)
                    - head.len()
                    - tail.len();
                value = truncate_value(value, budget);
            }
            out.push_str(&head);
            let _ = write!(out, "{:<width$}", value, width = MIN_VALUE_CHARS);
            out.push_str(&tail);

            if let Some(items) = element.sequence() {
                for (index, id) in items.iter().enumerate() {
                    if let Some(item) = self.file.dataset(*id) {
                        self.dataset_lines(out, item, &format!("{}.{}", path, index));
                    }
                }
            } else if let Some(pixel_sequence) = element.pixel_sequence() {
                pixel_sequence_lines(out, pixel_sequence);
            }
        }
    }
}

impl DicomFile {
    /// Render every element of the file as tab separated text,
    /// items and pixel fragments included.
    ///
    /// Lines are cut to `max_print_chars` (0 for no limit),
    /// although each value keeps room for at least 80 characters.
    pub fn dump(&self, max_print_chars: usize, include_offset: bool) -> String {
        let mut out = String::from(if include_offset {
            "TAG\tVR\tLEN\tVM\tOFFSET\tVALUE\tKEYWORD\n"
        } else {
            "TAG\tVR\tLEN\tVM\tVALUE\tKEYWORD\n"
        });
        let context = DumpContext {
            file: self,
            max_print_chars,
            include_offset,
        };
        context.dataset_lines(&mut out, self.root(), "");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DataSetId;
    use dicomkit_dictionary_std::{tags, uids};

    #[test]
    fn dump_lists_nested_elements() {
        let mut file = DicomFile::new();
        let root = file.root_mut();
        root.add_dataelement(tags::SOP_CLASS_UID, VR::UI)
            .set_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
            .unwrap();
        root.add_dataelement(tags::IMAGE_TYPE, VR::CS)
            .set_strings(&["ORIGINAL", "PRIMARY"])
            .unwrap();
        root.add_dataelement(tags::ROWS, VR::US).set_long(512).unwrap();
        let item = file
            .add_item(DataSetId::ROOT, tags::REFERENCED_IMAGE_SEQUENCE)
            .unwrap();
        file.dataset_mut(item)
            .unwrap()
            .add_dataelement(tags::REFERENCED_SOP_INSTANCE_UID, VR::UI)
            .set_uid("1.2.3")
            .unwrap();

        let dump = file.dump(0, false);
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines[0], "TAG\tVR\tLEN\tVM\tVALUE\tKEYWORD");
        assert!(lines[1].starts_with("'00080008'\tCS\t16\t2\t'ORIGINAL\\\\PRIMARY'"));
        assert!(lines[2].starts_with("'00080016'\tUI\t26\t1\t'1.2.840.10008.5.1.4.1.1.7'"));
        assert!(lines[3].contains("SEQUENCE WITH 1 DATASET(s)"));
        assert!(lines[3].ends_with("# ReferencedImageSequence"));
        assert!(lines[4].starts_with("'00081140.0.00081155'\tUI"));
        assert!(lines[5].starts_with("'00280010'\tUS\t2\t1\t512"));
    }

    #[test]
    fn long_values_are_truncated() {
        assert_eq!(truncate_value("'abcdefghij'".to_string(), 8), "'abc...'");
        assert_eq!(truncate_value("0123456789".to_string(), 6), "012...");
        assert_eq!(truncate_value("short".to_string(), 6), "short");
        assert_eq!(fragment_preview(&[]), "(empty)");
        assert_eq!(fragment_preview(&[0xff, 0xd8]), "ff\\d8");
    }
}
