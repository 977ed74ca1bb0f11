//! Element lookup by textual tag paths.
//!
//! A path is a dot-separated list of segments.
//! Each tag segment may be written as `(gggg,eeee)`, `gggg,eeee`,
//! `ggggeeee`, a standard keyword such as `PatientName`,
//! or a private tag `gggg,xxee,CREATOR`
//! resolved through the private creator elements of its group.
//! A tag segment naming a sequence may be followed
//! by the index of one of its items:
//!
//! ```text
//! ReferencedImageSequence.0.ReferencedSOPInstanceUID
//! (0008,1140).0.(0008,1155)
//! 0029,xx10,SIEMENS CSA HEADER
//! ```
use crate::dataset::{DataSet, DataSetId};
use crate::element::ElementLookup;
use crate::file::DicomFile;
use dicomkit_core::{DataDictionary, Tag};
use dicomkit_dictionary_std::StandardDataDictionary;
use snafu::{ensure, Backtrace, OptionExt, Snafu};

/// An error raised for a path which cannot be interpreted.
///
/// Paths which are well formed but lead nowhere
/// resolve to the missing element sentinel instead.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum PathError {
    #[snafu(display("Malformed private creator tag `{}`", segment))]
    MalformedPrivateTag {
        segment: String,
        backtrace: Backtrace,
    },
    #[snafu(display("Private creator tag `{}` requires an odd group", segment))]
    PrivateGroupNotOdd {
        segment: String,
        backtrace: Backtrace,
    },
    #[snafu(display("Element {} is not a sequence; cannot index into it", tag))]
    NotASequence { tag: Tag, backtrace: Backtrace },
    #[snafu(display("Malformed sequence index `{}` in tag path `{}`", index, path))]
    InvalidIndex {
        index: String,
        path: String,
        backtrace: Backtrace,
    },
}

type Result<T, E = PathError> = std::result::Result<T, E>;

fn strip_parens(text: &str) -> &str {
    text.strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(text)
}

/// Parse the leading hexadecimal digits of `text`, if any.
fn parse_hex_prefix(text: &str) -> Option<u32> {
    let end = text
        .find(|c: char| !c.is_ascii_hexdigit())
        .unwrap_or(text.len());
    u32::from_str_radix(text.get(..end)?.get(..end.min(8))?, 16).ok()
}

fn strip_quotes(text: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|q| text.strip_prefix(*q).and_then(|t| t.strip_suffix(*q)))
        .unwrap_or(text)
}

/// Resolve a private tag segment `gggg,xxee,CREATOR`
/// against the private creators of `set`.
///
/// Returns `Ok(None)` when the segment is not of that form
/// or no block is reserved by the creator.
fn resolve_private_tag(set: &DataSet, segment: &str) -> Result<Option<Tag>> {
    let mut parts = segment.splitn(3, ',');
    let (Some(group), Some(element), Some(creator)) = (parts.next(), parts.next(), parts.next())
    else {
        return Ok(None);
    };
    let (group, element, creator) = (group.trim(), element.trim(), creator.trim());
    let malformed = || MalformedPrivateTagSnafu { segment };
    ensure!(
        !group.is_empty() && !element.is_empty() && !creator.is_empty(),
        malformed()
    );
    let creator = strip_quotes(creator);

    let group = parse_hex_prefix(group)
        .and_then(|g| u16::try_from(g).ok())
        .context(malformed())?;
    ensure!(group & 1 == 1, PrivateGroupNotOddSnafu { segment });

    let element = element
        .strip_prefix("xx")
        .or_else(|| element.strip_prefix("XX"))
        .or_else(|| element.strip_prefix("xX"))
        .or_else(|| element.strip_prefix("Xx"))
        .unwrap_or(element);
    let element_low = parse_hex_prefix(element).context(malformed())? & 0xFF;

    let block = (0x10..=0xFF_u16).find(|block| {
        set.get_dataelement(Tag(group, *block))
            .to_string()
            .is_some_and(|value| value.trim() == creator)
    });
    Ok(block.map(|block| Tag(group, (block << 8) | element_low as u16)))
}

/// Interpret one tag segment of a path.
fn resolve_segment(set: &DataSet, segment: &str) -> Result<Option<Tag>> {
    if let Ok(tag) = segment.parse::<Tag>() {
        return Ok(Some(tag));
    }
    if let Some((tag, _)) = StandardDataDictionary.resolve_keyword(segment) {
        return Ok(Some(tag));
    }
    resolve_private_tag(set, segment)
}

impl DicomFile {
    /// Look up an element of the root data set by tag path.
    ///
    /// A missing element or item resolves to the missing sentinel;
    /// an error is only returned for a path which cannot be interpreted.
    pub fn get_dataelement_by_path(&self, path: &str) -> Result<ElementLookup<'_>> {
        self.get_dataelement_by_path_in(DataSetId::ROOT, path)
    }

    /// Look up an element by tag path, starting from the given data set.
    pub fn get_dataelement_by_path_in(
        &self,
        set: DataSetId,
        path: &str,
    ) -> Result<ElementLookup<'_>> {
        let Some(mut current) = self.dataset(set) else {
            return Ok(ElementLookup::Missing);
        };
        let mut segments = path.trim().split('.');
        while let Some(segment) = segments.next() {
            let segment = strip_parens(segment.trim());
            let Some(tag) = resolve_segment(current, segment)? else {
                return Ok(ElementLookup::Missing);
            };
            let Some(element) = current.get(tag) else {
                return Ok(ElementLookup::Missing);
            };
            let Some(index) = segments.next() else {
                return Ok(ElementLookup::Present(element));
            };
            ensure!(element.vr().is_sequence(), NotASequenceSnafu { tag });
            let index = index.trim();
            let index: usize = index
                .parse()
                .ok()
                .context(InvalidIndexSnafu { index, path })?;
            let item = element
                .sequence()
                .and_then(|items| items.get(index))
                .and_then(|id| self.dataset(*id));
            match item {
                Some(item) => current = item,
                None => return Ok(ElementLookup::Missing),
            }
        }
        // the path ended with an item index or a dot
        Ok(ElementLookup::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicomkit_core::VR;
    use dicomkit_dictionary_std::tags;

    fn sample() -> DicomFile {
        let mut file = DicomFile::new();
        let root = file.root_mut();
        root.add_dataelement(tags::PATIENT_NAME, VR::PN)
            .set_string("Doe^John")
            .unwrap();
        root.add_dataelement(Tag(0x0029, 0x0010), VR::LO)
            .set_string("SIEMENS CSA HEADER")
            .unwrap();
        root.add_dataelement(Tag(0x0029, 0x0011), VR::LO)
            .set_string("OTHER CREATOR")
            .unwrap();
        root.add_dataelement(Tag(0x0029, 0x1110), VR::OB)
            .set_bytes(vec![1, 2])
            .unwrap();
        root.add_dataelement(Tag(0x0029, 0x1010), VR::OB)
            .set_bytes(vec![3, 4])
            .unwrap();

        let item = file
            .add_item(DataSetId::ROOT, tags::REFERENCED_IMAGE_SEQUENCE)
            .unwrap();
        file.dataset_mut(item)
            .unwrap()
            .add_dataelement(tags::REFERENCED_SOP_INSTANCE_UID, VR::UI)
            .set_uid("1.2.3.4")
            .unwrap();
        file
    }

    #[test]
    fn tag_forms() {
        let file = sample();
        for path in ["PatientName", "(0010,0010)", "0010,0010", "00100010", " (0010,0010) "] {
            let element = file.get_dataelement_by_path(path).unwrap();
            assert_eq!(element.tag(), Some(tags::PATIENT_NAME), "{}", path);
            assert_eq!(element.vr(), VR::PN);
        }
        assert!(file.get_dataelement_by_path("PatientID").unwrap().is_missing());
        assert!(file.get_dataelement_by_path("NotAKeyword").unwrap().is_missing());
    }

    #[test]
    fn nested_paths() {
        let file = sample();
        for path in [
            "ReferencedImageSequence.0.ReferencedSOPInstanceUID",
            "(0008,1140).0.(0008,1155)",
            "00081140 . 0 . 00081155",
        ] {
            let element = file.get_dataelement_by_path(path).unwrap();
            assert_eq!(element.to_uid_string().as_deref(), Some("1.2.3.4"), "{}", path);
        }
        // out of range item
        assert!(file
            .get_dataelement_by_path("ReferencedImageSequence.1.ReferencedSOPInstanceUID")
            .unwrap()
            .is_missing());
        // ends on an item index
        assert!(file
            .get_dataelement_by_path("ReferencedImageSequence.0")
            .unwrap()
            .is_missing());
        assert!(file
            .get_dataelement_by_path("ReferencedImageSequence.0.PatientName")
            .unwrap()
            .is_missing());
    }

    #[test]
    fn malformed_paths() {
        let file = sample();
        assert!(matches!(
            file.get_dataelement_by_path("PatientName.0.PatientID"),
            Err(PathError::NotASequence { .. })
        ));
        assert!(matches!(
            file.get_dataelement_by_path("ReferencedImageSequence.x.PatientID"),
            Err(PathError::InvalidIndex { .. })
        ));
        assert!(matches!(
            file.get_dataelement_by_path("ReferencedImageSequence..PatientID"),
            Err(PathError::InvalidIndex { .. })
        ));
        assert!(matches!(
            file.get_dataelement_by_path("0028,xx10,CREATOR"),
            Err(PathError::PrivateGroupNotOdd { .. })
        ));
        assert!(matches!(
            file.get_dataelement_by_path("zz,xx10,CREATOR"),
            Err(PathError::MalformedPrivateTag { .. })
        ));
    }

    #[test]
    fn private_creator_paths() {
        let file = sample();
        let element = file
            .get_dataelement_by_path("0029,xx10,SIEMENS CSA HEADER")
            .unwrap();
        assert_eq!(element.tag(), Some(Tag(0x0029, 0x1010)));
        let element = file
            .get_dataelement_by_path("(0029,xx10,\"OTHER CREATOR\")")
            .unwrap();
        assert_eq!(element.tag(), Some(Tag(0x0029, 0x1110)));
        assert!(file
            .get_dataelement_by_path("0029,xx10,UNKNOWN")
            .unwrap()
            .is_missing());
    }
}
