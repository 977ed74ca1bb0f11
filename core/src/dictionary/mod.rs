//! This module contains the concept of a DICOM data dictionary.
//!
//! The data dictionary translates attribute keywords and tags
//! into a dictionary entry with the attribute's typical value representation.
//! The parser calls into it to resolve value representations
//! of implicit VR data sets,
//! and the object layer calls into it to resolve keywords in tag paths.
//!
//! Implementations are expected to be read-only, process-wide tables,
//! so that lookups are safe to perform concurrently.
//! The standard implementation lives in `dicomkit-dictionary-std`.

pub mod uid;

pub use self::uid::{UidDictionary, UidDictionaryEntry, UidDictionaryEntryRef, UidInfo, UidType};

use crate::header::{Tag, VR};
use std::fmt::Debug;

/// Type trait for a dictionary of DICOM attributes.
///
/// The methods herein have no generic parameters,
/// so as to enable being used as a trait object.
pub trait DataDictionary: Debug {
    /// The type of the dictionary entry.
    type Entry: DictionaryEntry;

    /// Fetch an entry by its usual alias (e.g. "PatientName" or "SOPInstanceUID").
    /// Aliases are case sensitive and not separated by spaces.
    fn by_name(&self, name: &str) -> Option<&Self::Entry>;

    /// Fetch an entry by its tag.
    fn by_tag(&self, tag: Tag) -> Option<&Self::Entry>;

    /// Resolve a tag to its keyword and typical value representation.
    fn resolve_tag(&self, tag: Tag) -> Option<(&str, VR)> {
        self.by_tag(tag).map(|e| (e.alias(), e.vr()))
    }

    /// Resolve a keyword to its tag and typical value representation.
    fn resolve_keyword(&self, keyword: &str) -> Option<(Tag, VR)> {
        self.by_name(keyword).map(|e| (e.tag(), e.vr()))
    }
}

impl<D: ?Sized + DataDictionary> DataDictionary for &D {
    type Entry = D::Entry;

    fn by_name(&self, name: &str) -> Option<&Self::Entry> {
        (**self).by_name(name)
    }

    fn by_tag(&self, tag: Tag) -> Option<&Self::Entry> {
        (**self).by_tag(tag)
    }
}

/// The dictionary entry data type, representing a DICOM attribute.
pub trait DictionaryEntry {
    /// The attribute tag.
    fn tag(&self) -> Tag;
    /// The alias of the attribute, with no spaces, usually in UpperCamelCase.
    fn alias(&self) -> &str;
    /// The _typical_ value representation of the attribute.
    fn vr(&self) -> VR;
}

/// A data type for a dictionary entry with a string slice for its alias.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DictionaryEntryRef<'a> {
    /// The attribute tag
    pub tag: Tag,
    /// The alias of the attribute, with no spaces, usually in UpperCamelCase
    pub alias: &'a str,
    /// The _typical_ value representation of the attribute
    pub vr: VR,
}

impl<'a> DictionaryEntry for DictionaryEntryRef<'a> {
    fn tag(&self) -> Tag {
        self.tag
    }
    fn alias(&self) -> &str {
        self.alias
    }
    fn vr(&self) -> VR {
        self.vr
    }
}

/// A dictionary which knows nothing.
///
/// Useful when reading implicit VR data
/// where every value should be kept as `UN`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct EmptyDictionary;

impl DataDictionary for EmptyDictionary {
    type Entry = DictionaryEntryRef<'static>;

    fn by_name(&self, _name: &str) -> Option<&Self::Entry> {
        None
    }

    fn by_tag(&self, _tag: Tag) -> Option<&Self::Entry> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct OneEntry(DictionaryEntryRef<'static>);

    impl DataDictionary for OneEntry {
        type Entry = DictionaryEntryRef<'static>;

        fn by_name(&self, name: &str) -> Option<&Self::Entry> {
            Some(&self.0).filter(|e| e.alias == name)
        }

        fn by_tag(&self, tag: Tag) -> Option<&Self::Entry> {
            Some(&self.0).filter(|e| e.tag == tag)
        }
    }

    #[test]
    fn resolve_both_ways() {
        let dict = OneEntry(DictionaryEntryRef {
            tag: Tag(0x0010, 0x0010),
            alias: "PatientName",
            vr: VR::PN,
        });
        assert_eq!(
            dict.resolve_keyword("PatientName"),
            Some((Tag(0x0010, 0x0010), VR::PN))
        );
        assert_eq!(
            dict.resolve_tag(Tag(0x0010, 0x0010)),
            Some(("PatientName", VR::PN))
        );
        assert_eq!(dict.resolve_tag(Tag(0x0010, 0x0020)), None);
        assert_eq!(EmptyDictionary.resolve_keyword("PatientName"), None);
    }
}
