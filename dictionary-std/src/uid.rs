//! UID dictionary implementation

use std::collections::HashMap;

use dicomkit_core::dictionary::{UidDictionary, UidDictionaryEntryRef};
use once_cell::sync::Lazy;

use crate::uids::ENTRIES;

static DICT: Lazy<StandardUidRegistry> = Lazy::new(init_dictionary);

/// Retrieve a singleton instance of the standard UID registry.
#[inline]
pub fn registry() -> &'static StandardUidRegistry {
    &DICT
}

/// The data struct actually containing the standard UID dictionary.
///
/// This structure is made opaque via the unit type [`StandardUidDictionary`],
/// which provides a lazy loaded singleton.
#[derive(Debug)]
pub struct StandardUidRegistry {
    /// mapping: keyword → entry
    by_keyword: HashMap<&'static str, &'static UidDictionaryEntryRef<'static>>,
    /// mapping: uid → entry
    by_uid: HashMap<&'static str, &'static UidDictionaryEntryRef<'static>>,
}

impl StandardUidRegistry {
    fn new() -> StandardUidRegistry {
        StandardUidRegistry {
            by_keyword: HashMap::new(),
            by_uid: HashMap::new(),
        }
    }

    /// record all of the given dictionary entries
    fn index_all(&mut self, entries: &'static [UidDictionaryEntryRef<'static>]) -> &mut Self {
        let entries_by_keyword = entries.iter().map(|e| (e.alias, e));
        self.by_keyword.extend(entries_by_keyword);

        let entries_by_uid = entries.iter().map(|e| (e.uid, e));
        self.by_uid.extend(entries_by_uid);

        self
    }
}

impl UidDictionary for StandardUidRegistry {
    type Entry = UidDictionaryEntryRef<'static>;

    #[inline]
    fn by_keyword(&self, keyword: &str) -> Option<&Self::Entry> {
        self.by_keyword.get(keyword).copied()
    }

    #[inline]
    fn by_uid(&self, uid: &str) -> Option<&Self::Entry> {
        self.by_uid.get(uid).copied()
    }
}

/// A UID dictionary which consults
/// the library's global registry of transfer syntaxes and SOP classes.
///
/// The dictionary index is automatically initialized upon the first use.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct StandardUidDictionary;

impl UidDictionary for StandardUidDictionary {
    type Entry = UidDictionaryEntryRef<'static>;

    #[inline]
    fn by_keyword(&self, keyword: &str) -> Option<&Self::Entry> {
        DICT.by_keyword(keyword)
    }

    #[inline]
    fn by_uid(&self, uid: &str) -> Option<&Self::Entry> {
        DICT.by_uid(uid)
    }
}

fn init_dictionary() -> StandardUidRegistry {
    let mut d = StandardUidRegistry::new();
    d.index_all(ENTRIES);
    d
}

#[cfg(test)]
mod tests {
    use crate::StandardUidDictionary;
    use dicomkit_core::dictionary::{UidDictionary, UidDictionaryEntryRef, UidType};

    #[test]
    fn can_fetch_uids() {
        let dict = StandardUidDictionary;

        assert_eq!(
            dict.by_uid("1.2.840.10008.5.1.4.1.1.2"),
            Some(&UidDictionaryEntryRef::new(
                "1.2.840.10008.5.1.4.1.1.2",
                "CT Image Storage",
                "CTImageStorage",
                UidType::SopClass,
                false,
            )),
        );

        let entry = dict.by_keyword("ExplicitVRLittleEndian").unwrap();
        assert_eq!(entry.uid, "1.2.840.10008.1.2.1");
        assert_eq!(entry.r#type, UidType::TransferSyntax);
    }

    #[test]
    fn resolve_uid_ignores_padding() {
        let info = StandardUidDictionary
            .resolve_uid("1.2.840.10008.1.2.2\0")
            .unwrap();
        assert_eq!(info.keyword, "ExplicitVRBigEndian");
        assert!(info.retired);
        assert_eq!(StandardUidDictionary.resolve_uid("1.2.3.4"), None);
    }
}
