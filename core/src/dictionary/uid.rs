//! Core UID dictionary types

/// Type trait for a dictionary of known DICOM unique identifiers (UIDs).
///
/// UID dictionaries provide the means to
/// look up information at run-time about a certain UID.
pub trait UidDictionary {
    /// The type of the dictionary entry.
    type Entry: UidDictionaryEntry;

    /// Fetch an entry by its usual keyword (e.g. CTImageStorage).
    /// Keywords are in UpperCamelCase, not separated by spaces,
    /// and are case sensitive.
    fn by_keyword(&self, keyword: &str) -> Option<&Self::Entry>;

    /// Fetch an entry by its UID.
    fn by_uid(&self, uid: &str) -> Option<&Self::Entry>;

    /// Resolve the given UID text into a summary of what it identifies.
    /// Trailing null or space padding is ignored.
    fn resolve_uid(&self, uid: &str) -> Option<UidInfo> {
        let uid = uid.trim_end_matches(|c| c == '\0' || c == ' ');
        self.by_uid(uid).map(|e| UidInfo {
            uid: e.uid().to_string(),
            keyword: e.alias().to_string(),
            name: e.name().to_string(),
            r#type: e.uid_type(),
            retired: e.is_retired(),
        })
    }
}

/// UID dictionary entry type
pub trait UidDictionaryEntry {
    /// Get the UID proper.
    fn uid(&self) -> &str;

    /// Get the full name of the identifier.
    fn name(&self) -> &str;

    /// The alias of the UID, with no spaces, usually in UpperCamelCase.
    fn alias(&self) -> &str;

    /// The kind of object identified.
    fn uid_type(&self) -> UidType;

    /// Get whether the UID is retired.
    fn is_retired(&self) -> bool;
}

/// A data type for a dictionary entry using string slices
/// for its data.
#[derive(Debug, PartialEq, Clone)]
pub struct UidDictionaryEntryRef<'a> {
    /// The UID proper
    pub uid: &'a str,
    /// The full name of the identifier,
    /// which may contain spaces
    pub name: &'a str,
    /// The alias of the identifier,
    /// with no spaces, usually in UpperCamelCase
    pub alias: &'a str,
    /// The type of UID
    pub r#type: UidType,
    /// Whether this UID is retired
    pub retired: bool,
}

impl<'a> UidDictionaryEntryRef<'a> {
    /// Create a new entry.
    pub const fn new(
        uid: &'a str,
        name: &'a str,
        alias: &'a str,
        r#type: UidType,
        retired: bool,
    ) -> Self {
        UidDictionaryEntryRef {
            uid,
            name,
            alias,
            r#type,
            retired,
        }
    }
}

impl<'a> UidDictionaryEntry for UidDictionaryEntryRef<'a> {
    fn uid(&self) -> &str {
        self.uid
    }

    fn name(&self) -> &str {
        self.name
    }

    fn alias(&self) -> &str {
        self.alias
    }

    fn uid_type(&self) -> UidType {
        self.r#type
    }

    fn is_retired(&self) -> bool {
        self.retired
    }
}

/// Owned summary of a resolved UID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidInfo {
    /// The UID proper
    pub uid: String,
    /// The keyword, e.g. `ExplicitVRLittleEndian`
    pub keyword: String,
    /// The full name
    pub name: String,
    /// The kind of UID
    pub r#type: UidType,
    /// Whether the UID is retired
    pub retired: bool,
}

/// Enum for the UID types recognized by the standard.
#[non_exhaustive]
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub enum UidType {
    /// SOP Class
    SopClass,
    /// Meta SOP Class
    MetaSopClass,
    /// Transfer Syntax
    TransferSyntax,
    /// Well-known SOP Instance
    WellKnownSopInstance,
    /// Coding Scheme
    CodingScheme,
    /// Application Context Name
    ApplicationContextName,
    /// Service Class
    ServiceClass,
}
