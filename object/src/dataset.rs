//! Tag-ordered data sets.
//!
//! A [`DataSet`] maps tags to the elements it owns.
//! Nested items live in the arena of the owning
//! [`DicomFile`](crate::DicomFile) and are referred to by [`DataSetId`].
use crate::element::{DataElement, ElementLookup, Value};
use dicomkit_core::{Tag, VR};
use dicomkit_dictionary_std::tags;
use dicomkit_encoding::text::SpecificCharacterSet;
use dicomkit_encoding::Endianness;
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// The handle of a data set in the arena of a DICOM file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataSetId(pub(crate) usize);

impl DataSetId {
    /// The handle of the root data set.
    pub const ROOT: DataSetId = DataSetId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for DataSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether changing this element may change
/// the shape, type or content of the decoded pixel data.
pub fn is_pixel_affecting(tag: Tag) -> bool {
    matches!(
        tag,
        tags::SAMPLES_PER_PIXEL
            | tags::PHOTOMETRIC_INTERPRETATION
            | tags::PLANAR_CONFIGURATION
            | tags::NUMBER_OF_FRAMES
            | tags::ROWS
            | tags::COLUMNS
            | tags::BITS_ALLOCATED
            | tags::BITS_STORED
            | tags::HIGH_BIT
            | tags::PIXEL_REPRESENTATION
            | tags::RESCALE_INTERCEPT
            | tags::RESCALE_SLOPE
            | tags::RESCALE_TYPE
            | tags::MODALITY_LUT_SEQUENCE
            | tags::LUT_DESCRIPTOR
            | tags::MODALITY_LUT_TYPE
            | tags::LUT_DATA
            | tags::TRANSFER_SYNTAX_UID
            | tags::FLOAT_PIXEL_DATA
            | tags::DOUBLE_FLOAT_PIXEL_DATA
            | tags::PIXEL_DATA
    )
}

/// A DICOM data set: the root of a file or an item of a sequence.
///
/// Elements are unique per tag and iterate in ascending tag order.
/// All binary values share the data set's byte order,
/// except for the file meta group, which is always little endian.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    elements: BTreeMap<Tag, DataElement>,
    endianness: Endianness,
    explicit_vr: bool,
    charset: SpecificCharacterSet,
    charset_stale: bool,
    generation: u64,
    offset: u64,
    /// items of sequence elements replaced or removed from this data set
    released: Vec<DataSetId>,
}

impl DataSet {
    /// Create an empty data set.
    pub fn new(endianness: Endianness, explicit_vr: bool) -> Self {
        DataSet {
            elements: BTreeMap::new(),
            endianness,
            explicit_vr,
            charset: SpecificCharacterSet::Default,
            charset_stale: false,
            generation: 0,
            offset: 0,
            released: Vec::new(),
        }
    }

    /// Create an empty item inheriting this data set's encoding
    /// and character set.
    pub(crate) fn new_item(&self, offset: u64) -> Self {
        DataSet {
            charset: self.charset(),
            offset,
            ..DataSet::new(self.endianness, self.explicit_vr)
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate over the elements in ascending tag order.
    pub fn iter(&self) -> btree_map::Values<'_, Tag, DataElement> {
        self.elements.values()
    }

    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.elements.keys().copied()
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn is_little_endian(&self) -> bool {
        self.endianness == Endianness::Little
    }

    pub fn is_explicit_vr(&self) -> bool {
        self.explicit_vr
    }

    /// The absolute offset of the item in the source stream,
    /// zero for the root and for items created in memory.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The Specific Character Set in effect for text values.
    pub fn charset(&self) -> SpecificCharacterSet {
        if self.charset_stale {
            self.declared_charset().unwrap_or(self.charset)
        } else {
            self.charset
        }
    }

    /// A counter bumped whenever an element
    /// affecting the pixel data is touched.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn declared_charset(&self) -> Option<SpecificCharacterSet> {
        let element = self.elements.get(&tags::SPECIFIC_CHARACTER_SET)?;
        let value = std::str::from_utf8(element.value_bytes()?).ok()?;
        Some(SpecificCharacterSet::from_element_value(value))
    }

    /// Apply a modified Specific Character Set to every element.
    ///
    /// This happens on the next mutable access after the change,
    /// so calling it directly is only needed before reading text
    /// right after editing (0008,0005) in place.
    pub fn refresh_charset(&mut self) {
        if !self.charset_stale {
            return;
        }
        self.charset_stale = false;
        if let Some(charset) = self.declared_charset() {
            self.charset = charset;
        }
        let (endianness, charset) = (self.endianness, self.charset);
        for element in self.elements.values_mut() {
            element.attach(endianness_for(element.tag(), endianness), charset);
        }
    }

    pub(crate) fn set_encoding(&mut self, endianness: Endianness, explicit_vr: bool) {
        self.endianness = endianness;
        self.explicit_vr = explicit_vr;
        for element in self.elements.values_mut() {
            element.attach(endianness_for(element.tag(), endianness), self.charset);
        }
    }

    fn touch(&mut self, tag: Tag) {
        if is_pixel_affecting(tag) {
            self.generation += 1;
        }
        if tag == tags::SPECIFIC_CHARACTER_SET {
            self.charset_stale = true;
        }
    }

    /// Look up an element, yielding the missing sentinel if absent.
    pub fn get_dataelement(&self, tag: Tag) -> ElementLookup<'_> {
        self.elements.get(&tag).into()
    }

    pub fn get(&self, tag: Tag) -> Option<&DataElement> {
        self.elements.get(&tag)
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.elements.contains_key(&tag)
    }

    /// Mutable access to an element.
    pub fn get_mut(&mut self, tag: Tag) -> Option<&mut DataElement> {
        self.refresh_charset();
        if !self.elements.contains_key(&tag) {
            return None;
        }
        self.touch(tag);
        self.elements.get_mut(&tag)
    }

    /// Keep the items of a sequence leaving this data set,
    /// for the owning file to release.
    fn release(released: &mut Vec<DataSetId>, element: &DataElement) {
        if let Value::Sequence(items) = element.value() {
            released.extend_from_slice(items);
        }
    }

    /// Take the items of sequences which left this data set
    /// since the last call.
    pub(crate) fn take_released(&mut self) -> Vec<DataSetId> {
        std::mem::take(&mut self.released)
    }

    /// Mutable access to an element without counting it as a change.
    pub(crate) fn get_mut_untracked(&mut self, tag: Tag) -> Option<&mut DataElement> {
        self.elements.get_mut(&tag)
    }

    /// Insert an empty element with the given tag and VR,
    /// replacing any element with the same tag,
    /// and return it for assigning a value.
    ///
    /// The items of a replaced sequence are released
    /// by the owning [`DicomFile`](crate::DicomFile).
    pub fn add_dataelement(&mut self, tag: Tag, vr: VR) -> &mut DataElement {
        self.refresh_charset();
        let mut element = DataElement::new(tag, vr, Value::empty_for(vr));
        element.attach(endianness_for(tag, self.endianness), self.charset);
        self.touch(tag);
        match self.elements.entry(tag) {
            btree_map::Entry::Occupied(mut entry) => {
                let previous = entry.insert(element);
                Self::release(&mut self.released, &previous);
                entry.into_mut()
            }
            btree_map::Entry::Vacant(entry) => entry.insert(element),
        }
    }

    /// Insert an element, replacing and returning
    /// any element with the same tag.
    pub fn insert(&mut self, mut element: DataElement) -> Option<DataElement> {
        self.refresh_charset();
        let tag = element.tag();
        element.attach(endianness_for(tag, self.endianness), self.charset);
        self.touch(tag);
        let previous = self.elements.insert(tag, element);
        if let Some(previous) = &previous {
            Self::release(&mut self.released, previous);
        }
        self.refresh_charset();
        previous
    }

    /// Remove an element. Removing a missing element does nothing.
    pub fn remove_dataelement(&mut self, tag: Tag) -> Option<DataElement> {
        self.refresh_charset();
        let removed = self.elements.remove(&tag)?;
        Self::release(&mut self.released, &removed);
        self.touch(tag);
        self.refresh_charset();
        Some(removed)
    }
}

/// The file meta group is always little endian.
fn endianness_for(tag: Tag, endianness: Endianness) -> Endianness {
    if tag.group() == 0x0002 {
        Endianness::Little
    } else {
        endianness
    }
}

impl<'a> IntoIterator for &'a DataSet {
    type Item = &'a DataElement;
    type IntoIter = btree_map::Values<'a, Tag, DataElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elements_iterate_in_tag_order() {
        let mut set = DataSet::new(Endianness::Little, true);
        set.add_dataelement(tags::ROWS, VR::US).set_long(4).unwrap();
        set.add_dataelement(tags::PATIENT_NAME, VR::PN)
            .set_string("Doe^John")
            .unwrap();
        set.add_dataelement(tags::SOP_CLASS_UID, VR::UI)
            .set_uid("1.2.3")
            .unwrap();
        let order: Vec<Tag> = set.tags().collect();
        assert_eq!(
            order,
            vec![tags::SOP_CLASS_UID, tags::PATIENT_NAME, tags::ROWS]
        );
        assert_eq!(set.iter().count(), 3);
    }

    #[test]
    fn add_replaces_and_remove_is_idempotent() {
        let mut set = DataSet::new(Endianness::Little, true);
        set.add_dataelement(tags::ROWS, VR::US).set_long(4).unwrap();
        set.add_dataelement(tags::ROWS, VR::US).set_long(8).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get_dataelement(tags::ROWS).to_long(), Some(8));

        assert!(set.remove_dataelement(tags::ROWS).is_some());
        assert!(set.remove_dataelement(tags::ROWS).is_none());
        assert!(set.get_dataelement(tags::ROWS).is_missing());
        assert!(set.is_empty());
    }

    #[test]
    fn meta_group_stays_little_endian() {
        let mut set = DataSet::new(Endianness::Big, true);
        set.add_dataelement(tags::FILE_META_INFORMATION_GROUP_LENGTH, VR::UL)
            .set_long(10)
            .unwrap();
        set.add_dataelement(tags::ROWS, VR::US).set_long(1).unwrap();
        assert_eq!(
            set.get(tags::FILE_META_INFORMATION_GROUP_LENGTH)
                .and_then(DataElement::value_bytes),
            Some(&[10, 0, 0, 0][..])
        );
        assert_eq!(
            set.get(tags::ROWS).and_then(DataElement::value_bytes),
            Some(&[0, 1][..])
        );
    }

    #[test]
    fn pixel_affecting_changes_bump_the_generation() {
        let mut set = DataSet::new(Endianness::Little, true);
        set.add_dataelement(tags::PATIENT_NAME, VR::PN);
        let start = set.generation();
        set.add_dataelement(tags::ROWS, VR::US).set_long(2).unwrap();
        let after_rows = set.generation();
        assert!(after_rows > start);
        set.get_mut(tags::PATIENT_NAME)
            .unwrap()
            .set_string("x")
            .unwrap();
        assert_eq!(set.generation(), after_rows);
        set.get_mut(tags::ROWS).unwrap().set_long(3).unwrap();
        assert!(set.generation() > after_rows);
    }

    #[test]
    fn charset_follows_specific_character_set() {
        let mut set = DataSet::new(Endianness::Little, true);
        set.add_dataelement(tags::SPECIFIC_CHARACTER_SET, VR::CS)
            .set_string("ISO_IR 192")
            .unwrap();
        assert_eq!(set.charset(), SpecificCharacterSet::IsoIr192);
        set.add_dataelement(tags::PATIENT_NAME, VR::PN)
            .set_string("Müller")
            .unwrap();
        assert_eq!(
            set.get(tags::PATIENT_NAME).and_then(DataElement::value_bytes),
            Some("Müller".as_bytes())
        );
        assert_eq!(
            set.get_dataelement(tags::PATIENT_NAME).to_string().as_deref(),
            Some("Müller")
        );
    }
}
