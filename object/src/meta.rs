//! File meta information tables: extraction, rebuild and writing.
use crate::dataset::DataSet;
use crate::file::DicomFile;
use crate::uid::generate_uid;
use crate::{IMPLEMENTATION_CLASS_UID, IMPLEMENTATION_VERSION_NAME};
use dicomkit_core::{Tag, VR};
use dicomkit_dictionary_std::{tags, uids};
use dicomkit_parser::stateful::encode;
use dicomkit_parser::StatefulEncoder;
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::io::Write;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// A required file meta data element is missing.
    #[snafu(display("Missing data element `{}`", alias))]
    MissingElement {
        alias: &'static str,
        backtrace: Backtrace,
    },

    /// Sequences and pixel sequences cannot appear in the file meta group.
    #[snafu(display("Data element {} with VR {} is not allowed in the file meta group", tag, vr))]
    InvalidElement {
        tag: Tag,
        vr: VR,
        backtrace: Backtrace,
    },

    #[snafu(display("File meta group of more than 4 GiB"))]
    GroupTooLong { backtrace: Backtrace },

    /// The file meta group data set could not be written.
    #[snafu(display("Could not write file meta element {}", tag))]
    WriteElement {
        tag: Tag,
        #[snafu(backtrace)]
        source: encode::Error,
    },
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// DICOM File Meta Information Table.
///
/// This data type contains the relevant parts of the file meta information table, as
/// specified in [1].
///
/// [1]: http://dicom.nema.org/medical/dicom/current/output/chtml/part06/chapter_7.html
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetaTable {
    /// File Meta Information Group Length
    pub information_group_length: u32,
    /// File Meta Information Version
    pub information_version: [u8; 2],
    /// Media Storage SOP Class UID
    pub media_storage_sop_class_uid: String,
    /// Media Storage SOP Instance UID
    pub media_storage_sop_instance_uid: String,
    /// Transfer Syntax UID
    pub transfer_syntax: String,
    /// Implementation Class UID
    pub implementation_class_uid: String,

    /// Implementation Version Name
    pub implementation_version_name: Option<String>,
    /// Source Application Entity Title
    pub source_application_entity_title: Option<String>,
    /// Private Information Creator UID
    pub private_information_creator_uid: Option<String>,
    /// Private Information
    pub private_information: Option<Vec<u8>>,
}

fn trim_uid(uid: &str) -> &str {
    uid.trim_end_matches(|c: char| c == '\0' || c == ' ')
}

/// The encoded size of an explicit VR little endian element.
fn element_size(vr: VR, len: usize) -> usize {
    let header = if vr.has_explicit_32bit_length() { 12 } else { 8 };
    header + len + (len & 1)
}

impl FileMetaTable {
    /// Collect the table from the group 0002 elements of a data set.
    pub fn from_dataset(set: &DataSet) -> Result<Self> {
        let uid = |tag| set.get_dataelement(tag).to_uid_string();
        let text = |tag| set.get_dataelement(tag).to_string();

        let mut builder = FileMetaTableBuilder::new();
        if let Some(version) = set
            .get_dataelement(tags::FILE_META_INFORMATION_VERSION)
            .value_bytes()
            .and_then(|v| <[u8; 2]>::try_from(v).ok())
        {
            builder = builder.information_version(version);
        }
        if let Some(v) = uid(tags::MEDIA_STORAGE_SOP_CLASS_UID) {
            builder = builder.media_storage_sop_class_uid(v);
        }
        if let Some(v) = uid(tags::MEDIA_STORAGE_SOP_INSTANCE_UID) {
            builder = builder.media_storage_sop_instance_uid(v);
        }
        if let Some(v) = uid(tags::TRANSFER_SYNTAX_UID) {
            builder = builder.transfer_syntax(v);
        }
        if let Some(v) = uid(tags::IMPLEMENTATION_CLASS_UID) {
            builder = builder.implementation_class_uid(v);
        }
        if let Some(v) = text(tags::IMPLEMENTATION_VERSION_NAME) {
            builder = builder.implementation_version_name(v);
        }
        if let Some(v) = text(tags::SOURCE_APPLICATION_ENTITY_TITLE) {
            builder = builder.source_application_entity_title(v);
        }
        if let Some(v) = uid(tags::PRIVATE_INFORMATION_CREATOR_UID) {
            builder = builder.private_information_creator_uid(v);
        }
        if let Some(v) = set
            .get_dataelement(tags::PRIVATE_INFORMATION)
            .value_bytes()
        {
            builder = builder.private_information(v);
        }
        builder.build()
    }

    /// Derive a fresh table for writing the given file
    /// in the given transfer syntax.
    ///
    /// The SOP class and instance come from the main data set,
    /// falling back to the existing meta group,
    /// then to Secondary Capture and a newly generated UID.
    pub fn rebuild(file: &DicomFile, transfer_syntax: &str) -> Result<Self> {
        let root = file.root();
        let uid = |tag| {
            root.get_dataelement(tag)
                .to_uid_string()
                .filter(|uid| !uid.is_empty())
        };
        let sop_class = uid(tags::SOP_CLASS_UID)
            .or_else(|| uid(tags::MEDIA_STORAGE_SOP_CLASS_UID))
            .unwrap_or_else(|| uids::SECONDARY_CAPTURE_IMAGE_STORAGE.to_string());
        let sop_instance = uid(tags::SOP_INSTANCE_UID)
            .or_else(|| uid(tags::MEDIA_STORAGE_SOP_INSTANCE_UID))
            .unwrap_or_else(generate_uid);

        let mut builder = FileMetaTableBuilder::new()
            .information_version([0, 1])
            .media_storage_sop_class_uid(sop_class)
            .media_storage_sop_instance_uid(sop_instance)
            .transfer_syntax(transfer_syntax)
            .implementation_class_uid(IMPLEMENTATION_CLASS_UID)
            .implementation_version_name(IMPLEMENTATION_VERSION_NAME);
        if let Some(title) = root
            .get_dataelement(tags::SOURCE_APPLICATION_ENTITY_TITLE)
            .to_string()
        {
            builder = builder.source_application_entity_title(title);
        }
        builder.build()
    }

    /// The media storage SOP class UID without padding.
    pub fn media_storage_sop_class_uid(&self) -> &str {
        trim_uid(&self.media_storage_sop_class_uid)
    }

    /// The media storage SOP instance UID without padding.
    pub fn media_storage_sop_instance_uid(&self) -> &str {
        trim_uid(&self.media_storage_sop_instance_uid)
    }

    /// The transfer syntax UID without padding.
    pub fn transfer_syntax(&self) -> &str {
        trim_uid(&self.transfer_syntax)
    }

    fn elements(&self) -> Vec<(Tag, VR, &[u8])> {
        let mut elems: Vec<(Tag, VR, &[u8])> = vec![
            (
                tags::FILE_META_INFORMATION_VERSION,
                VR::OB,
                &self.information_version[..],
            ),
            (
                tags::MEDIA_STORAGE_SOP_CLASS_UID,
                VR::UI,
                self.media_storage_sop_class_uid.as_bytes(),
            ),
            (
                tags::MEDIA_STORAGE_SOP_INSTANCE_UID,
                VR::UI,
                self.media_storage_sop_instance_uid.as_bytes(),
            ),
            (
                tags::TRANSFER_SYNTAX_UID,
                VR::UI,
                self.transfer_syntax.as_bytes(),
            ),
            (
                tags::IMPLEMENTATION_CLASS_UID,
                VR::UI,
                self.implementation_class_uid.as_bytes(),
            ),
        ];
        if let Some(v) = &self.implementation_version_name {
            elems.push((tags::IMPLEMENTATION_VERSION_NAME, VR::SH, v.as_bytes()));
        }
        if let Some(v) = &self.source_application_entity_title {
            elems.push((tags::SOURCE_APPLICATION_ENTITY_TITLE, VR::AE, v.as_bytes()));
        }
        if let Some(v) = &self.private_information_creator_uid {
            elems.push((tags::PRIVATE_INFORMATION_CREATOR_UID, VR::UI, v.as_bytes()));
        }
        if let Some(v) = &self.private_information {
            elems.push((tags::PRIVATE_INFORMATION, VR::OB, v.as_slice()));
        }
        elems
    }

    /// Write the table as an explicit VR little endian group,
    /// led by a group length measured from its elements.
    pub fn write<W: Write>(&self, to: W) -> Result<W> {
        write_group(to, self.elements())
    }
}

/// Write file meta elements with a recomputed group length.
///
/// Any group length element among `elements` is ignored.
pub(crate) fn write_group<'a, W, I>(to: W, elements: I) -> Result<W>
where
    W: Write,
    I: IntoIterator<Item = (Tag, VR, &'a [u8])>,
{
    let elements: Vec<_> = elements
        .into_iter()
        .filter(|(tag, _, _)| *tag != tags::FILE_META_INFORMATION_GROUP_LENGTH)
        .collect();

    let mut group_length: usize = 0;
    for (tag, vr, value) in &elements {
        ensure!(
            !vr.is_sequence() && !vr.is_pixel_sequence(),
            InvalidElementSnafu { tag: *tag, vr: *vr }
        );
        group_length += element_size(*vr, value.len());
    }
    let group_length = u32::try_from(group_length)
        .ok()
        .context(GroupTooLongSnafu)?;

    let mut encoder = StatefulEncoder::file_header_encoder(to);
    encoder
        .write_element(
            tags::FILE_META_INFORMATION_GROUP_LENGTH,
            VR::UL,
            &group_length.to_le_bytes(),
        )
        .context(WriteElementSnafu {
            tag: tags::FILE_META_INFORMATION_GROUP_LENGTH,
        })?;
    for (tag, vr, value) in elements {
        encoder
            .write_element(tag, vr, value)
            .context(WriteElementSnafu { tag })?;
    }
    Ok(encoder.into_inner())
}

/// A builder for DICOM meta information tables.
#[derive(Debug, Default, Clone)]
pub struct FileMetaTableBuilder {
    /// File Meta Information Version (OB)
    information_version: Option<[u8; 2]>,
    /// Media Storage SOP Class UID (UI)
    media_storage_sop_class_uid: Option<String>,
    /// Media Storage SOP Instance UID (UI)
    media_storage_sop_instance_uid: Option<String>,
    /// Transfer Syntax UID (UI)
    transfer_syntax: Option<String>,
    /// Implementation Class UID (UI)
    implementation_class_uid: Option<String>,

    /// Implementation Version Name (SH)
    implementation_version_name: Option<String>,
    /// Source Application Entity Title (AE)
    source_application_entity_title: Option<String>,
    /// Private Information Creator UID (UI)
    private_information_creator_uid: Option<String>,
    /// Private Information (OB)
    private_information: Option<Vec<u8>>,
}

/// Ensure that the string is even lengthed, by adding a trailing character
/// if not.
#[inline]
fn padded<T>(s: T, pad: char) -> String
where
    T: Into<String>,
{
    let mut s = s.into();
    if s.len() % 2 == 1 {
        s.push(pad);
    }
    s
}

/// Ensure that the string is even lengthed with trailing '\0's.
fn ui_padded<T>(s: T) -> String
where
    T: Into<String>,
{
    padded(s, '\0')
}

/// Ensure that the string is even lengthed with trailing spaces.
fn txt_padded<T>(s: T) -> String
where
    T: Into<String>,
{
    padded(s, ' ')
}

impl FileMetaTableBuilder {
    /// Create a new, empty builder.
    pub fn new() -> FileMetaTableBuilder {
        FileMetaTableBuilder::default()
    }

    /// Define the meta information version.
    pub fn information_version(mut self, value: [u8; 2]) -> FileMetaTableBuilder {
        self.information_version = Some(value);
        self
    }

    /// Define the media storage SOP class UID.
    pub fn media_storage_sop_class_uid<T>(mut self, value: T) -> FileMetaTableBuilder
    where
        T: Into<String>,
    {
        self.media_storage_sop_class_uid = Some(ui_padded(value));
        self
    }

    /// Define the media storage SOP instance UID.
    pub fn media_storage_sop_instance_uid<T>(mut self, value: T) -> FileMetaTableBuilder
    where
        T: Into<String>,
    {
        self.media_storage_sop_instance_uid = Some(ui_padded(value));
        self
    }

    /// Define the transfer syntax UID.
    pub fn transfer_syntax<T>(mut self, value: T) -> FileMetaTableBuilder
    where
        T: Into<String>,
    {
        self.transfer_syntax = Some(ui_padded(value));
        self
    }

    /// Define the implementation class UID.
    pub fn implementation_class_uid<T>(mut self, value: T) -> FileMetaTableBuilder
    where
        T: Into<String>,
    {
        self.implementation_class_uid = Some(ui_padded(value));
        self
    }

    /// Define the implementation version name.
    pub fn implementation_version_name<T>(mut self, value: T) -> FileMetaTableBuilder
    where
        T: Into<String>,
    {
        self.implementation_version_name = Some(txt_padded(value));
        self
    }

    /// Define the source application entity title.
    pub fn source_application_entity_title<T>(mut self, value: T) -> FileMetaTableBuilder
    where
        T: Into<String>,
    {
        self.source_application_entity_title = Some(txt_padded(value));
        self
    }

    /// Define the private information creator UID.
    pub fn private_information_creator_uid<T>(mut self, value: T) -> FileMetaTableBuilder
    where
        T: Into<String>,
    {
        self.private_information_creator_uid = Some(ui_padded(value));
        self
    }

    /// Define the private information as a vector of bytes.
    pub fn private_information<T>(mut self, value: T) -> FileMetaTableBuilder
    where
        T: Into<Vec<u8>>,
    {
        self.private_information = Some(value.into());
        self
    }

    /// Build the table.
    pub fn build(self) -> Result<FileMetaTable> {
        // a missing information version is assumed to be (00H, 01H)
        let information_version = self.information_version.unwrap_or([0, 1]);
        let media_storage_sop_class_uid =
            self.media_storage_sop_class_uid
                .context(MissingElementSnafu {
                    alias: "MediaStorageSOPClassUID",
                })?;
        let media_storage_sop_instance_uid =
            self.media_storage_sop_instance_uid
                .context(MissingElementSnafu {
                    alias: "MediaStorageSOPInstanceUID",
                })?;
        let transfer_syntax = self.transfer_syntax.context(MissingElementSnafu {
            alias: "TransferSyntax",
        })?;
        let implementation_class_uid =
            self.implementation_class_uid
                .context(MissingElementSnafu {
                    alias: "ImplementationClassUID",
                })?;

        let mut table = FileMetaTable {
            information_group_length: 0,
            information_version,
            media_storage_sop_class_uid,
            media_storage_sop_instance_uid,
            transfer_syntax,
            implementation_class_uid,
            implementation_version_name: self.implementation_version_name,
            source_application_entity_title: self.source_application_entity_title,
            private_information_creator_uid: self.private_information_creator_uid,
            private_information: self.private_information,
        };
        let group_length: usize = table
            .elements()
            .iter()
            .map(|(_, vr, value)| element_size(*vr, value.len()))
            .sum();
        table.information_group_length = u32::try_from(group_length)
            .ok()
            .context(GroupTooLongSnafu)?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicomkit_encoding::Endianness;

    #[test]
    fn builder_requires_uids() {
        let result = FileMetaTableBuilder::new()
            .media_storage_sop_instance_uid("1.2.3")
            .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .implementation_class_uid(IMPLEMENTATION_CLASS_UID)
            .build();
        assert!(matches!(
            result,
            Err(Error::MissingElement {
                alias: "MediaStorageSOPClassUID",
                ..
            })
        ));
    }

    #[test]
    fn table_is_written_with_measured_group_length() {
        let table = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid("1.2.3")
            .media_storage_sop_instance_uid("1.2.3.4")
            .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .implementation_class_uid("1.2")
            .build()
            .unwrap();
        // version 14, then 8 + padded UID for each of the four UIDs
        assert_eq!(table.information_group_length, 14 + (8 + 6) + (8 + 8) + (8 + 20) + (8 + 4));
        assert_eq!(table.media_storage_sop_class_uid(), "1.2.3");

        let bytes = table.write(Vec::new()).unwrap();
        assert_eq!(bytes.len() as u32, 12 + table.information_group_length);
        #[rustfmt::skip]
        let head: &[u8] = &[
            // (0002,0000) UL, length 4
            0x02, 0x00, 0x00, 0x00, b'U', b'L', 0x04, 0x00,
        ];
        assert_eq!(&bytes[..8], head);
        assert_eq!(
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            table.information_group_length
        );
    }

    #[test]
    fn table_round_trips_through_a_data_set() {
        let mut set = DataSet::new(Endianness::Little, true);
        set.add_dataelement(tags::MEDIA_STORAGE_SOP_CLASS_UID, VR::UI)
            .set_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
            .unwrap();
        set.add_dataelement(tags::MEDIA_STORAGE_SOP_INSTANCE_UID, VR::UI)
            .set_uid("1.2.3.4.5")
            .unwrap();
        set.add_dataelement(tags::TRANSFER_SYNTAX_UID, VR::UI)
            .set_uid(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .unwrap();
        set.add_dataelement(tags::IMPLEMENTATION_CLASS_UID, VR::UI)
            .set_uid(IMPLEMENTATION_CLASS_UID)
            .unwrap();
        let table = FileMetaTable::from_dataset(&set).unwrap();
        assert_eq!(
            table.media_storage_sop_class_uid(),
            uids::SECONDARY_CAPTURE_IMAGE_STORAGE
        );
        assert_eq!(table.media_storage_sop_instance_uid(), "1.2.3.4.5");
        assert_eq!(table.transfer_syntax(), uids::EXPLICIT_VR_LITTLE_ENDIAN);
        assert_eq!(table.implementation_version_name, None);
    }

    #[test]
    fn rebuild_prefers_main_data_set() {
        let mut file = DicomFile::new();
        file.root_mut()
            .add_dataelement(tags::SOP_CLASS_UID, VR::UI)
            .set_uid("1.2.840.10008.5.1.4.1.1.2")
            .unwrap();
        let table = FileMetaTable::rebuild(&file, uids::EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        assert_eq!(table.media_storage_sop_class_uid(), "1.2.840.10008.5.1.4.1.1.2");
        assert!(table.media_storage_sop_instance_uid().starts_with("2.25."));
        assert_eq!(table.information_version, [0, 1]);
        assert_eq!(
            table.implementation_version_name.as_deref(),
            Some(IMPLEMENTATION_VERSION_NAME)
        );
    }

    #[test]
    fn sequences_are_rejected_in_meta_group() {
        let elements: Vec<(Tag, VR, &[u8])> = vec![(Tag(0x0002, 0x0100), VR::SQ, &b""[..])];
        assert!(matches!(
            write_group(Vec::new(), elements),
            Err(Error::InvalidElement { .. })
        ));
    }
}
