//! DICOM files: the arena of data sets and the reading process.
use crate::dataset::{DataSet, DataSetId};
use crate::element::{DataElement, ElementLookup, SetValueError, Value};
use crate::pixel_sequence::{Fragment, FrameGrouping, PixelSequence};
use crate::{
    CreateParserSnafu, InflateSnafu, OpenFileSnafu, PrematureEndSnafu, ReadError,
    ReadMetaElementSnafu, ReadTokenSnafu, UndefinedMetaLengthSnafu, UnexpectedTokenSnafu,
};
use dicomkit_core::{Length, Tag, VR};
use dicomkit_dictionary_std::{tags, uids};
use dicomkit_encoding::transfer_syntax::TransferSyntax;
use dicomkit_encoding::Endianness;
use dicomkit_parser::{DataSetReader, DataSetReaderOptions, DataToken, StatefulDecoder};
use dicomkit_transfer_syntax_registry::{entries, get_registry};
use itertools::Itertools;
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The name given to files read from memory by default.
pub const MEMORY_NAME: &str = "<memory>";

type Result<T, E = ReadError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum TransferSyntaxError {
    #[snafu(display("Unknown transfer syntax `{}`", uid))]
    UnknownTransferSyntax { uid: String, backtrace: Backtrace },
    #[snafu(display(
        "Cannot switch to {} byte order: the data set is already encoded in {}",
        to,
        from
    ))]
    ByteOrderChange {
        from: &'static str,
        to: &'static str,
        backtrace: Backtrace,
    },
    #[snafu(display("Could not update the Transfer Syntax UID element"))]
    UpdateTransferSyntaxElement {
        #[snafu(backtrace)]
        source: SetValueError,
    },
}

fn endianness_name(endianness: Endianness) -> &'static str {
    match endianness {
        Endianness::Little => "little endian",
        Endianness::Big => "big endian",
    }
}

#[derive(Debug, Clone)]
struct Node {
    set: DataSet,
    parent: (DataSetId, Tag),
    /// index of the item in the parent sequence when it was added
    position: usize,
}

/// A DICOM file held in memory.
///
/// The file owns its root data set
/// and every data set nested in sequences,
/// which are addressed by [`DataSetId`].
#[derive(Debug, Clone)]
pub struct DicomFile {
    name: String,
    path: Option<PathBuf>,
    root: DataSet,
    /// item data sets, `DataSetId(n)` lives at `n - 1`
    items: Vec<Option<Node>>,
    transfer_syntax: String,
    has_error: bool,
    error_message: Option<String>,
    /// generations of data sets which were removed
    retired_generation: u64,
    ts_generation: u64,
}

impl Default for DicomFile {
    fn default() -> Self {
        Self::new()
    }
}

impl DicomFile {
    /// Create an empty file in _Explicit VR Little Endian_.
    pub fn new() -> Self {
        DicomFile {
            name: MEMORY_NAME.to_string(),
            path: None,
            root: DataSet::new(Endianness::Little, true),
            items: Vec::new(),
            transfer_syntax: uids::EXPLICIT_VR_LITTLE_ENDIAN.to_string(),
            has_error: false,
            error_message: None,
            retired_generation: 0,
            ts_generation: 0,
        }
    }

    /// The path of the source file,
    /// or the label given to an in-memory source.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether reading stopped at a fault (tolerant mode only).
    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// The UID of the transfer syntax of the main data set.
    pub fn transfer_syntax(&self) -> &str {
        &self.transfer_syntax
    }

    /// The registry entry of the transfer syntax, if it is known.
    pub fn transfer_syntax_entry(&self) -> Option<&'static TransferSyntax> {
        get_registry().get(&self.transfer_syntax)
    }

    /// Change the transfer syntax of the main data set.
    ///
    /// Switching the byte order is only possible
    /// while the file holds nothing but the file meta group,
    /// since binary values are kept as encoded.
    pub fn set_transfer_syntax(&mut self, uid: &str) -> Result<(), TransferSyntaxError> {
        self.release_detached();
        let ts = get_registry()
            .get(uid)
            .context(UnknownTransferSyntaxSnafu { uid })?;
        let current = self.root.endianness();
        if ts.endianness() != current {
            let has_content =
                !self.items.is_empty() || self.root.tags().any(|tag| tag.group() != 0x0002);
            snafu::ensure!(
                !has_content,
                ByteOrderChangeSnafu {
                    from: endianness_name(current),
                    to: endianness_name(ts.endianness()),
                }
            );
        }
        self.root.set_encoding(ts.endianness(), ts.is_explicit_vr());
        for node in self.items.iter_mut().flatten() {
            node.set.set_encoding(ts.endianness(), ts.is_explicit_vr());
        }
        if let Some(element) = self.root.get_mut_untracked(tags::TRANSFER_SYNTAX_UID) {
            element
                .set_uid(ts.uid())
                .context(UpdateTransferSyntaxElementSnafu)?;
        }
        self.transfer_syntax = ts.uid().to_string();
        self.ts_generation += 1;
        Ok(())
    }

    pub fn root(&self) -> &DataSet {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut DataSet {
        self.release_detached();
        &mut self.root
    }

    fn node(&self, id: DataSetId) -> Option<&Node> {
        let index = id.0.checked_sub(1)?;
        self.items.get(index)?.as_ref()
    }

    fn node_set(&self, id: DataSetId) -> Option<&DataSet> {
        if id == DataSetId::ROOT {
            return Some(&self.root);
        }
        self.node(id).map(|node| &node.set)
    }

    /// Whether every data set from `id` up to the root
    /// is still an item of the sequence it was added to.
    fn is_attached(&self, id: DataSetId) -> bool {
        let mut current = id;
        while current != DataSetId::ROOT {
            let Some(node) = self.node(current) else {
                return false;
            };
            let (parent, tag) = node.parent;
            let held = self
                .node_set(parent)
                .and_then(|set| set.get(tag))
                .and_then(DataElement::sequence)
                .is_some_and(|items| {
                    items.get(node.position) == Some(&current) || items.contains(&current)
                });
            if !held {
                return false;
            }
            current = parent;
        }
        true
    }

    /// Resolve a data set handle.
    ///
    /// Items of sequences which were replaced or removed
    /// no longer resolve.
    pub fn dataset(&self, id: DataSetId) -> Option<&DataSet> {
        self.node_set(id).filter(|_| self.is_attached(id))
    }

    /// Resolve a data set handle for mutation.
    pub fn dataset_mut(&mut self, id: DataSetId) -> Option<&mut DataSet> {
        self.release_detached();
        if id == DataSetId::ROOT {
            return Some(&mut self.root);
        }
        let index = id.0.checked_sub(1)?;
        self.items.get_mut(index)?.as_mut().map(|node| &mut node.set)
    }

    /// The data set and sequence tag which contain the given item.
    pub fn parent(&self, id: DataSetId) -> Option<(DataSetId, Tag)> {
        self.node(id)
            .filter(|_| self.is_attached(id))
            .map(|node| node.parent)
    }

    /// Iterate over the items of a sequence element.
    pub fn items<'a>(&'a self, element: &'a DataElement) -> impl Iterator<Item = &'a DataSet> + 'a {
        element
            .sequence()
            .unwrap_or_default()
            .iter()
            .filter_map(move |id| self.dataset(*id))
    }

    /// The handle of item `index` of the sequence `tag` in data set `set`.
    pub fn item(&self, set: DataSetId, tag: Tag, index: usize) -> Option<DataSetId> {
        self.dataset(set)?.get(tag)?.sequence()?.get(index).copied()
    }

    /// Append a new empty item to the sequence `tag` of data set `set`,
    /// creating the sequence element when missing.
    ///
    /// Returns `None` if the data set does not exist
    /// or the element is not a sequence.
    pub fn add_item(&mut self, set: DataSetId, tag: Tag) -> Option<DataSetId> {
        self.release_detached();
        let parent = self.dataset(set)?;
        let position = match parent.get(tag) {
            Some(element) => element.sequence()?.len(),
            None => 0,
        };
        let item = parent.new_item(0);
        let id = self.reserve_node();
        self.fill_node(id, item, (set, tag), position);
        let parent = self.dataset_mut(set)?;
        if !parent.contains(tag) {
            parent.add_dataelement(tag, VR::SQ);
        }
        parent.get_mut(tag)?.push_item(id);
        Some(id)
    }

    /// Remove an element from data set `set`,
    /// releasing the items of a removed sequence.
    pub fn remove_dataelement(&mut self, set: DataSetId, tag: Tag) -> Option<DataElement> {
        let removed = self.dataset_mut(set)?.remove_dataelement(tag)?;
        self.release_detached();
        Some(removed)
    }

    /// Free the items of sequences which were replaced or removed
    /// through a mutable data set, along with everything nested in them.
    fn release_detached(&mut self) {
        let mut pending = self.root.take_released();
        for node in self.items.iter_mut().flatten() {
            pending.append(&mut node.set.take_released());
        }
        while let Some(id) = pending.pop() {
            if self.is_attached(id) {
                continue;
            }
            let Some(index) = id.0.checked_sub(1) else {
                continue;
            };
            if let Some(node) = self.items.get_mut(index).and_then(Option::take) {
                self.retired_generation += node.set.generation();
                for element in node.set.iter() {
                    pending.extend_from_slice(element.sequence().unwrap_or_default());
                }
            }
        }
    }

    /// Look up an element of the root data set.
    pub fn get_dataelement(&self, tag: Tag) -> ElementLookup<'_> {
        self.root.get_dataelement(tag)
    }

    /// A counter which changes whenever an element
    /// affecting the decoded pixel data is touched anywhere in the file,
    /// or the transfer syntax changes.
    pub fn pixel_generation(&self) -> u64 {
        let items: u64 = self
            .items
            .iter()
            .flatten()
            .map(|node| node.set.generation())
            .sum();
        self.root.generation() + items + self.retired_generation + self.ts_generation
    }

    fn reserve_node(&mut self) -> DataSetId {
        self.items.push(None);
        DataSetId(self.items.len())
    }

    fn fill_node(
        &mut self,
        id: DataSetId,
        set: DataSet,
        parent: (DataSetId, Tag),
        position: usize,
    ) {
        let slot = id.0.checked_sub(1).and_then(|index| self.items.get_mut(index));
        if let Some(slot) = slot {
            *slot = Some(Node {
                set,
                parent,
                position,
            });
        }
    }
}

/// Options for reading a DICOM file.
///
/// ```no_run
/// # use dicomkit_object::ReadOptions;
/// use dicomkit_dictionary_std::tags;
/// let file = ReadOptions::new()
///     .load_until(tags::PIXEL_DATA)
///     .read_file("path/to/file.dcm")?;
/// # Result::<(), Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Default, Clone)]
#[non_exhaustive]
pub struct ReadOptions {
    keep_on_error: bool,
    name: Option<String>,
    load_until: Option<Tag>,
    frame_grouping: FrameGrouping,
}

impl ReadOptions {
    pub fn new() -> Self {
        ReadOptions::default()
    }

    /// Keep the elements read before a fault
    /// instead of failing, marking the file with the error.
    pub fn keep_on_error(mut self, keep: bool) -> Self {
        self.keep_on_error = keep;
        self
    }

    /// Set the name of a file read from memory.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Stop reading after the root-level element with the given tag.
    pub fn load_until(mut self, tag: Tag) -> Self {
        self.load_until = Some(tag);
        self
    }

    /// Set how to form frames from pixel data fragments
    /// when there is no basic offset table.
    pub fn frame_grouping(mut self, grouping: FrameGrouping) -> Self {
        self.frame_grouping = grouping;
        self
    }

    pub fn read_file<P: AsRef<Path>>(self, path: P) -> Result<DicomFile> {
        read_file(path, self)
    }

    pub fn read_bytes(self, data: &[u8]) -> Result<DicomFile> {
        read_bytes(data, self)
    }
}

/// Read a DICOM file from the file system.
pub fn read_file<P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<DicomFile> {
    let path = path.as_ref();
    let data = std::fs::read(path).context(OpenFileSnafu { filename: path })?;
    let name = options
        .name
        .clone()
        .unwrap_or_else(|| path.display().to_string());
    read_dicom(&data, &options, name, Some(path.to_path_buf()))
}

/// Read a DICOM file held in memory.
///
/// The bytes may start with the 128-byte preamble and `DICM`,
/// or directly with the file meta group or the data set.
pub fn read_bytes(data: &[u8], options: ReadOptions) -> Result<DicomFile> {
    let name = options
        .name
        .clone()
        .unwrap_or_else(|| MEMORY_NAME.to_string());
    read_dicom(data, &options, name, None)
}

fn read_dicom(
    data: &[u8],
    options: &ReadOptions,
    name: String,
    path: Option<PathBuf>,
) -> Result<DicomFile> {
    let mut file = DicomFile {
        name,
        path,
        ..DicomFile::new()
    };
    match read_into(&mut file, data, options) {
        Ok(()) => Ok(file),
        Err(e) if options.keep_on_error => {
            let message = std::iter::successors(Some(&e as &dyn std::error::Error), |e| e.source())
                .join(": ");
            warn!("Stopped reading {}: {}", file.name, message);
            file.has_error = true;
            file.error_message = Some(message);
            Ok(file)
        }
        Err(e) => Err(e),
    }
}

/// The position of the file meta group:
/// after the preamble and `DICM` if present, else the start.
fn content_start(data: &[u8]) -> usize {
    if data.get(128..132) == Some(b"DICM") {
        132
    } else {
        0
    }
}

/// Guess the encoding of a data set without a file meta group.
fn infer_transfer_syntax(body: &[u8]) -> &'static TransferSyntax {
    let explicit = body
        .get(4..6)
        .and_then(|vr| VR::from_binary([vr[0], vr[1]]))
        .is_some();
    let big_endian = match body.get(0..2) {
        Some(&[a, b]) => u16::from_be_bytes([a, b]) < u16::from_le_bytes([a, b]),
        _ => false,
    };
    match (explicit, big_endian) {
        (true, true) => &entries::EXPLICIT_VR_BIG_ENDIAN,
        (true, false) => &entries::EXPLICIT_VR_LITTLE_ENDIAN,
        (false, _) => &entries::IMPLICIT_VR_LITTLE_ENDIAN,
    }
}

fn read_into(file: &mut DicomFile, data: &[u8], options: &ReadOptions) -> Result<()> {
    let start = content_start(data);
    let meta_end = read_meta_group(&mut file.root, data, start)?;
    let body = &data[meta_end..];

    let declared = file
        .root
        .get_dataelement(tags::TRANSFER_SYNTAX_UID)
        .to_uid_string()
        .filter(|uid| !uid.is_empty());
    let ts: &'static TransferSyntax = match &declared {
        Some(uid) => get_registry().get(uid).unwrap_or_else(|| {
            warn!(
                "Unknown transfer syntax `{}`, reading as Explicit VR Little Endian",
                uid
            );
            &entries::EXPLICIT_VR_LITTLE_ENDIAN
        }),
        None => {
            let ts = infer_transfer_syntax(body);
            debug!("No transfer syntax declared, reading as {}", ts.name());
            ts
        }
    };
    file.transfer_syntax = declared.unwrap_or_else(|| ts.uid().to_string());
    file.root.set_encoding(ts.endianness(), ts.is_explicit_vr());

    let inflated;
    let body = if ts.is_deflated() {
        inflated = inflate(body)?;
        &inflated[..]
    } else {
        body
    };

    let mut reader_options = DataSetReaderOptions::default();
    if let Some(tag) = options.load_until {
        reader_options = reader_options.load_until(tag);
    }
    let reader = DataSetReader::new_with_ts(body, ts, meta_end as u64, reader_options)
        .context(CreateParserSnafu)?;

    let mut builder = TreeBuilder {
        items: &mut file.items,
        reader,
        grouping: options.frame_grouping,
        ends_with_eoi: entries::ends_with_eoi_marker(ts.uid()),
    };
    builder.build_dataset(&mut file.root, DataSetId::ROOT, false)
}

#[cfg(feature = "deflate")]
fn inflate(body: &[u8]) -> Result<Vec<u8>> {
    dicomkit_transfer_syntax_registry::deflate::inflate(body).context(InflateSnafu)
}

#[cfg(not(feature = "deflate"))]
fn inflate(_body: &[u8]) -> Result<Vec<u8>> {
    crate::DeflateUnsupportedSnafu.fail()
}

/// Read the file meta group into the root data set,
/// returning the position where the main data set begins.
fn read_meta_group(root: &mut DataSet, data: &[u8], start: usize) -> Result<usize> {
    let mut decoder = StatefulDecoder::file_header_decoder(&data[start..], start as u64);
    while decoder
        .peek_tag()
        .is_some_and(|tag| tag.group() == 0x0002)
    {
        let offset = decoder.position();
        let header = decoder.decode_header().context(ReadMetaElementSnafu)?;
        let len = header.len.get().context(UndefinedMetaLengthSnafu {
            tag: header.tag,
            position: offset,
        })?;
        let value = decoder
            .read_value_bytes(len)
            .context(ReadMetaElementSnafu)?;
        root.insert(DataElement::from_stream(
            header.tag,
            header.vr,
            header.len,
            offset,
            Value::Bytes(value.to_vec()),
        ));
    }
    Ok(start + decoder.local_position())
}

/// Builds the data set tree out of the reader's tokens.
///
/// Elements are inserted as soon as they are read,
/// so that a fault leaves everything before it in place.
struct TreeBuilder<'a, 'f> {
    items: &'f mut Vec<Option<Node>>,
    reader: DataSetReader<'a>,
    grouping: FrameGrouping,
    ends_with_eoi: bool,
}

impl<'a> TreeBuilder<'a, '_> {
    fn next_token(&mut self) -> Result<Option<DataToken<'a>>> {
        self.reader.next().transpose().context(ReadTokenSnafu)
    }

    fn unexpected(&self, token: DataToken<'_>) -> ReadError {
        UnexpectedTokenSnafu {
            token: token.to_string(),
            position: self.reader.position(),
        }
        .build()
    }

    fn premature_end<T>(&self) -> Result<T> {
        PrematureEndSnafu {
            position: self.reader.position(),
        }
        .fail()
    }

    fn build_dataset(&mut self, set: &mut DataSet, id: DataSetId, in_item: bool) -> Result<()> {
        while let Some(token) = self.next_token()? {
            match token {
                DataToken::ElementHeader { header, offset } => {
                    let value = match self.next_token()? {
                        Some(DataToken::PrimitiveValue(value)) => value,
                        Some(other) => return Err(self.unexpected(other)),
                        None => return self.premature_end(),
                    };
                    set.insert(DataElement::from_stream(
                        header.tag,
                        header.vr,
                        header.len,
                        offset,
                        Value::Bytes(value.to_vec()),
                    ));
                }
                DataToken::SequenceStart { tag, len, offset } => {
                    set.insert(DataElement::from_stream(
                        tag,
                        VR::SQ,
                        len,
                        offset,
                        Value::Sequence(Vec::new()),
                    ));
                    self.build_sequence(set, id, tag)?;
                }
                DataToken::PixelSequenceStart { tag, offset } => {
                    let pixel_sequence = self.build_pixel_sequence(set)?;
                    set.insert(DataElement::from_stream(
                        tag,
                        VR::PX,
                        Length::UNDEFINED,
                        offset,
                        Value::PixelSequence(pixel_sequence),
                    ));
                }
                DataToken::ItemEnd if in_item => return Ok(()),
                other => return Err(self.unexpected(other)),
            }
        }
        if in_item {
            self.premature_end()
        } else {
            Ok(())
        }
    }

    fn build_sequence(&mut self, set: &mut DataSet, id: DataSetId, tag: Tag) -> Result<()> {
        loop {
            match self.next_token()? {
                Some(DataToken::ItemStart { offset, .. }) => {
                    self.items.push(None);
                    let item_id = DataSetId(self.items.len());
                    let mut item = set.new_item(offset);
                    let outcome = self.build_dataset(&mut item, item_id, true);
                    let position = set
                        .get(tag)
                        .and_then(DataElement::sequence)
                        .map_or(0, <[DataSetId]>::len);
                    if let Some(slot) = self.items.get_mut(item_id.0 - 1) {
                        *slot = Some(Node {
                            set: item,
                            parent: (id, tag),
                            position,
                        });
                    }
                    if let Some(element) = set.get_mut_untracked(tag) {
                        element.push_item(item_id);
                    }
                    outcome?;
                }
                Some(DataToken::SequenceEnd) => return Ok(()),
                Some(other) => return Err(self.unexpected(other)),
                None => return self.premature_end(),
            }
        }
    }

    fn build_pixel_sequence(&mut self, set: &DataSet) -> Result<PixelSequence> {
        let mut offset_table = Vec::new();
        let mut fragments = Vec::new();
        loop {
            match self.next_token()? {
                Some(DataToken::OffsetTable(table)) => offset_table = table,
                Some(DataToken::ItemValue { data, offset }) => fragments.push(Fragment {
                    offset,
                    data: data.to_vec(),
                }),
                Some(DataToken::SequenceEnd) => break,
                Some(other) => return Err(self.unexpected(other)),
                None => return self.premature_end(),
            }
        }
        let number_of_frames = set
            .get_dataelement(tags::NUMBER_OF_FRAMES)
            .to_longlong()
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0);
        let mut pixel_sequence = PixelSequence::new(offset_table, fragments);
        pixel_sequence.group_frames(number_of_frames, self.grouping, self.ends_with_eoi);
        Ok(pixel_sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    const IMPLICIT_BODY: &[u8] = &[
        // (0008,0016) SOP Class UID, length 6
        0x08, 0x00, 0x16, 0x00, 0x06, 0x00, 0x00, 0x00,
        b'1', b'.', b'2', b'.', b'3', 0x00,
        // (0010,0010) Patient Name, length 4
        0x10, 0x00, 0x10, 0x00, 0x04, 0x00, 0x00, 0x00,
        b'D', b'o', b'e', b' ',
    ];

    #[test]
    fn raw_implicit_stream_is_inferred() {
        let file = read_bytes(IMPLICIT_BODY, ReadOptions::new()).unwrap();
        assert_eq!(file.transfer_syntax(), uids::IMPLICIT_VR_LITTLE_ENDIAN);
        assert_eq!(file.name(), MEMORY_NAME);
        let name = file.get_dataelement(tags::PATIENT_NAME);
        assert_eq!(name.vr(), VR::PN);
        assert_eq!(name.to_string().as_deref(), Some("Doe"));
        assert_eq!(name.element().map(DataElement::offset), Some(14));
    }

    #[test]
    fn truncated_value_fails_or_is_kept() {
        let mut data = IMPLICIT_BODY.to_vec();
        // declare 200 bytes of Patient Name
        data[18] = 200;
        assert!(read_bytes(&data, ReadOptions::new()).is_err());

        let file = read_bytes(&data, ReadOptions::new().keep_on_error(true).name("broken")).unwrap();
        assert!(file.has_error());
        assert!(!file.error_message().unwrap_or_default().is_empty());
        assert_eq!(file.name(), "broken");
        assert!(file.get_dataelement(tags::SOP_CLASS_UID).is_present());
        assert!(file.get_dataelement(tags::PATIENT_NAME).is_missing());
    }

    #[test]
    fn items_are_created_and_released() {
        let mut file = DicomFile::new();
        let item = file
            .add_item(DataSetId::ROOT, tags::REFERENCED_IMAGE_SEQUENCE)
            .unwrap();
        file.dataset_mut(item)
            .unwrap()
            .add_dataelement(tags::REFERENCED_SOP_INSTANCE_UID, VR::UI)
            .set_uid("1.2.3.4")
            .unwrap();
        let nested = file.add_item(item, tags::SOURCE_IMAGE_SEQUENCE).unwrap();
        assert_eq!(file.parent(nested), Some((item, tags::SOURCE_IMAGE_SEQUENCE)));
        assert_eq!(file.parent(item), Some((DataSetId::ROOT, tags::REFERENCED_IMAGE_SEQUENCE)));

        let sequence = file.root().get(tags::REFERENCED_IMAGE_SEQUENCE).unwrap();
        assert_eq!(file.items(sequence).count(), 1);
        assert_eq!(
            file.item(DataSetId::ROOT, tags::REFERENCED_IMAGE_SEQUENCE, 0),
            Some(item)
        );

        // not a sequence
        file.root_mut().add_dataelement(tags::ROWS, VR::US);
        assert_eq!(file.add_item(DataSetId::ROOT, tags::ROWS), None);

        file.remove_dataelement(DataSetId::ROOT, tags::REFERENCED_IMAGE_SEQUENCE)
            .unwrap();
        assert!(file.dataset(item).is_none());
        assert!(file.dataset(nested).is_none());
        assert!(file
            .remove_dataelement(DataSetId::ROOT, tags::REFERENCED_IMAGE_SEQUENCE)
            .is_none());
    }

    #[test]
    fn replaced_and_removed_sequences_release_their_items() {
        let mut file = DicomFile::new();
        let item = file
            .add_item(DataSetId::ROOT, tags::REFERENCED_IMAGE_SEQUENCE)
            .unwrap();
        let nested = file.add_item(item, tags::SOURCE_IMAGE_SEQUENCE).unwrap();

        file.root_mut()
            .add_dataelement(tags::REFERENCED_IMAGE_SEQUENCE, VR::SQ);
        assert!(file.dataset(item).is_none());
        assert!(file.dataset(nested).is_none());
        assert_eq!(file.parent(item), None);

        // freed on the next mutable access
        let other = file
            .add_item(DataSetId::ROOT, tags::REFERENCED_IMAGE_SEQUENCE)
            .unwrap();
        assert!(file.items[item.0 - 1].is_none());
        assert!(file.items[nested.0 - 1].is_none());
        assert_eq!(file.parent(other), Some((DataSetId::ROOT, tags::REFERENCED_IMAGE_SEQUENCE)));

        // an element put back before the next access keeps its items
        let root = file.root_mut();
        let removed = root
            .remove_dataelement(tags::REFERENCED_IMAGE_SEQUENCE)
            .unwrap();
        assert_eq!(removed.sequence(), Some(&[other][..]));
        root.insert(removed);
        file.root_mut();
        assert!(file.dataset(other).is_some());

        file.root_mut()
            .remove_dataelement(tags::REFERENCED_IMAGE_SEQUENCE)
            .unwrap();
        assert!(file.dataset(other).is_none());
        file.root_mut();
        assert!(file.items[other.0 - 1].is_none());
    }

    #[test]
    fn pixel_generation_tracks_nested_changes() {
        let mut file = DicomFile::new();
        let start = file.pixel_generation();
        let item = file
            .add_item(DataSetId::ROOT, tags::MODALITY_LUT_SEQUENCE)
            .unwrap();
        let after_add = file.pixel_generation();
        assert!(after_add > start);
        file.dataset_mut(item)
            .unwrap()
            .add_dataelement(tags::LUT_DESCRIPTOR, VR::US);
        assert!(file.pixel_generation() > after_add);
        let before_remove = file.pixel_generation();
        file.remove_dataelement(DataSetId::ROOT, tags::MODALITY_LUT_SEQUENCE);
        assert!(file.pixel_generation() > before_remove);
    }

    #[test]
    fn transfer_syntax_changes() {
        let mut file = DicomFile::new();
        file.set_transfer_syntax(uids::EXPLICIT_VR_BIG_ENDIAN).unwrap();
        assert_eq!(file.root().endianness(), Endianness::Big);
        file.root_mut().add_dataelement(tags::ROWS, VR::US).set_long(1).unwrap();
        assert!(matches!(
            file.set_transfer_syntax(uids::IMPLICIT_VR_LITTLE_ENDIAN),
            Err(TransferSyntaxError::ByteOrderChange { .. })
        ));
        assert!(matches!(
            file.set_transfer_syntax("1.2.3"),
            Err(TransferSyntaxError::UnknownTransferSyntax { .. })
        ));
    }
}
