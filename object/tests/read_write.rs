//! Reading back what was written, through memory and the file system.
use dicomkit_core::{Tag, VR};
use dicomkit_dictionary_std::{tags, uids};
use dicomkit_object::{
    read_bytes, read_file, write_bytes, write_file, DataElement, DataSetId, DicomFile,
    FileMetaTable, FrameGrouping, PixelSequence, ReadOptions, Value, WriteOptions,
};
use rstest::rstest;

fn sample_file() -> DicomFile {
    let mut file = DicomFile::new();
    let root = file.root_mut();
    root.add_dataelement(tags::SOP_CLASS_UID, VR::UI)
        .set_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
        .unwrap();
    root.add_dataelement(tags::SOP_INSTANCE_UID, VR::UI)
        .set_uid("2.25.1234")
        .unwrap();
    root.add_dataelement(tags::PATIENT_NAME, VR::PN)
        .set_string("Doe^Jane")
        .unwrap();
    root.add_dataelement(tags::ROWS, VR::US).set_long(2).unwrap();
    root.add_dataelement(tags::COLUMNS, VR::US).set_long(3).unwrap();
    let item = file
        .add_item(DataSetId::ROOT, tags::REFERENCED_IMAGE_SEQUENCE)
        .unwrap();
    file.dataset_mut(item)
        .unwrap()
        .add_dataelement(tags::REFERENCED_SOP_INSTANCE_UID, VR::UI)
        .set_uid("2.25.99")
        .unwrap();
    file
}

#[rstest]
#[case(uids::EXPLICIT_VR_LITTLE_ENDIAN)]
#[case(uids::IMPLICIT_VR_LITTLE_ENDIAN)]
fn round_trip_through_memory(#[case] ts: &str) {
    let mut file = sample_file();
    file.set_transfer_syntax(ts).unwrap();
    let bytes = write_bytes(&file, WriteOptions::default()).unwrap();
    assert_eq!(&bytes[128..132], b"DICM");

    let read = read_bytes(&bytes, ReadOptions::new()).unwrap();
    assert!(!read.has_error());
    assert_eq!(read.transfer_syntax(), ts);
    assert_eq!(
        read.get_dataelement(tags::PATIENT_NAME).to_string().as_deref(),
        Some("Doe^Jane")
    );
    assert_eq!(read.get_dataelement(tags::COLUMNS).to_long(), Some(3));
    assert_eq!(
        read.get_dataelement_by_path("ReferencedImageSequence.0.ReferencedSOPInstanceUID")
            .unwrap()
            .to_uid_string()
            .as_deref(),
        Some("2.25.99")
    );

    let meta = FileMetaTable::from_dataset(read.root()).unwrap();
    assert_eq!(meta.transfer_syntax(), ts);
    assert_eq!(
        meta.media_storage_sop_class_uid(),
        uids::SECONDARY_CAPTURE_IMAGE_STORAGE
    );
    assert_eq!(meta.media_storage_sop_instance_uid(), "2.25.1234");
}

#[test]
fn big_endian_values_survive() {
    let mut file = DicomFile::new();
    file.set_transfer_syntax(uids::EXPLICIT_VR_BIG_ENDIAN).unwrap();
    let root = file.root_mut();
    root.add_dataelement(tags::SOP_CLASS_UID, VR::UI)
        .set_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
        .unwrap();
    root.add_dataelement(tags::ROWS, VR::US).set_long(512).unwrap();
    root.add_dataelement(Tag(0x0018, 0x0088), VR::DS)
        .set_double(1.5)
        .unwrap();

    let bytes = write_bytes(&file, WriteOptions::default()).unwrap();
    let read = read_bytes(&bytes, ReadOptions::new()).unwrap();
    assert_eq!(read.transfer_syntax(), uids::EXPLICIT_VR_BIG_ENDIAN);
    let rows = read.get_dataelement(tags::ROWS);
    assert_eq!(rows.value_bytes(), Some(&[0x02, 0x00][..]));
    assert_eq!(rows.to_long(), Some(512));
    assert_eq!(read.get_dataelement(Tag(0x0018, 0x0088)).to_double(), Some(1.5));

    // byte order is fixed once the body holds elements
    let mut read = read;
    assert!(read
        .set_transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
        .is_err());
}

#[test]
fn write_and_read_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.dcm");
    write_file(&sample_file(), &path, WriteOptions::default()).unwrap();

    let read = read_file(&path, ReadOptions::new()).unwrap();
    assert_eq!(read.path(), Some(path.as_path()));
    assert_eq!(read.name(), path.display().to_string());
    assert_eq!(read.get_dataelement(tags::ROWS).to_long(), Some(2));

    let missing = dir.path().join("missing.dcm");
    assert!(read_file(&missing, ReadOptions::new()).is_err());
}

#[test]
fn missing_elements_are_sentinels() {
    let file = sample_file();
    let element = file.get_dataelement(tags::PATIENT_ID);
    assert!(element.is_missing());
    assert_eq!(element.vr(), VR::NONE);
    assert_eq!(element.vm(), 0);
    assert_eq!(element.to_string(), None);
    assert_eq!(element.to_long(), None);
    assert!(!bool::from(element));

    // lookups through a missing item stay missing
    let nested = file
        .get_dataelement_by_path("SourceImageSequence.0.ReferencedSOPInstanceUID")
        .unwrap();
    assert!(nested.is_missing());
}

#[test]
fn truncated_files_are_kept_on_request() {
    let bytes = write_bytes(&sample_file(), WriteOptions::default()).unwrap();
    let truncated = &bytes[..bytes.len() - 1];
    assert!(read_bytes(truncated, ReadOptions::new()).is_err());

    let file = read_bytes(truncated, ReadOptions::new().keep_on_error(true)).unwrap();
    assert!(file.has_error());
    assert!(file.error_message().is_some());
    assert!(file.get_dataelement(tags::PATIENT_NAME).is_present());
    assert_eq!(
        file.get_dataelement_by_path("ReferencedImageSequence.0.ReferencedSOPInstanceUID")
            .unwrap()
            .to_uid_string()
            .as_deref(),
        Some("2.25.99")
    );
    // the last element, Columns, is the one cut off
    assert!(file.get_dataelement(tags::COLUMNS).is_missing());
}

#[test]
fn reading_stops_after_load_until() {
    let bytes = write_bytes(&sample_file(), WriteOptions::default()).unwrap();
    let file = read_bytes(
        &bytes,
        ReadOptions::new().load_until(tags::REFERENCED_IMAGE_SEQUENCE),
    )
    .unwrap();
    assert!(!file.has_error());
    assert!(file.get_dataelement(tags::SOP_INSTANCE_UID).is_present());
    assert!(file
        .get_dataelement_by_path("ReferencedImageSequence.0.ReferencedSOPInstanceUID")
        .unwrap()
        .is_present());
    assert!(file.get_dataelement(tags::PATIENT_NAME).is_missing());
    assert!(file.get_dataelement(tags::ROWS).is_missing());
}

fn encapsulated_file(fragments: Vec<Vec<u8>>, frames: Option<i64>) -> Vec<u8> {
    let mut file = DicomFile::new();
    file.set_transfer_syntax(uids::JPEG_BASELINE8_BIT).unwrap();
    let root = file.root_mut();
    root.add_dataelement(tags::SOP_CLASS_UID, VR::UI)
        .set_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
        .unwrap();
    if let Some(frames) = frames {
        root.add_dataelement(tags::NUMBER_OF_FRAMES, VR::IS)
            .set_long(frames)
            .unwrap();
    }
    let mut pixel_sequence = PixelSequence::default();
    for fragment in fragments {
        pixel_sequence.push_fragment(fragment);
    }
    root.insert(DataElement::new(
        tags::PIXEL_DATA,
        VR::PX,
        Value::PixelSequence(pixel_sequence),
    ));
    write_bytes(&file, WriteOptions::default()).unwrap()
}

#[test]
fn single_fragment_is_a_single_frame() {
    let bytes = encapsulated_file(vec![vec![0xFF, 0xD8, 0x01, 0xFF, 0xD9, 0x00]], None);
    let file = read_bytes(&bytes, ReadOptions::new()).unwrap();
    let pixel_data = file.get_dataelement(tags::PIXEL_DATA);
    assert_eq!(pixel_data.vr(), VR::PX);
    let pixel_sequence = pixel_data.pixel_sequence().unwrap();
    assert_eq!(pixel_sequence.number_of_frames(), 1);
    assert_eq!(
        pixel_sequence.frame_encoded_bytes(0).unwrap(),
        vec![0xFF, 0xD8, 0x01, 0xFF, 0xD9, 0x00]
    );
}

#[test]
fn fragments_are_grouped_into_frames() {
    let fragments = vec![
        vec![0xFF, 0xD8, 0x01, 0x02],
        vec![0x03, 0xFF, 0xD9, 0x00],
        vec![0xFF, 0xD8, 0x04, 0x05],
        vec![0x06, 0xFF, 0xD9, 0x00],
    ];

    // as many fragments as frames
    let bytes = encapsulated_file(fragments.clone(), Some(4));
    let file = read_bytes(&bytes, ReadOptions::new()).unwrap();
    let pixel_sequence = file.get_dataelement(tags::PIXEL_DATA).pixel_sequence().unwrap();
    assert_eq!(pixel_sequence.number_of_frames(), 4);

    // frames inferred from end of image markers
    let bytes = encapsulated_file(fragments.clone(), Some(2));
    let file = read_bytes(&bytes, ReadOptions::new()).unwrap();
    let pixel_sequence = file.get_dataelement(tags::PIXEL_DATA).pixel_sequence().unwrap();
    assert_eq!(pixel_sequence.number_of_frames(), 2);
    assert_eq!(
        pixel_sequence.frame_encoded_bytes(1).unwrap(),
        vec![0xFF, 0xD8, 0x04, 0x05, 0x06, 0xFF, 0xD9, 0x00]
    );

    // the writer records the inferred frames in the offset table
    let rewritten = write_bytes(&file, WriteOptions::default()).unwrap();
    let reread = read_bytes(&rewritten, ReadOptions::new()).unwrap();
    let pixel_sequence = reread.get_dataelement(tags::PIXEL_DATA).pixel_sequence().unwrap();
    assert_eq!(pixel_sequence.offset_table(), &[0, 24]);
    assert_eq!(pixel_sequence.number_of_frames(), 2);

    // a single frame when grouping is not inferred
    let file = read_bytes(
        &bytes,
        ReadOptions::new().frame_grouping(FrameGrouping::SingleFrame),
    )
    .unwrap();
    let pixel_sequence = file.get_dataelement(tags::PIXEL_DATA).pixel_sequence().unwrap();
    assert_eq!(pixel_sequence.number_of_frames(), 1);
}

#[test]
fn frames_built_in_memory_survive_writing() {
    let mut file = DicomFile::new();
    file.set_transfer_syntax(uids::RLE_LOSSLESS).unwrap();
    let root = file.root_mut();
    root.add_dataelement(tags::SOP_CLASS_UID, VR::UI)
        .set_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
        .unwrap();
    root.add_dataelement(tags::NUMBER_OF_FRAMES, VR::IS)
        .set_long(2)
        .unwrap();
    let mut pixel_sequence = PixelSequence::default();
    pixel_sequence.push_frame(vec![1, 2]);
    pixel_sequence.push_fragment(vec![3, 4]);
    pixel_sequence.push_frame(vec![5, 6]);
    root.insert(DataElement::new(
        tags::PIXEL_DATA,
        VR::PX,
        Value::PixelSequence(pixel_sequence),
    ));

    let bytes = write_bytes(&file, WriteOptions::default()).unwrap();
    let read = read_bytes(&bytes, ReadOptions::new()).unwrap();
    let pixel_sequence = read.get_dataelement(tags::PIXEL_DATA).pixel_sequence().unwrap();
    assert_eq!(pixel_sequence.fragment_count(), 3);
    assert_eq!(pixel_sequence.offset_table(), &[0, 20]);
    assert_eq!(pixel_sequence.number_of_frames(), 2);
    assert_eq!(pixel_sequence.frame_encoded_bytes(0).unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(pixel_sequence.frame_encoded_bytes(1).unwrap(), vec![5, 6]);
}

#[cfg(feature = "deflate")]
#[test]
fn deflated_files_round_trip() {
    let bytes = write_bytes(&sample_file(), WriteOptions::default()).unwrap();
    let mut file = read_bytes(&bytes, ReadOptions::new()).unwrap();
    file.set_transfer_syntax(uids::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN)
        .unwrap();

    let deflated = write_bytes(&file, WriteOptions::new().keep_existing_meta(true)).unwrap();
    let read = read_bytes(&deflated, ReadOptions::new()).unwrap();
    assert_eq!(read.transfer_syntax(), uids::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN);
    assert_eq!(
        read.get_dataelement(tags::PATIENT_NAME).to_string().as_deref(),
        Some("Doe^Jane")
    );

    // a rebuilt meta group declares the body as it is written
    let plain = write_bytes(&file, WriteOptions::default()).unwrap();
    let read = read_bytes(&plain, ReadOptions::new()).unwrap();
    assert_eq!(read.transfer_syntax(), uids::EXPLICIT_VR_LITTLE_ENDIAN);
}
