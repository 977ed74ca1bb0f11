//! Decoding in-memory images through every output strategy.
use dicomkit_core::VR;
use dicomkit_dictionary_std::{tags, uids};
use dicomkit_object::{DataElement, DataSetId, DicomFile, PixelSequence, Value};
use dicomkit_pixeldata::{
    decode_into, decode_into_layout, pixel_layout, to_array, to_array_view, DataType,
    DecodeOptions, DecodeTarget, Error, PixelArray, PixelDecoder,
};
use rstest::rstest;

struct Image {
    rows: i64,
    columns: i64,
    samples_per_pixel: i64,
    bits_allocated: i64,
    signed: bool,
    frames: Option<i64>,
}

impl Image {
    fn mono(rows: i64, columns: i64, bits_allocated: i64, signed: bool) -> Self {
        Image {
            rows,
            columns,
            samples_per_pixel: 1,
            bits_allocated,
            signed,
            frames: None,
        }
    }

    fn frames(mut self, frames: i64) -> Self {
        self.frames = Some(frames);
        self
    }

    fn file(&self, transfer_syntax: &str) -> DicomFile {
        let mut file = DicomFile::new();
        file.set_transfer_syntax(transfer_syntax).unwrap();
        let root = file.root_mut();
        root.add_dataelement(tags::SOP_CLASS_UID, VR::UI)
            .set_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
            .unwrap();
        root.add_dataelement(tags::SAMPLES_PER_PIXEL, VR::US)
            .set_long(self.samples_per_pixel)
            .unwrap();
        let photometric = if self.samples_per_pixel == 3 {
            "RGB"
        } else {
            "MONOCHROME2"
        };
        root.add_dataelement(tags::PHOTOMETRIC_INTERPRETATION, VR::CS)
            .set_string(photometric)
            .unwrap();
        root.add_dataelement(tags::ROWS, VR::US).set_long(self.rows).unwrap();
        root.add_dataelement(tags::COLUMNS, VR::US)
            .set_long(self.columns)
            .unwrap();
        root.add_dataelement(tags::BITS_ALLOCATED, VR::US)
            .set_long(self.bits_allocated)
            .unwrap();
        root.add_dataelement(tags::BITS_STORED, VR::US)
            .set_long(self.bits_allocated)
            .unwrap();
        root.add_dataelement(tags::HIGH_BIT, VR::US)
            .set_long(self.bits_allocated - 1)
            .unwrap();
        root.add_dataelement(tags::PIXEL_REPRESENTATION, VR::US)
            .set_long(i64::from(self.signed))
            .unwrap();
        if let Some(frames) = self.frames {
            root.add_dataelement(tags::NUMBER_OF_FRAMES, VR::IS)
                .set_long(frames)
                .unwrap();
        }
        file
    }

    fn native(&self, pixel_data: Vec<u8>) -> DicomFile {
        let mut file = self.file(uids::EXPLICIT_VR_LITTLE_ENDIAN);
        let vr = if self.bits_allocated > 8 { VR::OW } else { VR::OB };
        file.root_mut()
            .add_dataelement(tags::PIXEL_DATA, vr)
            .set_bytes(pixel_data)
            .unwrap();
        file
    }
}

fn le_i16(values: &[i16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn le_u16(values: impl IntoIterator<Item = u16>) -> Vec<u8> {
    values.into_iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn ones() -> DicomFile {
    Image::mono(4, 4, 16, true).native(le_i16(&[1; 16]))
}

#[test]
fn ones_decode_to_int16() {
    let file = ones();
    let array = to_array(&file, &DecodeOptions::new()).unwrap();
    assert_eq!(array.shape(), &[4, 4]);
    assert_eq!(array.dtype(), DataType::I16);
    assert_eq!(array.as_slice::<i16>(), Some(&[1_i16; 16][..]));

    // nothing to scale with
    let array = file.to_array(&DecodeOptions::new().scaled(true)).unwrap();
    assert_eq!(array.dtype(), DataType::I16);
    assert_eq!(array.as_slice::<i16>(), Some(&[1_i16; 16][..]));
}

#[test]
fn rescale_produces_float_samples() {
    let mut file = ones();
    let root = file.root_mut();
    root.add_dataelement(tags::RESCALE_SLOPE, VR::DS)
        .set_double(2.)
        .unwrap();
    root.add_dataelement(tags::RESCALE_INTERCEPT, VR::DS)
        .set_double(-1024.)
        .unwrap();

    let scaled = to_array(&file, &DecodeOptions::new().scaled(true)).unwrap();
    assert_eq!(scaled.dtype(), DataType::F32);
    assert_eq!(scaled.as_slice::<f32>(), Some(&[-1022_f32; 16][..]));

    let unscaled = to_array(&file, &DecodeOptions::new()).unwrap();
    assert_eq!(unscaled.dtype(), DataType::I16);
}

#[test]
fn modality_lut_takes_precedence() {
    let mut file = Image::mono(2, 2, 8, false).native(vec![0, 1, 2, 9]);
    file.root_mut()
        .add_dataelement(tags::RESCALE_SLOPE, VR::DS)
        .set_double(10.)
        .unwrap();
    let item = file
        .add_item(DataSetId::ROOT, tags::MODALITY_LUT_SEQUENCE)
        .unwrap();
    let set = file.dataset_mut(item).unwrap();
    set.add_dataelement(tags::LUT_DESCRIPTOR, VR::US)
        .set_longs(&[3, 0, 16])
        .unwrap();
    set.add_dataelement(tags::LUT_DATA, VR::OW)
        .set_bytes(le_u16([100, 200, 300]))
        .unwrap();

    let array = to_array(&file, &DecodeOptions::new().scaled(true)).unwrap();
    assert_eq!(array.as_slice::<f32>(), Some(&[100_f32, 200., 300., 300.][..]));
}

#[test]
fn malformed_modality_lut_is_an_error() {
    let mut file = ones();
    let item = file
        .add_item(DataSetId::ROOT, tags::MODALITY_LUT_SEQUENCE)
        .unwrap();
    file.dataset_mut(item)
        .unwrap()
        .add_dataelement(tags::LUT_DESCRIPTOR, VR::US)
        .set_longs(&[3, 0, 16])
        .unwrap();
    assert!(matches!(
        to_array(&file, &DecodeOptions::new().scaled(true)),
        Err(Error::ModalityLut { .. })
    ));
    // the table is only read when scaling
    assert!(to_array(&file, &DecodeOptions::new()).is_ok());
}

#[test]
fn view_matches_decoded_array() {
    let values: Vec<i16> = (0..16).map(|v| v * 100 - 700).collect();
    let file = Image::mono(4, 4, 16, true).native(le_i16(&values));
    let view = to_array_view(&file, -1).unwrap();
    let array = to_array(&file, &DecodeOptions::new()).unwrap();
    assert_eq!(view.shape(), array.shape());
    assert_eq!(view.dtype(), DataType::I16);
    assert_eq!(view.as_slice::<i16>(), array.as_slice::<i16>());
    assert_eq!(view.to_owned(), array);
}

fn multi_frame() -> (DicomFile, Vec<u16>) {
    let values: Vec<u16> = (0..3 * 8 * 8).map(|v| (v * 37 % 4096) as u16).collect();
    let file = Image::mono(8, 8, 16, false)
        .frames(3)
        .native(le_u16(values.iter().copied()));
    (file, values)
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(4)]
#[case(-1)]
fn thread_count_does_not_change_output(#[case] threads: i32) {
    let (file, values) = multi_frame();
    let mut out = vec![0_u16; values.len()];
    let mut target = DecodeTarget::new(&mut out, &[3, 8, 8]);
    decode_into(
        &file,
        &mut target,
        &DecodeOptions::new().all_frames().threads(threads),
    )
    .unwrap();
    assert_eq!(out, values);
}

#[test]
fn single_frames_of_a_multi_frame_image() {
    let (file, values) = multi_frame();
    let layout = pixel_layout(&file, &DecodeOptions::new().frame(2)).unwrap();
    assert_eq!(layout.number_of_frames(), 3);
    assert_eq!(layout.shape(), &[8, 8]);
    let array = to_array(&file, &DecodeOptions::new().frame(2)).unwrap();
    assert_eq!(array.as_slice::<u16>(), Some(&values[128..]));

    let view = to_array_view(&file, 1).unwrap();
    assert_eq!(view.as_slice::<u16>(), Some(&values[64..128]));
}

#[rstest]
#[case(DecodeOptions::new(), "InvalidFrame")]
#[case(DecodeOptions::new().frame(3), "FrameOutOfRange")]
#[case(DecodeOptions::new().frame(-2), "InvalidFrame")]
#[case(DecodeOptions::new().frame(0).threads(-3), "InvalidThreadCount")]
fn invalid_options(#[case] options: DecodeOptions, #[case] expected: &str) {
    let (file, _) = multi_frame();
    let err = to_array(&file, &options).unwrap_err();
    let variant = match err {
        Error::InvalidFrame { .. } => "InvalidFrame",
        Error::FrameOutOfRange { .. } => "FrameOutOfRange",
        Error::InvalidThreadCount { .. } => "InvalidThreadCount",
        _ => "other",
    };
    assert_eq!(variant, expected);
}

#[test]
fn mismatched_targets_are_left_untouched() {
    let file = ones();
    let options = DecodeOptions::new();

    let mut out = vec![7_i16; 20];
    let mut target = DecodeTarget::new(&mut out, &[4, 5]);
    assert!(matches!(
        decode_into(&file, &mut target, &options),
        Err(Error::ShapeMismatch { .. })
    ));
    assert!(out.iter().all(|v| *v == 7));

    let mut out = vec![7_u16; 16];
    let mut target = DecodeTarget::new(&mut out, &[4, 4]);
    assert!(matches!(
        decode_into(&file, &mut target, &options),
        Err(Error::DTypeMismatch { .. })
    ));
    assert!(out.iter().all(|v| *v == 7));

    let mut out = vec![7_i16; 16];
    let mut target = DecodeTarget::strided(&mut out, &[4, 4], &[1, 4]);
    assert!(matches!(
        decode_into(&file, &mut target, &options),
        Err(Error::NonContiguousBuffer { .. })
    ));
    assert!(out.iter().all(|v| *v == 7));
}

#[test]
fn layouts_go_stale_when_pixel_attributes_change() {
    let mut file = ones();
    let layout = pixel_layout(&file, &DecodeOptions::new()).unwrap();
    let mut array = PixelArray::zeroed(layout.dtype(), layout.shape());
    decode_into_layout(&file, &layout, &mut array.as_target()).unwrap();

    // unrelated attributes do not matter
    file.root_mut()
        .add_dataelement(tags::PATIENT_NAME, VR::PN)
        .set_string("Doe^John")
        .unwrap();
    decode_into_layout(&file, &layout, &mut array.as_target()).unwrap();

    file.root_mut()
        .add_dataelement(tags::RESCALE_SLOPE, VR::DS)
        .set_double(2.)
        .unwrap();
    assert!(matches!(
        decode_into_layout(&file, &layout, &mut array.as_target()),
        Err(Error::StaleLayout { .. })
    ));
}

#[test]
fn big_endian_samples_are_decoded_but_not_viewed() {
    let image = Image::mono(2, 2, 16, false);
    let mut file = image.file(uids::EXPLICIT_VR_BIG_ENDIAN);
    let pixel_data: Vec<u8> = [1_u16, 2, 3, 0x0102]
        .iter()
        .flat_map(|v| v.to_be_bytes())
        .collect();
    file.root_mut()
        .add_dataelement(tags::PIXEL_DATA, VR::OW)
        .set_bytes(pixel_data)
        .unwrap();

    let array = to_array(&file, &DecodeOptions::new()).unwrap();
    assert_eq!(array.as_slice::<u16>(), Some(&[1_u16, 2, 3, 0x0102][..]));
    assert!(matches!(
        to_array_view(&file, 0),
        Err(Error::ViewUnavailable { .. })
    ));
}

#[test]
fn planar_color_is_interleaved() {
    let image = Image {
        rows: 1,
        columns: 2,
        samples_per_pixel: 3,
        bits_allocated: 8,
        signed: false,
        frames: None,
    };
    let mut file = image.native(vec![10, 11, 20, 21, 30, 31]);
    file.root_mut()
        .add_dataelement(tags::PLANAR_CONFIGURATION, VR::US)
        .set_long(1)
        .unwrap();

    // scaling never applies to color
    let array = to_array(&file, &DecodeOptions::new().scaled(true)).unwrap();
    assert_eq!(array.shape(), &[1, 2, 3]);
    assert_eq!(array.as_slice::<u8>(), Some(&[10_u8, 20, 30, 11, 21, 31][..]));
    assert!(matches!(
        to_array_view(&file, 0),
        Err(Error::ViewUnavailable { .. })
    ));
}

#[test]
fn short_pixel_data() {
    let file = Image::mono(4, 4, 16, true).native(le_i16(&[1; 12]));
    assert!(matches!(
        to_array(&file, &DecodeOptions::new()),
        Err(Error::ShortPixelData { .. })
    ));
    assert!(matches!(
        to_array_view(&file, 0),
        Err(Error::ViewUnavailable { .. })
    ));
}

#[test]
fn float_pixel_data() {
    let mut file = Image::mono(1, 3, 32, false).file(uids::EXPLICIT_VR_LITTLE_ENDIAN);
    let samples = [0.5_f32, -1.25, 3.0];
    file.root_mut()
        .add_dataelement(tags::FLOAT_PIXEL_DATA, VR::OF)
        .set_bytes(samples.iter().flat_map(|v| v.to_le_bytes()).collect())
        .unwrap();
    let array = to_array(&file, &DecodeOptions::new()).unwrap();
    assert_eq!(array.dtype(), DataType::F32);
    assert_eq!(array.as_slice::<f32>(), Some(&samples[..]));
}

#[test]
fn missing_pixel_data() {
    let file = Image::mono(2, 2, 8, false).file(uids::EXPLICIT_VR_LITTLE_ENDIAN);
    assert!(matches!(
        to_array(&file, &DecodeOptions::new()),
        Err(Error::MissingPixelData { .. })
    ));
}

/// An RLE Lossless frame of 8-bit samples, as one literal run.
#[cfg(feature = "rle")]
fn rle_frame(samples: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(64 + samples.len() + 2);
    frame.extend_from_slice(&1_u32.to_le_bytes());
    frame.extend_from_slice(&64_u32.to_le_bytes());
    frame.resize(64, 0);
    frame.push(samples.len() as u8 - 1);
    frame.extend_from_slice(samples);
    if frame.len() % 2 == 1 {
        frame.push(0);
    }
    frame
}

#[cfg(feature = "rle")]
#[test]
fn encapsulated_frames_through_the_codec() {
    let mut file = Image::mono(2, 2, 8, false)
        .frames(2)
        .file(uids::RLE_LOSSLESS);
    let mut pixel_sequence = PixelSequence::default();
    pixel_sequence.push_frame(rle_frame(&[1, 2, 3, 4]));
    pixel_sequence.push_frame(rle_frame(&[5, 6, 7, 8]));
    file.root_mut().insert(DataElement::new(
        tags::PIXEL_DATA,
        VR::PX,
        Value::PixelSequence(pixel_sequence),
    ));

    let array = to_array(&file, &DecodeOptions::new().all_frames()).unwrap();
    assert_eq!(array.shape(), &[2, 2, 2]);
    assert_eq!(
        array.as_slice::<u8>(),
        Some(&[1_u8, 2, 3, 4, 5, 6, 7, 8][..])
    );

    let second = to_array(&file, &DecodeOptions::new().frame(1).threads(0)).unwrap();
    assert_eq!(second.as_slice::<u8>(), Some(&[5_u8, 6, 7, 8][..]));

    assert!(matches!(
        to_array_view(&file, 0),
        Err(Error::ViewUnavailable { .. })
    ));
}

#[cfg(feature = "rle")]
#[test]
fn codec_failures_name_the_codec_and_frame() {
    let mut file = Image::mono(2, 2, 8, false)
        .frames(2)
        .file(uids::RLE_LOSSLESS);
    let mut corrupt = rle_frame(&[5, 6, 7, 8]);
    // no segments
    corrupt[..4].copy_from_slice(&0_u32.to_le_bytes());
    let mut pixel_sequence = PixelSequence::default();
    pixel_sequence.push_frame(rle_frame(&[1, 2, 3, 4]));
    pixel_sequence.push_frame(corrupt);
    file.root_mut().insert(DataElement::new(
        tags::PIXEL_DATA,
        VR::PX,
        Value::PixelSequence(pixel_sequence),
    ));

    let first = to_array(&file, &DecodeOptions::new().frame(0)).unwrap();
    assert_eq!(first.as_slice::<u8>(), Some(&[1_u8, 2, 3, 4][..]));

    match to_array(&file, &DecodeOptions::new().frame(1).threads(0)) {
        Err(Error::Decode { codec, frame, .. }) => {
            assert_eq!(codec, "RLE Lossless");
            assert_eq!(frame, 1);
        }
        other => panic!("expected a decode error, got {:?}", other),
    }
}

#[cfg(feature = "rle")]
#[test]
fn frames_missing_from_the_pixel_sequence() {
    let mut file = Image::mono(2, 2, 8, false)
        .frames(1000)
        .file(uids::RLE_LOSSLESS);
    let mut pixel_sequence = PixelSequence::default();
    pixel_sequence.push_frame(rle_frame(&[1, 2, 3, 4]));
    file.root_mut().insert(DataElement::new(
        tags::PIXEL_DATA,
        VR::PX,
        Value::PixelSequence(pixel_sequence),
    ));

    assert!(matches!(
        to_array(&file, &DecodeOptions::new().all_frames()),
        Err(Error::MissingFrame { frame: 999, .. })
    ));
}

#[test]
fn oversized_images_are_errors() {
    let file = Image::mono(65535, 65535, 16, false)
        .frames(2147483647)
        .native(vec![0, 0]);
    assert!(matches!(
        to_array(&file, &DecodeOptions::new().all_frames()),
        Err(Error::ImageTooLarge { .. })
    ));
    // one frame is addressable, but not there
    assert!(matches!(
        to_array(&file, &DecodeOptions::new().frame(0)),
        Err(Error::ShortPixelData { frame: 0, .. })
    ));

    let mut out = vec![0_u16; 4];
    let mut target = DecodeTarget::new(&mut out, &[2, 2]);
    assert!(matches!(
        decode_into(&file, &mut target, &DecodeOptions::new().frame(0)),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn short_multi_frame_data_fails_before_decoding() {
    let (mut file, values) = multi_frame();
    file.root_mut()
        .add_dataelement(tags::PIXEL_DATA, VR::OW)
        .set_bytes(le_u16(values[..128].iter().copied()))
        .unwrap();

    let mut out = vec![7_u16; values.len()];
    let mut target = DecodeTarget::new(&mut out, &[3, 8, 8]);
    assert!(matches!(
        decode_into(&file, &mut target, &DecodeOptions::new().all_frames()),
        Err(Error::ShortPixelData { frame: 2, .. })
    ));
    assert!(out.iter().all(|v| *v == 7));

    // the frames which are there still decode
    let second = to_array(&file, &DecodeOptions::new().frame(1)).unwrap();
    assert_eq!(second.as_slice::<u16>(), Some(&values[64..128]));
}

#[rstest]
#[case(2)]
#[case(3)]
fn repeated_decodes_on_a_dedicated_pool(#[case] threads: i32) {
    let (file, values) = multi_frame();
    let options = DecodeOptions::new().all_frames().threads(threads);
    let layout = pixel_layout(&file, &options).unwrap();
    let mut frames = PixelArray::zeroed(layout.dtype(), layout.shape());
    for _ in 0..8 {
        decode_into_layout(&file, &layout, &mut frames.as_target()).unwrap();
        assert_eq!(frames.as_slice::<u16>(), Some(&values[..]));
    }
}

#[cfg(feature = "ndarray")]
#[test]
fn ndarray_targets_and_conversion() {
    let (file, values) = multi_frame();
    let mut frames = ndarray::ArrayD::<u16>::zeros(ndarray::IxDyn(&[3, 8, 8]));
    let mut target = DecodeTarget::from_ndarray(frames.view_mut());
    decode_into(&file, &mut target, &DecodeOptions::new().all_frames()).unwrap();
    assert_eq!(frames.as_slice().unwrap(), &values[..]);

    let array = to_array(&file, &DecodeOptions::new().frame(0)).unwrap();
    let converted = array.to_ndarray::<u16>().unwrap();
    assert_eq!(converted.shape(), &[8, 8]);
    assert_eq!(converted.as_slice().unwrap()[1], values[1]);

    // a transposed view is not row-major
    let mut frame = ndarray::ArrayD::<u16>::zeros(ndarray::IxDyn(&[8, 8]));
    let mut target = DecodeTarget::from_ndarray(frame.view_mut().reversed_axes());
    assert!(matches!(
        decode_into(&file, &mut target, &DecodeOptions::new().frame(0)),
        Err(Error::NonContiguousBuffer { .. })
    ));
}
