//! Modality lookup tables.
//!
//! A modality LUT maps stored sample values to output values
//! through the first item of the _Modality LUT Sequence_.
//! Its _LUT Descriptor_ holds the number of entries
//! (0 standing for 65536),
//! the first stored value mapped,
//! and the number of bits per entry.
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use dicomkit_dictionary_std::tags;
use dicomkit_encoding::Endianness;
use dicomkit_object::DicomFile;
use snafu::{ensure, Backtrace, OptionExt, Snafu};

/// The reasons why a modality LUT could not be read.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum LutError {
    #[snafu(display("Modality LUT Sequence has no items"))]
    EmptySequence { backtrace: Backtrace },
    #[snafu(display("Modality LUT item has no LUT Descriptor"))]
    MissingDescriptor { backtrace: Backtrace },
    #[snafu(display("Invalid LUT Descriptor {:?}", descriptor))]
    InvalidDescriptor {
        descriptor: Vec<i32>,
        backtrace: Backtrace,
    },
    #[snafu(display("Modality LUT item has no LUT Data"))]
    MissingData { backtrace: Backtrace },
    #[snafu(display(
        "LUT Data holds {} bytes, but {} entries of {} bits were declared",
        len,
        entries,
        bits
    ))]
    ShortData {
        len: usize,
        entries: usize,
        bits: u16,
        backtrace: Backtrace,
    },
}

/// A modality lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalityLut {
    first_mapped: i64,
    bits: u16,
    entries: Vec<u16>,
}

impl ModalityLut {
    /// Create a LUT from its entries,
    /// the first entry being the output for stored value `first_mapped`.
    pub fn new(first_mapped: i64, bits: u16, entries: Vec<u16>) -> Self {
        ModalityLut {
            first_mapped,
            bits,
            entries,
        }
    }

    /// Read the modality LUT of the root data set, if it declares one.
    ///
    /// `signed` tells whether stored values are signed,
    /// in which case the first mapped value of the descriptor is too.
    pub fn from_file(file: &DicomFile, signed: bool) -> Result<Option<Self>, LutError> {
        let Some(items) = file.get_dataelement(tags::MODALITY_LUT_SEQUENCE).sequence() else {
            return Ok(None);
        };
        let item = items
            .first()
            .and_then(|id| file.dataset(*id))
            .context(EmptySequenceSnafu)?;

        let descriptor = item
            .get_dataelement(tags::LUT_DESCRIPTOR)
            .to_long_vector()
            .context(MissingDescriptorSnafu)?;
        let invalid = || InvalidDescriptorSnafu {
            descriptor: descriptor.clone(),
        };
        ensure!(descriptor.len() == 3, invalid());
        let entries = match descriptor[0] as u16 {
            0 => 65536,
            n => n as usize,
        };
        let first_mapped = if signed {
            descriptor[1] as u16 as i16 as i64
        } else {
            descriptor[1] as u16 as i64
        };
        let bits = u16::try_from(descriptor[2]).ok().context(invalid())?;
        ensure!(bits == 8 || bits == 16, invalid());

        let data = item.get(tags::LUT_DATA).context(MissingDataSnafu)?;
        let bytes = data.value_bytes().context(MissingDataSnafu)?;
        let values = if bits == 8 && bytes.len() == entries * 2 {
            // 8 bit entries in 16 bit words
            read_words(bytes, data.endianness(), entries)
                .map(|v| v & 0xFF)
                .collect()
        } else if bits == 8 {
            ensure!(
                bytes.len() >= entries,
                ShortDataSnafu {
                    len: bytes.len(),
                    entries,
                    bits
                }
            );
            bytes[..entries].iter().map(|b| u16::from(*b)).collect()
        } else {
            ensure!(
                bytes.len() >= entries * 2,
                ShortDataSnafu {
                    len: bytes.len(),
                    entries,
                    bits
                }
            );
            read_words(bytes, data.endianness(), entries).collect()
        };
        Ok(Some(ModalityLut::new(first_mapped, bits, values)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The bits per entry.
    pub fn bits(&self) -> u16 {
        self.bits
    }

    /// The stored value mapped by the first entry.
    pub fn first_mapped(&self) -> i64 {
        self.first_mapped
    }

    /// Map a stored value.
    /// Values outside of the table take the first or last entry.
    pub fn apply(&self, stored: i64) -> u16 {
        let last = self.entries.len().saturating_sub(1);
        let index = (stored - self.first_mapped).clamp(0, last as i64) as usize;
        self.entries.get(index).copied().unwrap_or(0)
    }
}

fn read_words(bytes: &[u8], endianness: Endianness, count: usize) -> impl Iterator<Item = u16> + '_ {
    bytes.chunks_exact(2).take(count).map(move |w| match endianness {
        Endianness::Little => LittleEndian::read_u16(w),
        Endianness::Big => BigEndian::read_u16(w),
    })
}

/// Whether the root data set declares a modality LUT.
pub(crate) fn has_modality_lut(file: &DicomFile) -> bool {
    file.get_dataelement(tags::MODALITY_LUT_SEQUENCE).is_present()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicomkit_core::VR;
    use dicomkit_object::DataSetId;

    fn file_with_lut(descriptor: &[i64], vr: VR, data: Vec<u8>) -> DicomFile {
        let mut file = DicomFile::new();
        let item = file
            .add_item(DataSetId::ROOT, tags::MODALITY_LUT_SEQUENCE)
            .unwrap();
        let set = file.dataset_mut(item).unwrap();
        set.add_dataelement(tags::LUT_DESCRIPTOR, VR::US)
            .set_longs(descriptor)
            .unwrap();
        set.add_dataelement(tags::LUT_DATA, vr).set_bytes(data).unwrap();
        file
    }

    #[test]
    fn sixteen_bit_tables_map_and_clamp() {
        let data = [100_u16, 200, 300, 400]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let file = file_with_lut(&[4, 10, 16], VR::OW, data);
        let lut = ModalityLut::from_file(&file, false).unwrap().unwrap();
        assert_eq!(lut.len(), 4);
        assert_eq!(lut.first_mapped(), 10);
        assert_eq!(lut.apply(10), 100);
        assert_eq!(lut.apply(13), 400);
        assert_eq!(lut.apply(0), 100);
        assert_eq!(lut.apply(1000), 400);
    }

    #[test]
    fn eight_bit_tables_in_words_or_bytes() {
        let file = file_with_lut(&[2, 0, 8], VR::OW, vec![0x05, 0xAA, 0x06, 0xBB]);
        let lut = ModalityLut::from_file(&file, false).unwrap().unwrap();
        assert_eq!(lut.apply(0), 0x05);
        assert_eq!(lut.apply(1), 0x06);

        let file = file_with_lut(&[3, 0, 8], VR::OB, vec![7, 8, 9, 0]);
        let lut = ModalityLut::from_file(&file, false).unwrap().unwrap();
        assert_eq!(lut.len(), 3);
        assert_eq!(lut.apply(2), 9);
    }

    #[test]
    fn signed_first_mapped_value() {
        let data = vec![0; 4];
        let file = file_with_lut(&[2, 0xFFFE, 16], VR::OW, data);
        let lut = ModalityLut::from_file(&file, true).unwrap().unwrap();
        assert_eq!(lut.first_mapped(), -2);
    }

    #[test]
    fn malformed_tables() {
        let file = file_with_lut(&[4, 0, 12], VR::OW, vec![0; 8]);
        assert!(matches!(
            ModalityLut::from_file(&file, false),
            Err(LutError::InvalidDescriptor { .. })
        ));
        let file = file_with_lut(&[4, 0, 16], VR::OW, vec![0; 6]);
        assert!(matches!(
            ModalityLut::from_file(&file, false),
            Err(LutError::ShortData { .. })
        ));

        let mut file = DicomFile::new();
        file.add_item(DataSetId::ROOT, tags::MODALITY_LUT_SEQUENCE)
            .unwrap();
        assert!(matches!(
            ModalityLut::from_file(&file, false),
            Err(LutError::MissingDescriptor { .. })
        ));

        assert!(ModalityLut::from_file(&DicomFile::new(), false)
            .unwrap()
            .is_none());
    }
}
