//! Utility module for fetching key attributes from a DICOM file.
use crate::transform::Rescale;
use dicomkit_core::Tag;
use dicomkit_dictionary_std::tags;
use dicomkit_object::DicomFile;
use snafu::{ensure, Backtrace, OptionExt, Snafu};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum GetAttributeError {
    #[snafu(display("Missing required attribute `{}`", name))]
    MissingRequiredField {
        name: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not convert attribute `{}`", name))]
    ConvertValue {
        name: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("Semantically invalid value `{}` for attribute `{}`", value, name))]
    InvalidValue {
        name: &'static str,
        value: String,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = GetAttributeError> = std::result::Result<T, E>;

/// Get the Columns from the DICOM file
pub fn cols(file: &DicomFile) -> Result<u16> {
    retrieve_required_positive_u16(file, tags::COLUMNS, "Columns")
}

/// Get the Rows from the DICOM file
pub fn rows(file: &DicomFile) -> Result<u16> {
    retrieve_required_positive_u16(file, tags::ROWS, "Rows")
}

/// Get the PhotometricInterpretation from the DICOM file, if present
pub fn photometric_interpretation(file: &DicomFile) -> Option<String> {
    file.get_dataelement(tags::PHOTOMETRIC_INTERPRETATION)
        .to_string()
        .map(|s| s.trim().to_string())
}

/// Get the SamplesPerPixel from the DICOM file, returning 1 by default
pub fn samples_per_pixel(file: &DicomFile) -> Result<u16> {
    let spp = retrieve_optional_u16(file, tags::SAMPLES_PER_PIXEL, "SamplesPerPixel")?.unwrap_or(1);
    ensure!(
        (1..=4).contains(&spp),
        InvalidValueSnafu {
            name: "SamplesPerPixel",
            value: spp.to_string(),
        }
    );
    Ok(spp)
}

/// Get the PlanarConfiguration from the DICOM file, returning 0 by default
pub fn planar_configuration(file: &DicomFile) -> Result<u16> {
    let planar = retrieve_optional_u16(file, tags::PLANAR_CONFIGURATION, "PlanarConfiguration")?
        .unwrap_or(0);
    ensure!(
        planar <= 1,
        InvalidValueSnafu {
            name: "PlanarConfiguration",
            value: planar.to_string(),
        }
    );
    Ok(planar)
}

/// Get the BitsAllocated from the DICOM file
pub fn bits_allocated(file: &DicomFile) -> Result<u16> {
    retrieve_required_positive_u16(file, tags::BITS_ALLOCATED, "BitsAllocated")
}

/// Get the BitsStored from the DICOM file, defaulting to the bits allocated
pub fn bits_stored(file: &DicomFile, bits_allocated: u16) -> Result<u16> {
    Ok(retrieve_optional_u16(file, tags::BITS_STORED, "BitsStored")?.unwrap_or(bits_allocated))
}

/// An interpreted representation of the DICOM _Pixel Representation_ attribute.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub enum PixelRepresentation {
    /// unsigned pixel data sample values
    #[default]
    Unsigned,
    /// signed pixel data sample values
    Signed,
}

/// Get the PixelRepresentation from the DICOM file, unsigned by default
pub fn pixel_representation(file: &DicomFile) -> Result<PixelRepresentation> {
    match retrieve_optional_u16(file, tags::PIXEL_REPRESENTATION, "PixelRepresentation")? {
        None | Some(0) => Ok(PixelRepresentation::Unsigned),
        Some(1) => Ok(PixelRepresentation::Signed),
        Some(p) => InvalidValueSnafu {
            name: "PixelRepresentation",
            value: p.to_string(),
        }
        .fail(),
    }
}

/// Get the NumberOfFrames from the DICOM file,
/// returning 1 if it is not present
pub fn number_of_frames(file: &DicomFile) -> Result<u32> {
    let elem = file.get_dataelement(tags::NUMBER_OF_FRAMES);
    if elem.is_missing() {
        return Ok(1);
    }
    let integer = elem.to_long().context(ConvertValueSnafu {
        name: "NumberOfFrames",
    })?;

    ensure!(
        integer > 0,
        InvalidValueSnafu {
            name: "NumberOfFrames",
            value: integer.to_string(),
        }
    );

    Ok(integer as u32)
}

/// Get the RescaleSlope and RescaleIntercept from the DICOM file,
/// if either of them is present.
///
/// The slope defaults to 1 and the intercept to 0.
pub fn rescale(file: &DicomFile) -> Result<Option<Rescale>> {
    let slope = retrieve_optional_f64(file, tags::RESCALE_SLOPE, "RescaleSlope")?;
    let intercept = retrieve_optional_f64(file, tags::RESCALE_INTERCEPT, "RescaleIntercept")?;
    if slope.is_none() && intercept.is_none() {
        return Ok(None);
    }
    Ok(Some(Rescale::new(
        slope.unwrap_or(1.),
        intercept.unwrap_or(0.),
    )))
}

#[inline]
fn retrieve_optional_u16(file: &DicomFile, tag: Tag, name: &'static str) -> Result<Option<u16>> {
    let elem = file.get_dataelement(tag);
    if elem.is_missing() {
        return Ok(None);
    }
    let value = elem.to_long().context(ConvertValueSnafu { name })?;
    u16::try_from(value)
        .ok()
        .context(InvalidValueSnafu {
            name,
            value: value.to_string(),
        })
        .map(Some)
}

#[inline]
fn retrieve_required_positive_u16(file: &DicomFile, tag: Tag, name: &'static str) -> Result<u16> {
    let value = retrieve_optional_u16(file, tag, name)?.context(MissingRequiredFieldSnafu { name })?;
    ensure!(
        value > 0,
        InvalidValueSnafu {
            name,
            value: value.to_string(),
        }
    );
    Ok(value)
}

#[inline]
fn retrieve_optional_f64(file: &DicomFile, tag: Tag, name: &'static str) -> Result<Option<f64>> {
    let elem = file.get_dataelement(tag);
    if elem.is_missing() {
        return Ok(None);
    }
    elem.to_double().context(ConvertValueSnafu { name }).map(Some)
}
