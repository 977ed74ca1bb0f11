//! Modality transformations from stored values to output values.
use crate::lut::ModalityLut;

/// Description of a modality rescale function,
/// defined by a _rescale slope_ and _rescale intercept_.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rescale {
    /// the rescale slope
    pub slope: f64,
    /// the rescale intercept
    pub intercept: f64,
}

impl Default for Rescale {
    fn default() -> Self {
        Rescale {
            slope: 1.,
            intercept: 0.,
        }
    }
}

impl Rescale {
    /// Create a new rescale function.
    #[inline]
    pub fn new(slope: f64, intercept: f64) -> Self {
        Rescale { slope, intercept }
    }

    /// Apply the rescale function to a value.
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        self.slope * value + self.intercept
    }
}

/// The modality transformation applied to scaled output.
#[derive(Debug, Clone, PartialEq)]
pub enum ModalityTransform {
    /// a linear rescale
    Rescale(Rescale),
    /// a lookup table, which takes precedence over rescale attributes
    Lut(ModalityLut),
}

impl ModalityTransform {
    /// Map a stored sample value.
    #[inline]
    pub fn apply(&self, stored: f64) -> f32 {
        match self {
            ModalityTransform::Rescale(rescale) => rescale.apply(stored) as f32,
            ModalityTransform::Lut(lut) => f32::from(lut.apply(stored.round() as i64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Applying a common rescale function to a value
    /// gives the expected output.
    #[test]
    fn rescale_baseline() {
        let rescale = Rescale::new(1., -1024.);

        assert_eq!(rescale.apply(0.), -1024.);
        assert_eq!(rescale.apply(1.), -1023.);
        assert_eq!(rescale.apply(2.), -1022.);
        assert_eq!(rescale.apply(1024.), 0.);
    }

    #[test]
    fn transforms_produce_single_precision() {
        let transform = ModalityTransform::Rescale(Rescale::new(2., -1024.));
        assert_eq!(transform.apply(1024.), 1024.);
        assert_eq!(transform.apply(-1.), -1026.);

        let transform = ModalityTransform::Lut(ModalityLut::new(-1, 16, vec![7, 8, 9]));
        assert_eq!(transform.apply(-1.), 7.);
        assert_eq!(transform.apply(1.), 9.);
        assert_eq!(transform.apply(50.), 9.);
    }
}
