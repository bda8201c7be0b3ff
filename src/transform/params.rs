//! Parameter types for on-demand transforms.
//!
//! These structs describe *what* to do, not *how*. They are the interface
//! between [`operations`](super::operations) (which plans the transform a
//! selector asks for) and the [`backend`](super::backend) (the external
//! primitive that touches pixels). Keeping them separate lets tests swap in
//! a recording mock.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality as a `0.0..=1.0` fraction. Clamped on construction.
//! - [`TransformParams`]: everything one transform needs, from source and
//!   crop to output size and quality.

use crate::geometry::CropDimension;
use crate::types::{Dimension, Rotation};

/// Quality fraction for lossy encoding.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Quality(f64);

impl Quality {
    pub fn new(fraction: f64) -> Self {
        if fraction.is_nan() {
            return Self::default();
        }
        Self(fraction.clamp(0.0, 1.0))
    }

    /// From an integer percentage; values above 100 clamp.
    pub fn from_percentage(percentage: u32) -> Self {
        Self::new(f64::from(percentage) / 100.0)
    }

    pub fn fraction(self) -> f64 {
        self.0
    }

    /// Nearest integer percentage, halves rounding up.
    pub fn as_percentage(self) -> u32 {
        (self.0 * 100.0).round() as u32
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.85)
    }
}

/// One planned transform: crop → rotate → resize, in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParams {
    /// Path of the stored rendition used as the source layer.
    pub source: String,
    pub crop: Option<CropDimension>,
    pub rotation: Option<Rotation>,
    /// Final output size. Never larger than the cropped and rotated layer.
    pub output: Dimension,
    pub quality: Quality,
    pub output_extension: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(-0.5).fraction(), 0.0);
        assert_eq!(Quality::new(0.5).fraction(), 0.5);
        assert_eq!(Quality::new(1.5).fraction(), 1.0);
        assert_eq!(Quality::new(f64::NAN), Quality::default());
    }

    #[test]
    fn quality_default_is_85_percent() {
        assert_eq!(Quality::default().as_percentage(), 85);
    }

    #[test]
    fn quality_percentage_rounds_to_nearest() {
        assert_eq!(Quality::new(0.854).as_percentage(), 85);
        assert_eq!(Quality::new(0.856).as_percentage(), 86);
        assert_eq!(Quality::new(0.125).as_percentage(), 13);
        assert_eq!(Quality::new(0.1).as_percentage(), 10);
        assert_eq!(Quality::from_percentage(150).as_percentage(), 100);
    }
}
