use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::models::Unit;

/// Microns-per-pixel scale of the imaging setup.
///
/// Pure value type; a factor of exactly 1.0 is the canonical pixel-units
/// representation, so unit selection never needs special-casing elsewhere.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Calibration {
    microns_per_pixel: f64,
}

impl Calibration {
    pub fn new(microns_per_pixel: f64) -> Result<Self> {
        if !microns_per_pixel.is_finite() || microns_per_pixel <= 0.0 {
            return Err(AnalysisError::input(format!(
                "calibration factor must be a positive number, got {microns_per_pixel}"
            )));
        }
        Ok(Self { microns_per_pixel })
    }

    /// Pixel-units calibration (factor 1.0).
    pub fn identity() -> Self {
        Self {
            microns_per_pixel: 1.0,
        }
    }

    pub fn microns_per_pixel(&self) -> f64 {
        self.microns_per_pixel
    }

    /// Scale factor to apply to pixel-space lengths for the given unit.
    pub fn factor(&self, unit: Unit) -> f64 {
        match unit {
            Unit::Pixels => 1.0,
            Unit::Microns => self.microns_per_pixel,
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::identity()
    }
}
