//! Inclusion rating: segmentation per rating method, severity banding by
//! circularity and thin/thick tallies per inclusion type.

use image::{DynamicImage, RgbImage};
use log::info;
use serde::{Deserialize, Serialize};

use crate::annotate::{self, AnnotatedRegion};
use crate::error::{AnalysisError, Result};
use crate::filters::{FilterSpec, partition};
use crate::models::{Measurement, Unit};
use crate::regions::ExtractionPolicy;
use crate::segmentation::Segmentation;

use super::{MeasurementCore, SessionStore};

/// Rating method; `Default` and `MethodD` share the adaptive
/// segmentation and the four-band classification, `MethodC` rates only
/// oxides against silicates off a global Otsu threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionMethod {
    #[default]
    Default,
    MethodC,
    MethodD,
}

/// Inclusion types: A sulfide, B alumina, C silicate, D globular oxide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InclusionType {
    A,
    B,
    C,
    D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Thickness {
    Thin,
    Thick,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InclusionParams {
    pub method: InclusionMethod,
    pub specimen_number: u32,
    /// Examined field area in mm^2, echoed into the report.
    pub field_area: f64,
    pub unit: Unit,
}

impl Default for InclusionParams {
    fn default() -> Self {
        Self {
            method: InclusionMethod::Default,
            specimen_number: 1,
            field_area: 0.512,
            unit: Unit::Microns,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InclusionMeasurement {
    #[serde(flatten)]
    pub measurement: Measurement,
    pub inclusion_type: InclusionType,
    pub thickness: Thickness,
}

/// Thin/thick tallies for one inclusion type.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TypeCount {
    pub thin: usize,
    pub thick: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct InclusionCounts {
    pub a: TypeCount,
    pub b: TypeCount,
    pub c: TypeCount,
    pub d: TypeCount,
}

impl InclusionCounts {
    fn tally(&mut self, inclusion_type: InclusionType, thickness: Thickness) {
        let slot = match inclusion_type {
            InclusionType::A => &mut self.a,
            InclusionType::B => &mut self.b,
            InclusionType::C => &mut self.c,
            InclusionType::D => &mut self.d,
        };
        match thickness {
            Thickness::Thin => slot.thin += 1,
            Thickness::Thick => slot.thick += 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InclusionReport {
    pub measurements: Vec<InclusionMeasurement>,
    pub counts: InclusionCounts,
    pub specimen_number: u32,
    pub field_area: f64,
    #[serde(skip)]
    pub annotated: RgbImage,
}

#[derive(Debug, Default)]
pub struct InclusionAnalyzer {
    core: MeasurementCore,
    pub session: SessionStore,
}

impl InclusionAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_calibration(&mut self, microns_per_pixel: f64) -> Result<()> {
        self.core.set_calibration(microns_per_pixel)
    }

    pub fn analyze(
        &self,
        image: &DynamicImage,
        params: &InclusionParams,
    ) -> Result<InclusionReport> {
        let strategy = match params.method {
            // 11x11 local mean, features darker than their surroundings.
            InclusionMethod::Default | InclusionMethod::MethodD => Segmentation::Adaptive {
                block_radius: 5,
                offset: 2,
                invert: true,
            },
            InclusionMethod::MethodC => Segmentation::Otsu,
        };
        let policy = ExtractionPolicy::inclusion();
        let (_, candidates) = self.core.candidates(image, &strategy, &policy, params.unit);
        // No caller-facing filter dimensions in this mode, but the pass
        // still assigns the dense 1-based ids.
        let (candidates, _) = partition(candidates, &FilterSpec::default());
        if candidates.is_empty() {
            return Err(AnalysisError::no_results("no inclusions detected"));
        }

        let mut counts = InclusionCounts::default();
        let mut measurements = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let m = &candidate.measurement;
            let inclusion_type = classify(params.method, m.circularity);
            let thickness = if m.area > 100.0 {
                Thickness::Thick
            } else {
                Thickness::Thin
            };
            counts.tally(inclusion_type, thickness);
            measurements.push(InclusionMeasurement {
                measurement: m.clone(),
                inclusion_type,
                thickness,
            });
        }
        info!(
            "inclusion ({:?}): rated {} inclusions",
            params.method,
            measurements.len()
        );

        let items: Vec<AnnotatedRegion<'_>> = candidates
            .iter()
            .map(|c| AnnotatedRegion {
                region: &c.region,
                id: Some(c.measurement.id),
                accepted: true,
            })
            .collect();
        let annotated = annotate::render(image, &items);

        Ok(InclusionReport {
            measurements,
            counts,
            specimen_number: params.specimen_number,
            field_area: params.field_area,
            annotated,
        })
    }
}

/// Circularity banding into inclusion types; boundaries are inclusive on
/// the rounder side.
fn classify(method: InclusionMethod, circularity: f64) -> InclusionType {
    match method {
        InclusionMethod::Default | InclusionMethod::MethodD => {
            if circularity >= 0.8 {
                InclusionType::D
            } else if circularity >= 0.6 {
                InclusionType::A
            } else if circularity >= 0.4 {
                InclusionType::B
            } else {
                InclusionType::C
            }
        }
        InclusionMethod::MethodC => {
            if circularity >= 0.7 {
                InclusionType::D
            } else {
                InclusionType::C
            }
        }
    }
}
