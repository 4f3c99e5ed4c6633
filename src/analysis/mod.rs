//! Analysis modes composed over a shared measurement core.
//!
//! Each analyzer owns a [`MeasurementCore`] plus its own classification
//! state; there is no shared state between analyzer instances, and a
//! single instance is not safe for unsynchronized concurrent mutation.

pub mod inclusion;
pub mod nodularity;
pub mod phase;
pub mod porosity;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use image::{DynamicImage, GrayImage};
use serde::Serialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::calibration::Calibration;
use crate::error::{AnalysisError, Result};
use crate::filters::FilterSpec;
use crate::models::{Candidate, Measurement, Unit};
use crate::regions::{self, ExtractionPolicy};
use crate::segmentation::{self, Segmentation};

pub use inclusion::InclusionAnalyzer;
pub use nodularity::NodularityAnalyzer;
pub use phase::PhaseAnalyzer;
pub use porosity::PorosityAnalyzer;

/// Shared measurement pipeline: segmentation, region extraction and
/// calibrated measurement. Mode-specific classifiers are layered on top
/// by composition.
#[derive(Debug, Clone, Default)]
pub struct MeasurementCore {
    calibration: Calibration,
}

impl MeasurementCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calibration(calibration: Calibration) -> Self {
        Self { calibration }
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    pub fn set_calibration(&mut self, microns_per_pixel: f64) -> Result<()> {
        self.calibration = Calibration::new(microns_per_pixel)?;
        Ok(())
    }

    /// Runs segmentation and extraction, returning the grayscale source
    /// alongside the measured candidates in discovery order.
    pub fn candidates(
        &self,
        image: &DynamicImage,
        strategy: &Segmentation,
        policy: &ExtractionPolicy,
        unit: Unit,
    ) -> (GrayImage, Vec<Candidate>) {
        let gray = image.to_luma8();
        let mask = segmentation::segment(image, strategy);
        let factor = self.calibration.factor(unit);
        let candidates = regions::extract(&mask, &gray, policy)
            .into_iter()
            .map(|region| {
                let measurement =
                    Measurement::from_region(&region, factor, gray.width(), gray.height());
                Candidate {
                    region,
                    measurement,
                }
            })
            .collect();
        (gray, candidates)
    }

    /// Convenience wrapper: candidates plus filter partition.
    pub fn measure(
        &self,
        image: &DynamicImage,
        strategy: &Segmentation,
        policy: &ExtractionPolicy,
        unit: Unit,
        spec: &FilterSpec,
    ) -> (GrayImage, Vec<Candidate>, Vec<Candidate>) {
        let (gray, candidates) = self.candidates(image, strategy, policy, unit);
        let (accepted, rejected) = crate::filters::partition(candidates, spec);
        (gray, accepted, rejected)
    }
}

/// Session-scoped analyzer state: named parameter snapshots and the
/// append-only cumulative result log. Entries are opaque JSON values so
/// callers can log whole reports or trimmed summaries alike.
#[derive(Debug, Default)]
pub struct SessionStore {
    configs: HashMap<String, Value>,
    cumulative: Vec<Value>,
}

impl SessionStore {
    pub fn save_config(&mut self, name: impl Into<String>, config: Value) {
        self.configs.insert(name.into(), config);
    }

    pub fn load_config(&self, name: &str) -> Option<&Value> {
        self.configs.get(name)
    }

    pub fn delete_config(&mut self, name: &str) -> bool {
        self.configs.remove(name).is_some()
    }

    /// Appends a result to the cumulative log, stamped with the current
    /// UTC time.
    pub fn push_cumulative<T: Serialize>(&mut self, result: &T) -> Result<()> {
        let recorded_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| AnalysisError::computation(format!("cannot format timestamp: {e}")))?;
        let value = serde_json::to_value(result)
            .map_err(|e| AnalysisError::computation(format!("cannot serialize result: {e}")))?;
        self.cumulative.push(json!({
            "recorded_at": recorded_at,
            "result": value,
        }));
        Ok(())
    }

    pub fn cumulative(&self) -> &[Value] {
        &self.cumulative
    }

    pub fn clear_cumulative(&mut self) {
        self.cumulative.clear();
    }

    /// Writes the cumulative log as pretty JSON to a caller-supplied path.
    pub fn save_cumulative(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.cumulative)
            .map_err(|e| AnalysisError::computation(format!("cannot serialize log: {e}")))?;
        fs::write(path, json).map_err(|e| {
            AnalysisError::input(format!("cannot write log to {}: {e}", path.display()))
        })
    }

    /// Replaces the cumulative log with the contents of a JSON file.
    pub fn load_cumulative(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            AnalysisError::input(format!("cannot read log from {}: {e}", path.display()))
        })?;
        self.cumulative = serde_json::from_str(&content)
            .map_err(|e| AnalysisError::input(format!("malformed log file: {e}")))?;
        Ok(())
    }
}
