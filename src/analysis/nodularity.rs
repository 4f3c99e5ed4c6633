//! Nodularity analysis: circularity-based nodule classification with
//! manual overrides and cumulative session results.

use std::collections::HashSet;

use image::{DynamicImage, RgbImage};
use log::info;
use serde::{Deserialize, Serialize};

use crate::annotate::{self, AnnotatedRegion};
use crate::error::{AnalysisError, Result};
use crate::filters::FilterSpec;
use crate::models::{Bbox, Measurement, Unit};
use crate::regions::ExtractionPolicy;
use crate::segmentation::Segmentation;
use crate::stats::{self, IntensityHistogram};

use super::{MeasurementCore, SessionStore};

pub const SIZE_CATEGORY_COUNT: usize = 8;

/// Half-open `[min, max)` length bands mapped to categories 1..=8, in
/// the conventional 10-micron steps. The last band is open-ended.
const DEFAULT_SIZE_RANGES: [(f64, f64); SIZE_CATEGORY_COUNT] = [
    (0.0, 10.0),
    (10.0, 20.0),
    (20.0, 30.0),
    (30.0, 40.0),
    (40.0, 50.0),
    (50.0, 60.0),
    (60.0, 70.0),
    (70.0, f64::INFINITY),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodularityParams {
    pub unit: Unit,
    /// Fixed binarization threshold; pixels strictly above it are
    /// foreground, so micrographs are expected prepared with graphite
    /// rendered bright.
    pub threshold: u8,
    pub filters: FilterSpec,
}

impl Default for NodularityParams {
    fn default() -> Self {
        Self {
            unit: Unit::Microns,
            threshold: 128,
            filters: FilterSpec::default(),
        }
    }
}

/// One measured graphite feature with its nodule verdict and size class.
#[derive(Debug, Clone, Serialize)]
pub struct NoduleMeasurement {
    #[serde(flatten)]
    pub measurement: Measurement,
    /// 1-based size category; 8 also serves as the open-ended fallback.
    pub size_category: u8,
    pub is_nodule: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodularityStatistics {
    pub total_features: usize,
    pub total_nodules: usize,
    /// Nodules as a percentage of all measured features.
    pub nodularity_percent: f64,
    /// Nodule counts per size category, index 0 is category 1.
    pub size_distribution: [usize; SIZE_CATEGORY_COUNT],
    pub mean_circularity: Option<f64>,
    pub mean_area: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct NodularityReport {
    pub nodules: Vec<NoduleMeasurement>,
    pub non_nodules: Vec<NoduleMeasurement>,
    pub statistics: NodularityStatistics,
    pub histogram: IntensityHistogram,
    #[serde(skip)]
    pub annotated: RgbImage,
}

/// Graphite nodule classifier. Carries the mutable session state the
/// operator tunes between fields: the circularity cutoff, editable size
/// bands and the set of manual overrides.
#[derive(Debug)]
pub struct NodularityAnalyzer {
    core: MeasurementCore,
    pub session: SessionStore,
    cutoff: f64,
    size_ranges: [(f64, f64); SIZE_CATEGORY_COUNT],
    overrides: HashSet<Bbox>,
}

impl Default for NodularityAnalyzer {
    fn default() -> Self {
        Self {
            core: MeasurementCore::default(),
            session: SessionStore::default(),
            cutoff: 0.5,
            size_ranges: DEFAULT_SIZE_RANGES,
            overrides: HashSet::new(),
        }
    }
}

impl NodularityAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_calibration(&mut self, microns_per_pixel: f64) -> Result<()> {
        self.core.set_calibration(microns_per_pixel)
    }

    pub fn circularity_cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Sets the nodule cutoff, clamped into `[0, 1]`.
    pub fn set_circularity_cutoff(&mut self, cutoff: f64) {
        self.cutoff = cutoff.clamp(0.0, 1.0);
    }

    /// Toggles a force-nodule override keyed by bounding box; returns
    /// whether the override is now active.
    pub fn toggle_override(&mut self, bbox: Bbox) -> bool {
        if self.overrides.remove(&bbox) {
            false
        } else {
            self.overrides.insert(bbox);
            true
        }
    }

    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    pub fn size_ranges(&self) -> &[(f64, f64); SIZE_CATEGORY_COUNT] {
        &self.size_ranges
    }

    /// Replaces the bounds of one size category (1-based).
    pub fn set_size_range(&mut self, category: u8, min: f64, max: f64) -> Result<()> {
        if !(1..=SIZE_CATEGORY_COUNT as u8).contains(&category) {
            return Err(AnalysisError::input(format!(
                "size category must be 1..={SIZE_CATEGORY_COUNT}, got {category}"
            )));
        }
        if !(min < max) {
            return Err(AnalysisError::input(format!(
                "size range requires min < max, got [{min}, {max})"
            )));
        }
        self.size_ranges[category as usize - 1] = (min, max);
        Ok(())
    }

    pub fn analyze(
        &self,
        image: &DynamicImage,
        params: &NodularityParams,
    ) -> Result<NodularityReport> {
        let strategy = Segmentation::Fixed {
            threshold: params.threshold,
        };
        let policy = ExtractionPolicy::standard();
        let (gray, accepted, rejected) =
            self.core
                .measure(image, &strategy, &policy, params.unit, &params.filters);
        if accepted.is_empty() {
            return Err(AnalysisError::no_results(
                "no graphite features matched the filter criteria",
            ));
        }

        let mut nodules = Vec::new();
        let mut non_nodules = Vec::new();
        let mut size_distribution = [0usize; SIZE_CATEGORY_COUNT];
        let mut annotated_items: Vec<AnnotatedRegion<'_>> = Vec::new();
        for candidate in &accepted {
            let m = &candidate.measurement;
            let is_nodule =
                m.circularity >= self.cutoff || self.overrides.contains(&m.bbox);
            let size_category = self.size_category(m.length);
            if is_nodule {
                size_distribution[size_category as usize - 1] += 1;
            }
            annotated_items.push(AnnotatedRegion {
                region: &candidate.region,
                id: Some(m.id),
                accepted: is_nodule,
            });
            let classified = NoduleMeasurement {
                measurement: m.clone(),
                size_category,
                is_nodule,
            };
            if is_nodule {
                nodules.push(classified);
            } else {
                non_nodules.push(classified);
            }
        }
        annotated_items.extend(rejected.iter().map(|c| AnnotatedRegion {
            region: &c.region,
            id: None,
            accepted: false,
        }));

        let total_features = nodules.len() + non_nodules.len();
        let measurements: Vec<Measurement> = accepted
            .iter()
            .map(|c| c.measurement.clone())
            .collect();
        let summary = stats::summarize(&measurements);
        let statistics = NodularityStatistics {
            total_features,
            total_nodules: nodules.len(),
            nodularity_percent: nodules.len() as f64 / total_features as f64 * 100.0,
            size_distribution,
            mean_circularity: summary.mean_circularity,
            mean_area: summary.mean_area,
        };
        info!(
            "nodularity: {} of {} features are nodules ({:.1}%)",
            statistics.total_nodules, statistics.total_features, statistics.nodularity_percent
        );

        let histogram = stats::intensity_histogram(&gray, Some(params.threshold));
        let annotated = annotate::render(image, &annotated_items);

        Ok(NodularityReport {
            nodules,
            non_nodules,
            statistics,
            histogram,
            annotated,
        })
    }

    /// Category for a calibrated length; anything past the configured
    /// bands falls into category 8.
    fn size_category(&self, length: f64) -> u8 {
        for (i, (min, max)) in self.size_ranges.iter().enumerate() {
            if *min <= length && length < *max {
                return i as u8 + 1;
            }
        }
        SIZE_CATEGORY_COUNT as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_is_clamped_to_the_unit_interval() {
        let mut analyzer = NodularityAnalyzer::new();
        analyzer.set_circularity_cutoff(1.7);
        assert_eq!(analyzer.circularity_cutoff(), 1.0);
        analyzer.set_circularity_cutoff(-0.3);
        assert_eq!(analyzer.circularity_cutoff(), 0.0);
        analyzer.set_circularity_cutoff(0.62);
        assert_eq!(analyzer.circularity_cutoff(), 0.62);
    }

    #[test]
    fn size_categories_are_half_open_with_an_open_tail() {
        let analyzer = NodularityAnalyzer::new();
        assert_eq!(analyzer.size_category(0.0), 1);
        assert_eq!(analyzer.size_category(9.99), 1);
        assert_eq!(analyzer.size_category(10.0), 2);
        assert_eq!(analyzer.size_category(41.0), 5);
        assert_eq!(analyzer.size_category(70.0), 8);
        assert_eq!(analyzer.size_category(5000.0), 8);
    }

    #[test]
    fn size_ranges_reject_bad_categories_and_bounds() {
        let mut analyzer = NodularityAnalyzer::new();
        assert!(analyzer.set_size_range(0, 0.0, 5.0).is_err());
        assert!(analyzer.set_size_range(9, 0.0, 5.0).is_err());
        assert!(analyzer.set_size_range(3, 5.0, 5.0).is_err());
        analyzer.set_size_range(1, 0.0, 4.0).unwrap();
        assert_eq!(analyzer.size_ranges()[0], (0.0, 4.0));
        assert_eq!(analyzer.size_category(4.5), 2);
    }

    #[test]
    fn overrides_toggle_membership() {
        let mut analyzer = NodularityAnalyzer::new();
        let bbox = Bbox {
            x: 3,
            y: 4,
            w: 10,
            h: 12,
        };
        assert!(analyzer.toggle_override(bbox));
        assert!(!analyzer.toggle_override(bbox));
        assert!(analyzer.toggle_override(bbox));
        analyzer.clear_overrides();
        assert!(analyzer.toggle_override(bbox));
    }
}
