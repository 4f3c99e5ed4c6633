//! Porosity analysis: dual-bound intensity segmentation, range filtering
//! and pore statistics.

use image::{DynamicImage, GrayImage, RgbImage};
use log::info;
use serde::{Deserialize, Serialize};

use crate::annotate::{self, AnnotatedRegion};
use crate::error::{AnalysisError, Result};
use crate::filters::{FilterSpec, RangeFilter, partition};
use crate::models::{Measurement, Unit};
use crate::regions::ExtractionPolicy;
use crate::segmentation::{HsvRange, Segmentation, segment};
use crate::stats::{self, Histogram, HistogramField, IntensityHistogram, Statistics};

use super::{MeasurementCore, SessionStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PorosityParams {
    pub unit: Unit,
    /// Invert the grayscale so dark pores on a bright matrix become
    /// foreground.
    pub dark_features: bool,
    /// Lower intensity bound of the segmentation band (exclusive).
    pub min_threshold: u8,
    /// Upper intensity bound of the segmentation band (inclusive).
    pub max_threshold: u8,
    /// When set, segment by HSV color range instead of the intensity
    /// band (colored-feature preparations).
    pub color_range: Option<HsvRange>,
    pub filters: FilterSpec,
    /// Measurement field to histogram; `None` means summary only.
    pub histogram: Option<HistogramField>,
}

impl Default for PorosityParams {
    fn default() -> Self {
        Self {
            unit: Unit::Microns,
            dark_features: true,
            min_threshold: 0,
            max_threshold: 255,
            color_range: None,
            filters: FilterSpec::default(),
            histogram: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PorosityReport {
    pub measurements: Vec<Measurement>,
    pub statistics: Statistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histogram: Option<Histogram>,
    /// Annotated verification image; persisting it is the caller's job.
    #[serde(skip)]
    pub annotated: RgbImage,
}

/// Pore measurement over a single micrograph. Holds no classification
/// state; the session store carries config snapshots and the cumulative
/// log.
#[derive(Debug, Default)]
pub struct PorosityAnalyzer {
    core: MeasurementCore,
    pub session: SessionStore,
}

impl PorosityAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_calibration(&mut self, microns_per_pixel: f64) -> Result<()> {
        self.core.set_calibration(microns_per_pixel)
    }

    pub fn core(&self) -> &MeasurementCore {
        &self.core
    }

    pub fn analyze(&self, image: &DynamicImage, params: &PorosityParams) -> Result<PorosityReport> {
        let strategy = match params.color_range {
            Some(range) => Segmentation::ColorRange(range),
            None => Segmentation::IntensityBand {
                min: params.min_threshold,
                max: params.max_threshold,
                dark_features: params.dark_features,
            },
        };
        let policy = ExtractionPolicy::standard();

        // The segmentation band doubles as an intensity filter over the
        // pore's mean grayscale, on top of any caller-enabled one.
        let mut spec = params.filters.clone();
        spec.intensity = intersect_band(
            spec.intensity,
            params.min_threshold as f64,
            params.max_threshold as f64,
        );

        let (_, candidates) = self.core.candidates(image, &strategy, &policy, params.unit);
        let (accepted, rejected) = partition(candidates, &spec);
        info!(
            "porosity: {} accepted, {} rejected",
            accepted.len(),
            rejected.len()
        );
        if accepted.is_empty() {
            return Err(AnalysisError::no_results(
                "no pores matched the filter criteria",
            ));
        }

        let measurements: Vec<Measurement> =
            accepted.iter().map(|c| c.measurement.clone()).collect();
        let statistics = stats::summarize(&measurements);
        let histogram = params
            .histogram
            .and_then(|field| stats::measurement_histogram(&measurements, field));

        let items: Vec<AnnotatedRegion<'_>> = accepted
            .iter()
            .map(|c| AnnotatedRegion {
                region: &c.region,
                id: Some(c.measurement.id),
                accepted: true,
            })
            .chain(rejected.iter().map(|c| AnnotatedRegion {
                region: &c.region,
                id: None,
                accepted: false,
            }))
            .collect();
        let annotated = annotate::render(image, &items);

        Ok(PorosityReport {
            measurements,
            statistics,
            histogram,
            annotated,
        })
    }

    /// Binary preview of the intensity band, for interactive threshold
    /// tuning.
    pub fn threshold_preview(
        &self,
        image: &DynamicImage,
        min_threshold: u8,
        max_threshold: u8,
        dark_features: bool,
    ) -> GrayImage {
        segment(
            image,
            &Segmentation::IntensityBand {
                min: min_threshold,
                max: max_threshold,
                dark_features,
            },
        )
    }

    /// Raw grayscale intensity histogram of the source image.
    pub fn image_histogram(&self, image: &DynamicImage) -> IntensityHistogram {
        stats::intensity_histogram(&image.to_luma8(), None)
    }
}

fn intersect_band(user: RangeFilter, band_min: f64, band_max: f64) -> RangeFilter {
    if user.enabled {
        RangeFilter::enabled(user.min.max(band_min), user.max.min(band_max))
    } else {
        RangeFilter::enabled(band_min, band_max)
    }
}
