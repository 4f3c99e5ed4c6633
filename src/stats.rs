//! Summary statistics and distribution data over accepted measurements.
//!
//! Non-finite intermediate values (empty-set means, division artifacts)
//! are normalized to `None` before they cross the engine boundary.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::models::Measurement;

/// Per-field summary over the accepted set. Every field is `None` when
/// the input set is empty or the value would be non-finite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub count: usize,
    pub mean_area: Option<f64>,
    pub std_area: Option<f64>,
    pub mean_length: Option<f64>,
    pub mean_width: Option<f64>,
    pub mean_circularity: Option<f64>,
    pub area_distribution: Option<AreaDistribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaDistribution {
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
}

/// Histogram over one measurement field; `bins` holds the `counts.len()+1`
/// bin edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Histogram {
    pub counts: Vec<u32>,
    pub bins: Vec<f64>,
    pub min: f64,
    pub max: f64,
}

/// 256-bin grayscale intensity histogram, optionally tagged with the
/// threshold in effect when it was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntensityHistogram {
    pub counts: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_threshold: Option<u8>,
}

/// Measurement field a histogram can be taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramField {
    Length,
    Width,
    Area,
    Circularity,
}

impl HistogramField {
    fn value(&self, m: &Measurement) -> f64 {
        match self {
            Self::Length => m.length,
            Self::Width => m.width,
            Self::Area => m.area,
            Self::Circularity => m.circularity,
        }
    }
}

pub fn summarize(measurements: &[Measurement]) -> Statistics {
    let count = measurements.len();
    if count == 0 {
        return Statistics::default();
    }
    let areas: Vec<f64> = measurements.iter().map(|m| m.area).collect();
    let lengths: Vec<f64> = measurements.iter().map(|m| m.length).collect();
    let widths: Vec<f64> = measurements.iter().map(|m| m.width).collect();
    let circs: Vec<f64> = measurements.iter().map(|m| m.circularity).collect();

    let mut sorted_areas = areas.clone();
    sorted_areas.sort_by(|a, b| a.total_cmp(b));
    let distribution = AreaDistribution {
        min: sorted_areas[0],
        max: sorted_areas[count - 1],
        median: percentile(&sorted_areas, 50.0),
        q1: percentile(&sorted_areas, 25.0),
        q3: percentile(&sorted_areas, 75.0),
    };

    Statistics {
        count,
        mean_area: finite(mean(&areas)),
        std_area: finite(std_dev(&areas)),
        mean_length: finite(mean(&lengths)),
        mean_width: finite(mean(&widths)),
        mean_circularity: finite(mean(&circs)),
        area_distribution: all_finite(&distribution).then_some(distribution),
    }
}

/// Histogram over the selected field with an automatic (Sturges) bin
/// count. `None` for an empty set.
pub fn measurement_histogram(
    measurements: &[Measurement],
    field: HistogramField,
) -> Option<Histogram> {
    if measurements.is_empty() {
        return None;
    }
    let values: Vec<f64> = measurements.iter().map(|m| field.value(m)).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let n_bins = ((values.len() as f64).log2().ceil() as usize + 1).max(1);
    let span = (max - min).max(f64::MIN_POSITIVE);
    let width = span / n_bins as f64;
    let mut counts = vec![0u32; n_bins];
    for &v in &values {
        let idx = (((v - min) / width) as usize).min(n_bins - 1);
        counts[idx] += 1;
    }
    let bins = (0..=n_bins).map(|i| min + i as f64 * width).collect();
    Some(Histogram {
        counts,
        bins,
        min,
        max,
    })
}

pub fn intensity_histogram(gray: &GrayImage, current_threshold: Option<u8>) -> IntensityHistogram {
    let mut counts = vec![0u32; 256];
    for p in gray.pixels() {
        counts[p[0] as usize] += 1;
    }
    IntensityHistogram {
        counts,
        current_threshold,
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    (values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Linear-interpolated percentile over an ascending-sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let idx = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (idx - lo as f64)
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn all_finite(d: &AreaDistribution) -> bool {
    [d.min, d.max, d.median, d.q1, d.q3]
        .iter()
        .all(|v| v.is_finite())
}
