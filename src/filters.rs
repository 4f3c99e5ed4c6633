//! Composable range filters over calibrated measurements.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::{Candidate, Measurement};

/// One toggle-enabled `{min, max}` predicate; both bounds inclusive.
/// Disabled filters impose no constraint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeFilter {
    pub enabled: bool,
    pub min: f64,
    pub max: f64,
}

impl Default for RangeFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            min: 0.0,
            max: f64::INFINITY,
        }
    }
}

impl RangeFilter {
    pub fn enabled(min: f64, max: f64) -> Self {
        Self {
            enabled: true,
            min,
            max,
        }
    }

    pub fn accepts(&self, value: f64) -> bool {
        !self.enabled || (self.min <= value && value <= self.max)
    }
}

/// An ordered `[from, to)` band over length with an attached display
/// color; the first matching band wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interval {
    pub from: f64,
    pub to: f64,
    pub color: String,
}

/// Named numeric dimensions, AND-composed across all enabled filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub circularity: RangeFilter,
    pub length: RangeFilter,
    pub area: RangeFilter,
    pub width: RangeFilter,
    pub intensity: RangeFilter,
    pub intervals: Vec<Interval>,
}

impl FilterSpec {
    pub fn accepts(&self, m: &Measurement) -> bool {
        self.circularity.accepts(m.circularity)
            && self.length.accepts(m.length)
            && self.area.accepts(m.area)
            && self.width.accepts(m.width)
            && self.intensity.accepts(m.mean_intensity)
    }

    /// Color of the first interval containing `length`, if any.
    pub fn interval_color(&self, length: f64) -> Option<&str> {
        self.intervals
            .iter()
            .find(|band| band.from <= length && length < band.to)
            .map(|band| band.color.as_str())
    }
}

/// Splits candidates into accepted and rejected sets, reassigning dense
/// 1-based ids to the survivors in discovery order and attaching interval
/// colors.
pub fn partition(candidates: Vec<Candidate>, spec: &FilterSpec) -> (Vec<Candidate>, Vec<Candidate>) {
    let total = candidates.len();
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for mut candidate in candidates {
        if spec.accepts(&candidate.measurement) {
            candidate.measurement.id = accepted.len() as u32 + 1;
            candidate.measurement.color = spec
                .interval_color(candidate.measurement.length)
                .map(str::to_owned);
            accepted.push(candidate);
        } else {
            rejected.push(candidate);
        }
    }
    debug!("filter accepted {} of {} candidates", accepted.len(), total);
    (accepted, rejected)
}
