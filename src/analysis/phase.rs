//! Phase fraction analysis: per-phase intensity masks, optional shape
//! gating and area percentages.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::filters::RangeFilter;
use crate::models::Region;
use crate::regions::{self, ExtractionPolicy};

use super::SessionStore;

/// Pixel-geometry filters applied to the connected regions of a phase
/// mask. Length and width are the larger and smaller bounding-box side,
/// in pixels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeFilters {
    pub circularity: RangeFilter,
    pub length: RangeFilter,
    pub width: RangeFilter,
}

impl ShapeFilters {
    fn accepts(&self, region: &Region) -> bool {
        let length = region.bbox.w.max(region.bbox.h) as f64;
        let width = region.bbox.w.min(region.bbox.h) as f64;
        self.circularity.accepts(region.circularity())
            && self.length.accepts(length)
            && self.width.accepts(width)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseDef {
    pub name: String,
    /// Inclusive grayscale range for this phase; `None` falls back to
    /// the global range in [`PhaseParams`].
    pub intensity: Option<(u8, u8)>,
    /// When set, only pixels inside surviving regions count.
    pub shape: Option<ShapeFilters>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseParams {
    pub phases: Vec<PhaseDef>,
    pub min_intensity: u8,
    pub max_intensity: u8,
}

impl Default for PhaseParams {
    fn default() -> Self {
        Self {
            phases: Vec::new(),
            min_intensity: 0,
            max_intensity: 255,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseResult {
    pub name: String,
    /// Phase pixels as a percentage of the whole image.
    pub percentage: f64,
    pub area_px: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phases: Vec<PhaseResult>,
}

/// Phase fraction analyzer. A phase covering zero pixels is a valid
/// zero-percentage result, not an error. Percentages are unit-free, so
/// there is no calibration to carry.
#[derive(Debug, Default)]
pub struct PhaseAnalyzer {
    pub session: SessionStore,
}

impl PhaseAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(&self, image: &DynamicImage, params: &PhaseParams) -> Result<PhaseReport> {
        if params.phases.is_empty() {
            return Err(AnalysisError::input("no phases configured"));
        }
        let gray = image.to_luma8();
        let total = gray.width() as u64 * gray.height() as u64;
        if total == 0 {
            return Err(AnalysisError::input("image has no pixels"));
        }

        let mut results = Vec::with_capacity(params.phases.len());
        for phase in &params.phases {
            let (min, max) = phase
                .intensity
                .unwrap_or((params.min_intensity, params.max_intensity));
            let mut mask = in_range(&gray, min, max);
            if let Some(shape) = &phase.shape {
                mask = shape_gated(&mask, &gray, shape);
            }
            let area_px = mask.pixels().filter(|p| p[0] > 0).count() as u64;
            let percentage = area_px as f64 / total as f64 * 100.0;
            info!("phase '{}': {:.2}% ({area_px} px)", phase.name, percentage);
            results.push(PhaseResult {
                name: phase.name.clone(),
                percentage,
                area_px,
            });
        }
        Ok(PhaseReport { phases: results })
    }
}

/// Inclusive grayscale band mask.
fn in_range(gray: &GrayImage, min: u8, max: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let g = gray.get_pixel(x, y)[0];
        if min <= g && g <= max {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Intersects the intensity mask with the filled extent of the regions
/// that pass the shape filters.
fn shape_gated(mask: &GrayImage, gray: &GrayImage, shape: &ShapeFilters) -> GrayImage {
    let policy = ExtractionPolicy::phase();
    let mut kept = GrayImage::new(mask.width(), mask.height());
    for region in regions::extract(mask, gray, &policy) {
        if !shape.accepts(&region) {
            continue;
        }
        if region.points.len() >= 3 {
            draw_polygon_mut(&mut kept, &region.points, Luma([255]));
        }
        for p in &region.points {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < kept.width() && (p.y as u32) < kept.height() {
                kept.put_pixel(p.x as u32, p.y as u32, Luma([255]));
            }
        }
    }
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y)[0] > 0 && kept.get_pixel(x, y)[0] > 0 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
