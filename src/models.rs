use std::f64::consts::PI;

use imageproc::point::Point;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates.
///
/// Also serves as the identity key for manual nodule overrides, since
/// regions are not persisted across analysis calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bbox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Bbox {
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.w as f64 / 2.0,
            self.y as f64 + self.h as f64 / 2.0,
        )
    }
}

/// One connected foreground component traced from a binary mask.
///
/// Immutable once measured; regions carry no identity across calls.
#[derive(Debug, Clone)]
pub struct Region {
    /// Traced boundary, in discovery order along the border.
    pub points: Vec<Point<i32>>,
    pub bbox: Bbox,
    /// Polygon (shoelace) area of the traced boundary.
    pub area_px: f64,
    /// Corrected chain length of the traced boundary.
    pub perimeter_px: f64,
    /// Polygon centroid; bounding-box center for degenerate boundaries.
    pub centroid_px: (f64, f64),
    /// Grayscale mean under the filled boundary, 0-255.
    pub mean_intensity: f64,
}

impl Region {
    /// `4*pi*area / perimeter^2`, or 0 when the perimeter is 0.
    ///
    /// Values slightly above 1.0 are possible from discretization and are
    /// never clamped; downstream classification relies on that.
    pub fn circularity(&self) -> f64 {
        if self.perimeter_px > 0.0 {
            4.0 * PI * self.area_px / (self.perimeter_px * self.perimeter_px)
        } else {
            0.0
        }
    }

    /// Diameter of the circle with the same area.
    pub fn equivalent_diameter(&self) -> f64 {
        (4.0 * self.area_px / PI).sqrt()
    }
}

/// Unit in which calibrated measurements are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Microns,
    Pixels,
}

/// A region's descriptors expressed in the requested unit.
#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    /// Dense 1-based id, assigned after filtering in discovery order.
    /// 0 until assignment.
    pub id: u32,
    /// Bounding-box height scaled by the calibration factor.
    pub length: f64,
    /// Equivalent diameter scaled by the calibration factor.
    pub width: f64,
    pub area: f64,
    pub perimeter: f64,
    pub circularity: f64,
    pub mean_intensity: f64,
    /// Centroid as a percentage of the image width.
    pub x: f64,
    /// Centroid as a percentage of the image height.
    pub y: f64,
    pub bbox: Bbox,
    /// Interval-band color attached by the filter engine, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Measurement {
    /// Expresses a region in the given unit. `factor` must already be
    /// resolved through [`crate::calibration::Calibration::factor`].
    pub fn from_region(region: &Region, factor: f64, image_w: u32, image_h: u32) -> Self {
        let (cx, cy) = region.centroid_px;
        let x = if image_w > 0 {
            cx / image_w as f64 * 100.0
        } else {
            0.0
        };
        let y = if image_h > 0 {
            cy / image_h as f64 * 100.0
        } else {
            0.0
        };
        Self {
            id: 0,
            length: region.bbox.h as f64 * factor,
            width: region.equivalent_diameter() * factor,
            area: region.area_px * factor * factor,
            perimeter: region.perimeter_px * factor,
            circularity: region.circularity(),
            mean_intensity: region.mean_intensity,
            x,
            y,
            bbox: region.bbox,
            color: None,
        }
    }
}

/// A region paired with its calibrated measurement, before and after
/// the filter stage.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub region: Region,
    pub measurement: Measurement,
}
