//! Connected-region extraction and raw geometric descriptors.
//!
//! Regions are traced from the binary mask with Suzuki-Abe border
//! following, which visits components in row-major raster order; that
//! encounter order is the "discovery order" every later stage preserves.

use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use log::debug;

use crate::models::{Bbox, Region};

/// Fraction of total image area above which a region is considered a
/// frame or background artifact and discarded.
pub const MAX_AREA_FRACTION: f64 = 0.90;
/// Noise floor for porosity/nodularity/phase extraction, in px.
pub const STANDARD_NOISE_FLOOR: f64 = 50.0;
/// Noise floor for the inclusion variant, in px.
pub const INCLUSION_NOISE_FLOOR: f64 = 10.0;

/// Which traced borders become regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderMode {
    /// Every border, outer and hole alike.
    All,
    /// Top-level outer borders only.
    OuterOnly,
}

#[derive(Debug, Clone, Copy)]
pub struct ExtractionPolicy {
    pub borders: BorderMode,
    pub min_area_px: f64,
    /// Frame/background exclusion threshold; `None` keeps regions of any
    /// size.
    pub max_area_fraction: Option<f64>,
}

impl ExtractionPolicy {
    /// Porosity/nodularity: all borders, standard noise floor.
    pub fn standard() -> Self {
        Self {
            borders: BorderMode::All,
            min_area_px: STANDARD_NOISE_FLOOR,
            max_area_fraction: Some(MAX_AREA_FRACTION),
        }
    }

    /// Inclusion grading: outer borders, fine noise floor.
    pub fn inclusion() -> Self {
        Self {
            borders: BorderMode::OuterOnly,
            min_area_px: INCLUSION_NOISE_FLOOR,
            max_area_fraction: Some(MAX_AREA_FRACTION),
        }
    }

    /// Phase shape gating: outer borders, no exclusions. A single phase
    /// may legitimately cover the whole field.
    pub fn phase() -> Self {
        Self {
            borders: BorderMode::OuterOnly,
            min_area_px: 0.0,
            max_area_fraction: None,
        }
    }
}

/// Traces the mask and measures every region that survives the policy's
/// exclusions (frame-sized artifacts and sub-floor noise).
/// `gray` supplies the intensity samples; it must match the mask size.
pub fn extract(mask: &GrayImage, gray: &GrayImage, policy: &ExtractionPolicy) -> Vec<Region> {
    let (w, h) = mask.dimensions();
    let image_area = w as f64 * h as f64;
    if image_area == 0.0 {
        return Vec::new();
    }

    let contours: Vec<Contour<i32>> = find_contours(mask);
    let mut regions = Vec::new();
    for contour in &contours {
        if policy.borders == BorderMode::OuterOnly
            && !(contour.border_type == BorderType::Outer && contour.parent.is_none())
        {
            continue;
        }
        let points = normalized(&contour.points);
        if points.is_empty() {
            continue;
        }
        let bbox = bounding_box(&points);
        let area = shoelace_area(&points);
        if policy
            .max_area_fraction
            .is_some_and(|f| area / image_area > f)
            || area < policy.min_area_px
        {
            continue;
        }
        let perimeter = boundary_length(&points);
        let centroid = polygon_centroid(&points).unwrap_or_else(|| bbox.center());
        let mean_intensity = mean_under(&points, &bbox, gray);
        regions.push(Region {
            points,
            bbox,
            area_px: area,
            perimeter_px: perimeter,
            centroid_px: centroid,
            mean_intensity,
        });
    }
    debug!(
        "extracted {} regions from {} traced borders",
        regions.len(),
        contours.len()
    );
    regions
}

/// Drops a repeated closing point if the tracer produced one.
fn normalized(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let mut points = points.to_vec();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

fn bounding_box(points: &[Point<i32>]) -> Bbox {
    let mut min_x = i32::MAX;
    let mut min_y = i32::MAX;
    let mut max_x = i32::MIN;
    let mut max_y = i32::MIN;
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Bbox {
        x: min_x.max(0) as u32,
        y: min_y.max(0) as u32,
        w: (max_x - min_x + 1) as u32,
        h: (max_y - min_y + 1) as u32,
    }
}

/// Unsigned polygon area through the boundary pixel centers.
fn shoelace_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0i64;
    for (a, b) in closed_edges(points) {
        twice_area += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
    }
    (twice_area as f64 / 2.0).abs()
}

// Chain-length weights after Kulpa: raw 8-connected chain codes
// overestimate smooth boundaries, so axis steps count 0.948 and diagonal
// steps 1.340. This keeps circularity near 1.0 for round features.
const AXIS_STEP: f64 = 0.948;
const DIAGONAL_STEP: f64 = 1.340;

fn boundary_length(points: &[Point<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    closed_edges(points)
        .map(|(a, b)| {
            let dx = (a.x - b.x).abs();
            let dy = (a.y - b.y).abs();
            if dx <= 1 && dy <= 1 {
                if dx == 1 && dy == 1 {
                    DIAGONAL_STEP
                } else {
                    AXIS_STEP
                }
            } else {
                // Non-adjacent points should not occur in a traced border.
                ((dx * dx + dy * dy) as f64).sqrt() * AXIS_STEP
            }
        })
        .sum()
}

fn polygon_centroid(points: &[Point<i32>]) -> Option<(f64, f64)> {
    if points.len() < 3 {
        return None;
    }
    let mut twice_area = 0.0f64;
    let mut cx = 0.0f64;
    let mut cy = 0.0f64;
    for (a, b) in closed_edges(points) {
        let cross = a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
        twice_area += cross;
        cx += (a.x + b.x) as f64 * cross;
        cy += (a.y + b.y) as f64 * cross;
    }
    if twice_area.abs() < f64::EPSILON {
        return None;
    }
    let scale = 1.0 / (3.0 * twice_area);
    Some((cx * scale, cy * scale))
}

fn closed_edges(
    points: &[Point<i32>],
) -> impl Iterator<Item = (Point<i32>, Point<i32>)> + '_ {
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .take(points.len())
        .map(|(a, b)| (*a, *b))
}

/// Grayscale mean under the filled boundary, sampled on a bbox-local
/// canvas to keep the fill cheap.
fn mean_under(points: &[Point<i32>], bbox: &Bbox, gray: &GrayImage) -> f64 {
    let mut canvas = GrayImage::new(bbox.w, bbox.h);
    let shifted: Vec<Point<i32>> = points
        .iter()
        .map(|p| Point::new(p.x - bbox.x as i32, p.y - bbox.y as i32))
        .collect();
    if shifted.len() >= 3 {
        draw_polygon_mut(&mut canvas, &shifted, Luma([255]));
    }
    // The border itself always belongs to the region.
    for p in &shifted {
        if p.x >= 0 && p.y >= 0 && (p.x as u32) < bbox.w && (p.y as u32) < bbox.h {
            canvas.put_pixel(p.x as u32, p.y as u32, Luma([255]));
        }
    }

    let mut sum = 0u64;
    let mut count = 0u64;
    for (x, y, p) in canvas.enumerate_pixels() {
        if p[0] > 0 {
            let gx = bbox.x + x;
            let gy = bbox.y + y;
            if gx < gray.width() && gy < gray.height() {
                sum += gray.get_pixel(gx, gy)[0] as u64;
                count += 1;
            }
        }
    }
    if count > 0 { sum as f64 / count as f64 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn disk_mask(w: u32, h: u32, cx: f64, cy: f64, r: f64) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            if (dx * dx + dy * dy).sqrt() <= r {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn digital_disk_measures_like_a_circle() {
        let mask = disk_mask(100, 100, 50.0, 50.0, 20.0);
        let gray = GrayImage::from_pixel(100, 100, Luma([77]));
        let regions = extract(&mask, &gray, &ExtractionPolicy::standard());
        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        let expected_area = PI * 20.0 * 20.0;
        assert!((region.area_px - expected_area).abs() / expected_area < 0.05);
        let circ = region.circularity();
        assert!((0.95..=1.05).contains(&circ), "circularity {circ}");
        assert_eq!(region.bbox.h, 41);
        assert!((region.centroid_px.0 - 50.0).abs() < 1.0);
        assert!((region.centroid_px.1 - 50.0).abs() < 1.0);
        assert!((region.mean_intensity - 77.0).abs() < 1e-9);
    }

    #[test]
    fn frame_sized_regions_are_discarded() {
        let mask = GrayImage::from_pixel(64, 64, Luma([255]));
        let gray = GrayImage::from_pixel(64, 64, Luma([0]));
        let regions = extract(&mask, &gray, &ExtractionPolicy::standard());
        assert!(regions.is_empty());
    }

    #[test]
    fn phase_policy_keeps_field_spanning_regions() {
        let mask = GrayImage::from_pixel(64, 64, Luma([255]));
        let gray = GrayImage::from_pixel(64, 64, Luma([0]));
        let regions = extract(&mask, &gray, &ExtractionPolicy::phase());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bbox.w, 64);
    }

    #[test]
    fn sub_floor_specks_are_discarded() {
        let mut mask = GrayImage::new(64, 64);
        for y in 10..13 {
            for x in 10..13 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let gray = GrayImage::from_pixel(64, 64, Luma([0]));
        // 3x3 speck: polygon area 4 px, below both floors.
        assert!(extract(&mask, &gray, &ExtractionPolicy::standard()).is_empty());
        assert!(extract(&mask, &gray, &ExtractionPolicy::inclusion()).is_empty());
    }

    #[test]
    fn outer_only_skips_hole_borders() {
        // Annulus: outer border plus a hole border.
        let mask = GrayImage::from_fn(100, 100, |x, y| {
            let dx = x as f64 - 50.0;
            let dy = y as f64 - 50.0;
            let d = (dx * dx + dy * dy).sqrt();
            if d <= 30.0 && d >= 15.0 {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        let gray = GrayImage::from_pixel(100, 100, Luma([0]));
        let all = extract(&mask, &gray, &ExtractionPolicy {
            borders: BorderMode::All,
            min_area_px: 10.0,
            max_area_fraction: Some(MAX_AREA_FRACTION),
        });
        let outer = extract(&mask, &gray, &ExtractionPolicy {
            borders: BorderMode::OuterOnly,
            min_area_px: 10.0,
            max_area_fraction: Some(MAX_AREA_FRACTION),
        });
        assert_eq!(all.len(), 2);
        assert_eq!(outer.len(), 1);
        assert_eq!(outer[0].bbox.w, 61);
    }

    #[test]
    fn discovery_order_is_raster_order() {
        let mut mask = GrayImage::new(100, 40);
        for (ox, oy) in [(60u32, 2u32), (5, 20), (40, 20)] {
            for y in oy..oy + 10 {
                for x in ox..ox + 10 {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }
        let gray = GrayImage::from_pixel(100, 40, Luma([0]));
        let regions = extract(&mask, &gray, &ExtractionPolicy {
            borders: BorderMode::All,
            min_area_px: 10.0,
            max_area_fraction: Some(MAX_AREA_FRACTION),
        });
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].bbox.y, 2);
        assert_eq!(regions[1].bbox.x, 5);
        assert_eq!(regions[2].bbox.x, 40);
    }
}
