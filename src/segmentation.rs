//! Mask-producing segmentation strategies.
//!
//! Every strategy turns a decoded image into a binary mask (255 =
//! foreground) that the region extractor traces. Strategy selection is a
//! closed enum resolved once at call entry; analyzers pick their default
//! strategy and callers may override it where the mode allows.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::morphology::{close, open};
use log::debug;
use serde::{Deserialize, Serialize};

/// Inclusive per-channel HSV bounds, OpenCV scale (H 0-180, S/V 0-255).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HsvRange {
    pub h: (u8, u8),
    pub s: (u8, u8),
    pub v: (u8, u8),
}

impl Default for HsvRange {
    /// Bounds used for colored-feature detection: any hue, saturated and
    /// bright enough to stand out from the gray matrix.
    fn default() -> Self {
        Self {
            h: (0, 180),
            s: (50, 255),
            v: (50, 255),
        }
    }
}

/// Segmentation strategy, selected per analysis mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Segmentation {
    /// Foreground iff `min < g <= max` on the (optionally inverted)
    /// grayscale. Inversion targets dark features on a bright matrix.
    IntensityBand {
        min: u8,
        max: u8,
        dark_features: bool,
    },
    /// Foreground iff `g > threshold`.
    Fixed { threshold: u8 },
    /// Global threshold at the computed Otsu level.
    Otsu,
    /// Local box-mean binarization over a `(2r+1)^2` neighborhood with a
    /// bias `offset`; robust to uneven illumination. `invert` selects
    /// features darker than their surroundings.
    Adaptive {
        block_radius: u32,
        offset: i16,
        invert: bool,
    },
    /// Canny two-threshold hysteresis; yields boundary pixels, not filled
    /// regions.
    Edges { low: f32, high: f32 },
    /// Otsu threshold followed by 3x3 open then close, removing speckle
    /// and bridging small gaps.
    Morphological,
    /// Per-channel HSV range inclusion, 5x5 opened and closed.
    ColorRange(HsvRange),
}

/// Produces the binary foreground mask for the chosen strategy.
///
/// A zero-sized source yields an empty mask, not an error; decode
/// failures are the image-source collaborator's to report.
pub fn segment(image: &DynamicImage, strategy: &Segmentation) -> GrayImage {
    let gray = image.to_luma8();
    if gray.width() == 0 || gray.height() == 0 {
        return GrayImage::new(gray.width(), gray.height());
    }
    let mask = match strategy {
        Segmentation::IntensityBand {
            min,
            max,
            dark_features,
        } => intensity_band(&gray, *min, *max, *dark_features),
        Segmentation::Fixed { threshold } => binarize(&gray, *threshold),
        Segmentation::Otsu => binarize(&gray, otsu_level(&gray)),
        Segmentation::Adaptive {
            block_radius,
            offset,
            invert,
        } => adaptive(&gray, *block_radius, *offset, *invert),
        Segmentation::Edges { low, high } => canny(&gray, *low, *high),
        Segmentation::Morphological => {
            let binary = binarize(&gray, otsu_level(&gray));
            close(&open(&binary, Norm::LInf, 1), Norm::LInf, 1)
        }
        Segmentation::ColorRange(range) => {
            let mask = hsv_in_range(image, range);
            close(&open(&mask, Norm::LInf, 2), Norm::LInf, 2)
        }
    };
    debug!(
        "segmented {}x{} image, {} foreground px",
        mask.width(),
        mask.height(),
        mask.pixels().filter(|p| p[0] > 0).count()
    );
    mask
}

fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

fn intensity_band(gray: &GrayImage, min: u8, max: u8, dark_features: bool) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let g = gray.get_pixel(x, y)[0];
        let g = if dark_features { 255 - g } else { g };
        if g > min && g <= max { Luma([255]) } else { Luma([0]) }
    })
}

/// Box-mean adaptive threshold backed by a summed-area table.
fn adaptive(gray: &GrayImage, block_radius: u32, offset: i16, invert: bool) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return GrayImage::new(w, h);
    }
    // integral[y][x] = sum of pixels above and left of (x, y), exclusive.
    let stride = w as usize + 1;
    let mut integral = vec![0u64; stride * (h as usize + 1)];
    for y in 0..h as usize {
        let mut row_sum = 0u64;
        for x in 0..w as usize {
            row_sum += gray.get_pixel(x as u32, y as u32)[0] as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }
    let r = block_radius as i64;
    GrayImage::from_fn(w, h, |x, y| {
        let x0 = (x as i64 - r).max(0) as usize;
        let y0 = (y as i64 - r).max(0) as usize;
        let x1 = (x as i64 + r + 1).min(w as i64) as usize;
        let y1 = (y as i64 + r + 1).min(h as i64) as usize;
        let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
            - integral[y0 * stride + x1]
            - integral[y1 * stride + x0];
        let count = ((x1 - x0) * (y1 - y0)) as f64;
        let mean = sum as f64 / count;
        let g = gray.get_pixel(x, y)[0] as f64;
        let fg = if invert {
            g < mean - offset as f64
        } else {
            g > mean + offset as f64
        };
        if fg { Luma([255]) } else { Luma([0]) }
    })
}

fn hsv_in_range(image: &DynamicImage, range: &HsvRange) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y);
        let (h, s, v) = rgb_to_hsv(p[0], p[1], p[2]);
        let inside = range.h.0 <= h
            && h <= range.h.1
            && range.s.0 <= s
            && s <= range.s.1
            && range.v.0 <= v
            && v <= range.v.1;
        if inside { Luma([255]) } else { Luma([0]) }
    })
}

/// RGB to HSV on the OpenCV scale: H in 0-180, S and V in 0-255.
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;
    let v = max;
    let s = if max > 0.0 { delta / max } else { 0.0 };
    let h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (((gf - bf) / delta) % 6.0)
    } else if max == gf {
        60.0 * ((bf - rf) / delta + 2.0)
    } else {
        60.0 * ((rf - gf) / delta + 4.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };
    ((h / 2.0).round() as u8, (s * 255.0).round() as u8, (v * 255.0).round() as u8)
}
