//! Audit rendering: region outlines and ids on a copy of the source.
//!
//! The renderer only produces the image; where it is persisted is the
//! caller's concern.

use image::{DynamicImage, Rgb, RgbImage};

use crate::models::Region;

pub const ACCEPTED_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const REJECTED_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// One region to draw, with its accept/reject decision and, for accepted
/// regions, the assigned id.
pub struct AnnotatedRegion<'a> {
    pub region: &'a Region,
    pub id: Option<u32>,
    pub accepted: bool,
}

/// Draws every processed region's outline (accepted green, rejected red)
/// on an RGB copy of the unfiltered source, labelling each assigned id at
/// the region's centroid.
pub fn render(source: &DynamicImage, items: &[AnnotatedRegion<'_>]) -> RgbImage {
    let mut canvas = source.to_rgb8();
    for item in items {
        let color = if item.accepted {
            ACCEPTED_COLOR
        } else {
            REJECTED_COLOR
        };
        draw_outline(&mut canvas, item.region, color);
        if let Some(id) = item.id {
            let (cx, cy) = item.region.centroid_px;
            draw_number(&mut canvas, cx.round() as i32, cy.round() as i32, id);
        }
    }
    canvas
}

/// Plots the traced boundary with a one-pixel dilation for visibility.
fn draw_outline(canvas: &mut RgbImage, region: &Region, color: Rgb<u8>) {
    for p in &region.points {
        for (dx, dy) in [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)] {
            put_pixel_checked(canvas, p.x + dx, p.y + dy, color);
        }
    }
}

fn put_pixel_checked(canvas: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

// 5x7 digit glyphs, row bits left-aligned at bit 4. Embedding these
// avoids shipping a font asset for purely numeric labels.
const GLYPH_W: i32 = 5;
const GLYPH_H: i32 = 7;
const ADVANCE: i32 = GLYPH_W + 1;
const DIGITS: [[u8; 7]; 10] = [
    [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
    [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
    [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
    [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
    [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
    [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
    [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
    [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
    [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
];

/// Draws a decimal number centered on `(cx, cy)`.
fn draw_number(canvas: &mut RgbImage, cx: i32, cy: i32, value: u32) {
    let digits: Vec<usize> = value
        .to_string()
        .bytes()
        .map(|b| (b - b'0') as usize)
        .collect();
    let total_w = digits.len() as i32 * ADVANCE - 1;
    let mut x = cx - total_w / 2;
    let y = cy - GLYPH_H / 2;
    for d in digits {
        draw_glyph(canvas, x, y, &DIGITS[d]);
        x += ADVANCE;
    }
}

fn draw_glyph(canvas: &mut RgbImage, x0: i32, y0: i32, rows: &[u8; 7]) {
    for (dy, row) in rows.iter().enumerate() {
        for dx in 0..GLYPH_W {
            if row & (1 << (GLYPH_W - 1 - dx)) != 0 {
                put_pixel_checked(canvas, x0 + dx, y0 + dy as i32, LABEL_COLOR);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bbox;
    use image::GrayImage;
    use imageproc::point::Point;

    fn square_region(x: i32, y: i32, side: i32) -> Region {
        let mut points = Vec::new();
        for i in 0..side {
            points.push(Point::new(x + i, y));
        }
        for i in 0..side {
            points.push(Point::new(x + side - 1, y + i));
        }
        Region {
            points,
            bbox: Bbox {
                x: x as u32,
                y: y as u32,
                w: side as u32,
                h: side as u32,
            },
            area_px: (side * side) as f64,
            perimeter_px: (4 * side) as f64,
            centroid_px: (x as f64 + side as f64 / 2.0, y as f64 + side as f64 / 2.0),
            mean_intensity: 0.0,
        }
    }

    #[test]
    fn outlines_use_the_two_color_scheme() {
        let source = DynamicImage::ImageLuma8(GrayImage::new(60, 60));
        let a = square_region(5, 5, 10);
        let b = square_region(35, 35, 10);
        let rendered = render(
            &source,
            &[
                AnnotatedRegion {
                    region: &a,
                    id: Some(1),
                    accepted: true,
                },
                AnnotatedRegion {
                    region: &b,
                    id: None,
                    accepted: false,
                },
            ],
        );
        assert_eq!(*rendered.get_pixel(5, 5), ACCEPTED_COLOR);
        assert_eq!(*rendered.get_pixel(35, 35), REJECTED_COLOR);
    }

    #[test]
    fn labels_land_near_the_centroid() {
        let source = DynamicImage::ImageLuma8(GrayImage::new(60, 60));
        let region = square_region(10, 10, 20);
        let rendered = render(
            &source,
            &[AnnotatedRegion {
                region: &region,
                id: Some(1),
                accepted: true,
            }],
        );
        let white = rendered
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == LABEL_COLOR)
            .count();
        assert!(white > 0);
    }

    #[test]
    fn outline_near_the_border_does_not_panic() {
        let source = DynamicImage::ImageLuma8(GrayImage::new(12, 12));
        let region = square_region(0, 0, 12);
        let _ = render(
            &source,
            &[AnnotatedRegion {
                region: &region,
                id: Some(42),
                accepted: false,
            }],
        );
    }
}
