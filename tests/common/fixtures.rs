use image::{DynamicImage, GrayImage, Luma};

/// Uniform grayscale image.
pub fn blank(w: u32, h: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(w, h, Luma([value])))
}

/// Draws a filled circle of the given value onto a grayscale canvas.
pub fn draw_circle(img: &mut GrayImage, cx: i64, cy: i64, r: i64, value: u8) {
    for y in 0..img.height() as i64 {
        for x in 0..img.width() as i64 {
            if (x - cx) * (x - cx) + (y - cy) * (y - cy) <= r * r {
                img.put_pixel(x as u32, y as u32, Luma([value]));
            }
        }
    }
}

/// Draws a filled axis-aligned rectangle.
pub fn draw_rect(img: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32, value: u8) {
    for y in y0..(y0 + h).min(img.height()) {
        for x in x0..(x0 + w).min(img.width()) {
            img.put_pixel(x, y, Luma([value]));
        }
    }
}

/// White matrix with one dark pore.
pub fn dark_circle_image(w: u32, h: u32, cx: i64, cy: i64, r: i64) -> DynamicImage {
    let mut img = GrayImage::from_pixel(w, h, Luma([255]));
    draw_circle(&mut img, cx, cy, r, 0);
    DynamicImage::ImageLuma8(img)
}

/// Dark matrix with one bright feature (nodularity-style preparation).
pub fn bright_circle_image(w: u32, h: u32, cx: i64, cy: i64, r: i64) -> DynamicImage {
    let mut img = GrayImage::from_pixel(w, h, Luma([0]));
    draw_circle(&mut img, cx, cy, r, 255);
    DynamicImage::ImageLuma8(img)
}

/// Dark matrix with one bright elongated bar.
pub fn bright_bar_image(w: u32, h: u32, x0: u32, y0: u32, bw: u32, bh: u32) -> DynamicImage {
    let mut img = GrayImage::from_pixel(w, h, Luma([0]));
    draw_rect(&mut img, x0, y0, bw, bh, 255);
    DynamicImage::ImageLuma8(img)
}

/// Horizontal bands of the given `(row_count, intensity)` pairs, stacked
/// top to bottom.
pub fn banded_image(w: u32, bands: &[(u32, u8)]) -> DynamicImage {
    let h: u32 = bands.iter().map(|(rows, _)| rows).sum();
    let mut img = GrayImage::new(w, h);
    let mut y = 0;
    for &(rows, value) in bands {
        draw_rect(&mut img, 0, y, w, rows, value);
        y += rows;
    }
    DynamicImage::ImageLuma8(img)
}
