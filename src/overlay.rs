//! Detection overlays drawn onto a copy of the input image.

use glam::Vec2;
use image::{DynamicImage, Rgb, RgbImage};

use crate::detection::PatternSize;

const RADIUS: i32 = 5;

fn put(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

// Bresenham
fn draw_line_segment(img: &mut RgbImage, p1: (i32, i32), p2: (i32, i32), color: Rgb<u8>) {
    let (mut x0, mut y0) = p1;
    let (x1, y1) = p2;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put(img, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_ring(img: &mut RgbImage, center: (i32, i32), radius: i32, color: Rgb<u8>) {
    let (cx, cy) = center;
    let outer = radius * radius;
    let inner = (radius - 1) * (radius - 1);
    for y in (cy - radius)..=(cy + radius) {
        for x in (cx - radius)..=(cx + radius) {
            let d = (x - cx).pow(2) + (y - cy).pow(2);
            if d <= outer && d >= inner {
                put(img, x, y, color);
            }
        }
    }
}

fn pixel(p: &Vec2) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

/// Colour of pattern row `row` out of `rows`.
pub fn row_color(row: usize, rows: usize) -> Rgb<u8> {
    let t = if rows > 1 { row as f64 / (rows - 1) as f64 } else { 0.0 };
    let c = colorous::RAINBOW.eval_continuous(t);
    Rgb([c.r, c.g, c.b])
}

/// Draws detected corners the way chessboard detections are usually shown.
///
/// A complete detection gets one colour per row, a cross-hair ring on each
/// corner and a polyline through the corners in order. A partial detection
/// only marks the corners that were seen, in red.
pub fn draw_chessboard_corners(img: &DynamicImage, pattern: PatternSize, corners: &[Vec2], found: bool) -> RgbImage {
    let mut out = img.to_rgb8();
    if !found || corners.len() != pattern.area() {
        let red = Rgb([255, 0, 0]);
        for c in corners {
            let (x, y) = pixel(c);
            draw_ring(&mut out, (x, y), RADIUS, red);
            draw_line_segment(&mut out, (x - RADIUS, y - RADIUS), (x + RADIUS, y + RADIUS), red);
            draw_line_segment(&mut out, (x - RADIUS, y + RADIUS), (x + RADIUS, y - RADIUS), red);
        }
        return out;
    }

    let mut previous: Option<(i32, i32)> = None;
    for (i, c) in corners.iter().enumerate() {
        let color = row_color(i / pattern.cols, pattern.rows);
        let (x, y) = pixel(c);
        draw_line_segment(&mut out, (x - RADIUS, y - RADIUS), (x + RADIUS, y + RADIUS), color);
        draw_line_segment(&mut out, (x - RADIUS, y + RADIUS), (x + RADIUS, y - RADIUS), color);
        draw_ring(&mut out, (x, y), RADIUS, color);
        if let Some(prev) = previous {
            draw_line_segment(&mut out, prev, (x, y), color);
        }
        previous = Some((x, y));
    }
    out
}
