//! Classic detector: Shi–Tomasi corner strength followed by X-junction checks.

use glam::Vec2;
use image::GrayImage;
use rayon::prelude::*;

use super::grid::assemble_grid;
use super::image::{FloatImage, non_max_suppression, prepare};
use super::ring::is_x_junction;
use super::{ChessboardFinder, CornerSearch, PatternSize};
use crate::flags::FindCornersFlags;

const BLOCK_RADIUS: usize = 2;
const NMS_RADIUS: usize = 3;
const BORDER: usize = 6;

#[derive(Debug, Clone)]
pub struct ClassicParams {
    pub blur_sigma: f32,
    /// Fraction of the strongest response kept under `ADAPTIVE_THRESH`.
    pub adaptive_rel: f32,
    /// Absolute minimum eigenvalue used otherwise (intensities in `[0, 1]`).
    pub fixed_threshold: f32,
    pub validation_radius: f32,
    pub min_contrast: f32,
}

impl Default for ClassicParams {
    fn default() -> Self {
        ClassicParams {
            blur_sigma: 1.0,
            adaptive_rel: 0.1,
            fixed_threshold: 0.05,
            validation_radius: 4.0,
            min_contrast: 25.0,
        }
    }
}

/// Minimum eigenvalue of the structure tensor summed over a 5x5 block.
pub fn min_eigen_response(img: &FloatImage) -> FloatImage {
    let (w, h) = (img.w, img.h);
    let mut ixx = FloatImage::zeros(w, h);
    let mut iyy = FloatImage::zeros(w, h);
    let mut ixy = FloatImage::zeros(w, h);
    if w < 3 || h < 3 {
        return ixx;
    }
    let scale = 1.0 / (8.0 * 255.0);
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let p = |dx: i32, dy: i32| img.at((x as i32 + dx) as usize, (y as i32 + dy) as usize);
            let gx = (p(1, -1) + 2.0 * p(1, 0) + p(1, 1) - p(-1, -1) - 2.0 * p(-1, 0) - p(-1, 1)) * scale;
            let gy = (p(-1, 1) + 2.0 * p(0, 1) + p(1, 1) - p(-1, -1) - 2.0 * p(0, -1) - p(1, -1)) * scale;
            let i = y * w + x;
            ixx.data[i] = gx * gx;
            iyy.data[i] = gy * gy;
            ixy.data[i] = gx * gy;
        }
    }

    let mut out = FloatImage::zeros(w, h);
    let r = BLOCK_RADIUS;
    if w <= 2 * r || h <= 2 * r {
        return out;
    }
    out.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        if y < r || y >= h - r {
            return;
        }
        for (x, dst) in row.iter_mut().enumerate().take(w - r).skip(r) {
            let (mut a, mut b, mut c) = (0.0f32, 0.0f32, 0.0f32);
            for yy in y - r..=y + r {
                for xx in x - r..=x + r {
                    a += ixx.at(xx, yy);
                    b += ixy.at(xx, yy);
                    c += iyy.at(xx, yy);
                }
            }
            let half_trace = 0.5 * (a + c);
            let d = (0.5 * (a - c)).hypot(b);
            *dst = half_trace - d;
        }
    });
    out
}

pub struct ClassicFinder {
    pub flags: FindCornersFlags,
    pub params: ClassicParams,
}

impl ClassicFinder {
    pub fn new(flags: FindCornersFlags) -> ClassicFinder {
        ClassicFinder {
            flags,
            params: ClassicParams::default(),
        }
    }

    pub fn candidates(&self, img: &FloatImage) -> Vec<Vec2> {
        let resp = min_eigen_response(img);
        let threshold = if self.flags.contains(FindCornersFlags::ADAPTIVE_THRESH) {
            let max = resp.max_value();
            if max <= 0.0 {
                return Vec::new();
            }
            self.params.adaptive_rel * max
        } else {
            self.params.fixed_threshold
        };
        non_max_suppression(&resp, threshold, NMS_RADIUS, BORDER)
            .into_iter()
            .map(|(x, y)| Vec2::new(x as f32, y as f32))
            .filter(|p| is_x_junction(img, p.x, p.y, self.params.validation_radius, self.params.min_contrast))
            .collect()
    }
}

impl ChessboardFinder for ClassicFinder {
    fn find(&self, gray: &GrayImage, pattern: PatternSize) -> CornerSearch {
        let normalize = self.flags.contains(FindCornersFlags::NORMALIZE_IMAGE);
        let img = prepare(gray, normalize, self.params.blur_sigma);
        let candidates = self.candidates(&img);
        if self.flags.contains(FindCornersFlags::FAST_CHECK) && candidates.len() < pattern.rows * pattern.cols {
            log::debug!(
                "fast check: {} candidates for {} corners",
                candidates.len(),
                pattern.rows * pattern.cols
            );
            return CornerSearch {
                found: false,
                corners: Vec::new(),
            };
        }
        match assemble_grid(&candidates, pattern) {
            Ok(corners) => CornerSearch { found: true, corners },
            Err(partial) => CornerSearch {
                found: false,
                corners: partial,
            },
        }
    }
}
