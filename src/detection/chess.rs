//! Sector-based search built on the ChESS ring response.
//!
//! For every pixel the 16-sample ring is compared in opposite sectors:
//! `R = SR - DR - 16 * MR`, where `SR` rewards alternating quadrants, `DR`
//! penalises edges and `MR` penalises blobs.

use glam::Vec2;
use image::GrayImage;
use rayon::prelude::*;

use super::grid::assemble_grid;
use super::image::{FloatImage, non_max_suppression, prepare};
use super::ring::{RING5, is_x_junction};
use super::subpix::{TermCriteria, corner_sub_pix_adaptive};
use super::{ChessboardFinder, CornerSearch, PatternSize};
use crate::flags::FindCornersFlags;

const RING_RADIUS: usize = 5;
const NMS_RADIUS: usize = 3;

#[derive(Debug, Clone)]
pub struct ChessParams {
    /// Relative thresholds tried in order; only the first unless `EXHAUSTIVE`.
    pub thresholds_rel: Vec<f32>,
    pub blur_sigma: f32,
    pub validation_radius: f32,
    pub min_contrast: f32,
}

impl Default for ChessParams {
    fn default() -> Self {
        Self {
            thresholds_rel: vec![0.2, 0.1, 0.05, 0.02],
            blur_sigma: 1.0,
            validation_radius: 4.0,
            min_contrast: 25.0,
        }
    }
}

/// Dense ChESS response; pixels closer than the ring radius to the border are zero.
pub fn chess_response(img: &FloatImage) -> FloatImage {
    let mut out = FloatImage::zeros(img.w, img.h);
    let border = RING_RADIUS + 1;
    if img.w <= 2 * border || img.h <= 2 * border {
        return out;
    }
    let w = img.w;
    let h = img.h;
    out.data
        .par_chunks_mut(w)
        .enumerate()
        .filter(|(y, _)| *y >= border && *y < h - border)
        .for_each(|(y, row)| {
            for (x, dst) in row.iter_mut().enumerate().take(w - border).skip(border) {
                let mut s = [0.0f32; 16];
                for (i, (dx, dy)) in RING5.iter().enumerate() {
                    s[i] = img.at((x as i32 + dx) as usize, (y as i32 + dy) as usize);
                }
                let mut sr = 0.0;
                for n in 0..4 {
                    sr += ((s[n] + s[n + 8]) - (s[n + 4] + s[n + 12])).abs();
                }
                let mut dr = 0.0;
                for n in 0..8 {
                    dr += (s[n] - s[n + 8]).abs();
                }
                let ring_mean = s.iter().sum::<f32>() / 16.0;
                let local_mean = (img.at(x, y)
                    + img.at(x - 1, y)
                    + img.at(x + 1, y)
                    + img.at(x, y - 1)
                    + img.at(x, y + 1))
                    / 5.0;
                let mr = (ring_mean - local_mean).abs();
                *dst = sr - dr - 16.0 * mr;
            }
        });
    out
}

/// Centre of mass of the positive response in the 5x5 window around a peak.
fn refine_peak(resp: &FloatImage, x: usize, y: usize) -> Vec2 {
    let mut sum = 0.0;
    let mut sx = 0.0;
    let mut sy = 0.0;
    for dy in -2i64..=2 {
        for dx in -2i64..=2 {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= resp.w as i64 || ny >= resp.h as i64 {
                continue;
            }
            let v = resp.at(nx as usize, ny as usize).max(0.0);
            sum += v;
            sx += v * nx as f32;
            sy += v * ny as f32;
        }
    }
    if sum > 0.0 {
        Vec2::new(sx / sum, sy / sum)
    } else {
        Vec2::new(x as f32, y as f32)
    }
}

/// Validated X-junction candidates above `threshold_rel * max(response)`.
pub fn chess_candidates(img: &FloatImage, resp: &FloatImage, threshold_rel: f32, params: &ChessParams) -> Vec<Vec2> {
    let max = resp.max_value();
    if max <= 0.0 {
        return Vec::new();
    }
    non_max_suppression(resp, threshold_rel * max, NMS_RADIUS, RING_RADIUS + 1)
        .into_iter()
        .map(|(x, y)| refine_peak(resp, x, y))
        .filter(|p| is_x_junction(img, p.x, p.y, params.validation_radius, params.min_contrast))
        .collect()
}

/// Sector-based chessboard finder.
pub struct SectorBasedFinder {
    pub flags: FindCornersFlags,
    pub params: ChessParams,
}

impl SectorBasedFinder {
    pub fn new(flags: FindCornersFlags) -> SectorBasedFinder {
        SectorBasedFinder {
            flags,
            params: ChessParams::default(),
        }
    }
}

impl ChessboardFinder for SectorBasedFinder {
    fn find(&self, gray: &GrayImage, pattern: PatternSize) -> CornerSearch {
        let normalize = self.flags.contains(FindCornersFlags::NORMALIZE_IMAGE);
        let img = prepare(gray, normalize, self.params.blur_sigma);
        let resp = chess_response(&img);

        let thresholds: &[f32] = if self.flags.contains(FindCornersFlags::EXHAUSTIVE) {
            &self.params.thresholds_rel
        } else {
            &self.params.thresholds_rel[..self.params.thresholds_rel.len().min(1)]
        };

        let mut best_partial = Vec::new();
        for &threshold in thresholds {
            let candidates = chess_candidates(&img, &resp, threshold, &self.params);
            log::trace!("threshold {} -> {} candidates", threshold, candidates.len());
            match assemble_grid(&candidates, pattern) {
                Ok(mut corners) => {
                    if self.flags.contains(FindCornersFlags::ACCURACY) {
                        let sharp = prepare(gray, normalize, 0.0);
                        corner_sub_pix_adaptive(&sharp, &mut corners, pattern, TermCriteria::default());
                    }
                    return CornerSearch {
                        found: true,
                        corners,
                    };
                }
                Err(partial) => {
                    if partial.len() > best_partial.len() {
                        best_partial = partial;
                    }
                }
            }
        }
        CornerSearch {
            found: false,
            corners: best_partial,
        }
    }
}
