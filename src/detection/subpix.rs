//! Gradient-orthogonality corner refinement in the manner of `cornerSubPix`.
//!
//! For a true corner `q`, every gradient `g` at a nearby point `p` is
//! orthogonal to `p - q`. Summing `g gᵀ (p - q) = 0` over a Gaussian-weighted
//! window gives a 2x2 system solved repeatedly until the shift is below `eps`.

use glam::Vec2;

use super::PatternSize;
use super::image::FloatImage;

#[derive(Debug, Clone, Copy)]
pub struct TermCriteria {
    pub max_iter: usize,
    pub epsilon: f32,
}

impl Default for TermCriteria {
    fn default() -> Self {
        TermCriteria {
            max_iter: 30,
            epsilon: 1e-4,
        }
    }
}

fn refine_one(img: &FloatImage, start: Vec2, half_win: usize, criteria: TermCriteria) -> Vec2 {
    let hw = half_win as i32;
    let inv = 1.0 / half_win.max(1) as f32;
    let mut weights = Vec::with_capacity((2 * half_win + 1).pow(2));
    for dy in -hw..=hw {
        for dx in -hw..=hw {
            let u = dx as f32 * inv;
            let v = dy as f32 * inv;
            weights.push((-u * u).exp() * (-v * v).exp());
        }
    }

    let mut q = start;
    for _ in 0..criteria.max_iter {
        let (mut a11, mut a12, mut a22, mut b1, mut b2) = (0.0f64, 0.0f64, 0.0f64, 0.0f64, 0.0f64);
        let mut k = 0;
        for dy in -hw..=hw {
            for dx in -hw..=hw {
                let px = q.x + dx as f32;
                let py = q.y + dy as f32;
                let gx = 0.5 * (img.sample(px + 1.0, py) - img.sample(px - 1.0, py));
                let gy = 0.5 * (img.sample(px, py + 1.0) - img.sample(px, py - 1.0));
                let w = weights[k] as f64;
                k += 1;
                let gxx = (gx * gx) as f64 * w;
                let gxy = (gx * gy) as f64 * w;
                let gyy = (gy * gy) as f64 * w;
                a11 += gxx;
                a12 += gxy;
                a22 += gyy;
                b1 += gxx * px as f64 + gxy * py as f64;
                b2 += gxy * px as f64 + gyy * py as f64;
            }
        }
        let det = a11 * a22 - a12 * a12;
        if det.abs() < 1e-12 {
            break;
        }
        let next = Vec2::new(
            ((a22 * b1 - a12 * b2) / det) as f32,
            ((a11 * b2 - a12 * b1) / det) as f32,
        );
        let shift = next - q;
        q = next;
        if shift.length_squared() <= criteria.epsilon * criteria.epsilon {
            break;
        }
    }

    let moved = q - start;
    if !q.is_finite() || moved.x.abs() > half_win as f32 || moved.y.abs() > half_win as f32 {
        start
    } else {
        q
    }
}

/// Refines every corner in place with a fixed `(2 * half_win + 1)` window.
///
/// A corner that leaves its search window keeps its original position.
pub fn corner_sub_pix(img: &FloatImage, corners: &mut [Vec2], half_win: usize, criteria: TermCriteria) {
    for c in corners.iter_mut() {
        *c = refine_one(img, *c, half_win, criteria);
    }
}

/// Refines grid-ordered corners with a window sized from the local square pitch.
pub fn corner_sub_pix_adaptive(img: &FloatImage, corners: &mut [Vec2], pattern: PatternSize, criteria: TermCriteria) {
    if corners.len() != pattern.cols * pattern.rows {
        return;
    }
    let original = corners.to_vec();
    for r in 0..pattern.rows {
        for c in 0..pattern.cols {
            let idx = r * pattern.cols + c;
            let mut pitch = f32::MAX;
            let neighbours = [
                (c > 0).then(|| idx - 1),
                (c + 1 < pattern.cols).then(|| idx + 1),
                (r > 0).then(|| idx - pattern.cols),
                (r + 1 < pattern.rows).then(|| idx + pattern.cols),
            ];
            for n in neighbours.into_iter().flatten() {
                pitch = pitch.min(original[idx].distance(original[n]));
            }
            let half_win = if pitch.is_finite() && pitch < f32::MAX {
                ((0.3 * pitch) as usize).clamp(2, 11)
            } else {
                5
            };
            corners[idx] = refine_one(img, original[idx], half_win, criteria);
        }
    }
}
