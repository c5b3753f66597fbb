//! Rendering of chessboard views through a known camera.

use glam::Vec2;
use image::GrayImage;
use nalgebra as na;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::board::{BoardConfig, ObjectTemplate};
use crate::camera_model::PinholeCamera;
use crate::types::RvecTvec;

const BLACK: f64 = 30.0;
const WHITE: f64 = 220.0;
const SUPERSAMPLE: u32 = 3;

/// One rendered view and the ground truth that produced it.
pub struct SyntheticView {
    pub image: GrayImage,
    pub pose: RvecTvec,
    /// Projected inner corners, row-major.
    pub corners: Vec<Vec2>,
}

fn board_intensity(board: &BoardConfig, x: f64, y: f64) -> f64 {
    let s = board.square_size as f64;
    let (cols, rows) = (board.cols as f64, board.rows as f64);
    if x < -s || y < -s || x >= cols * s || y >= rows * s {
        return WHITE;
    }
    let cell = (x / s).floor() as i64 + (y / s).floor() as i64;
    if cell.rem_euclid(2) == 0 { BLACK } else { WHITE }
}

/// Renders the board seen by `camera` under `pose` onto a white background.
///
/// Squares span `[-S, C * S) x [-S, R * S)` so the inner corners sit at
/// `(c * S, r * S)`.
pub fn render_chessboard(camera: &PinholeCamera, board: &BoardConfig, pose: &RvecTvec, w_h: (u32, u32)) -> GrayImage {
    let rot = na::Rotation3::new(pose.na_rvec());
    let t = pose.na_tvec();
    let normal = rot * na::Vector3::z();
    let plane_d = normal.dot(&t);
    let inv_rot = rot.inverse();
    let step = 1.0 / SUPERSAMPLE as f64;

    GrayImage::from_par_fn(w_h.0, w_h.1, |px, py| {
        let mut acc = 0.0;
        for sy in 0..SUPERSAMPLE {
            for sx in 0..SUPERSAMPLE {
                let u = px as f64 - 0.5 + (sx as f64 + 0.5) * step;
                let v = py as f64 - 0.5 + (sy as f64 + 0.5) * step;
                let n = camera.undistort_normalized(&na::Vector2::new(u, v));
                let ray = na::Vector3::new(n.x, n.y, 1.0);
                let denom = normal.dot(&ray);
                let value = if denom.abs() < 1e-12 {
                    WHITE
                } else {
                    let lambda = plane_d / denom;
                    if lambda <= 0.0 {
                        WHITE
                    } else {
                        let pb = inv_rot * (ray * lambda - t);
                        board_intensity(board, pb.x, pb.y)
                    }
                };
                acc += value;
            }
        }
        let mean = acc / (SUPERSAMPLE * SUPERSAMPLE) as f64;
        image::Luma([mean.round().clamp(0.0, 255.0) as u8])
    })
}

/// Projects every template point of the board under `pose`.
pub fn project_template(camera: &PinholeCamera, template: &ObjectTemplate, pose: &RvecTvec) -> Vec<Vec2> {
    let (r, t) = (pose.na_rvec(), pose.na_tvec());
    template
        .points
        .iter()
        .map(|p| {
            let uv = camera.project_board_point(&r, &t, &na::Vector3::new(p.x as f64, p.y as f64, p.z as f64));
            Vec2::new(uv.x as f32, uv.y as f32)
        })
        .collect()
}

/// Deterministic tilted poses keeping the board centred in front of the camera.
pub fn random_poses(board: &BoardConfig, count: usize, distance: f64, seed: u64) -> Vec<RvecTvec> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let s = board.square_size as f64;
    let centre = na::Vector3::new(
        s * (board.cols as f64 - 1.0) * 0.5,
        s * (board.rows as f64 - 1.0) * 0.5,
        0.0,
    );
    (0..count)
        .map(|_| {
            let tilt = |rng: &mut ChaCha8Rng| {
                let m: f64 = rng.random_range(0.2..0.4);
                if rng.random_bool(0.5) { m } else { -m }
            };
            let rx = tilt(&mut rng);
            let ry = tilt(&mut rng);
            let rz: f64 = rng.random_range(-0.15..0.15);
            let rvec = na::Vector3::new(rx, ry, rz);
            let rot = na::Rotation3::new(rvec);
            let z = distance * rng.random_range(0.95..1.1f64);
            let shift = na::Vector3::new(rng.random_range(-0.05..0.05f64) * z, rng.random_range(-0.05..0.05f64) * z, z);
            let t = shift - rot * centre;
            RvecTvec::new(&[rvec.x, rvec.y, rvec.z], &[t.x, t.y, t.z])
        })
        .collect()
}

/// Renders `count` views of the board with ground-truth corners.
pub fn generate_views(
    camera: &PinholeCamera,
    board: &BoardConfig,
    w_h: (u32, u32),
    count: usize,
    distance: f64,
    seed: u64,
) -> Vec<SyntheticView> {
    let template = ObjectTemplate::new(board);
    random_poses(board, count, distance, seed)
        .into_iter()
        .map(|pose| SyntheticView {
            image: render_chessboard(camera, board, &pose, w_h),
            corners: project_template(camera, &template, &pose),
            pose,
        })
        .collect()
}
