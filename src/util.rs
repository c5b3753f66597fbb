use glam::{Vec2, Vec3};
use image::DynamicImage;
use nalgebra as na;
use rayon::prelude::*;

use crate::camera_model::{PinholeCamera, rotate_point};
use crate::types::RvecTvec;

/// Squared reprojection distance of every board point in one view.
pub fn reprojection_sq_errors(camera: &PinholeCamera, pose: &RvecTvec, p3ds: &[Vec3], p2ds: &[Vec2]) -> Vec<f64> {
    let (r, t) = (pose.na_rvec(), pose.na_tvec());
    p3ds.iter()
        .zip(p2ds)
        .map(|(p3, p2)| {
            let p = na::Vector3::new(p3.x as f64, p3.y as f64, p3.z as f64);
            let uv = camera.project_one(&(rotate_point(&r, &p) + t));
            (uv.x - p2.x as f64).powi(2) + (uv.y - p2.y as f64).powi(2)
        })
        .collect()
}

/// `sqrt(sum / count)`, zero for an empty set.
pub fn rms(sum_sq: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { (sum_sq / count as f64).sqrt() }
}

/// Average and median of the per-point reprojection distances.
pub fn reprojection_stats(
    camera: &PinholeCamera,
    poses: &[RvecTvec],
    object_points: &[Vec<Vec3>],
    image_points: &[Vec<Vec2>],
) -> (f64, f64) {
    let mut errors: Vec<f64> = poses
        .iter()
        .zip(object_points.iter().zip(image_points))
        .flat_map(|(pose, (obj, img))| reprojection_sq_errors(camera, pose, obj, img))
        .map(f64::sqrt)
        .collect();
    if errors.is_empty() {
        return (0.0, 0.0);
    }
    errors.sort_by(|a, b| a.total_cmp(b));
    let avg = errors.iter().sum::<f64>() / errors.len() as f64;
    (avg, errors[errors.len() / 2])
}

/// Per-pixel source coordinates that undo the lens distortion.
///
/// Maps are `height x width`; the output keeps the camera matrix.
pub fn init_undistort_map(camera: &PinholeCamera, w_h: (u32, u32)) -> (na::DMatrix<f32>, na::DMatrix<f32>) {
    let (w, h) = (w_h.0 as usize, w_h.1 as usize);
    let (xs, ys): (Vec<f32>, Vec<f32>) = (0..w * h)
        .into_par_iter()
        .map(|idx| {
            let (x, y) = ((idx % w) as f64, (idx / w) as f64);
            let p = na::Vector3::new((x - camera.cx) / camera.fx, (y - camera.cy) / camera.fy, 1.0);
            let uv = camera.project_one(&p);
            (uv.x as f32, uv.y as f32)
        })
        .unzip();
    (
        na::DMatrix::from_row_slice(h, w, &xs),
        na::DMatrix::from_row_slice(h, w, &ys),
    )
}

/// Nearest-neighbour lookup through precomputed maps; outside pixels are black.
pub fn remap(src: &DynamicImage, map_x: &na::DMatrix<f32>, map_y: &na::DMatrix<f32>) -> DynamicImage {
    let (rows, cols) = map_x.shape();
    let rgb = src.to_rgb8();
    let out = image::RgbImage::from_par_fn(cols as u32, rows as u32, |x, y| {
        let (r, c) = (y as usize, x as usize);
        let (sx, sy) = (map_x[(r, c)], map_y[(r, c)]);
        if !sx.is_finite() || !sy.is_finite() {
            return image::Rgb([0, 0, 0]);
        }
        let (sx, sy) = (sx.round(), sy.round());
        if sx < 0.0 || sy < 0.0 || sx as u32 >= rgb.width() || sy as u32 >= rgb.height() {
            image::Rgb([0, 0, 0])
        } else {
            *rgb.get_pixel(sx as u32, sy as u32)
        }
    });
    DynamicImage::ImageRgb8(out)
}
