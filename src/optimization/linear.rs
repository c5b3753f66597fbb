use log::debug;
use nalgebra as na;
use sqpnp_simple::sqpnp_solve_glam;

use super::homography::{find_homography, pose_from_homography};
use crate::camera_model::{PinholeCamera, rotate_point};
use crate::types::RvecTvec;

fn mean_reprojection(camera: &PinholeCamera, pose: &RvecTvec, p3ds: &[glam::Vec3], p2ds: &[glam::Vec2]) -> f64 {
    let (r, t) = (pose.na_rvec(), pose.na_tvec());
    let mut total = 0.0;
    for (p3, p2) in p3ds.iter().zip(p2ds) {
        let p = na::Vector3::new(p3.x as f64, p3.y as f64, p3.z as f64);
        let pc = rotate_point(&r, &p) + t;
        if pc.z <= 0.0 {
            return f64::INFINITY;
        }
        let uv = camera.project_one(&pc);
        total += ((uv.x - p2.x as f64).powi(2) + (uv.y - p2.y as f64).powi(2)).sqrt();
    }
    total / p3ds.len().max(1) as f64
}

/// Initial board pose for one view.
///
/// Runs SQPnP on undistorted normalised points and, for planar boards, a
/// homography decomposition; the candidate with the lower reprojection error
/// wins.
pub fn init_pose(camera: &PinholeCamera, p3ds: &[glam::Vec3], p2ds: &[glam::Vec2]) -> Option<RvecTvec> {
    let normalized: Vec<na::Vector2<f64>> = p2ds
        .iter()
        .map(|p| camera.undistort_normalized(&na::Vector2::new(p.x as f64, p.y as f64)))
        .collect();
    let mut candidates = Vec::with_capacity(2);

    let p3ds_v = p3ds.to_vec();
    let p2ds_z: Vec<glam::Vec2> = normalized.iter().map(|p| glam::Vec2::new(p.x as f32, p.y as f32)).collect();
    if let Some((r, t)) = sqpnp_solve_glam(&p3ds_v, &p2ds_z) {
        let pose = RvecTvec::new(&[r.0, r.1, r.2], &[t.0, t.1, t.2]);
        if pose.rvec.iter().chain(pose.tvec.iter()).all(|v| v.is_finite()) {
            candidates.push(pose);
        }
    } else {
        debug!("sqpnp failed");
    }

    if p3ds.iter().all(|p| p.z.abs() < 1e-6) {
        let board: Vec<na::Vector2<f64>> = p3ds.iter().map(|p| na::Vector2::new(p.x as f64, p.y as f64)).collect();
        if let Some((r, t)) = find_homography(&board, &normalized).and_then(|h| pose_from_homography(&h)) {
            candidates.push(RvecTvec::new(&[r.x, r.y, r.z], &[t.x, t.y, t.z]));
        }
    }

    candidates
        .into_iter()
        .map(|pose| (mean_reprojection(camera, &pose, p3ds, p2ds), pose))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(err, pose)| {
            debug!("initial pose error {:.3} px", err);
            pose
        })
}
