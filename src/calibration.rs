//! Planar camera calibration with optional release of the board points.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::{Vec2, Vec3};
use log::{debug, info, trace};
use nalgebra as na;
use tiny_solver::LevenbergMarquardtOptimizer;
use tiny_solver::linear::sparse::LinearSolverType;
use tiny_solver::optimizer::{Optimizer, OptimizerOptions};
use tiny_solver::problem::Problem;

use crate::camera_model::{DIST_COEFFS, PinholeCamera};
use crate::error::CalibError;
use crate::flags::CalibFlags;
use crate::optimization::{
    ParamLayout, ReleasedObjectFactor, ReprojectionFactor, find_homography, focal_from_homographies, init_pose,
};
use crate::types::RvecTvec;
use crate::util::{reprojection_sq_errors, rms};

const MAX_ITERATIONS: usize = 100;
const PLANAR_EPS: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct CalibrationResult {
    pub camera: PinholeCamera,
    /// Board pose per view, in input order.
    pub rvecs_tvecs: Vec<RvecTvec>,
    /// Refined board template in release mode.
    pub new_object_points: Option<Vec<Vec3>>,
    /// `sqrt(sum of squared residuals / number of points)` over every view.
    pub rms: f64,
    pub per_view_errors: Vec<f64>,
}

impl CalibrationResult {
    pub fn camera_matrix(&self) -> na::Matrix3<f64> {
        self.camera.matrix()
    }

    pub fn dist_coeffs(&self) -> [f64; DIST_COEFFS] {
        self.camera.dist
    }
}

/// Initial camera matrix handed to the calibration: identity with the
/// aspect ratio in the top-left entry when it is held fixed.
pub fn initial_camera_matrix(flags: CalibFlags, aspect_ratio: f64) -> na::Matrix3<f64> {
    let mut k = na::Matrix3::identity();
    if flags.contains(CalibFlags::FIX_ASPECT_RATIO) {
        k[(0, 0)] = aspect_ratio;
    }
    k
}

fn validate(
    object_points: &[Vec<Vec3>],
    image_points: &[Vec<Vec2>],
    fixed_point: Option<usize>,
) -> Result<(), CalibError> {
    if object_points.is_empty() || image_points.is_empty() {
        return Err(CalibError::NoViews);
    }
    if object_points.len() != image_points.len() {
        return Err(CalibError::PointCountMismatch {
            view: object_points.len().min(image_points.len()),
            object: object_points.len(),
            image: image_points.len(),
        });
    }
    for (view, (obj, img)) in object_points.iter().zip(image_points).enumerate() {
        if obj.len() != img.len() {
            return Err(CalibError::PointCountMismatch {
                view,
                object: obj.len(),
                image: img.len(),
            });
        }
        if obj.len() < 4 {
            return Err(CalibError::TooFewPoints {
                view,
                count: obj.len(),
            });
        }
    }
    if let Some(index) = fixed_point {
        let n = object_points[0].len();
        if index < 1 || index + 1 >= n {
            return Err(CalibError::FixedPointOutOfRange { index, upper: n - 1 });
        }
        if object_points.iter().any(|o| o != &object_points[0]) {
            return Err(CalibError::TemplateMismatch);
        }
    }
    Ok(())
}

fn initial_camera(
    object_points: &[Vec<Vec3>],
    image_points: &[Vec<Vec2>],
    image_size: (u32, u32),
    camera_matrix: &na::Matrix3<f64>,
    dist_coeffs: &[f64],
    flags: CalibFlags,
) -> Result<PinholeCamera, CalibError> {
    let mut dist = [0.0; DIST_COEFFS];
    if flags.contains(CalibFlags::USE_INTRINSIC_GUESS) {
        for (d, v) in dist.iter_mut().zip(dist_coeffs) {
            *d = *v;
        }
        let camera = PinholeCamera::from_matrix(camera_matrix, dist);
        if !(camera.fx > 0.0 && camera.fy > 0.0) {
            return Err(CalibError::Initialisation(
                "intrinsic guess has non-positive focal length".to_string(),
            ));
        }
        return Ok(camera);
    }

    let cx = (image_size.0 as f64 - 1.0) * 0.5;
    let cy = (image_size.1 as f64 - 1.0) * 0.5;
    let aspect = if flags.contains(CalibFlags::FIX_ASPECT_RATIO) {
        let r = camera_matrix[(0, 0)] / camera_matrix[(1, 1)];
        if !(r.is_finite() && r > 0.0) {
            return Err(CalibError::Initialisation(format!("invalid aspect ratio {}", r)));
        }
        Some(r)
    } else {
        None
    };

    let homographies: Vec<na::Matrix3<f64>> = object_points
        .iter()
        .zip(image_points)
        .filter_map(|(obj, img)| {
            let src: Vec<_> = obj.iter().map(|p| na::Vector2::new(p.x as f64, p.y as f64)).collect();
            let dst: Vec<_> = img.iter().map(|p| na::Vector2::new(p.x as f64, p.y as f64)).collect();
            find_homography(&src, &dst)
        })
        .collect();
    if homographies.is_empty() {
        return Err(CalibError::Initialisation("no view gives a homography".to_string()));
    }
    let (fx, fy) = focal_from_homographies(&homographies, cx, cy, aspect)?;
    debug!("initial focal lengths fx {:.3} fy {:.3}", fx, fy);
    Ok(PinholeCamera::new(fx, fy, cx, cy).with_distortion(dist))
}

/// Distortion entries held constant under `flags`.
fn fixed_distortion(flags: CalibFlags) -> Vec<usize> {
    let mut fixed = Vec::new();
    if flags.contains(CalibFlags::FIX_K1) {
        fixed.push(0);
    }
    if flags.contains(CalibFlags::FIX_K2) {
        fixed.push(1);
    }
    if flags.contains(CalibFlags::ZERO_TANGENT_DIST) {
        fixed.extend([2, 3]);
    }
    if flags.contains(CalibFlags::FIX_K3) {
        fixed.push(4);
    }
    if !flags.contains(CalibFlags::RATIONAL_MODEL) {
        fixed.extend([5, 6, 7]);
    } else {
        if flags.contains(CalibFlags::FIX_K4) {
            fixed.push(5);
        }
        if flags.contains(CalibFlags::FIX_K5) {
            fixed.push(6);
        }
        if flags.contains(CalibFlags::FIX_K6) {
            fixed.push(7);
        }
    }
    fixed
}

fn to_glam(v: &na::DVector<f64>) -> Vec3 {
    Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32)
}

/// Calibrates a pinhole camera from planar views of one board.
///
/// `fixed_point = Some(i)` releases the board: every object point except the
/// first, the `i`-th and the last becomes a free variable, and the refined
/// template is returned. All views must then share one template.
pub fn calibrate_camera_ro(
    object_points: &[Vec<Vec3>],
    image_points: &[Vec<Vec2>],
    image_size: (u32, u32),
    fixed_point: Option<usize>,
    camera_matrix: &na::Matrix3<f64>,
    dist_coeffs: &[f64],
    flags: CalibFlags,
) -> Result<CalibrationResult, CalibError> {
    validate(object_points, image_points, fixed_point)?;

    let planar = object_points.iter().flatten().all(|p| p.z.abs() < PLANAR_EPS);
    if !planar && !flags.contains(CalibFlags::USE_INTRINSIC_GUESS) {
        return Err(CalibError::NonPlanarTarget);
    }

    let mut camera = initial_camera(object_points, image_points, image_size, camera_matrix, dist_coeffs, flags)?;
    if flags.contains(CalibFlags::ZERO_TANGENT_DIST) {
        camera.dist[2] = 0.0;
        camera.dist[3] = 0.0;
    }
    if !flags.contains(CalibFlags::RATIONAL_MODEL) {
        camera.dist[5..].iter_mut().for_each(|d| *d = 0.0);
    }
    let aspect = flags
        .contains(CalibFlags::FIX_ASPECT_RATIO)
        .then(|| camera.fx / camera.fy);

    let mut fixed_intrinsics = Vec::new();
    if flags.contains(CalibFlags::FIX_FOCAL_LENGTH) {
        fixed_intrinsics.extend([0, 1]);
    }
    if flags.contains(CalibFlags::FIX_PRINCIPAL_POINT) {
        fixed_intrinsics.extend([2, 3]);
    }
    let layout = Arc::new(ParamLayout::new(&camera, &fixed_intrinsics, &fixed_distortion(flags), aspect));

    let mut problem = Problem::new();
    let mut initial_values = HashMap::<String, na::DVector<f64>>::new();
    if layout.has_cam() {
        initial_values.insert("cam".to_string(), layout.cam_values());
    }
    if layout.has_dist() {
        initial_values.insert("dist".to_string(), layout.dist_values());
    }

    let released: HashSet<usize> = match fixed_point {
        Some(fixed) => {
            let n = object_points[0].len();
            (1..n - 1).filter(|&i| i != fixed).collect()
        }
        None => HashSet::new(),
    };
    for &i in &released {
        let p = object_points[0][i];
        initial_values.insert(
            format!("obj/{}", i),
            na::dvector![p.x as f64, p.y as f64, p.z as f64],
        );
    }

    for (view, (obj, img)) in object_points.iter().zip(image_points).enumerate() {
        let pose = init_pose(&camera, obj, img)
            .ok_or_else(|| CalibError::Initialisation(format!("no initial pose for view {}", view)))?;
        let pose_key = format!("pose/{}", view);
        initial_values.insert(pose_key.clone(), pose.to_dvec());

        for (i, (p3d, p2d)) in obj.iter().zip(img).enumerate() {
            if released.contains(&i) {
                let obj_key = format!("obj/{}", i);
                problem.add_residual_block(
                    2,
                    &layout.variable_keys(pose_key.as_str(), Some(obj_key.as_str())),
                    Box::new(ReleasedObjectFactor::new(p2d, layout.clone())),
                    None,
                );
            } else {
                problem.add_residual_block(
                    2,
                    &layout.variable_keys(pose_key.as_str(), None),
                    Box::new(ReprojectionFactor::new(p3d, p2d, layout.clone())),
                    None,
                );
            }
        }
    }
    trace!("{} variables in the problem", initial_values.len());

    let linear_solver_type = if flags.contains(CalibFlags::USE_LU) {
        LinearSolverType::SparseCholesky
    } else {
        LinearSolverType::SparseQR
    };
    let options = OptimizerOptions {
        max_iteration: MAX_ITERATIONS,
        linear_solver_type,
        ..Default::default()
    };
    let optimizer = LevenbergMarquardtOptimizer::default();
    let result = optimizer
        .optimize(&problem, &initial_values, Some(options))
        .ok_or(CalibError::SolverFailed)?;

    let refined = layout.camera(result.get("cam"), result.get("dist"));
    if !(refined.fx > 0.0 && refined.fy > 0.0 && refined.fx.is_finite() && refined.fy.is_finite()) {
        return Err(CalibError::SolverFailed);
    }

    let mut rvecs_tvecs = Vec::with_capacity(object_points.len());
    for view in 0..object_points.len() {
        let pose = result
            .get(&format!("pose/{}", view))
            .ok_or(CalibError::SolverFailed)?;
        rvecs_tvecs.push(RvecTvec::from_dvec(pose));
    }

    let new_object_points = match fixed_point {
        Some(_) => {
            let mut points = object_points[0].clone();
            for &i in &released {
                let v = result.get(&format!("obj/{}", i)).ok_or(CalibError::SolverFailed)?;
                points[i] = to_glam(v);
            }
            Some(points)
        }
        None => None,
    };

    let mut total_sq = 0.0;
    let mut total_points = 0;
    let mut per_view_errors = Vec::with_capacity(object_points.len());
    for (view, img) in image_points.iter().enumerate() {
        let obj = new_object_points.as_ref().unwrap_or(&object_points[view]);
        let sq = reprojection_sq_errors(&refined, &rvecs_tvecs[view], obj, img);
        let view_sum: f64 = sq.iter().sum();
        per_view_errors.push(rms(view_sum, sq.len()));
        total_sq += view_sum;
        total_points += sq.len();
    }
    let rms_error = rms(total_sq, total_points);
    info!("calibration finished, rms {:.5} px over {} points", rms_error, total_points);

    Ok(CalibrationResult {
        camera: refined,
        rvecs_tvecs,
        new_object_points,
        rms: rms_error,
        per_view_errors,
    })
}
