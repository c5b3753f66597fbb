use std::sync::Arc;

use nalgebra as na;
use tiny_solver::factors::Factor;

use crate::camera_model::{DIST_COEFFS, PinholeCamera, project_camera_point, rotate_point};

/// Split of the camera parameters into solver variables and constants.
///
/// Only free entries are handed to the solver: the `cam` block holds the free
/// subset of `[fx, fy, cx, cy]` and the `dist` block the free distortion
/// coefficients. A block with no free entry is left out of the problem.
#[derive(Debug, Clone)]
pub struct ParamLayout {
    intrinsics: [f64; 4],
    dist: [f64; DIST_COEFFS],
    free_intrinsics: Vec<usize>,
    free_dist: Vec<usize>,
    aspect: Option<f64>,
}

impl ParamLayout {
    /// `aspect = Some(fx / fy)` ties `fx` to `fy`; index 0 is then never free.
    pub fn new(
        camera: &PinholeCamera,
        fixed_intrinsics: &[usize],
        fixed_dist: &[usize],
        aspect: Option<f64>,
    ) -> ParamLayout {
        let free_intrinsics = (0..4)
            .filter(|i| !fixed_intrinsics.contains(i) && !(aspect.is_some() && *i == 0))
            .collect();
        let free_dist = (0..DIST_COEFFS).filter(|i| !fixed_dist.contains(i)).collect();
        ParamLayout {
            intrinsics: [camera.fx, camera.fy, camera.cx, camera.cy],
            dist: camera.dist,
            free_intrinsics,
            free_dist,
            aspect,
        }
    }

    /// Every parameter free.
    pub fn all_free(camera: &PinholeCamera) -> ParamLayout {
        ParamLayout::new(camera, &[], &[], None)
    }

    pub fn has_cam(&self) -> bool {
        !self.free_intrinsics.is_empty()
    }

    pub fn has_dist(&self) -> bool {
        !self.free_dist.is_empty()
    }

    pub fn cam_values(&self) -> na::DVector<f64> {
        na::DVector::from_iterator(self.free_intrinsics.len(), self.free_intrinsics.iter().map(|&i| self.intrinsics[i]))
    }

    pub fn dist_values(&self) -> na::DVector<f64> {
        na::DVector::from_iterator(self.free_dist.len(), self.free_dist.iter().map(|&i| self.dist[i]))
    }

    /// Names of the blocks a residual reads, in parameter order.
    pub fn variable_keys<'a>(&self, pose_key: &'a str, obj_key: Option<&'a str>) -> Vec<&'a str> {
        let mut keys = Vec::with_capacity(4);
        if self.has_cam() {
            keys.push("cam");
        }
        if self.has_dist() {
            keys.push("dist");
        }
        keys.push(pose_key);
        keys.extend(obj_key);
        keys
    }

    /// Full `[fx, fy, cx, cy]` and distortion vectors from the solver blocks.
    ///
    /// Returns the index of the first block after the camera ones.
    fn expand<T: na::RealField>(&self, params: &[na::DVector<T>]) -> (na::DVector<T>, na::DVector<T>, usize) {
        let mut intr = na::DVector::from_iterator(4, self.intrinsics.iter().map(|v| na::convert::<f64, T>(*v)));
        let mut dist = na::DVector::from_iterator(DIST_COEFFS, self.dist.iter().map(|v| na::convert::<f64, T>(*v)));
        let mut next = 0;
        if self.has_cam() {
            for (k, &i) in self.free_intrinsics.iter().enumerate() {
                intr[i] = params[next][k].clone();
            }
            next += 1;
        }
        if self.has_dist() {
            for (k, &i) in self.free_dist.iter().enumerate() {
                dist[i] = params[next][k].clone();
            }
            next += 1;
        }
        if let Some(a) = self.aspect {
            intr[0] = intr[1].clone() * na::convert::<f64, T>(a);
        }
        (intr, dist, next)
    }

    /// Camera with the solver's values written back over the constants.
    pub fn camera(&self, cam: Option<&na::DVector<f64>>, dist: Option<&na::DVector<f64>>) -> PinholeCamera {
        let mut params = Vec::with_capacity(2);
        if self.has_cam() {
            params.push(cam.cloned().unwrap_or_else(|| self.cam_values()));
        }
        if self.has_dist() {
            params.push(dist.cloned().unwrap_or_else(|| self.dist_values()));
        }
        let (intr, d, _) = self.expand(&params);
        let mut camera = PinholeCamera::new(intr[0], intr[1], intr[2], intr[3]);
        for (c, v) in camera.dist.iter_mut().zip(d.iter()) {
            *c = *v;
        }
        camera
    }
}

fn pose_parts<T: na::RealField>(pose: &na::DVector<T>) -> (na::Vector3<T>, na::Vector3<T>) {
    let rvec = na::Vector3::new(pose[0].clone(), pose[1].clone(), pose[2].clone());
    let tvec = na::Vector3::new(pose[3].clone(), pose[4].clone(), pose[5].clone());
    (rvec, tvec)
}

fn residual<T: na::RealField>(
    cam: &na::DVector<T>,
    dist: &na::DVector<T>,
    pose: &na::DVector<T>,
    p3d: &na::Vector3<T>,
    p2d: &na::Vector2<f64>,
) -> na::DVector<T> {
    let (rvec, tvec) = pose_parts(pose);
    let pc = rotate_point(&rvec, p3d) + tvec;
    let uv = project_camera_point(cam, dist, &pc);
    let u: T = na::convert(p2d.x);
    let v: T = na::convert(p2d.y);
    na::dvector![uv[0].clone() - u, uv[1].clone() - v]
}

/// Reprojection of a fixed board point.
///
/// Parameter blocks: `[cam?, dist?, pose]`, see [`ParamLayout::variable_keys`].
#[derive(Debug, Clone)]
pub struct ReprojectionFactor {
    pub p3d: na::Vector3<f64>,
    pub p2d: na::Vector2<f64>,
    pub layout: Arc<ParamLayout>,
}

impl ReprojectionFactor {
    pub fn new(p3d: &glam::Vec3, p2d: &glam::Vec2, layout: Arc<ParamLayout>) -> ReprojectionFactor {
        ReprojectionFactor {
            p3d: na::Vector3::new(p3d.x as f64, p3d.y as f64, p3d.z as f64),
            p2d: na::Vector2::new(p2d.x as f64, p2d.y as f64),
            layout,
        }
    }
}

impl<T: na::RealField> Factor<T> for ReprojectionFactor {
    fn residual_func(&self, params: &[na::DVector<T>]) -> na::DVector<T> {
        let (cam, dist, next) = self.layout.expand(params);
        let p3d = self.p3d.map(|v| na::convert::<f64, T>(v));
        residual(&cam, &dist, &params[next], &p3d, &self.p2d)
    }
}

/// Reprojection of a board point that is itself being estimated.
///
/// Parameter blocks: `[cam?, dist?, pose, obj]`.
#[derive(Debug, Clone)]
pub struct ReleasedObjectFactor {
    pub p2d: na::Vector2<f64>,
    pub layout: Arc<ParamLayout>,
}

impl ReleasedObjectFactor {
    pub fn new(p2d: &glam::Vec2, layout: Arc<ParamLayout>) -> ReleasedObjectFactor {
        ReleasedObjectFactor {
            p2d: na::Vector2::new(p2d.x as f64, p2d.y as f64),
            layout,
        }
    }
}

impl<T: na::RealField> Factor<T> for ReleasedObjectFactor {
    fn residual_func(&self, params: &[na::DVector<T>]) -> na::DVector<T> {
        let (cam, dist, next) = self.layout.expand(params);
        let obj = &params[next + 1];
        let p3d = na::Vector3::new(obj[0].clone(), obj[1].clone(), obj[2].clone());
        residual(&cam, &dist, &params[next], &p3d, &self.p2d)
    }
}
