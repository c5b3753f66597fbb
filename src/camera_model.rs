//! Pinhole camera with the rational radial + tangential distortion model.
//!
//! Distortion coefficients are ordered `k1, k2, p1, p2, k3, k4, k5, k6`.
//! Projection functions are generic over `RealField` so the same code runs
//! on `f64` and on the dual numbers used for autodiff.

use nalgebra as na;
use serde::{Deserialize, Serialize};

pub const DIST_COEFFS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinholeCamera {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub dist: [f64; DIST_COEFFS],
}

impl PinholeCamera {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> PinholeCamera {
        PinholeCamera {
            fx,
            fy,
            cx,
            cy,
            dist: [0.0; DIST_COEFFS],
        }
    }

    pub fn with_distortion(mut self, dist: [f64; DIST_COEFFS]) -> PinholeCamera {
        self.dist = dist;
        self
    }

    pub fn from_matrix(k: &na::Matrix3<f64>, dist: [f64; DIST_COEFFS]) -> PinholeCamera {
        PinholeCamera {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
            dist,
        }
    }

    pub fn matrix(&self) -> na::Matrix3<f64> {
        na::Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    pub fn intrinsics(&self) -> na::DVector<f64> {
        na::dvector![self.fx, self.fy, self.cx, self.cy]
    }

    pub fn distortion(&self) -> na::DVector<f64> {
        na::DVector::from_row_slice(&self.dist)
    }

    /// Projects a point already expressed in the camera frame.
    pub fn project_one(&self, p: &na::Vector3<f64>) -> na::Vector2<f64> {
        project_camera_point(&self.intrinsics(), &self.distortion(), p)
    }

    /// Projects a board point seen under `pose`.
    pub fn project_board_point(
        &self,
        rvec: &na::Vector3<f64>,
        tvec: &na::Vector3<f64>,
        p: &na::Vector3<f64>,
    ) -> na::Vector2<f64> {
        let pc = rotate_point(rvec, p) + tvec;
        self.project_one(&pc)
    }

    /// Maps a pixel to undistorted normalised coordinates.
    ///
    /// Uses the same fixed-point iteration as OpenCV's `undistortPoints`.
    pub fn undistort_normalized(&self, uv: &na::Vector2<f64>) -> na::Vector2<f64> {
        let xd = (uv.x - self.cx) / self.fx;
        let yd = (uv.y - self.cy) / self.fy;
        let [k1, k2, p1, p2, k3, k4, k5, k6] = self.dist;
        let (mut x, mut y) = (xd, yd);
        for _ in 0..20 {
            let r2 = x * x + y * y;
            let icdist = (1.0 + ((k6 * r2 + k5) * r2 + k4) * r2)
                / (1.0 + ((k3 * r2 + k2) * r2 + k1) * r2);
            if !icdist.is_finite() || icdist <= 0.0 {
                return na::Vector2::new(xd, yd);
            }
            let dx = 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
            let dy = p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
            x = (xd - dx) * icdist;
            y = (yd - dy) * icdist;
        }
        na::Vector2::new(x, y)
    }
}

/// Rotates `p` by a Rodrigues vector.
///
/// Falls back to the first-order form near zero so autodiff stays finite.
pub fn rotate_point<T: na::RealField>(rvec: &na::Vector3<T>, p: &na::Vector3<T>) -> na::Vector3<T> {
    let theta2 = rvec.norm_squared();
    let eps: T = na::convert(1e-14);
    if theta2 > eps {
        let theta = theta2.sqrt();
        let k = rvec.clone() / theta.clone();
        let (s, c) = (theta.clone().sin(), theta.cos());
        let kxp = k.cross(p);
        let kdp = k.dot(p);
        p.clone() * c.clone() + kxp * s + k * (kdp * (T::one() - c))
    } else {
        p.clone() + rvec.cross(p)
    }
}

/// Applies the rational + tangential model to normalised coordinates.
pub fn distort<T: na::RealField>(x: T, y: T, dist: &[T]) -> (T, T) {
    let zero = T::zero();
    let d = |i: usize| dist.get(i).cloned().unwrap_or_else(|| zero.clone());
    let (k1, k2, p1, p2, k3, k4, k5, k6) = (d(0), d(1), d(2), d(3), d(4), d(5), d(6), d(7));
    let two: T = na::convert(2.0);
    let r2 = x.clone() * x.clone() + y.clone() * y.clone();
    let r4 = r2.clone() * r2.clone();
    let r6 = r4.clone() * r2.clone();
    let num = T::one() + k1 * r2.clone() + k2 * r4.clone() + k3 * r6.clone();
    let den = T::one() + k4 * r2.clone() + k5 * r4 + k6 * r6;
    let radial = num / den;
    let xy = x.clone() * y.clone();
    let xd = x.clone() * radial.clone()
        + two.clone() * p1.clone() * xy.clone()
        + p2.clone() * (r2.clone() + two.clone() * x.clone() * x);
    let yd = y.clone() * radial
        + p1 * (r2 + two.clone() * y.clone() * y)
        + two * p2 * xy;
    (xd, yd)
}

/// Projects a camera-frame point with `intr = [fx, fy, cx, cy]`.
pub fn project_camera_point<T: na::RealField>(
    intr: &na::DVector<T>,
    dist: &na::DVector<T>,
    pc: &na::Vector3<T>,
) -> na::Vector2<T> {
    let fx = intr[0].clone();
    let fy = intr[1].clone();
    let x = pc.x.clone() / pc.z.clone();
    let y = pc.y.clone() / pc.z.clone();
    let (xd, yd) = distort(x, y, dist.as_slice());
    na::Vector2::new(fx * xd + intr[2].clone(), fy * yd + intr[3].clone())
}
