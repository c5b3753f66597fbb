use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Board-to-camera pose as a Rodrigues rotation vector and a translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RvecTvec {
    pub rvec: [f64; 3],
    pub tvec: [f64; 3],
}

impl RvecTvec {
    pub fn new(rvec: &[f64; 3], tvec: &[f64; 3]) -> RvecTvec {
        RvecTvec {
            rvec: *rvec,
            tvec: *tvec,
        }
    }

    pub fn from_dvec(v: &na::DVector<f64>) -> RvecTvec {
        RvecTvec {
            rvec: [v[0], v[1], v[2]],
            tvec: [v[3], v[4], v[5]],
        }
    }

    /// Packs the pose as `[rx, ry, rz, tx, ty, tz]`.
    pub fn to_dvec(&self) -> na::DVector<f64> {
        na::dvector![
            self.rvec[0],
            self.rvec[1],
            self.rvec[2],
            self.tvec[0],
            self.tvec[1],
            self.tvec[2]
        ]
    }

    pub fn na_rvec(&self) -> na::Vector3<f64> {
        na::Vector3::from(self.rvec)
    }

    pub fn na_tvec(&self) -> na::Vector3<f64> {
        na::Vector3::from(self.tvec)
    }

    pub fn to_na_isometry3(&self) -> na::Isometry3<f64> {
        na::Isometry3::new(self.na_tvec(), self.na_rvec())
    }
}

pub trait ToRvecTvec {
    fn to_rvec_tvec(&self) -> RvecTvec;
}

impl ToRvecTvec for na::Isometry3<f64> {
    fn to_rvec_tvec(&self) -> RvecTvec {
        let r = self.rotation.scaled_axis();
        let t = self.translation.vector;
        RvecTvec::new(&[r.x, r.y, r.z], &[t.x, t.y, t.z])
    }
}
