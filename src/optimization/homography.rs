use log::debug;
use nalgebra as na;

use crate::error::CalibError;

/// Similarity transform moving points to zero mean and `sqrt(2)` mean distance.
fn normalization(points: &[na::Vector2<f64>]) -> na::Matrix3<f64> {
    let n = points.len().max(1) as f64;
    let mean = points.iter().fold(na::Vector2::zeros(), |acc, p| acc + p) / n;
    let spread = points.iter().map(|p| (p - mean).norm()).sum::<f64>() / n;
    let s = if spread > f64::EPSILON {
        std::f64::consts::SQRT_2 / spread
    } else {
        1.0
    };
    na::Matrix3::new(s, 0.0, -s * mean.x, 0.0, s, -s * mean.y, 0.0, 0.0, 1.0)
}

fn transform(t: &na::Matrix3<f64>, p: &na::Vector2<f64>) -> na::Vector2<f64> {
    let q = t * na::Vector3::new(p.x, p.y, 1.0);
    na::Vector2::new(q.x / q.z, q.y / q.z)
}

/// Normalised DLT homography mapping `src` onto `dst`.
///
/// The null vector is taken from the 9x9 normal matrix, so four
/// correspondences are enough.
pub fn find_homography(src: &[na::Vector2<f64>], dst: &[na::Vector2<f64>]) -> Option<na::Matrix3<f64>> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }
    let ts = normalization(src);
    let td = normalization(dst);

    let mut ata = na::SMatrix::<f64, 9, 9>::zeros();
    for (s, d) in src.iter().zip(dst) {
        let s = transform(&ts, s);
        let d = transform(&td, d);
        let r0 = na::SVector::<f64, 9>::from_column_slice(&[
            -s.x, -s.y, -1.0, 0.0, 0.0, 0.0, d.x * s.x, d.x * s.y, d.x,
        ]);
        let r1 = na::SVector::<f64, 9>::from_column_slice(&[
            0.0, 0.0, 0.0, -s.x, -s.y, -1.0, d.y * s.x, d.y * s.y, d.y,
        ]);
        ata += r0 * r0.transpose() + r1 * r1.transpose();
    }
    let eig = na::SymmetricEigen::new(ata);
    let (min_idx, _) = eig
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = eig.eigenvectors.column(min_idx);
    let hn = na::Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let h_mat = td.try_inverse()? * hn * ts;
    let scale = h_mat[(2, 2)];
    if scale.abs() < f64::EPSILON || !scale.is_finite() {
        return None;
    }
    Some(h_mat / scale)
}

/// Closed-form focal lengths from planar homographies with a known principal point.
///
/// With the image centred on `(cx, cy)` the image of the absolute conic is
/// `diag(1/fx², 1/fy², 1)`, and every view gives two linear constraints on
/// its first two entries. With `aspect = Some(r)`, `fx = r * fy` is enforced.
pub fn focal_from_homographies(
    homographies: &[na::Matrix3<f64>],
    cx: f64,
    cy: f64,
    aspect: Option<f64>,
) -> Result<(f64, f64), CalibError> {
    let centre = na::Matrix3::new(1.0, 0.0, -cx, 0.0, 1.0, -cy, 0.0, 0.0, 1.0);
    let mut rows: Vec<([f64; 2], f64)> = Vec::with_capacity(homographies.len() * 2);
    for h in homographies {
        let h = centre * h;
        let (h1, h2) = (h.column(0), h.column(1));
        rows.push(([h1[0] * h2[0], h1[1] * h2[1]], -(h1[2] * h2[2])));
        rows.push((
            [h1[0] * h1[0] - h2[0] * h2[0], h1[1] * h1[1] - h2[1] * h2[1]],
            -(h1[2] * h1[2] - h2[2] * h2[2]),
        ));
    }

    let (a, b) = match aspect {
        Some(r) => {
            let r2 = r * r;
            let (mut num, mut den) = (0.0, 0.0);
            for (c, rhs) in &rows {
                let coef = c[0] / r2 + c[1];
                num += coef * rhs;
                den += coef * coef;
            }
            if den < f64::EPSILON {
                return Err(CalibError::Initialisation(
                    "views are too close to fronto-parallel".to_string(),
                ));
            }
            let b = num / den;
            (b / r2, b)
        }
        None => {
            let mut ata = na::Matrix2::zeros();
            let mut atb = na::Vector2::zeros();
            for (c, rhs) in &rows {
                let v = na::Vector2::new(c[0], c[1]);
                ata += v * v.transpose();
                atb += v * *rhs;
            }
            let x = ata.try_inverse().map(|inv| inv * atb).ok_or_else(|| {
                CalibError::Initialisation("views are too close to fronto-parallel".to_string())
            })?;
            (x[0], x[1])
        }
    };
    debug!("absolute conic diagonal a {} b {}", a, b);
    if !(a > 0.0 && b > 0.0 && a.is_finite() && b.is_finite()) {
        return Err(CalibError::Initialisation(format!(
            "non-positive conic entries ({}, {})",
            a, b
        )));
    }
    Ok((1.0 / a.sqrt(), 1.0 / b.sqrt()))
}

/// Board pose from a homography between board XY and normalised image points.
pub fn pose_from_homography(h: &na::Matrix3<f64>) -> Option<(na::Vector3<f64>, na::Vector3<f64>)> {
    let m1 = h.column(0).into_owned();
    let m2 = h.column(1).into_owned();
    let m3 = h.column(2).into_owned();
    let norm = 0.5 * (m1.norm() + m2.norm());
    if norm < f64::EPSILON {
        return None;
    }
    let mut lambda = 1.0 / norm;
    if m3.z * lambda < 0.0 {
        lambda = -lambda;
    }
    let r1 = m1 * lambda;
    let r2 = m2 * lambda;
    let r3 = r1.cross(&r2);
    let approx = na::Matrix3::from_columns(&[r1, r2, r3]);
    let svd = approx.svd(true, true);
    let mut r = svd.u? * svd.v_t?;
    if r.determinant() < 0.0 {
        r = -r;
    }
    let rot = na::Rotation3::from_matrix_unchecked(r);
    Some((rot.scaled_axis(), m3 * lambda))
}
