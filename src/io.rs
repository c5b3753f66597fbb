use std::path::Path;

use log::info;
use serde::{Serialize, de::DeserializeOwned};

use crate::calibration::CalibrationResult;
use crate::detection::DetectionMethod;
use crate::error::CalibError;
use crate::flags::{CalibFlags, FindCornersFlags};
use crate::types::RvecTvec;

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &Path, object: &T) -> Result<(), CalibError> {
    let j = serde_json::to_string_pretty(object)?;
    std::fs::write(output_path, j)?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &Path) -> Result<T, CalibError> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Settings the run was made with, logged after the results.
#[derive(Debug, Clone, Serialize)]
pub struct RunSettings {
    pub method: DetectionMethod,
    pub find_flags: u32,
    pub enable_corner_sub_pix: bool,
    pub release_object: bool,
    pub calibration_flags: u32,
}

impl RunSettings {
    pub fn new(
        method: DetectionMethod,
        find_flags: FindCornersFlags,
        enable_corner_sub_pix: bool,
        release_object: bool,
        calibration_flags: CalibFlags,
    ) -> RunSettings {
        RunSettings {
            method,
            find_flags: find_flags.bits(),
            enable_corner_sub_pix,
            release_object,
            calibration_flags: calibration_flags.bits(),
        }
    }
}

/// Content of `out_camera_parameters.json`.
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationReport {
    pub time: String,
    pub image_width: u32,
    pub image_height: u32,
    pub views_loaded: usize,
    pub views_used: usize,
    pub intrinsic: Option<[[f64; 3]; 3]>,
    pub distortion: Option<Vec<f64>>,
    pub rep_err: Option<f64>,
    pub per_view_errors: Vec<f64>,
    pub extrinsics: Vec<RvecTvec>,
    pub new_object_points: Option<Vec<[f32; 3]>>,
    pub settings: RunSettings,
}

fn timestamp() -> String {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    now.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

impl CalibrationReport {
    pub fn new(
        image_w_h: (u32, u32),
        views_loaded: usize,
        result: Option<&CalibrationResult>,
        settings: RunSettings,
    ) -> CalibrationReport {
        let intrinsic = result.map(|r| {
            let k = r.camera_matrix();
            [
                [k[(0, 0)], k[(0, 1)], k[(0, 2)]],
                [k[(1, 0)], k[(1, 1)], k[(1, 2)]],
                [k[(2, 0)], k[(2, 1)], k[(2, 2)]],
            ]
        });
        CalibrationReport {
            time: timestamp(),
            image_width: image_w_h.0,
            image_height: image_w_h.1,
            views_loaded,
            views_used: result.map_or(0, |r| r.rvecs_tvecs.len()),
            intrinsic,
            distortion: result.map(|r| r.dist_coeffs().to_vec()),
            rep_err: result.map(|r| r.rms),
            per_view_errors: result.map(|r| r.per_view_errors.clone()).unwrap_or_default(),
            extrinsics: result.map(|r| r.rvecs_tvecs.clone()).unwrap_or_default(),
            new_object_points: result
                .and_then(|r| r.new_object_points.as_ref())
                .map(|pts| pts.iter().map(|p| p.to_array()).collect()),
            settings,
        }
    }

    /// Logs the results in a fixed order: released board corners, camera,
    /// error and then the settings.
    pub fn log_summary(&self, outer_corners: [usize; 4]) {
        if let Some(points) = &self.new_object_points {
            info!("New board corners: ");
            for idx in outer_corners {
                if let Some(p) = points.get(idx) {
                    info!("{:?}", p);
                }
            }
        }
        match (&self.intrinsic, &self.distortion, self.rep_err) {
            (Some(k), Some(d), Some(err)) => {
                info!("intrinsic: {:?}", k);
                info!("distortion: {:?}", d);
                info!("repErr: {}", err);
            }
            _ => info!("no calibration result"),
        }
        info!(
            "USE_FIND_CHESSBOARD_CORNERS_SB_METHOD: {}",
            self.settings.method == DetectionMethod::SectorBased
        );
        info!("findCornersFlags: {}", self.settings.find_flags);
        info!("ENABLE_CORNER_SUB_PIX: {}", self.settings.enable_corner_sub_pix);
        info!("USE_NEW_CALIBRATION_METHOD: {}", self.settings.release_object);
        info!("calibrationFlags: {}", self.settings.calibration_flags);
    }

    pub fn write(&self, output_path: &Path) -> Result<(), CalibError> {
        object_to_json(output_path, self)?;
        info!("camera parameters written to {}", output_path.display());
        Ok(())
    }
}
