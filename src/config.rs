use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::board::BoardConfig;
use crate::data_loader::ImageSource;
use crate::detection::DetectionMethod;
use crate::error::CalibError;
use crate::flags::{CalibFlags, FindCornersFlags};

/// Run configuration; every field defaults to the demo setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub source: ImageSource,
    pub board: BoardConfig,
    pub method: DetectionMethod,
    /// Find flags as integers; `None` uses the default of the chosen method.
    pub find_flags: Option<u32>,
    pub enable_corner_sub_pix: bool,
    /// Half-size of the sub-pixel search window.
    pub sub_pix_window: usize,
    pub aspect_ratio: f64,
    pub calibration_flags: u32,
    pub output: PathBuf,
    pub overlay_dir: Option<PathBuf>,
    pub undistort_dir: Option<PathBuf>,
    /// Rerun `.rrd` file to record into.
    pub rerun: Option<PathBuf>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        CalibrationConfig {
            source: ImageSource::default(),
            board: BoardConfig::default(),
            method: DetectionMethod::SectorBased,
            find_flags: None,
            enable_corner_sub_pix: true,
            sub_pix_window: 11,
            aspect_ratio: 1.0,
            calibration_flags: CalibFlags::default().bits(),
            output: PathBuf::from("out_camera_parameters.json"),
            overlay_dir: None,
            undistort_dir: None,
            rerun: None,
        }
    }
}

impl CalibrationConfig {
    pub fn from_json_file(path: &Path) -> Result<CalibrationConfig, CalibError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn find_flags(&self) -> Result<FindCornersFlags, CalibError> {
        match self.find_flags {
            Some(bits) => FindCornersFlags::from_bits(bits)
                .ok_or_else(|| CalibError::Config(format!("unknown find flag bits {}", bits))),
            None => Ok(self.method.default_flags()),
        }
    }

    pub fn calib_flags(&self) -> Result<CalibFlags, CalibError> {
        CalibFlags::from_bits(self.calibration_flags)
            .ok_or_else(|| CalibError::Config(format!("unknown calibration flag bits {}", self.calibration_flags)))
    }

    /// Checks values a run cannot start with.
    pub fn validate(&self) -> Result<(), CalibError> {
        if self.board.rows < 2 || self.board.cols < 2 {
            return Err(CalibError::Config(format!(
                "board needs at least 2x2 inner corners, got {}x{}",
                self.board.cols, self.board.rows
            )));
        }
        if !(self.board.square_size > 0.0) {
            return Err(CalibError::Config("square size must be positive".to_string()));
        }
        if self.board.release_object && !(self.board.grid_width > 0.0) {
            return Err(CalibError::Config("grid width must be positive".to_string()));
        }
        if !(self.aspect_ratio > 0.0) {
            return Err(CalibError::Config("aspect ratio must be positive".to_string()));
        }
        if self.sub_pix_window == 0 {
            return Err(CalibError::Config("sub-pixel window must be at least 1".to_string()));
        }
        self.find_flags()?;
        self.calib_flags()?;
        Ok(())
    }
}
