pub mod board;
pub mod calibration;
pub mod camera_model;
pub mod config;
pub mod data_loader;
pub mod detected_points;
pub mod detection;
pub mod error;
pub mod flags;
pub mod io;
pub mod optimization;
pub mod overlay;
pub mod pipeline;
pub mod synthetic;
pub mod types;
pub mod util;
pub mod visualization;

pub use calibration::{CalibrationResult, calibrate_camera_ro};
pub use error::CalibError;
pub use flags::{CalibFlags, FindCornersFlags};
