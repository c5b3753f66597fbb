use chessboard_calibration::config::CalibrationConfig;
use chessboard_calibration::data_loader::ImageSource;
use chessboard_calibration::detection::DetectionMethod;
use chessboard_calibration::{CalibError, CalibFlags, FindCornersFlags};

#[test]
fn test_flag_values() {
    assert_eq!(CalibFlags::default().bits(), 6158);
    assert_eq!(FindCornersFlags::sector_based_default().bits(), 50);
    assert_eq!(FindCornersFlags::classic_default().bits(), 11);
    assert_eq!(CalibFlags::RATIONAL_MODEL.bits(), 16384);
    assert_eq!(CalibFlags::FIX_K6.bits(), 8192);
    assert_eq!(CalibFlags::USE_LU.bits(), 131072);
}

#[test]
fn test_default_config() {
    let config = CalibrationConfig::default();
    assert_eq!(config.board.rows, 6);
    assert_eq!(config.board.cols, 9);
    assert_eq!(config.method, DetectionMethod::SectorBased);
    assert_eq!(config.sub_pix_window, 11);
    assert_eq!(config.calibration_flags, 6158);
    assert_eq!(config.find_flags().unwrap().bits(), 50);
    assert!(config.enable_corner_sub_pix);
    match &config.source {
        ImageSource::Pattern { prefix, count, .. } => {
            assert_eq!(prefix, "right");
            assert_eq!(*count, 13);
        }
        _ => panic!("default source should be the numbered pattern"),
    }
    config.validate().unwrap();
}

#[test]
fn test_classic_flags_follow_method() {
    let config: CalibrationConfig = serde_json::from_str(r#"{"method": "classic"}"#).unwrap();
    assert_eq!(config.find_flags().unwrap(), FindCornersFlags::classic_default());
}

#[test]
fn test_config_json_overrides() {
    let json = r#"{
        "source": {"type": "glob", "pattern": "data/*.png"},
        "board": {"rows": 5, "cols": 7, "square_size": 20.0, "grid_width": 121.0},
        "find_flags": 3,
        "calibration_flags": 14
    }"#;
    let config: CalibrationConfig = serde_json::from_str(json).unwrap();
    assert!(matches!(config.source, ImageSource::Glob { .. }));
    assert_eq!(config.board.cols, 7);
    assert!(config.board.release_object);
    assert_eq!(
        config.find_flags().unwrap(),
        FindCornersFlags::ADAPTIVE_THRESH | FindCornersFlags::NORMALIZE_IMAGE
    );
    assert_eq!(
        config.calib_flags().unwrap(),
        CalibFlags::FIX_ASPECT_RATIO | CalibFlags::FIX_PRINCIPAL_POINT | CalibFlags::ZERO_TANGENT_DIST
    );
}

#[test]
fn test_invalid_config() {
    let mut config = CalibrationConfig::default();
    config.calibration_flags = 1 << 30;
    assert!(matches!(config.validate(), Err(CalibError::Config(_))));

    let mut config = CalibrationConfig::default();
    config.board.rows = 1;
    assert!(matches!(config.validate(), Err(CalibError::Config(_))));

    let mut config = CalibrationConfig::default();
    config.board.square_size = 0.0;
    assert!(matches!(config.validate(), Err(CalibError::Config(_))));
}
