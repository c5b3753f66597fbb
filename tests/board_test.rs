use chessboard_calibration::board::{BoardConfig, ObjectTemplate};

#[test]
fn test_template_row_major() {
    let config = BoardConfig::default();
    let template = ObjectTemplate::new(&config);
    // Default 9x6 inner corners
    assert_eq!(template.points.len(), 54);
    assert_eq!(config.corner_count(), 54);

    for r in 0..6 {
        for c in 0..9 {
            let p = template.points[r * 9 + c];
            assert!((p.y - r as f32 * 50.0).abs() < 1e-6);
            assert_eq!(p.z, 0.0);
            if !(r == 0 && c == 8) {
                assert!((p.x - c as f32 * 50.0).abs() < 1e-6);
            }
        }
    }
}

#[test]
fn test_top_right_uses_grid_width() {
    let config = BoardConfig {
        grid_width: 402.5,
        ..Default::default()
    };
    let template = ObjectTemplate::new(&config);
    assert!((template.points[8].x - 402.5).abs() < 1e-4);
    assert_eq!(template.points[8].y, 0.0);
    // only the first row's last point is adjusted
    assert!((template.points[17].x - 400.0).abs() < 1e-4);
    assert_eq!(template.fixed_point, Some(8));
}

#[test]
fn test_legacy_ignores_grid_width() {
    let config = BoardConfig {
        grid_width: 402.5,
        release_object: false,
        ..Default::default()
    };
    let template = ObjectTemplate::new(&config);
    assert!((template.points[8].x - 400.0).abs() < 1e-4);
    assert_eq!(template.fixed_point, None);
    assert!((config.effective_grid_width() - 400.0).abs() < 1e-4);
}

#[test]
fn test_outer_corners_and_replicate() {
    let config = BoardConfig {
        rows: 4,
        cols: 5,
        square_size: 10.0,
        grid_width: 40.0,
        release_object: true,
    };
    let template = ObjectTemplate::new(&config);
    assert_eq!(template.outer_corner_indices(), [0, 4, 15, 19]);

    let copies = template.replicate(3);
    assert_eq!(copies.len(), 3);
    assert!(copies.iter().all(|c| c == &template.points));
}

#[test]
fn test_empty_board() {
    let config = BoardConfig {
        rows: 0,
        cols: 9,
        ..Default::default()
    };
    let template = ObjectTemplate::new(&config);
    assert!(template.points.is_empty());
}

#[test]
fn test_board_config_from_json_defaults() {
    let config: BoardConfig = serde_json::from_str(r#"{"rows": 7}"#).unwrap();
    assert_eq!(config.rows, 7);
    assert_eq!(config.cols, 9);
    assert!(config.release_object);
}
