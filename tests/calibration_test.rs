use chessboard_calibration::board::{BoardConfig, ObjectTemplate};
use chessboard_calibration::calibration::{calibrate_camera_ro, initial_camera_matrix};
use chessboard_calibration::camera_model::PinholeCamera;
use chessboard_calibration::synthetic::{project_template, random_poses};
use chessboard_calibration::{CalibError, CalibFlags};
use glam::{Vec2, Vec3};
use nalgebra as na;

struct Scenario {
    camera: PinholeCamera,
    template: ObjectTemplate,
    object_points: Vec<Vec<Vec3>>,
    image_points: Vec<Vec<Vec2>>,
}

fn scenario(board: &BoardConfig, views: usize) -> Scenario {
    let camera = PinholeCamera::new(600.0, 600.0, 319.5, 239.5)
        .with_distortion([-0.05, 0.01, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let template = ObjectTemplate::new(board);
    let poses = random_poses(board, views, 900.0, 42);
    let image_points: Vec<Vec<Vec2>> = poses
        .iter()
        .map(|pose| project_template(&camera, &template, pose))
        .collect();
    Scenario {
        camera,
        object_points: template.replicate(views),
        template,
        image_points,
    }
}

#[test]
fn test_calibration_recovers_synthetic_camera() {
    let board = BoardConfig {
        release_object: false,
        ..Default::default()
    };
    let s = scenario(&board, 8);
    for flags in [CalibFlags::default(), CalibFlags::default() | CalibFlags::USE_LU] {
        let result = calibrate_camera_ro(
            &s.object_points,
            &s.image_points,
            (640, 480),
            None,
            &initial_camera_matrix(flags, 1.0),
            &[0.0; 8],
            flags,
        )
        .unwrap();

        assert!(result.rms < 0.01, "{:?}: rms {}", flags, result.rms);
        assert!((result.camera.fx - 600.0).abs() < 0.5, "{:?}: fx {}", flags, result.camera.fx);
        assert!((result.camera.fx - result.camera.fy).abs() < 1e-9);
        // principal point and tangential terms stay fixed
        assert!((result.camera.cx - 319.5).abs() < 1e-9);
        assert!((result.camera.cy - 239.5).abs() < 1e-9);
        assert!(result.camera.dist[2].abs() < 1e-12);
        assert!(result.camera.dist[3].abs() < 1e-12);
        assert!(result.camera.dist[5..].iter().all(|d| d.abs() < 1e-12));
        let k1 = result.camera.dist[0];
        assert!((k1 - s.camera.dist[0]).abs() < 0.01, "{:?}: k1 {}", flags, k1);

        assert_eq!(result.rvecs_tvecs.len(), 8);
        assert_eq!(result.per_view_errors.len(), 8);
        assert!(result.new_object_points.is_none());
    }
}

#[test]
fn test_release_object_keeps_fixed_points() {
    let board = BoardConfig::default();
    let s = scenario(&board, 8);
    let flags = CalibFlags::default();
    let result = calibrate_camera_ro(
        &s.object_points,
        &s.image_points,
        (640, 480),
        s.template.fixed_point,
        &initial_camera_matrix(flags, 1.0),
        &[0.0; 8],
        flags,
    )
    .unwrap();

    assert!(result.rms < 0.05, "rms {}", result.rms);
    let refined = result.new_object_points.expect("released template");
    assert_eq!(refined.len(), 54);
    // first, fixed and last points are never variables
    for idx in [0, 8, 53] {
        assert_eq!(refined[idx], s.template.points[idx]);
    }
    let max_shift = refined
        .iter()
        .zip(&s.template.points)
        .map(|(a, b)| a.distance(*b))
        .fold(0.0f32, f32::max);
    assert!(max_shift < 5.0, "max point shift {}", max_shift);
    assert!((result.camera.fy - 600.0).abs() < 6.0, "fy {}", result.camera.fy);
}

#[test]
fn test_rational_model_and_free_aspect() {
    let board = BoardConfig {
        release_object: false,
        ..Default::default()
    };
    let s = scenario(&board, 8);
    let flags = CalibFlags::FIX_PRINCIPAL_POINT | CalibFlags::RATIONAL_MODEL | CalibFlags::USE_LU;
    let result = calibrate_camera_ro(
        &s.object_points,
        &s.image_points,
        (640, 480),
        None,
        &na::Matrix3::identity(),
        &[0.0; 8],
        flags,
    )
    .unwrap();
    assert!(result.rms < 0.05, "rms {}", result.rms);
    assert!((result.camera.fx - 600.0).abs() < 6.0, "fx {}", result.camera.fx);
    assert!((result.camera.fy - 600.0).abs() < 6.0, "fy {}", result.camera.fy);
}

#[test]
fn test_intrinsic_guess_is_used() {
    let board = BoardConfig {
        release_object: false,
        ..Default::default()
    };
    let s = scenario(&board, 4);
    let flags = CalibFlags::USE_INTRINSIC_GUESS | CalibFlags::FIX_FOCAL_LENGTH | CalibFlags::FIX_PRINCIPAL_POINT;
    let guess = na::Matrix3::new(600.0, 0.0, 319.5, 0.0, 600.0, 239.5, 0.0, 0.0, 1.0);
    let result = calibrate_camera_ro(
        &s.object_points,
        &s.image_points,
        (640, 480),
        None,
        &guess,
        &[-0.05, 0.01],
        flags,
    )
    .unwrap();
    assert!((result.camera.fx - 600.0).abs() < 1e-9);
    assert!((result.camera.fy - 600.0).abs() < 1e-9);
    assert!(result.rms < 0.01, "rms {}", result.rms);
}

#[test]
fn test_validation_errors() {
    let board = BoardConfig::default();
    let s = scenario(&board, 2);
    let flags = CalibFlags::default();
    let k = initial_camera_matrix(flags, 1.0);

    let err = calibrate_camera_ro(&[], &[], (640, 480), None, &k, &[], flags).unwrap_err();
    assert!(matches!(err, CalibError::NoViews));

    let mut short = s.image_points.clone();
    short[1].pop();
    let err = calibrate_camera_ro(&s.object_points, &short, (640, 480), None, &k, &[], flags).unwrap_err();
    assert!(matches!(err, CalibError::PointCountMismatch { view: 1, object: 54, image: 53 }));

    let tiny_obj = vec![s.object_points[0][..3].to_vec()];
    let tiny_img = vec![s.image_points[0][..3].to_vec()];
    let err = calibrate_camera_ro(&tiny_obj, &tiny_img, (640, 480), None, &k, &[], flags).unwrap_err();
    assert!(matches!(err, CalibError::TooFewPoints { view: 0, count: 3 }));

    for bad in [0, 53, 60] {
        let err =
            calibrate_camera_ro(&s.object_points, &s.image_points, (640, 480), Some(bad), &k, &[], flags).unwrap_err();
        assert!(matches!(err, CalibError::FixedPointOutOfRange { .. }), "index {}", bad);
    }

    let mut lifted = s.object_points.clone();
    lifted[0][10].z = 5.0;
    lifted[1][10].z = 5.0;
    let err = calibrate_camera_ro(&lifted, &s.image_points, (640, 480), None, &k, &[], flags).unwrap_err();
    assert!(matches!(err, CalibError::NonPlanarTarget));

    let mut different = s.object_points.clone();
    different[1][10].x += 1.0;
    let err =
        calibrate_camera_ro(&different, &s.image_points, (640, 480), Some(8), &k, &[], flags).unwrap_err();
    assert!(matches!(err, CalibError::TemplateMismatch));
}
