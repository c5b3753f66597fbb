use chessboard_calibration::camera_model::PinholeCamera;
use chessboard_calibration::detection::PatternSize;
use chessboard_calibration::overlay::{draw_chessboard_corners, row_color};
use chessboard_calibration::types::RvecTvec;
use chessboard_calibration::util::{init_undistort_map, remap, reprojection_sq_errors, reprojection_stats, rms};
use glam::{Vec2, Vec3};
use image::{DynamicImage, GrayImage, Luma, Rgb};
use nalgebra as na;

#[test]
fn test_rms() {
    assert_eq!(rms(0.0, 0), 0.0);
    assert!((rms(8.0, 2) - 2.0).abs() < 1e-12);
}

#[test]
fn test_reprojection_errors_and_stats() {
    let camera = PinholeCamera::new(500.0, 500.0, 320.0, 240.0);
    let pose = RvecTvec::new(&[0.0, 0.0, 0.0], &[0.0, 0.0, 1000.0]);
    let p3ds = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 0.0), Vec3::new(0.0, 100.0, 0.0)];
    // exact projections are (320, 240), (370, 240), (320, 290)
    let p2ds = vec![Vec2::new(320.0, 240.0), Vec2::new(373.0, 244.0), Vec2::new(320.0, 291.0)];

    let sq = reprojection_sq_errors(&camera, &pose, &p3ds, &p2ds);
    assert_eq!(sq.len(), 3);
    assert!(sq[0] < 1e-9);
    assert!((sq[1] - 25.0).abs() < 1e-6);
    assert!((sq[2] - 1.0).abs() < 1e-6);

    let (avg, median) = reprojection_stats(&camera, &[pose], &[p3ds], &[p2ds]);
    assert!((avg - 2.0).abs() < 1e-6);
    assert!((median - 1.0).abs() < 1e-6);

    assert_eq!(reprojection_stats(&camera, &[], &[], &[]), (0.0, 0.0));
}

#[test]
fn test_undistort_map_without_distortion_is_identity() {
    let camera = PinholeCamera::new(300.0, 310.0, 40.0, 30.0);
    let (mx, my) = init_undistort_map(&camera, (80, 60));
    assert_eq!(mx.shape(), (60, 80));
    for (r, c) in [(0, 0), (10, 70), (59, 79)] {
        assert!((mx[(r, c)] - c as f32).abs() < 1e-3);
        assert!((my[(r, c)] - r as f32).abs() < 1e-3);
    }
}

#[test]
fn test_undistort_map_barrel_samples_inward() {
    let camera = PinholeCamera::new(300.0, 300.0, 40.0, 30.0).with_distortion([-0.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let (mx, _) = init_undistort_map(&camera, (80, 60));
    // a corner pixel of the undistorted image comes from closer to the centre
    assert!(mx[(0, 79)] < 79.0);
    assert!(mx[(0, 0)] > 0.0);
}

#[test]
fn test_remap() {
    let src = DynamicImage::ImageLuma8(GrayImage::from_fn(4, 3, |x, y| Luma([(x + 10 * y) as u8])));
    // shift one pixel to the left, the last column falls outside
    let mx = na::DMatrix::from_fn(3, 4, |_, c| c as f32 + 1.0);
    let my = na::DMatrix::from_fn(3, 4, |r, _| r as f32);
    let out = remap(&src, &mx, &my).to_rgb8();
    assert_eq!(out.dimensions(), (4, 3));
    assert_eq!(out.get_pixel(0, 2), &Rgb([21, 21, 21]));
    assert_eq!(out.get_pixel(3, 1), &Rgb([0, 0, 0]));
}

#[test]
fn test_overlay_colors() {
    let pattern = PatternSize::new(3, 2);
    let corners: Vec<Vec2> = (0..6)
        .map(|i| Vec2::new(20.0 + (i % 3) as f32 * 20.0, 20.0 + (i / 3) as f32 * 20.0))
        .collect();
    let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(80, 60, Luma([0])));

    let found = draw_chessboard_corners(&img, pattern, &corners, true);
    assert_eq!(found.get_pixel(20, 20), &row_color(0, 2));
    assert_eq!(found.get_pixel(40, 40), &row_color(1, 2));
    assert_ne!(row_color(0, 2), row_color(1, 2));

    let partial = draw_chessboard_corners(&img, pattern, &corners[..4], false);
    assert_eq!(partial.get_pixel(20, 20), &Rgb([255, 0, 0]));
    // untouched background
    assert_eq!(partial.get_pixel(79, 0), &Rgb([0, 0, 0]));
}
