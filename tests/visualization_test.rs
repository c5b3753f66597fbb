use chessboard_calibration::detected_points::FrameCorners;
use chessboard_calibration::visualization::{id_to_color, log_frame, rerun_shift};
use glam::Vec2;
use image::{DynamicImage, GrayImage, Luma};

#[test]
fn test_log_frame_to_memory_recording() {
    let (recording, _storage) = rerun::RecordingStreamBuilder::new("chessboard-calibration-test")
        .memory()
        .unwrap();
    let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 24, Luma([128])));
    let frame = FrameCorners {
        image_index: 3,
        img_w_h: (32, 24),
        found: true,
        corners: vec![Vec2::new(4.0, 5.0), Vec2::new(10.0, 5.0)],
    };
    log_frame(&recording, "/cam0", &img, &frame).unwrap();

    let empty = FrameCorners {
        corners: Vec::new(),
        found: false,
        ..frame
    };
    log_frame(&recording, "/cam0", &img, &empty).unwrap();
}

#[test]
fn test_colors_and_shift() {
    assert_eq!(id_to_color(7), id_to_color(7));
    assert_eq!(id_to_color(7).3, 255);
    assert_eq!(rerun_shift(&[(1.0, 2.0)]), vec![(1.5, 2.5)]);
}
