use std::io::Cursor;

use image::DynamicImage;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rerun::RecordingStream;

use crate::detected_points::FrameCorners;

pub fn log_image_as_compressed(
    recording: &RecordingStream,
    topic: &str,
    img: &DynamicImage,
    format: image::ImageFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut bytes: Vec<u8> = Vec::new();
    img.to_luma8().write_to(&mut Cursor::new(&mut bytes), format)?;
    recording.log(
        format!("{}/image", topic),
        &rerun::EncodedImage::from_file_contents(bytes),
    )?;
    Ok(())
}

pub fn id_to_color(id: usize) -> (u8, u8, u8, u8) {
    let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
    let color_num = rng.random_range(0..2u32.pow(24));
    (
        ((color_num >> 16) % 256) as u8,
        ((color_num >> 8) % 256) as u8,
        (color_num % 256) as u8,
        255,
    )
}

/// rerun use top left corner as (0, 0)
pub fn rerun_shift(p2ds: &[(f32, f32)]) -> Vec<(f32, f32)> {
    p2ds.iter().map(|(x, y)| (*x + 0.5, *y + 0.5)).collect()
}

/// Logs one view's image and corners on the `frame` sequence timeline.
///
/// Corners of a complete detection are coloured by index, partial ones share one colour.
pub fn log_frame(
    recording: &RecordingStream,
    topic: &str,
    img: &DynamicImage,
    frame: &FrameCorners,
) -> Result<(), Box<dyn std::error::Error>> {
    recording.set_time("frame", rerun::TimeCell::from_sequence(frame.image_index as i64));
    log_image_as_compressed(recording, topic, img, image::ImageFormat::Png)?;
    if frame.corners.is_empty() {
        return Ok(());
    }
    let (pts, colors): (Vec<_>, Vec<_>) = frame
        .corners
        .iter()
        .enumerate()
        .map(|(i, p)| ((p.x, p.y), id_to_color(if frame.found { i } else { 0 })))
        .unzip();
    let pts = rerun_shift(&pts);
    recording.log(
        format!("{}/pts", topic),
        &rerun::Points2D::new(pts)
            .with_colors(colors)
            .with_radii([rerun::Radius::new_ui_points(5.0)]),
    )?;
    Ok(())
}
