//! Load, detect, calibrate and report in one run.

use std::path::Path;

use glam::{Vec2, Vec3};
use image::DynamicImage;
use indicatif::ParallelProgressIterator;
use log::{info, warn};
use rayon::prelude::*;

use crate::board::ObjectTemplate;
use crate::calibration::{CalibrationResult, calibrate_camera_ro, initial_camera_matrix};
use crate::config::CalibrationConfig;
use crate::data_loader::{LoadedImage, load_images, source_paths};
use crate::detected_points::FrameCorners;
use crate::detection::{ChessboardFinder, DetectionMethod, PatternSize, make_finder, refine_corners};
use crate::error::CalibError;
use crate::flags::CalibFlags;
use crate::io::{CalibrationReport, RunSettings};
use crate::overlay::draw_chessboard_corners;
use crate::util::{init_undistort_map, remap, reprojection_stats};
use crate::visualization::log_frame;

/// Everything a run produced.
pub struct PipelineOutput {
    pub template: ObjectTemplate,
    /// One entry per loaded image, in load order.
    pub frames: Vec<FrameCorners>,
    pub calibration: Option<CalibrationResult>,
    pub report: CalibrationReport,
    /// Fewer boards were found than images requested.
    pub insufficient: bool,
}

/// Runs the finder on one image; refinement is applied to whatever corners were returned.
pub fn detect_frame(
    loaded: &LoadedImage,
    finder: &dyn ChessboardFinder,
    pattern: PatternSize,
    sub_pix_window: Option<usize>,
) -> FrameCorners {
    let gray = loaded.image.to_luma8();
    let mut search = finder.find(&gray, pattern);
    if let Some(half_win) = sub_pix_window {
        if !search.corners.is_empty() {
            refine_corners(&gray, &mut search.corners, half_win);
        }
    }
    if search.found {
        info!("{:02}... ok", loaded.index);
    } else {
        warn!("{:02}... fail", loaded.index);
    }
    FrameCorners {
        image_index: loaded.index,
        img_w_h: gray.dimensions(),
        found: search.found,
        corners: search.corners,
    }
}

/// Detects corners in every image in parallel, keeping input order.
pub fn detect_all(
    images: &[LoadedImage],
    finder: &dyn ChessboardFinder,
    pattern: PatternSize,
    sub_pix_window: Option<usize>,
) -> Vec<FrameCorners> {
    images
        .par_iter()
        .progress_count(images.len() as u64)
        .map(|img| detect_frame(img, finder, pattern, sub_pix_window))
        .collect()
}

fn write_overlays(dir: &Path, images: &[LoadedImage], frames: &[FrameCorners], pattern: PatternSize) -> Result<(), CalibError> {
    std::fs::create_dir_all(dir)?;
    images
        .par_iter()
        .zip(frames.par_iter())
        .try_for_each(|(img, frame)| -> Result<(), CalibError> {
            let overlay = draw_chessboard_corners(&img.image, pattern, &frame.corners, frame.found);
            overlay.save(dir.join(format!("corners_{:02}.png", img.index)))?;
            Ok(())
        })
}

fn write_undistorted(dir: &Path, images: &[LoadedImage], result: &CalibrationResult) -> Result<(), CalibError> {
    std::fs::create_dir_all(dir)?;
    let mut maps: Option<((u32, u32), (nalgebra::DMatrix<f32>, nalgebra::DMatrix<f32>))> = None;
    for img in images {
        let w_h = (img.image.width(), img.image.height());
        if maps.as_ref().is_none_or(|(size, _)| *size != w_h) {
            maps = Some((w_h, init_undistort_map(&result.camera, w_h)));
        }
        if let Some((_, (mx, my))) = &maps {
            let out: DynamicImage = remap(&img.image, mx, my);
            out.save(dir.join(format!("undistorted_{:02}.png", img.index)))?;
        }
    }
    Ok(())
}

/// Object and image point sets of the successful views.
pub fn collect_views(template: &ObjectTemplate, frames: &[FrameCorners]) -> (Vec<Vec<Vec3>>, Vec<Vec<Vec2>>) {
    frames
        .iter()
        .filter(|f| f.found)
        .map(|f| (template.points.clone(), f.corners.clone()))
        .unzip()
}

pub fn run(config: &CalibrationConfig) -> Result<PipelineOutput, CalibError> {
    config.validate()?;
    let find_flags = config.find_flags()?;
    let calib_flags = config.calib_flags()?;
    let pattern = PatternSize::new(config.board.cols, config.board.rows);
    let template = ObjectTemplate::new(&config.board);

    let requested = source_paths(&config.source).len();
    let images = load_images(&config.source);
    info!("loaded {} of {} images", images.len(), requested);

    let finder = make_finder(config.method, find_flags);
    let sub_pix_window = (config.method == DetectionMethod::Classic && config.enable_corner_sub_pix)
        .then_some(config.sub_pix_window);
    let frames = detect_all(&images, finder.as_ref(), pattern, sub_pix_window);

    if let Some(dir) = &config.overlay_dir {
        write_overlays(dir, &images, &frames, pattern)?;
    }
    if let Some(path) = &config.rerun {
        match rerun::RecordingStreamBuilder::new("chessboard-calibration").save(path) {
            Ok(recording) => {
                for (img, frame) in images.iter().zip(&frames) {
                    if let Err(e) = log_frame(&recording, "/cam0", &img.image, frame) {
                        warn!("rerun logging failed: {}", e);
                    }
                }
            }
            Err(e) => warn!("cannot open rerun recording {}: {}", path.display(), e),
        }
    }

    let found = frames.iter().filter(|f| f.found).count();
    let insufficient = found < requested;
    if insufficient {
        warn!("Calibration Images are insufficient.");
    }

    let image_w_h = frames.first().map_or((0, 0), |f| f.img_w_h);
    for f in frames.iter().filter(|f| f.img_w_h != image_w_h) {
        warn!(
            "image {:02} is {}x{}, calibrating with {}x{}",
            f.image_index, f.img_w_h.0, f.img_w_h.1, image_w_h.0, image_w_h.1
        );
    }

    let (object_points, image_points) = collect_views(&template, &frames);
    let calibration = if object_points.is_empty() {
        warn!("no chessboard was found, skipping calibration");
        None
    } else {
        let camera_matrix = initial_camera_matrix(calib_flags, config.aspect_ratio);
        Some(calibrate_camera_ro(
            &object_points,
            &image_points,
            image_w_h,
            template.fixed_point,
            &camera_matrix,
            &[0.0; 8],
            calib_flags | CalibFlags::USE_LU,
        )?)
    };

    if let Some(result) = &calibration {
        let refined;
        let object_points = match &result.new_object_points {
            Some(points) => {
                refined = vec![points.clone(); image_points.len()];
                &refined
            }
            None => &object_points,
        };
        let (avg, median) = reprojection_stats(&result.camera, &result.rvecs_tvecs, object_points, &image_points);
        info!("reprojection error avg {:.4} px, median {:.4} px", avg, median);
    }

    let settings = RunSettings::new(
        config.method,
        find_flags,
        config.enable_corner_sub_pix,
        config.board.release_object,
        calib_flags,
    );
    let report = CalibrationReport::new(image_w_h, images.len(), calibration.as_ref(), settings);
    report.log_summary(template.outer_corner_indices());
    report.write(&config.output)?;

    if let (Some(dir), Some(result)) = (&config.undistort_dir, &calibration) {
        write_undistorted(dir, &images, result)?;
    }

    Ok(PipelineOutput {
        template,
        frames,
        calibration,
        report,
        insufficient,
    })
}
