use std::path::{Path, PathBuf};

use glob::glob;
use image::{DynamicImage, ImageReader};
use serde::{Deserialize, Serialize};

/// Where calibration images come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    /// `<dir>/<prefix><index:02>.<extension>` for index in `0..count`.
    Pattern {
        dir: PathBuf,
        prefix: String,
        extension: String,
        count: usize,
    },
    /// Every `.png`/`.jpg`/`.jpeg` matching the glob, sorted by path.
    Glob { pattern: String },
}

impl Default for ImageSource {
    fn default() -> Self {
        ImageSource::Pattern {
            dir: PathBuf::from("calibration_images_right00-12"),
            prefix: "right".to_string(),
            extension: "jpg".to_string(),
            count: 13,
        }
    }
}

pub struct LoadedImage {
    /// Position of the file in the requested sequence.
    pub index: usize,
    pub path: PathBuf,
    pub image: DynamicImage,
}

/// Builds `<dir>/<prefix><index:02>.<extension>`.
pub fn pattern_path(dir: &Path, prefix: &str, extension: &str, index: usize) -> PathBuf {
    dir.join(format!("{}{:02}.{}", prefix, index, extension))
}

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    if let Ok(p) = rp {
        let lower = p.as_os_str().to_string_lossy().to_lowercase();
        for ext in &[".png", ".jpg", ".jpeg"] {
            if lower.ends_with(ext) {
                return Some(p);
            }
        }
    }
    None
}

/// Lists the candidate paths of a source in sequence order.
pub fn source_paths(source: &ImageSource) -> Vec<PathBuf> {
    match source {
        ImageSource::Pattern {
            dir,
            prefix,
            extension,
            count,
        } => (0..*count)
            .map(|i| pattern_path(dir, prefix, extension, i))
            .collect(),
        ImageSource::Glob { pattern } => match glob(pattern) {
            Ok(paths) => {
                let mut sorted: Vec<PathBuf> = paths.filter_map(img_filter).collect();
                sorted.sort();
                sorted
            }
            Err(e) => {
                log::warn!("invalid glob pattern {}: {}", pattern, e);
                Vec::new()
            }
        },
    }
}

fn open_image(path: &Path) -> Result<DynamicImage, image::ImageError> {
    Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?)
}

/// Loads every readable image of the source.
///
/// Files that are missing or fail to decode are skipped with a warning; the
/// returned images keep the order of the source.
pub fn load_images(source: &ImageSource) -> Vec<LoadedImage> {
    source_paths(source)
        .into_iter()
        .enumerate()
        .filter_map(|(index, path)| match open_image(&path) {
            Ok(image) => {
                log::trace!("loaded {}", path.display());
                Some(LoadedImage { index, path, image })
            }
            Err(e) => {
                log::warn!("cannot load image file : {}", path.display());
                log::debug!("{}: {}", path.display(), e);
                None
            }
        })
        .collect()
}
