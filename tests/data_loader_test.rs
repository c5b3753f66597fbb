use chessboard_calibration::data_loader::{ImageSource, load_images, pattern_path, source_paths};
use image::{GrayImage, Luma};
use std::path::Path;
use tempfile::TempDir;

fn write_gray(path: &Path, value: u8) {
    GrayImage::from_pixel(32, 24, Luma([value])).save(path).unwrap();
}

#[test]
fn test_pattern_path_format() {
    let p = pattern_path(Path::new("calibration_images_right00-12"), "right", "jpg", 3);
    assert_eq!(p, Path::new("calibration_images_right00-12/right03.jpg"));
    let p = pattern_path(Path::new("d"), "img", "png", 12);
    assert_eq!(p, Path::new("d/img12.png"));
}

#[test]
fn test_missing_files_are_skipped_in_order() {
    let temp_dir = TempDir::new().unwrap();
    // write 0..13 except 2, 7 and 12
    for i in (0..13).filter(|i| ![2, 7, 12].contains(i)) {
        write_gray(&pattern_path(temp_dir.path(), "right", "png", i), i as u8 * 10);
    }
    let source = ImageSource::Pattern {
        dir: temp_dir.path().to_path_buf(),
        prefix: "right".to_string(),
        extension: "png".to_string(),
        count: 13,
    };
    assert_eq!(source_paths(&source).len(), 13);

    let images = load_images(&source);
    let indices: Vec<usize> = images.iter().map(|i| i.index).collect();
    assert_eq!(indices, vec![0, 1, 3, 4, 5, 6, 8, 9, 10, 11]);
    for img in &images {
        assert_eq!(img.image.to_luma8().get_pixel(0, 0)[0], img.index as u8 * 10);
    }
}

#[test]
fn test_undecodable_file_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    write_gray(&pattern_path(temp_dir.path(), "right", "png", 0), 1);
    std::fs::write(pattern_path(temp_dir.path(), "right", "png", 1), b"not an image").unwrap();
    let source = ImageSource::Pattern {
        dir: temp_dir.path().to_path_buf(),
        prefix: "right".to_string(),
        extension: "png".to_string(),
        count: 2,
    };
    let images = load_images(&source);
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].index, 0);
}

#[test]
fn test_glob_source_sorted() {
    let temp_dir = TempDir::new().unwrap();
    for name in ["b.png", "a.png", "c.jpg"] {
        write_gray(&temp_dir.path().join(name), 0);
    }
    std::fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();
    let source = ImageSource::Glob {
        pattern: format!("{}/*", temp_dir.path().display()),
    };
    let names: Vec<String> = source_paths(&source)
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["a.png", "b.png", "c.jpg"]);
}

#[test]
fn test_empty_source() {
    let temp_dir = TempDir::new().unwrap();
    let source = ImageSource::Pattern {
        dir: temp_dir.path().to_path_buf(),
        prefix: "right".to_string(),
        extension: "jpg".to_string(),
        count: 13,
    };
    assert!(load_images(&source).is_empty());
}
