//! Chessboard inner-corner detection.
//!
//! Two interchangeable strategies implement [`ChessboardFinder`]; the one to
//! use is chosen by configuration and never switched at runtime.

pub mod chess;
pub mod classic;
pub mod grid;
pub mod image;
pub mod ring;
pub mod subpix;

use glam::Vec2;
use ::image::GrayImage;
use serde::{Deserialize, Serialize};

pub use chess::SectorBasedFinder;
pub use classic::ClassicFinder;
pub use subpix::{TermCriteria, corner_sub_pix};

use crate::flags::FindCornersFlags;

/// Inner-corner counts of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSize {
    pub cols: usize,
    pub rows: usize,
}

impl PatternSize {
    pub fn new(cols: usize, rows: usize) -> PatternSize {
        PatternSize { cols, rows }
    }

    pub fn area(&self) -> usize {
        self.cols * self.rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Classic,
    SectorBased,
}

impl DetectionMethod {
    pub fn default_flags(&self) -> FindCornersFlags {
        match self {
            DetectionMethod::Classic => FindCornersFlags::classic_default(),
            DetectionMethod::SectorBased => FindCornersFlags::sector_based_default(),
        }
    }
}

/// Outcome of one search: `found` with all corners row-major, or a partial set.
#[derive(Debug, Clone, Default)]
pub struct CornerSearch {
    pub found: bool,
    pub corners: Vec<Vec2>,
}

pub trait ChessboardFinder: Send + Sync {
    fn find(&self, gray: &GrayImage, pattern: PatternSize) -> CornerSearch;
}

pub fn make_finder(method: DetectionMethod, flags: FindCornersFlags) -> Box<dyn ChessboardFinder> {
    match method {
        DetectionMethod::Classic => Box::new(ClassicFinder::new(flags)),
        DetectionMethod::SectorBased => Box::new(SectorBasedFinder::new(flags)),
    }
}

pub fn find_chessboard_corners(gray: &GrayImage, pattern: PatternSize, flags: FindCornersFlags) -> CornerSearch {
    ClassicFinder::new(flags).find(gray, pattern)
}

pub fn find_chessboard_corners_sb(gray: &GrayImage, pattern: PatternSize, flags: FindCornersFlags) -> CornerSearch {
    SectorBasedFinder::new(flags).find(gray, pattern)
}

/// Sub-pixel refinement on the raw grayscale image with a fixed window.
pub fn refine_corners(gray: &GrayImage, corners: &mut [Vec2], half_win: usize) {
    let img = self::image::FloatImage::from_gray(gray);
    corner_sub_pix(&img, corners, half_win, TermCriteria::default());
}
