//! Flag sets for corner search and calibration.
//!
//! Bit values follow the OpenCV `calib3d` constants so that logged integers
//! can be compared directly with OpenCV runs on the same data.

use bitflags::bitflags;

bitflags! {
    /// Options for the chessboard corner search.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FindCornersFlags: u32 {
        /// Threshold the corner response relative to its maximum instead of a fixed level.
        const ADAPTIVE_THRESH = 1;
        /// Stretch image contrast before searching.
        const NORMALIZE_IMAGE = 2;
        /// Accepted for compatibility, no effect.
        const FILTER_QUADS = 4;
        /// Give up early when there are fewer candidates than pattern corners.
        const FAST_CHECK = 8;
        /// Retry the sector-based search with lower thresholds.
        const EXHAUSTIVE = 16;
        /// Refine sector-based corners with a gradient fit.
        const ACCURACY = 32;
    }
}

bitflags! {
    /// Options selecting which camera parameters are estimated.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CalibFlags: u32 {
        const USE_INTRINSIC_GUESS = 1;
        const FIX_ASPECT_RATIO = 2;
        const FIX_PRINCIPAL_POINT = 4;
        const ZERO_TANGENT_DIST = 8;
        const FIX_FOCAL_LENGTH = 16;
        const FIX_K1 = 32;
        const FIX_K2 = 64;
        const FIX_K3 = 128;
        const FIX_K4 = 2048;
        const FIX_K5 = 4096;
        const FIX_K6 = 8192;
        const RATIONAL_MODEL = 16384;
        const USE_LU = 1 << 17;
    }
}

impl FindCornersFlags {
    /// Flags used with the sector-based search.
    pub fn sector_based_default() -> Self {
        Self::NORMALIZE_IMAGE | Self::EXHAUSTIVE | Self::ACCURACY
    }

    /// Flags used with the classic search.
    pub fn classic_default() -> Self {
        Self::ADAPTIVE_THRESH | Self::NORMALIZE_IMAGE | Self::FAST_CHECK
    }
}

impl Default for CalibFlags {
    fn default() -> Self {
        Self::FIX_PRINCIPAL_POINT
            | Self::FIX_ASPECT_RATIO
            | Self::ZERO_TANGENT_DIST
            | Self::FIX_K4
            | Self::FIX_K5
    }
}
