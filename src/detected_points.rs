use glam::Vec2;

/// Corner search outcome for one loaded image.
#[derive(Debug, Clone)]
pub struct FrameCorners {
    /// Index of the source file in the calibration sequence.
    pub image_index: usize,
    pub img_w_h: (u32, u32),
    pub found: bool,
    /// Row-major corners when `found`, otherwise whatever partial set was seen.
    pub corners: Vec<Vec2>,
}
