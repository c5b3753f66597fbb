use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Physical description of the chessboard target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Inner corners per column (pattern height).
    pub rows: usize,
    /// Inner corners per row (pattern width).
    pub cols: usize,
    /// Square side in the user's metric (pixels, millimetres, ...).
    pub square_size: f32,
    /// Measured distance between the top-left and top-right inner corners.
    pub grid_width: f32,
    /// Use the measured grid width and let the optimizer refine the board.
    pub release_object: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            rows: 6,
            cols: 9,
            square_size: 50.0,
            grid_width: 400.0,
            release_object: true,
        }
    }
}

impl BoardConfig {
    /// Grid width actually applied to the top-right corner.
    pub fn effective_grid_width(&self) -> f32 {
        if self.release_object {
            self.grid_width
        } else {
            self.square_size * (self.cols as f32 - 1.0)
        }
    }

    pub fn corner_count(&self) -> usize {
        self.rows * self.cols
    }
}

/// Canonical corner positions of one board in target-local space.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTemplate {
    pub rows: usize,
    pub cols: usize,
    pub points: Vec<Vec3>,
    /// Index held fixed when the board is released, `None` in legacy mode.
    pub fixed_point: Option<usize>,
}

impl ObjectTemplate {
    pub fn new(board_config: &BoardConfig) -> ObjectTemplate {
        let rows = board_config.rows;
        let cols = board_config.cols;
        let s = board_config.square_size;
        let mut points = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                points.push(Vec3::new(c as f32 * s, r as f32 * s, 0.0));
            }
        }
        if cols > 0 && rows > 0 {
            points[cols - 1].x = points[0].x + board_config.effective_grid_width();
        }
        let fixed_point = if board_config.release_object && cols > 0 {
            Some(cols - 1)
        } else {
            None
        };
        ObjectTemplate {
            rows,
            cols,
            points,
            fixed_point,
        }
    }

    /// One copy of the template per view.
    pub fn replicate(&self, views: usize) -> Vec<Vec<Vec3>> {
        (0..views).map(|_| self.points.clone()).collect()
    }

    /// Indices of the four outer corners: top-left, top-right, bottom-left, bottom-right.
    pub fn outer_corner_indices(&self) -> [usize; 4] {
        let last = self.points.len().saturating_sub(1);
        [
            0,
            self.cols.saturating_sub(1),
            self.cols * self.rows.saturating_sub(1),
            last,
        ]
    }
}
