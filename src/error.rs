use thiserror::Error;

/// Errors produced by the calibration pipeline.
#[derive(Error, Debug)]
pub enum CalibError {
    #[error("no views were supplied for calibration")]
    NoViews,

    #[error("view {view}: {object} object points but {image} image points")]
    PointCountMismatch {
        view: usize,
        object: usize,
        image: usize,
    },

    #[error("view {view} has {count} points, at least 4 are required")]
    TooFewPoints { view: usize, count: usize },

    #[error("object points differ between views, release mode needs one shared template")]
    TemplateMismatch,

    #[error("fixed point index {index} must lie in 1..{upper}")]
    FixedPointOutOfRange { index: usize, upper: usize },

    #[error("non-planar calibration target requires an intrinsic guess")]
    NonPlanarTarget,

    #[error("intrinsic initialisation failed: {0}")]
    Initialisation(String),

    #[error("levenberg-marquardt did not converge")]
    SolverFailed,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}
