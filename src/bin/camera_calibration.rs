use std::path::PathBuf;
use std::time::Instant;

use chessboard_calibration::config::CalibrationConfig;
use chessboard_calibration::data_loader::ImageSource;
use chessboard_calibration::detection::DetectionMethod;
use chessboard_calibration::pipeline;
use clap::Parser;

#[derive(Parser)]
#[command(version, about, author)]
struct CCRSCli {
    /// JSON run configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// folder with <prefix>NN.<ext> images
    #[arg(long)]
    image_dir: Option<PathBuf>,

    #[arg(long)]
    prefix: Option<String>,

    #[arg(long)]
    extension: Option<String>,

    /// number of images to read
    #[arg(long)]
    count: Option<usize>,

    /// glob over images, replaces the numbered pattern
    #[arg(long, conflicts_with_all = ["image_dir", "prefix", "extension", "count"])]
    glob: Option<String>,

    /// inner corners per column
    #[arg(long)]
    rows: Option<usize>,

    /// inner corners per row
    #[arg(long)]
    cols: Option<usize>,

    #[arg(long)]
    square_size: Option<f32>,

    /// measured top-left to top-right corner distance
    #[arg(long)]
    grid_width: Option<f32>,

    /// plain calibration without releasing the board points
    #[arg(long)]
    legacy: bool,

    #[arg(long, value_enum)]
    method: Option<DetectionMethod>,

    /// find flags as an integer
    #[arg(long)]
    find_flags: Option<u32>,

    /// calibration flags as an integer
    #[arg(long)]
    calibration_flags: Option<u32>,

    #[arg(long)]
    no_subpix: bool,

    #[arg(long)]
    output: Option<PathBuf>,

    /// write detection overlays here
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// write undistorted images here
    #[arg(long)]
    undistort_dir: Option<PathBuf>,

    /// record to this rerun file
    #[arg(long)]
    rerun: Option<PathBuf>,
}

impl CCRSCli {
    fn into_config(self) -> Result<CalibrationConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => CalibrationConfig::from_json_file(path)?,
            None => CalibrationConfig::default(),
        };
        if let Some(pattern) = self.glob {
            config.source = ImageSource::Glob { pattern };
        } else if let ImageSource::Pattern {
            dir,
            prefix,
            extension,
            count,
        } = &mut config.source
        {
            if let Some(d) = self.image_dir {
                *dir = d;
            }
            if let Some(p) = self.prefix {
                *prefix = p;
            }
            if let Some(e) = self.extension {
                *extension = e;
            }
            if let Some(c) = self.count {
                *count = c;
            }
        }
        if let Some(r) = self.rows {
            config.board.rows = r;
        }
        if let Some(c) = self.cols {
            config.board.cols = c;
        }
        if let Some(s) = self.square_size {
            config.board.square_size = s;
        }
        if let Some(w) = self.grid_width {
            config.board.grid_width = w;
        }
        if self.legacy {
            config.board.release_object = false;
        }
        if let Some(m) = self.method {
            config.method = m;
        }
        if self.find_flags.is_some() {
            config.find_flags = self.find_flags;
        }
        if let Some(f) = self.calibration_flags {
            config.calibration_flags = f;
        }
        if self.no_subpix {
            config.enable_corner_sub_pix = false;
        }
        if let Some(o) = self.output {
            config.output = o;
        }
        if self.overlay_dir.is_some() {
            config.overlay_dir = self.overlay_dir;
        }
        if self.undistort_dir.is_some() {
            config.undistort_dir = self.undistort_dir;
        }
        if self.rerun.is_some() {
            config.rerun = self.rerun;
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = CCRSCli::parse();
    let config = cli.into_config()?;

    let now = Instant::now();
    let output = pipeline::run(&config)?;
    let duration_sec = now.elapsed().as_secs_f64();
    log::info!("run took {:.6} sec", duration_sec);
    log::info!(
        "{} of {} views used",
        output.report.views_used,
        output.frames.len()
    );
    Ok(())
}
