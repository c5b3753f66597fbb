use std::fs;
use std::path::Path;

use chessboard_calibration::board::BoardConfig;
use chessboard_calibration::camera_model::PinholeCamera;
use chessboard_calibration::data_loader::pattern_path;
use chessboard_calibration::io::{object_from_json, object_to_json};
use chessboard_calibration::synthetic::generate_views;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render numbered chessboard images for a known camera
    Generate {
        /// Output directory
        #[arg(short, long)]
        output: String,

        /// Board configuration JSON, defaults to the 9x6 demo board
        #[arg(short, long)]
        board_config: Option<String>,

        /// Camera JSON, defaults to a 600 px pinhole with mild barrel distortion
        #[arg(short, long)]
        camera: Option<String>,

        /// Number of frames to generate
        #[arg(short, long, default_value = "13")]
        num_frames: usize,

        #[arg(long, default_value = "right")]
        prefix: String,

        /// Image width
        #[arg(long, default_value = "640")]
        width: u32,

        /// Image height
        #[arg(long, default_value = "480")]
        height: u32,

        /// Board distance along the optical axis
        #[arg(long, default_value = "900")]
        distance: f64,

        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Commands::Generate {
            output,
            board_config,
            camera,
            num_frames,
            prefix,
            width,
            height,
            distance,
            seed,
        } => {
            let board: BoardConfig = match board_config {
                Some(p) => object_from_json(Path::new(&p))?,
                None => BoardConfig::default(),
            };
            let camera: PinholeCamera = match camera {
                Some(p) => object_from_json(Path::new(&p))?,
                None => default_camera(width, height),
            };
            generate_dataset(&output, &board, &camera, num_frames, &prefix, (width, height), distance, seed)?;
        }
    }

    Ok(())
}

fn default_camera(width: u32, height: u32) -> PinholeCamera {
    PinholeCamera::new(600.0, 600.0, (width as f64 - 1.0) / 2.0, (height as f64 - 1.0) / 2.0)
        .with_distortion([-0.05, 0.01, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])
}

#[allow(clippy::too_many_arguments)]
fn generate_dataset(
    output_dir: &str,
    board: &BoardConfig,
    camera: &PinholeCamera,
    num_frames: usize,
    prefix: &str,
    w_h: (u32, u32),
    distance: f64,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = Path::new(output_dir);
    fs::create_dir_all(dir)?;

    let views = generate_views(camera, board, w_h, num_frames, distance, seed);
    for (i, view) in views.iter().enumerate() {
        view.image.save(pattern_path(dir, prefix, "png", i))?;
    }
    let poses: Vec<_> = views.iter().map(|v| v.pose).collect();
    let corners: Vec<Vec<[f32; 2]>> = views
        .iter()
        .map(|v| v.corners.iter().map(|c| c.to_array()).collect())
        .collect();

    object_to_json(&dir.join("camera.json"), camera)?;
    object_to_json(&dir.join("board.json"), board)?;
    object_to_json(&dir.join("poses.json"), &poses)?;
    object_to_json(&dir.join("corners.json"), &corners)?;

    log::info!("Generated {} frames in {}", num_frames, output_dir);
    Ok(())
}
