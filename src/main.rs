// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use virtual_window::render::ParallaxMode;

mod cli;

#[derive(Parser)]
#[command(name = "virtual-window")]
#[command(about = "Head-tracked virtual window with depth parallax")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the viewer position from one face sample
    Estimate {
        /// Face center x in the (mirrored) camera image, 0..1
        #[arg(long)]
        face_x: f32,

        /// Face center y in the camera image, 0..1 (0 = top)
        #[arg(long)]
        face_y: f32,

        /// Eye distance as a fraction of the image width
        #[arg(long)]
        eye_distance: f32,
    },

    /// Print the off-axis frustum for an eye position (cm)
    Frustum {
        #[arg(long, allow_hyphen_values = true)]
        x: f32,

        #[arg(long, allow_hyphen_values = true)]
        y: f32,

        #[arg(long)]
        z: f32,

        /// Near clip distance (default from config)
        #[arg(long)]
        near: Option<f32>,

        /// Far clip distance (default from config)
        #[arg(long)]
        far: Option<f32>,
    },

    /// Render one frame headless to a PNG
    Render {
        /// Color image
        #[arg(long)]
        color: PathBuf,

        /// Depth map (white = near); a radial map is generated when omitted
        #[arg(long)]
        depth: Option<PathBuf>,

        /// Alpha mask
        #[arg(long)]
        mask: Option<PathBuf>,

        /// Eye position (cm)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        x: f32,

        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        y: f32,

        #[arg(long, default_value = "60")]
        z: f32,

        /// single or layered (default from config)
        #[arg(long)]
        mode: Option<ParallaxMode>,

        #[arg(long, default_value = "1280")]
        width: u32,

        #[arg(long, default_value = "800")]
        height: u32,

        /// Use the software renderer even when a GPU is available
        #[arg(long)]
        cpu: bool,

        /// Output file path (default: ~/Pictures/VirtualWindow/render_TIMESTAMP.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Drive the tracker with a synthetic detector and print smoothed positions
    Simulate {
        /// Number of render ticks
        #[arg(short, long, default_value = "120")]
        frames: u32,

        /// Render ticks per second
        #[arg(long, default_value = "60")]
        fps: u32,

        /// Detector samples per second
        #[arg(long, default_value = "15")]
        detector_hz: u32,
    },

    /// Show or reset the stored configuration
    Config {
        /// Overwrite the stored configuration with defaults
        #[arg(long)]
        reset: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=virtual_window=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Estimate {
            face_x,
            face_y,
            eye_distance,
        } => cli::estimate(face_x, face_y, eye_distance),
        Commands::Frustum { x, y, z, near, far } => cli::frustum(x, y, z, near, far),
        Commands::Render {
            color,
            depth,
            mask,
            x,
            y,
            z,
            mode,
            width,
            height,
            cpu,
            output,
        } => cli::render(cli::RenderArgs {
            color,
            depth,
            mask,
            eye: [x, y, z],
            mode,
            width,
            height,
            force_cpu: cpu,
            output,
        }),
        Commands::Simulate {
            frames,
            fps,
            detector_hz,
        } => cli::simulate(frames, fps, detector_hz),
        Commands::Config { reset } => cli::config(reset),
    }
}
