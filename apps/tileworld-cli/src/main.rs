mod simulate;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::simulate::{ScriptedInput, SimOptions};

#[derive(Parser)]
#[command(name = "tileworld-cli", about = "Headless tileworld runs")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the default configuration
    Info,
    /// Run the frame loop without a window and report what it did
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value = "240")]
        frames: u64,
        /// Streaming radius in world units
        #[arg(short, long, default_value = "64")]
        radius: f32,
        /// Tile edge length in world units
        #[arg(long, default_value = "16")]
        tile_edge: i32,
        /// Hold the forward key for the whole run
        #[arg(long)]
        forward: bool,
        /// Horizontal pointer motion per frame
        #[arg(long, default_value = "0")]
        turn: f32,
        /// Alternate two models on a checkerboard
        #[arg(long)]
        checker: bool,
        /// Stream on background threads instead of inline passes
        #[arg(long)]
        background: bool,
        /// Texture atlas image
        #[arg(long)]
        texture: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            let defaults = SimOptions::default();
            println!("tileworld-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("stream: {}", serde_json::to_string(&defaults.stream)?);
            println!("controller: {}", serde_json::to_string(&defaults.controller)?);
            println!(
                "render: {}",
                serde_json::to_string(&tileworld_render::RenderConfig::default())?
            );
        }
        Commands::Simulate {
            frames,
            radius,
            tile_edge,
            forward,
            turn,
            checker,
            background,
            texture,
            json,
        } => {
            let mut options = SimOptions {
                frames,
                input: ScriptedInput { forward, turn },
                checker,
                background,
                texture,
                ..Default::default()
            };
            options.stream.radius = radius;
            options.stream.tile_edge = tile_edge;

            let report = simulate::run(&options)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Simulated {} frames", report.frames);
                println!("  models: {}", report.models.join(", "));
                println!(
                    "  observer: ({:.2}, {:.2}, {:.2}) yaw {:.1}",
                    report.position[0], report.position[1], report.position[2], report.yaw
                );
                println!(
                    "  tiles: created={} retired={} resident={}",
                    report.tiles_created, report.tiles_retired, report.resident
                );
                println!(
                    "  last frame: objects={} draw_calls={}",
                    report.last_frame_objects, report.last_frame_draw_calls
                );
                println!(
                    "  total draw calls: {}, avg frame {}us",
                    report.total_draw_calls, report.average_frame_us
                );
                println!(
                    "  resources: {} loaded, {} freed",
                    report.live_resources, report.freed_resources
                );
            }
        }
    }

    Ok(())
}
