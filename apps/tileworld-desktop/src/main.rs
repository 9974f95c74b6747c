mod app;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use winit::event_loop::{ControlFlow, EventLoop};

use crate::app::App;
use crate::config::{AppConfig, Overrides};

#[derive(Parser)]
#[command(name = "tileworld-desktop", about = "Fly over an endlessly streamed tile world")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Streaming radius in world units
    #[arg(long)]
    radius: Option<f32>,

    /// Start in borderless fullscreen
    #[arg(long)]
    fullscreen: bool,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Texture atlas image
    #[arg(long)]
    texture: Option<PathBuf>,

    /// WGSL shader replacing the built-in one
    #[arg(long)]
    shader: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            radius: self.radius,
            fullscreen: self.fullscreen,
            width: self.width,
            height: self.height,
            texture: self.texture.clone(),
            shader: self.shader.clone(),
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply(&cli.overrides());
    config.validate()?;
    tracing::info!(
        radius = config.stream.radius,
        tile_edge = config.stream.tile_edge,
        "tileworld-desktop starting"
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    app.into_result()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    run(&cli)
}
