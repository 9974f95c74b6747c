use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use tileworld_assets::{DefaultModels, ModelRegistry, ResourceLoader};
use tileworld_common::Observer;
use tileworld_input::{InputSource, Key, ObserverController};
use tileworld_kernel::{CheckerGenerator, FlatGenerator, TileGenerator};
use tileworld_render::{BatchRenderer, CommandRecorder, HeadlessLoader, RenderConfig};
use tileworld_stream::{
    FrameTimer, ObserverFeed, StreamConfig, StreamStats, StreamerHandle, WorldStreamer,
};

/// Input replayed identically every frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedInput {
    pub forward: bool,
    pub turn: f32,
}

impl InputSource for ScriptedInput {
    fn is_key_down(&self, key: Key) -> bool {
        self.forward && matches!(key, Key::W)
    }

    fn take_pointer_delta(&mut self) -> (f32, f32) {
        (self.turn, 0.0)
    }
}

#[derive(Debug, Clone)]
pub struct SimOptions {
    pub frames: u64,
    pub stream: StreamConfig,
    pub controller: ObserverController,
    pub input: ScriptedInput,
    pub checker: bool,
    pub background: bool,
    pub texture: Option<PathBuf>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            frames: 240,
            stream: StreamConfig::default(),
            controller: ObserverController::default(),
            input: ScriptedInput::default(),
            checker: false,
            background: false,
            texture: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub frames: u64,
    pub position: [f32; 3],
    pub yaw: f32,
    pub tiles_created: u64,
    pub tiles_retired: u64,
    pub resident: usize,
    pub last_frame_objects: usize,
    pub last_frame_draw_calls: usize,
    pub total_draw_calls: usize,
    pub models: Vec<String>,
    pub live_resources: usize,
    pub freed_resources: usize,
    pub average_frame_us: u128,
}

enum Driver {
    /// Generation and retirement run on the frame thread, one pass each per frame.
    Inline(WorldStreamer),
    Background(StreamerHandle),
}

impl Driver {
    fn streamer(&self) -> &WorldStreamer {
        match self {
            Driver::Inline(streamer) => streamer,
            Driver::Background(handle) => handle.streamer(),
        }
    }

    fn tick(&self) -> Result<()> {
        match self {
            Driver::Inline(streamer) => {
                streamer.generate_pass()?;
                streamer.retire_pass();
                Ok(())
            }
            Driver::Background(handle) => match handle.poll_error() {
                Some(err) => Err(err).context("background streaming failed"),
                None => Ok(()),
            },
        }
    }

    /// Stop streaming, then release the loader.
    fn finish(self, loader: &mut dyn ResourceLoader) -> Result<StreamStats> {
        match self {
            Driver::Inline(streamer) => {
                loader.release_all();
                Ok(streamer.stats())
            }
            Driver::Background(mut handle) => {
                handle.shutdown_and_release(loader)?;
                Ok(handle.stats())
            }
        }
    }
}

#[derive(Debug, Default)]
struct Totals {
    last_objects: usize,
    last_draws: usize,
    draws: usize,
}

fn drive(
    options: &SimOptions,
    driver: &Driver,
    registry: &ModelRegistry,
    observer: &mut Observer,
    timer: &mut FrameTimer,
) -> Result<Totals> {
    let render = RenderConfig::default();
    let pace = options
        .background
        .then(|| Duration::from_secs_f64(1.0 / render.fps_cap.max(1) as f64));
    let mut batch = BatchRenderer::new(&render, 1920, 1080);
    let mut recorder = CommandRecorder::new();
    let mut input = options.input;
    let mut totals = Totals::default();

    for frame in 0..options.frames {
        let started = Instant::now();
        options.controller.apply(observer, &mut input);

        let streamer = driver.streamer();
        streamer.feed().publish(observer.position);
        driver.tick()?;

        let grid = *streamer.grid();
        for tile in streamer
            .resident()
            .visible(&grid, observer.position, options.stream.radius)
        {
            batch.add_tile(&tile);
        }

        recorder.clear();
        let stats = batch.render_frame(&mut recorder, registry, observer)?;
        totals.last_objects = stats.objects;
        totals.last_draws = stats.draw_calls;
        totals.draws += stats.draw_calls;
        tracing::trace!(frame, objects = stats.objects, "frame recorded");

        if let Some(interval) = pace {
            if let Some(rest) = interval.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
        timer.record(started.elapsed());
    }
    Ok(totals)
}

/// Drive the whole frame loop without a window: move the observer, stream
/// tiles around it, batch what is visible and record the draw calls.
pub fn run(options: &SimOptions) -> Result<SimReport> {
    let mut loader = HeadlessLoader::new();
    let (registry, models) = DefaultModels::load(&mut loader, options.texture.as_deref())
        .context("loading models")?;
    let live_resources = loader.live_resources();

    let generator: Arc<dyn TileGenerator> = if options.checker {
        Arc::new(CheckerGenerator::new(models.ground, models.marker))
    } else {
        Arc::new(FlatGenerator::new(models.ground))
    };

    let mut observer = Observer::default();
    let feed = ObserverFeed::new(observer.position);
    let streamer = match WorldStreamer::new(options.stream.clone(), generator, feed) {
        Ok(streamer) => streamer,
        Err(err) => {
            loader.release_all();
            return Err(err.into());
        }
    };
    let driver = if options.background {
        match streamer.spawn() {
            Ok(handle) => Driver::Background(handle),
            Err(err) => {
                loader.release_all();
                return Err(err.into());
            }
        }
    } else {
        Driver::Inline(streamer)
    };

    let mut timer = FrameTimer::new(120);
    let outcome = drive(options, &driver, &registry, &mut observer, &mut timer);
    let stopped = driver.finish(&mut loader);
    let totals = outcome?;
    let stats = stopped?;

    Ok(SimReport {
        frames: options.frames,
        position: observer.position.to_array(),
        yaw: observer.yaw(),
        tiles_created: stats.tiles_created,
        tiles_retired: stats.tiles_retired,
        resident: stats.resident,
        last_frame_objects: totals.last_objects,
        last_frame_draw_calls: totals.last_draws,
        total_draw_calls: totals.draws,
        models: registry
            .iter()
            .map(|(_, name, _)| name.to_owned())
            .collect(),
        live_resources,
        freed_resources: loader.releases(),
        average_frame_us: timer.average().as_micros(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_world() -> StreamConfig {
        StreamConfig {
            radius: 32.0,
            tile_edge: 16,
            generation_budget: 64,
            ..Default::default()
        }
    }

    #[test]
    fn stationary_run_fills_the_radius() {
        let report = run(&SimOptions {
            frames: 3,
            stream: small_world(),
            ..Default::default()
        })
        .unwrap();

        // Radius 32 over 16-unit tiles covers a 5x5 block around the origin tile.
        assert_eq!(report.resident, 25);
        assert_eq!(report.tiles_created, 25);
        assert_eq!(report.tiles_retired, 0);
        assert_eq!(report.last_frame_objects, 25 * 256);
        assert_eq!(report.last_frame_draw_calls, 25 * 256);
        assert_eq!(report.live_resources, 4);
        assert_eq!(report.freed_resources, 4);
        assert_eq!(report.models, ["ground", "showcase", "marker"]);
        assert_eq!(report.position, [0.0, 2.0, 0.0]);
    }

    #[test]
    fn walking_forward_retires_tiles_behind() {
        let report = run(&SimOptions {
            frames: 400,
            stream: small_world(),
            input: ScriptedInput {
                forward: true,
                turn: 0.0,
            },
            ..Default::default()
        })
        .unwrap();

        // 400 frames at 0.3 per frame along -z.
        assert!((report.position[2] + 120.0).abs() < 1e-2, "{:?}", report.position);
        assert!(report.tiles_retired > 0);
        // Off a tile boundary the span can shrink to four rows.
        assert!((20..=25).contains(&report.resident), "{}", report.resident);
        assert_eq!(
            report.tiles_created - report.tiles_retired,
            report.resident as u64
        );
    }

    #[test]
    fn pointer_turn_accumulates_yaw() {
        let report = run(&SimOptions {
            frames: 10,
            stream: small_world(),
            input: ScriptedInput {
                forward: false,
                turn: 5.0,
            },
            ..Default::default()
        })
        .unwrap();
        assert!((report.yaw - 5.0).abs() < 1e-4);
    }

    #[test]
    fn checker_world_draws_two_models() {
        let report = run(&SimOptions {
            frames: 2,
            stream: small_world(),
            checker: true,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(report.last_frame_objects, 25 * 256);
    }

    #[test]
    fn background_run_frees_every_resource() {
        let report = run(&SimOptions {
            frames: 20,
            stream: small_world(),
            background: true,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(report.live_resources, 4);
        assert_eq!(report.freed_resources, 4);
        assert!(report.tiles_created > 0);
    }

    #[test]
    fn missing_texture_aborts_before_streaming() {
        let err = run(&SimOptions {
            texture: Some(PathBuf::from("/nonexistent/atlas.png")),
            ..Default::default()
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("loading models"));
    }
}
