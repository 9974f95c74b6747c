use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use tileworld_assets::{DefaultModels, ModelRegistry, ResourceLoader};
use tileworld_common::{Observer, Placement};
use tileworld_input::{Action, InputState, Key, ObserverController};
use tileworld_kernel::{FlatGenerator, SpatialObject};
use tileworld_render::BatchRenderer;
use tileworld_render_wgpu::{GpuLoader, StaticShader, WgpuRenderer};
use tileworld_stream::{FrameTimer, ObserverFeed, StreamerHandle, WorldStreamer};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Fullscreen, Window, WindowId};

use crate::config::AppConfig;

/// Frames between timing reports.
const REPORT_EVERY: u64 = 600;

pub fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyS => Key::S,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::KeyE => Key::E,
        KeyCode::Escape => Key::Escape,
        _ => return None,
    })
}

/// Input state at startup: the pointer starts grabbed so the observer can
/// look around immediately.
pub fn startup_input() -> InputState {
    let mut input = InputState::new();
    input.set_grabbed(true);
    input
}

/// Pacing interval for a frame cap; zero means uncapped.
pub fn frame_interval(fps_cap: u32) -> Option<Duration> {
    (fps_cap > 0).then(|| Duration::from_secs_f64(1.0 / fps_cap as f64))
}

/// Everything that exists only while the window does. Field order is drop
/// order: GPU resources go before the surface, the surface before the window.
struct Running {
    streamer: StreamerHandle,
    batch: BatchRenderer,
    registry: ModelRegistry,
    loader: GpuLoader,
    renderer: WgpuRenderer,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    window: Arc<Window>,

    observer: Observer,
    input: InputState,
    controller: ObserverController,
    showcase: SpatialObject,
    radius: f32,

    timer: FrameTimer,
    frames: u64,
    last_frame: Instant,
    next_frame: Instant,
    interval: Option<Duration>,
}

impl Running {
    fn start(event_loop: &ActiveEventLoop, config: &AppConfig) -> Result<Self> {
        let mut attrs = Window::default_attributes()
            .with_title(config.window.title.clone())
            .with_inner_size(PhysicalSize::new(config.window.width, config.window.height));
        if config.window.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let window = Arc::new(event_loop.create_window(attrs).context("creating window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("creating surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("no compatible graphics adapter"))?;
        tracing::info!(adapter = ?adapter.get_info().name, "adapter selected");

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("tileworld_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("creating graphics device")?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("surface reports no supported formats"))?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let shader = match &config.shader {
            Some(path) => StaticShader::from_file(path)?,
            None => StaticShader::default(),
        };
        let mut loader = GpuLoader::new(device.clone(), queue.clone());
        let renderer = WgpuRenderer::new(
            &device,
            &loader,
            &shader,
            format,
            (width, height),
            config.render.clear_color,
        )
        .context("building render pipeline")?;

        let (registry, models) = match DefaultModels::load(&mut loader, config.texture.as_deref())
        {
            Ok(loaded) => loaded,
            Err(err) => {
                loader.release_all();
                return Err(err).context("loading models");
            }
        };

        let observer = Observer::default();
        let generator = Arc::new(FlatGenerator::new(models.ground));
        let feed = ObserverFeed::new(observer.position);
        let streamer = match WorldStreamer::new(config.stream.clone(), generator, feed)
            .and_then(WorldStreamer::spawn)
        {
            Ok(handle) => handle,
            Err(err) => {
                loader.release_all();
                return Err(err).context("starting world streamer");
            }
        };

        let showcase = SpatialObject::new(
            models.showcase,
            Placement {
                position: Vec3::new(0.0, 3.0, -6.0),
                rotation: Vec3::ZERO,
                scale: 1.5,
            },
        );

        tracing::info!(width, height, ?format, "window ready");
        let now = Instant::now();
        let running = Self {
            streamer,
            batch: BatchRenderer::new(&config.render, width, height),
            registry,
            loader,
            renderer,
            surface,
            surface_config,
            device,
            queue,
            window,
            observer,
            input: startup_input(),
            controller: config.controller,
            showcase,
            radius: config.stream.radius,
            timer: FrameTimer::new(120),
            frames: 0,
            last_frame: now,
            next_frame: now,
            interval: frame_interval(config.render.fps_cap),
        };
        running.apply_grab();
        Ok(running)
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface.configure(&self.device, &self.surface_config);
        if self.batch.resize(size.width, size.height) {
            self.renderer.resize(&self.device, size.width, size.height);
        }
    }

    fn toggle_grab(&mut self) {
        self.input.toggle_grab();
        self.apply_grab();
    }

    /// Make the window cursor follow the input grab state.
    fn apply_grab(&self) {
        let grabbed = self.input.is_grabbed();
        let result = if grabbed {
            self.window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Locked))
        } else {
            self.window.set_cursor_grab(CursorGrabMode::None)
        };
        if let Err(err) = result {
            tracing::warn!("cursor grab unavailable: {err}");
        }
        self.window.set_cursor_visible(!grabbed);
        tracing::debug!(grabbed, "cursor grab applied");
    }

    fn frame(&mut self) -> Result<()> {
        let _span = tracing::debug_span!("frame", n = self.frames).entered();
        let now = Instant::now();
        self.timer.record(now - self.last_frame);
        self.last_frame = now;

        if let Some(err) = self.streamer.poll_error() {
            return Err(err).context("world streaming failed");
        }

        self.controller.apply(&mut self.observer, &mut self.input);
        self.streamer.feed().publish(self.observer.position);
        self.showcase.rotate(Vec3::new(0.0, 1.0, 0.0));

        let output = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timed out, skipping frame");
                return Ok(());
            }
            Err(err) => return Err(anyhow!("surface error: {err}")),
        };
        let view = output.texture.create_view(&Default::default());

        let grid = *self.streamer.streamer().grid();
        for tile in self
            .streamer
            .resident()
            .visible(&grid, self.observer.position, self.radius)
        {
            self.batch.add_tile(&tile);
        }
        self.batch.add_object(&self.showcase);

        let mut pass = self
            .renderer
            .frame(&self.device, &self.queue, &self.loader, &view);
        let stats = self
            .batch
            .render_frame(&mut pass, &self.registry, &self.observer)?;
        drop(pass);
        output.present();

        self.frames += 1;
        if self.frames % REPORT_EVERY == 0 {
            tracing::debug!(
                fps = self.timer.fps(),
                worst_ms = self.timer.max().as_secs_f32() * 1000.0,
                objects = stats.objects,
                draw_calls = stats.draw_calls,
                resident = self.streamer.resident().resident_count(),
                "frame report"
            );
        }
        Ok(())
    }

    /// Stop streaming, release GPU resources, then let the window go.
    fn shutdown(mut self) -> Result<()> {
        let stopped = self.streamer.shutdown_and_release(&mut self.loader);
        let Self {
            renderer,
            surface,
            window,
            ..
        } = self;
        drop(renderer);
        drop(surface);
        drop(window);
        tracing::info!("shutdown complete");
        stopped.context("stopping world streamer")
    }
}

pub struct App {
    config: AppConfig,
    running: Option<Running>,
    fatal: Option<anyhow::Error>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            running: None,
            fatal: None,
        }
    }

    /// The first fatal error seen while the loop ran.
    pub fn into_result(mut self) -> Result<()> {
        self.stop();
        match self.fatal {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            if let Err(err) = running.shutdown() {
                tracing::error!("{err:#}");
                self.fatal.get_or_insert(err);
            }
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{err:#}");
        self.fatal.get_or_insert(err);
        self.stop();
        event_loop.exit();
    }

    fn quit(&mut self, event_loop: &ActiveEventLoop) {
        self.stop();
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match Running::start(event_loop, &self.config) {
            Ok(running) => {
                running.window.request_redraw();
                self.running = Some(running);
            }
            Err(err) => self.fail(event_loop, err.context("startup failed")),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => self.quit(event_loop),
            WindowEvent::Resized(size) => running.resize(size),
            WindowEvent::Focused(false) => running.input.clear(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                let Some(key) = map_key(code) else {
                    return;
                };
                match state {
                    ElementState::Released => running.input.release(key),
                    ElementState::Pressed if repeat => {}
                    ElementState::Pressed => match running.input.press(key) {
                        Some(Action::Quit) => self.quit(event_loop),
                        Some(Action::ToggleGrab) => running.toggle_grab(),
                        None => {}
                    },
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = running.frame() {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let (Some(running), DeviceEvent::MouseMotion { delta }) = (self.running.as_mut(), event)
        {
            // Screen y grows downward; the controller expects up to be positive.
            running
                .input
                .add_pointer_delta(delta.0 as f32, -(delta.1 as f32));
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        match running.interval {
            Some(interval) => {
                let now = Instant::now();
                if now >= running.next_frame {
                    running.next_frame = (running.next_frame + interval).max(now);
                    running.window.request_redraw();
                }
                event_loop.set_control_flow(ControlFlow::WaitUntil(running.next_frame));
            }
            None => {
                event_loop.set_control_flow(ControlFlow::Poll);
                running.window.request_redraw();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.stop();
    }
}
