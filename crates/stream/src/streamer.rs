use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use glam::Vec3;
use parking_lot::RwLock;
use tileworld_assets::ResourceLoader;
use tileworld_kernel::TileGenerator;

use crate::config::StreamConfig;
use crate::grid::TileGrid;
use crate::resident::ResidentTiles;
use crate::stats::{StreamCounters, StreamStats};
use crate::StreamError;

/// Observer position published by the main loop, read by the streaming threads.
#[derive(Debug, Clone, Default)]
pub struct ObserverFeed(Arc<RwLock<Vec3>>);

impl ObserverFeed {
    pub fn new(position: Vec3) -> Self {
        Self(Arc::new(RwLock::new(position)))
    }

    pub fn publish(&self, position: Vec3) {
        *self.0.write() = position;
    }

    pub fn current(&self) -> Vec3 {
        *self.0.read()
    }
}

/// Number of streaming threads still alive.
///
/// Each thread holds a [`WorkerGuard`] for its whole life, including while
/// unwinding, so the count drops as soon as a thread ends for any reason.
#[derive(Debug, Clone, Default)]
pub struct StreamActivity(Arc<AtomicUsize>);

impl StreamActivity {
    pub fn live_workers(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn enter(&self) -> WorkerGuard {
        self.0.fetch_add(1, Ordering::AcqRel);
        WorkerGuard(self.clone())
    }
}

struct WorkerGuard(StreamActivity);

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        (self.0).0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Keeps the resident tile set in step with the observer.
///
/// The two passes can be driven directly, or from background threads via
/// [`spawn`](Self::spawn).
pub struct WorldStreamer {
    config: StreamConfig,
    grid: TileGrid,
    resident: Arc<ResidentTiles>,
    generator: Arc<dyn TileGenerator>,
    feed: ObserverFeed,
    counters: StreamCounters,
}

impl WorldStreamer {
    pub fn new(
        config: StreamConfig,
        generator: Arc<dyn TileGenerator>,
        feed: ObserverFeed,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        Ok(Self {
            grid: TileGrid::new(config.tile_edge),
            config,
            resident: Arc::new(ResidentTiles::new()),
            generator,
            feed,
            counters: StreamCounters::default(),
        })
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn resident(&self) -> &Arc<ResidentTiles> {
        &self.resident
    }

    pub fn feed(&self) -> &ObserverFeed {
        &self.feed
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats::snapshot(&self.counters, self.resident.resident_count())
    }

    /// Create up to `generation_budget` missing tiles around the observer,
    /// nearest first. Returns how many were created.
    ///
    /// A coordinate is reserved before its tile is built and released again
    /// if building fails, so a failed tile can be retried.
    pub fn generate_pass(&self) -> Result<usize, StreamError> {
        let _span = tracing::debug_span!("generate_pass").entered();
        let start = Instant::now();
        let center = self.feed.current();
        let edge = self.grid.edge();
        let mut created = 0;

        for coord in self.grid.coords_in_range(center, self.config.radius)? {
            if created >= self.config.generation_budget {
                break;
            }
            if !self.resident.try_reserve(coord) {
                continue;
            }
            match self.generator.generate(coord, edge) {
                Ok(tile) => {
                    tracing::debug!(
                        ?coord,
                        objects = tile.len(),
                        models = tile.models().len(),
                        "tile created"
                    );
                    self.resident.publish(tile);
                    created += 1;
                }
                Err(err) => {
                    self.resident.release(coord);
                    self.counters.record_generation(created, start.elapsed());
                    return Err(err.into());
                }
            }
        }

        self.counters.record_generation(created, start.elapsed());
        Ok(created)
    }

    /// Retire every resident tile outside the range. Returns how many were removed.
    pub fn retire_pass(&self) -> usize {
        let _span = tracing::debug_span!("retire_pass").entered();
        let start = Instant::now();
        let center = self.feed.current();
        let retired = self
            .resident
            .retire_out_of_range(&self.grid, center, self.config.radius);
        for coord in &retired {
            tracing::debug!(?coord, "tile retired");
        }
        self.counters.record_retirement(retired.len(), start.elapsed());
        retired.len()
    }

    /// Start the generation and retirement loops on their own threads.
    pub fn spawn(self) -> Result<StreamerHandle, StreamError> {
        let streamer = Arc::new(self);
        let running = Arc::new(AtomicBool::new(true));
        let activity = StreamActivity::default();
        let (errors_tx, errors_rx) = crossbeam_channel::unbounded();

        let mut threads = Vec::with_capacity(2);
        let generation = {
            let streamer = Arc::clone(&streamer);
            let running = Arc::clone(&running);
            let errors = errors_tx.clone();
            let guard = activity.enter();
            thread::Builder::new()
                .name("tile-generation".into())
                .spawn(move || {
                    let _guard = guard;
                    generation_loop(&streamer, &running, &errors)
                })
        };
        match generation {
            Ok(handle) => threads.push(handle),
            Err(e) => return Err(StreamError::Spawn(e)),
        }

        let retirement = {
            let streamer = Arc::clone(&streamer);
            let running = Arc::clone(&running);
            let guard = activity.enter();
            thread::Builder::new()
                .name("tile-retirement".into())
                .spawn(move || {
                    let _guard = guard;
                    retirement_loop(&streamer, &running, &errors_tx)
                })
        };
        match retirement {
            Ok(handle) => threads.push(handle),
            Err(e) => {
                running.store(false, Ordering::Release);
                for t in threads {
                    let _ = t.join();
                }
                return Err(StreamError::Spawn(e));
            }
        }

        tracing::info!(
            radius = streamer.config.radius,
            edge = streamer.config.tile_edge,
            "world streamer started"
        );
        Ok(StreamerHandle {
            streamer,
            running,
            activity,
            threads,
            errors: errors_rx,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Run one pass, turning a panic into an error for the main loop.
fn guarded<T>(
    thread: &str,
    pass: impl FnOnce() -> Result<T, StreamError>,
) -> Result<T, StreamError> {
    panic::catch_unwind(AssertUnwindSafe(pass)).unwrap_or_else(|payload| {
        Err(StreamError::WorkerPanicked {
            thread: thread.to_owned(),
            message: panic_message(&*payload),
        })
    })
}

fn generation_loop(streamer: &WorldStreamer, running: &AtomicBool, errors: &Sender<StreamError>) {
    let tick = streamer.config.tick_interval();
    while running.load(Ordering::Acquire) {
        if let Err(err) = guarded("tile-generation", || streamer.generate_pass()) {
            tracing::error!(%err, "tile generation failed");
            let _ = errors.send(err);
            break;
        }
        thread::sleep(tick);
    }
}

fn retirement_loop(streamer: &WorldStreamer, running: &AtomicBool, errors: &Sender<StreamError>) {
    let tick = streamer.config.tick_interval();
    while running.load(Ordering::Acquire) {
        if let Err(err) = guarded("tile-retirement", || Ok(streamer.retire_pass())) {
            tracing::error!(%err, "tile retirement failed");
            let _ = errors.send(err);
            break;
        }
        thread::sleep(tick);
    }
}

/// Owner of the running streaming threads.
///
/// Dropping the handle stops and joins them.
pub struct StreamerHandle {
    streamer: Arc<WorldStreamer>,
    running: Arc<AtomicBool>,
    activity: StreamActivity,
    threads: Vec<JoinHandle<()>>,
    errors: Receiver<StreamError>,
}

impl StreamerHandle {
    pub fn streamer(&self) -> &WorldStreamer {
        &self.streamer
    }

    pub fn resident(&self) -> &Arc<ResidentTiles> {
        self.streamer.resident()
    }

    pub fn feed(&self) -> &ObserverFeed {
        self.streamer.feed()
    }

    pub fn stats(&self) -> StreamStats {
        self.streamer.stats()
    }

    /// True while both loops are alive. A loop that stopped on an error or a
    /// panic makes this false even before [`shutdown`](Self::shutdown).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && !self.threads.is_empty()
            && self.activity.live_workers() == self.threads.len()
    }

    pub fn activity(&self) -> StreamActivity {
        self.activity.clone()
    }

    /// A failure reported by either streaming thread, if any.
    pub fn poll_error(&self) -> Option<StreamError> {
        self.errors.try_recv().ok()
    }

    /// Stop both loops and wait for them. Safe to call more than once.
    pub fn shutdown(&mut self) -> Result<(), StreamError> {
        if self.threads.is_empty() {
            return Ok(());
        }
        self.running.store(false, Ordering::Release);
        let mut result = Ok(());
        for handle in self.threads.drain(..) {
            let thread = handle.thread().name().unwrap_or("stream").to_owned();
            if let Err(payload) = handle.join() {
                let message = panic_message(&*payload);
                tracing::error!(%thread, %message, "streaming thread panicked");
                result = Err(StreamError::WorkerPanicked { thread, message });
            }
        }
        tracing::info!(stats = ?self.streamer.stats(), "world streamer stopped");
        result
    }

    /// Stop and join both loops, then release the loader's resources.
    ///
    /// The loader is released even when a thread ended badly; that failure
    /// is still returned.
    pub fn shutdown_and_release(
        &mut self,
        loader: &mut dyn ResourceLoader,
    ) -> Result<(), StreamError> {
        let stopped = self.shutdown();
        debug_assert_eq!(self.activity.live_workers(), 0);
        loader.release_all();
        stopped
    }
}

impl Drop for StreamerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tileworld_common::{ModelId, TileCoord};
    use tileworld_kernel::{FlatGenerator, KernelError, Tile};

    fn streamer(config: StreamConfig) -> WorldStreamer {
        WorldStreamer::new(
            config,
            Arc::new(FlatGenerator::new(ModelId(0))),
            ObserverFeed::default(),
        )
        .unwrap()
    }

    #[test]
    fn generation_respects_budget_and_order() {
        let s = streamer(StreamConfig {
            generation_budget: 5,
            ..Default::default()
        });
        assert_eq!(s.generate_pass().unwrap(), 5);
        assert!(s.resident().contains(TileCoord::new(0, 0)));
        assert_eq!(s.resident().resident_count(), 5);
        // first ring goes first
        for c in s.resident().coords() {
            assert!(c.ring_distance(TileCoord::new(0, 0)) <= 1, "{c:?}");
        }
    }

    #[test]
    fn passes_converge_on_full_range() {
        let s = streamer(StreamConfig::default());
        while s.generate_pass().unwrap() > 0 {}
        assert_eq!(s.resident().resident_count(), 81);
        assert_eq!(s.retire_pass(), 0);

        let stats = s.stats();
        assert_eq!(stats.tiles_created, 81);
        assert_eq!(stats.resident, 81);
    }

    #[test]
    fn moving_observer_retires_and_refills() {
        let s = streamer(StreamConfig {
            generation_budget: 1000,
            ..Default::default()
        });
        s.generate_pass().unwrap();
        s.feed().publish(Vec3::new(160.0, 2.0, 0.0));

        let retired = s.retire_pass();
        assert!(retired > 0);
        s.generate_pass().unwrap();

        let grid = s.grid();
        for c in s.resident().coords() {
            assert!(grid.in_range(c, Vec3::new(160.0, 2.0, 0.0), 64.0), "{c:?}");
        }
        let stats = s.stats();
        assert_eq!(
            stats.tiles_created - stats.tiles_retired,
            stats.resident as u64
        );
    }

    struct FailingGenerator;

    impl TileGenerator for FailingGenerator {
        fn generate(&self, coord: TileCoord, _edge: i32) -> Result<Tile, KernelError> {
            Err(KernelError::Allocation { coord, count: 256 })
        }
    }

    #[test]
    fn failed_generation_releases_reservation() {
        let s = WorldStreamer::new(
            StreamConfig::default(),
            Arc::new(FailingGenerator),
            ObserverFeed::default(),
        )
        .unwrap();
        let err = s.generate_pass().unwrap_err();
        assert!(matches!(err, StreamError::Allocation { .. }));
        assert_eq!(s.resident().occupied_count(), 0);
    }

    #[test]
    fn spawned_failure_reaches_the_channel() {
        let mut handle = WorldStreamer::new(
            StreamConfig::default(),
            Arc::new(FailingGenerator),
            ObserverFeed::default(),
        )
        .unwrap()
        .spawn()
        .unwrap();

        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        let err = loop {
            if let Some(err) = handle.poll_error() {
                break err;
            }
            assert!(Instant::now() < deadline, "no error reported");
            thread::sleep(std::time::Duration::from_millis(1));
        };
        assert!(matches!(err, StreamError::Allocation { .. }));
        handle.shutdown().unwrap();
        assert!(!handle.is_running());
    }

    struct PanickingGenerator;

    impl TileGenerator for PanickingGenerator {
        fn generate(&self, _coord: TileCoord, _edge: i32) -> Result<Tile, KernelError> {
            panic!("generator exploded");
        }
    }

    #[test]
    fn generator_panic_reaches_the_channel() {
        let mut handle = WorldStreamer::new(
            StreamConfig::default(),
            Arc::new(PanickingGenerator),
            ObserverFeed::default(),
        )
        .unwrap()
        .spawn()
        .unwrap();

        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        let err = loop {
            if let Some(err) = handle.poll_error() {
                break err;
            }
            assert!(Instant::now() < deadline, "panic was not reported");
            thread::sleep(std::time::Duration::from_millis(1));
        };
        match err {
            StreamError::WorkerPanicked { thread, message } => {
                assert_eq!(thread, "tile-generation");
                assert!(message.contains("generator exploded"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }

        while handle.activity().live_workers() > 1 {
            assert!(Instant::now() < deadline, "generation thread still alive");
            thread::sleep(std::time::Duration::from_millis(1));
        }
        assert!(!handle.is_running());
        handle.shutdown().unwrap();
        assert_eq!(handle.activity().live_workers(), 0);
    }

    #[test]
    fn oversized_range_is_an_error_not_a_panic() {
        let s = streamer(StreamConfig::default());
        let err = s.grid().coords_in_range(Vec3::ZERO, 1.0e6).unwrap_err();
        assert!(matches!(err, StreamError::RangeTooLarge { .. }));
        assert!(s.generate_pass().is_ok());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = WorldStreamer::new(
            StreamConfig {
                tile_edge: -1,
                ..Default::default()
            },
            Arc::new(FlatGenerator::new(ModelId(0))),
            ObserverFeed::default(),
        );
        assert!(matches!(result, Err(StreamError::InvalidConfig(_))));
    }
}
