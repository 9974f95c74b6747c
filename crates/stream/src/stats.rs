use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters updated by the streaming threads.
#[derive(Debug, Default)]
pub(crate) struct StreamCounters {
    pub tiles_created: AtomicU64,
    pub tiles_retired: AtomicU64,
    pub generation_passes: AtomicU64,
    pub retirement_passes: AtomicU64,
    pub last_generation_us: AtomicU64,
    pub last_retirement_us: AtomicU64,
}

impl StreamCounters {
    pub fn record_generation(&self, created: usize, took: Duration) {
        self.tiles_created.fetch_add(created as u64, Ordering::Relaxed);
        self.generation_passes.fetch_add(1, Ordering::Relaxed);
        self.last_generation_us
            .store(took.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_retirement(&self, retired: usize, took: Duration) {
        self.tiles_retired.fetch_add(retired as u64, Ordering::Relaxed);
        self.retirement_passes.fetch_add(1, Ordering::Relaxed);
        self.last_retirement_us
            .store(took.as_micros() as u64, Ordering::Relaxed);
    }
}

/// Point-in-time view of the streamer for instrumentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub tiles_created: u64,
    pub tiles_retired: u64,
    pub generation_passes: u64,
    pub retirement_passes: u64,
    pub last_generation: Duration,
    pub last_retirement: Duration,
    pub resident: usize,
}

impl StreamStats {
    pub(crate) fn snapshot(counters: &StreamCounters, resident: usize) -> Self {
        Self {
            tiles_created: counters.tiles_created.load(Ordering::Relaxed),
            tiles_retired: counters.tiles_retired.load(Ordering::Relaxed),
            generation_passes: counters.generation_passes.load(Ordering::Relaxed),
            retirement_passes: counters.retirement_passes.load(Ordering::Relaxed),
            last_generation: Duration::from_micros(
                counters.last_generation_us.load(Ordering::Relaxed),
            ),
            last_retirement: Duration::from_micros(
                counters.last_retirement_us.load(Ordering::Relaxed),
            ),
            resident,
        }
    }
}

/// Rolling window of frame durations.
#[derive(Debug)]
pub struct FrameTimer {
    samples: Vec<Duration>,
    next: usize,
    wrapped: bool,
}

impl FrameTimer {
    pub fn new(window: usize) -> Self {
        Self {
            samples: vec![Duration::ZERO; window.max(1)],
            next: 0,
            wrapped: false,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        self.samples[self.next] = dt;
        self.next = (self.next + 1) % self.samples.len();
        if self.next == 0 {
            self.wrapped = true;
        }
    }

    fn window(&self) -> &[Duration] {
        if self.wrapped {
            &self.samples
        } else {
            &self.samples[..self.next]
        }
    }

    pub fn count(&self) -> usize {
        self.window().len()
    }

    pub fn average(&self) -> Duration {
        let w = self.window();
        if w.is_empty() {
            return Duration::ZERO;
        }
        w.iter().sum::<Duration>() / w.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.window().iter().copied().max().unwrap_or_default()
    }

    pub fn min(&self) -> Duration {
        self.window().iter().copied().min().unwrap_or_default()
    }

    /// Frames per second implied by the average frame time.
    pub fn fps(&self) -> f32 {
        let avg = self.average().as_secs_f32();
        if avg > 0.0 { 1.0 / avg } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_snapshot() {
        let counters = StreamCounters::default();
        counters.record_generation(3, Duration::from_micros(250));
        counters.record_generation(2, Duration::from_micros(100));
        counters.record_retirement(4, Duration::from_micros(40));

        let stats = StreamStats::snapshot(&counters, 1);
        assert_eq!(stats.tiles_created, 5);
        assert_eq!(stats.tiles_retired, 4);
        assert_eq!(stats.generation_passes, 2);
        assert_eq!(stats.retirement_passes, 1);
        assert_eq!(stats.last_generation, Duration::from_micros(100));
        assert_eq!(stats.resident, 1);
    }

    #[test]
    fn frame_timer_tracks_window() {
        let mut timer = FrameTimer::new(3);
        assert_eq!(timer.average(), Duration::ZERO);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        timer.record(Duration::from_millis(30));

        assert_eq!(timer.count(), 3);
        assert_eq!(timer.average(), Duration::from_millis(20));
        assert_eq!(timer.max(), Duration::from_millis(30));
        assert_eq!(timer.min(), Duration::from_millis(10));
        assert!((timer.fps() - 50.0).abs() < 0.01);
    }

    #[test]
    fn frame_timer_overwrites_oldest() {
        let mut timer = FrameTimer::new(2);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        timer.record(Duration::from_millis(30));

        assert_eq!(timer.count(), 2);
        assert_eq!(timer.average(), Duration::from_millis(25));
        assert_eq!(timer.min(), Duration::from_millis(20));
    }
}
