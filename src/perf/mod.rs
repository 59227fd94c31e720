/// Performance measurement utilities
/// Each culling stage is timed and reported through the `log` facade
pub mod profiling;

pub use profiling::{CounterSnapshot, CullingCounters, CULLING_COUNTERS};

use std::time::{Duration, Instant};

/// Logs the elapsed time of a scope at trace level when dropped
pub struct PerfTimer {
    name: &'static str,
    start: Instant,
}

impl PerfTimer {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        log::trace!("[PERF] {}: {}μs", self.name, self.elapsed().as_micros());
    }
}

/// Macro for easy performance measurement
#[macro_export]
macro_rules! perf_scope {
    ($name:expr) => {
        let _timer = $crate::perf::PerfTimer::new($name);
    };
}
