/// Instrumentation for microoptimization of the culling pipeline
/// Counters are only incremented with the `profiling` feature enabled
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for pipeline events
pub struct CullingCounters {
    // Clipping
    pub occluders_submitted: AtomicU64,
    pub occluders_rejected: AtomicU64,
    pub triangles_clipped: AtomicU64,
    pub triangles_backface: AtomicU64,
    pub triangles_emitted: AtomicU64,

    // Rasterization
    pub triangles_rasterized: AtomicU64,
    pub tiles_traversed: AtomicU64,
    pub tiles_updated: AtomicU64,

    // Merge
    pub tiles_merged: AtomicU64,

    // Visibility
    pub occludees_tested: AtomicU64,
    pub occludees_occluded: AtomicU64,
}

impl CullingCounters {
    pub const fn new() -> Self {
        Self {
            occluders_submitted: AtomicU64::new(0),
            occluders_rejected: AtomicU64::new(0),
            triangles_clipped: AtomicU64::new(0),
            triangles_backface: AtomicU64::new(0),
            triangles_emitted: AtomicU64::new(0),
            triangles_rasterized: AtomicU64::new(0),
            tiles_traversed: AtomicU64::new(0),
            tiles_updated: AtomicU64::new(0),
            tiles_merged: AtomicU64::new(0),
            occludees_tested: AtomicU64::new(0),
            occludees_occluded: AtomicU64::new(0),
        }
    }

    fn all(&self) -> [&AtomicU64; 11] {
        [
            &self.occluders_submitted,
            &self.occluders_rejected,
            &self.triangles_clipped,
            &self.triangles_backface,
            &self.triangles_emitted,
            &self.triangles_rasterized,
            &self.tiles_traversed,
            &self.tiles_updated,
            &self.tiles_merged,
            &self.occludees_tested,
            &self.occludees_occluded,
        ]
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        for counter in self.all() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        let [occluders_submitted, occluders_rejected, triangles_clipped, triangles_backface, triangles_emitted, triangles_rasterized, tiles_traversed, tiles_updated, tiles_merged, occludees_tested, occludees_occluded] =
            self.all().map(|c| c.load(Ordering::Relaxed));
        CounterSnapshot {
            occluders_submitted,
            occluders_rejected,
            triangles_clipped,
            triangles_backface,
            triangles_emitted,
            triangles_rasterized,
            tiles_traversed,
            tiles_updated,
            tiles_merged,
            occludees_tested,
            occludees_occluded,
        }
    }
}

impl Default for CullingCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of counter values at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub occluders_submitted: u64,
    pub occluders_rejected: u64,
    pub triangles_clipped: u64,
    pub triangles_backface: u64,
    pub triangles_emitted: u64,
    pub triangles_rasterized: u64,
    pub tiles_traversed: u64,
    pub tiles_updated: u64,
    pub tiles_merged: u64,
    pub occludees_tested: u64,
    pub occludees_occluded: u64,
}

impl CounterSnapshot {
    /// Print formatted report
    pub fn print_report(&self) {
        println!("\n=== Culling Counters Report ===");
        println!("\nClipping:");
        println!("  occluders submitted:        {:12}", self.occluders_submitted);
        println!("  occluders rejected:         {:12}", self.occluders_rejected);
        println!("  triangles clipped:          {:12}", self.triangles_clipped);
        println!("  triangles backface/empty:   {:12}", self.triangles_backface);
        println!("  triangles emitted:          {:12}", self.triangles_emitted);

        println!("\nRasterization:");
        println!("  triangles rasterized:       {:12}", self.triangles_rasterized);
        println!("  tiles traversed:            {:12}", self.tiles_traversed);
        println!("  tiles updated:              {:12}", self.tiles_updated);
        if self.tiles_traversed > 0 {
            let rate = (self.tiles_updated as f64 / self.tiles_traversed as f64) * 100.0;
            println!("  tile update rate:           {:11.2}%", rate);
        }

        println!("\nMerge:");
        println!("  tiles merged:               {:12}", self.tiles_merged);

        println!("\nVisibility:");
        println!("  occludees tested:           {:12}", self.occludees_tested);
        println!("  occludees occluded:         {:12}", self.occludees_occluded);
        println!();
    }
}

/// Global culling counters instance
pub static CULLING_COUNTERS: CullingCounters = CullingCounters::new();

/// Macro for incrementing a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_call {
    ($counter:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

/// Macro for adding to a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_add {
    ($counter:expr, $value:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add($value as u64, std::sync::atomic::Ordering::Relaxed);
        }
    };
}
