//! Scoped time and heap measurement
//!
//! [`TrackingAllocator`] wraps the system allocator and keeps running
//! counters of live and peak heap bytes. Binaries and benchmarks opt in by
//! installing it:
//!
//! ```ignore
//! #[global_allocator]
//! static GLOBAL: fuel_route_lib::instrument::TrackingAllocator =
//!     fuel_route_lib::instrument::TrackingAllocator;
//! ```
//!
//! A [`Measurement`] is started right before a unit of work and stopped right
//! after it. When the allocator is not installed, memory figures are `None`
//! rather than zero.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

static CURRENT_BYTES: AtomicUsize = AtomicUsize::new(0);
static PEAK_BYTES: AtomicUsize = AtomicUsize::new(0);
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Counting wrapper around [`System`]
pub struct TrackingAllocator;

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        CURRENT_BYTES.fetch_sub(layout.size(), Ordering::Relaxed);
        unsafe { System.dealloc(ptr, layout) };
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            CURRENT_BYTES.fetch_sub(layout.size(), Ordering::Relaxed);
            record_alloc(new_size);
        }
        new_ptr
    }
}

#[inline]
fn record_alloc(size: usize) {
    if !INSTALLED.load(Ordering::Relaxed) {
        INSTALLED.store(true, Ordering::Relaxed);
    }
    let current = CURRENT_BYTES.fetch_add(size, Ordering::Relaxed) + size;
    PEAK_BYTES.fetch_max(current, Ordering::Relaxed);
}

/// Whether [`TrackingAllocator`] has served at least one allocation
pub fn is_tracking() -> bool {
    INSTALLED.load(Ordering::Relaxed)
}

/// Live heap bytes, if the tracking allocator is installed
pub fn current_bytes() -> Option<usize> {
    is_tracking().then(|| CURRENT_BYTES.load(Ordering::Relaxed))
}

/// What one measurement observed
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub elapsed: Duration,
    /// Peak heap growth above the level at [`Measurement::start`]
    pub peak_memory_bytes: Option<usize>,
}

/// Paired start/stop measurement around one unit of work
///
/// Peak tracking is process-wide, so two measurements that overlap in time
/// see each other's allocations. Use [`Measurement::start_untracked`] for
/// work that runs concurrently with other measured work.
#[derive(Debug)]
#[must_use = "a measurement does nothing until it is stopped"]
pub struct Measurement {
    label: &'static str,
    started: Instant,
    baseline: Option<usize>,
}

impl Measurement {
    /// Start timing and reset the peak counter to the current heap level
    pub fn start(label: &'static str) -> Self {
        let baseline = current_bytes().inspect(|&current| {
            PEAK_BYTES.store(current, Ordering::Relaxed);
        });
        Self {
            label,
            started: Instant::now(),
            baseline,
        }
    }

    /// Start timing only; memory is reported as `None`
    pub fn start_untracked(label: &'static str) -> Self {
        Self {
            label,
            started: Instant::now(),
            baseline: None,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Stop the measurement and return what it observed
    pub fn stop(self) -> Sample {
        let elapsed = self.started.elapsed();
        let peak_memory_bytes = self
            .baseline
            .map(|baseline| PEAK_BYTES.load(Ordering::Relaxed).saturating_sub(baseline));

        tracing::debug!(
            label = self.label,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            peak_memory_bytes,
            "Measurement stopped"
        );

        Sample {
            elapsed,
            peak_memory_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The unit test binary does not install the allocator

    #[test]
    fn test_memory_is_none_without_allocator() {
        assert!(!is_tracking());
        let measurement = Measurement::start("sum");
        let sum = (0..1000u64).sum::<u64>();
        let sample = measurement.stop();
        assert_eq!(sum, 499_500);
        assert_eq!(sample.peak_memory_bytes, None);
    }

    #[test]
    fn test_elapsed_covers_work() {
        let measurement = Measurement::start("sleep");
        assert_eq!(measurement.label(), "sleep");
        std::thread::sleep(Duration::from_millis(5));
        let sample = measurement.stop();
        assert!(sample.elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn test_untracked_reports_no_memory() {
        let sample = Measurement::start_untracked("concurrent").stop();
        assert_eq!(sample.peak_memory_bytes, None);
    }
}
