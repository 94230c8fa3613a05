//! Monotonic stopwatches for phase and per-model timing.

// Layer 1: Standard library imports
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// A monotonic stopwatch that accumulates elapsed time across start/stop
/// cycles.
///
/// # Examples
///
/// ```rust
/// use cascade_rt::orchestrator::Stopwatch;
///
/// let mut watch = Stopwatch::new();
/// assert!(!watch.running());
/// watch.start();
/// assert!(watch.running());
/// let elapsed = watch.stop();
/// assert!(elapsed >= 0.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    started_at: Option<Instant>,
    elapsed: Duration,
    total_elapsed: Duration,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the stopwatch is currently running.
    pub fn running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Seconds measured by the most recent (or current) start/stop cycle.
    pub fn elapsed(&self) -> f64 {
        match self.started_at {
            Some(started) => started.elapsed().as_secs_f64(),
            None => self.elapsed.as_secs_f64(),
        }
    }

    /// Seconds accumulated over all cycles since the last reset.
    pub fn total_elapsed(&self) -> f64 {
        let base = self.total_elapsed.as_secs_f64();
        match self.started_at {
            Some(started) => base + started.elapsed().as_secs_f64(),
            None => base,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop the current cycle and return its elapsed seconds. Stopping a
    /// stopwatch that is not running returns the last cycle's value.
    pub fn stop(&mut self) -> f64 {
        if let Some(started) = self.started_at.take() {
            self.elapsed = started.elapsed();
            self.total_elapsed += self.elapsed;
        }
        self.elapsed.as_secs_f64()
    }

    /// Stop if running, zero the accumulators and return the total.
    pub fn reset(&mut self) -> f64 {
        if self.running() {
            self.stop();
        }
        let total = self.total_elapsed.as_secs_f64();
        self.elapsed = Duration::ZERO;
        self.total_elapsed = Duration::ZERO;
        total
    }

    /// Reset and immediately start a new cycle; returns the previous total.
    pub fn restart(&mut self) -> f64 {
        let total = self.reset();
        self.start();
        total
    }
}
