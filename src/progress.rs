//! Progress reporting and cooperative cancellation for evolution runs.
//!
//! The host application pushes an abort request through an [`AbortHandle`]
//! and receives phase changes and percentages through a [`ProgressCallback`].
//! These are the only two channels crossing the engine boundary.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{BundleError, Result};

/// Phases of one epsilon step, plus the final wrap-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionPhase {
    /// Building free-space graphs
    FreeSpace,
    /// Sweeping events into bundles and reducing them
    Sweep,
    /// Assigning classes to the new bundles
    Matching,
    /// Computing cached per-class queries
    Finalize,
}

impl EvolutionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvolutionPhase::FreeSpace => "free_space",
            EvolutionPhase::Sweep => "sweep",
            EvolutionPhase::Matching => "matching",
            EvolutionPhase::Finalize => "finalize",
        }
    }
}

impl fmt::Display for EvolutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of progress updates.
///
/// May be called from a worker thread, so implementations must be
/// `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts at the given epsilon.
    fn on_phase(&self, phase: EvolutionPhase, epsilon: f64);
    /// Called with a percentage in `0..=100`, never decreasing within a run.
    fn on_progress(&self, percent: u8);
}

/// Discards all updates.
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_phase(&self, _phase: EvolutionPhase, _epsilon: f64) {}
    fn on_progress(&self, _percent: u8) {}
}

/// Progress tracker that can be polled from another thread.
pub struct AtomicProgressTracker {
    pub phase: Mutex<String>,
    pub percent: AtomicU32,
    pub updates: AtomicU32,
}

impl Default for AtomicProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicProgressTracker {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(String::new()),
            percent: AtomicU32::new(0),
            updates: AtomicU32::new(0),
        }
    }

    /// Last reported percentage.
    pub fn percent(&self) -> u32 {
        self.percent.load(Ordering::SeqCst)
    }

    /// Name of the last phase entered.
    pub fn phase(&self) -> String {
        self.phase.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl ProgressCallback for AtomicProgressTracker {
    fn on_phase(&self, phase: EvolutionPhase, _epsilon: f64) {
        if let Ok(mut current) = self.phase.lock() {
            *current = phase.as_str().to_string();
        }
    }

    fn on_progress(&self, percent: u8) {
        self.percent.store(u32::from(percent), Ordering::SeqCst);
        self.updates.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Observed at the next check point.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear a pending request so the flag can guard another run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Aborted)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_aborted() {
            Err(BundleError::Aborted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_handle_is_shared() {
        let handle = AbortHandle::new();
        let clone = handle.clone();
        assert!(handle.check().is_ok());
        clone.abort();
        assert!(handle.is_aborted());
        assert_eq!(handle.check(), Err(BundleError::Aborted));
        clone.reset();
        assert!(handle.check().is_ok());
    }

    #[test]
    fn test_tracker_records_updates() {
        let tracker = AtomicProgressTracker::new();
        tracker.on_phase(EvolutionPhase::Sweep, 5.0);
        tracker.on_progress(42);
        assert_eq!(tracker.phase(), "sweep");
        assert_eq!(tracker.percent(), 42);
        assert_eq!(tracker.updates.load(Ordering::SeqCst), 1);
    }
}
