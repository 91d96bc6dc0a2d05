//! # Evolution Engine
//!
//! Per-run context object owning the configuration, the progress channel and
//! the abort flag. A run either executes on the calling thread
//! ([`EvolutionEngine::run`]) or on one dedicated worker
//! ([`EvolutionEngine::spawn`]) so the host stays responsive.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{info, warn};

use crate::config::EvolutionConfig;
use crate::error::{BundleError, Result};
use crate::evolution::{BestEpsilonScorer, EvolutionDiagram, EvolutionDiagramBuilder, FirstPlateau};
use crate::progress::{AbortHandle, EvolutionPhase, NoopProgress, ProgressCallback};
use crate::trajectory::Trajectory;

/// Forwards updates to the host callback and remembers the last percentage.
struct TrackedProgress {
    inner: Arc<dyn ProgressCallback>,
    percent: AtomicU8,
}

impl ProgressCallback for TrackedProgress {
    fn on_phase(&self, phase: EvolutionPhase, epsilon: f64) {
        self.inner.on_phase(phase, epsilon);
    }

    fn on_progress(&self, percent: u8) {
        self.percent.store(percent, Ordering::SeqCst);
        self.inner.on_progress(percent);
    }
}

/// Configuration plus side channels for one evolution run.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    progress: Arc<dyn ProgressCallback>,
    abort: AbortHandle,
    scorer: Arc<dyn BestEpsilonScorer>,
}

impl EvolutionEngine {
    /// Create an engine after validating `config`.
    pub fn new(config: EvolutionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            progress: Arc::new(NoopProgress),
            abort: AbortHandle::new(),
            scorer: Arc::new(FirstPlateau::default()),
        })
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn BestEpsilonScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Handle to cancel runs of this engine. A request cancels at most one
    /// [`run`](Self::run): the flag is cleared when that run returns.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    fn builder(&self, progress: Arc<dyn ProgressCallback>) -> EvolutionDiagramBuilder {
        EvolutionDiagramBuilder::new(self.config.clone())
            .with_progress(progress)
            .with_abort(self.abort.clone())
            .with_scorer(Arc::clone(&self.scorer))
    }

    /// Build the diagram on the calling thread.
    pub fn run(&self, trajectories: Vec<Arc<Trajectory>>) -> Result<EvolutionDiagram> {
        let result = self.builder(Arc::clone(&self.progress)).build(trajectories);
        if self.abort.is_aborted() {
            info!("[Engine] clearing abort request after run");
            self.abort.reset();
        }
        result
    }

    /// Build the diagram on a dedicated worker thread.
    pub fn spawn(self, trajectories: Vec<Arc<Trajectory>>) -> Result<EngineHandle> {
        let tracker = Arc::new(TrackedProgress {
            inner: Arc::clone(&self.progress),
            percent: AtomicU8::new(0),
        });
        let builder = self.builder(tracker.clone());
        let thread = thread::Builder::new()
            .name("bundlemap-evolution".to_string())
            .spawn(move || builder.build(trajectories))
            .map_err(|e| BundleError::WorkerFailed(e.to_string()))?;
        info!("[Engine] evolution worker started");
        Ok(EngineHandle {
            abort: self.abort,
            progress: tracker,
            thread,
        })
    }
}

/// A running evolution build.
pub struct EngineHandle {
    abort: AbortHandle,
    progress: Arc<TrackedProgress>,
    thread: JoinHandle<Result<EvolutionDiagram>>,
}

impl EngineHandle {
    /// Request cancellation. [`join`](Self::join) then yields `Err(Aborted)`.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Last reported percentage.
    pub fn progress(&self) -> u8 {
        self.progress.percent.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker and return its result.
    pub fn join(self) -> Result<EvolutionDiagram> {
        match self.thread.join() {
            Ok(result) => {
                if let Err(BundleError::Aborted) = &result {
                    info!("[Engine] evolution run aborted");
                }
                result
            }
            Err(_) => {
                warn!("[Engine] evolution worker panicked");
                Err(BundleError::WorkerFailed("worker panicked".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, y: f64) -> Arc<Trajectory> {
        let coords: Vec<(f64, f64)> = (0..6).map(|i| (i as f64 * 10.0, y)).collect();
        Arc::new(Trajectory::from_xy(id, &coords).unwrap())
    }

    fn config() -> EvolutionConfig {
        EvolutionConfig {
            min_eps: 1.0,
            max_eps: 4.0,
            delta_eps: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_validates() {
        let bad = EvolutionConfig {
            min_overlap: 2.0,
            ..Default::default()
        };
        assert!(EvolutionEngine::new(bad).is_err());
    }

    #[test]
    fn test_spawn_and_join() {
        let engine = EvolutionEngine::new(config()).unwrap();
        let handle = engine.spawn(vec![line("a", 0.0), line("b", 1.0)]).unwrap();
        let diagram = handle.join().unwrap();
        assert_eq!(diagram.epsilons(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_abort_before_run() {
        let engine = EvolutionEngine::new(config()).unwrap();
        engine.abort_handle().abort();
        let result = engine.run(vec![line("a", 0.0), line("b", 1.0)]);
        assert_eq!(result.err(), Some(BundleError::Aborted));
    }

    #[test]
    fn test_engine_reusable_after_abort() {
        let engine = EvolutionEngine::new(config()).unwrap();
        let handle = engine.abort_handle();
        handle.abort();
        let aborted = engine.run(vec![line("a", 0.0), line("b", 1.0)]);
        assert_eq!(aborted.err(), Some(BundleError::Aborted));
        assert!(!handle.is_aborted());

        let diagram = engine.run(vec![line("a", 0.0), line("b", 1.0)]).unwrap();
        assert_eq!(diagram.epsilons(), vec![1.0, 2.0, 3.0, 4.0]);
    }
}
