//! Drives bundle extraction across the epsilon schedule.

use std::sync::Arc;

use log::info;

use super::diagram::{BestEpsilonScorer, EvolutionDiagram, FirstPlateau};
use super::matching::IdentityMatcher;
use super::state::DiagramState;
use crate::bundles::{generator, BundleGenerator, ExtractionParams};
use crate::config::EvolutionConfig;
use crate::error::{BundleError, Result};
use crate::progress::{AbortHandle, EvolutionPhase, NoopProgress, ProgressCallback};
use crate::trajectory::Trajectory;

/// Percentage reported after the step at `eps`. Stays below 100 until the
/// diagram is finalized.
pub fn step_percent(eps: f64, min_eps: f64, max_eps: f64) -> u8 {
    if max_eps <= min_eps {
        return 99;
    }
    let ratio = ((eps - min_eps) / (max_eps - min_eps)).clamp(0.0, 1.0);
    (99.0 * ratio).floor() as u8
}

/// Builds an [`EvolutionDiagram`] for one trajectory set.
pub struct EvolutionDiagramBuilder {
    config: EvolutionConfig,
    progress: Arc<dyn ProgressCallback>,
    abort: AbortHandle,
    scorer: Arc<dyn BestEpsilonScorer>,
}

impl EvolutionDiagramBuilder {
    pub fn new(config: EvolutionConfig) -> Self {
        Self {
            config,
            progress: Arc::new(NoopProgress),
            abort: AbortHandle::new(),
            scorer: Arc::new(FirstPlateau::default()),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn BestEpsilonScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Run every epsilon step. Cancellation yields `Err(Aborted)` and drops
    /// the states built so far.
    pub fn build(&self, trajectories: Vec<Arc<Trajectory>>) -> Result<EvolutionDiagram> {
        self.config.validate()?;
        if trajectories.is_empty() {
            return Err(BundleError::EmptyInput);
        }
        let config = &self.config;
        let generator = BundleGenerator::from_config(trajectories, config)?;
        let epsilons = config.epsilons();
        info!(
            "[Evolution] {} trajectories, {} steps from {} to {} ({})",
            generator.trajectories().len(),
            epsilons.len(),
            config.min_eps,
            config.max_eps,
            config.strategy
        );

        let mut matcher = IdentityMatcher::new(config.min_overlap);
        let mut states: Vec<DiagramState> = Vec::with_capacity(epsilons.len());
        let mut k = config.k_min;
        let mut reported = 0u8;
        self.progress.on_progress(0);

        for &eps in &epsilons {
            self.abort.check()?;
            let params = ExtractionParams::new(eps, k, config.lambda(eps), config.min_length(eps));

            self.progress.on_phase(EvolutionPhase::FreeSpace, eps);
            let candidates = generator.extract(params, &self.abort)?;

            self.abort.check()?;
            self.progress.on_phase(EvolutionPhase::Sweep, eps);
            let set = generator::reduce(candidates, params);

            self.abort.check()?;
            self.progress.on_phase(EvolutionPhase::Matching, eps);
            let state = matcher.advance(states.last(), &set, eps, k, params.lambda);
            info!(
                "[Evolution] eps={:.3} k={}: {} classes ({} born, {} merged, {} vanished)",
                eps,
                k,
                state.len(),
                state.births.len(),
                state.merges.len(),
                state.vanished.len()
            );
            states.push(state);

            let percent = step_percent(eps, config.min_eps, config.max_eps);
            if percent > reported {
                reported = percent;
                self.progress.on_progress(percent);
            }
            k = config.k_step.apply(k);
        }

        self.abort.check()?;
        self.progress.on_phase(EvolutionPhase::Finalize, config.max_eps);
        let diagram = EvolutionDiagram::new(states, config, Arc::clone(&self.scorer));
        info!(
            "[Evolution] done: {} classes, {} reported",
            diagram.num_classes(),
            diagram.reported_classes().len()
        );
        self.progress.on_progress(100);
        Ok(diagram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_percent() {
        assert_eq!(step_percent(5.0, 5.0, 180.0), 0);
        assert_eq!(step_percent(180.0, 5.0, 180.0), 99);
        assert_eq!(step_percent(92.5, 5.0, 180.0), 49);
        assert_eq!(step_percent(3.0, 3.0, 3.0), 99);
    }

    #[test]
    fn test_empty_input() {
        let builder = EvolutionDiagramBuilder::new(EvolutionConfig::default());
        assert_eq!(builder.build(Vec::new()).err(), Some(BundleError::EmptyInput));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let builder = EvolutionDiagramBuilder::new(EvolutionConfig {
            k_min: 0,
            ..Default::default()
        });
        let t = Arc::new(Trajectory::from_xy("a", &[(0.0, 0.0), (1.0, 0.0)]).unwrap());
        assert!(matches!(builder.build(vec![t]), Err(BundleError::InvalidConfig(_))));
    }
}
