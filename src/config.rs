//! Run configuration for bundle extraction and evolution diagrams.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BundleError, Result};

/// How epsilon grows from one diagram state to the next.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EpsilonSchedule {
    /// `eps + delta_eps`
    Additive,
    /// `eps * factor`
    Multiplicative { factor: f64 },
    /// Multiplicative below `switch_eps`, additive from there on.
    Hybrid { factor: f64, switch_eps: f64 },
}

impl EpsilonSchedule {
    /// Epsilon following `eps`.
    pub fn next(&self, eps: f64, delta: f64) -> f64 {
        match *self {
            EpsilonSchedule::Additive => eps + delta,
            EpsilonSchedule::Multiplicative { factor } => eps * factor,
            EpsilonSchedule::Hybrid { factor, switch_eps } => {
                if eps < switch_eps {
                    (eps * factor).min(switch_eps)
                } else {
                    eps + delta
                }
            }
        }
    }
}

/// How the minimum bundle size evolves between states. The result never
/// drops below the current value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum KStep {
    /// `k`
    Constant,
    /// `k + n`
    Increment(usize),
    /// `ceil(k * f)`
    Scale(f64),
}

impl KStep {
    pub fn apply(&self, k: usize) -> usize {
        let next = match *self {
            KStep::Constant => k,
            KStep::Increment(n) => k + n,
            KStep::Scale(f) => (k as f64 * f).ceil() as usize,
        };
        next.max(k)
    }
}

/// Which extractor produces the bundles of one epsilon step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionStrategy {
    /// One free-space graph per representative, swept by furthest endpoint.
    #[default]
    FurthestEndpoint,
    /// One self-product graph with a sliding window of maximal length.
    MaximalLength,
}

impl ExtractionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStrategy::FurthestEndpoint => "furthest-endpoint",
            ExtractionStrategy::MaximalLength => "maximal-length",
        }
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionStrategy {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "furthest-endpoint" | "furthest" => Ok(ExtractionStrategy::FurthestEndpoint),
            "maximal-length" | "maximal" => Ok(ExtractionStrategy::MaximalLength),
            other => Err(BundleError::InvalidConfig(format!("unknown strategy '{other}'"))),
        }
    }
}

/// Configuration for an evolution-diagram run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// First epsilon of the sweep.
    /// Default: 5.0
    pub min_eps: f64,

    /// Last epsilon of the sweep. A schedule step that would overshoot is
    /// clamped onto this value.
    /// Default: 180.0
    pub max_eps: f64,

    /// Additive epsilon step.
    /// Default: 5.0
    pub delta_eps: f64,

    /// Epsilon growth rule.
    /// Default: Additive
    pub schedule: EpsilonSchedule,

    /// λ = lambda_factor · ε, the tolerance of the lambda-subbundle relation.
    /// Default: 2.0
    pub lambda_factor: f64,

    /// Minimum bundle size at the first step.
    /// Default: 2
    pub k_min: usize,

    /// Growth of the minimum bundle size between steps.
    /// Default: Constant
    pub k_step: KStep,

    /// A bundle's representative must be at least `min_length_factor · ε`
    /// long.
    /// Default: 1.0
    pub min_length_factor: f64,

    /// Reported classes live at least this long.
    /// Default: 10.0
    pub min_lifespan: f64,

    /// Reported classes have a lifespan divided by birth epsilon strictly
    /// above this.
    /// Default: 1.0
    pub min_relative_lifespan: f64,

    /// Reported classes have at least this many members at their best
    /// epsilon.
    /// Default: 3
    pub min_reported_size: usize,

    /// Every member of a reported class, at its best epsilon, is at least
    /// `min_reported_length_factor · best epsilon` long.
    /// Default: 3.0
    pub min_reported_length_factor: f64,

    /// Share of shared parent trajectories, relative to the smaller bundle,
    /// for a class to continue into a new bundle.
    /// Default: 0.5
    pub min_overlap: f64,

    /// Also match trajectories driven in the opposite direction.
    /// Default: false
    pub ignore_direction: bool,

    /// Bundle extractor.
    /// Default: FurthestEndpoint
    pub strategy: ExtractionStrategy,

    /// Skip rows whose envelope is farther than epsilon from the
    /// representative.
    /// Default: true
    pub use_spatial_index: bool,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            min_eps: 5.0,
            max_eps: 180.0,
            delta_eps: 5.0,
            schedule: EpsilonSchedule::Additive,
            lambda_factor: 2.0,
            k_min: 2,
            k_step: KStep::Constant,
            min_length_factor: 1.0,
            min_lifespan: 10.0,
            min_relative_lifespan: 1.0,
            min_reported_size: 3,
            min_reported_length_factor: 3.0,
            min_overlap: 0.5,
            ignore_direction: false,
            strategy: ExtractionStrategy::FurthestEndpoint,
            use_spatial_index: true,
        }
    }
}

impl EvolutionConfig {
    /// Check every value against its domain.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(BundleError::InvalidConfig(msg));

        if !self.min_eps.is_finite() || self.min_eps < 0.0 {
            return fail(format!("min_eps must be finite and >= 0, got {}", self.min_eps));
        }
        if !self.max_eps.is_finite() || self.max_eps < self.min_eps {
            return fail(format!(
                "max_eps must be finite and >= min_eps ({}), got {}",
                self.min_eps, self.max_eps
            ));
        }
        match self.schedule {
            EpsilonSchedule::Additive => {
                if !(self.delta_eps > 0.0) {
                    return fail(format!("delta_eps must be > 0, got {}", self.delta_eps));
                }
            }
            EpsilonSchedule::Multiplicative { factor } => {
                if !(factor > 1.0) || self.min_eps <= 0.0 {
                    return fail("multiplicative schedule needs factor > 1 and min_eps > 0".to_string());
                }
            }
            EpsilonSchedule::Hybrid { factor, .. } => {
                if !(factor > 1.0) || self.min_eps <= 0.0 || !(self.delta_eps > 0.0) {
                    return fail("hybrid schedule needs factor > 1, min_eps > 0 and delta_eps > 0".to_string());
                }
            }
        }
        if !(self.lambda_factor >= 0.0) {
            return fail(format!("lambda_factor must be >= 0, got {}", self.lambda_factor));
        }
        if self.k_min == 0 {
            return fail("k_min must be at least 1".to_string());
        }
        if !(self.min_length_factor >= 0.0) {
            return fail(format!("min_length_factor must be >= 0, got {}", self.min_length_factor));
        }
        if !(self.min_lifespan >= 0.0) || !(self.min_relative_lifespan >= 0.0) {
            return fail("lifespan thresholds must be >= 0".to_string());
        }
        if !(self.min_reported_length_factor >= 0.0) {
            return fail(format!(
                "min_reported_length_factor must be >= 0, got {}",
                self.min_reported_length_factor
            ));
        }
        if !(0.0..=1.0).contains(&self.min_overlap) {
            return fail(format!("min_overlap must lie in [0, 1], got {}", self.min_overlap));
        }
        Ok(())
    }

    /// λ for a given epsilon.
    pub fn lambda(&self, eps: f64) -> f64 {
        self.lambda_factor * eps
    }

    /// Minimum representative length for a given epsilon.
    pub fn min_length(&self, eps: f64) -> f64 {
        self.min_length_factor * eps
    }

    /// The epsilon after `eps`, clamped onto `max_eps`; `None` once `eps`
    /// has reached `max_eps`.
    pub fn next_epsilon(&self, eps: f64) -> Option<f64> {
        if eps >= self.max_eps {
            return None;
        }
        let next = self.schedule.next(eps, self.delta_eps);
        Some(if next > self.max_eps { self.max_eps } else { next })
    }

    /// Every epsilon the run will visit.
    pub fn epsilons(&self) -> Vec<f64> {
        let mut out = vec![self.min_eps];
        let mut eps = self.min_eps;
        while let Some(next) = self.next_epsilon(eps) {
            if next <= eps {
                break;
            }
            out.push(next);
            eps = next;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EvolutionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_additive_epsilons_clamp_to_max() {
        let config = EvolutionConfig {
            min_eps: 5.0,
            max_eps: 22.0,
            delta_eps: 5.0,
            ..Default::default()
        };
        assert_eq!(config.epsilons(), vec![5.0, 10.0, 15.0, 20.0, 22.0]);
    }

    #[test]
    fn test_hybrid_schedule() {
        let config = EvolutionConfig {
            min_eps: 1.0,
            max_eps: 12.0,
            delta_eps: 3.0,
            schedule: EpsilonSchedule::Hybrid {
                factor: 2.0,
                switch_eps: 4.0,
            },
            ..Default::default()
        };
        assert_eq!(config.epsilons(), vec![1.0, 2.0, 4.0, 7.0, 10.0, 12.0]);
    }

    #[test]
    fn test_k_step_never_decreases() {
        assert_eq!(KStep::Constant.apply(3), 3);
        assert_eq!(KStep::Increment(2).apply(3), 5);
        assert_eq!(KStep::Scale(1.5).apply(3), 5);
        assert_eq!(KStep::Scale(0.5).apply(3), 3);
    }

    #[test]
    fn test_validation_errors() {
        let bad = EvolutionConfig {
            max_eps: 1.0,
            min_eps: 2.0,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(BundleError::InvalidConfig(_))));

        let bad = EvolutionConfig {
            k_min: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            "maximal-length".parse::<ExtractionStrategy>().unwrap(),
            ExtractionStrategy::MaximalLength
        );
        assert!("other".parse::<ExtractionStrategy>().is_err());
    }
}
