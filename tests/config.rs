//! Tests for config module

use bundlemap::{EpsilonSchedule, EvolutionConfig, ExtractionStrategy, KStep};

#[test]
fn test_partial_json_uses_defaults() {
    let config: EvolutionConfig = serde_json::from_str(r#"{"min_eps": 2.0, "strategy": "maximal-length"}"#).unwrap();
    assert_eq!(config.min_eps, 2.0);
    assert_eq!(config.strategy, ExtractionStrategy::MaximalLength);
    assert_eq!(config.max_eps, EvolutionConfig::default().max_eps);
    assert!(config.validate().is_ok());
}

#[test]
fn test_json_round_trip() {
    let config = EvolutionConfig {
        schedule: EpsilonSchedule::Hybrid {
            factor: 2.0,
            switch_eps: 16.0,
        },
        k_step: KStep::Increment(1),
        ignore_direction: true,
        ..Default::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let back: EvolutionConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_multiplicative_schedule() {
    let config = EvolutionConfig {
        min_eps: 1.0,
        max_eps: 10.0,
        schedule: EpsilonSchedule::Multiplicative { factor: 2.0 },
        ..Default::default()
    };
    assert_eq!(config.epsilons(), vec![1.0, 2.0, 4.0, 8.0, 10.0]);
}

#[test]
fn test_single_step_when_min_equals_max() {
    let config = EvolutionConfig {
        min_eps: 7.0,
        max_eps: 7.0,
        ..Default::default()
    };
    assert_eq!(config.epsilons(), vec![7.0]);
}

#[test]
fn test_multiplicative_needs_positive_start() {
    let config = EvolutionConfig {
        min_eps: 0.0,
        schedule: EpsilonSchedule::Multiplicative { factor: 2.0 },
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_lambda_and_min_length_scale_with_epsilon() {
    let config = EvolutionConfig::default();
    assert_eq!(config.lambda(10.0), 20.0);
    assert_eq!(config.min_length(10.0), 10.0);
}
