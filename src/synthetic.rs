//! Synthetic trajectory generator for tests, benchmarks and the CLI.
//!
//! Generates planar trajectory sets that share known corridors, providing
//! ground truth for validating bundle discovery.
//!
//! Feature-gated behind `synthetic`.
//!
//! # Example
//!
//! ```rust
//! use bundlemap::synthetic::{CorridorConfig, CorridorPattern, SyntheticScenario};
//! use bundlemap::geometry::point;
//!
//! let scenario = SyntheticScenario {
//!     origin: point(0.0, 0.0),
//!     trajectory_count: 12,
//!     corridors: vec![CorridorConfig {
//!         length: 300.0,
//!         overlap_fraction: 0.75,
//!         pattern: CorridorPattern::Winding,
//!         approach_length: 60.0,
//!     }],
//!     noise_sigma: 1.0,
//!     seed: 42,
//! };
//!
//! let dataset = scenario.generate();
//! assert_eq!(dataset.trajectories.len(), 12);
//! ```

use std::f64::consts::PI;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::{point, point_distance, Point};
use crate::trajectory::Trajectory;

// ============================================================================
// Types
// ============================================================================

/// Shape of a corridor polyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorridorPattern {
    /// Straight line with minor drift.
    Straight,
    /// Road with gentle turns.
    Winding,
    /// Curve that returns near its start.
    Loop,
}

/// A corridor shared by part of the trajectories.
#[derive(Debug, Clone)]
pub struct CorridorConfig {
    /// Corridor length in plane units.
    pub length: f64,
    /// Fraction of trajectories that follow this corridor (0.0-1.0).
    pub overlap_fraction: f64,
    pub pattern: CorridorPattern,
    /// Length of the random legs leading to and away from the corridor.
    pub approach_length: f64,
}

/// A corridor and the trajectories that follow it.
#[derive(Debug, Clone)]
pub struct ExpectedCorridor {
    pub name: String,
    pub polyline: Vec<Point>,
    pub length: f64,
    /// Ids of the trajectories that follow this corridor.
    pub trajectory_ids: Vec<String>,
}

/// A generated trajectory set with ground truth.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub trajectories: Vec<Arc<Trajectory>>,
    pub expected_corridors: Vec<ExpectedCorridor>,
    /// Total number of points across all trajectories.
    pub total_points: usize,
}

/// Scenario parameters for a synthetic trajectory set.
#[derive(Debug, Clone)]
pub struct SyntheticScenario {
    /// Where corridors fan out from.
    pub origin: Point,
    pub trajectory_count: usize,
    pub corridors: Vec<CorridorConfig>,
    /// Standard deviation of the positional noise.
    pub noise_sigma: f64,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

// ============================================================================
// Polyline Generation
// ============================================================================

/// Distance between consecutive generated points.
const POINT_SPACING: f64 = 10.0;

fn advance(p: Point, heading: f64) -> Point {
    point(p.x + POINT_SPACING * heading.cos(), p.y + POINT_SPACING * heading.sin())
}

/// Corridor polyline starting near `origin`. Corridors fan out in different
/// directions so they do not overlap each other.
fn generate_corridor(origin: Point, config: &CorridorConfig, corridor_index: usize, rng: &mut StdRng) -> Vec<Point> {
    let steps = (config.length / POINT_SPACING).ceil() as usize;
    let mut heading = corridor_index as f64 * (2.0 * PI / 8.0) + PI / 6.0;
    let offset = 100.0 * (corridor_index as f64 + 1.0);
    let mut current = point(origin.x + offset * heading.cos(), origin.y + offset * heading.sin());

    let mut points = Vec::with_capacity(steps + 1);
    points.push(current);
    for i in 0..steps {
        heading += match config.pattern {
            CorridorPattern::Straight => rng.gen_range(-0.02..0.02),
            CorridorPattern::Winding => (i as f64 * 0.1).sin() * 0.2 + rng.gen_range(-0.1..0.1),
            CorridorPattern::Loop => 2.0 * PI / steps as f64 + rng.gen_range(-0.03..0.03),
        };
        current = advance(current, heading);
        points.push(current);
    }
    points
}

/// Random leg of the given length.
fn generate_random_leg(start: Point, length: f64, initial_heading: f64, rng: &mut StdRng) -> Vec<Point> {
    let steps = (length / POINT_SPACING).ceil() as usize;
    let mut heading = initial_heading;
    let mut current = start;
    let mut points = Vec::with_capacity(steps + 1);
    points.push(current);
    for _ in 0..steps {
        heading += rng.gen_range(-0.3..0.3);
        current = advance(current, heading);
        points.push(current);
    }
    points
}

/// Gaussian noise via Box-Muller.
fn add_noise(points: &[Point], sigma: f64, rng: &mut StdRng) -> Vec<Point> {
    if sigma <= 0.0 {
        return points.to_vec();
    }
    points
        .iter()
        .map(|p| {
            let u1: f64 = rng.gen_range(0.0001..1.0);
            let u2: f64 = rng.gen();
            let r = (-2.0 * u1.ln()).sqrt() * sigma;
            point(p.x + r * (2.0 * PI * u2).cos(), p.y + r * (2.0 * PI * u2).sin())
        })
        .collect()
}

fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| point_distance(w[0], w[1])).sum()
}

// ============================================================================
// Scenario Implementation
// ============================================================================

impl SyntheticScenario {
    /// Generate the trajectory set.
    pub fn generate(&self) -> SyntheticDataset {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let corridor_polylines: Vec<Vec<Point>> = self
            .corridors
            .iter()
            .enumerate()
            .map(|(i, c)| generate_corridor(self.origin, c, i, &mut rng))
            .collect();
        let mut corridor_ids: Vec<Vec<String>> = vec![Vec::new(); self.corridors.len()];
        let mut trajectories = Vec::with_capacity(self.trajectory_count);

        for index in 0..self.trajectory_count {
            let id = format!("synth_{index:04}");
            let mut track: Vec<Point> = Vec::new();

            for (ci, config) in self.corridors.iter().enumerate() {
                let uses: f64 = rng.gen();
                if uses >= config.overlap_fraction {
                    continue;
                }
                corridor_ids[ci].push(id.clone());
                let corridor = &corridor_polylines[ci];
                let entry = corridor[0];

                let approach_heading: f64 = rng.gen_range(0.0..(2.0 * PI));
                let approach_start = point(
                    entry.x + config.approach_length * approach_heading.cos(),
                    entry.y + config.approach_length * approach_heading.sin(),
                );
                if let Some(&last) = track.last() {
                    let heading = (approach_start.y - last.y).atan2(approach_start.x - last.x);
                    track.extend(generate_random_leg(last, 2.0 * POINT_SPACING, heading, &mut rng));
                }
                track.extend(generate_random_leg(
                    approach_start,
                    config.approach_length * 0.8,
                    approach_heading + PI,
                    &mut rng,
                ));
                track.extend(add_noise(corridor, self.noise_sigma, &mut rng));

                if let Some(&exit) = corridor.last() {
                    let departure_heading: f64 = rng.gen_range(0.0..(2.0 * PI));
                    track.extend(generate_random_leg(exit, config.approach_length * 0.8, departure_heading, &mut rng));
                }
            }

            if track.len() < 2 {
                let length: f64 = rng.gen_range(100.0..400.0);
                let heading: f64 = rng.gen_range(0.0..(2.0 * PI));
                track = generate_random_leg(self.origin, length, heading, &mut rng);
            }
            // legs have at least two points
            if let Ok(trajectory) = Trajectory::new(id, track) {
                trajectories.push(Arc::new(trajectory));
            }
        }

        let expected_corridors = corridor_polylines
            .into_iter()
            .zip(corridor_ids)
            .enumerate()
            .map(|(ci, (polyline, trajectory_ids))| ExpectedCorridor {
                name: format!("corridor_{ci}"),
                length: polyline_length(&polyline),
                polyline,
                trajectory_ids,
            })
            .collect();
        let total_points = trajectories.iter().map(|t| t.num_points()).sum();

        SyntheticDataset {
            trajectories,
            expected_corridors,
            total_points,
        }
    }
}

// ============================================================================
// Predefined Scenarios
// ============================================================================

impl SyntheticScenario {
    /// 8 trajectories on one 200-unit winding corridor. Fast enough for a
    /// full evolution run in tests.
    pub fn small() -> Self {
        Self {
            origin: point(0.0, 0.0),
            trajectory_count: 8,
            corridors: vec![CorridorConfig {
                length: 200.0,
                overlap_fraction: 0.75,
                pattern: CorridorPattern::Winding,
                approach_length: 50.0,
            }],
            noise_sigma: 1.0,
            seed: 42,
        }
    }

    /// 30 trajectories over three corridors of different shapes.
    pub fn multi_corridor() -> Self {
        Self {
            origin: point(0.0, 0.0),
            trajectory_count: 30,
            corridors: vec![
                CorridorConfig {
                    length: 400.0,
                    overlap_fraction: 0.5,
                    pattern: CorridorPattern::Straight,
                    approach_length: 80.0,
                },
                CorridorConfig {
                    length: 300.0,
                    overlap_fraction: 0.4,
                    pattern: CorridorPattern::Winding,
                    approach_length: 80.0,
                },
                CorridorConfig {
                    length: 500.0,
                    overlap_fraction: 0.3,
                    pattern: CorridorPattern::Loop,
                    approach_length: 80.0,
                },
            ],
            noise_sigma: 2.0,
            seed: 43,
        }
    }

    /// `count` trajectories on one straight corridor.
    pub fn with_trajectory_count(count: usize, corridor_length: f64, overlap: f64) -> Self {
        Self {
            origin: point(0.0, 0.0),
            trajectory_count: count,
            corridors: vec![CorridorConfig {
                length: corridor_length,
                overlap_fraction: overlap,
                pattern: CorridorPattern::Straight,
                approach_length: 50.0,
            }],
            noise_sigma: 1.0,
            seed: 42,
        }
    }

    /// Random trajectories without any shared corridor.
    pub fn no_overlap(count: usize) -> Self {
        Self {
            origin: point(0.0, 0.0),
            trajectory_count: count,
            corridors: Vec::new(),
            noise_sigma: 0.0,
            seed: 44,
        }
    }
}
