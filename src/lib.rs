//! # Bundle Map
//!
//! Trajectory bundle discovery and evolution diagrams for map construction.
//!
//! This library provides:
//! - Discrete and semi-weak Fréchet distances over precomputed distance matrices
//! - Free-space graphs with labelled grid edges and a sliding column window
//! - Sweep-line extraction of bundles (groups of epsilon-similar sub-trajectories)
//! - Evolution diagrams tracking bundle classes across increasing epsilon
//! - A per-run engine with progress reporting and cooperative abort
//!
//! ## Features
//!
//! - **`parallel`** - Process representatives in parallel with rayon
//! - **`synthetic`** - Seeded synthetic trajectory sets with ground truth
//! - **`cli`** - The `bundlemap-cli` debug binary
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use bundlemap::{EvolutionConfig, EvolutionEngine, Trajectory};
//!
//! let trajectories: Vec<Arc<Trajectory>> = (0..3)
//!     .map(|i| {
//!         let y = i as f64;
//!         Arc::new(Trajectory::from_xy(format!("t{i}"), &[(0.0, y), (10.0, y), (20.0, y)]).unwrap())
//!     })
//!     .collect();
//!
//! let config = EvolutionConfig {
//!     min_eps: 1.0,
//!     max_eps: 5.0,
//!     delta_eps: 1.0,
//!     ..Default::default()
//! };
//! let diagram = EvolutionEngine::new(config).unwrap().run(trajectories).unwrap();
//! for class in diagram.classes() {
//!     println!("class {class} born at {:?}", diagram.birth_epsilon(class));
//! }
//! ```

// Unified error handling
pub mod error;
pub use error::{BundleError, OptionExt, Result};

// Planar points and segment helpers
pub mod geometry;
pub use geometry::{point, Point};

// Trajectories, orientation views and sub-trajectories
pub mod trajectory;
pub use trajectory::{DirectedTrajectory, Subtrajectory, Trajectory};

// Distance matrices and Fréchet computers
pub mod distance;
pub use distance::{DiscreteFrechet, DistanceMatrix, FrechetDistance, FrechetKind, FrechetResult, SemiWeakFrechet};

// Free-space graphs and sweep events
pub mod freespace;
pub use freespace::{Concatenation, Event, FreeSpaceGraph, GridEdge, GridPoint};

// R-tree over trajectory envelopes
pub mod index;
pub use index::TrajectoryIndex;

// Run configuration
pub mod config;
pub use config::{EpsilonSchedule, EvolutionConfig, ExtractionStrategy, KStep};

// Progress reporting and cancellation
pub mod progress;
pub use progress::{AbortHandle, AtomicProgressTracker, EvolutionPhase, NoopProgress, ProgressCallback};

// Bundle extraction at a single epsilon
pub mod bundles;
pub use bundles::{Bundle, BundleGenerator, BundleSet, ExtractionParams};

// Evolution diagrams across epsilon
pub mod evolution;
pub use evolution::{
    BestEpsilonScorer, BirthEpsilon, ClassId, DiagramState, EvolutionDiagram, EvolutionDiagramBuilder, FirstPlateau,
    ReportFilter,
};

// Per-run engine with worker thread
pub mod engine;
pub use engine::{EngineHandle, EvolutionEngine};

// Synthetic data generation for testing and benchmarking
#[cfg(feature = "synthetic")]
pub mod synthetic;
#[cfg(feature = "synthetic")]
pub use synthetic::SyntheticScenario;
