//! Evolution diagrams: how bundles appear and merge as epsilon grows.
//!
//! [`EvolutionDiagramBuilder`] runs bundle extraction for every epsilon of
//! the configured schedule and tracks each bundle's class through
//! [`IdentityMatcher`]. The result is an [`EvolutionDiagram`] with birth,
//! merge and lifespan queries per class.

pub mod builder;
pub mod diagram;
pub mod matching;
pub mod state;

pub use builder::{step_percent, EvolutionDiagramBuilder};
pub use diagram::{BestEpsilonScorer, BirthEpsilon, EvolutionDiagram, FirstPlateau, ReportFilter};
pub use matching::IdentityMatcher;
pub use state::{ClassId, DiagramState};
