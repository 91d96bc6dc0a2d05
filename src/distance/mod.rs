//! Pairwise trajectory distances.

pub mod frechet;
pub mod matrix;

pub use frechet::{DiscreteFrechet, DpTable, FrechetDistance, FrechetKind, FrechetResult, SemiWeakFrechet};
pub use matrix::DistanceMatrix;
