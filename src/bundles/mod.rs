//! Bundle discovery at a fixed epsilon.
//!
//! ## Pipeline
//!
//! 1. Build free-space graphs (one per representative, or one self-product)
//! 2. Sweep them into candidate bundles ([`FurthestEndpointSweep`] or
//!    [`MaximalLengthSweep`])
//! 3. Drop candidates that are lambda-subbundles of larger ones, remembering
//!    who absorbed whom ([`BundleGenerator`])

pub mod bundle;
pub mod generator;
pub mod maximal;
pub mod sweep;

pub use bundle::Bundle;
pub use generator::{BundleGenerator, BundleSet};
pub use maximal::MaximalLengthSweep;
pub use sweep::FurthestEndpointSweep;

use log::trace;

/// Parameters of one extraction run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionParams {
    pub epsilon: f64,
    /// Minimum number of distinct parent trajectories.
    pub k_min: usize,
    /// Tolerance of the lambda-subbundle relation.
    pub lambda: f64,
    /// Minimum representative length.
    pub min_length: f64,
}

impl ExtractionParams {
    pub fn new(epsilon: f64, k_min: usize, lambda: f64, min_length: f64) -> Self {
        Self {
            epsilon,
            k_min,
            lambda,
            min_length,
        }
    }

    /// Whether a bundle is large and long enough.
    pub fn accepts(&self, bundle: &Bundle) -> bool {
        bundle.size() >= self.k_min && bundle.continuous_length() >= self.min_length
    }

    /// Add `bundle` to `results` unless it is rejected or already covered by
    /// an accepted bundle. Accepted bundles covered by the new one are
    /// dropped first. Returns whether the bundle was added.
    pub fn offer(&self, results: &mut Vec<Bundle>, bundle: Bundle) -> bool {
        if !self.accepts(&bundle) {
            return false;
        }
        if results.iter().any(|r| r.has_as_lambda_subbundle(&bundle, self.lambda)) {
            trace!("[Sweep] {bundle} covered by an accepted bundle");
            return false;
        }
        results.retain(|r| !bundle.has_as_lambda_subbundle(r, self.lambda));
        results.push(bundle);
        true
    }
}
