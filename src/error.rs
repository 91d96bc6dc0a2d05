//! Unified error type for bundle discovery and evolution.
//!
//! Input contract violations and cancellation are the only conditions surfaced
//! as errors. Degenerate geometry (empty candidate spans, unreachable
//! free-space queries) is handled locally by returning `None`.

use thiserror::Error;

/// Errors produced by the library.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BundleError {
    /// The run was started without any trajectories.
    #[error("no trajectories supplied")]
    EmptyInput,

    /// A trajectory has fewer points than an operation requires.
    #[error("trajectory {trajectory_id} has {point_count} points, at least {minimum_required} required")]
    InsufficientPoints {
        trajectory_id: String,
        point_count: usize,
        minimum_required: usize,
    },

    /// A point has a NaN or infinite coordinate.
    #[error("trajectory {trajectory_id} has a non-finite coordinate at point {index}")]
    InvalidCoordinate { trajectory_id: String, index: usize },

    /// Two input trajectories share an id.
    #[error("trajectory id {trajectory_id} is used more than once")]
    DuplicateTrajectory { trajectory_id: String },

    /// A (fractional) index range does not fit the trajectory it refers to.
    #[error("invalid range [{from}, {to}] on trajectory {trajectory_id} with {point_count} points")]
    InvalidRange {
        trajectory_id: String,
        from: f64,
        to: f64,
        point_count: usize,
    },

    /// A configuration value is out of its valid domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The caller requested cancellation. No diagram is produced.
    #[error("algorithm aborted")]
    Aborted,

    /// The worker thread could not be started or panicked.
    #[error("evolution worker failed: {0}")]
    WorkerFailed(String),
}

impl BundleError {
    /// True for user-requested cancellation, which callers usually should not
    /// report as a failure.
    pub fn is_abort(&self) -> bool {
        matches!(self, BundleError::Aborted)
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BundleError>;

/// Conversion helpers for `Option` values that encode a minimum-size check.
pub trait OptionExt<T> {
    /// Map `None` to [`BundleError::InsufficientPoints`].
    fn ok_or_insufficient_points(
        self,
        trajectory_id: &str,
        point_count: usize,
        minimum_required: usize,
    ) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_insufficient_points(
        self,
        trajectory_id: &str,
        point_count: usize,
        minimum_required: usize,
    ) -> Result<T> {
        self.ok_or_else(|| BundleError::InsufficientPoints {
            trajectory_id: trajectory_id.to_string(),
            point_count,
            minimum_required,
        })
    }
}
