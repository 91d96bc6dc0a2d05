//! Spatial index over trajectory envelopes.
//!
//! Uses an R-tree to find the trajectories that can possibly come within
//! epsilon of a representative, so free-space graphs only get rows that can
//! hold free cells.

use std::sync::Arc;

use rstar::{RTree, RTreeObject, AABB};

use crate::trajectory::Trajectory;

/// Envelope of one trajectory, tagged with its position in the input list.
#[derive(Debug, Clone)]
pub struct TrajectoryEnvelope {
    pub index: usize,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl TrajectoryEnvelope {
    fn new(index: usize, trajectory: &Trajectory) -> Self {
        let envelope = trajectory.envelope();
        let [min_x, min_y] = envelope.lower();
        let [max_x, max_y] = envelope.upper();
        Self {
            index,
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// This envelope grown by `margin` on every side.
    fn expanded(&self, margin: f64) -> AABB<[f64; 2]> {
        AABB::from_corners(
            [self.min_x - margin, self.min_y - margin],
            [self.max_x + margin, self.max_y + margin],
        )
    }
}

impl RTreeObject for TrajectoryEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

/// R-tree of trajectory envelopes.
#[derive(Debug)]
pub struct TrajectoryIndex {
    tree: RTree<TrajectoryEnvelope>,
    envelopes: Vec<TrajectoryEnvelope>,
}

impl TrajectoryIndex {
    /// Bulk-load the index for a trajectory list.
    pub fn build(trajectories: &[Arc<Trajectory>]) -> Self {
        let envelopes: Vec<TrajectoryEnvelope> = trajectories
            .iter()
            .enumerate()
            .map(|(i, t)| TrajectoryEnvelope::new(i, t))
            .collect();
        Self {
            tree: RTree::bulk_load(envelopes.clone()),
            envelopes,
        }
    }

    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    /// Indices, ascending, of trajectories whose envelope comes within
    /// `distance` of the envelope of trajectory `index`. Always contains
    /// `index` itself.
    pub fn near(&self, index: usize, distance: f64) -> Vec<usize> {
        let Some(envelope) = self.envelopes.get(index) else {
            return Vec::new();
        };
        let query = envelope.expanded(distance);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query)
            .map(|e| e.index)
            .collect();
        hits.sort_unstable();
        hits
    }
}
