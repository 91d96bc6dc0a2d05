//! Maximal-length bundles over the self-product of all trajectories.
//!
//! A window `[ls, lt]` of representative columns slides over the
//! concatenation. While at least `k` cluster curves exist for the current
//! window it grows at `lt`; otherwise the last bundle found is reported and
//! the window shrinks at `ls`. Each column enters and leaves the free-space
//! graph exactly once.

use std::ops::RangeInclusive;

use log::debug;

use super::bundle::Bundle;
use super::ExtractionParams;
use crate::error::Result;
use crate::freespace::{Block, Concatenation, FreeSpaceGraph};
use crate::progress::AbortHandle;
use crate::trajectory::Subtrajectory;

/// Sliding-window extractor of maximal-length bundles.
pub struct MaximalLengthSweep<'a> {
    concat: &'a Concatenation,
    params: ExtractionParams,
    abort: &'a AbortHandle,
}

impl<'a> MaximalLengthSweep<'a> {
    /// `concat` holds every trajectory; forward blocks come before any
    /// reversed copies.
    pub fn new(concat: &'a Concatenation, params: ExtractionParams, abort: &'a AbortHandle) -> Self {
        Self {
            concat,
            params,
            abort,
        }
    }

    /// Last column that may serve as part of a representative: the end of
    /// the last forward block.
    fn representative_limit(&self) -> usize {
        self.concat
            .blocks()
            .iter()
            .filter(|b| !b.trajectory.is_reversed())
            .map(Block::last)
            .max()
            .unwrap_or(0)
    }

    /// Run the sweep. Fails only when aborted.
    pub fn sweep(&self) -> Result<Vec<Bundle>> {
        let mut results = Vec::new();
        if self.concat.is_empty() {
            return Ok(results);
        }

        let mut graph = FreeSpaceGraph::self_product(self.concat, self.params.epsilon);
        let max = self.representative_limit();
        let (mut ls, mut lt) = (0usize, 0usize);
        let mut previous: Option<Bundle> = None;
        graph.add_column();

        while ls < max {
            self.abort.check()?;

            if ls == lt {
                lt += 1;
                graph.add_column();
                continue;
            }

            let bundle = self
                .concat
                .subtrajectory(ls as f64, lt as f64)
                .map(|representative| self.bundle_for(&graph, ls, lt, representative))
                .filter(|b| b.size() >= self.params.k_min);

            if let Some(bundle) = bundle {
                previous = Some(bundle);
                lt += 1;
                graph.add_column();
                continue;
            }

            if let Some(found) = previous.take() {
                self.params.offer(&mut results, found);
            }
            ls += 1;
            graph.remove_column();
        }
        if let Some(found) = previous {
            self.params.offer(&mut results, found);
        }

        debug!(
            "[Maximal] eps={:.3}: {} bundles over {} columns",
            self.params.epsilon,
            results.len(),
            max + 1
        );
        Ok(results)
    }

    /// Bundle of all cluster curves for representative columns `[s, t]`.
    fn bundle_for(&self, graph: &FreeSpaceGraph, s: usize, t: usize, representative: Subtrajectory) -> Bundle {
        let curves = self.cluster_curves(graph, s, t);
        let mut members = curves;
        members.push(representative.clone());
        Bundle::new(members, representative)
    }

    /// Walk the rows top-down and collect one curve per reachable start,
    /// never touching the blocks of the representative's own trajectory.
    fn cluster_curves(&self, graph: &FreeSpaceGraph, s: usize, t: usize) -> Vec<Subtrajectory> {
        let Some(own) = self.concat.block_at(s) else {
            return Vec::new();
        };
        let forbidden: Vec<RangeInclusive<usize>> = self.concat.blocks_of(&own.trajectory).map(Block::range).collect();

        let mut curves = Vec::new();
        let mut next = self.concat.len().checked_sub(1);
        while let Some(yt) = next {
            if forbidden.iter().any(|r| r.contains(&yt)) {
                next = yt.checked_sub(1);
                continue;
            }
            let Some(ys) = graph.find_start(s, t, yt, &forbidden) else {
                next = yt.checked_sub(1);
                continue;
            };
            if let Some((from, to)) = graph.subtrajectory_bounds(s, t, ys, yt) {
                if from <= to {
                    curves.extend(self.concat.subtrajectory(from, to));
                }
            }
            next = if ys < yt { Some(ys) } else { yt.checked_sub(1) };
        }
        curves
    }
}
