//! Furthest-endpoint sweep over the events of one representative.
//!
//! Every row block (one candidate trajectory in one orientation) keeps at
//! most one *status interval*: the reachable interval that extends furthest
//! along the representative. When a status interval closes beyond the last
//! emission boundary, all active intervals are grouped into runs of
//! increasing start column and each run becomes a candidate bundle over
//! `[run start, closing column]`.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use super::bundle::Bundle;
use super::ExtractionParams;
use crate::freespace::{Concatenation, Event, FreeSpaceGraph, GridPoint};
use crate::trajectory::{DirectedTrajectory, Subtrajectory};

/// A reachable interval `start -> end` of one row block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Interval {
    start_x: usize,
    start_y: usize,
    end_y: usize,
    end_x: usize,
}

impl Interval {
    fn of(event: &Event) -> Self {
        Self {
            start_x: event.start.x,
            start_y: event.start.y,
            end_y: event.end.y,
            end_x: event.end.x,
        }
    }

    fn end(&self) -> GridPoint {
        GridPoint::new(self.end_x, self.end_y)
    }

    /// Whether `self` should replace `current` as status interval. Only a
    /// strictly further end column replaces; the first interval seen keeps
    /// its slot on ties.
    fn supersedes(&self, current: &Interval) -> bool {
        current.end_x < self.end_x
    }
}

/// Sweep-line extractor for one representative against a row concatenation.
pub struct FurthestEndpointSweep<'a> {
    graph: &'a FreeSpaceGraph,
    rows: &'a Concatenation,
    representative: &'a DirectedTrajectory,
    params: ExtractionParams,
}

impl<'a> FurthestEndpointSweep<'a> {
    /// `graph` must have been built for `representative` against `rows` with
    /// all columns added.
    pub fn new(
        graph: &'a FreeSpaceGraph,
        rows: &'a Concatenation,
        representative: &'a DirectedTrajectory,
        params: ExtractionParams,
    ) -> Self {
        Self {
            graph,
            rows,
            representative,
            params,
        }
    }

    /// Run the sweep and return the accepted bundles.
    pub fn sweep(&self) -> Vec<Bundle> {
        let events = self.graph.collect_events();
        let mut status: HashMap<usize, Interval> = HashMap::new();
        let mut active: BTreeSet<Interval> = BTreeSet::new();
        let mut results: Vec<Bundle> = Vec::new();
        let mut high: Option<usize> = None;

        for event in &events {
            let Some(block) = self.rows.block_at(event.start.y) else {
                continue;
            };
            let key = block.offset;
            let interval = Interval::of(event);

            if event.is_start {
                let current = status.get(&key).copied();
                if current.map_or(true, |c| interval.supersedes(&c)) {
                    if let Some(c) = current {
                        active.remove(&c);
                    }
                    status.insert(key, interval);
                    active.insert(interval);
                }
                continue;
            }

            if status.get(&key) != Some(&interval) {
                continue;
            }

            let reversed_representative = block.trajectory.same_parent(self.representative)
                && block.trajectory.is_reversed() != self.representative.is_reversed();
            if high.map_or(true, |h| event.end.x > h) && !reversed_representative {
                self.emit(&active, event.start.x, event.end.x, &mut results);
                high = Some(event.end.x);
            }

            status.remove(&key);
            active.remove(&interval);
        }

        debug!(
            "[Sweep] representative {} eps={:.3}: {} events, {} bundles",
            self.representative,
            self.graph.epsilon(),
            events.len(),
            results.len()
        );
        results
    }

    /// Split the active intervals into runs of increasing start column and
    /// offer one bundle per run.
    fn emit(&self, active: &BTreeSet<Interval>, start: usize, end: usize, results: &mut Vec<Bundle>) {
        let mut low = start;
        let mut run: Vec<Interval> = Vec::new();
        for interval in active {
            if interval.start_x > low {
                if let Some(bundle) = self.make_bundle(&run, low, end) {
                    self.params.offer(results, bundle);
                }
                low = interval.start_x;
            }
            run.push(*interval);
        }
        if let Some(bundle) = self.make_bundle(&run, low, end) {
            self.params.offer(results, bundle);
        }
    }

    /// Trim every interval of the run to `[s, t]` on the representative and
    /// collect the surviving sub-trajectories.
    fn make_bundle(&self, run: &[Interval], s: usize, t: usize) -> Option<Bundle> {
        if s >= t || run.is_empty() {
            return None;
        }
        let candidates: Vec<Subtrajectory> = run
            .iter()
            .filter_map(|interval| {
                let span = self.graph.trimmed_span(s, t, interval.end())?;
                (span.from < span.to).then_some(span)
            })
            .filter_map(|span| self.rows.subtrajectory(span.from, span.to))
            .collect();
        let representative = Subtrajectory::new(self.representative.clone(), s as f64, t as f64).ok()?;
        Some(Bundle::new(candidates, representative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::Trajectory;
    use std::sync::Arc;

    fn horizontal(id: &str, y: f64, n: usize) -> Arc<Trajectory> {
        let coords: Vec<(f64, f64)> = (0..n).map(|i| (i as f64, y)).collect();
        Arc::new(Trajectory::from_xy(id, &coords).unwrap())
    }

    fn run(representative: &Arc<Trajectory>, others: &[Arc<Trajectory>], params: ExtractionParams) -> Vec<Bundle> {
        let rows = Concatenation::new(others.iter().map(|t| t.forward()));
        let rep = representative.forward();
        let mut graph = FreeSpaceGraph::for_representative(&rep, &rows, params.epsilon);
        graph.add_all_columns();
        FurthestEndpointSweep::new(&graph, &rows, &rep, params).sweep()
    }

    #[test]
    fn test_middle_representative_collects_all_three() {
        let a = horizontal("a", 0.0, 3);
        let b = horizontal("b", 1.0, 3);
        let c = horizontal("c", 2.0, 3);
        let bundles = run(&b, &[a.clone(), b.clone(), c.clone()], ExtractionParams::new(1.0, 1, 2.0, 1.0));

        assert_eq!(bundles.len(), 1);
        let bundle = &bundles[0];
        assert_eq!(bundle.size(), 3);
        assert!((bundle.continuous_length() - 2.0).abs() < 1e-9);
        for member in bundle.members() {
            assert!((member.euclidean_length() - 2.0).abs() < 1e-9, "{member}");
        }
    }

    #[test]
    fn test_far_trajectory_is_not_a_member() {
        let a = horizontal("a", 0.0, 4);
        let far = horizontal("far", 10.0, 4);
        let bundles = run(&a, &[a.clone(), far], ExtractionParams::new(1.0, 1, 2.0, 1.0));
        assert!(!bundles.is_empty());
        assert!(bundles.iter().all(|b| !b.contains_parent("far")));
    }

    #[test]
    fn test_k_min_rejects_small_bundles() {
        let a = horizontal("a", 0.0, 4);
        let b = horizontal("b", 0.5, 4);
        let bundles = run(&a, &[a.clone(), b], ExtractionParams::new(1.0, 3, 2.0, 1.0));
        assert!(bundles.is_empty());
    }

    #[test]
    fn test_status_interval_replaced_only_by_further_end() {
        let current = Interval {
            start_x: 0,
            start_y: 1,
            end_y: 2,
            end_x: 3,
        };
        let taller = Interval {
            start_y: 0,
            end_y: 3,
            ..current
        };
        let further = Interval { end_x: 4, ..current };
        assert!(!taller.supersedes(&current));
        assert!(!current.supersedes(&taller));
        assert!(further.supersedes(&current));
        assert!(!current.supersedes(&further));
    }
}
