//! Identity matching between consecutive epsilon steps.
//!
//! A previous class continues into the new bundle it shares the most parent
//! trajectories with, provided the overlap is large enough relative to the
//! smaller of the two bundles. When several classes continue into the same
//! bundle, one survives and the others merge into it.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, warn};

use super::state::{ClassId, DiagramState};
use crate::bundles::{Bundle, BundleSet};

/// Assigns class ids to the bundle sets of successive epsilon steps.
#[derive(Debug, Clone)]
pub struct IdentityMatcher {
    min_overlap: f64,
    next_id: ClassId,
    birth: BTreeMap<ClassId, f64>,
}

impl IdentityMatcher {
    pub fn new(min_overlap: f64) -> Self {
        Self {
            min_overlap,
            next_id: 0,
            birth: BTreeMap::new(),
        }
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> usize {
        self.next_id
    }

    /// Build the state for `set` given the state of the previous step.
    pub fn advance(
        &mut self,
        previous: Option<&DiagramState>,
        set: &BundleSet,
        epsilon: f64,
        k: usize,
        lambda: f64,
    ) -> DiagramState {
        let mut state = DiagramState::new(epsilon, k);
        let Some(previous) = previous else {
            for bundle in &set.bundles {
                self.birth_of(&mut state, bundle);
            }
            return state;
        };

        // continuation candidates per new bundle, and the best raw overlap per
        // previous class
        let mut predecessors: Vec<Vec<ClassId>> = vec![Vec::new(); set.bundles.len()];
        let mut best_overlap: BTreeMap<ClassId, usize> = BTreeMap::new();
        for (&class, old) in &previous.classes {
            if let Some((j, shared)) = best_match(old, &set.bundles) {
                best_overlap.insert(class, j);
                let ratio = shared as f64 / old.size().min(set.bundles[j].size()) as f64;
                if ratio >= self.min_overlap {
                    predecessors[j].push(class);
                }
            }
        }

        let mut class_of_new: Vec<ClassId> = Vec::with_capacity(set.bundles.len());
        for (j, bundle) in set.bundles.iter().enumerate() {
            let candidates = &predecessors[j];
            if candidates.is_empty() {
                class_of_new.push(self.birth_of(&mut state, bundle));
                continue;
            }
            let survivor = candidates
                .iter()
                .copied()
                .min_by(|&a, &b| self.survivor_cmp(previous, a, b))
                .unwrap_or(candidates[0]);
            for &other in candidates.iter().filter(|&&c| c != survivor) {
                debug!("[Matching] eps={epsilon:.3}: class {other} merges into {survivor}");
                state.merges.insert(other, survivor);
            }
            state.classes.insert(survivor, Arc::clone(bundle));
            class_of_new.push(survivor);
        }

        for (&class, old) in &previous.classes {
            if state.contains(class) || state.merges.contains_key(&class) {
                continue;
            }
            let target = set
                .bundles
                .iter()
                .position(|b| b.has_as_lambda_subbundle(old, lambda))
                .or_else(|| {
                    set.absorbed
                        .iter()
                        .find(|(b, _)| b.has_as_lambda_subbundle(old, lambda))
                        .map(|&(_, survivor)| survivor)
                })
                .or_else(|| best_overlap.get(&class).copied());
            match target {
                Some(j) => {
                    debug!("[Matching] eps={epsilon:.3}: class {class} absorbed by {}", class_of_new[j]);
                    state.merges.insert(class, class_of_new[j]);
                }
                None => {
                    warn!("[Matching] eps={epsilon:.3}: class {class} has no successor");
                    state.vanished.insert(class);
                }
            }
        }
        state
    }

    fn birth_of(&mut self, state: &mut DiagramState, bundle: &Arc<Bundle>) -> ClassId {
        let id = self.next_id;
        self.next_id += 1;
        self.birth.insert(id, state.epsilon);
        state.births.insert(id);
        state.classes.insert(id, Arc::clone(bundle));
        id
    }

    /// Larger previous bundle first, then earlier birth, then smaller id.
    fn survivor_cmp(&self, previous: &DiagramState, a: ClassId, b: ClassId) -> Ordering {
        let size = |c: ClassId| previous.bundle(c).map_or(0, |bundle| bundle.size());
        let birth = |c: ClassId| self.birth.get(&c).copied().unwrap_or(f64::INFINITY);
        size(b)
            .cmp(&size(a))
            .then_with(|| birth(a).total_cmp(&birth(b)))
            .then_with(|| a.cmp(&b))
    }
}

/// Index of the new bundle sharing the most parents with `old`, first on
/// ties, together with the number of shared parents. `None` without any
/// overlap.
fn best_match(old: &Bundle, bundles: &[Arc<Bundle>]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    for (j, bundle) in bundles.iter().enumerate() {
        let shared = old.overlap(bundle);
        if shared > 0 && best.map_or(true, |(_, s)| shared > s) {
            best = Some((j, shared));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::{Subtrajectory, Trajectory};

    fn traj(id: &str, y: f64) -> Arc<Trajectory> {
        let coords: Vec<(f64, f64)> = (0..5).map(|i| (i as f64, y)).collect();
        Arc::new(Trajectory::from_xy(id, &coords).unwrap())
    }

    fn bundle(trajs: &[&Arc<Trajectory>], from: f64, to: f64) -> Arc<Bundle> {
        let members: Vec<Subtrajectory> = trajs
            .iter()
            .map(|t| Subtrajectory::new(t.forward(), from, to).unwrap())
            .collect();
        let rep = members[0].clone();
        Arc::new(Bundle::new(members, rep))
    }

    fn set(bundles: Vec<Arc<Bundle>>) -> BundleSet {
        BundleSet {
            bundles,
            absorbed: Vec::new(),
        }
    }

    #[test]
    fn test_first_step_is_all_births() {
        let (a, b, c) = (traj("a", 0.0), traj("b", 1.0), traj("c", 9.0));
        let mut matcher = IdentityMatcher::new(0.5);
        let state = matcher.advance(None, &set(vec![bundle(&[&a, &b], 0.0, 4.0), bundle(&[&c], 0.0, 4.0)]), 5.0, 1, 10.0);
        assert_eq!(state.births.len(), 2);
        assert_eq!(state.classes.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(matcher.issued(), 2);
    }

    #[test]
    fn test_two_classes_merge_into_larger() {
        let (a, b, c, d, e) = (traj("a", 0.0), traj("b", 1.0), traj("c", 2.0), traj("d", 3.0), traj("e", 4.0));
        let mut matcher = IdentityMatcher::new(0.5);
        let first = matcher.advance(
            None,
            &set(vec![bundle(&[&a, &b, &c], 0.0, 4.0), bundle(&[&d, &e], 0.0, 4.0)]),
            5.0,
            2,
            10.0,
        );
        let second = matcher.advance(
            Some(&first),
            &set(vec![bundle(&[&a, &b, &c, &d, &e], 0.0, 4.0)]),
            10.0,
            2,
            20.0,
        );
        assert!(second.births.is_empty());
        assert_eq!(second.classes.keys().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(second.merges.get(&1), Some(&0));
    }

    #[test]
    fn test_low_overlap_is_a_birth() {
        let ids = ["a", "b", "c", "d", "e", "f"];
        let t: Vec<Arc<Trajectory>> = ids.iter().enumerate().map(|(i, id)| traj(id, i as f64)).collect();
        let mut matcher = IdentityMatcher::new(0.5);
        let first = matcher.advance(None, &set(vec![bundle(&[&t[0], &t[1], &t[2], &t[3]], 0.0, 4.0)]), 5.0, 2, 10.0);
        // one shared parent out of three is below the threshold
        let second = matcher.advance(
            Some(&first),
            &set(vec![bundle(&[&t[3], &t[4], &t[5]], 0.0, 4.0), bundle(&[&t[0]], 0.0, 1.0)]),
            10.0,
            1,
            0.0,
        );
        assert!(second.births.contains(&1));
        assert!(second.births.contains(&2));
        assert!(!second.contains(0));
        assert_eq!(second.merges.get(&0), Some(&1));
    }

    #[test]
    fn test_vanished_without_overlap() {
        let (a, b, c) = (traj("a", 0.0), traj("b", 1.0), traj("c", 2.0));
        let mut matcher = IdentityMatcher::new(0.5);
        let first = matcher.advance(None, &set(vec![bundle(&[&a, &b], 0.0, 4.0)]), 5.0, 2, 10.0);
        let second = matcher.advance(Some(&first), &set(vec![bundle(&[&c], 0.0, 4.0)]), 10.0, 1, 20.0);
        assert!(second.vanished.contains(&0));
        assert!(second.births.contains(&1));
    }
}
