//! The bundle entity: mutually similar sub-trajectories plus a representative.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::trajectory::Subtrajectory;

/// An immutable group of sub-trajectories, at most one per parent
/// trajectory, with a designated representative.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Sorted by parent id.
    members: Vec<Subtrajectory>,
    representative: Subtrajectory,
}

impl Bundle {
    /// Build a bundle. Candidates sharing a parent (in either orientation)
    /// are collapsed to the longest one.
    pub fn new<I>(candidates: I, representative: Subtrajectory) -> Self
    where
        I: IntoIterator<Item = Subtrajectory>,
    {
        let mut by_parent: BTreeMap<String, Subtrajectory> = BTreeMap::new();
        for candidate in candidates {
            let longer = by_parent
                .get(candidate.parent_id())
                .map_or(true, |existing| existing.euclidean_length() < candidate.euclidean_length());
            if longer {
                by_parent.insert(candidate.parent_id().to_string(), candidate);
            }
        }
        Self {
            members: by_parent.into_values().collect(),
            representative,
        }
    }

    pub fn members(&self) -> &[Subtrajectory] {
        &self.members
    }

    pub fn representative(&self) -> &Subtrajectory {
        &self.representative
    }

    /// Number of distinct parent trajectories.
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Parent ids in ascending order.
    pub fn parent_ids(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(Subtrajectory::parent_id)
    }

    /// The member on the given parent, if any.
    pub fn member_for(&self, parent_id: &str) -> Option<&Subtrajectory> {
        self.members
            .binary_search_by(|m| m.parent_id().cmp(parent_id))
            .ok()
            .map(|i| &self.members[i])
    }

    pub fn contains_parent(&self, parent_id: &str) -> bool {
        self.member_for(parent_id).is_some()
    }

    /// Euclidean length along the representative.
    pub fn continuous_length(&self) -> f64 {
        self.representative.euclidean_length()
    }

    /// Length of the longest member.
    pub fn max_member_length(&self) -> f64 {
        self.members
            .iter()
            .map(Subtrajectory::euclidean_length)
            .fold(0.0, f64::max)
    }

    /// Length of the shortest member, infinite for an empty bundle.
    pub fn min_member_length(&self) -> f64 {
        self.members
            .iter()
            .map(Subtrajectory::euclidean_length)
            .fold(f64::INFINITY, f64::min)
    }

    /// Mean member length, `0.0` for an empty bundle.
    pub fn average_member_length(&self) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        self.members.iter().map(Subtrajectory::euclidean_length).sum::<f64>() / self.members.len() as f64
    }

    /// Number of parent trajectories shared with `other`.
    pub fn overlap(&self, other: &Bundle) -> usize {
        // both member lists are sorted by parent id
        let (mut i, mut j, mut shared) = (0, 0, 0);
        while i < self.members.len() && j < other.members.len() {
            match self.members[i].parent_id().cmp(other.members[j].parent_id()) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    shared += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        shared
    }

    /// True when every member of `other` is contained in this bundle's member
    /// on the same parent.
    pub fn has_as_subbundle(&self, other: &Bundle) -> bool {
        other.size() <= self.size()
            && other.members.iter().all(|sub| {
                self.member_for(sub.parent_id())
                    .is_some_and(|sup| sup.has_as_subtrajectory(sub))
            })
    }

    /// Like [`has_as_subbundle`](Self::has_as_subbundle), but each member of
    /// `other` may stick out of its counterpart by at most `lambda`.
    pub fn has_as_lambda_subbundle(&self, other: &Bundle, lambda: f64) -> bool {
        other.size() <= self.size()
            && other.members.iter().all(|sub| {
                self.member_for(sub.parent_id())
                    .is_some_and(|sup| sup.has_as_lambda_subtrajectory(sub, lambda))
            })
    }

    /// Deterministic ordering: larger first, then longer representative,
    /// then representative parent and start index.
    pub fn priority_cmp(&self, other: &Bundle) -> Ordering {
        other
            .size()
            .cmp(&self.size())
            .then_with(|| other.continuous_length().total_cmp(&self.continuous_length()))
            .then_with(|| self.representative.parent_id().cmp(other.representative.parent_id()))
            .then_with(|| {
                self.representative
                    .from_index()
                    .total_cmp(&other.representative.from_index())
            })
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bundle(size={}, rep={}, length={:.1})",
            self.size(),
            self.representative,
            self.continuous_length()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::Trajectory;
    use std::sync::Arc;

    fn traj(id: &str, y: f64, n: usize) -> Arc<Trajectory> {
        let coords: Vec<(f64, f64)> = (0..n).map(|i| (i as f64, y)).collect();
        Arc::new(Trajectory::from_xy(id, &coords).unwrap())
    }

    fn sub(t: &Arc<Trajectory>, from: f64, to: f64) -> Subtrajectory {
        Subtrajectory::new(t.forward(), from, to).unwrap()
    }

    #[test]
    fn test_longest_candidate_per_parent_wins() {
        let a = traj("a", 0.0, 10);
        let b = traj("b", 1.0, 10);
        let bundle = Bundle::new(
            vec![sub(&a, 0.0, 3.0), sub(&b, 0.0, 9.0), sub(&a, 2.0, 8.0)],
            sub(&a, 0.0, 9.0),
        );
        assert_eq!(bundle.size(), 2);
        let member = bundle.member_for("a").unwrap();
        assert!((member.from_index() - 2.0).abs() < 1e-12);
        assert_eq!(bundle.parent_ids().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_reversed_candidate_counts_as_same_parent() {
        let a = traj("a", 0.0, 5);
        let reversed = Subtrajectory::new(a.reversed(), 0.0, 4.0).unwrap();
        let bundle = Bundle::new(vec![sub(&a, 0.0, 1.0), reversed], sub(&a, 0.0, 4.0));
        assert_eq!(bundle.size(), 1);
        assert!(bundle.members()[0].parent().is_reversed());
    }

    #[test]
    fn test_subbundle_relations() {
        let a = traj("a", 0.0, 10);
        let b = traj("b", 1.0, 10);
        let c = traj("c", 2.0, 10);
        let big = Bundle::new(vec![sub(&a, 0.0, 9.0), sub(&b, 0.0, 9.0), sub(&c, 0.0, 9.0)], sub(&b, 0.0, 9.0));
        let small = Bundle::new(vec![sub(&a, 1.0, 5.0), sub(&b, 1.0, 5.0)], sub(&a, 1.0, 5.0));
        let stretched = Bundle::new(vec![sub(&a, 0.0, 9.0), sub(&b, 0.0, 9.0)], sub(&a, 0.0, 9.0));

        assert!(big.has_as_subbundle(&small));
        assert!(!small.has_as_subbundle(&big));
        assert!(small.has_as_lambda_subbundle(&stretched, 5.0));
        assert!(!small.has_as_lambda_subbundle(&stretched, 4.0));
        assert_eq!(big.overlap(&small), 2);
    }

    #[test]
    fn test_lengths() {
        let a = traj("a", 0.0, 5);
        let b = traj("b", 1.0, 5);
        let bundle = Bundle::new(vec![sub(&a, 0.0, 4.0), sub(&b, 0.0, 2.0)], sub(&a, 1.0, 4.0));
        assert!((bundle.continuous_length() - 3.0).abs() < 1e-12);
        assert!((bundle.max_member_length() - 4.0).abs() < 1e-12);
        assert!((bundle.min_member_length() - 2.0).abs() < 1e-12);
        assert!((bundle.average_member_length() - 3.0).abs() < 1e-12);
    }
}
