//! Concatenation of oriented trajectories into one long polyline.
//!
//! The free-space graph works on a single index axis. Several trajectories are
//! laid end to end; the edge joining the last point of one block to the first
//! point of the next is a *seam* and never belongs to a cluster curve.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use crate::geometry::Point;
use crate::trajectory::{DirectedTrajectory, Subtrajectory};

/// One trajectory inside a [`Concatenation`].
#[derive(Debug, Clone)]
pub struct Block {
    /// Index of the first point of this block on the concatenated axis.
    pub offset: usize,
    pub trajectory: DirectedTrajectory,
}

impl Block {
    pub fn len(&self) -> usize {
        self.trajectory.num_points()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the last point of this block on the concatenated axis.
    pub fn last(&self) -> usize {
        self.offset + self.len() - 1
    }

    /// Closed range of concatenated indices covered by this block.
    pub fn range(&self) -> RangeInclusive<usize> {
        self.offset..=self.last()
    }
}

/// Oriented trajectories laid end to end.
#[derive(Debug, Clone, Default)]
pub struct Concatenation {
    points: Vec<Point>,
    blocks: Vec<Block>,
}

impl Concatenation {
    pub fn new<I>(trajectories: I) -> Self
    where
        I: IntoIterator<Item = DirectedTrajectory>,
    {
        let mut concat = Self::default();
        for t in trajectories {
            concat.push(t);
        }
        concat
    }

    /// Append one oriented trajectory.
    pub fn push(&mut self, trajectory: DirectedTrajectory) {
        let offset = self.points.len();
        self.points.extend(trajectory.points());
        self.blocks.push(Block { offset, trajectory });
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The block containing concatenated index `i`.
    pub fn block_at(&self, i: usize) -> Option<&Block> {
        let pos = self.blocks.partition_point(|b| b.offset <= i);
        let block = self.blocks.get(pos.checked_sub(1)?)?;
        (i <= block.last()).then_some(block)
    }

    /// Seam positions: `c` is a seam when edge `[c, c + 1]` joins two blocks.
    pub fn seams(&self) -> BTreeSet<usize> {
        let mut seams: BTreeSet<usize> = self.blocks.iter().map(Block::last).collect();
        if let Some(last) = self.blocks.last() {
            seams.remove(&last.last());
        }
        seams
    }

    /// Sub-trajectory for the concatenated index range `[from, to]`, or `None`
    /// when the range leaves its block.
    pub fn subtrajectory(&self, from: f64, to: f64) -> Option<Subtrajectory> {
        if from < 0.0 {
            return None;
        }
        let block = self.block_at(from.floor() as usize)?;
        if to > block.last() as f64 {
            return None;
        }
        let offset = block.offset as f64;
        Subtrajectory::new(block.trajectory.clone(), from - offset, to - offset).ok()
    }

    /// Blocks that show the same trajectory as `trajectory` in either
    /// orientation.
    pub fn blocks_of<'a>(&'a self, trajectory: &'a DirectedTrajectory) -> impl Iterator<Item = &'a Block> + 'a {
        self.blocks
            .iter()
            .filter(move |b| b.trajectory.same_parent(trajectory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::Trajectory;
    use std::sync::Arc;

    fn traj(id: &str, n: usize) -> Arc<Trajectory> {
        let coords: Vec<(f64, f64)> = (0..n).map(|i| (i as f64, 0.0)).collect();
        Arc::new(Trajectory::from_xy(id, &coords).unwrap())
    }

    #[test]
    fn test_blocks_and_seams() {
        let a = traj("a", 3);
        let b = traj("b", 4);
        let concat = Concatenation::new([a.forward(), b.forward(), a.reversed()]);

        assert_eq!(concat.len(), 10);
        assert_eq!(concat.block_at(2).unwrap().trajectory.id(), "a");
        assert_eq!(concat.block_at(3).unwrap().trajectory.id(), "b");
        assert!(concat.block_at(9).unwrap().trajectory.is_reversed());
        assert!(concat.block_at(10).is_none());
        assert_eq!(concat.seams().into_iter().collect::<Vec<_>>(), vec![2, 6]);
        assert_eq!(concat.blocks_of(&a.forward()).count(), 2);
    }

    #[test]
    fn test_subtrajectory_stays_in_block() {
        let a = traj("a", 3);
        let b = traj("b", 4);
        let concat = Concatenation::new([a.forward(), b.forward()]);

        let sub = concat.subtrajectory(3.5, 5.0).unwrap();
        assert_eq!(sub.parent_id(), "b");
        assert!((sub.from_index() - 0.5).abs() < 1e-12);
        assert!(concat.subtrajectory(1.0, 3.0).is_none());
    }
}
