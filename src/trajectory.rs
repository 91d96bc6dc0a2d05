//! Trajectories, oriented views and fractional sub-trajectories.
//!
//! A [`Trajectory`] is immutable and shared behind an `Arc`. Orientation is a
//! projection ([`DirectedTrajectory`]) that remaps indices rather than
//! copying points. A [`Subtrajectory`] is a closed, possibly fractional, index
//! range on such a view: index `2.5` is the midpoint of edge `2`.

use std::fmt;
use std::sync::Arc;

use rstar::AABB;
use serde::{Deserialize, Serialize};

use crate::error::{BundleError, OptionExt, Result};
use crate::geometry::{lerp, point, point_distance, point_segment_distance, Point};

/// Minimum number of points for a trajectory to have an edge.
pub const MIN_TRAJECTORY_POINTS: usize = 2;

/// An immutable polyline with a stable identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTrajectory")]
pub struct Trajectory {
    id: String,
    points: Vec<Point>,
}

/// Unchecked wire form, validated through [`Trajectory::new`].
#[derive(Deserialize)]
struct RawTrajectory {
    id: String,
    points: Vec<Point>,
}

impl TryFrom<RawTrajectory> for Trajectory {
    type Error = BundleError;

    fn try_from(raw: RawTrajectory) -> Result<Self> {
        Self::new(raw.id, raw.points)
    }
}

impl Trajectory {
    /// Create a trajectory. Fails when fewer than two points are given or a
    /// coordinate is not finite.
    pub fn new(id: impl Into<String>, points: Vec<Point>) -> Result<Self> {
        let id = id.into();
        let count = points.len();
        (count >= MIN_TRAJECTORY_POINTS)
            .then_some(())
            .ok_or_insufficient_points(&id, count, MIN_TRAJECTORY_POINTS)?;
        if let Some(index) = points.iter().position(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(BundleError::InvalidCoordinate { trajectory_id: id, index });
        }
        Ok(Self { id, points })
    }

    /// Create a trajectory from `(x, y)` tuples.
    pub fn from_xy(id: impl Into<String>, coords: &[(f64, f64)]) -> Result<Self> {
        Self::new(id, coords.iter().map(|&(x, y)| point(x, y)).collect())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn num_edges(&self) -> usize {
        self.points.len() - 1
    }

    /// Point `i`. Panics when out of range.
    pub fn point(&self, i: usize) -> Point {
        self.points[i]
    }

    /// Edge `i`, from point `i` to point `i + 1`.
    pub fn edge(&self, i: usize) -> (Point, Point) {
        (self.points[i], self.points[i + 1])
    }

    /// Total Euclidean length.
    pub fn euclidean_length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| point_distance(w[0], w[1]))
            .sum()
    }

    /// Axis-aligned bounding box as an R-tree envelope.
    pub fn envelope(&self) -> AABB<[f64; 2]> {
        let corners: Vec<[f64; 2]> = self.points.iter().map(|p| [p.x, p.y]).collect();
        AABB::from_points(corners.iter())
    }

    /// Forward view of a shared trajectory.
    pub fn forward(self: &Arc<Self>) -> DirectedTrajectory {
        DirectedTrajectory::new(Arc::clone(self), false)
    }

    /// Reversed view of a shared trajectory.
    pub fn reversed(self: &Arc<Self>) -> DirectedTrajectory {
        DirectedTrajectory::new(Arc::clone(self), true)
    }
}

/// A trajectory seen in forward or reverse orientation.
#[derive(Debug, Clone)]
pub struct DirectedTrajectory {
    trajectory: Arc<Trajectory>,
    reversed: bool,
}

impl DirectedTrajectory {
    pub fn new(trajectory: Arc<Trajectory>, reversed: bool) -> Self {
        Self {
            trajectory,
            reversed,
        }
    }

    /// The underlying trajectory, independent of orientation.
    pub fn trajectory(&self) -> &Arc<Trajectory> {
        &self.trajectory
    }

    pub fn id(&self) -> &str {
        self.trajectory.id()
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// The same trajectory in the opposite orientation.
    pub fn reverse(&self) -> Self {
        Self::new(Arc::clone(&self.trajectory), !self.reversed)
    }

    pub fn num_points(&self) -> usize {
        self.trajectory.num_points()
    }

    /// Map an index in this orientation to the underlying trajectory.
    #[inline]
    fn underlying(&self, i: usize) -> usize {
        if self.reversed {
            self.trajectory.num_points() - 1 - i
        } else {
            i
        }
    }

    /// Point `i` in this orientation.
    pub fn point(&self, i: usize) -> Point {
        self.trajectory.point(self.underlying(i))
    }

    /// Points in this orientation.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.num_points()).map(move |i| self.point(i))
    }

    /// Point at a fractional index, interpolated along the containing edge.
    pub fn point_at(&self, index: f64) -> Point {
        let last = self.num_points() - 1;
        let index = index.clamp(0.0, last as f64);
        let base = index.floor() as usize;
        if base >= last {
            return self.point(last);
        }
        lerp(self.point(base), self.point(base + 1), index - base as f64)
    }

    /// Identity of the oriented view: id plus direction flag.
    pub fn key(&self) -> (&str, bool) {
        (self.id(), self.reversed)
    }

    /// True when both views refer to the same trajectory, ignoring orientation.
    pub fn same_parent(&self, other: &DirectedTrajectory) -> bool {
        self.id() == other.id()
    }
}

impl PartialEq for DirectedTrajectory {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for DirectedTrajectory {}

impl fmt::Display for DirectedTrajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reversed {
            write!(f, "{}'", self.id())
        } else {
            write!(f, "{}", self.id())
        }
    }
}

/// A closed, possibly fractional, index range `[from, to]` on an oriented
/// parent trajectory.
#[derive(Debug, Clone)]
pub struct Subtrajectory {
    parent: DirectedTrajectory,
    from: f64,
    to: f64,
}

impl Subtrajectory {
    /// Create a sub-trajectory. `0 <= from <= to <= n - 1` must hold.
    pub fn new(parent: DirectedTrajectory, from: f64, to: f64) -> Result<Self> {
        let last = (parent.num_points() - 1) as f64;
        if !from.is_finite() || !to.is_finite() || from < 0.0 || to > last || from > to {
            return Err(BundleError::InvalidRange {
                trajectory_id: parent.id().to_string(),
                from,
                to,
                point_count: parent.num_points(),
            });
        }
        Ok(Self { parent, from, to })
    }

    /// The whole trajectory in the given orientation.
    pub fn full(parent: DirectedTrajectory) -> Self {
        let to = (parent.num_points() - 1) as f64;
        Self {
            parent,
            from: 0.0,
            to,
        }
    }

    pub fn parent(&self) -> &DirectedTrajectory {
        &self.parent
    }

    pub fn parent_id(&self) -> &str {
        self.parent.id()
    }

    pub fn from_index(&self) -> f64 {
        self.from
    }

    pub fn to_index(&self) -> f64 {
        self.to
    }

    /// Length of the index range.
    pub fn interval_length(&self) -> f64 {
        self.to - self.from
    }

    pub fn first_point(&self) -> Point {
        self.parent.point_at(self.from)
    }

    pub fn last_point(&self) -> Point {
        self.parent.point_at(self.to)
    }

    /// Polyline of this sub-trajectory: interpolated endpoints plus every
    /// parent vertex strictly inside the range.
    pub fn points(&self) -> Vec<Point> {
        let mut out = vec![self.first_point()];
        let first_inner = self.from.floor() as usize + 1;
        let last_inner = self.to.ceil() as usize;
        for i in first_inner..last_inner {
            out.push(self.parent.point(i));
        }
        if self.to > self.from {
            out.push(self.last_point());
        }
        out
    }

    /// Euclidean length along the parent between the range endpoints.
    pub fn euclidean_length(&self) -> f64 {
        path_length(&self.parent, self.from, self.to)
    }

    /// The same range expressed on the forward orientation of the parent.
    pub fn normalized(&self) -> Subtrajectory {
        if !self.parent.is_reversed() {
            return self.clone();
        }
        let last = (self.parent.num_points() - 1) as f64;
        Subtrajectory {
            parent: self.parent.reverse(),
            from: last - self.to,
            to: last - self.from,
        }
    }

    /// True when `other` lies on the same parent and within this range.
    pub fn has_as_subtrajectory(&self, other: &Subtrajectory) -> bool {
        if !self.parent.same_parent(&other.parent) {
            return false;
        }
        let (a, b) = (self.normalized(), other.normalized());
        a.from <= b.from && b.to <= a.to
    }

    /// True when `other` lies on the same parent and the parts of it that
    /// stick out of this range are together at most `lambda` long.
    pub fn has_as_lambda_subtrajectory(&self, other: &Subtrajectory, lambda: f64) -> bool {
        if !self.parent.same_parent(&other.parent) {
            return false;
        }
        let (a, b) = (self.normalized(), other.normalized());
        let before = if b.from < a.from {
            path_length(&b.parent, b.from, b.to.min(a.from))
        } else {
            0.0
        };
        let after = if b.to > a.to {
            path_length(&b.parent, b.from.max(a.to), b.to)
        } else {
            0.0
        };
        before + after <= lambda
    }

    /// True when both endpoints of `other` lie within `lambda` of this
    /// polyline.
    pub fn has_as_lambda_similar(&self, other: &Subtrajectory, lambda: f64) -> bool {
        let polyline = self.points();
        let near = |p: Point| {
            if polyline.len() == 1 {
                return point_distance(p, polyline[0]) <= lambda;
            }
            polyline
                .windows(2)
                .any(|w| point_segment_distance(p, w[0], w[1]) <= lambda)
        };
        near(other.first_point()) && near(other.last_point())
    }
}

impl fmt::Display for Subtrajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{:.3}, {:.3}]", self.parent, self.from, self.to)
    }
}

/// Euclidean length along `parent` between two fractional indices.
fn path_length(parent: &DirectedTrajectory, from: f64, to: f64) -> f64 {
    if to <= from {
        return 0.0;
    }
    let mut length = 0.0;
    let mut previous = parent.point_at(from);
    let mut i = from.floor() as usize + 1;
    while (i as f64) < to {
        let p = parent.point(i);
        length += point_distance(previous, p);
        previous = p;
        i += 1;
    }
    length + point_distance(previous, parent.point_at(to))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, n: usize) -> Arc<Trajectory> {
        let coords: Vec<(f64, f64)> = (0..n).map(|i| (i as f64, 0.0)).collect();
        Arc::new(Trajectory::from_xy(id, &coords).unwrap())
    }

    #[test]
    fn test_rejects_single_point() {
        let err = Trajectory::from_xy("a", &[(0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, BundleError::InsufficientPoints { point_count: 1, .. }));
    }

    #[test]
    fn test_reversed_view_maps_indices() {
        let t = line("a", 4);
        let r = t.reversed();
        assert_eq!(r.point(0), point(3.0, 0.0));
        assert_eq!(r.point(3), point(0.0, 0.0));
        assert_eq!(r.reverse(), t.forward());
    }

    #[test]
    fn test_fractional_points() {
        let t = line("a", 4);
        let sub = Subtrajectory::new(t.forward(), 0.5, 2.25).unwrap();
        let pts = sub.points();
        assert_eq!(pts.len(), 4);
        assert!((pts[0].x - 0.5).abs() < 1e-12);
        assert!((pts[3].x - 2.25).abs() < 1e-12);
        assert!((sub.euclidean_length() - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_range() {
        let t = line("a", 3);
        assert!(Subtrajectory::new(t.forward(), 1.5, 1.0).is_err());
        assert!(Subtrajectory::new(t.forward(), 0.0, 2.5).is_err());
        assert!(Subtrajectory::new(t.forward(), -0.1, 1.0).is_err());
    }

    #[test]
    fn test_normalized_reverse() {
        let t = line("a", 5);
        let sub = Subtrajectory::new(t.reversed(), 1.0, 2.5).unwrap();
        let n = sub.normalized();
        assert!(!n.parent().is_reversed());
        assert!((n.from_index() - 1.5).abs() < 1e-12);
        assert!((n.to_index() - 3.0).abs() < 1e-12);
        assert!((n.euclidean_length() - sub.euclidean_length()).abs() < 1e-12);
    }

    #[test]
    fn test_lambda_subtrajectory() {
        let t = line("a", 10);
        let big = Subtrajectory::new(t.forward(), 2.0, 7.0).unwrap();
        let inside = Subtrajectory::new(t.forward(), 3.0, 6.0).unwrap();
        let overhang = Subtrajectory::new(t.forward(), 1.5, 7.5).unwrap();
        assert!(big.has_as_subtrajectory(&inside));
        assert!(!big.has_as_subtrajectory(&overhang));
        assert!(big.has_as_lambda_subtrajectory(&overhang, 1.0));
        assert!(!big.has_as_lambda_subtrajectory(&overhang, 0.9));
    }

    #[test]
    fn test_lambda_subtrajectory_other_parent() {
        let a = line("a", 4);
        let b = line("b", 4);
        let sa = Subtrajectory::full(a.forward());
        let sb = Subtrajectory::full(b.forward());
        assert!(!sa.has_as_lambda_subtrajectory(&sb, 100.0));
    }
}
