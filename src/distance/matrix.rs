//! Precomputed distances between the points and edges of two polylines.
//!
//! All three tables are filled once at construction and never mutated. The
//! Frechet recurrences and the free-space graph read from them in O(1).

use crate::geometry::{point_distance, point_segment_distance, Point};
use crate::trajectory::Trajectory;

/// Dense distance tables for a pair of polylines `A` (n points) and `B`
/// (m points).
///
/// - `point_distance(i, j)`: point `i` of A to point `j` of B
/// - `point_edge_distance(i, j)`: point `i` of A to edge `j` of B
/// - `edge_point_distance(i, j)`: edge `i` of A to point `j` of B
///
/// Out-of-range indices panic: they are programming errors, not input errors.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    n: usize,
    m: usize,
    point_point: Vec<f64>,
    point_edge: Vec<f64>,
    edge_point: Vec<f64>,
}

impl DistanceMatrix {
    /// Build the tables in O(n·m) time and space.
    pub fn new(a: &[Point], b: &[Point]) -> Self {
        let n = a.len();
        let m = b.len();

        let mut point_point = Vec::with_capacity(n * m);
        for &p in a {
            point_point.extend(b.iter().map(|&q| point_distance(p, q)));
        }

        let mut point_edge = Vec::with_capacity(n * m.saturating_sub(1));
        for &p in a {
            point_edge.extend(b.windows(2).map(|e| point_segment_distance(p, e[0], e[1])));
        }

        let mut edge_point = Vec::with_capacity(n.saturating_sub(1) * m);
        for e in a.windows(2) {
            edge_point.extend(b.iter().map(|&q| point_segment_distance(q, e[0], e[1])));
        }

        Self {
            n,
            m,
            point_point,
            point_edge,
            edge_point,
        }
    }

    /// Build the tables for two trajectories.
    pub fn between(a: &Trajectory, b: &Trajectory) -> Self {
        Self::new(a.points(), b.points())
    }

    /// Number of points of the first polyline.
    pub fn num_points_a(&self) -> usize {
        self.n
    }

    /// Number of points of the second polyline.
    pub fn num_points_b(&self) -> usize {
        self.m
    }

    pub fn num_edges_a(&self) -> usize {
        self.n.saturating_sub(1)
    }

    pub fn num_edges_b(&self) -> usize {
        self.m.saturating_sub(1)
    }

    pub fn point_distance(&self, i: usize, j: usize) -> f64 {
        assert!(
            i < self.n && j < self.m,
            "point index ({i}, {j}) out of range ({}, {})",
            self.n,
            self.m
        );
        self.point_point[i * self.m + j]
    }

    pub fn point_edge_distance(&self, i: usize, j: usize) -> f64 {
        let edges = self.num_edges_b();
        assert!(
            i < self.n && j < edges,
            "point/edge index ({i}, {j}) out of range ({}, {edges})",
            self.n
        );
        self.point_edge[i * edges + j]
    }

    pub fn edge_point_distance(&self, i: usize, j: usize) -> f64 {
        assert!(
            i < self.num_edges_a() && j < self.m,
            "edge/point index ({i}, {j}) out of range ({}, {})",
            self.num_edges_a(),
            self.m
        );
        self.edge_point[i * self.m + j]
    }
}
