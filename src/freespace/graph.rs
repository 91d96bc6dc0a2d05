//! Labelled free-space graph over the grid edges of a free-space diagram.
//!
//! The diagram has the *column* polyline on the x-axis and the *row* polyline
//! on the y-axis. Every grid edge is a potential vertex:
//!
//! - **vertical** `(c, r)`: column point `c` against row edge `[r, r + 1]`,
//!   free when `point_edge(c, r) <= epsilon`
//! - **horizontal** `(c, r)`: column edge `[c - 1, c]` against row point `r`,
//!   free when `edge_point(c - 1, r) <= epsilon`
//!
//! A free vertex points at up to two predecessors, in the fixed order
//! `[left, bottom]`, and each edge is labelled with the smallest column
//! reachable from its target by a monotone path through free grid edges.
//! A vertical vertex without predecessors reaches its own column.
//!
//! Seams on either axis are edges joining two concatenated trajectories. A
//! vertex never lies on a seam and no path crosses one.
//!
//! Columns live in a sliding window `[graph_min, graph_max]`: they are added
//! at the high end and dropped at the low end, so a full sweep costs
//! O(columns x rows) in total.

use std::collections::{BTreeSet, VecDeque};
use std::ops::RangeInclusive;

use log::trace;

use super::concat::Concatenation;
use super::event::{Event, GridPoint};
use crate::distance::DistanceMatrix;
use crate::geometry::{point_distance, segment_circle_params, Point};
use crate::trajectory::DirectedTrajectory;

/// Orientation of a grid edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A grid edge of the diagram, keyed by integer coordinates.
///
/// Horizontal edges are keyed by the column where they *end*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridEdge {
    pub column: usize,
    pub row: usize,
    pub orientation: Orientation,
}

impl GridEdge {
    pub fn vertical(column: usize, row: usize) -> Self {
        Self {
            column,
            row,
            orientation: Orientation::Vertical,
        }
    }

    /// Horizontal edge spanning columns `[column - 1, column]` at `row`.
    pub fn horizontal(column: usize, row: usize) -> Self {
        Self {
            column,
            row,
            orientation: Orientation::Horizontal,
        }
    }

    pub fn is_vertical(&self) -> bool {
        self.orientation == Orientation::Vertical
    }

    /// x coordinate in the doubled grid (edges sit on odd positions).
    pub fn doubled_x(&self) -> usize {
        match self.orientation {
            Orientation::Vertical => 2 * self.column,
            Orientation::Horizontal => 2 * self.column - 1,
        }
    }

    /// Lowest column touched by this edge.
    pub fn low_x(&self) -> usize {
        match self.orientation {
            Orientation::Vertical => self.column,
            Orientation::Horizontal => self.column - 1,
        }
    }

    /// Highest row touched by this edge.
    pub fn high_y(&self) -> usize {
        match self.orientation {
            Orientation::Vertical => self.row + 1,
            Orientation::Horizontal => self.row,
        }
    }
}

/// Outgoing edge of a free vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelledEdge {
    pub target: GridEdge,
    /// Smallest column reachable through `target`.
    pub label: usize,
    /// Vertical vertex where that smallest-column path starts.
    pub origin: GridEdge,
}

/// A free vertex and its outgoing edges in `[left, bottom]` order.
#[derive(Debug, Clone)]
pub struct Node {
    key: GridEdge,
    edges: [Option<LabelledEdge>; 2],
}

impl Node {
    fn new(key: GridEdge) -> Self {
        Self {
            key,
            edges: [None, None],
        }
    }

    pub fn key(&self) -> GridEdge {
        self.key
    }

    /// Outgoing edges, left before bottom.
    pub fn edges(&self) -> impl DoubleEndedIterator<Item = &LabelledEdge> {
        self.edges.iter().flatten()
    }

    pub fn has_edges(&self) -> bool {
        self.edges().next().is_some()
    }

    /// Edge with the smallest label. Ties prefer the origin on the lowest
    /// row, then the left edge.
    pub fn best_edge(&self) -> Option<&LabelledEdge> {
        self.edges().min_by_key(|e| (e.label, e.origin.row))
    }

    /// Smallest reachable column; a vertical without edges reaches itself.
    pub fn label(&self) -> usize {
        self.best_edge().map_or(self.key.column, |e| e.label)
    }

    /// Start of the smallest-label path.
    pub fn origin(&self) -> GridEdge {
        self.best_edge().map_or(self.key, |e| e.origin)
    }
}

#[derive(Debug, Clone)]
struct Column {
    vertical: Vec<Option<Node>>,
    horizontal: Vec<Option<Node>>,
}

impl Column {
    fn new(rows: usize) -> Self {
        Self {
            vertical: vec![None; rows],
            horizontal: vec![None; rows],
        }
    }
}

/// Edge preference of a backward walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeOrder {
    LeftFirst,
    BottomFirst,
}

/// Fractional span of a cluster curve: representative columns `[s, t]`,
/// concatenated rows `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSpan {
    pub s: usize,
    pub t: usize,
    pub from: f64,
    pub to: f64,
}

/// Labelled free-space graph with a sliding column window.
#[derive(Debug, Clone)]
pub struct FreeSpaceGraph {
    columns: Vec<Point>,
    rows: Vec<Point>,
    matrix: DistanceMatrix,
    epsilon: f64,
    column_seams: BTreeSet<usize>,
    row_seams: BTreeSet<usize>,
    window: VecDeque<Column>,
    graph_min: usize,
    endpoints: BTreeSet<GridEdge>,
}

impl FreeSpaceGraph {
    /// Create an empty graph. `column_seams` / `row_seams` hold every `c` for
    /// which edge `[c, c + 1]` of the respective axis is a seam.
    pub fn new(
        columns: Vec<Point>,
        rows: Vec<Point>,
        epsilon: f64,
        column_seams: BTreeSet<usize>,
        row_seams: BTreeSet<usize>,
    ) -> Self {
        let matrix = DistanceMatrix::new(&columns, &rows);
        Self {
            columns,
            rows,
            matrix,
            epsilon,
            column_seams,
            row_seams,
            window: VecDeque::new(),
            graph_min: 0,
            endpoints: BTreeSet::new(),
        }
    }

    /// Graph of one representative (columns) against a concatenation of
    /// candidates (rows).
    pub fn for_representative(representative: &DirectedTrajectory, rows: &Concatenation, epsilon: f64) -> Self {
        Self::new(
            representative.points().collect(),
            rows.points().to_vec(),
            epsilon,
            BTreeSet::new(),
            rows.seams(),
        )
    }

    /// Graph of a concatenation against itself, with seams on both axes.
    pub fn self_product(concat: &Concatenation, epsilon: f64) -> Self {
        let seams = concat.seams();
        Self::new(
            concat.points().to_vec(),
            concat.points().to_vec(),
            epsilon,
            seams.clone(),
            seams,
        )
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn matrix(&self) -> &DistanceMatrix {
        &self.matrix
    }

    /// Lowest column in the window.
    pub fn graph_min(&self) -> usize {
        self.graph_min
    }

    /// Highest column in the window, `None` while the window is empty.
    pub fn graph_max(&self) -> Option<usize> {
        (!self.window.is_empty()).then(|| self.graph_min + self.window.len() - 1)
    }

    fn next_column(&self) -> usize {
        self.graph_min + self.window.len()
    }

    /// Whether row `r` starts or ends a concatenated block.
    fn is_block_boundary_row(&self, r: usize) -> bool {
        r == 0 || r + 1 == self.rows.len() || self.row_seams.contains(&r) || self.row_seams.contains(&(r - 1))
    }

    /// Whether the grid edge is free at this epsilon and not on a seam.
    pub fn is_free(&self, edge: GridEdge) -> bool {
        let (c, r) = (edge.column, edge.row);
        if c >= self.columns.len() || r >= self.rows.len() {
            return false;
        }
        match edge.orientation {
            Orientation::Vertical => {
                r + 1 < self.rows.len()
                    && !self.row_seams.contains(&r)
                    && self.matrix.point_edge_distance(c, r) <= self.epsilon
            }
            Orientation::Horizontal => {
                c >= 1
                    && !self.column_seams.contains(&(c - 1))
                    && self.matrix.edge_point_distance(c - 1, r) <= self.epsilon
            }
        }
    }

    /// The vertex for a grid edge, if it is free and inside the window.
    pub fn node(&self, edge: GridEdge) -> Option<&Node> {
        let offset = edge.column.checked_sub(self.graph_min)?;
        let column = self.window.get(offset)?;
        let slot = match edge.orientation {
            Orientation::Vertical => column.vertical.get(edge.row)?,
            Orientation::Horizontal => column.horizontal.get(edge.row)?,
        };
        slot.as_ref()
    }

    /// Label of a vertex, if present.
    pub fn label(&self, edge: GridEdge) -> Option<usize> {
        self.node(edge).map(Node::label)
    }

    /// Vertices that are not the target of any edge.
    pub fn endpoints(&self) -> impl Iterator<Item = &GridEdge> {
        self.endpoints.iter()
    }

    fn edge_to_vertical(&self, target: GridEdge) -> Option<LabelledEdge> {
        let node = self.node(target)?;
        Some(LabelledEdge {
            target,
            label: node.label(),
            origin: node.origin(),
        })
    }

    fn edge_to_horizontal(&self, target: GridEdge) -> Option<LabelledEdge> {
        let best = self.node(target)?.best_edge()?;
        Some(LabelledEdge {
            target,
            label: best.label,
            origin: best.origin,
        })
    }

    fn link(&mut self, source: GridEdge, edges: &[Option<LabelledEdge>; 2]) {
        for edge in edges.iter().flatten() {
            self.endpoints.remove(&edge.target);
            self.endpoints.insert(source);
        }
    }

    /// Extend the window by one column at the high end. Returns `false` when
    /// every column has already been added.
    pub fn add_column(&mut self) -> bool {
        let c = self.next_column();
        if c >= self.columns.len() {
            return false;
        }
        let rows = self.rows.len();
        self.window.push_back(Column::new(rows));
        let slot = self.window.len() - 1;

        for r in 0..rows {
            let horizontal = GridEdge::horizontal(c, r);
            if !self.is_block_boundary_row(r) && self.is_free(horizontal) {
                let mut node = Node::new(horizontal);
                node.edges[0] = self.edge_to_vertical(GridEdge::vertical(c - 1, r - 1));
                if !self.row_seams.contains(&(r - 1)) {
                    node.edges[1] = self.edge_to_horizontal(GridEdge::horizontal(c, r - 1));
                }
                self.link(horizontal, &node.edges);
                self.window[slot].horizontal[r] = Some(node);
            }

            let vertical = GridEdge::vertical(c, r);
            if self.is_free(vertical) {
                let mut node = Node::new(vertical);
                if c >= 1 && !self.column_seams.contains(&(c - 1)) {
                    node.edges[0] = self.edge_to_vertical(GridEdge::vertical(c - 1, r));
                }
                if c >= 1 {
                    node.edges[1] = self.edge_to_horizontal(GridEdge::horizontal(c, r));
                }
                self.link(vertical, &node.edges);
                self.window[slot].vertical[r] = Some(node);
            }
        }
        trace!("[FreeSpace] added column {c}");
        true
    }

    /// Add every remaining column.
    pub fn add_all_columns(&mut self) {
        while self.add_column() {}
    }

    /// Drop the lowest column of the window. Returns `false` when the window
    /// is empty.
    pub fn remove_column(&mut self) -> bool {
        if self.window.pop_front().is_none() {
            return false;
        }
        let removed = self.graph_min;
        self.endpoints.retain(|e| e.column != removed);
        self.graph_min += 1;
        trace!("[FreeSpace] removed column {removed}");
        true
    }

    /// Find where a cluster curve from column `s` to column `t`, ending at
    /// row `yt`, starts.
    ///
    /// The walk begins at the vertical edge ending in `(t, yt)` and follows
    /// edges whose label is at most `s`. Away from forbidden rows it takes
    /// the largest such label (bottom first on ties), next to a forbidden
    /// row range the smallest (left first). Returns the row of the vertical
    /// edge reached at column `s`.
    pub fn find_start(
        &self,
        s: usize,
        t: usize,
        yt: usize,
        forbidden: &[RangeInclusive<usize>],
    ) -> Option<usize> {
        let mut current = GridEdge::vertical(t, yt.checked_sub(1)?);
        loop {
            let node = self.node(current)?;
            let upper = current.high_y();
            let lower = upper.saturating_sub(1);
            let near_forbidden = forbidden
                .iter()
                .any(|range| *range.start() <= upper && lower <= *range.end());

            let candidates = node.edges().filter(|e| e.label <= s);
            let chosen = if near_forbidden {
                candidates.min_by_key(|e| e.label)
            } else {
                candidates.max_by_key(|e| e.label)
            }?;

            let target = chosen.target;
            if target.is_vertical() && target.column == s {
                return Some(target.row);
            }
            if target.column < s {
                return None;
            }
            current = target;
        }
    }

    /// Collect start and end events for every maximal path ending in an
    /// endpoint, sorted and deduplicated.
    pub fn collect_events(&self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.endpoints.len() * 2);
        for &endpoint in &self.endpoints {
            let Some(vertical) = self.first_vertical(endpoint) else {
                continue;
            };
            let Some(best) = self.node(vertical).and_then(Node::best_edge) else {
                continue;
            };
            let start = GridPoint::new(best.origin.column, best.origin.row);
            let end = GridPoint::new(vertical.column, vertical.row + 1);
            events.push(Event::start(start, end));
            events.push(Event::end(start, end));
        }
        events.sort();
        events.dedup();
        events
    }

    /// Follow first edges from `edge` until a vertical vertex is reached.
    fn first_vertical(&self, mut edge: GridEdge) -> Option<GridEdge> {
        while !edge.is_vertical() {
            edge = self.node(edge)?.edges().next()?.target;
        }
        Some(edge)
    }

    /// Walk back from `edge` while it lies right of column `bound`, taking
    /// the first edge in `order` whose origin lies at or left of column
    /// `lower`.
    fn backpass(&self, mut edge: GridEdge, lower: usize, bound: usize, order: EdgeOrder) -> Option<GridEdge> {
        let admissible = |e: &&LabelledEdge| e.origin.column <= lower;
        while edge.doubled_x() > 2 * bound {
            let mut edges = self.node(edge)?.edges();
            let next = match order {
                EdgeOrder::LeftFirst => edges.find(admissible),
                EdgeOrder::BottomFirst => edges.rev().find(admissible),
            };
            edge = next?.target;
        }
        Some(edge)
    }

    /// Trim the path ending at event point `end` to the representative range
    /// `[s, t]` and return the matching fractional row span.
    ///
    /// Returns `None` for degenerate or unreachable spans.
    pub fn trimmed_span(&self, s: usize, t: usize, end: GridPoint) -> Option<CurveSpan> {
        if end.x < t {
            return None;
        }
        let start = GridEdge::vertical(end.x, end.y.checked_sub(1)?);
        // The first pass keeps the end high while moving to column t. The
        // second pass descends bottom first so the start lands on the lowest
        // reachable row at column s.
        let upper = self.backpass(start, s, t, EdgeOrder::LeftFirst)?;
        let lower = self.backpass(upper, s, s, EdgeOrder::BottomFirst)?;

        let (from, to) = self.subtrajectory_bounds(lower.low_x(), upper.low_x(), lower.row, upper.high_y())?;
        (from <= to).then_some(CurveSpan {
            s: lower.low_x(),
            t: upper.low_x(),
            from,
            to,
        })
    }

    /// Fractional row bounds of a cluster curve from `(s, ys)` to `(t, yt)`:
    /// a row end that lies farther than epsilon from its column point is cut
    /// where the row edge enters the epsilon disc.
    pub fn subtrajectory_bounds(&self, s: usize, t: usize, ys: usize, yt: usize) -> Option<(f64, f64)> {
        if s >= self.columns.len() || t >= self.columns.len() || yt >= self.rows.len() || ys > yt {
            return None;
        }

        let from = if self.matrix.point_distance(s, ys) <= self.epsilon || ys + 1 >= self.rows.len() {
            ys as f64
        } else {
            let params = segment_circle_params(self.rows[ys], self.rows[ys + 1], self.columns[s], self.epsilon);
            ys as f64 + params.first().copied().unwrap_or(0.0)
        };

        let to = if self.matrix.point_distance(t, yt) <= self.epsilon || yt == 0 {
            yt as f64
        } else {
            let params = segment_circle_params(self.rows[yt - 1], self.rows[yt], self.columns[t], self.epsilon);
            (yt - 1) as f64 + params.last().copied().unwrap_or(1.0)
        };

        Some((from, to))
    }

    /// Distance between column point `c` and row point `r`.
    pub fn point_distance(&self, c: usize, r: usize) -> f64 {
        point_distance(self.columns[c], self.rows[r])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point;

    fn line(y: f64, n: usize) -> Vec<Point> {
        (0..n).map(|i| point(i as f64, y)).collect()
    }

    #[test]
    fn test_free_vertices() {
        let graph = FreeSpaceGraph::new(line(0.0, 3), line(1.0, 3), 1.0, BTreeSet::new(), BTreeSet::new());
        assert!(graph.is_free(GridEdge::vertical(0, 0)));
        assert!(!graph.is_free(GridEdge::vertical(0, 1)));
        assert!(graph.is_free(GridEdge::horizontal(1, 1)));
        assert!(!graph.is_free(GridEdge::horizontal(0, 1)));
        assert!(!graph.is_free(GridEdge::vertical(0, 2)));
    }

    #[test]
    fn test_labels_propagate_left() {
        let mut graph = FreeSpaceGraph::new(line(0.0, 4), line(0.5, 4), 1.0, BTreeSet::new(), BTreeSet::new());
        graph.add_all_columns();
        assert_eq!(graph.graph_max(), Some(3));
        assert_eq!(graph.label(GridEdge::vertical(0, 0)), Some(0));
        assert_eq!(graph.label(GridEdge::vertical(3, 2)), Some(0));
        assert_eq!(graph.label(GridEdge::horizontal(2, 1)), Some(0));
    }

    #[test]
    fn test_sliding_window() {
        let mut graph = FreeSpaceGraph::new(line(0.0, 3), line(0.0, 3), 0.5, BTreeSet::new(), BTreeSet::new());
        assert!(graph.add_column());
        assert!(graph.add_column());
        assert!(graph.remove_column());
        assert_eq!(graph.graph_min(), 1);
        assert_eq!(graph.graph_max(), Some(1));
        assert!(graph.node(GridEdge::vertical(0, 0)).is_none());
        assert!(graph.add_column());
        assert!(!graph.add_column());
        assert!(graph.remove_column());
        assert!(graph.remove_column());
        assert!(!graph.remove_column());
        assert_eq!(graph.graph_max(), None);
    }

    #[test]
    fn test_seam_blocks_vertices_and_paths() {
        // rows: two 2-point blocks, seam after row 1
        let rows = vec![point(0.0, 0.0), point(1.0, 0.0), point(0.0, 0.0), point(1.0, 0.0)];
        let seams: BTreeSet<usize> = [1].into_iter().collect();
        let graph = FreeSpaceGraph::new(line(0.0, 2), rows, 0.5, BTreeSet::new(), seams);
        assert!(graph.is_free(GridEdge::vertical(0, 0)));
        assert!(!graph.is_free(GridEdge::vertical(0, 1)));
        assert!(graph.is_free(GridEdge::vertical(0, 2)));
    }

    #[test]
    fn test_find_start_diagonal() {
        let mut graph = FreeSpaceGraph::new(line(0.0, 4), line(0.5, 4), 1.0, BTreeSet::new(), BTreeSet::new());
        graph.add_all_columns();
        assert_eq!(graph.find_start(0, 3, 3, &[]), Some(0));
        // bottom-first descent reaches column 1 on its lowest free row
        assert_eq!(graph.find_start(1, 3, 3, &[]), Some(0));
    }

    #[test]
    fn test_find_start_unreachable() {
        let mut graph = FreeSpaceGraph::new(line(0.0, 3), line(5.0, 3), 1.0, BTreeSet::new(), BTreeSet::new());
        graph.add_all_columns();
        assert_eq!(graph.find_start(0, 2, 2, &[]), None);
        assert_eq!(graph.find_start(0, 2, 0, &[]), None);
    }

    #[test]
    fn test_trimmed_span_partial_start() {
        // row point 0 lies outside the disc around column point 0, so the
        // span starts part way along row edge 0
        let columns = vec![point(0.0, 0.0), point(2.0, 0.0)];
        let rows = vec![point(-1.0, 0.5), point(1.0, 0.5), point(2.0, 0.5)];
        let mut graph = FreeSpaceGraph::new(columns, rows, 0.75, BTreeSet::new(), BTreeSet::new());
        graph.add_all_columns();
        let span = graph.trimmed_span(0, 1, GridPoint::new(1, 2)).unwrap();
        assert_eq!((span.s, span.t), (0, 1));
        // row edge 0 enters the 0.75 disc around (0,0) at x = -0.5590..
        assert!(span.from > 0.0 && span.from < 0.5);
        assert!((span.to - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_trimmed_span_self_match() {
        // a line against itself: the start must reach row 0, not row 1
        let mut graph = FreeSpaceGraph::new(line(0.0, 3), line(0.0, 3), 1.0, BTreeSet::new(), BTreeSet::new());
        graph.add_all_columns();
        let span = graph.trimmed_span(0, 2, GridPoint::new(2, 2)).unwrap();
        assert_eq!((span.s, span.t), (0, 2));
        assert_eq!(span.from, 0.0);
        assert_eq!(span.to, 2.0);
        assert_eq!(
            graph.backpass(GridEdge::vertical(2, 1), 0, 0, EdgeOrder::LeftFirst),
            Some(GridEdge::vertical(0, 1))
        );
        assert_eq!(
            graph.backpass(GridEdge::vertical(2, 1), 0, 0, EdgeOrder::BottomFirst),
            Some(GridEdge::vertical(0, 0))
        );
    }
}
