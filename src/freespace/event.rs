//! Sweep events derived from a free-space graph.

use std::cmp::Ordering;
use std::fmt;

/// An integer position in the free-space diagram: `x` indexes the
/// representative (columns), `y` the concatenated candidates (rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPoint {
    pub x: usize,
    pub y: usize,
}

impl GridPoint {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Opening or closing of a maximal reachable interval for one row block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Event {
    pub start: GridPoint,
    pub end: GridPoint,
    pub is_start: bool,
}

impl Event {
    pub fn start(start: GridPoint, end: GridPoint) -> Self {
        Self {
            start,
            end,
            is_start: true,
        }
    }

    pub fn end(start: GridPoint, end: GridPoint) -> Self {
        Self {
            start,
            end,
            is_start: false,
        }
    }

    /// Sweep position: start x for start events, end x for end events.
    pub fn primary_index(&self) -> usize {
        if self.is_start {
            self.start.x
        } else {
            self.end.x
        }
    }

    /// The other x coordinate.
    pub fn secondary_index(&self) -> usize {
        if self.is_start {
            self.end.x
        } else {
            self.start.x
        }
    }

    /// Vertical extent of the interval.
    pub fn height(&self) -> usize {
        self.end.y.saturating_sub(self.start.y)
    }
}

impl Ord for Event {
    /// Primary index, then starts before ends, then secondary index, then
    /// height, then end row, then start row.
    fn cmp(&self, other: &Self) -> Ordering {
        self.primary_index()
            .cmp(&other.primary_index())
            .then_with(|| other.is_start.cmp(&self.is_start))
            .then_with(|| self.secondary_index().cmp(&other.secondary_index()))
            .then_with(|| self.height().cmp(&other.height()))
            .then_with(|| self.end.y.cmp(&other.end.y))
            .then_with(|| self.start.y.cmp(&other.start.y))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: usize, y: usize) -> GridPoint {
        GridPoint::new(x, y)
    }

    #[test]
    fn test_start_before_end_at_same_index() {
        let closing = Event::end(p(0, 0), p(3, 2));
        let opening = Event::start(p(3, 5), p(6, 7));
        assert!(opening < closing);
    }

    #[test]
    fn test_tie_breaks() {
        let short = Event::start(p(1, 0), p(4, 1));
        let tall = Event::start(p(1, 0), p(4, 3));
        let farther = Event::start(p(1, 0), p(5, 1));
        let mut events = vec![farther, tall, short];
        events.sort();
        assert_eq!(events, vec![short, tall, farther]);
    }
}
