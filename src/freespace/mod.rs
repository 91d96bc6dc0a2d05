//! Free-space diagrams as labelled graphs.
//!
//! - [`concat`]: trajectories laid end to end on one index axis
//! - [`graph`]: the labelled grid-edge graph with its sliding column window
//! - [`event`]: interval events consumed by the sweep-line extractors

pub mod concat;
pub mod event;
pub mod graph;

pub use concat::{Block, Concatenation};
pub use event::{Event, GridPoint};
pub use graph::{CurveSpan, FreeSpaceGraph, GridEdge, LabelledEdge, Node, Orientation};
