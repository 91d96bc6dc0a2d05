//! Discrete and semi-weak Frechet distance over a [`DistanceMatrix`].
//!
//! Both computers are pure functions of the matrix. They return the distance
//! together with the filled DP table so callers can inspect the coupling.
//!
//! ## Semi-weak indexing
//!
//! The semi-weak table interleaves vertices and edges: vertex `i` lives at
//! doubled coordinate `2i`, edge `j` at `2j + 1`. Cells `(e(i), v(j))` hold
//! edge/point distances and cells `(v(i), e(j))` hold point/edge distances.
//! Cells of the form `(v, v)` and `(e, e)` are unused and stay `NaN`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::matrix::DistanceMatrix;
use crate::error::{BundleError, OptionExt, Result};
use crate::geometry::Point;

/// A filled dynamic-programming table, row-major.
#[derive(Debug, Clone)]
pub struct DpTable {
    rows: usize,
    cols: usize,
    cells: Vec<f64>,
}

impl DpTable {
    fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![f64::NAN; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell value; `NaN` for cells the recurrence never writes.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.cols + col]
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        self.cells[row * self.cols + col] = value;
    }
}

/// Result of a Frechet computation.
#[derive(Debug, Clone)]
pub struct FrechetResult {
    pub distance: f64,
    pub table: DpTable,
}

/// A Frechet-style similarity measure evaluated on precomputed distances.
pub trait FrechetDistance: Send + Sync {
    /// Compute the distance between the two polylines behind `matrix`.
    /// Fails when either polyline has fewer than
    /// [`min_points`](Self::min_points) points.
    fn compute(&self, matrix: &DistanceMatrix) -> Result<FrechetResult>;

    /// Variant tag of this computer.
    fn kind(&self) -> FrechetKind;

    /// Fewest points per polyline the recurrence is defined for.
    fn min_points(&self) -> usize;

    /// Convenience wrapper building the matrix first.
    fn distance(&self, a: &[Point], b: &[Point]) -> Result<f64> {
        Ok(self.compute(&DistanceMatrix::new(a, b))?.distance)
    }
}

/// Both polylines behind `matrix` need at least `minimum` points.
fn check_points(matrix: &DistanceMatrix, minimum: usize) -> Result<()> {
    for (label, count) in [("a", matrix.num_points_a()), ("b", matrix.num_points_b())] {
        (count >= minimum)
            .then_some(())
            .ok_or_insufficient_points(label, count, minimum)?;
    }
    Ok(())
}

/// Classic discrete Frechet distance over the vertices only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscreteFrechet;

impl FrechetDistance for DiscreteFrechet {
    fn compute(&self, matrix: &DistanceMatrix) -> Result<FrechetResult> {
        check_points(matrix, self.min_points())?;
        let n = matrix.num_points_a();
        let m = matrix.num_points_b();
        let mut table = DpTable::new(n, m);

        for i in 0..n {
            for j in 0..m {
                let d = matrix.point_distance(i, j);
                let value = match (i, j) {
                    (0, 0) => d,
                    (0, _) => d.max(table.get(0, j - 1)),
                    (_, 0) => d.max(table.get(i - 1, 0)),
                    _ => {
                        let reach = table
                            .get(i - 1, j)
                            .min(table.get(i, j - 1))
                            .min(table.get(i - 1, j - 1));
                        d.max(reach)
                    }
                };
                table.set(i, j, value);
            }
        }

        Ok(FrechetResult {
            distance: table.get(n - 1, m - 1),
            table,
        })
    }

    fn kind(&self) -> FrechetKind {
        FrechetKind::Discrete
    }

    fn min_points(&self) -> usize {
        1
    }
}

/// Semi-weak Frechet distance: vertices of one curve are matched against
/// edges of the other, alternating in both directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemiWeakFrechet;

#[inline]
fn v(i: usize) -> usize {
    2 * i
}

#[inline]
fn e(j: usize) -> usize {
    2 * j + 1
}

impl FrechetDistance for SemiWeakFrechet {
    fn compute(&self, matrix: &DistanceMatrix) -> Result<FrechetResult> {
        // the result reads edge n-2 and edge m-2
        check_points(matrix, self.min_points())?;
        let n = matrix.num_points_a();
        let m = matrix.num_points_b();
        let mut table = DpTable::new(2 * n - 1, 2 * m - 1);

        for i in 0..n {
            for j in 0..m {
                if i + 1 < n {
                    let d = matrix.edge_point_distance(i, j);
                    let value = if j == 0 {
                        d
                    } else {
                        let reach = table.get(v(i), e(j - 1)).min(table.get(e(i), v(j - 1)));
                        d.max(reach)
                    };
                    table.set(e(i), v(j), value);
                }

                if j + 1 < m {
                    let d = matrix.point_edge_distance(i, j);
                    let value = if i == 0 {
                        d
                    } else {
                        let reach = table.get(v(i - 1), e(j)).min(table.get(e(i - 1), v(j)));
                        d.max(reach)
                    };
                    table.set(v(i), e(j), value);
                }
            }
        }

        let distance = table
            .get(v(n - 1), e(m - 2))
            .min(table.get(e(n - 2), v(m - 1)));
        Ok(FrechetResult { distance, table })
    }

    fn kind(&self) -> FrechetKind {
        FrechetKind::SemiWeak
    }

    fn min_points(&self) -> usize {
        2
    }
}

/// Closed set of available Frechet computers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrechetKind {
    /// Vertex-to-vertex coupling.
    #[default]
    Discrete,
    /// Vertex-to-edge coupling with doubled indices.
    SemiWeak,
}

impl FrechetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrechetKind::Discrete => "discrete",
            FrechetKind::SemiWeak => "semi-weak",
        }
    }

    /// Instantiate the computer for this variant.
    pub fn computer(&self) -> Box<dyn FrechetDistance> {
        match self {
            FrechetKind::Discrete => Box::new(DiscreteFrechet),
            FrechetKind::SemiWeak => Box::new(SemiWeakFrechet),
        }
    }

    /// Compute the distance with this variant.
    pub fn compute(&self, matrix: &DistanceMatrix) -> Result<FrechetResult> {
        match self {
            FrechetKind::Discrete => DiscreteFrechet.compute(matrix),
            FrechetKind::SemiWeak => SemiWeakFrechet.compute(matrix),
        }
    }
}

impl fmt::Display for FrechetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrechetKind {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "discrete" => Ok(FrechetKind::Discrete),
            "semi-weak" | "semiweak" | "semi_weak" => Ok(FrechetKind::SemiWeak),
            other => Err(BundleError::InvalidConfig(format!(
                "unknown frechet kind '{other}'"
            ))),
        }
    }
}
