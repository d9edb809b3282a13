//! Common test helpers for model and tracking integration tests

#![allow(dead_code)]

use cmcf_track::model::{LinearProgram, RowSense};
use cmcf_track::types::node::NodeKind;
use cmcf_track::types::region::{CellRegion, Frame, ImageShape};
use cmcf_track::{Result, TrackingError};
use rand::Rng;

/// Image extent shared by all scenarios.
pub const IMAGE: ImageShape = ImageShape::new(100.0, 100.0);

/// Creates a frame from `(x, y, area)` triples.
pub fn make_frame(cells: &[(f64, f64, f64)]) -> Frame {
    Frame::new(
        cells
            .iter()
            .map(|&(x, y, area)| CellRegion::new(x, y, area))
            .collect(),
        IMAGE,
    )
}

/// Creates a frame of `n` cells placed uniformly inside the image.
pub fn random_frame<R: Rng>(rng: &mut R, n: usize) -> Frame {
    Frame::new(
        (0..n)
            .map(|_| {
                CellRegion::new(
                    rng.random_range(5.0..95.0),
                    rng.random_range(5.0..95.0),
                    rng.random_range(50.0..400.0),
                )
            })
            .collect(),
        IMAGE,
    )
}

/// Columns of `program` whose nonzero rows match `entries` exactly.
pub fn find_columns(program: &LinearProgram, entries: &[(NodeKind, i8)]) -> Vec<usize> {
    let incidence = program.incidence();
    let mut wanted: Vec<(usize, i8)> = entries
        .iter()
        .map(|&(kind, value)| (incidence.row_of(kind).expect("vertex has a row"), value))
        .collect();
    wanted.sort();
    (0..program.num_variables())
        .filter(|&c| incidence.column_entries(c) == wanted)
        .collect()
}

// ============================================================================
// Exhaustive Solver
// ============================================================================

/// Exact minimum-cost solver for small programs.
///
/// Branches on the first unmet equality row over the columns that serve it,
/// then tops up inequality rows with columns touching no equality row (the
/// `A -> D` conduit replicas, which A's supply requires). Every row of the
/// programs built by the crate has entries of a single sign, so a partial
/// selection that leaves the hull of 0 and a row's admissible range can be cut.
pub fn exhaustive_solver(program: &LinearProgram) -> Result<Vec<bool>> {
    let incidence = program.incidence();
    let bounds: Vec<(i64, i64)> = program
        .flow()
        .iter()
        .zip(program.senses())
        .map(|(&b, &sense)| sense.bounds(b))
        .collect();
    let exact: Vec<bool> = program
        .senses()
        .iter()
        .map(|&sense| sense == RowSense::Equal)
        .collect();
    let columns: Vec<Vec<(usize, i64)>> = (0..program.num_variables())
        .map(|c| {
            incidence
                .column_entries(c)
                .into_iter()
                .map(|(row, value)| (row, i64::from(value)))
                .collect()
        })
        .collect();
    let free: Vec<bool> = columns
        .iter()
        .map(|entries| entries.iter().all(|&(row, _)| !exact[row]))
        .collect();

    let mut search = Search {
        costs: program.costs().to_vec(),
        bounds,
        exact,
        free,
        net: vec![0; program.num_constraints()],
        chosen: vec![false; program.num_variables()],
        cost: 0,
        best: None,
        columns,
    };
    search.cover();

    search
        .best
        .map(|(_, selection)| selection)
        .ok_or_else(|| TrackingError::NoSolution {
            reason: "no feasible selection".into(),
        })
}

struct Search {
    columns: Vec<Vec<(usize, i64)>>,
    costs: Vec<u64>,
    bounds: Vec<(i64, i64)>,
    exact: Vec<bool>,
    free: Vec<bool>,
    net: Vec<i64>,
    chosen: Vec<bool>,
    cost: u64,
    best: Option<(u64, Vec<bool>)>,
}

impl Search {
    fn bounded(&self) -> bool {
        matches!(&self.best, Some((best, _)) if self.cost >= *best)
    }

    /// A column may be added if no touched row leaves the hull of 0 and its range.
    fn admissible(&self, col: usize) -> bool {
        !self.chosen[col]
            && self.columns[col].iter().all(|&(row, value)| {
                let (low, high) = self.bounds[row];
                let next = self.net[row] + value;
                low.min(0) <= next && next <= high.max(0)
            })
    }

    fn toggle(&mut self, col: usize, on: bool) {
        let sign = if on { 1 } else { -1 };
        for &(row, value) in &self.columns[col] {
            self.net[row] += sign * value;
        }
        self.chosen[col] = on;
        if on {
            self.cost += self.costs[col];
        } else {
            self.cost -= self.costs[col];
        }
    }

    fn cover(&mut self) {
        if self.bounded() {
            return;
        }
        let unmet = (0..self.net.len())
            .find(|&row| self.exact[row] && self.net[row] != self.bounds[row].0);
        let Some(row) = unmet else {
            self.top_up(0);
            return;
        };
        for col in 0..self.columns.len() {
            if self.columns[col].iter().any(|&(r, _)| r == row) && self.admissible(col) {
                self.toggle(col, true);
                self.cover();
                self.toggle(col, false);
            }
        }
    }

    fn top_up(&mut self, start: usize) {
        if self.bounded() {
            return;
        }
        let satisfied = self
            .net
            .iter()
            .zip(&self.bounds)
            .all(|(&net, &(low, high))| low <= net && net <= high);
        if satisfied {
            self.best = Some((self.cost, self.chosen.clone()));
            return;
        }
        for col in start..self.columns.len() {
            if self.free[col] && self.admissible(col) {
                self.toggle(col, true);
                self.top_up(col + 1);
                self.toggle(col, false);
            }
        }
    }
}
