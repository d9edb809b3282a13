//! Binary linear program assembly
//!
//! Minimize `cᵀx` subject to `Ax {=, ≤} b`, `x ∈ {0, 1}ⁿ`.

use log::debug;
use nalgebra::DMatrix;

use crate::cost::Cost;
use crate::graph::CostGraph;
use crate::types::node::NodeKind;
use crate::{Result, TrackingError};

use super::costs::cost_vector;
use super::coupling::{couple, CoupledIncidence};

/// Comparison applied to one constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSense {
    /// Net flow must equal `b` exactly (L and R rows)
    Equal,
    /// Net flow must not exceed `b` (A and D rows)
    ///
    /// Every column leaves A and enters D, so A (with `b = -#R`) must send at
    /// least `#R` units and D (with `b = #L`) may absorb at most `#L`.
    AtMost,
}

impl RowSense {
    /// Inclusive range of net flow a row with requirement `b` admits.
    ///
    /// `AtMost` rows are unbounded below, reported as `i64::MIN`.
    pub fn bounds(self, b: i64) -> (i64, i64) {
        match self {
            RowSense::Equal => (b, b),
            RowSense::AtMost => (i64::MIN, b),
        }
    }

    /// Returns true if a row with requirement `b` admits net flow `value`.
    pub fn admits(self, value: i64, b: i64) -> bool {
        let (low, high) = self.bounds(b);
        (low..=high).contains(&value)
    }
}

/// Net flow each surviving vertex must source (negative) or sink (positive).
///
/// Every L cell supplies one unit and every R cell demands one; A supplies at
/// least one unit per R cell and D absorbs at most one unit per L cell, so the
/// entries always sum to zero.
pub fn flow_vector(vertices: &[NodeKind]) -> Result<Vec<i64>> {
    let count = |pred: fn(&NodeKind) -> bool| vertices.iter().filter(|k| pred(k)).count() as i64;
    let num_previous = count(|k| matches!(k, NodeKind::Previous(_)));
    let num_current = count(|k| matches!(k, NodeKind::Current(_)));

    vertices
        .iter()
        .map(|kind| match kind {
            NodeKind::Previous(_) => Ok(-1),
            NodeKind::Current(_) => Ok(1),
            NodeKind::Appear => Ok(-num_current),
            NodeKind::Disappear => Ok(num_previous),
            event => Err(TrackingError::inconsistency(format!(
                "event vertex {event} has no flow requirement"
            ))),
        })
        .collect()
}

/// Row senses aligned with `vertices`.
pub fn row_senses(vertices: &[NodeKind]) -> Result<Vec<RowSense>> {
    vertices
        .iter()
        .map(|kind| match kind {
            NodeKind::Previous(_) | NodeKind::Current(_) => Ok(RowSense::Equal),
            NodeKind::Appear | NodeKind::Disappear => Ok(RowSense::AtMost),
            event => Err(TrackingError::inconsistency(format!(
                "event vertex {event} has no constraint row"
            ))),
        })
        .collect()
}

// ============================================================================
// Linear Program
// ============================================================================

/// The binary linear program handed to a solver.
///
/// Rows of the matrix, `flow` and `senses` follow
/// [`CoupledIncidence::vertices`]; columns of the matrix follow `costs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearProgram {
    incidence: CoupledIncidence,
    flow: Vec<i64>,
    costs: Vec<Cost>,
    senses: Vec<RowSense>,
}

impl LinearProgram {
    /// Couples `graph` and derives the flow and cost vectors.
    pub fn assemble(graph: &CostGraph) -> Result<Self> {
        let incidence = couple(graph)?;
        let flow = flow_vector(incidence.vertices())?;
        let senses = row_senses(incidence.vertices())?;
        let costs = cost_vector(graph, &incidence)?;

        debug!(
            "assembled program: {} constraints, {} variables",
            incidence.num_rows(),
            incidence.num_columns()
        );

        Ok(Self {
            incidence,
            flow,
            costs,
            senses,
        })
    }

    #[inline]
    pub fn incidence(&self) -> &CoupledIncidence {
        &self.incidence
    }

    /// Vertex labels aligned with the rows.
    #[inline]
    pub fn vertices(&self) -> &[NodeKind] {
        self.incidence.vertices()
    }

    /// Flow requirement `b`, one entry per row.
    #[inline]
    pub fn flow(&self) -> &[i64] {
        &self.flow
    }

    /// Cost `c`, one entry per column.
    #[inline]
    pub fn costs(&self) -> &[Cost] {
        &self.costs
    }

    #[inline]
    pub fn senses(&self) -> &[RowSense] {
        &self.senses
    }

    /// Number of binary decision variables (columns).
    #[inline]
    pub fn num_variables(&self) -> usize {
        self.incidence.num_columns()
    }

    /// Number of constraint rows.
    #[inline]
    pub fn num_constraints(&self) -> usize {
        self.incidence.num_rows()
    }

    /// Real-valued constraint matrix for solvers working in floating point.
    pub fn real_matrix(&self) -> DMatrix<f64> {
        self.incidence.to_real()
    }

    /// Total cost of the selected columns.
    pub fn objective(&self, selection: &[bool]) -> Cost {
        self.costs
            .iter()
            .zip(selection)
            .filter(|&(_, &chosen)| chosen)
            .map(|(&c, _)| c)
            .sum()
    }

    /// Net flow per row produced by a selection.
    pub fn net_flow(&self, selection: &[bool]) -> Vec<i64> {
        let matrix = self.incidence.matrix();
        let mut net = vec![0i64; matrix.nrows()];
        for (col, _) in selection.iter().enumerate().filter(|&(_, &chosen)| chosen) {
            for (row, &value) in matrix.column(col).iter().enumerate() {
                net[row] += i64::from(value);
            }
        }
        net
    }

    /// Returns true if `selection` satisfies every row constraint.
    pub fn is_feasible(&self, selection: &[bool]) -> bool {
        selection.len() == self.num_variables()
            && self
                .net_flow(selection)
                .iter()
                .zip(&self.flow)
                .zip(&self.senses)
                .all(|((&value, &b), &sense)| sense.admits(value, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackingConfig;
    use crate::graph::GraphBuilder;
    use crate::types::region::{CellRegion, Frame, ImageShape};

    fn frame(cells: &[(f64, f64, f64)]) -> Frame {
        Frame::new(
            cells.iter().map(|&(x, y, a)| CellRegion::new(x, y, a)).collect(),
            ImageShape::new(100.0, 100.0),
        )
    }

    fn select(program: &LinearProgram, columns: &[Vec<(NodeKind, i8)>]) -> Vec<bool> {
        let incidence = program.incidence();
        let wanted: Vec<Vec<(usize, i8)>> = columns
            .iter()
            .map(|entries| {
                let mut rows: Vec<_> = entries
                    .iter()
                    .map(|&(k, v)| (incidence.row_of(k).unwrap(), v))
                    .collect();
                rows.sort();
                rows
            })
            .collect();
        let mut remaining = wanted.clone();
        (0..program.num_variables())
            .map(|c| {
                let entries = incidence.column_entries(c);
                match remaining.iter().position(|w| *w == entries) {
                    Some(i) => {
                        remaining.remove(i);
                        true
                    }
                    None => false,
                }
            })
            .collect()
    }

    #[test]
    fn test_flow_vector() {
        let vertices = [
            NodeKind::Previous(0),
            NodeKind::Previous(1),
            NodeKind::Previous(2),
            NodeKind::Current(0),
            NodeKind::Current(1),
            NodeKind::Appear,
            NodeKind::Disappear,
        ];
        let b = flow_vector(&vertices).unwrap();
        assert_eq!(b, vec![-1, -1, -1, 1, 1, -2, 3]);
        assert_eq!(b.iter().sum::<i64>(), 0);

        let senses = row_senses(&vertices).unwrap();
        assert_eq!(senses[0], RowSense::Equal);
        assert_eq!(senses[5], RowSense::AtMost);

        assert!(flow_vector(&[NodeKind::split(0, 1)]).is_err());
        assert!(row_senses(&[NodeKind::merge(0, 1)]).is_err());
    }

    #[test]
    fn test_row_sense_bounds() {
        assert_eq!(RowSense::Equal.bounds(-1), (-1, -1));
        assert_eq!(RowSense::AtMost.bounds(-3), (i64::MIN, -3));
        assert_eq!(RowSense::AtMost.bounds(2), (i64::MIN, 2));
        assert!(RowSense::AtMost.admits(1, 2));
        assert!(RowSense::AtMost.admits(-1, 2));
        assert!(!RowSense::AtMost.admits(3, 2));
        assert!(RowSense::AtMost.admits(-4, -3));
        assert!(!RowSense::AtMost.admits(0, -3));
        assert!(!RowSense::Equal.admits(0, 1));
    }

    #[test]
    fn test_assemble_and_check_selection() {
        let config = TrackingConfig::new(110.0, 1.0, 0.0);
        let g = GraphBuilder::new(&config)
            .build(
                &frame(&[(20.0, 20.0, 100.0), (80.0, 80.0, 100.0)]),
                &frame(&[(23.0, 24.0, 100.0), (80.0, 83.0, 100.0)]),
            )
            .unwrap();
        let program = LinearProgram::assemble(&g).unwrap();

        assert_eq!(program.num_constraints(), 6);
        // 2 * (2 moves + D) + 2 appear + A->D, one replica
        assert_eq!(program.num_variables(), 10);
        assert_eq!(program.costs().len(), 10);
        assert_eq!(program.flow().iter().sum::<i64>(), 0);
        assert_eq!(program.real_matrix().nrows(), 6);

        use NodeKind::*;
        let moves = select(
            &program,
            &[
                vec![(Previous(0), -1), (Current(0), 1)],
                vec![(Previous(1), -1), (Current(1), 1)],
                vec![(Appear, -1), (Disappear, 1)],
                vec![(Appear, -1), (Disappear, 1)],
            ],
        );
        assert!(program.is_feasible(&moves));
        assert_eq!(program.objective(&moves), 550 + 330);

        // Moves alone leave A short of its supply: the conduit must carry it.
        let bare_moves = select(
            &program,
            &[
                vec![(Previous(0), -1), (Current(0), 1)],
                vec![(Previous(1), -1), (Current(1), 1)],
            ],
        );
        assert!(!program.is_feasible(&bare_moves));
        let one_conduit = select(
            &program,
            &[
                vec![(Previous(0), -1), (Current(0), 1)],
                vec![(Previous(1), -1), (Current(1), 1)],
                vec![(Appear, -1), (Disappear, 1)],
            ],
        );
        assert!(!program.is_feasible(&one_conduit));

        // Everything leaves and re-enters: feasible without the conduit.
        let churn = select(
            &program,
            &[
                vec![(Previous(0), -1), (Disappear, 1)],
                vec![(Previous(1), -1), (Disappear, 1)],
                vec![(Appear, -1), (Current(0), 1)],
                vec![(Appear, -1), (Current(1), 1)],
            ],
        );
        assert!(program.is_feasible(&churn));
        assert!(program.objective(&churn) > program.objective(&moves));

        // A cell served twice.
        let mut doubled = moves.clone();
        let extra = select(&program, &[vec![(Appear, -1), (Current(0), 1)]]);
        for (d, e) in doubled.iter_mut().zip(extra) {
            *d |= e;
        }
        assert!(!program.is_feasible(&doubled));
        assert!(!program.is_feasible(&moves[1..]));
    }
}
