//! Coupled incidence matrix
//!
//! A plain incidence matrix would let the solver pick the edges around a split
//! or merge vertex independently. Coupling removes every split/merge vertex and
//! replaces its edges with one column per concrete partner; each such column
//! touches the four real endpoints of the event, so selecting it selects the
//! whole event.

use std::collections::HashMap;

use log::{debug, trace};
use nalgebra::DMatrix;

use crate::graph::{CostGraph, NodeId};
use crate::types::node::NodeKind;
use crate::{Result, TrackingError};

/// Incidence entry at an edge's head.
pub const HEAD: i8 = 1;
/// Incidence entry at an edge's tail.
pub const TAIL: i8 = -1;

// ============================================================================
// Coupled Incidence
// ============================================================================

/// Incidence matrix with split/merge vertices coupled out.
///
/// Rows follow [`vertices`](Self::vertices); columns are, in order, the plain
/// edges not touching an event vertex, the coupled event columns, and the
/// capacity replicas of the `A -> D` conduit.
#[derive(Debug, Clone, PartialEq)]
pub struct CoupledIncidence {
    matrix: DMatrix<i8>,
    vertices: Vec<NodeKind>,
}

impl CoupledIncidence {
    #[cfg(test)]
    pub(crate) fn from_parts(matrix: DMatrix<i8>, vertices: Vec<NodeKind>) -> Self {
        debug_assert_eq!(matrix.nrows(), vertices.len());
        Self { matrix, vertices }
    }

    /// Entries in `{-1, 0, 1}`, rows aligned with the vertex order.
    #[inline]
    pub fn matrix(&self) -> &DMatrix<i8> {
        &self.matrix
    }

    /// Surviving vertices in row order.
    #[inline]
    pub fn vertices(&self) -> &[NodeKind] {
        &self.vertices
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.matrix.nrows()
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.matrix.ncols()
    }

    /// Row of a vertex, if it survived coupling.
    pub fn row_of(&self, kind: NodeKind) -> Option<usize> {
        self.vertices.iter().position(|&v| v == kind)
    }

    /// Nonzero `(row, entry)` pairs of a column.
    pub fn column_entries(&self, col: usize) -> Vec<(usize, i8)> {
        self.matrix
            .column(col)
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v != 0)
            .map(|(row, &v)| (row, v))
            .collect()
    }

    /// Real-valued copy of the matrix for solvers.
    pub fn to_real(&self) -> DMatrix<f64> {
        self.matrix.map(f64::from)
    }
}

// ============================================================================
// Event Neighbourhoods
// ============================================================================

/// Incident edges of a split/merge vertex, split by role.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbourhood {
    /// Endpoints present whenever the event occurs, with their entries
    pub fixed: Vec<(NodeId, i8)>,
    /// Alternative partners; each yields one coupled column
    pub cycle: Vec<(NodeId, i8)>,
}

/// Partitions the edges around an event vertex.
///
/// A split's fixed set is its two daughters plus the appear source that supplies
/// the extra unit of flow; its cycle set holds the candidate parents. A merge's
/// fixed set is its two parents plus the disappear sink that absorbs the extra
/// unit; its cycle set holds the candidate children.
pub fn event_neighbourhood(graph: &CostGraph, event: NodeId) -> Result<Neighbourhood> {
    let kind = graph.kind(event);
    let successors = graph.successors(event).map(|(n, _)| (n, HEAD));
    let predecessors = graph.predecessors(event).map(|(n, _)| (n, TAIL));

    let (fixed_side, mut cycle, anchor): (Vec<_>, Vec<_>, _) = match kind {
        NodeKind::Split(..) => (
            successors.collect(),
            predecessors.collect(),
            NodeKind::Appear,
        ),
        NodeKind::Merge(..) => (
            predecessors.collect(),
            successors.collect(),
            NodeKind::Disappear,
        ),
        other => {
            return Err(TrackingError::inconsistency(format!(
                "{other} is not a split or merge vertex"
            )));
        }
    };

    let position = cycle
        .iter()
        .position(|&(n, _)| graph.kind(n) == anchor)
        .ok_or_else(|| {
            TrackingError::inconsistency(format!("{kind} is not connected to {anchor}"))
        })?;
    let mut fixed = fixed_side;
    fixed.push(cycle.remove(position));

    if fixed.len() != 3 {
        return Err(TrackingError::inconsistency(format!(
            "{kind} has {} fixed neighbours, expected 3",
            fixed.len()
        )));
    }
    Ok(Neighbourhood { fixed, cycle })
}

/// Multiplicity of the `A -> D` conduit.
///
/// Every move, split and merge routes one unit from A to D, and there can be at
/// most `min(#L, #R)` of them.
pub fn conduit_capacity(graph: &CostGraph) -> usize {
    graph.num_previous().min(graph.num_current())
}

// ============================================================================
// Coupling
// ============================================================================

/// Column-major accumulator for matrix columns.
struct Columns {
    rows: usize,
    data: Vec<i8>,
}

impl Columns {
    fn len(&self) -> usize {
        self.data.len() / self.rows.max(1)
    }

    fn push(&mut self, entries: impl IntoIterator<Item = (usize, i8)>) {
        let start = self.data.len();
        self.data.resize(start + self.rows, 0);
        for (row, value) in entries {
            self.data[start + row] = value;
        }
    }

    fn duplicate(&mut self, col: usize) {
        let start = col * self.rows;
        self.data.extend_from_within(start..start + self.rows);
    }
}

/// Builds the coupled incidence matrix of `graph`.
///
/// The graph is left untouched; the matrix is a fresh artifact.
pub fn couple(graph: &CostGraph) -> Result<CoupledIncidence> {
    let surviving: Vec<NodeId> = graph
        .nodes()
        .filter(|(_, n)| !n.kind.is_event())
        .map(|(id, _)| id)
        .collect();
    let rows: HashMap<NodeId, usize> = surviving
        .iter()
        .enumerate()
        .map(|(row, &id)| (id, row))
        .collect();
    let row = |id: NodeId| -> Result<usize> {
        rows.get(&id).copied().ok_or_else(|| {
            TrackingError::inconsistency(format!("{} has no matrix row", graph.kind(id)))
        })
    };

    let mut columns = Columns {
        rows: surviving.len(),
        data: Vec::new(),
    };

    // Plain edges between surviving vertices.
    let mut conduit = None;
    for edge in graph.edges() {
        if graph.kind(edge.from).is_event() || graph.kind(edge.to).is_event() {
            continue;
        }
        if graph.kind(edge.from) == NodeKind::Appear && graph.kind(edge.to) == NodeKind::Disappear
        {
            conduit = Some(columns.len());
        }
        columns.push([(row(edge.from)?, TAIL), (row(edge.to)?, HEAD)]);
    }
    let plain = columns.len();

    // One coupled column per event partner.
    for event in graph.event_nodes() {
        let neighbourhood = event_neighbourhood(graph, event)?;
        if neighbourhood.cycle.is_empty() {
            trace!("{} has no viable partner", graph.kind(event));
            continue;
        }
        let fixed = neighbourhood
            .fixed
            .iter()
            .map(|&(n, v)| Ok((row(n)?, v)))
            .collect::<Result<Vec<_>>>()?;
        for &(partner, value) in &neighbourhood.cycle {
            let partner = (row(partner)?, value);
            columns.push(fixed.iter().copied().chain(std::iter::once(partner)));
        }
    }
    let coupled = columns.len() - plain;

    // Capacity replicas of the A -> D conduit.
    let conduit =
        conduit.ok_or_else(|| TrackingError::inconsistency("graph has no A -> D edge"))?;
    let replicas = conduit_capacity(graph).saturating_sub(1);
    for _ in 0..replicas {
        columns.duplicate(conduit);
    }

    debug!(
        "coupled matrix: {} rows, {plain} plain, {coupled} coupled, {replicas} replica columns",
        surviving.len()
    );

    let ncols = columns.len();
    Ok(CoupledIncidence {
        matrix: DMatrix::from_vec(surviving.len(), ncols, columns.data),
        vertices: surviving.iter().map(|&id| graph.kind(id)).collect(),
    })
}
