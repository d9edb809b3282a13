//! Cost vector reconstruction
//!
//! Columns carry no weights of their own; each column's cost is recovered from
//! the graph through its endpoints.

use crate::cost::Cost;
use crate::graph::{CostGraph, NodeId};
use crate::{Result, TrackingError};

use super::coupling::{CoupledIncidence, HEAD, TAIL};

/// Recovers one cost per column of `incidence` from `graph`.
///
/// A 2-endpoint column costs the weight of the edge joining its endpoints, in
/// whichever orientation the graph holds it. A 4-endpoint column costs the sum
/// of the edges between its endpoints and the single split/merge vertex adjacent
/// to all four of them.
///
/// # Errors
///
/// * [`TrackingError::EdgeNotFound`] if an endpoint pair has no edge
/// * [`TrackingError::AmbiguousCoupling`] if several events fit a coupled column
/// * [`TrackingError::ModelInconsistency`] for any other column shape
pub fn cost_vector(graph: &CostGraph, incidence: &CoupledIncidence) -> Result<Vec<Cost>> {
    let ids = incidence
        .vertices()
        .iter()
        .map(|&kind| {
            graph.node_id(kind).ok_or_else(|| {
                TrackingError::inconsistency(format!("row vertex {kind} is not in the graph"))
            })
        })
        .collect::<Result<Vec<NodeId>>>()?;

    (0..incidence.num_columns())
        .map(|col| {
            let endpoints: Vec<(NodeId, i8)> = incidence
                .column_entries(col)
                .into_iter()
                .map(|(row, value)| (ids[row], value))
                .collect();
            match endpoints.len() {
                2 => plain_cost(graph, &endpoints),
                4 => coupled_cost(graph, col, &endpoints),
                n => Err(TrackingError::inconsistency(format!(
                    "column {col} has {n} nonzero entries"
                ))),
            }
        })
        .collect()
}

fn endpoint(endpoints: &[(NodeId, i8)], value: i8) -> Option<NodeId> {
    endpoints.iter().find(|&&(_, v)| v == value).map(|&(n, _)| n)
}

fn plain_cost(graph: &CostGraph, endpoints: &[(NodeId, i8)]) -> Result<Cost> {
    let (a, b) = (endpoints[0].0, endpoints[1].0);
    let (from, to) = match (endpoint(endpoints, TAIL), endpoint(endpoints, HEAD)) {
        (Some(from), Some(to)) => (from, to),
        _ => (a, b),
    };
    graph
        .undirected_weight(from, to)
        .ok_or(TrackingError::EdgeNotFound {
            from: graph.kind(from),
            to: graph.kind(to),
        })
}

fn coupled_cost(graph: &CostGraph, col: usize, endpoints: &[(NodeId, i8)]) -> Result<Cost> {
    let events: Vec<NodeId> = graph
        .event_nodes()
        .filter(|&event| endpoints.iter().all(|&(n, _)| graph.adjacent(event, n)))
        .collect();

    let event = match events.as_slice() {
        [event] => *event,
        [] => {
            let from = endpoint(endpoints, TAIL).unwrap_or(endpoints[0].0);
            let to = endpoint(endpoints, HEAD).unwrap_or(endpoints[1].0);
            return Err(TrackingError::EdgeNotFound {
                from: graph.kind(from),
                to: graph.kind(to),
            });
        }
        _ => {
            return Err(TrackingError::AmbiguousCoupling {
                column: col,
                events: events.iter().map(|&e| graph.kind(e)).collect(),
            });
        }
    };

    endpoints.iter().try_fold(0, |total: Cost, &(n, _)| {
        let weight = graph
            .undirected_weight(n, event)
            .ok_or(TrackingError::EdgeNotFound {
                from: graph.kind(n),
                to: graph.kind(event),
            })?;
        total.checked_add(weight).ok_or_else(|| {
            TrackingError::inconsistency(format!("cost of column {col} overflows"))
        })
    })
}
