//! Typed cost graph for one frame pair
//!
//! The graph is assembled once by [`GraphBuilder`] and is read-only afterwards;
//! coupling and cost-vector assembly derive fresh artifacts from it.

mod builder;
pub mod prune;

pub use builder::*;

use std::collections::HashMap;

use crate::cost::Cost;
use crate::types::node::{Node, NodeKind};
use crate::types::region::ImageShape;
use crate::{Result, TrackingError};

/// Index of a vertex in a [`CostGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A directed, weighted edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: Cost,
}

/// Directed cost graph over L, R, A, D and split/merge vertices.
#[derive(Debug, Clone)]
pub struct CostGraph {
    nodes: Vec<Node>,
    lookup: HashMap<NodeKind, NodeId>,
    edges: Vec<Edge>,
    edge_lookup: HashMap<(NodeId, NodeId), usize>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    shape: ImageShape,
}

impl CostGraph {
    /// Creates an edgeless graph over `nodes`; kinds must be unique.
    pub(crate) fn with_nodes(nodes: Vec<Node>, shape: ImageShape) -> Result<Self> {
        let mut lookup = HashMap::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            if lookup.insert(node.kind, NodeId(index)).is_some() {
                return Err(TrackingError::inconsistency(format!(
                    "duplicate vertex {}",
                    node.kind
                )));
            }
        }
        let n = nodes.len();
        Ok(Self {
            nodes,
            lookup,
            edges: Vec::new(),
            edge_lookup: HashMap::new(),
            outgoing: vec![Vec::new(); n],
            incoming: vec![Vec::new(); n],
            shape,
        })
    }

    pub(crate) fn add_edge(&mut self, from: NodeId, to: NodeId, weight: Cost) -> Result<()> {
        if from == to || from.0 >= self.nodes.len() || to.0 >= self.nodes.len() {
            return Err(TrackingError::inconsistency(format!(
                "invalid edge {:?} -> {:?}",
                from, to
            )));
        }
        if self.edge_lookup.contains_key(&(from, to)) {
            return Err(TrackingError::inconsistency(format!(
                "duplicate edge {} -> {}",
                self.kind(from),
                self.kind(to)
            )));
        }
        let index = self.edges.len();
        self.edges.push(Edge { from, to, weight });
        self.edge_lookup.insert((from, to), index);
        self.outgoing[from.0].push(index);
        self.incoming[to.0].push(index);
        Ok(())
    }

    /// Number of vertices.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Image shape used for border costs.
    #[inline]
    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    /// Looks up a vertex by kind.
    #[inline]
    pub fn node_id(&self, kind: NodeKind) -> Option<NodeId> {
        self.lookup.get(&kind).copied()
    }

    /// Vertices in construction order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Edges in construction order.
    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of previous-frame cells.
    pub fn num_previous(&self) -> usize {
        self.count(|k| matches!(k, NodeKind::Previous(_)))
    }

    /// Number of current-frame cells.
    pub fn num_current(&self) -> usize {
        self.count(|k| matches!(k, NodeKind::Current(_)))
    }

    fn count(&self, pred: impl Fn(&NodeKind) -> bool) -> usize {
        self.nodes.iter().filter(|n| pred(&n.kind)).count()
    }

    /// Weight of the directed edge `from -> to`.
    pub fn weight(&self, from: NodeId, to: NodeId) -> Option<Cost> {
        self.edge_lookup
            .get(&(from, to))
            .map(|&index| self.edges[index].weight)
    }

    /// Weight of the edge between two kinds, in the given direction.
    pub fn weight_between(&self, from: NodeKind, to: NodeKind) -> Option<Cost> {
        self.weight(self.node_id(from)?, self.node_id(to)?)
    }

    /// Weight of the edge between `a` and `b` in whichever direction exists.
    pub fn undirected_weight(&self, a: NodeId, b: NodeId) -> Option<Cost> {
        self.weight(a, b).or_else(|| self.weight(b, a))
    }

    /// Heads of the edges leaving `id`, with weights.
    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = (NodeId, Cost)> + '_ {
        self.outgoing[id.0].iter().map(|&e| {
            let edge = &self.edges[e];
            (edge.to, edge.weight)
        })
    }

    /// Tails of the edges entering `id`, with weights.
    pub fn predecessors(&self, id: NodeId) -> impl Iterator<Item = (NodeId, Cost)> + '_ {
        self.incoming[id.0].iter().map(|&e| {
            let edge = &self.edges[e];
            (edge.from, edge.weight)
        })
    }

    /// Returns true if an edge joins `a` and `b` in either direction.
    pub fn adjacent(&self, a: NodeId, b: NodeId) -> bool {
        self.edge_lookup.contains_key(&(a, b)) || self.edge_lookup.contains_key(&(b, a))
    }

    /// Split and merge vertices in construction order.
    pub fn event_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes()
            .filter(|(_, n)| n.kind.is_event())
            .map(|(id, _)| id)
    }
}
