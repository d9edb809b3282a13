//! Graph construction for one frame pair
//!
//! | From | To | Weight |
//! |------|----|--------|
//! | `L`  | `R` | move cost, pruned per L |
//! | `L`  | `D` | disappear cost |
//! | `L`  | `S` | split cost, pruned per L |
//! | `L`  | `M` | dummy, members only |
//! | `A`  | `R` | appear cost |
//! | `A`  | `S` | dummy |
//! | `A`  | `D` | dummy |
//! | `S`  | `R` | dummy, members only |
//! | `M`  | `R` | merge cost, pruned per M |
//! | `M`  | `D` | dummy |

use log::{debug, warn};

use super::prune::{prune_group, retain_count, retain_lowest};
use super::{CostGraph, NodeId};
use crate::config::TrackingConfig;
use crate::cost::{pairing_affinity, Cost, CostModel, DUMMY_COST};
use crate::types::node::{Node, NodeKind};
use crate::types::region::{CellRegion, Frame};
use crate::{FrameSide, Precondition, Result, TrackingError};

/// Builds the pruned cost graph for consecutive frames.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder<'a> {
    config: &'a TrackingConfig,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(config: &'a TrackingConfig) -> Self {
        Self { config }
    }

    /// Builds the graph linking `previous` (L cells) to `current` (R cells).
    ///
    /// Both frames must hold at least one valid region. Frames of different
    /// shapes are accepted with a warning; border costs use the previous
    /// frame's shape.
    pub fn build(&self, previous: &Frame, current: &Frame) -> Result<CostGraph> {
        self.config.validate()?;
        previous.validate(FrameSide::Previous)?;
        current.validate(FrameSide::Current)?;

        if previous.shape != current.shape {
            warn!(
                "comparing frames of different sizes: {:?} and {:?}",
                previous.shape, current.shape
            );
        }

        let appear_area = current.mean_area().ok_or(Precondition::EmptyFrame {
            side: FrameSide::Current,
        })?;
        let disappear_area = previous.mean_area().ok_or(Precondition::EmptyFrame {
            side: FrameSide::Previous,
        })?;

        let splits = event_candidates(&current.regions, self.config.event_retention);
        let merges = event_candidates(&previous.regions, self.config.event_retention);

        let mut nodes = Vec::with_capacity(
            previous.len() + current.len() + 2 + splits.len() + merges.len(),
        );
        nodes.extend(
            previous
                .regions
                .iter()
                .enumerate()
                .map(|(i, r)| Node::cell(NodeKind::Previous(i), *r)),
        );
        nodes.extend(
            current
                .regions
                .iter()
                .enumerate()
                .map(|(j, r)| Node::cell(NodeKind::Current(j), *r)),
        );
        nodes.push(Node::aggregate(NodeKind::Appear, appear_area));
        nodes.push(Node::aggregate(NodeKind::Disappear, disappear_area));
        nodes.extend(splits.iter().map(|&(a, b)| Node::event(NodeKind::split(a, b))));
        nodes.extend(merges.iter().map(|&(a, b)| Node::event(NodeKind::merge(a, b))));

        let mut assembly = Assembly {
            graph: CostGraph::with_nodes(nodes, previous.shape)?,
            cost: CostModel::new(self.config.feature_weight, previous.shape),
            alpha: self.config.edge_retention,
            previous: &previous.regions,
            current: &current.regions,
            splits: &splits,
            merges: &merges,
        };

        for i in 0..previous.len() {
            assembly.previous_cell_edges(i, disappear_area)?;
        }
        assembly.appear_edges(appear_area)?;
        assembly.split_edges()?;
        assembly.merge_edges()?;

        let graph = assembly.graph;
        debug!(
            "built graph: {} L, {} R, {} splits, {} merges, {} edges",
            previous.len(),
            current.len(),
            splits.len(),
            merges.len(),
            graph.num_edges()
        );
        Ok(graph)
    }
}

/// Retained split (merge) candidates among the cells of one frame.
///
/// All unordered pairs are ranked by [`pairing_affinity`]; the lowest `fraction`
/// survive, in enumeration order.
pub fn event_candidates(regions: &[CellRegion], fraction: f64) -> Vec<(usize, usize)> {
    let n = regions.len();
    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|a| (a + 1..n).map(move |b| (a, b)))
        .collect();
    let keep = retain_count(fraction, pairs.len());
    retain_lowest(pairs, keep, |&(a, b)| {
        pairing_affinity(&regions[a], &regions[b])
    })
}

// ============================================================================
// Edge Assembly
// ============================================================================

struct Assembly<'a> {
    graph: CostGraph,
    cost: CostModel,
    alpha: f64,
    previous: &'a [CellRegion],
    current: &'a [CellRegion],
    splits: &'a [(usize, usize)],
    merges: &'a [(usize, usize)],
}

impl Assembly<'_> {
    fn id(&self, kind: NodeKind) -> Result<NodeId> {
        self.graph
            .node_id(kind)
            .ok_or_else(|| TrackingError::inconsistency(format!("missing vertex {kind}")))
    }

    fn connect(&mut self, from: NodeKind, to: NodeKind, weight: Cost) -> Result<()> {
        let (from, to) = (self.id(from)?, self.id(to)?);
        self.graph.add_edge(from, to, weight)
    }

    /// Adds a pruned group of edges leaving `from`.
    fn connect_group(
        &mut self,
        from: NodeKind,
        group: Vec<(NodeKind, Cost)>,
        pool: usize,
    ) -> Result<()> {
        for (to, weight) in prune_group(group, self.alpha, pool, |&(_, c)| c as f64) {
            self.connect(from, to, weight)?;
        }
        Ok(())
    }

    fn previous_cell_edges(&mut self, i: usize, disappear_area: f64) -> Result<()> {
        let l = NodeKind::Previous(i);
        let previous = self.previous;
        let cell = &previous[i];

        let moves = self
            .current
            .iter()
            .enumerate()
            .map(|(j, r)| Ok((NodeKind::Current(j), self.cost.move_cost(cell, r)?)))
            .collect::<Result<Vec<_>>>()?;
        self.connect_group(l, moves, self.current.len())?;

        let weight = self.cost.disappear_cost(cell, disappear_area)?;
        self.connect(l, NodeKind::Disappear, weight)?;

        let splits = self
            .splits
            .iter()
            .map(|&(a, b)| {
                let daughters = [&self.current[a], &self.current[b]];
                Ok((NodeKind::split(a, b), self.cost.split_cost(cell, daughters)?))
            })
            .collect::<Result<Vec<_>>>()?;
        self.connect_group(l, splits, self.splits.len())?;

        for &(a, b) in self.merges {
            if a == i || b == i {
                self.connect(l, NodeKind::merge(a, b), DUMMY_COST)?;
            }
        }
        Ok(())
    }

    fn appear_edges(&mut self, appear_area: f64) -> Result<()> {
        for j in 0..self.current.len() {
            let weight = self.cost.appear_cost(&self.current[j], appear_area)?;
            self.connect(NodeKind::Appear, NodeKind::Current(j), weight)?;
        }
        for &(a, b) in self.splits {
            self.connect(NodeKind::Appear, NodeKind::split(a, b), DUMMY_COST)?;
        }
        self.connect(NodeKind::Appear, NodeKind::Disappear, DUMMY_COST)
    }

    fn split_edges(&mut self) -> Result<()> {
        for &(a, b) in self.splits {
            let s = NodeKind::split(a, b);
            self.connect(s, NodeKind::Current(a), DUMMY_COST)?;
            self.connect(s, NodeKind::Current(b), DUMMY_COST)?;
        }
        Ok(())
    }

    fn merge_edges(&mut self) -> Result<()> {
        for &(a, b) in self.merges {
            let m = NodeKind::merge(a, b);
            let parents = [&self.previous[a], &self.previous[b]];
            let targets = self
                .current
                .iter()
                .enumerate()
                .map(|(j, r)| Ok((NodeKind::Current(j), self.cost.merge_cost(r, parents)?)))
                .collect::<Result<Vec<_>>>()?;
            self.connect_group(m, targets, self.current.len())?;
            self.connect(m, NodeKind::Disappear, DUMMY_COST)?;
        }
        Ok(())
    }
}
