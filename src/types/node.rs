//! Graph node taxonomy
//!
//! Every vertex of the tracking graph is tagged with a [`NodeKind`] carrying the
//! cell indices it refers to, so kind dispatch and index lookup never depend on
//! parsing labels.

use std::fmt;

use nalgebra::Point2;

use super::region::CellRegion;

// ============================================================================
// Node Kind
// ============================================================================

/// Kind of a graph vertex, with its cell index payload.
///
/// Event pairs are always stored in ascending order (`j1 < j2`, `i1 < i2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// Cell `i` of the previous frame
    Previous(usize),
    /// Cell `j` of the current frame
    Current(usize),
    /// Appear source
    Appear,
    /// Disappear sink
    Disappear,
    /// Candidate division into current-frame cells `j1` and `j2`
    Split(usize, usize),
    /// Candidate merge of previous-frame cells `i1` and `i2`
    Merge(usize, usize),
}

impl NodeKind {
    /// Creates a split node for an unordered pair of current-frame cells.
    #[inline]
    pub fn split(a: usize, b: usize) -> Self {
        NodeKind::Split(a.min(b), a.max(b))
    }

    /// Creates a merge node for an unordered pair of previous-frame cells.
    #[inline]
    pub fn merge(a: usize, b: usize) -> Self {
        NodeKind::Merge(a.min(b), a.max(b))
    }

    /// Returns true for split and merge vertices, which coupling eliminates.
    #[inline]
    pub fn is_event(&self) -> bool {
        matches!(self, NodeKind::Split(..) | NodeKind::Merge(..))
    }

    /// Returns true for real cells of either frame.
    #[inline]
    pub fn is_cell(&self) -> bool {
        matches!(self, NodeKind::Previous(_) | NodeKind::Current(_))
    }

    /// Member cell indices of a split or merge event.
    #[inline]
    pub fn members(&self) -> Option<(usize, usize)> {
        match *self {
            NodeKind::Split(a, b) | NodeKind::Merge(a, b) => Some((a, b)),
            _ => None,
        }
    }

    /// Returns true if cell `index` is one of this event's members.
    #[inline]
    pub fn has_member(&self, index: usize) -> bool {
        self.members().is_some_and(|(a, b)| a == index || b == index)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Previous(i) => write!(f, "L{i}"),
            NodeKind::Current(j) => write!(f, "R{j}"),
            NodeKind::Appear => write!(f, "A"),
            NodeKind::Disappear => write!(f, "D"),
            NodeKind::Split(a, b) => write!(f, "S({a},{b})"),
            NodeKind::Merge(a, b) => write!(f, "M({a},{b})"),
        }
    }
}

// ============================================================================
// Node
// ============================================================================

/// Attributes attached to a vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeData {
    /// A real cell with its centroid and area
    Cell(CellRegion),
    /// A synthetic appear/disappear vertex with a representative area
    Aggregate { area: f64 },
    /// A split/merge event; its features are those of its members
    Event,
}

/// A vertex of the tracking graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub data: NodeData,
}

impl Node {
    /// Creates a cell node.
    pub fn cell(kind: NodeKind, region: CellRegion) -> Self {
        Self {
            kind,
            data: NodeData::Cell(region),
        }
    }

    /// Creates an appear/disappear node.
    pub fn aggregate(kind: NodeKind, area: f64) -> Self {
        Self {
            kind,
            data: NodeData::Aggregate { area },
        }
    }

    /// Creates a split/merge node.
    pub fn event(kind: NodeKind) -> Self {
        Self {
            kind,
            data: NodeData::Event,
        }
    }

    /// Cell features, for L and R vertices.
    #[inline]
    pub fn region(&self) -> Option<&CellRegion> {
        match &self.data {
            NodeData::Cell(region) => Some(region),
            _ => None,
        }
    }

    #[inline]
    pub fn centroid(&self) -> Option<Point2<f64>> {
        self.region().map(|r| r.centroid)
    }

    /// Area of a cell or aggregate vertex.
    #[inline]
    pub fn area(&self) -> Option<f64> {
        match self.data {
            NodeData::Cell(region) => Some(region.area),
            NodeData::Aggregate { area } => Some(area),
            NodeData::Event => None,
        }
    }
}
