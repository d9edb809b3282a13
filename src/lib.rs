//! CMCF-Track: Coupled Minimum-Cost Flow cell tracking
//!
//! Tracks cells across consecutive frames of pre-segmented microscopy images by
//! casting frame-to-frame correspondence as a binary linear program over a flow
//! network.
//!
//! # Pipeline
//!
//! For every consecutive frame pair:
//!
//! 1. [`graph::GraphBuilder`] builds a typed, cost-weighted directed graph from the
//!    two frames' cell regions and prunes it to a tractable size.
//! 2. [`model::couple`] turns the graph into a coupled incidence matrix in which
//!    split and merge events are single, atomic columns.
//! 3. [`model::LinearProgram`] adds the flow-requirement and cost vectors.
//! 4. An external [`solve::BinarySolver`] selects the minimum-cost set of columns.
//! 5. [`solve::interpret`] reads the selection back as per-cell events, which
//!    [`types::track::TrackSet`] commits to the running track records.
//!
//! [`tracker::CellTracker`] drives the whole loop over a frame sequence.

pub mod types;
pub mod config;
pub mod cost;
pub mod graph;
pub mod model;
pub mod solve;
pub mod tracker;

pub mod prelude {
    pub use crate::config::TrackingConfig;
    pub use crate::cost::CostModel;
    pub use crate::graph::{CostGraph, GraphBuilder};
    pub use crate::model::{CoupledIncidence, LinearProgram, RowSense};
    pub use crate::solve::{interpret, BinarySolver, FrameAssignment, Origin};
    pub use crate::tracker::{CellTracker, FrameError};
    pub use crate::types::node::NodeKind;
    pub use crate::types::region::{CellRegion, Frame, ImageShape};
    pub use crate::types::track::{CellTrack, Snapshot, TrackEnd, TrackId, TrackSet};
    pub use crate::{Result, TrackingError};
}

use std::fmt;

use crate::types::node::NodeKind;

/// Which frame of a pair an input problem belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSide {
    /// The earlier frame (L cells)
    Previous,
    /// The later frame (R cells)
    Current,
}

impl fmt::Display for FrameSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameSide::Previous => write!(f, "previous"),
            FrameSide::Current => write!(f, "current"),
        }
    }
}

/// Input conditions the caller is responsible for.
#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    /// A frame holds no cells, so aggregate areas are undefined
    EmptyFrame { side: FrameSide },
    /// A region has a non-finite centroid or a non-positive area
    InvalidRegion {
        side: FrameSide,
        index: usize,
        reason: &'static str,
    },
    /// A configuration value is out of range
    InvalidConfig { reason: &'static str },
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precondition::EmptyFrame { side } => write!(f, "{side} frame contains no cells"),
            Precondition::InvalidRegion {
                side,
                index,
                reason,
            } => write!(f, "region {index} of {side} frame is invalid: {reason}"),
            Precondition::InvalidConfig { reason } => write!(f, "invalid configuration: {reason}"),
        }
    }
}

/// Error types for the library
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingError {
    /// Input violates a documented precondition
    PreconditionViolation(Precondition),
    /// A vertex, edge or column breaks the invariants of the model
    ModelInconsistency { reason: String },
    /// A coupled column is adjacent to more than one split/merge event
    AmbiguousCoupling { column: usize, events: Vec<NodeKind> },
    /// No weighted edge exists between two endpoints in either orientation
    EdgeNotFound { from: NodeKind, to: NodeKind },
    /// The solver reported infeasibility or returned an unusable selection
    NoSolution { reason: String },
}

impl TrackingError {
    pub(crate) fn inconsistency(reason: impl Into<String>) -> Self {
        TrackingError::ModelInconsistency {
            reason: reason.into(),
        }
    }

    pub(crate) fn no_solution(reason: impl Into<String>) -> Self {
        TrackingError::NoSolution {
            reason: reason.into(),
        }
    }
}

impl From<Precondition> for TrackingError {
    fn from(precondition: Precondition) -> Self {
        TrackingError::PreconditionViolation(precondition)
    }
}

impl std::error::Error for TrackingError {}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingError::PreconditionViolation(p) => write!(f, "precondition violated: {p}"),
            TrackingError::ModelInconsistency { reason } => {
                write!(f, "model inconsistency: {reason}")
            }
            TrackingError::AmbiguousCoupling { column, events } => {
                write!(f, "column {column} couples more than one event:")?;
                for event in events {
                    write!(f, " {event}")?;
                }
                Ok(())
            }
            TrackingError::EdgeNotFound { from, to } => {
                write!(f, "no edge between {from} and {to}")
            }
            TrackingError::NoSolution { reason } => write!(f, "no solution: {reason}"),
        }
    }
}

pub type Result<T> = ::core::result::Result<T, TrackingError>;
