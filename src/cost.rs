//! Geometric and feature costs
//!
//! The free functions are pure, unscaled feature terms. [`CostModel`] applies the
//! feature weight and integer conversion that turn them into edge weights.

use nalgebra::Point2;
use num_traits::ToPrimitive;

use crate::types::region::{CellRegion, ImageShape};
use crate::{Result, TrackingError};

/// Integer edge weight.
pub type Cost = u64;

/// Weight of structural edges with no physical interpretation.
pub const DUMMY_COST: Cost = 0;

// ============================================================================
// Feature Terms
// ============================================================================

/// Euclidean distance between two centroids.
#[inline]
pub fn distance(a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    nalgebra::distance(a, b)
}

/// Sub-linear area penalty `sqrt(|a2 - a1|)`.
#[inline]
pub fn area_difference(a1: f64, a2: f64) -> f64 {
    (a2 - a1).abs().sqrt()
}

/// Distance from a centroid to the nearest image edge.
///
/// The origin is the top-left corner of the image.
pub fn closest_border_distance(centroid: &Point2<f64>, shape: &ImageShape) -> f64 {
    let right = (shape.width - centroid.x).abs();
    let bottom = (shape.height - centroid.y).abs();
    centroid.x.min(right).min(centroid.y).min(bottom)
}

/// Raw cost of a split or merge anchored on one cell.
///
/// Sum of the distances from the anchor to both members, plus the area penalty
/// between the members' combined area and the anchor's area.
pub fn event_cost(anchor: &CellRegion, members: [&CellRegion; 2]) -> f64 {
    let travel: f64 = members
        .iter()
        .map(|m| distance(&anchor.centroid, &m.centroid))
        .sum();
    let combined_area: f64 = members.iter().map(|m| m.area).sum();
    travel + area_difference(combined_area, anchor.area)
}

/// Pairing score of two cells as split daughters or merge parents.
///
/// Lower is more plausible. Only used to rank event candidates.
#[inline]
pub fn pairing_affinity(a: &CellRegion, b: &CellRegion) -> f64 {
    distance(&a.centroid, &b.centroid) / (a.area + b.area)
}

// ============================================================================
// Cost Model
// ============================================================================

/// Scaled edge costs for one frame pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    /// Feature weight `w`
    pub weight: f64,
    /// Image extent used for border distances
    pub shape: ImageShape,
}

impl CostModel {
    pub fn new(weight: f64, shape: ImageShape) -> Self {
        Self { weight, shape }
    }

    /// Scales a raw feature cost and rounds it to an integer weight.
    ///
    /// Every non-dummy edge goes through this conversion. Rounding the scaled
    /// value, rather than truncating the raw one, keeps sub-unit differences
    /// visible to the solver; for integral `w · raw` both give the same weight.
    pub fn scaled(&self, raw: f64) -> Result<Cost> {
        (self.weight * raw).round().to_u64().ok_or_else(|| {
            TrackingError::inconsistency(format!("cost {raw} cannot be scaled to an edge weight"))
        })
    }

    /// `L -> R`: a cell persisting between frames.
    pub fn move_cost(&self, previous: &CellRegion, current: &CellRegion) -> Result<Cost> {
        self.scaled(
            distance(&previous.centroid, &current.centroid)
                + area_difference(previous.area, current.area),
        )
    }

    /// `A -> R`: a cell entering the current frame.
    pub fn appear_cost(&self, current: &CellRegion, appear_area: f64) -> Result<Cost> {
        self.scaled(
            closest_border_distance(&current.centroid, &self.shape)
                + area_difference(current.area, appear_area),
        )
    }

    /// `L -> D`: a cell leaving after the previous frame.
    pub fn disappear_cost(&self, previous: &CellRegion, disappear_area: f64) -> Result<Cost> {
        self.scaled(
            closest_border_distance(&previous.centroid, &self.shape)
                + area_difference(previous.area, disappear_area),
        )
    }

    /// `L -> S`: a previous cell dividing into two current cells.
    pub fn split_cost(&self, parent: &CellRegion, daughters: [&CellRegion; 2]) -> Result<Cost> {
        self.scaled(event_cost(parent, daughters))
    }

    /// `M -> R`: two previous cells merging into one current cell.
    pub fn merge_cost(&self, child: &CellRegion, parents: [&CellRegion; 2]) -> Result<Cost> {
        self.scaled(event_cost(child, parents))
    }
}
