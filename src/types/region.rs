//! Segmented cell regions and the frames that hold them
//!
//! Regions are produced by an upstream segmentation stage; only the centroid and
//! filled area take part in tracking.

use nalgebra::Point2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{FrameSide, Precondition, Result};

// ============================================================================
// Image Shape
// ============================================================================

/// Image extent, with the origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImageShape {
    /// Extent along x
    pub width: f64,
    /// Extent along y
    pub height: f64,
}

impl ImageShape {
    /// Creates a new image shape.
    #[inline]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

// ============================================================================
// Cell Region
// ============================================================================

/// A single detected cell.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellRegion {
    /// Centre of mass in image coordinates
    pub centroid: Point2<f64>,
    /// Filled area in pixels
    pub area: f64,
}

impl CellRegion {
    /// Creates a region from its centroid coordinates and area.
    #[inline]
    pub fn new(x: f64, y: f64, area: f64) -> Self {
        Self {
            centroid: Point2::new(x, y),
            area,
        }
    }

    /// Checks that the centroid is finite and the area positive.
    pub fn validate(&self, side: FrameSide, index: usize) -> Result<()> {
        if !(self.centroid.x.is_finite() && self.centroid.y.is_finite()) {
            return Err(Precondition::InvalidRegion {
                side,
                index,
                reason: "centroid is not finite",
            }
            .into());
        }
        if !(self.area.is_finite() && self.area > 0.0) {
            return Err(Precondition::InvalidRegion {
                side,
                index,
                reason: "area must be finite and positive",
            }
            .into());
        }
        Ok(())
    }
}

// ============================================================================
// Frame
// ============================================================================

/// All cells detected in one image, in segmentation order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frame {
    /// Detected cells
    pub regions: Vec<CellRegion>,
    /// Shape of the source image
    pub shape: ImageShape,
}

impl Frame {
    /// Creates a frame.
    pub fn new(regions: Vec<CellRegion>, shape: ImageShape) -> Self {
        Self { regions, shape }
    }

    /// Number of cells in the frame.
    #[inline]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns true if the frame holds no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Drops regions whose area does not exceed `min_area` (segmentation debris).
    ///
    /// Order of the surviving regions is preserved.
    pub fn without_debris(mut self, min_area: f64) -> Self {
        self.regions.retain(|region| region.area > min_area);
        self
    }

    /// Checks the frame is non-empty and every region is well formed.
    pub fn validate(&self, side: FrameSide) -> Result<()> {
        if self.regions.is_empty() {
            return Err(Precondition::EmptyFrame { side }.into());
        }
        self.regions
            .iter()
            .enumerate()
            .try_for_each(|(index, region)| region.validate(side, index))
    }

    /// Mean filled area of the frame's cells.
    ///
    /// Returns `None` for an empty frame, where the mean is undefined.
    pub fn mean_area(&self) -> Option<f64> {
        if self.regions.is_empty() {
            return None;
        }
        let total: f64 = self.regions.iter().map(|r| r.area).sum();
        Some(total / self.regions.len() as f64)
    }
}
