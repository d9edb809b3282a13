//! Tracking parameters
//!
//! Threaded explicitly through graph construction and the tracker.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Precondition, Result};

/// Configuration for model construction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackingConfig {
    /// Feature weight `w` applied to every distance and area cost term
    pub feature_weight: f64,
    /// Fraction `α` of candidate edges retained per pruning group
    pub edge_retention: f64,
    /// Fraction `β` of split/merge candidates materialized as nodes
    pub event_retention: f64,
    /// Regions with an area at or below this are discarded as debris
    pub min_area: f64,
}

impl TrackingConfig {
    /// Empirically chosen feature weight.
    pub const DEFAULT_FEATURE_WEIGHT: f64 = 110.0;
    pub const DEFAULT_EDGE_RETENTION: f64 = 0.25;
    pub const DEFAULT_EVENT_RETENTION: f64 = 0.2;

    /// Creates a configuration with custom weight and pruning fractions.
    pub fn new(feature_weight: f64, edge_retention: f64, event_retention: f64) -> Self {
        Self {
            feature_weight,
            edge_retention,
            event_retention,
            min_area: 0.0,
        }
    }

    /// Sets the debris threshold.
    pub fn with_min_area(mut self, min_area: f64) -> Self {
        self.min_area = min_area;
        self
    }

    /// Checks every parameter is in range.
    pub fn validate(&self) -> Result<()> {
        if !(self.feature_weight.is_finite() && self.feature_weight >= 0.0) {
            return Err(Precondition::InvalidConfig {
                reason: "feature weight must be finite and non-negative",
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.edge_retention) {
            return Err(Precondition::InvalidConfig {
                reason: "edge retention must lie in [0, 1]",
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.event_retention) {
            return Err(Precondition::InvalidConfig {
                reason: "event retention must lie in [0, 1]",
            }
            .into());
        }
        if !(self.min_area.is_finite() && self.min_area >= 0.0) {
            return Err(Precondition::InvalidConfig {
                reason: "minimum area must be finite and non-negative",
            }
            .into());
        }
        Ok(())
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_FEATURE_WEIGHT,
            Self::DEFAULT_EDGE_RETENTION,
            Self::DEFAULT_EVENT_RETENTION,
        )
    }
}
