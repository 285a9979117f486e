//! Placement of a single item inside a partition.

use crate::config::PositionConvention;
use crate::geometry::{Box3, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A placed item: the world-frame box it occupies and where it lives.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    /// The ID of the placed item.
    pub item_id: String,

    /// The partition the item was placed in.
    pub partition_id: String,

    /// Occupied box in world coordinates (dimensions after rotation).
    pub pose: Box3,

    /// True if the chosen orientation differs from the item's given dimensions.
    pub rotated: bool,
}

impl Placement {
    /// Creates a new placement.
    pub fn new(
        item_id: impl Into<String>,
        partition_id: impl Into<String>,
        pose: Box3,
        rotated: bool,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            partition_id: partition_id.into(),
            pose,
            rotated,
        }
    }

    /// Returns the reported position under `convention`.
    pub fn position(&self, convention: PositionConvention) -> Vec3 {
        match convention {
            PositionConvention::MinCorner => self.pose.min,
            PositionConvention::Center => self.pose.center(),
        }
    }

    /// Returns the occupied extents.
    pub fn dims(&self) -> Vec3 {
        self.pose.dims()
    }

    /// Returns the occupied volume.
    pub fn volume(&self) -> f64 {
        self.pose.volume()
    }
}
