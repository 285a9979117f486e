//! The placement seam shared by all strategies.

use crate::item::Item;
use lanepack_core::geometry::{Box3, EPS};

/// A box placed by a [`Placer`], in world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedBox {
    /// Item id.
    pub item_id: String,
    /// Occupied box (dimensions after rotation).
    pub pose: Box3,
    /// True if the orientation differs from the given dimensions.
    pub rotated: bool,
}

impl PlacedBox {
    pub(crate) fn new(item: &Item, pose: Box3) -> Self {
        let rotated = (pose.dims() - item.dims()).amax() > EPS;
        Self {
            item_id: item.id().to_string(),
            pose,
            rotated,
        }
    }
}

/// Result of placing a batch of items into one region.
#[derive(Debug, Clone, Default)]
pub struct PlaceOutcome {
    /// Placed items, in placement order.
    pub placed: Vec<PlacedBox>,
    /// Ids of items that found no position, in input order.
    pub unplaced: Vec<String>,
    /// Optimizer iterations spent (0 for single-pass placers).
    pub iterations: u64,
    /// Best cost per optimizer iteration (empty for single-pass placers).
    pub history: Vec<f64>,
    /// True if the optimizer stopped on the cancel flag.
    pub cancelled: bool,
}

impl PlaceOutcome {
    /// Total volume of the placed boxes.
    pub fn placed_volume(&self) -> f64 {
        self.placed.iter().map(|p| p.pose.volume()).sum()
    }
}

/// Places items into a region that may already hold occupied boxes.
///
/// Implementations never move `occupied` boxes and never return poses that
/// leave `region` or intersect each other or `occupied`.
pub trait Placer: Send + Sync {
    /// Display name of the strategy.
    fn name(&self) -> &'static str;

    /// Places `items` into `region`.
    fn place(&self, items: &[&Item], region: &Box3, occupied: &[Box3]) -> PlaceOutcome;
}
