//! JSON response types.

use lanepack_core::config::PositionConvention;
use lanepack_core::result::{BorrowOp, PackingResult, PartitionSummary, SpillOp, UnplacedReason};
use lanepack_core::Error;
use serde::{Deserialize, Serialize};

/// Response for a packing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingResponse {
    /// API version.
    pub version: String,

    /// Whether the run completed.
    pub success: bool,

    /// Human-readable status.
    pub message: String,

    /// Machine-readable error code if the request was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    /// Placed items.
    #[serde(default)]
    pub placed: Vec<PlacedObject>,

    /// Items that could not be placed.
    #[serde(default)]
    pub unplaced: Vec<UnplacedObject>,

    /// Aggregate statistics.
    pub statistics: Statistics,

    /// Boundary shifts between partitions.
    #[serde(default)]
    pub borrow_ops: Vec<BorrowOp>,

    /// Items placed in the overflow partition.
    #[serde(default)]
    pub spill_ops: Vec<SpillOp>,

    /// Final partition states.
    #[serde(default)]
    pub partitions: Vec<PartitionSummary>,
}

/// A placed item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedObject {
    /// Item id.
    pub item_id: String,
    /// Position according to the requested convention.
    pub position: [f64; 3],
    /// Dimensions after rotation.
    pub dimensions: [f64; 3],
    /// Partition holding the item.
    pub partition_id: String,
    /// Whether the item was rotated.
    pub rotated: bool,
}

/// An unplaced item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnplacedObject {
    /// Item id.
    pub item_id: String,
    /// Reason code.
    pub reason: UnplacedReason,
}

/// Aggregate statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    /// Container volume.
    pub total_volume: f64,
    /// Placed volume.
    pub used_volume: f64,
    /// `used_volume / total_volume`.
    pub utilization: f64,
    /// Wall-clock time.
    pub execution_time_ms: u64,
    /// Number of placed items.
    pub placed_count: usize,
    /// Number of unplaced items.
    pub unplaced_count: usize,
}

impl PackingResponse {
    /// Builds a response from a result.
    pub fn from_result(result: &PackingResult, convention: PositionConvention) -> Self {
        let placed = result
            .placements
            .iter()
            .map(|p| {
                let position = p.position(convention);
                let dims = p.dims();
                PlacedObject {
                    item_id: p.item_id.clone(),
                    position: [position.x, position.y, position.z],
                    dimensions: [dims.x, dims.y, dims.z],
                    partition_id: p.partition_id.clone(),
                    rotated: p.rotated,
                }
            })
            .collect();

        let unplaced = result
            .unplaced
            .iter()
            .map(|u| UnplacedObject {
                item_id: u.item_id.clone(),
                reason: u.reason,
            })
            .collect();

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            success: result.success,
            message: result.message.clone(),
            error_code: None,
            placed,
            unplaced,
            statistics: Statistics {
                total_volume: result.total_volume,
                used_volume: result.used_volume,
                utilization: result.utilization,
                execution_time_ms: result.execution_time_ms,
                placed_count: result.placed_count(),
                unplaced_count: result.unplaced_count(),
            },
            borrow_ops: result.borrow_ops.clone(),
            spill_ops: result.spill_ops.clone(),
            partitions: result.partitions.clone(),
        }
    }

    /// Builds a failure response for a rejected request.
    pub fn error(err: &Error) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            success: false,
            message: err.to_string(),
            error_code: Some(err.code().to_string()),
            placed: Vec::new(),
            unplaced: Vec::new(),
            statistics: Statistics::default(),
            borrow_ops: Vec::new(),
            spill_ops: Vec::new(),
            partitions: Vec::new(),
        }
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json(&self) -> lanepack_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
