//! Packing result representation.

use crate::geometry::Box3;
use crate::placement::Placement;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why an item ended up unplaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum UnplacedReason {
    /// No allowed orientation fits the container.
    TooLarge,
    /// The item fits the container but no space was found for it.
    NoSpaceAvailable,
}

impl UnplacedReason {
    /// Returns the machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            UnplacedReason::TooLarge => "TOO_LARGE",
            UnplacedReason::NoSpaceAvailable => "NO_SPACE_AVAILABLE",
        }
    }
}

impl fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// An item that could not be placed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnplacedItem {
    /// Item id.
    pub item_id: String,
    /// Reason code.
    pub reason: UnplacedReason,
}

impl UnplacedItem {
    /// Creates a new unplaced entry.
    pub fn new(item_id: impl Into<String>, reason: UnplacedReason) -> Self {
        Self {
            item_id: item_id.into(),
            reason,
        }
    }
}

/// Volume moved from one partition to a neighbor by shifting their boundary.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BorrowOp {
    /// Donor partition.
    pub from: String,
    /// Receiving partition.
    pub to: String,
    /// Moved volume.
    pub volume: f64,
}

/// An item placed in the overflow partition instead of its own.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpillOp {
    /// Overflow partition that received the item.
    pub to: String,
    /// Spilled item.
    pub item_id: String,
}

/// Final state of one partition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PartitionSummary {
    /// Partition id.
    pub id: String,
    /// Owning group (None for deferred/overflow partitions).
    pub group_id: Option<String>,
    /// Final bounds.
    pub bounds: Box3,
    /// Reserved volume at creation.
    pub reserved_volume: f64,
    /// Volume occupied by placed items.
    pub used_volume: f64,
    /// Volume received from neighbors.
    pub borrowed_in: f64,
    /// Volume given to neighbors.
    pub borrowed_out: f64,
    /// Number of items placed in this partition.
    pub item_count: usize,
    /// Display label.
    pub label: String,
    /// Display color (`#rrggbb`).
    pub color: String,
    /// Share of the container along the split axis (0.0 - 1.0).
    pub ratio: f64,
}

/// Result of a packing run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackingResult {
    /// True when the run completed; unplaced items do not clear it.
    pub success: bool,

    /// Human-readable summary.
    pub message: String,

    /// Placements of all placed items.
    pub placements: Vec<Placement>,

    /// Items that could not be placed.
    pub unplaced: Vec<UnplacedItem>,

    /// Volume of the container.
    pub total_volume: f64,

    /// Sum of placed item volumes.
    pub used_volume: f64,

    /// `used_volume / total_volume` (0.0 - 1.0).
    pub utilization: f64,

    /// Computation time in milliseconds.
    pub execution_time_ms: u64,

    /// Boundary shifts between neighboring partitions.
    pub borrow_ops: Vec<BorrowOp>,

    /// Items moved to the overflow partition.
    pub spill_ops: Vec<SpillOp>,

    /// Final partition states.
    pub partitions: Vec<PartitionSummary>,

    /// Strategy used for placement.
    pub strategy: String,

    /// Optimizer iterations summed over partitions.
    pub iterations: u64,

    /// Best score (`100 * placed + utilization %`) per temperature step of the
    /// last annealed partition.
    pub best_cost_history: Vec<f64>,

    /// Whether the run was cancelled early.
    pub cancelled: bool,
}

impl PackingResult {
    /// Creates a new empty result.
    pub fn new() -> Self {
        Self {
            success: true,
            message: String::new(),
            placements: Vec::new(),
            unplaced: Vec::new(),
            total_volume: 0.0,
            used_volume: 0.0,
            utilization: 0.0,
            execution_time_ms: 0,
            borrow_ops: Vec::new(),
            spill_ops: Vec::new(),
            partitions: Vec::new(),
            strategy: String::new(),
            iterations: 0,
            best_cost_history: Vec::new(),
            cancelled: false,
        }
    }

    /// Returns true if every item was placed.
    pub fn all_placed(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Returns the number of placed items.
    pub fn placed_count(&self) -> usize {
        self.placements.len()
    }

    /// Returns the number of unplaced items.
    pub fn unplaced_count(&self) -> usize {
        self.unplaced.len()
    }

    /// Looks up the placement of an item.
    pub fn placement_of(&self, item_id: &str) -> Option<&Placement> {
        self.placements.iter().find(|p| p.item_id == item_id)
    }

    /// Looks up the unplaced reason of an item.
    pub fn unplaced_reason(&self, item_id: &str) -> Option<UnplacedReason> {
        self.unplaced
            .iter()
            .find(|u| u.item_id == item_id)
            .map(|u| u.reason)
    }

    /// Looks up a partition summary by id.
    pub fn partition(&self, id: &str) -> Option<&PartitionSummary> {
        self.partitions.iter().find(|p| p.id == id)
    }

    /// Sets the strategy name.
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = strategy.into();
        self
    }

    /// Recomputes used volume and utilization from the placements.
    pub fn recompute_utilization(&mut self) {
        self.used_volume = self.placements.iter().map(|p| p.volume()).sum();
        self.utilization = if self.total_volume > 0.0 {
            self.used_volume / self.total_volume
        } else {
            0.0
        };
    }

    /// Returns a short summary.
    pub fn summary(&self) -> PackingSummary {
        PackingSummary::from(self)
    }
}

impl Default for PackingResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary statistics for a packing result.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackingSummary {
    /// Total items requested.
    pub total_requested: usize,
    /// Total items placed.
    pub total_placed: usize,
    /// Utilization percentage.
    pub utilization_percent: f64,
    /// Number of partitions.
    pub partitions: usize,
    /// Number of borrow operations.
    pub borrows: usize,
    /// Number of spill operations.
    pub spills: usize,
    /// Computation time in milliseconds.
    pub time_ms: u64,
    /// Strategy used.
    pub strategy: String,
}

impl From<&PackingResult> for PackingSummary {
    fn from(result: &PackingResult) -> Self {
        Self {
            total_requested: result.placements.len() + result.unplaced.len(),
            total_placed: result.placements.len(),
            utilization_percent: result.utilization * 100.0,
            partitions: result.partitions.len(),
            borrows: result.borrow_ops.len(),
            spills: result.spill_ops.len(),
            time_ms: result.execution_time_ms,
            strategy: if result.strategy.is_empty() {
                "unknown".to_string()
            } else {
                result.strategy.clone()
            },
        }
    }
}

impl fmt::Display for PackingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} placed, {:.1}% utilization, {} partitions, {} borrows, {} spills, {} ms ({})",
            self.total_placed,
            self.total_requested,
            self.utilization_percent,
            self.partitions,
            self.borrows,
            self.spills,
            self.time_ms,
            self.strategy
        )
    }
}
