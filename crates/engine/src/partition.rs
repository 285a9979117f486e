//! Partitions (group lanes and caller zones) and the run-scoped layout.

use crate::bsp::{BspTree, NodeId};
use crate::placer::PlacedBox;
use lanepack_core::geometry::{Axis, Box3, EPS};
use lanepack_core::result::PartitionSummary;

/// Color of the deferred lane.
pub const DEFERRED_COLOR: &str = "#E74C3C";

/// Color of lanes without a palette entry.
pub const DEFAULT_COLOR: &str = "#3498DB";

const PALETTE: [&str; 6] = [
    "#F1C40F", "#2ECC71", "#9B59B6", "#E67E22", "#1ABC9C", "#34495E",
];

/// Returns the display color of a group, stable across runs.
pub fn color_for_group(group_id: Option<&str>) -> &'static str {
    match group_id {
        None => DEFERRED_COLOR,
        Some("") => DEFAULT_COLOR,
        Some(id) => {
            let hash = id
                .bytes()
                .fold(0x811c_9dc5_u32, |h, b| (h ^ b as u32).wrapping_mul(0x0100_0193));
            PALETTE[hash as usize % PALETTE.len()]
        }
    }
}

/// A region of the container reserved for one group (or for overflow).
#[derive(Debug, Clone)]
pub struct Partition {
    /// Partition id.
    pub id: String,
    /// Owning group; `None` for overflow/deferred partitions.
    pub group_id: Option<String>,
    /// Current bounds.
    pub bounds: Box3,
    /// Volume reserved at planning time.
    pub reserved_volume: f64,
    /// Volume of placed items.
    pub used_volume: f64,
    /// Volume gained from neighbors.
    pub borrowed_in: f64,
    /// Volume given to neighbors.
    pub borrowed_out: f64,
    /// Ids of adjacent partitions.
    pub neighbors: Vec<String>,
    /// Boxes placed here, in placement order.
    pub placed: Vec<PlacedBox>,
    /// BSP leaf backing this partition, if planned.
    pub leaf: Option<NodeId>,
    /// Display label.
    pub label: String,
    /// Display color.
    pub color: String,
    /// Share of the container width along the split axis.
    pub ratio: f64,
}

impl Partition {
    /// Creates an empty partition reserving its whole bounds.
    pub fn new(id: impl Into<String>, group_id: Option<String>, bounds: Box3) -> Self {
        let id = id.into();
        let color = color_for_group(group_id.as_deref()).to_string();
        Self {
            label: id.clone(),
            id,
            group_id,
            reserved_volume: bounds.volume(),
            bounds,
            used_volume: 0.0,
            borrowed_in: 0.0,
            borrowed_out: 0.0,
            neighbors: Vec::new(),
            placed: Vec::new(),
            leaf: None,
            color,
            ratio: 0.0,
        }
    }

    /// Sets the neighbor ids.
    pub fn with_neighbors(mut self, neighbors: Vec<String>) -> Self {
        self.neighbors = neighbors;
        self
    }

    /// Volume still available under the reservation.
    pub fn free_volume(&self) -> f64 {
        self.reserved_volume + self.borrowed_in - self.borrowed_out - self.used_volume
    }

    /// Records a placed box.
    pub fn record(&mut self, placed: PlacedBox) {
        self.used_volume += placed.pose.volume();
        self.placed.push(placed);
    }

    /// Returns true if every placed box fits inside `bounds`.
    pub fn contents_fit(&self, bounds: &Box3, tolerance: f64) -> bool {
        self.placed.iter().all(|p| p.pose.fits_in(bounds, tolerance))
    }

    /// Builds the reported summary.
    pub fn summary(&self) -> PartitionSummary {
        PartitionSummary {
            id: self.id.clone(),
            group_id: self.group_id.clone(),
            bounds: self.bounds,
            reserved_volume: self.reserved_volume,
            used_volume: self.used_volume,
            borrowed_in: self.borrowed_in,
            borrowed_out: self.borrowed_out,
            item_count: self.placed.len(),
            label: self.label.clone(),
            color: self.color.clone(),
            ratio: self.ratio,
        }
    }
}

/// Partitions of one run plus the tree and obstacles they share.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// Partitions in layout order.
    pub partitions: Vec<Partition>,
    /// BSP tree for planned lanes; `None` for caller zones.
    pub tree: Option<BspTree>,
    /// Pre-placed obstacles.
    pub obstacles: Vec<Box3>,
}

impl Layout {
    /// Creates a layout from caller zones.
    pub fn from_zones(partitions: Vec<Partition>, obstacles: Vec<Box3>) -> Self {
        Self {
            partitions,
            tree: None,
            obstacles,
        }
    }

    /// Returns true if there are no partitions.
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Returns the index of a partition.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.partitions.iter().position(|p| p.id == id)
    }

    /// Returns the partition owned by `group_id`.
    pub fn lane_for_group(&self, group_id: &str) -> Option<usize> {
        self.partitions
            .iter()
            .position(|p| p.group_id.as_deref() == Some(group_id))
    }

    /// Returns the first partition without a group.
    pub fn first_groupless(&self) -> Option<usize> {
        self.partitions.iter().position(|p| p.group_id.is_none())
    }

    /// Returns the spill target: `preferred` if it exists, else the first groupless partition.
    pub fn overflow_partition(&self, preferred: Option<&str>) -> Option<usize> {
        preferred
            .and_then(|id| self.index_of(id))
            .or_else(|| self.first_groupless())
    }

    /// Boxes a placer must avoid inside partition `idx`.
    pub fn occupied_in(&self, idx: usize) -> Vec<Box3> {
        let partition = &self.partitions[idx];
        partition
            .placed
            .iter()
            .map(|p| p.pose)
            .chain(
                self.obstacles
                    .iter()
                    .filter(|o| o.intersects(&partition.bounds, EPS))
                    .copied(),
            )
            .collect()
    }

    /// Copies leaf bounds from the tree into the partitions bound to them.
    pub fn refresh_bounds(&mut self) {
        let Some(tree) = &self.tree else {
            return;
        };
        for partition in &mut self.partitions {
            if let Some(bounds) = partition.leaf.and_then(|leaf| tree.bounds(leaf)) {
                partition.bounds = bounds;
            }
        }
    }

    /// Returns the axis and plane coordinate of a face shared by two partitions.
    ///
    /// Used when no tree links them. The faces must touch and overlap on the
    /// two remaining axes.
    pub fn touching_face(&self, a: usize, b: usize, tolerance: f64) -> Option<(Axis, f64)> {
        let ba = &self.partitions[a].bounds;
        let bb = &self.partitions[b].bounds;
        Axis::ALL.into_iter().find_map(|axis| {
            let (u, v) = axis.others();
            let overlaps = |k: Axis| {
                ba.min_on(k) + tolerance < bb.max_on(k) && bb.min_on(k) + tolerance < ba.max_on(k)
            };
            if !overlaps(u) || !overlaps(v) {
                return None;
            }
            if (ba.max_on(axis) - bb.min_on(axis)).abs() <= tolerance {
                Some((axis, ba.max_on(axis)))
            } else if (bb.max_on(axis) - ba.min_on(axis)).abs() <= tolerance {
                Some((axis, ba.min_on(axis)))
            } else {
                None
            }
        })
    }

    /// Summaries of all partitions.
    pub fn summaries(&self) -> Vec<PartitionSummary> {
        self.partitions.iter().map(Partition::summary).collect()
    }
}
