//! Lane planning: one lane per group, sized by demand, plus a deferred lane.
//!
//! Lanes are carved from the container along one split axis, starting at the
//! container min: the deferred lane (for unconfirmed items) first, then group
//! lanes by ascending priority. The last lane created extends to the
//! container max.

use crate::bsp::BspTree;
use crate::container::Container;
use crate::item::{Group, Item};
use crate::partition::{Layout, Partition};
use lanepack_core::config::Config;
use lanepack_core::geometry::{Axis, EPS};
use std::collections::HashMap;

/// Id of the lane for unconfirmed items.
pub const DEFERRED_LANE_ID: &str = "LANE_DEFERRED";

/// Returns the lane id of a group.
pub fn lane_id(group_id: &str) -> String {
    format!("LANE_{group_id}")
}

/// Volume demand of one run.
#[derive(Debug, Clone, Default)]
pub struct Demand {
    /// Groups in layout order, with their effective demand.
    pub groups: Vec<(Group, f64)>,
    /// Total confirmed item volume.
    pub total_confirmed: f64,
    /// Total unconfirmed item volume.
    pub total_unconfirmed: f64,
}

impl Demand {
    /// Confirmed plus unconfirmed volume.
    pub fn total(&self) -> f64 {
        self.total_confirmed + self.total_unconfirmed
    }

    /// Sum of the effective group demands.
    pub fn total_effective(&self) -> f64 {
        self.groups.iter().map(|(_, d)| d).sum()
    }
}

struct LaneDraft {
    id: String,
    group: Option<Group>,
    width: f64,
}

/// Plans group lanes over a container.
#[derive(Debug, Clone)]
pub struct LanePlanner {
    split_axis: Axis,
    min_thickness: f64,
}

impl LanePlanner {
    /// Creates a planner.
    pub fn new(split_axis: Axis, min_thickness: f64) -> Self {
        Self {
            split_axis,
            min_thickness,
        }
    }

    /// Creates a planner from the run configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.split_axis, config.min_lane_thickness)
    }

    /// Computes per-group demand.
    ///
    /// Groups referenced by items but missing from `groups` get default
    /// settings. Groups without confirmed volume are left out. Groups come
    /// back sorted by ascending priority, otherwise in first-seen order.
    pub fn demand(&self, groups: &[Group], items: &[&Item]) -> Demand {
        let mut known: Vec<Group> = groups.to_vec();
        let mut confirmed: HashMap<&str, f64> = HashMap::new();
        let mut demand = Demand::default();

        for item in items {
            if item.is_confirmed() {
                *confirmed.entry(item.group_id()).or_insert(0.0) += item.volume();
                demand.total_confirmed += item.volume();
                if !known.iter().any(|g| g.id == item.group_id()) {
                    known.push(Group::new(item.group_id()));
                }
            } else {
                demand.total_unconfirmed += item.volume();
            }
        }

        let total_confirmed = demand.total_confirmed;
        demand.groups = known
            .into_iter()
            .filter_map(|group| {
                let volume = confirmed.get(group.id.as_str()).copied().unwrap_or(0.0);
                if volume <= EPS {
                    return None;
                }
                let effective = volume
                    .max(group.min_volume.unwrap_or(0.0))
                    .max(group.reserve_ratio * total_confirmed);
                Some((group, effective))
            })
            .collect();
        demand.groups.sort_by_key(|(g, _)| g.priority);
        demand
    }

    /// Plans lanes and binds each to a BSP leaf.
    pub fn plan(&self, container: &Container, groups: &[Group], items: &[&Item]) -> Layout {
        let bounds = *container.bounds();
        let mut tree = BspTree::new(bounds);
        let demand = self.demand(groups, items);
        let axis = self.split_axis;
        let total = demand.total();
        let width = bounds.extent(axis);

        if total < EPS || width < EPS {
            log::warn!("Nothing to plan: total demand {:.4}, width {:.4}", total, width);
            return Layout {
                partitions: Vec::new(),
                tree: Some(tree),
                obstacles: Vec::new(),
            };
        }

        let deferred_width = width * demand.total_unconfirmed / total;
        let confirmed_width = width * demand.total_confirmed / total;
        let total_effective = demand.total_effective();

        let mut drafts = Vec::new();
        if deferred_width > self.min_thickness {
            drafts.push(LaneDraft {
                id: DEFERRED_LANE_ID.to_string(),
                group: None,
                width: deferred_width,
            });
        } else if demand.total_unconfirmed > 0.0 {
            log::warn!(
                "Deferred lane skipped: width {:.4} below minimum {:.4}",
                deferred_width,
                self.min_thickness
            );
        }
        for (group, effective) in &demand.groups {
            let lane_width = confirmed_width * effective / total_effective;
            if lane_width <= self.min_thickness {
                log::warn!(
                    "Lane for group '{}' skipped: width {:.4} below minimum {:.4}",
                    group.id,
                    lane_width,
                    self.min_thickness
                );
                continue;
            }
            drafts.push(LaneDraft {
                id: lane_id(&group.id),
                group: Some(group.clone()),
                width: lane_width,
            });
        }

        let mut partitions: Vec<Partition> = Vec::with_capacity(drafts.len());
        let last = drafts.len().saturating_sub(1);

        // Lanes are carved from the low end; the residual is the only free leaf.
        for (i, draft) in drafts.into_iter().enumerate() {
            let Some(current) = tree.find_free_leaf(0.0) else {
                break;
            };
            let rest = tree.bounds(current).map_or(0.0, |b| b.extent(axis));
            let share = if i == last || rest <= EPS {
                1.0
            } else {
                draft.width / rest
            };
            let Some(outcome) = tree.split_by_ratio(current, axis, share) else {
                log::warn!("Lane '{}' could not be carved", draft.id);
                break;
            };
            tree.bind_partition(outcome.allocated, draft.id.as_str());

            let Some(lane_bounds) = tree.bounds(outcome.allocated) else {
                continue;
            };
            let ratio = lane_bounds.extent(axis) / width;
            let name = match &draft.group {
                Some(group) => group.display_name().to_string(),
                None => "Deferred".to_string(),
            };

            let mut partition = Partition::new(
                draft.id,
                draft.group.map(|g| g.id),
                lane_bounds,
            );
            partition.leaf = Some(outcome.allocated);
            partition.ratio = ratio;
            partition.label = format!("{} ({:.1}%)", name, ratio * 100.0);

            log::info!(
                "Lane '{}' on {}: [{:.3}, {:.3}], volume {:.3}",
                partition.id,
                axis,
                lane_bounds.min_on(axis),
                lane_bounds.max_on(axis),
                partition.reserved_volume
            );
            partitions.push(partition);
        }

        let ids: Vec<String> = partitions.iter().map(|p| p.id.clone()).collect();
        for (i, partition) in partitions.iter_mut().enumerate() {
            if i > 0 {
                partition.neighbors.push(ids[i - 1].clone());
            }
            if i + 1 < ids.len() {
                partition.neighbors.push(ids[i + 1].clone());
            }
        }

        Layout {
            partitions,
            tree: Some(tree),
            obstacles: Vec::new(),
        }
    }
}
