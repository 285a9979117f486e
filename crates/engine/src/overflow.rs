//! Borrow and spill for items their own partition could not take.
//!
//! Borrowing moves the boundary shared with a neighbor toward the neighbor,
//! growing the source partition, and retries placement there. Spilling
//! places the item in the overflow partition. Both retries run a single BLF
//! attempt against everything already placed in the target partition.

use crate::blf::BlfState;
use crate::bsp::NodeId;
use crate::item::Item;
use crate::partition::Layout;
use crate::placer::PlacedBox;
use lanepack_core::config::OverflowPolicy;
use lanepack_core::geometry::{Axis, Box3, EPS};
use lanepack_core::result::{BorrowOp, SpillOp};

/// What happened to an item handed to the [`OverflowManager`].
#[derive(Debug, Clone, PartialEq)]
pub enum OverflowOutcome {
    /// Placed in its source partition after growing it.
    Borrowed(BorrowOp),
    /// Placed in the overflow partition.
    Spilled(SpillOp),
    /// No borrow or spill succeeded.
    Unplaced,
}

/// A boundary between a source partition and a donor.
struct Boundary {
    axis: Axis,
    value: f64,
    node: Option<NodeId>,
    donor_is_high: bool,
}

/// Applies the overflow policy to items that failed placement.
#[derive(Debug, Clone)]
pub struct OverflowManager {
    policy: OverflowPolicy,
    tolerance: f64,
    gap: f64,
    overflow_partition_id: Option<String>,
}

impl OverflowManager {
    /// Creates a manager.
    pub fn new(policy: OverflowPolicy, tolerance: f64, gap: f64) -> Self {
        Self {
            policy,
            tolerance,
            gap,
            overflow_partition_id: None,
        }
    }

    /// Sets the partition to spill into; defaults to the first partition without a group.
    pub fn with_overflow_partition(mut self, id: Option<String>) -> Self {
        self.overflow_partition_id = id;
        self
    }

    /// Handles one item. `source` is the index of the item's own partition, if it has one.
    ///
    /// On success the item is recorded in the partition that received it.
    pub fn resolve(
        &self,
        layout: &mut Layout,
        source: Option<usize>,
        item: &Item,
    ) -> OverflowOutcome {
        let outcome = match self.policy {
            OverflowPolicy::Disabled => OverflowOutcome::Unplaced,
            OverflowPolicy::BorrowFirst => match self.borrow(layout, source, item) {
                Some(op) => OverflowOutcome::Borrowed(op),
                None => self
                    .spill(layout, source, item)
                    .map_or(OverflowOutcome::Unplaced, OverflowOutcome::Spilled),
            },
            OverflowPolicy::SpillFirst => match self.spill(layout, source, item) {
                Some(op) => OverflowOutcome::Spilled(op),
                None => self
                    .borrow(layout, source, item)
                    .map_or(OverflowOutcome::Unplaced, OverflowOutcome::Borrowed),
            },
        };

        if outcome == OverflowOutcome::Unplaced {
            log::warn!("Item '{}' could not be borrowed or spilled", item.id());
        }
        outcome
    }

    fn borrow(&self, layout: &mut Layout, source: Option<usize>, item: &Item) -> Option<BorrowOp> {
        let src = source?;
        let neighbors = layout.partitions[src].neighbors.clone();

        for donor_id in &neighbors {
            let Some(donor) = layout.index_of(donor_id) else {
                continue;
            };
            if donor == src {
                continue;
            }
            if layout.partitions[donor].free_volume() + self.tolerance < item.volume() {
                log::debug!(
                    "Neighbor '{}' has {:.4} free, item '{}' needs {:.4}",
                    donor_id,
                    layout.partitions[donor].free_volume(),
                    item.id(),
                    item.volume()
                );
                continue;
            }
            if let Some(op) = self.borrow_from(layout, src, donor, item) {
                return Some(op);
            }
        }
        None
    }

    fn shared_boundary(&self, layout: &Layout, src: usize, donor: usize) -> Option<Boundary> {
        let leaves = (layout.partitions[src].leaf, layout.partitions[donor].leaf);
        let (axis, value, node) = match (&layout.tree, leaves) {
            (Some(tree), (Some(a), Some(b))) => {
                let shared = tree.shared_boundary(a, b)?;
                (shared.axis, shared.value, Some(shared.node))
            }
            _ => {
                let (axis, value) = layout.touching_face(src, donor, self.tolerance)?;
                if !self.faces_coincide(layout, src, donor, axis) {
                    log::debug!(
                        "Faces of '{}' and '{}' differ across {}, no borrow",
                        layout.partitions[src].id,
                        layout.partitions[donor].id,
                        axis
                    );
                    return None;
                }
                (axis, value, None)
            }
        };
        let donor_bounds = &layout.partitions[donor].bounds;
        Some(Boundary {
            axis,
            value,
            node,
            donor_is_high: (donor_bounds.min_on(axis) - value).abs() <= self.tolerance,
        })
    }

    /// True when both boxes span the same range on the two axes other than `axis`.
    fn faces_coincide(&self, layout: &Layout, src: usize, donor: usize, axis: Axis) -> bool {
        let (a, b) = (&layout.partitions[src].bounds, &layout.partitions[donor].bounds);
        let (u, v) = axis.others();
        [u, v].into_iter().all(|k| {
            (a.min_on(k) - b.min_on(k)).abs() <= self.tolerance
                && (a.max_on(k) - b.max_on(k)).abs() <= self.tolerance
        })
    }

    /// After a boundary move: every partition still holds its contents and the
    /// grown source overlaps no other partition.
    fn layout_holds(&self, layout: &Layout, src: usize) -> bool {
        let grown = &layout.partitions[src].bounds;
        layout.partitions.iter().enumerate().all(|(idx, partition)| {
            partition.contents_fit(&partition.bounds, self.tolerance)
                && (idx == src || !grown.intersects(&partition.bounds, self.tolerance))
        })
    }

    fn move_boundary(
        &self,
        layout: &mut Layout,
        src: usize,
        donor: usize,
        boundary: &Boundary,
        value: f64,
    ) -> Option<()> {
        match boundary.node {
            Some(node) => {
                layout.tree.as_mut()?.update_split(node, value)?;
                layout.refresh_bounds();
                Some(())
            }
            None => {
                let axis = boundary.axis;
                let (s, d) = (layout.partitions[src].bounds, layout.partitions[donor].bounds);
                let (s, d) = if boundary.donor_is_high {
                    (s.with_max_on(axis, value), d.with_min_on(axis, value))
                } else {
                    (s.with_min_on(axis, value), d.with_max_on(axis, value))
                };
                layout.partitions[src].bounds = s;
                layout.partitions[donor].bounds = d;
                Some(())
            }
        }
    }

    fn borrow_from(
        &self,
        layout: &mut Layout,
        src: usize,
        donor: usize,
        item: &Item,
    ) -> Option<BorrowOp> {
        let boundary = self.shared_boundary(layout, src, donor)?;
        let axis = boundary.axis;
        let donor_bounds: Box3 = layout.partitions[donor].bounds;

        let cross = donor_bounds.cross_section(axis);
        if cross <= EPS {
            return None;
        }
        let shift = (item.volume() / cross).max(item.shortest_dim());
        if shift >= donor_bounds.extent(axis) - self.tolerance {
            log::debug!(
                "Shift {:.4} would consume neighbor '{}'",
                shift,
                layout.partitions[donor].id
            );
            return None;
        }
        if layout.partitions[donor].free_volume() + self.tolerance < shift * cross {
            return None;
        }

        let target = if boundary.donor_is_high {
            boundary.value + shift
        } else {
            boundary.value - shift
        };
        let src_before = layout.partitions[src].bounds.volume();
        let donor_before = layout.partitions[donor].bounds.volume();
        self.move_boundary(layout, src, donor, &boundary, target)?;
        let gained = layout.partitions[src].bounds.volume() - src_before;
        let lost = donor_before - layout.partitions[donor].bounds.volume();

        let pose = if gained > EPS && self.layout_holds(layout, src) {
            self.place_into(layout, src, item)
        } else {
            None
        };

        let Some(pose) = pose else {
            self.move_boundary(layout, src, donor, &boundary, boundary.value);
            log::warn!(
                "Borrow for '{}' from '{}' failed, boundary restored",
                item.id(),
                layout.partitions[donor].id
            );
            return None;
        };

        layout.partitions[src].record(PlacedBox::new(item, pose));
        layout.partitions[src].borrowed_in += gained;
        layout.partitions[donor].borrowed_out += lost;

        let op = BorrowOp {
            from: layout.partitions[donor].id.clone(),
            to: layout.partitions[src].id.clone(),
            volume: gained,
        };
        log::info!(
            "Borrowed {:.4} from '{}' into '{}' for item '{}'",
            op.volume,
            op.from,
            op.to,
            item.id()
        );
        Some(op)
    }

    fn spill(&self, layout: &mut Layout, source: Option<usize>, item: &Item) -> Option<SpillOp> {
        let Some(target) = layout.overflow_partition(self.overflow_partition_id.as_deref()) else {
            log::warn!("No overflow partition to spill '{}' into", item.id());
            return None;
        };
        if Some(target) == source {
            return None;
        }

        let pose = self.place_into(layout, target, item)?;
        layout.partitions[target].record(PlacedBox::new(item, pose));

        let op = SpillOp {
            to: layout.partitions[target].id.clone(),
            item_id: item.id().to_string(),
        };
        log::info!("Spilled item '{}' into '{}'", op.item_id, op.to);
        Some(op)
    }

    fn place_into(&self, layout: &Layout, idx: usize, item: &Item) -> Option<Box3> {
        let occupied = layout.occupied_in(idx);
        let mut state = BlfState::new(
            layout.partitions[idx].bounds,
            &occupied,
            self.tolerance,
            self.gap,
        );
        state.try_place(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Partition;
    use crate::planner::LanePlanner;
    use crate::container::Container;
    use lanepack_core::geometry::vec3;

    fn zone(id: &str, group: Option<&str>, min_x: f64, max_x: f64) -> Partition {
        Partition::new(
            id,
            group.map(str::to_string),
            Box3::new(vec3(min_x, 0.0, 0.0), vec3(max_x, 1.0, 1.0)),
        )
    }

    fn boxed_zone(id: &str, group: &str, min: [f64; 3], max: [f64; 3]) -> Partition {
        Partition::new(
            id,
            Some(group.to_string()),
            Box3::new(vec3(min[0], min[1], min[2]), vec3(max[0], max[1], max[2])),
        )
    }

    fn fill(layout: &mut Layout, idx: usize, item: &Item) {
        let bounds = layout.partitions[idx].bounds;
        layout.partitions[idx].record(PlacedBox::new(item, bounds));
    }

    fn two_zones() -> Layout {
        Layout::from_zones(
            vec![
                zone("A", Some("GA"), 0.0, 10.0).with_neighbors(vec!["B".into()]),
                zone("B", Some("GB"), 10.0, 30.0).with_neighbors(vec!["A".into()]),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn test_borrow_between_zones() {
        let mut layout = two_zones();
        let first = Item::new("A1", "GA", 10.0, 1.0, 1.0);
        fill(&mut layout, 0, &first);

        let item = Item::new("A2", "GA", 10.0, 1.0, 1.0);
        let manager = OverflowManager::new(OverflowPolicy::BorrowFirst, EPS, 0.0);
        let outcome = manager.resolve(&mut layout, Some(0), &item);

        let OverflowOutcome::Borrowed(op) = outcome else {
            panic!("expected a borrow, got {outcome:?}");
        };
        assert_eq!(op.from, "B");
        assert_eq!(op.to, "A");
        assert!((op.volume - 10.0).abs() < 1e-9);
        assert_eq!(layout.partitions[0].bounds.max.x, 20.0);
        assert_eq!(layout.partitions[1].bounds.min.x, 20.0);
        assert_eq!(layout.partitions[0].borrowed_in, 10.0);
        assert_eq!(layout.partitions[1].borrowed_out, 10.0);
        assert_eq!(layout.partitions[0].placed.len(), 2);
    }

    #[test]
    fn test_borrow_rejected_when_neighbor_too_small() {
        let mut layout = Layout::from_zones(
            vec![
                zone("A", Some("GA"), 0.0, 10.0).with_neighbors(vec!["B".into()]),
                zone("B", Some("GB"), 10.0, 15.0).with_neighbors(vec!["A".into()]),
            ],
            Vec::new(),
        );
        let first = Item::new("A1", "GA", 10.0, 1.0, 1.0);
        fill(&mut layout, 0, &first);

        let item = Item::new("A2", "GA", 10.0, 1.0, 1.0);
        let manager = OverflowManager::new(OverflowPolicy::BorrowFirst, EPS, 0.0);
        assert_eq!(
            manager.resolve(&mut layout, Some(0), &item),
            OverflowOutcome::Unplaced
        );
        assert_eq!(layout.partitions[0].bounds.max.x, 10.0);
        assert_eq!(layout.partitions[1].bounds.min.x, 10.0);
    }

    #[test]
    fn test_borrow_reverted_when_donor_contents_block() {
        let mut layout = two_zones();
        let first = Item::new("A1", "GA", 10.0, 1.0, 1.0);
        fill(&mut layout, 0, &first);
        let blocker = Item::new("B1", "GB", 1.0, 1.0, 1.0);
        layout.partitions[1].record(PlacedBox::new(
            &blocker,
            Box3::new(vec3(10.0, 0.0, 0.0), vec3(11.0, 1.0, 1.0)),
        ));

        let item = Item::new("A2", "GA", 10.0, 1.0, 1.0);
        let manager = OverflowManager::new(OverflowPolicy::BorrowFirst, EPS, 0.0);
        assert_eq!(
            manager.resolve(&mut layout, Some(0), &item),
            OverflowOutcome::Unplaced
        );
        assert_eq!(layout.partitions[0].bounds.max.x, 10.0);
        assert_eq!(layout.partitions[1].bounds.min.x, 10.0);
        assert_eq!(layout.partitions[1].borrowed_out, 0.0);
    }

    #[test]
    fn test_spill_into_groupless_partition() {
        let mut layout = Layout::from_zones(
            vec![
                zone("A", Some("GA"), 0.0, 10.0),
                zone("OVER", None, 10.0, 30.0),
            ],
            Vec::new(),
        );
        let first = Item::new("A1", "GA", 10.0, 1.0, 1.0);
        fill(&mut layout, 0, &first);

        let item = Item::new("A2", "GA", 10.0, 1.0, 1.0);
        let manager = OverflowManager::new(OverflowPolicy::BorrowFirst, EPS, 0.0);
        let outcome = manager.resolve(&mut layout, Some(0), &item);
        assert_eq!(
            outcome,
            OverflowOutcome::Spilled(SpillOp {
                to: "OVER".into(),
                item_id: "A2".into(),
            })
        );
        assert_eq!(layout.partitions[1].placed.len(), 1);
    }

    #[test]
    fn test_spill_first_prefers_overflow() {
        let mut layout = Layout::from_zones(
            vec![
                zone("A", Some("GA"), 0.0, 10.0).with_neighbors(vec!["B".into()]),
                zone("B", Some("GB"), 10.0, 30.0).with_neighbors(vec!["A".into()]),
                zone("OVER", None, 30.0, 50.0),
            ],
            Vec::new(),
        );
        let first = Item::new("A1", "GA", 10.0, 1.0, 1.0);
        fill(&mut layout, 0, &first);

        let item = Item::new("A2", "GA", 10.0, 1.0, 1.0);
        let manager = OverflowManager::new(OverflowPolicy::SpillFirst, EPS, 0.0);
        assert!(matches!(
            manager.resolve(&mut layout, Some(0), &item),
            OverflowOutcome::Spilled(_)
        ));
        assert_eq!(layout.partitions[0].borrowed_in, 0.0);
    }

    #[test]
    fn test_disabled_policy() {
        let mut layout = two_zones();
        let item = Item::new("A2", "GA", 100.0, 1.0, 1.0);
        let manager = OverflowManager::new(OverflowPolicy::Disabled, EPS, 0.0);
        assert_eq!(
            manager.resolve(&mut layout, Some(0), &item),
            OverflowOutcome::Unplaced
        );
    }

    #[test]
    fn test_borrow_moves_bsp_boundary() {
        let container = Container::new(40.0, 1.0, 1.0);
        let items = vec![
            Item::new("A1", "GA", 10.0, 1.0, 1.0),
            Item::new("B1", "GB", 30.0, 1.0, 1.0),
        ];
        let refs: Vec<&Item> = items.iter().collect();
        let mut layout = LanePlanner::new(Axis::X, 0.05).plan(&container, &[], &refs);
        fill(&mut layout, 0, &items[0]);

        let extra = Item::new("A2", "GA", 5.0, 1.0, 1.0);
        let manager = OverflowManager::new(OverflowPolicy::BorrowFirst, EPS, 0.0);
        let outcome = manager.resolve(&mut layout, Some(0), &extra);

        assert!(matches!(outcome, OverflowOutcome::Borrowed(_)));
        assert_eq!(layout.partitions[0].bounds.max.x, 15.0);
        assert_eq!(layout.partitions[1].bounds.min.x, 15.0);
        let tree = layout.tree.as_ref().unwrap();
        assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn test_borrow_refused_when_faces_differ() {
        // A is twice as tall as B; C sits on top of B.
        let mut layout = Layout::from_zones(
            vec![
                boxed_zone("A", "GA", [0.0, 0.0, 0.0], [10.0, 2.0, 1.0])
                    .with_neighbors(vec!["B".into()]),
                boxed_zone("B", "GB", [10.0, 0.0, 0.0], [30.0, 1.0, 1.0]),
                boxed_zone("C", "GC", [10.0, 1.0, 0.0], [30.0, 2.0, 1.0]),
            ],
            Vec::new(),
        );
        let first = Item::new("A1", "GA", 10.0, 2.0, 1.0);
        fill(&mut layout, 0, &first);
        let resident = Item::new("C1", "GC", 20.0, 1.0, 1.0);
        fill(&mut layout, 2, &resident);

        let item = Item::new("A2", "GA", 5.0, 2.0, 1.0);
        let manager = OverflowManager::new(OverflowPolicy::BorrowFirst, EPS, 0.0);
        assert_eq!(
            manager.resolve(&mut layout, Some(0), &item),
            OverflowOutcome::Unplaced
        );
        assert_eq!(layout.partitions[0].bounds.max.x, 10.0);
        assert_eq!(layout.partitions[1].bounds.min.x, 10.0);
        assert_eq!(layout.partitions[0].borrowed_in, 0.0);
    }

    #[test]
    fn test_borrow_reports_gained_volume() {
        let mut layout = Layout::from_zones(
            vec![
                boxed_zone("A", "GA", [0.0, 0.0, 0.0], [10.0, 2.0, 3.0])
                    .with_neighbors(vec!["B".into()]),
                boxed_zone("B", "GB", [10.0, 0.0, 0.0], [30.0, 2.0, 3.0]),
            ],
            Vec::new(),
        );
        let first = Item::new("A1", "GA", 10.0, 2.0, 3.0);
        fill(&mut layout, 0, &first);

        let item = Item::new("A2", "GA", 4.0, 2.0, 3.0);
        let manager = OverflowManager::new(OverflowPolicy::BorrowFirst, EPS, 0.0);
        let OverflowOutcome::Borrowed(op) = manager.resolve(&mut layout, Some(0), &item) else {
            panic!("expected a borrow");
        };

        let grown = layout.partitions[0].bounds.volume() - 60.0;
        assert!((op.volume - grown).abs() < 1e-9);
        assert!((op.volume - 24.0).abs() < 1e-9);
        assert!((layout.partitions[1].borrowed_out - 24.0).abs() < 1e-9);
    }
}
