//! Uniform-slot grid stacking.
//!
//! The region is tiled by a lattice of slots sized by the per-axis maximum
//! item extents of the batch. Slots are visited in a fixed nested order and
//! each slot receives the first remaining item that fits there. Items are
//! never rotated.

use crate::item::Item;
use crate::placer::{PlaceOutcome, PlacedBox, Placer};
use lanepack_core::geometry::{fits_in, intersects, Axis, Box3, Vec3};
use std::cmp::Ordering;

/// Grid stacker.
#[derive(Debug, Clone)]
pub struct GridStacker {
    tolerance: f64,
    scan_order: [Axis; 3],
}

impl GridStacker {
    /// Creates a stacker scanning `Y`, then `Z`, then `X` (innermost).
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            scan_order: [Axis::Y, Axis::Z, Axis::X],
        }
    }

    /// Sets the scan order as (outer, middle, inner).
    pub fn with_scan_order(mut self, order: [Axis; 3]) -> Self {
        self.scan_order = order;
        self
    }

    /// Returns the slot size for a batch.
    pub fn slot_size(items: &[&Item]) -> Vec3 {
        items
            .iter()
            .fold(Vec3::zeros(), |acc, item| acc.sup(item.dims()))
    }

    fn slot_count(&self, region: &Box3, slot: &Vec3, axis: Axis) -> usize {
        let size = slot[axis.index()];
        if size <= 0.0 {
            return 0;
        }
        ((region.extent(axis) + self.tolerance) / size).floor().max(0.0) as usize
    }
}

impl Placer for GridStacker {
    fn name(&self) -> &'static str {
        "GridStack"
    }

    fn place(&self, items: &[&Item], region: &Box3, occupied: &[Box3]) -> PlaceOutcome {
        let mut ordered = items.to_vec();
        ordered.sort_by(|a, b| {
            b.volume()
                .partial_cmp(&a.volume())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id().cmp(b.id()))
        });

        let slot = Self::slot_size(&ordered);
        let [outer, middle, inner] = self.scan_order;
        let counts = [
            self.slot_count(region, &slot, outer),
            self.slot_count(region, &slot, middle),
            self.slot_count(region, &slot, inner),
        ];

        let mut taken = vec![false; ordered.len()];
        let mut boxes: Vec<Box3> = occupied.to_vec();
        let mut outcome = PlaceOutcome::default();

        'slots: for i in 0..counts[0] {
            for j in 0..counts[1] {
                for k in 0..counts[2] {
                    if taken.iter().all(|t| *t) {
                        break 'slots;
                    }

                    let mut origin = region.min;
                    origin[outer.index()] += i as f64 * slot[outer.index()];
                    origin[middle.index()] += j as f64 * slot[middle.index()];
                    origin[inner.index()] += k as f64 * slot[inner.index()];

                    for (idx, item) in ordered.iter().enumerate() {
                        if taken[idx] {
                            continue;
                        }
                        let pose = Box3::from_origin_and_dims(origin, *item.dims());
                        if !fits_in(&pose, region, self.tolerance) {
                            continue;
                        }
                        if boxes.iter().any(|b| intersects(&pose, b, self.tolerance)) {
                            continue;
                        }
                        taken[idx] = true;
                        boxes.push(pose);
                        outcome.placed.push(PlacedBox::new(item, pose));
                        break;
                    }
                }
            }
        }

        for (idx, item) in ordered.iter().enumerate() {
            if !taken[idx] {
                outcome.unplaced.push(item.id().to_string());
            }
        }

        log::debug!(
            "Grid stack: slot {:.2}x{:.2}x{:.2}, {} placed, {} unplaced",
            slot.x,
            slot.y,
            slot.z,
            outcome.placed.len(),
            outcome.unplaced.len()
        );
        outcome
    }
}
