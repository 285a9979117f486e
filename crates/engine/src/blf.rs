//! Bottom-Left-Fill placement with gravity settling.
//!
//! Candidate positions are the region origin plus, for every occupied box,
//! the three points projected from its max-x, max-y and max-z faces. Each
//! candidate is dropped along `Y` onto the highest box whose x/z footprint it
//! overlaps (or the region floor). Among the feasible candidates of all
//! allowed orientations, the lowest one wins, ties broken by `z` then `x`.

use crate::item::Item;
use crate::placer::{PlaceOutcome, PlacedBox, Placer};
use lanepack_core::geometry::{fits_in, intersects, vec3, Box3, Vec3};
use std::cmp::Ordering;

/// Order in which a pass visits the items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortPolicy {
    /// Ascending height (cheap first pass).
    #[default]
    AscendingHeight,
    /// Descending volume, then descending longest dimension, then id.
    DescendingVolume,
    /// Keep the caller's order.
    AsGiven,
}

/// Sorts `items` in place according to `policy`.
pub fn sort_items(items: &mut [&Item], policy: SortPolicy) {
    match policy {
        SortPolicy::AscendingHeight => items.sort_by(|a, b| {
            a.height()
                .partial_cmp(&b.height())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id().cmp(b.id()))
        }),
        SortPolicy::DescendingVolume => items.sort_by(|a, b| {
            b.volume()
                .partial_cmp(&a.volume())
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    b.longest_dim()
                        .partial_cmp(&a.longest_dim())
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.id().cmp(b.id()))
        }),
        SortPolicy::AsGiven => {}
    }
}

/// Incremental BLF state for one region.
#[derive(Debug, Clone)]
pub struct BlfState {
    region: Box3,
    occupied: Vec<Box3>,
    tolerance: f64,
    gap: f64,
}

impl BlfState {
    /// Creates a state over `region` pre-populated with `occupied` boxes.
    pub fn new(region: Box3, occupied: &[Box3], tolerance: f64, gap: f64) -> Self {
        Self {
            region,
            occupied: occupied.to_vec(),
            tolerance,
            gap,
        }
    }

    /// Returns every occupied box (pre-populated and placed).
    pub fn occupied(&self) -> &[Box3] {
        &self.occupied
    }

    /// Tries to place `item`; on success the pose is recorded and returned.
    pub fn try_place(&mut self, item: &Item) -> Option<Box3> {
        let mut best: Option<Box3> = None;

        for dims in item.orientations() {
            for anchor in self.anchors() {
                let Some(candidate) = self.settle(anchor, &dims) else {
                    continue;
                };
                if !self.is_feasible(&candidate) {
                    continue;
                }
                let better = match &best {
                    None => true,
                    Some(current) => prefers(&candidate, current, self.tolerance),
                };
                if better {
                    best = Some(candidate);
                }
            }
        }

        if let Some(pose) = best {
            log::trace!(
                "BLF placed '{}' at ({:.3}, {:.3}, {:.3})",
                item.id(),
                pose.min.x,
                pose.min.y,
                pose.min.z
            );
            self.occupied.push(pose);
        }
        best
    }

    fn anchors(&self) -> Vec<Vec3> {
        let mut anchors = Vec::with_capacity(1 + self.occupied.len() * 3);
        anchors.push(self.region.min);
        for b in &self.occupied {
            anchors.push(vec3(b.max.x + self.gap, b.min.y, b.min.z));
            anchors.push(vec3(b.min.x, b.max.y + self.gap, b.min.z));
            anchors.push(vec3(b.min.x, b.min.y, b.max.z + self.gap));
        }
        anchors
    }

    /// Drops a candidate onto the highest overlapping top, or the floor.
    fn settle(&self, anchor: Vec3, dims: &Vec3) -> Option<Box3> {
        let tol = self.tolerance;
        let r = &self.region;
        for i in 0..3 {
            if anchor[i] < r.min[i] - tol || anchor[i] + dims[i] > r.max[i] + tol {
                return None;
            }
        }

        let probe = Box3::from_origin_and_dims(anchor, *dims);
        let support = self
            .occupied
            .iter()
            .filter(|b| b.footprint_overlaps(&probe, tol))
            .map(|b| b.max.y + self.gap)
            .fold(None, |acc: Option<f64>, top| Some(acc.map_or(top, |a| a.max(top))));

        let y = support.unwrap_or(r.min.y).max(r.min.y);
        if y + dims.y > r.max.y + tol {
            return None;
        }
        Some(Box3::from_origin_and_dims(vec3(anchor.x, y, anchor.z), *dims))
    }

    fn is_feasible(&self, candidate: &Box3) -> bool {
        fits_in(candidate, &self.region, self.tolerance)
            && !self
                .occupied
                .iter()
                .any(|b| intersects(candidate, &b.expand(self.gap), self.tolerance))
    }
}

/// Lower y wins, then lower z, then lower x.
fn prefers(a: &Box3, b: &Box3, tol: f64) -> bool {
    for axis in [1, 2, 0] {
        let (va, vb) = (a.min[axis], b.min[axis]);
        if va < vb - tol {
            return true;
        }
        if va > vb + tol {
            return false;
        }
    }
    false
}

/// Runs one BLF pass over `items` in the given order.
pub fn run_blf(
    items: &[&Item],
    region: &Box3,
    occupied: &[Box3],
    tolerance: f64,
    gap: f64,
) -> PlaceOutcome {
    let mut state = BlfState::new(*region, occupied, tolerance, gap);
    let mut outcome = PlaceOutcome::default();

    for item in items {
        match state.try_place(item) {
            Some(pose) => outcome.placed.push(PlacedBox::new(item, pose)),
            None => outcome.unplaced.push(item.id().to_string()),
        }
    }
    outcome
}

/// Single-pass BLF placer.
#[derive(Debug, Clone)]
pub struct BlfPlacer {
    tolerance: f64,
    gap: f64,
    sort: SortPolicy,
}

impl BlfPlacer {
    /// Creates a placer that sorts by ascending height.
    pub fn new(tolerance: f64, gap: f64) -> Self {
        Self {
            tolerance,
            gap,
            sort: SortPolicy::AscendingHeight,
        }
    }

    /// Sets the ordering policy.
    pub fn with_sort(mut self, sort: SortPolicy) -> Self {
        self.sort = sort;
        self
    }
}

impl Placer for BlfPlacer {
    fn name(&self) -> &'static str {
        "Blf"
    }

    fn place(&self, items: &[&Item], region: &Box3, occupied: &[Box3]) -> PlaceOutcome {
        let mut ordered = items.to_vec();
        sort_items(&mut ordered, self.sort);
        run_blf(&ordered, region, occupied, self.tolerance, self.gap)
    }
}
