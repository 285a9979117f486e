//! Greedy row/layer fill.
//!
//! Items are laid left to right along `X` in rows, rows advance along `Z`,
//! and full layers stack up along `Y`. Items keep their given orientation and
//! are visited in the caller's order.

use crate::item::Item;
use crate::placer::{PlaceOutcome, PlacedBox, Placer};
use lanepack_core::geometry::{fits_in, intersects, vec3, Box3};

/// Row filler.
#[derive(Debug, Clone)]
pub struct RowFiller {
    tolerance: f64,
    gap: f64,
}

impl RowFiller {
    /// Creates a row filler.
    pub fn new(tolerance: f64, gap: f64) -> Self {
        Self { tolerance, gap }
    }
}

impl Placer for RowFiller {
    fn name(&self) -> &'static str {
        "RowFill"
    }

    fn place(&self, items: &[&Item], region: &Box3, occupied: &[Box3]) -> PlaceOutcome {
        let mut outcome = PlaceOutcome::default();
        let mut boxes: Vec<Box3> = occupied.to_vec();
        let tol = self.tolerance;
        let gap = self.gap;

        let mut current_x = region.min.x;
        let mut current_y = region.min.y;
        let mut current_z = region.min.z;
        let mut row_depth = 0.0_f64;
        let mut layer_height = 0.0_f64;

        for item in items {
            let dims = *item.dims();

            // Next row in the current layer
            if current_x + dims.x > region.max.x + tol {
                current_x = region.min.x;
                current_z += row_depth + gap;
                row_depth = 0.0;
            }

            // Next layer
            if current_z + dims.z > region.max.z + tol {
                current_x = region.min.x;
                current_z = region.min.z;
                current_y += layer_height + gap;
                row_depth = 0.0;
                layer_height = 0.0;
            }

            let pose = Box3::from_origin_and_dims(vec3(current_x, current_y, current_z), dims);
            if !fits_in(&pose, region, tol) || boxes.iter().any(|b| intersects(&pose, b, tol)) {
                outcome.unplaced.push(item.id().to_string());
                continue;
            }

            boxes.push(pose);
            outcome.placed.push(PlacedBox::new(item, pose));

            current_x += dims.x + gap;
            row_depth = row_depth.max(dims.z);
            layer_height = layer_height.max(dims.y);
        }

        outcome
    }
}
