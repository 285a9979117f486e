//! Axis-aligned orientation enumeration for box items.

use crate::geometry::{Box3, Vec3, EPS};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis permutations in a fixed order, identity first.
const PERMUTATIONS: [(usize, usize, usize); 6] = [
    (0, 1, 2), // Identity
    (0, 2, 1), // Rotated 90° around X
    (1, 0, 2), // Rotated 90° around Z
    (1, 2, 0), // Rotated 90° around X then Z
    (2, 0, 1), // Rotated 90° around Y then X
    (2, 1, 0), // Rotated 90° around Y
];

/// Orientation constraint for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OrientationConstraint {
    /// Any of the distinct axis-aligned orientations.
    #[default]
    Any,
    /// Only orientations that keep the vertical (Y) extent unchanged.
    Upright,
    /// The given orientation only.
    Fixed,
}

impl OrientationConstraint {
    /// Maps a plain "rotatable" flag onto a constraint.
    pub fn from_rotatable(rotatable: bool) -> Self {
        if rotatable {
            Self::Any
        } else {
            Self::Fixed
        }
    }

    fn allows(self, perm: (usize, usize, usize)) -> bool {
        match self {
            Self::Any => true,
            Self::Upright => perm.1 == 1,
            Self::Fixed => perm == (0, 1, 2),
        }
    }
}

/// Returns every distinct orientation of `dims` allowed by `constraint`.
///
/// A cube yields one orientation, a box with two equal extents three, and a
/// box with three distinct extents six. The identity orientation is always
/// first and the order is deterministic.
pub fn orientations(dims: &Vec3, constraint: OrientationConstraint) -> Vec<Vec3> {
    let mut result: Vec<Vec3> = Vec::with_capacity(6);
    for perm in PERMUTATIONS {
        if !constraint.allows(perm) {
            continue;
        }
        let candidate = Vec3::new(dims[perm.0], dims[perm.1], dims[perm.2]);
        let duplicate = result
            .iter()
            .any(|existing| (existing - candidate).amax() <= EPS);
        if !duplicate {
            result.push(candidate);
        }
    }
    result
}

/// Returns true if `dims` fits within `extent` on every axis.
#[inline]
pub fn fits_extent(dims: &Vec3, extent: &Vec3, tolerance: f64) -> bool {
    dims.x <= extent.x + tolerance
        && dims.y <= extent.y + tolerance
        && dims.z <= extent.z + tolerance
}

/// Returns true if at least one allowed orientation fits inside `region`.
pub fn is_fittable(dims: &Vec3, constraint: OrientationConstraint, region: &Box3) -> bool {
    let extent = region.dims();
    orientations(dims, constraint)
        .iter()
        .any(|o| fits_extent(o, &extent, EPS))
}
