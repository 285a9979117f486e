//! Axis-aligned geometry kernel.
//!
//! All predicates take an explicit tolerance so that boxes sharing a face are
//! not reported as overlapping because of floating-point noise. `Y` is the
//! vertical axis: gravity settling moves boxes down along `Y`.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Three-component vector used for positions and extents.
pub type Vec3 = nalgebra::Vector3<f64>;

/// Default tolerance for geometric predicates.
pub const EPS: f64 = 1e-6;

/// Convenience constructor for [`Vec3`].
#[inline]
pub fn vec3(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3::new(x, y, z)
}

/// A coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Axis {
    /// Width axis.
    #[default]
    X,
    /// Vertical axis.
    Y,
    /// Depth axis.
    Z,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Returns the component index of this axis.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Returns the two axes perpendicular to this one.
    pub fn others(self) -> (Axis, Axis) {
        match self {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::X, Axis::Z),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// An axis-aligned box given by its min and max corners.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Box3 {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Box3 {
    /// Creates a box from its corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates a box anchored at `origin` with the given extents.
    pub fn from_origin_and_dims(origin: Vec3, dims: Vec3) -> Self {
        Self {
            min: origin,
            max: origin + dims,
        }
    }

    /// Creates a box at the world origin with the given extents.
    pub fn with_dims(width: f64, height: f64, depth: f64) -> Self {
        Self::from_origin_and_dims(Vec3::zeros(), vec3(width, height, depth))
    }

    /// Returns the extents `max - min`.
    #[inline]
    pub fn dims(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the volume, or zero if any extent is non-positive.
    pub fn volume(&self) -> f64 {
        let d = self.dims();
        if d.x <= 0.0 || d.y <= 0.0 || d.z <= 0.0 {
            return 0.0;
        }
        d.x * d.y * d.z
    }

    /// Returns true if `min <= max` on every axis.
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Returns true if any extent is below `tolerance`.
    pub fn is_degenerate(&self, tolerance: f64) -> bool {
        let d = self.dims();
        d.x < tolerance || d.y < tolerance || d.z < tolerance
    }

    /// Minimum coordinate along `axis`.
    #[inline]
    pub fn min_on(&self, axis: Axis) -> f64 {
        self.min[axis.index()]
    }

    /// Maximum coordinate along `axis`.
    #[inline]
    pub fn max_on(&self, axis: Axis) -> f64 {
        self.max[axis.index()]
    }

    /// Extent along `axis`.
    #[inline]
    pub fn extent(&self, axis: Axis) -> f64 {
        self.max_on(axis) - self.min_on(axis)
    }

    /// Area of the face perpendicular to `axis`.
    pub fn cross_section(&self, axis: Axis) -> f64 {
        let (a, b) = axis.others();
        self.extent(a).max(0.0) * self.extent(b).max(0.0)
    }

    /// Returns a copy with the min coordinate on `axis` replaced.
    pub fn with_min_on(mut self, axis: Axis, value: f64) -> Self {
        self.min[axis.index()] = value;
        self
    }

    /// Returns a copy with the max coordinate on `axis` replaced.
    pub fn with_max_on(mut self, axis: Axis, value: f64) -> Self {
        self.max[axis.index()] = value;
        self
    }

    /// Returns the center point.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns this box moved by `offset`.
    pub fn translate(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Returns this box grown by `margin` on every side.
    pub fn expand(&self, margin: f64) -> Self {
        let m = vec3(margin, margin, margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Returns true if this box lies inside `outer` (within `tolerance`).
    pub fn fits_in(&self, outer: &Box3, tolerance: f64) -> bool {
        fits_in(self, outer, tolerance)
    }

    /// Returns true if this box overlaps `other` by more than `tolerance`.
    pub fn intersects(&self, other: &Box3, tolerance: f64) -> bool {
        intersects(self, other, tolerance)
    }

    /// Returns true if the x/z footprints of the two boxes overlap.
    pub fn footprint_overlaps(&self, other: &Box3, tolerance: f64) -> bool {
        self.min.x + tolerance < other.max.x
            && self.max.x - tolerance > other.min.x
            && self.min.z + tolerance < other.max.z
            && self.max.z - tolerance > other.min.z
    }

    /// Returns the volume shared by two boxes.
    pub fn overlap_volume(&self, other: &Box3) -> f64 {
        let min = self.min.sup(&other.min);
        let max = self.max.inf(&other.max);
        Box3::new(min, max).volume()
    }

    /// Returns the longest axis (ties resolve to X, then Y).
    pub fn longest_axis(&self) -> Axis {
        longest_axis(self)
    }
}

impl Default for Box3 {
    fn default() -> Self {
        Self {
            min: Vec3::zeros(),
            max: Vec3::zeros(),
        }
    }
}

/// Returns the extents of `b`.
#[inline]
pub fn dims(b: &Box3) -> Vec3 {
    b.dims()
}

/// Returns the volume of `b` (zero if degenerate).
#[inline]
pub fn volume(b: &Box3) -> f64 {
    b.volume()
}

/// Returns true if `inner` lies completely inside `outer` within `tolerance`.
pub fn fits_in(inner: &Box3, outer: &Box3, tolerance: f64) -> bool {
    inner.min.x + tolerance >= outer.min.x
        && inner.min.y + tolerance >= outer.min.y
        && inner.min.z + tolerance >= outer.min.z
        && inner.max.x - tolerance <= outer.max.x
        && inner.max.y - tolerance <= outer.max.y
        && inner.max.z - tolerance <= outer.max.z
}

/// Returns true if `a` and `b` overlap by more than `tolerance` on every axis.
///
/// Boxes that merely share a face do not intersect.
pub fn intersects(a: &Box3, b: &Box3, tolerance: f64) -> bool {
    a.min.x + tolerance < b.max.x
        && a.max.x - tolerance > b.min.x
        && a.min.y + tolerance < b.max.y
        && a.max.y - tolerance > b.min.y
        && a.min.z + tolerance < b.max.z
        && a.max.z - tolerance > b.min.z
}

/// Returns the axis with the largest extent.
pub fn longest_axis(b: &Box3) -> Axis {
    longest_axis_of(&b.dims())
}

/// Returns the axis with the largest component of `dims`.
pub fn longest_axis_of(dims: &Vec3) -> Axis {
    if dims.x >= dims.y && dims.x >= dims.z {
        Axis::X
    } else if dims.y >= dims.z {
        Axis::Y
    } else {
        Axis::Z
    }
}
