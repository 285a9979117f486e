//! The packing container.

use lanepack_core::geometry::{vec3, Box3, Vec3};
use lanepack_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A bounded container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// World-frame bounds.
    bounds: Box3,

    /// Partition that receives spilled items (defaults to the first groupless partition).
    overflow_partition_id: Option<String>,
}

impl Container {
    /// Creates a container at the origin with the given extents.
    pub fn new(width: f64, height: f64, depth: f64) -> Self {
        Self::from_bounds(Box3::with_dims(width, height, depth))
    }

    /// Creates a container from explicit bounds.
    pub fn from_bounds(bounds: Box3) -> Self {
        Self {
            bounds,
            overflow_partition_id: None,
        }
    }

    /// Moves the container so that its min corner is `origin`.
    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.bounds = Box3::from_origin_and_dims(origin, self.bounds.dims());
        self
    }

    /// Designates the overflow partition.
    pub fn with_overflow_partition(mut self, id: impl Into<String>) -> Self {
        self.overflow_partition_id = Some(id.into());
        self
    }

    /// Returns the bounds.
    pub fn bounds(&self) -> &Box3 {
        &self.bounds
    }

    /// Returns the extents.
    pub fn dims(&self) -> Vec3 {
        self.bounds.dims()
    }

    /// Returns the designated overflow partition id.
    pub fn overflow_partition_id(&self) -> Option<&str> {
        self.overflow_partition_id.as_deref()
    }

    /// Returns the volume.
    pub fn volume(&self) -> f64 {
        self.bounds.volume()
    }

    /// Checks that all extents are finite and positive.
    pub fn validate(&self) -> Result<()> {
        let finite = self.bounds.min.iter().chain(self.bounds.max.iter()).all(|v| v.is_finite());
        if !finite {
            return Err(Error::InvalidContainer(
                "Container bounds must be finite".into(),
            ));
        }
        let d = self.dims();
        if d.x <= 0.0 || d.y <= 0.0 || d.z <= 0.0 {
            return Err(Error::InvalidContainer(
                "All dimensions must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::from_bounds(Box3::new(Vec3::zeros(), vec3(1.0, 1.0, 1.0)))
    }
}
