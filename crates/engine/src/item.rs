//! Items and groups.

use lanepack_core::geometry::{vec3, Vec3};
use lanepack_core::rotation::{orientations, OrientationConstraint};
use lanepack_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A rigid box to be packed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier.
    id: String,

    /// Owning group.
    group_id: String,

    /// Dimensions (width, height, depth) along (x, y, z).
    dims: Vec3,

    /// Whether the item may be rotated.
    rotatable: bool,

    /// Optional weight (carried through, not used by placement).
    weight: Option<f64>,

    /// Confirmed items are packed in their group's lane, others in the deferred lane.
    confirmed: bool,

    /// Explicit orientation constraint; derived from `rotatable` when absent.
    orientation: Option<OrientationConstraint>,
}

impl Item {
    /// Creates a confirmed, rotatable item.
    pub fn new(
        id: impl Into<String>,
        group_id: impl Into<String>,
        width: f64,
        height: f64,
        depth: f64,
    ) -> Self {
        Self {
            id: id.into(),
            group_id: group_id.into(),
            dims: vec3(width, height, depth),
            rotatable: true,
            weight: None,
            confirmed: true,
            orientation: None,
        }
    }

    /// Sets the weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Sets the confirmed flag.
    pub fn with_confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }

    /// Sets whether the item may be rotated.
    pub fn with_rotatable(mut self, rotatable: bool) -> Self {
        self.rotatable = rotatable;
        self
    }

    /// Sets an explicit orientation constraint.
    pub fn with_orientation(mut self, constraint: OrientationConstraint) -> Self {
        self.orientation = Some(constraint);
        self
    }

    /// Returns the id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the group id.
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Returns the dimensions.
    pub fn dims(&self) -> &Vec3 {
        &self.dims
    }

    /// Returns the height (y extent).
    pub fn height(&self) -> f64 {
        self.dims.y
    }

    /// Returns the weight.
    pub fn weight(&self) -> Option<f64> {
        self.weight
    }

    /// Returns true if the item is confirmed.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Returns true if the item may be rotated.
    pub fn is_rotatable(&self) -> bool {
        self.rotatable
    }

    /// Returns the effective orientation constraint.
    pub fn orientation_constraint(&self) -> OrientationConstraint {
        self.orientation
            .unwrap_or_else(|| OrientationConstraint::from_rotatable(self.rotatable))
    }

    /// Returns the allowed orientations, identity first.
    pub fn orientations(&self) -> Vec<Vec3> {
        orientations(&self.dims, self.orientation_constraint())
    }

    /// Returns the volume.
    pub fn volume(&self) -> f64 {
        self.dims.x * self.dims.y * self.dims.z
    }

    /// Returns the longest dimension.
    pub fn longest_dim(&self) -> f64 {
        self.dims.max()
    }

    /// Returns the shortest dimension.
    pub fn shortest_dim(&self) -> f64 {
        self.dims.min()
    }

    /// Checks dimensions and weight.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidItem("Item id must not be empty".into()));
        }
        if self.dims.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(Error::InvalidItem(format!(
                "All dimensions for '{}' must be positive",
                self.id
            )));
        }
        if let Some(weight) = self.weight {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidItem(format!(
                    "Weight for '{}' cannot be negative",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// An ownership group with its space reservation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Unique identifier.
    pub id: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Minimum share of the total confirmed volume reserved for this group.
    #[serde(default)]
    pub reserve_ratio: f64,

    /// Minimum reserved volume.
    #[serde(default)]
    pub min_volume: Option<f64>,

    /// Lanes are laid out by ascending priority.
    #[serde(default)]
    pub priority: i32,
}

impl Group {
    /// Creates a group with default settings.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            reserve_ratio: 0.0,
            min_volume: None,
            priority: 0,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the reserve ratio.
    pub fn with_reserve_ratio(mut self, ratio: f64) -> Self {
        self.reserve_ratio = ratio;
        self
    }

    /// Sets the minimum reserved volume.
    pub fn with_min_volume(mut self, volume: f64) -> Self {
        self.min_volume = Some(volume);
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Returns the display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Checks the reservation settings.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidGroup("Group id must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.reserve_ratio) {
            return Err(Error::InvalidGroup(format!(
                "Reserve ratio for '{}' must be in [0, 1], got {}",
                self.id, self.reserve_ratio
            )));
        }
        if let Some(v) = self.min_volume {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::InvalidGroup(format!(
                    "Minimum volume for '{}' cannot be negative",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Checks a batch of items and groups: at least one item, unique ids, valid values.
pub fn validate_batch(items: &[Item], groups: &[Group]) -> Result<()> {
    if items.is_empty() {
        return Err(Error::EmptyRequest);
    }
    let mut ids = HashSet::new();
    for item in items {
        item.validate()?;
        if !ids.insert(item.id()) {
            return Err(Error::InvalidItem(format!("Duplicate item id '{}'", item.id())));
        }
    }

    let mut group_ids = HashSet::new();
    for group in groups {
        group.validate()?;
        if !group_ids.insert(group.id.as_str()) {
            return Err(Error::InvalidGroup(format!("Duplicate group id '{}'", group.id)));
        }
    }
    Ok(())
}
