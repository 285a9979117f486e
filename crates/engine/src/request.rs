//! JSON request types and their conversion into engine inputs.

use crate::container::Container;
use crate::item::{validate_batch, Group, Item};
use crate::partition::Partition;
use lanepack_core::config::{Config, OverflowPolicy, PositionConvention, Strategy};
use lanepack_core::geometry::{vec3, Box3, EPS};
use lanepack_core::rotation::OrientationConstraint;
use lanepack_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A packing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingRequest {
    /// Container to pack into.
    pub container: ContainerRequest,

    /// Items to place.
    pub items: Vec<ItemRequest>,

    /// Group settings; groups only referenced by items get defaults.
    #[serde(default)]
    pub groups: Vec<Group>,

    /// Caller-defined partitions replacing planned lanes.
    #[serde(default)]
    pub zones: Vec<ZoneRequest>,

    /// Pre-placed boxes no item may overlap.
    #[serde(default)]
    pub obstacles: Vec<BoxRequest>,

    /// Placement strategy.
    #[serde(default)]
    pub strategy: Option<Strategy>,

    /// Overflow policy.
    #[serde(default)]
    pub overflow_policy: Option<OverflowPolicy>,

    /// Reported position convention.
    #[serde(default)]
    pub position_convention: Option<PositionConvention>,

    /// RNG seed for the optimizer.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Optimizer iteration budget.
    #[serde(default)]
    pub max_iterations: Option<u64>,
}

/// Container extents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerRequest {
    /// Extent along X.
    pub width: f64,
    /// Extent along Y (vertical).
    pub height: f64,
    /// Extent along Z.
    pub depth: f64,
    /// World position of the min corner.
    #[serde(default)]
    pub origin: Option<[f64; 3]>,
    /// Partition receiving spilled items.
    #[serde(default)]
    pub overflow_partition_id: Option<String>,
}

/// One item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRequest {
    /// Unique identifier.
    pub id: String,
    /// Owning group.
    #[serde(default = "default_group")]
    pub group_id: String,
    /// Extent along X.
    pub width: f64,
    /// Extent along Y.
    pub height: f64,
    /// Extent along Z.
    pub depth: f64,
    /// Weight (informational).
    #[serde(default)]
    pub weight: Option<f64>,
    /// Unconfirmed items go to the deferred lane.
    #[serde(default = "default_true")]
    pub confirmed: bool,
    /// Whether the item may be rotated.
    #[serde(default = "default_true")]
    pub rotatable: bool,
    /// Explicit orientation constraint (overrides `rotatable`).
    #[serde(default)]
    pub orientation: Option<OrientationConstraint>,
}

/// A caller-defined partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneRequest {
    /// Partition id.
    pub id: String,
    /// Owning group; absent for overflow zones.
    #[serde(default)]
    pub group_id: Option<String>,
    /// Min corner.
    pub min: [f64; 3],
    /// Max corner.
    pub max: [f64; 3],
    /// Ids of zones that may lend space.
    #[serde(default)]
    pub neighbors: Vec<String>,
}

/// An axis-aligned box given by its corners.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoxRequest {
    /// Min corner.
    pub min: [f64; 3],
    /// Max corner.
    pub max: [f64; 3],
}

impl BoxRequest {
    /// Converts to a [`Box3`].
    pub fn to_box(&self) -> Box3 {
        Box3::new(
            vec3(self.min[0], self.min[1], self.min[2]),
            vec3(self.max[0], self.max[1], self.max[2]),
        )
    }
}

fn default_group() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

impl ItemRequest {
    /// Converts to an engine item.
    pub fn to_item(&self) -> Item {
        let mut item = Item::new(
            self.id.clone(),
            self.group_id.clone(),
            self.width,
            self.height,
            self.depth,
        )
        .with_confirmed(self.confirmed)
        .with_rotatable(self.rotatable);

        if let Some(weight) = self.weight {
            item = item.with_weight(weight);
        }
        if let Some(constraint) = self.orientation {
            item = item.with_orientation(constraint);
        }
        item
    }
}

impl ZoneRequest {
    /// Returns the zone bounds.
    pub fn bounds(&self) -> Box3 {
        BoxRequest {
            min: self.min,
            max: self.max,
        }
        .to_box()
    }
}

impl PackingRequest {
    /// Parses a request from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds the container.
    pub fn container(&self) -> Container {
        let c = &self.container;
        let mut container = Container::new(c.width, c.height, c.depth);
        if let Some([x, y, z]) = c.origin {
            container = container.with_origin(vec3(x, y, z));
        }
        if let Some(id) = &c.overflow_partition_id {
            container = container.with_overflow_partition(id.clone());
        }
        container
    }

    /// Builds the items.
    pub fn items(&self) -> Vec<Item> {
        self.items.iter().map(ItemRequest::to_item).collect()
    }

    /// Builds the obstacle boxes.
    pub fn obstacles(&self) -> Vec<Box3> {
        self.obstacles.iter().map(BoxRequest::to_box).collect()
    }

    /// Builds partitions from the zones.
    pub fn partitions(&self) -> Vec<Partition> {
        self.zones
            .iter()
            .map(|z| {
                let mut partition = Partition::new(z.id.clone(), z.group_id.clone(), z.bounds())
                    .with_neighbors(z.neighbors.clone());
                if let Some(group) = &z.group_id {
                    partition.label = group.clone();
                }
                partition
            })
            .collect()
    }

    /// Merges the request-level overrides into `config`.
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(policy) = self.overflow_policy {
            config.overflow_policy = policy;
        }
        if let Some(convention) = self.position_convention {
            config.position_convention = convention;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(iterations) = self.max_iterations {
            config.max_iterations = iterations;
        }
        config
    }

    /// Rejects malformed input before any placement.
    pub fn validate(&self) -> Result<()> {
        let container = self.container();
        container.validate()?;
        let bounds = *container.bounds();

        validate_batch(&self.items(), &self.groups)?;
        self.validate_zones(&bounds)?;

        for obstacle in self.obstacles() {
            if !obstacle.is_valid() || obstacle.is_degenerate(EPS) {
                return Err(Error::InvalidContainer(
                    "Obstacles must have positive extents".into(),
                ));
            }
        }
        Ok(())
    }

    fn validate_zones(&self, container: &Box3) -> Result<()> {
        let zone_ids: HashSet<&str> = self.zones.iter().map(|z| z.id.as_str()).collect();
        if zone_ids.len() != self.zones.len() {
            return Err(Error::InvalidZone("Zone ids must be unique".into()));
        }

        for (i, zone) in self.zones.iter().enumerate() {
            let b = zone.bounds();
            if zone.id.is_empty() {
                return Err(Error::InvalidZone("Zone id must not be empty".into()));
            }
            if !b.is_valid() || b.is_degenerate(EPS) {
                return Err(Error::InvalidZone(format!(
                    "Zone '{}' must have positive extents",
                    zone.id
                )));
            }
            if !b.fits_in(container, EPS) {
                return Err(Error::InvalidZone(format!(
                    "Zone '{}' lies outside the container",
                    zone.id
                )));
            }
            if let Some(missing) = zone.neighbors.iter().find(|n| !zone_ids.contains(n.as_str())) {
                return Err(Error::InvalidZone(format!(
                    "Zone '{}' names unknown neighbor '{}'",
                    zone.id, missing
                )));
            }
            if let Some(other) = self.zones[i + 1..]
                .iter()
                .find(|other| other.bounds().intersects(&b, EPS))
            {
                return Err(Error::InvalidZone(format!(
                    "Zones '{}' and '{}' overlap",
                    zone.id, other.id
                )));
            }
        }
        Ok(())
    }
}
