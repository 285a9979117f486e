//! # lanepack Core
//!
//! Shared kernel for the lanepack 3D packing engine.
//!
//! ## Core Components
//!
//! - **Geometry kernel**: `Vec3`, `Box3`, `Axis` and the tolerance-aware
//!   `fits_in` / `intersects` predicates
//! - **Rotation enumerator**: distinct axis-aligned orientations of a box
//! - **SA framework**: generic simulated annealing over caller-defined solutions
//! - **Config / result types**: run configuration, placements and packing results
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod config;
pub mod error;
pub mod geometry;
pub mod placement;
pub mod result;
pub mod rotation;
pub mod sa;

// Re-exports
pub use config::{
    Config, OverflowPolicy, PositionConvention, ProgressCallback, ProgressInfo, Strategy,
};
pub use error::{Error, Result};
pub use geometry::{vec3, Axis, Box3, Vec3, EPS};
pub use placement::Placement;
pub use result::{
    BorrowOp, PackingResult, PackingSummary, PartitionSummary, SpillOp, UnplacedItem,
    UnplacedReason,
};
pub use rotation::{orientations, OrientationConstraint};
pub use sa::{PermutationSolution, SaConfig, SaCost, SaProblem, SaResult, SaRunner, SaSolution};
