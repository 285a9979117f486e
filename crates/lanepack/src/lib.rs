//! # lanepack
//!
//! Group-aware 3D bin packing.
//!
//! Items belong to groups. The container is divided into one lane per group,
//! sized by the group's confirmed volume, plus a deferred lane for
//! unconfirmed items. Each lane is packed independently (bottom-left-fill
//! with gravity, optionally searched by simulated annealing). Items a lane
//! cannot take borrow space from a neighboring lane or spill into the
//! overflow lane.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lanepack::{Config, Container, Item, Packer};
//!
//! let container = Container::new(100.0, 50.0, 40.0);
//! let items = vec![
//!     Item::new("A1", "A", 20.0, 10.0, 10.0),
//!     Item::new("B1", "B", 10.0, 10.0, 10.0).with_confirmed(false),
//! ];
//!
//! let packer = Packer::new(Config::default().with_seed(42));
//! let result = packer.pack_items(&container, &items, &[])?;
//! println!("{}", result.summary());
//! ```
//!
//! JSON requests go through [`PackingRequest`] and [`PackingResponse`].

/// Geometry kernel, annealing framework, configuration and result types.
pub use lanepack_core as core;

/// Placement strategies, lane planning and overflow handling.
pub use lanepack_engine as engine;

// Re-export commonly used types at root level
pub use lanepack_core::{
    Axis, Box3, BorrowOp, Config, Error, OrientationConstraint, OverflowPolicy, PackingResult,
    Placement, PositionConvention, ProgressCallback, ProgressInfo, Result, SpillOp, Strategy,
    UnplacedReason,
};
pub use lanepack_engine::{Container, Group, Item, Packer, PackingRequest, PackingResponse};
