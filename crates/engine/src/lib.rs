//! # lanepack Engine
//!
//! Group-aware 3D bin packing for the lanepack engine.
//!
//! This crate plans demand-sized lanes over a container with a BSP tree,
//! packs each lane with a selectable strategy and resolves items that do not
//! fit by borrowing space from neighbors or spilling into an overflow lane.

pub mod blf;
pub mod bsp;
pub mod container;
pub mod grid_stack;
pub mod item;
pub mod overflow;
pub mod packer;
pub mod partition;
pub mod placer;
pub mod planner;
pub mod request;
pub mod response;
pub mod row_fill;
pub mod sa_packing;

// Re-exports
pub use blf::{BlfPlacer, BlfState, SortPolicy};
pub use bsp::{BspTree, NodeId, SplitOutcome};
pub use container::Container;
pub use grid_stack::GridStacker;
pub use item::{Group, Item};
pub use overflow::{OverflowManager, OverflowOutcome};
pub use packer::Packer;
pub use partition::{Layout, Partition};
pub use placer::{PlaceOutcome, PlacedBox, Placer};
pub use planner::LanePlanner;
pub use request::PackingRequest;
pub use response::PackingResponse;
pub use row_fill::RowFiller;
pub use sa_packing::AnnealingPlacer;
pub use lanepack_core::{
    Config, Error, OverflowPolicy, PackingResult, Placement, PositionConvention, Result, Strategy,
};
