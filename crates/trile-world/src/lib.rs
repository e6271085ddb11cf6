//! Sparse trile grid: instances, per-cell overlap stacks, and the row index.
#![forbid(unsafe_code)]

mod cell;
mod error;
mod instance;
mod world;

pub use cell::CellStack;
pub use error::WorldError;
pub use instance::{Instance, InstanceId};
pub use world::{CellMap, Slot, World, WorldStats};
