//! Viewpoint classification: discrete viewpoints, their screen-space axes,
//! and per-frame camera motion.
#![forbid(unsafe_code)]

mod frame;
mod tracker;
mod viewpoint;

pub use frame::{CameraFrame, MAX_VIEW_COLUMNS, Projection};
pub use tracker::{ViewMotion, ViewTracker, blend_forward};
pub use viewpoint::{DepthWalk, ViewAxes, Viewpoint};
