//! Incremental culling: which instances are viewed and which hold a batch slot.
#![forbid(unsafe_code)]

mod batch;
mod maintainer;
mod settings;
mod viewed;

pub use batch::{BatchSet, InstanceBatch};
pub use maintainer::CullMaintainer;
pub use settings::CullSettings;
pub use viewed::{ViewedEntry, ViewedRegistry};

use trile_blocks::BlockId;
use trile_world::InstanceId;

/// Update strategy picked from the camera motion of one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CullStrategy {
    /// Nothing moved.
    None,
    /// Every column of the viewport, read through the limit cache.
    SingleFaceFull,
    /// Only columns entering or leaving the viewport.
    SingleFacePartial,
    /// Border blocks of the two faces seen mid-rotation, by row.
    TwoFaceFull,
    /// Only rows entering or leaving the vertical band.
    TwoFacePartial,
    /// Border blocks on any camera-facing face near the camera's height.
    TriFace,
    /// Everything near the camera's height.
    NoCull,
}

impl CullStrategy {
    pub fn is_single_face(self) -> bool {
        matches!(self, CullStrategy::SingleFaceFull | CullStrategy::SingleFacePartial)
    }
}

/// Changes made by one update or hook call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CullOutcome {
    pub strategy: CullStrategy,
    /// Newly registered as viewed.
    pub added: Vec<InstanceId>,
    /// No longer viewed.
    pub removed: Vec<InstanceId>,
    /// Instances that gained a batch slot, with their block.
    pub batch_changed: Vec<(InstanceId, BlockId)>,
}

impl CullOutcome {
    pub fn new(strategy: CullStrategy) -> Self {
        Self {
            strategy,
            added: Vec::new(),
            removed: Vec::new(),
            batch_changed: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.batch_changed.is_empty()
    }

    /// Fold another outcome into this one, keeping this strategy.
    pub fn merge(&mut self, other: CullOutcome) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
        self.batch_changed.extend(other.batch_changed);
    }
}
