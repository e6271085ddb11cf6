//! Nearest-trile resolution under an orthographic viewpoint.
#![forbid(unsafe_code)]

mod engine;

pub use engine::QueryEngine;

use trile_world::InstanceId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Resolve from the far side of the world instead of the camera side.
    pub background: bool,
    /// Only the column under the point; no straddling into neighbors.
    pub simple: bool,
}

impl QueryOptions {
    pub const FOREGROUND: QueryOptions = QueryOptions {
        background: false,
        simple: false,
    };
    pub const BACKGROUND: QueryOptions = QueryOptions {
        background: true,
        simple: false,
    };
}

/// `surface` is the nearest material instance; `deep` the nearest opaque one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NearestTriles {
    pub surface: Option<InstanceId>,
    pub deep: Option<InstanceId>,
}

impl NearestTriles {
    pub fn is_empty(&self) -> bool {
        self.surface.is_none() && self.deep.is_none()
    }
}
