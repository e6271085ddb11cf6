//! A world together with its limit cache, cull state and camera history.
#![forbid(unsafe_code)]

mod error;
mod event;
mod level;

pub use error::LevelError;
pub use event::{EventEnvelope, EventQueue, LevelEvent};
pub use level::Level;
