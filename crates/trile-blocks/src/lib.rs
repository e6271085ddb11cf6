//! Block definitions, actor types, and the compiled block registry.
#![forbid(unsafe_code)]

pub mod config;
pub mod registry;
pub mod types;

pub use registry::{BlockRegistry, RegistryError};
pub use types::{ActorType, BlockId, BlockType, Classification};
