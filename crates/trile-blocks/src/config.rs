use serde::Deserialize;

use crate::types::ActorType;

// Top-level blocks config file
#[derive(Deserialize, Debug, Default)]
pub struct BlocksConfig {
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct BlockDef {
    pub name: String,
    #[serde(default)]
    pub id: Option<u16>,
    // Gameplay role; drives the compiled classification
    #[serde(default)]
    pub actor: Option<ActorType>,
    // Explicit overrides, applied on top of the actor's default
    #[serde(default)]
    pub immaterial: Option<bool>,
    #[serde(default)]
    pub thin: Option<bool>,
    #[serde(default)]
    pub seethrough: Option<bool>,
    // Instances of this block are never culled (e.g. animated pieces)
    #[serde(default)]
    pub no_cull: Option<bool>,
}
