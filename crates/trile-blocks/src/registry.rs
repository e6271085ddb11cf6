use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use super::config::{BlockDef, BlocksConfig};
use super::types::{BlockId, BlockType, Classification};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateName(String),
    DuplicateId(BlockId),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateName(name) => write!(f, "duplicate block name '{}'", name),
            RegistryError::DuplicateId(id) => write!(f, "duplicate block id {}", id),
        }
    }
}

impl Error for RegistryError {}

#[derive(Default, Clone, Debug)]
pub struct BlockRegistry {
    blocks: Vec<Option<BlockType>>,
    by_name: HashMap<String, BlockId>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&BlockType> {
        self.blocks.get(id as usize).and_then(Option::as_ref)
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&BlockType> {
        self.id_by_name(name).and_then(|id| self.get(id))
    }

    /// Classification of `id`; unknown ids are immaterial so they never shadow real geometry.
    #[inline]
    pub fn classification(&self, id: BlockId) -> Classification {
        self.get(id)
            .map(|ty| ty.classification)
            .unwrap_or(Classification::Immaterial)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockType> {
        self.blocks.iter().filter_map(Option::as_ref)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: BlocksConfig = toml::from_str(toml_str)?;
        Ok(Self::from_config(cfg)?)
    }

    pub fn from_config(cfg: BlocksConfig) -> Result<Self, RegistryError> {
        let mut reg = BlockRegistry::new();
        for def in cfg.blocks.into_iter() {
            reg.register(def)?;
        }
        Ok(reg)
    }

    /// Compile and insert one definition. Ids default to the next free slot.
    pub fn register(&mut self, def: BlockDef) -> Result<BlockId, RegistryError> {
        if self.by_name.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        let id = match def.id {
            Some(id) => id,
            None => self.next_free_id(),
        };
        if self.get(id).is_some() {
            return Err(RegistryError::DuplicateId(id));
        }
        let actor = def.actor.unwrap_or_default();
        let seethrough = def.seethrough.unwrap_or(false);
        let classification = Classification::compile(actor, def.immaterial, def.thin, seethrough);
        let ty = BlockType {
            id,
            name: def.name.clone(),
            actor,
            classification,
            seethrough,
            no_cull: def.no_cull.unwrap_or(false),
        };
        let idx = id as usize;
        if self.blocks.len() <= idx {
            self.blocks.resize(idx + 1, None);
        }
        self.blocks[idx] = Some(ty);
        self.by_name.insert(def.name, id);
        Ok(id)
    }

    fn next_free_id(&self) -> BlockId {
        self.blocks
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.blocks.len()) as BlockId
    }
}
