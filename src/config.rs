use std::error::Error;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use trile_cull::CullSettings;
use trile_geom::Emplacement;

use crate::script::CameraScript;

/// Engine configuration file: `[world]`, `[cull]` and `[camera]` tables.
#[derive(Deserialize, Debug, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub cull: CullSettings,
    #[serde(default)]
    pub camera: CameraScript,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct WorldConfig {
    pub size: [i32; 3],
    /// Block definitions, relative to the assets root.
    pub blocks: Option<PathBuf>,
    /// Scene file with explicit placements, relative to the assets root.
    pub scene: Option<PathBuf>,
    pub seed: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            size: [48, 24, 48],
            blocks: None,
            scene: None,
            seed: 1337,
        }
    }
}

impl WorldConfig {
    pub fn size(&self) -> Emplacement {
        let [x, y, z] = self.size;
        Emplacement::new(x.max(1), y.max(1), z.max(1))
    }
}

impl EngineConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }
}
