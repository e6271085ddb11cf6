use std::error::Error;
use std::fmt;
use std::path::Path;

use fastnoise_lite::{FastNoiseLite, NoiseType};
use serde::Deserialize;
use trile_blocks::{BlockId, BlockRegistry};
use trile_geom::{Emplacement, Vec3};
use trile_world::World;

/// Scene file: explicit placements, box fills and free-floating instances.
#[derive(Deserialize, Debug, Default)]
pub struct SceneFile {
    #[serde(default)]
    pub place: Vec<Placement>,
    #[serde(default)]
    pub fill: Vec<Fill>,
    #[serde(default)]
    pub float: Vec<Floating>,
}

#[derive(Deserialize, Debug)]
pub struct Placement {
    pub block: String,
    pub at: [i32; 3],
}

/// Inclusive box of one block.
#[derive(Deserialize, Debug)]
pub struct Fill {
    pub block: String,
    pub min: [i32; 3],
    pub max: [i32; 3],
}

/// Instance placed at a true position off the grid.
#[derive(Deserialize, Debug)]
pub struct Floating {
    pub block: String,
    pub position: [f32; 3],
}

#[derive(Debug)]
pub struct UnknownBlockName(pub String);

impl fmt::Display for UnknownBlockName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scene names unknown block '{}'", self.0)
    }
}

impl Error for UnknownBlockName {}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SceneStats {
    pub placed: usize,
    pub rejected: usize,
}

fn block_id(reg: &BlockRegistry, name: &str) -> Result<BlockId, UnknownBlockName> {
    reg.id_by_name(name)
        .ok_or_else(|| UnknownBlockName(name.to_string()))
}

impl SceneFile {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    /// Place everything into `world`. Cells the world refuses are counted and
    /// logged; an unknown block name fails the whole scene.
    pub fn apply(&self, world: &mut World) -> Result<SceneStats, Box<dyn Error>> {
        let reg = world.registry().clone();
        let mut stats = SceneStats::default();
        let mut put = |world: &mut World, block: BlockId, e: Emplacement| match world.place(block, e) {
            Ok(_) => stats.placed += 1,
            Err(err) => {
                log::warn!(target: "scene", "skip {:?}: {}", e, err);
                stats.rejected += 1;
            }
        };
        for f in &self.fill {
            let block = block_id(&reg, &f.block)?;
            for x in f.min[0]..=f.max[0] {
                for y in f.min[1]..=f.max[1] {
                    for z in f.min[2]..=f.max[2] {
                        put(world, block, Emplacement::new(x, y, z));
                    }
                }
            }
        }
        for p in &self.place {
            let block = block_id(&reg, &p.block)?;
            let [x, y, z] = p.at;
            put(world, block, Emplacement::new(x, y, z));
        }
        for fl in &self.float {
            let block = block_id(&reg, &fl.block)?;
            let [x, y, z] = fl.position;
            let position = Vec3::new(x, y, z);
            let e = Emplacement::containing(position);
            match world.place(block, e).and_then(|id| world.set_position(id, position)) {
                Ok(_) => stats.placed += 1,
                Err(err) => {
                    log::warn!(target: "scene", "skip floating {:?}: {}", position, err);
                    stats.rejected += 1;
                }
            }
        }
        log::info!(target: "scene", "placed {} instances ({} rejected)", stats.placed, stats.rejected);
        Ok(stats)
    }
}

/// Noise terrain: stone below, dirt near the top, grass on top, with vines
/// hung over some exposed cells.
pub fn generate_heightmap(world: &mut World, seed: i32) -> Result<SceneStats, Box<dyn Error>> {
    let reg = world.registry().clone();
    let stone = block_id(&reg, "stone")?;
    let dirt = reg.id_by_name("dirt").unwrap_or(stone);
    let grass = reg.id_by_name("grass").unwrap_or(dirt);
    let vine = reg.id_by_name("vine");

    let mut noise = FastNoiseLite::with_seed(seed);
    noise.set_noise_type(Some(NoiseType::OpenSimplex2));
    noise.set_frequency(Some(0.05));

    let size = world.size();
    let min_h = ((size.y as f32 * 0.15) as i32).max(1);
    let max_h = ((size.y as f32 * 0.7) as i32).max(min_h);
    let mut stats = SceneStats::default();
    for z in 0..size.z {
        for x in 0..size.x {
            let n = noise.get_noise_2d(x as f32, z as f32);
            let h = ((n + 1.0) * 0.5 * (max_h - min_h) as f32) as i32 + min_h;
            let height = h.clamp(1, size.y);
            for y in 0..height {
                let block = if y == height - 1 {
                    grass
                } else if y + 3 >= height {
                    dirt
                } else {
                    stone
                };
                match world.place(block, Emplacement::new(x, y, z)) {
                    Ok(_) => stats.placed += 1,
                    Err(_) => stats.rejected += 1,
                }
            }
            if let Some(vine) = vine {
                let detail = noise.get_noise_2d(x as f32 * 7.0, z as f32 * 7.0);
                if detail > 0.6 {
                    let top = Emplacement::new(x, height - 1, z);
                    if world.place(vine, top).is_ok() {
                        stats.placed += 1;
                    }
                }
            }
        }
    }
    log::info!(
        target: "scene",
        "generated {}x{}x{} terrain seed={} instances={}",
        size.x,
        size.y,
        size.z,
        seed,
        stats.placed
    );
    Ok(stats)
}
