#![forbid(unsafe_code)]

mod assets;
mod config;
mod scene;
mod script;

use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use hashbrown::HashMap;
use trile_blocks::BlockRegistry;
use trile_cull::CullStrategy;
use trile_level::{EventEnvelope, Level, LevelEvent};
use trile_query::QueryOptions;
use trile_world::{InstanceId, World};

use crate::config::EngineConfig;
use crate::scene::{SceneFile, generate_heightmap};

#[derive(Parser, Debug)]
#[command(name = "trile", about = "Headless driver for the trile culling engine")]
struct Cli {
    /// Engine config (TOML); defaults to assets/demo.toml
    #[arg(long)]
    config: Option<PathBuf>,
    /// Block definitions; overrides the config
    #[arg(long)]
    blocks: Option<PathBuf>,
    /// Scene file with explicit placements; overrides the config
    #[arg(long, conflicts_with = "generate")]
    scene: Option<PathBuf>,
    /// Generate noise terrain even when the config names a scene
    #[arg(long)]
    generate: bool,
    /// Terrain seed; overrides the config
    #[arg(long)]
    seed: Option<i32>,
    /// Stop after this many frames
    #[arg(long)]
    frames: Option<usize>,
    /// Assets root; otherwise TRILE_ASSETS or a search from the working directory
    #[arg(long)]
    assets: Option<PathBuf>,
    /// Write the log to this file instead of the terminal
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match log_file {
        Some(path) => simplelog::WriteLogger::init(
            simplelog::LevelFilter::Debug,
            simplelog::Config::default(),
            File::create(path)?,
        )?,
        None => env_logger::Builder::new()
            .filter_level(log::LevelFilter::Info)
            .parse_env("RUST_LOG")
            .try_init()?,
    }
    Ok(())
}

fn log_event(env: &EventEnvelope<LevelEvent>) {
    match env.kind {
        LevelEvent::BatchChanged { id, block } => {
            log::trace!(target: "events", "[tick {}] #{} batch {} block={}", env.tick, env.id, id, block)
        }
        kind => log::info!(target: "events", "[tick {}] #{} {:?}", env.tick, env.id, kind),
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let root = assets::resolve_assets_root(cli.assets.clone());
    let config_path = cli.config.clone().unwrap_or_else(|| assets::config_path(&root));
    let cfg = if config_path.exists() {
        EngineConfig::load_from_path(&config_path)?
    } else {
        log::warn!(target: "trile", "no config at {}; using defaults", config_path.display());
        EngineConfig::default()
    };

    let blocks = cli
        .blocks
        .clone()
        .or_else(|| cfg.world.blocks.as_ref().map(|p| root.join(p)))
        .unwrap_or_else(|| assets::blocks_path(&root));
    let registry = Arc::new(BlockRegistry::load_from_path(&blocks)?);
    log::info!(target: "trile", "{} block types from {}", registry.len(), blocks.display());

    let mut world = World::new(cfg.world.size(), registry);
    let scene = match (&cli.scene, cli.generate) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => None,
        (None, false) => cfg.world.scene.as_ref().map(|p| root.join(p)),
    };
    match scene {
        Some(path) => {
            SceneFile::load_from_path(&path)?.apply(&mut world)?;
        }
        None => {
            generate_heightmap(&mut world, cli.seed.unwrap_or(cfg.world.seed))?;
        }
    }

    let mut level = Level::new(world, cfg.cull.clone())?;
    let frames = cfg.camera.frames();
    let limit = cli.frames.unwrap_or(frames.len()).min(frames.len());
    let mut strategies: HashMap<CullStrategy, u32> = HashMap::new();
    let mut cleared: Option<InstanceId> = None;

    for (tick, frame) in frames.iter().take(limit).enumerate() {
        // Knock out whatever sits under the screen center now and then, and
        // put it back on the following frame.
        if let Some(id) = cleared.take() {
            level.restore(id)?;
        } else if tick % 30 == 15 {
            if let Some(id) = level.nearest_trile(frame.center, QueryOptions::FOREGROUND).surface {
                level.remove(id)?;
                cleared = Some(id);
            }
        }

        let out = level.frame(frame);
        *strategies.entry(out.strategy).or_default() += 1;
        if !out.is_empty() {
            log::debug!(
                target: "trile",
                "frame {} {:?}: +{} -{} batched {}",
                tick,
                out.strategy,
                out.added.len(),
                out.removed.len(),
                out.batch_changed.len()
            );
        }
        for env in level.drain_events() {
            log_event(&env);
        }
    }
    if let Some(id) = cleared.take() {
        level.restore(id)?;
    }
    level.wait_for_invalidation();
    for env in level.drain_events() {
        log_event(&env);
    }

    let mut counts: Vec<_> = strategies.into_iter().collect();
    counts.sort_by_key(|(s, _)| format!("{:?}", s));
    println!("frames: {}", limit);
    for (strategy, n) in counts {
        println!("  {:<18} {}", format!("{:?}", strategy), n);
    }
    let world_stats = level.world().stats();
    println!(
        "world: {} live instances at rev {}, viewed {}, batched {}",
        world_stats.live,
        level.world().rev(),
        level.cull().viewed().len(),
        level.cull().batches().total()
    );
    let s = level.limits().stats();
    println!(
        "limits: {} columns, {} hits, {} misses, {} published, {} cancelled, {} patches",
        s.columns, s.hits, s.misses, s.published, s.cancelled, s.patches
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.log_file.as_deref()) {
        eprintln!("trile: logging disabled: {}", e);
    }
    if let Err(e) = run(cli) {
        log::error!(target: "trile", "{}", e);
        eprintln!("trile: {}", e);
        std::process::exit(1);
    }
}
