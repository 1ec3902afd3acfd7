//! Flagstone Runtime
//!
//! Boots a small world, runs a few steps, then writes a snapshot to disk and
//! checks a fresh world restored from it.
//!
//! Usage: `flagstone [config.json] [snapshot-path]`

use anyhow::{ensure, Context, Result};
use flagstone_core::ecs::{EntityId, PrimitiveKind, Schema, SystemDescriptor};
use flagstone_core::{World, WorldConfig};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const POSITION_SCHEMA: &str = r#"{
    "x": "float32",
    "y": "float32",
    "heading": ["NORTH", "EAST", "SOUTH", "WEST"]
}"#;

const SPAWNED: usize = 24;
const STEPS: usize = 12;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("Flagstone v{}", flagstone_core::VERSION);

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            WorldConfig::from_json_str(&json).with_context(|| format!("parsing config {path}"))?
        }
        None => WorldConfig::default(),
    };
    let snapshot_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("flagstone.snapshot"));
    info!(
        max_components = config.max_components,
        max_entities = config.max_entities,
        "world config"
    );

    let mut world = build_world(config)?;
    spawn(&mut world)?;
    for tick in 0..STEPS {
        world.step(|w| run_tick(w, tick))?;
        debug!(
            tick,
            live = world.entity_count(),
            moving = world.system_entities("movement")?.len(),
            "step complete"
        );
    }

    let bytes = world.save();
    std::fs::write(&snapshot_path, &bytes)
        .with_context(|| format!("writing snapshot {}", snapshot_path.display()))?;
    info!(bytes = bytes.len(), path = %snapshot_path.display(), "snapshot written");

    let restored = restore(config, &snapshot_path, world.entity_cursor())?;
    for system in world.systems() {
        let reloaded = restored.system_entities(system.name())?;
        ensure!(
            reloaded == system.entities(),
            "system '{}' differs after reload",
            system.name()
        );
    }
    info!(
        systems = world.systems().count(),
        live = world.entity_count(),
        "snapshot verified"
    );

    if flagstone_metrics::ENABLED {
        for (name, value) in world.counters().iter() {
            info!(counter = %name, value, "metrics");
        }
    }

    Ok(())
}

/// Register the demo components and systems. Restoring a snapshot relies on
/// this running identically for both worlds.
fn build_world(config: WorldConfig) -> Result<World> {
    let mut world = World::new(config)?;

    let position = Schema::from_json_str(POSITION_SCHEMA).context("position schema")?;
    world.register_component("POSITION", position)?;
    world.register_component(
        "VELOCITY",
        Schema::new()
            .scalar("dx", PrimitiveKind::F32)
            .scalar("dy", PrimitiveKind::F32),
    )?;
    world.register_component(
        "LIFETIME",
        Schema::new().scalar("ticks", PrimitiveKind::U16),
    )?;
    world.register_component(
        "TRAIL",
        Schema::new().array("xs", PrimitiveKind::U8, PrimitiveKind::F32, Some(4)),
    )?;
    world.register_component("FROZEN", Schema::tag())?;

    world.register_system(SystemDescriptor::new("movement").with("POSITION").with("VELOCITY"))?;
    world.register_system(SystemDescriptor::new("aging").with("LIFETIME"))?;
    world.register_system(
        SystemDescriptor::new("frozen_movers").requires(["POSITION", "VELOCITY", "FROZEN"]),
    )?;

    Ok(world)
}

fn spawn(world: &mut World) -> Result<()> {
    for i in 0..SPAWNED {
        let e = world.add_entity()?;
        let f = i as f64;
        world.attach_with(
            "POSITION",
            e,
            &json!({ "x": f, "y": -f, "heading": i % 4 }),
            true,
        )?;
        if i % 3 != 0 {
            world.attach_with("VELOCITY", e, &json!({ "dx": 0.5, "dy": 1.0 }), true)?;
        }
        if i % 4 == 0 {
            world.attach_with("LIFETIME", e, &json!({ "ticks": 3 + i % 7 }), true)?;
        }
        if i % 5 == 0 {
            world.attach("FROZEN", e)?;
        }
        world.attach("TRAIL", e)?;
    }
    Ok(())
}

fn run_tick(world: &mut World, tick: usize) -> Result<()> {
    let movers: Vec<EntityId> = world.system_entities("movement")?.to_vec();
    for e in movers {
        if world.has("FROZEN", e)? {
            continue;
        }
        let velocity = world.component("VELOCITY")?;
        let dx = velocity.get("dx", e).unwrap_or_default();
        let dy = velocity.get("dy", e).unwrap_or_default();
        let position = world.component_mut("POSITION")?;
        let x = position.get("x", e).unwrap_or_default() + dx;
        let y = position.get("y", e).unwrap_or_default() + dy;
        position.set(e, &json!({ "x": x, "y": y }))?;
    }

    let aging: Vec<EntityId> = world.system_entities("aging")?.to_vec();
    for e in aging {
        let lifetime = world.component_mut("LIFETIME")?;
        let ticks = lifetime.get("ticks", e).unwrap_or_default();
        if ticks <= 1.0 {
            world.remove_entity(e);
        } else {
            lifetime.set(e, &json!({ "ticks": ticks - 1.0 }))?;
        }
    }

    // Thaw one frozen mover every few ticks.
    if tick % 4 == 3 {
        let thawed = world.system_entities("frozen_movers")?.first().copied();
        if let Some(e) = thawed {
            world.detach("FROZEN", e)?;
        }
    }
    Ok(())
}

fn restore(config: WorldConfig, path: &Path, cursor: u32) -> Result<World> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let mut world = build_world(config)?;
    for _ in 0..cursor {
        world.add_entity()?;
    }
    world.load(&bytes)?;
    Ok(world)
}
