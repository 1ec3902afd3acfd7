use flagstone_core::ecs::{EntityId, PrimitiveKind, Schema, SystemDescriptor};
use flagstone_core::{SnapshotError, World, WorldConfig};
use serde_json::json;

const ENTITIES: usize = 12;

/// Build a world with a fixed registration history and `entities` allocated ids.
fn blank_world(entities: usize) -> World {
    let mut world = World::new(WorldConfig::new(64, ENTITIES)).unwrap();

    world
        .register_component(
            "TRANSFORM",
            Schema::new()
                .nested(
                    "position",
                    Schema::new()
                        .scalar("x", PrimitiveKind::F32)
                        .scalar("y", PrimitiveKind::F32),
                )
                .scalar("angle", PrimitiveKind::F64),
        )
        .unwrap();
    world
        .register_component(
            "HEALTH",
            Schema::new()
                .scalar("current", PrimitiveKind::I16)
                .scalar("max", PrimitiveKind::U16),
        )
        .unwrap();
    world
        .register_component(
            "PATH",
            Schema::new()
                .enumeration("mode", ["STOP", "PATROL", "CHASE"])
                .array("waypoints", PrimitiveKind::U8, PrimitiveKind::I32, Some(3)),
        )
        .unwrap();
    // Filler tags push the last components into a second generation word.
    for i in 0..30 {
        world
            .register_component(&format!("TAG_{i}"), Schema::tag())
            .unwrap();
    }
    world.register_component("PLAYER", Schema::tag()).unwrap();
    assert_eq!(world.generation_count(), 2);

    world
        .register_system(SystemDescriptor::new("movement").with("TRANSFORM"))
        .unwrap();
    world
        .register_system(
            SystemDescriptor::new("combat").requires(["TRANSFORM", "HEALTH"]),
        )
        .unwrap();
    world
        .register_system(SystemDescriptor::new("players").with("PLAYER").with("HEALTH"))
        .unwrap();
    world
        .register_system(SystemDescriptor::new("patrol").with("PATH"))
        .unwrap();

    for _ in 0..entities {
        world.add_entity().unwrap();
    }
    world
}

fn populated_world() -> World {
    let mut world = blank_world(8);

    for e in 0..8 {
        world
            .attach_with(
                "TRANSFORM",
                e,
                &json!({ "position": { "x": e as f64 * 1.5, "y": -(e as f64) }, "angle": 0.125 }),
                true,
            )
            .unwrap();
    }
    for e in [1, 3, 5, 7] {
        world
            .attach_with("HEALTH", e, &json!({ "current": -3, "max": 40_000 }), true)
            .unwrap();
    }
    world.attach("PLAYER", 5).unwrap();
    world.attach("PLAYER", 3).unwrap();
    world
        .attach_with(
            "PATH",
            2,
            &json!({ "mode": "PATROL", "waypoints": [10, -20] }),
            true,
        )
        .unwrap();

    world.step(|w| {
        w.detach("TRANSFORM", 1).unwrap();
        w.detach("HEALTH", 7).unwrap();
    });
    world
}

fn memberships(world: &World) -> Vec<(String, Vec<EntityId>)> {
    world
        .systems()
        .map(|system| (system.name().to_string(), system.entities().to_vec()))
        .collect()
}

#[test]
fn round_trip_restores_everything() {
    let source = populated_world();
    let bytes = source.save();
    assert_eq!(bytes.len(), source.snapshot_size());

    let mut restored = blank_world(8);
    restored.load(&bytes).unwrap();

    assert_eq!(memberships(&restored), memberships(&source));
    for e in 0..8 {
        for generation in 0..source.generation_count() {
            assert_eq!(
                restored.mask_word(generation, e),
                source.mask_word(generation, e)
            );
        }
    }

    let transform = restored.component("TRANSFORM").unwrap();
    assert_eq!(transform.get("position.x", 4), Some(6.0));
    assert_eq!(transform.get("position.y", 4), Some(-4.0));
    assert_eq!(transform.get("angle", 6), Some(0.125));

    let health = restored.component("HEALTH").unwrap();
    assert_eq!(health.get("current", 3), Some(-3.0));
    assert_eq!(health.get("max", 3), Some(40_000.0));

    let path = restored.component("PATH").unwrap();
    assert_eq!(path.get("mode", 2), Some(1.0));
    assert_eq!(path.get("waypoints.len", 2), Some(2.0));
    assert_eq!(path.get("waypoints[1]", 2), Some(-20.0));

    assert!(restored.has("PLAYER", 5).unwrap());
    assert!(!restored.has("TRANSFORM", 1).unwrap());
    assert_eq!(restored.system_entities("combat").unwrap(), &[5, 3]);

    assert_eq!(restored.save(), bytes);
}

#[test]
fn restored_lists_keep_persisted_order() {
    let source = populated_world();
    let players = source.system_entities("players").unwrap().to_vec();
    assert_eq!(players, vec![5, 3]);

    let mut restored = blank_world(8);
    restored.load(&source.save()).unwrap();
    let system = restored.system("players").unwrap();
    assert_eq!(system.entities(), players.as_slice());
    assert_eq!(system.index_of(5), Some(0));
    assert_eq!(system.index_of(3), Some(1));
}

#[test]
fn restored_world_keeps_working() {
    let mut restored = blank_world(8);
    restored.load(&populated_world().save()).unwrap();

    restored.step(|w| w.detach("PLAYER", 5).unwrap());
    assert_eq!(restored.system_entities("players").unwrap(), &[3]);
    assert_eq!(restored.system("players").unwrap().index_of(3), Some(0));

    restored.attach("HEALTH", 0).unwrap();
    assert_eq!(restored.system_entities("combat").unwrap(), &[5, 3, 0]);
}

#[test]
fn load_replaces_previous_state() {
    let mut target = blank_world(8);
    for e in 0..8 {
        target.attach("PLAYER", e).unwrap();
        target.attach("HEALTH", e).unwrap();
    }
    assert_eq!(target.system("players").unwrap().len(), 8);

    target.load(&populated_world().save()).unwrap();
    assert_eq!(target.system_entities("players").unwrap(), &[5, 3]);
    assert!(!target.has("PLAYER", 0).unwrap());
}

#[test]
fn every_short_prefix_is_rejected() {
    let bytes = populated_world().save();
    for len in [0, 1, 4, bytes.len() / 2, bytes.len() - 4, bytes.len() - 1] {
        let mut target = blank_world(8);
        let err = target.load(&bytes[..len]).unwrap_err();
        assert!(
            matches!(err, SnapshotError::TruncatedSnapshot { .. }),
            "prefix {len}: {err}"
        );
    }
}
