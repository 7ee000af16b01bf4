//! End-to-end behavior of the world's public contract.

#![allow(missing_docs)]

use strata_core::{Component, EntityId, Position, Velocity, World};

#[derive(Clone, Debug, PartialEq)]
struct Name(String);

impl Component for Name {}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Health(u32);

impl Component for Health {}

fn ids(world: &mut World, count: usize) -> Vec<EntityId> {
    (0..count).map(|_| world.new_id()).collect()
}

#[test]
fn test_round_trip() {
    let mut world = World::new();
    let id = world.new_id();
    let name = Name("ranger".to_string());

    assert!(world.write(id, (name.clone(), Health(40))));
    assert_eq!(world.read::<Name>(id), Some(name));
    assert_eq!(world.read::<Health>(id), Some(Health(40)));
    world.check_integrity().unwrap();
}

#[test]
fn test_overwrite_leaves_other_components() {
    let mut world = World::new();
    let id = world.new_id();
    world.write(id, (Position::new(1.0, 2.0, 3.0), Health(10)));
    let archetype = world.archetype_of(id);

    world.write(id, (Health(20),));
    world.write(id, (Health(30),));

    assert_eq!(world.read::<Health>(id), Some(Health(30)));
    assert_eq!(world.read::<Position>(id), Some(Position::new(1.0, 2.0, 3.0)));
    assert_eq!(world.archetype_of(id), archetype);
    assert_eq!(world.engine().version(), 1);
    world.check_integrity().unwrap();
}

#[test]
fn test_migration_preserves_values_and_frees_slot() {
    let mut world = World::new();
    let spawned = ids(&mut world, 3);
    let (a, b, c) = (spawned[0], spawned[1], spawned[2]);
    world.write(a, (Position::new(1.0, 0.0, 0.0),));
    world.write(b, (Position::new(2.0, 0.0, 0.0),));
    let positions_only = world.archetype_of(a).unwrap();

    world.write(a, (Velocity::new(0.0, 1.0, 0.0), Name("a".to_string())));
    assert_eq!(world.read::<Position>(a), Some(Position::new(1.0, 0.0, 0.0)));
    assert_eq!(world.read::<Velocity>(a), Some(Velocity::new(0.0, 1.0, 0.0)));
    assert_eq!(world.read::<Name>(a), Some(Name("a".to_string())));

    let source = world.engine().get(positions_only).unwrap();
    assert_eq!(source.lookup().holes(), &[0]);

    world.write(c, (Position::new(3.0, 0.0, 0.0),));
    let source = world.engine().get(positions_only).unwrap();
    assert_eq!(source.lookup().slot_of(c), Some(0));
    assert_eq!(source.len(), 2);
    assert!(source.lookup().holes().is_empty());
    assert_eq!(world.read::<Position>(b), Some(Position::new(2.0, 0.0, 0.0)));
    world.check_integrity().unwrap();
}

#[test]
fn test_deletion() {
    let mut world = World::new();
    let id = world.new_id();
    world.write(id, (Health(5),));

    assert!(world.delete(id));
    assert!(!world.exists(id));
    assert!(!world.delete(id));
    assert_eq!(world.read::<Health>(id), None);
    assert!(world.get::<Health>(id).is_none());
    world.check_integrity().unwrap();
}

#[test]
fn test_rewrite_after_delete_starts_fresh() {
    let mut world = World::new();
    let id = world.new_id();
    world.write(id, (Health(5), Name("old".to_string())));
    world.delete(id);

    world.write(id, (Health(6),));
    assert_eq!(world.read::<Health>(id), Some(Health(6)));
    assert_eq!(world.read::<Name>(id), None);
    world.check_integrity().unwrap();
}

#[test]
fn test_hole_skipping() {
    let mut world = World::new();
    let spawned = ids(&mut world, 3);
    let (a, b, c) = (spawned[0], spawned[1], spawned[2]);
    for id in [a, b, c] {
        world.write(id, (Health(1),));
    }
    world.delete(b);

    let mut query = world.query::<(Health,)>(&[]);
    let mut visited = Vec::new();
    query.map_id(&mut world, |id, _| visited.push(id));
    assert_eq!(visited, vec![a, c]);
}

#[test]
fn test_id_allocation_wraps_and_skips_reserved() {
    let mut world = World::new();
    let first = world.new_id();
    assert_eq!(first.raw(), 2);
    assert!(!first.is_invalid());

    world.set_id_range(7, 9);
    let seen: Vec<u32> = (0..5).map(|_| world.new_id().raw()).collect();
    assert_eq!(seen, vec![7, 8, 9, 7, 8]);
}

#[test]
fn test_id_allocation_at_u32_max() {
    let mut world = World::new();
    world.set_id_range(u32::MAX - 1, u32::MAX);
    let seen: Vec<u32> = (0..3).map(|_| world.new_id().raw()).collect();
    assert_eq!(seen, vec![u32::MAX - 1, u32::MAX, u32::MAX - 1]);
}

#[test]
#[should_panic(expected = "reserved")]
fn test_reserved_range_is_fatal() {
    World::new().set_id_range(1, 100);
}

#[test]
fn test_position_then_velocity_scenario() {
    let mut world = World::new();
    let id = EntityId::new(5);

    world.write(id, (Position::new(0.0, 0.0, 0.0),));
    world.write(id, (Velocity::new(1.0, 1.0, 0.0),));

    let archetype = world.archetype_of(id).unwrap();
    assert_eq!(world.engine().get(archetype).unwrap().tags().len(), 2);
    assert_eq!(world.read::<Position>(id), Some(Position::new(0.0, 0.0, 0.0)));
    assert_eq!(world.read::<Velocity>(id), Some(Velocity::new(1.0, 1.0, 0.0)));

    let mut query = world.query::<(Position, Velocity)>(&[]);
    let mut visits = 0;
    query.map_id(&mut world, |visited, _| {
        assert_eq!(visited, id);
        visits += 1;
    });
    assert_eq!(visits, 1);
    world.check_integrity().unwrap();
}

#[test]
fn test_churn_keeps_memory_bounded() {
    let mut world = World::new();
    let ids = ids(&mut world, 64);
    for &id in &ids {
        world.write(id, (Position::default(), Health(0)));
    }

    for round in 0..10 {
        for &id in ids.iter().step_by(3) {
            assert!(world.delete(id));
        }
        for &id in ids.iter().step_by(3) {
            world.write(id, (Position::default(), Health(round)));
        }
    }

    let stats = world.describe_memory();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].slots, 64);
    assert_eq!(stats[0].holes, 0);
    assert_eq!(world.len(), 64);
    world.check_integrity().unwrap();
}

#[test]
fn test_worlds_do_not_share_tags() {
    let mut first = World::new();
    let mut second = World::new();
    first.write(EntityId::new(2), (Health(1),));
    second.write(EntityId::new(2), (Name("x".to_string()), Health(2)));

    assert_eq!(first.registry().len(), 1);
    assert_eq!(second.registry().len(), 2);
    assert_eq!(first.read::<Name>(EntityId::new(2)), None);
    assert_eq!(second.read::<Health>(EntityId::new(2)), Some(Health(2)));
}
