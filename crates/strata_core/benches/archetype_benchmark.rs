//! # Archetype Churn Benchmark
//!
//! Migration and tombstoning under churn:
//! 1. Adding a component to every entity (one migration each)
//! 2. Delete / respawn cycles that must reuse holes instead of growing

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strata_core::{EntityId, Position, Velocity, World};

const ENTITY_COUNT: u32 = 50_000;

#[derive(Clone, Copy, Debug, Default)]
struct Health(u32);

impl strata_core::Component for Health {}

fn bench_migration(c: &mut Criterion) {
    c.bench_function("migrate_add_velocity_50k", |b| {
        b.iter_with_setup(
            || {
                let mut world = World::new();
                for raw in 2..ENTITY_COUNT + 2 {
                    world.write(EntityId::new(raw), (Position::default(), Health(100)));
                }
                world
            },
            |mut world| {
                for raw in 2..ENTITY_COUNT + 2 {
                    world.write(EntityId::new(raw), (Velocity::new(1.0, 0.0, 0.0),));
                }
                black_box(world.describe_memory().len())
            },
        );
    });
}

fn bench_churn(c: &mut Criterion) {
    let mut world = World::new();
    for raw in 2..ENTITY_COUNT + 2 {
        world.write(EntityId::new(raw), (Position::default(), Velocity::default()));
    }

    // Every 10th entity dies and is respawned each iteration.
    c.bench_function("delete_respawn_10pct_50k", |b| {
        b.iter(|| {
            for raw in (2..ENTITY_COUNT + 2).step_by(10) {
                world.delete(EntityId::new(raw));
            }
            for raw in (2..ENTITY_COUNT + 2).step_by(10) {
                world.write(EntityId::new(raw), (Position::default(), Velocity::default()));
            }
            black_box(world.len())
        });
    });

    let stats = world.describe_memory();
    assert_eq!(stats[0].slots, ENTITY_COUNT as usize);
}

criterion_group!(benches, bench_migration, bench_churn);
criterion_main!(benches);
