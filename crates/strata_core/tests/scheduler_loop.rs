//! The scheduler driving systems over a shared world.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use strata_core::{EngineConfig, Position, Scheduler, System, Velocity, World};

fn shared_world(count: u32) -> Arc<Mutex<World>> {
    let mut world = World::new();
    for _ in 0..count {
        let id = world.new_id();
        world.write(id, (Position::default(), Velocity::new(1.0, 0.0, 0.0)));
    }
    Arc::new(Mutex::new(world))
}

fn movement(world: Arc<Mutex<World>>) -> System {
    let mut query = world.lock().query::<(Position, Velocity)>(&[]);
    System::new("movement", move |dt| {
        let mut world = world.lock();
        query.map_id(&mut world, |_, (pos, vel)| pos.x += vel.x * dt.as_secs_f32());
    })
}

#[test]
fn test_fixed_steps_move_entities() {
    let world = shared_world(10);
    let mut scheduler = Scheduler::new();
    scheduler.set_fixed_time_step(Duration::from_millis(250)).unwrap();
    scheduler.append_physics([movement(Arc::clone(&world))]);

    for _ in 0..4 {
        scheduler.step(Duration::from_millis(250));
    }

    let world = world.lock();
    let x = world.read::<Position>(strata_core::EntityId::new(2)).unwrap().x;
    assert!((x - 1.0).abs() < 1e-5);
    assert_eq!(scheduler.syslog_fixed()[0].name, "movement");
}

#[test]
fn test_run_until_quit_from_system() {
    let world = shared_world(3);
    let mut scheduler = Scheduler::from_config(&EngineConfig::default().scheduler).unwrap();
    scheduler.append_physics([movement(Arc::clone(&world))]);

    let quit = scheduler.quit_signal();
    let frames = Arc::new(Mutex::new(0_u32));
    let counted = Arc::clone(&frames);
    scheduler.append_input([System::new("stopper", move |_| {
        let mut frames = counted.lock();
        *frames += 1;
        if *frames == 5 {
            quit.set(true);
        }
    })]);

    scheduler.run();
    assert_eq!(*frames.lock(), 5);
    assert_eq!(scheduler.syslog()[0].name, "stopper");
    world.lock().check_integrity().unwrap();
}

#[test]
fn test_quit_from_another_thread() {
    let mut scheduler = Scheduler::new();
    scheduler.set_fixed_time_step(Duration::from_millis(1)).unwrap();
    scheduler.append_physics([System::from_fn(|_| {})]);

    let quit = scheduler.quit_signal();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        quit.set(true);
    });

    scheduler.run();
    stopper.join().unwrap();
}
