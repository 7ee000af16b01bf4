//! # STRATA Core Engine
//!
//! In-memory archetype entity-component storage, plus the fixed-step
//! scheduler that drives systems over it:
//! - Upsert writes that migrate entities between archetypes
//! - O(1) tombstoned deletion with slot reuse
//! - Tuple-generic queries with cached, incrementally refreshed matching
//!
//! ## Architecture Rules
//!
//! 1. **The world map is the source of truth** - an entity is live iff the
//!    world routes it to an archetype
//! 2. **Rows never move** - deletion leaves a hole, migration copies
//! 3. **Borrows are scoped** - references into columns never outlive the
//!    call that produced them
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_core::{EntityId, Position, Velocity, World};
//!
//! let mut world = World::new();
//! let id = world.new_id();
//! world.write(id, (Position::new(0.0, 0.0, 0.0), Velocity::new(1.0, 1.0, 0.0)));
//!
//! let mut movers = world.query::<(Position, Velocity)>(&[]);
//! movers.map_id(&mut world, |_, (pos, vel)| pos.x += vel.x);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod schedule;

pub use config::{EngineConfig, SchedulerConfig, WorldConfig};
pub use ecs::{
    ArchetypeId, ArchetypeStats, Bundle, Component, ComponentTag, Deleter, EntityId, Fetch, Filter,
    IdAllocator, Position, Query, Velocity, World, WorldId,
};
pub use error::{ConfigError, ConfigResult, StorageDefect, StorageResult};
pub use schedule::{Scheduler, Signal, System, SystemLog};
