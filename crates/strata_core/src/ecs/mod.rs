//! # Entity Component System
//!
//! An archetype store: every entity lives in exactly one archetype, the one
//! keyed by its current set of component types.
//!
//! ## Design Philosophy
//!
//! - Components of one archetype are stored in parallel dense columns
//! - Deletion tombstones a slot instead of compacting, so row positions are
//!   stable during iteration; freed slots are reused before columns grow
//! - Queries cache their matching archetypes and only look at archetypes
//!   created since the last refresh
//! - Every world owns its own tag registry; there is no process-wide state
//!   besides the counter handing out world identities

pub mod archetype;
mod component;
mod entity;
pub mod filter;
pub mod query;
mod storage;
mod world;

pub use archetype::{Archetype, ArchetypeEngine, ArchetypeId, ArchetypeStats, Lookup, TagSet};
pub use component::{Bundle, Component, ComponentTag, Position, TagRegistry, Velocity};
pub use entity::{EntityId, IdAllocator};
pub use filter::{Filter, FilterList, Predicate};
pub use query::{Deleter, Fetch, Query};
pub use storage::{Column, ComponentColumn};
pub use world::{World, WorldId};
