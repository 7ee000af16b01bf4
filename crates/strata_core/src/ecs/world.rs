//! # ECS World
//!
//! The facade over the archetype engine. Owns the id allocator, the tag
//! registry, and the authoritative map from entity to archetype; every
//! mutation enters through here.
//!
//! Engine operations report internal inconsistencies as [`StorageDefect`]s.
//! The world never hands those to callers: they mean the engine and the map
//! have desynchronized, so the defect is logged and the process panics.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::archetype::{ArchetypeEngine, ArchetypeId, ArchetypeStats, TagSet};
use super::component::{Bundle, Component, TagRegistry};
use super::entity::{EntityId, IdAllocator};
use super::filter::Filter;
use super::query::{Fetch, Query};
use crate::config::WorldConfig;
use crate::error::{ConfigResult, StorageDefect, StorageResult};

static NEXT_WORLD: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`World`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldId(u64);

impl WorldId {
    fn next() -> Self {
        Self(NEXT_WORLD.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world#{}", self.0)
    }
}

/// Escalates an engine defect: logs it and panics.
#[cold]
#[track_caller]
pub(crate) fn fatal(defect: StorageDefect) -> ! {
    tracing::error!(%defect, "archetype storage desynchronized");
    panic!("internal storage defect: {defect}");
}

/// The ECS World - container for all entities and their components.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new();
///
/// let id = world.new_id();
/// world.write(id, (Position::new(0.0, 0.0, 0.0),));
/// world.write(id, (Velocity::new(1.0, 1.0, 0.0),));
/// assert_eq!(world.read::<Position>(id), Some(Position::new(0.0, 0.0, 0.0)));
/// ```
pub struct World {
    id: WorldId,
    ids: IdAllocator,
    /// Where each live entity currently lives.
    arch: HashMap<EntityId, ArchetypeId>,
    registry: TagRegistry,
    engine: ArchetypeEngine,
}

impl World {
    /// Creates an empty world with the default id range `[2, u32::MAX]`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_allocator(IdAllocator::default())
    }

    /// Creates an empty world from configuration.
    ///
    /// # Errors
    ///
    /// Rejects an id range that [`IdAllocator::new`] rejects.
    pub fn from_config(config: &WorldConfig) -> ConfigResult<Self> {
        Ok(Self::with_allocator(IdAllocator::new(config.min_id, config.max_id)?))
    }

    fn with_allocator(ids: IdAllocator) -> Self {
        let id = WorldId::next();
        tracing::debug!(world = %id, min_id = ids.min(), max_id = ids.max(), "created world");
        Self {
            id,
            ids,
            arch: HashMap::new(),
            registry: TagRegistry::new(),
            engine: ArchetypeEngine::new(),
        }
    }

    /// Returns this world's identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> WorldId {
        self.id
    }

    /// Replaces the id allocation range.
    ///
    /// # Panics
    ///
    /// Panics if `min > max` or either bound is at or below
    /// [`EntityId::FIRST_ENTITY`].
    pub fn set_id_range(&mut self, min: u32, max: u32) {
        if let Err(error) = self.ids.set_range(min, max) {
            panic!("{error}");
        }
        tracing::debug!(world = %self.id, min_id = min, max_id = max, "changed id range");
    }

    /// Allocates the next entity id.
    ///
    /// Wraps to the range minimum after the maximum. A recycled id is not
    /// checked for liveness.
    pub fn new_id(&mut self) -> EntityId {
        self.ids.next_id()
    }

    /// Writes a bundle of components to `id` (upsert).
    ///
    /// - Unknown id: the entity is inserted into the archetype of exactly the
    ///   bundle's types
    /// - Known id, no new type: the values are overwritten in place
    /// - Known id, new types: the entity migrates to the archetype of the
    ///   union, keeping every value it already had
    ///
    /// A type repeated inside one bundle is written in order, so the last
    /// value wins.
    ///
    /// # Returns
    ///
    /// `false` if nothing was written: the bundle is `()` or `id` is
    /// [`EntityId::INVALID`].
    pub fn write<B: Bundle>(&mut self, id: EntityId, bundle: B) -> bool {
        if id.is_invalid() {
            return false;
        }
        let tags = B::register(&mut self.registry);
        if tags.is_empty() {
            return false;
        }

        let result = match self.arch.get(&id).copied() {
            Some(from) => self.engine.migrate(from, id, bundle, &tags),
            None => {
                let archetype = self.engine.resolve(TagSet::new(tags.clone()));
                self.engine
                    .insert(archetype, id, bundle, &tags)
                    .map(|_| archetype)
            }
        };
        let archetype = result.unwrap_or_else(|defect| fatal(defect));
        self.arch.insert(id, archetype);
        true
    }

    /// Returns a copy of `id`'s `T` component.
    #[must_use]
    pub fn read<T: Component>(&self, id: EntityId) -> Option<T> {
        self.get::<T>(id).cloned()
    }

    /// Borrows `id`'s `T` component.
    #[must_use]
    pub fn get<T: Component>(&self, id: EntityId) -> Option<&T> {
        let archetype_id = *self.arch.get(&id)?;
        let tag = self.registry.tag_of::<T>()?;

        let archetype = self.engine.get(archetype_id).unwrap_or_else(|defect| fatal(defect));
        let Some(slot) = archetype.lookup().slot_of(id) else {
            fatal(StorageDefect::MissingSlot {
                archetype: archetype_id,
                id,
            });
        };
        archetype
            .component::<T>(tag, slot)
            .unwrap_or_else(|defect| fatal(defect))
    }

    /// Mutably borrows `id`'s `T` component.
    ///
    /// The borrow holds the whole world, so no structural change can happen
    /// while it is alive.
    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        let archetype_id = *self.arch.get(&id)?;
        let tag = self.registry.tag_of::<T>()?;

        let archetype = self
            .engine
            .get_mut(archetype_id)
            .unwrap_or_else(|defect| fatal(defect));
        let Some(slot) = archetype.lookup().slot_of(id) else {
            fatal(StorageDefect::MissingSlot {
                archetype: archetype_id,
                id,
            });
        };
        archetype
            .component_mut::<T>(tag, slot)
            .unwrap_or_else(|defect| fatal(defect))
    }

    /// Deletes an entity. Its slot becomes a hole; no other slot moves.
    ///
    /// # Returns
    ///
    /// `false` if `id` is unknown or already deleted.
    pub fn delete(&mut self, id: EntityId) -> bool {
        let Some(archetype) = self.arch.remove(&id) else {
            return false;
        };
        if let Err(defect) = self.engine.tag_for_deletion(archetype, id) {
            fatal(defect);
        }
        true
    }

    /// Checks if `id` is live.
    #[inline]
    #[must_use]
    pub fn exists(&self, id: EntityId) -> bool {
        self.arch.contains_key(&id)
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.arch.len()
    }

    /// Checks if the world has no live entity.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arch.is_empty()
    }

    /// Archetype `id` currently lives in.
    #[inline]
    #[must_use]
    pub fn archetype_of(&self, id: EntityId) -> Option<ArchetypeId> {
        self.arch.get(&id).copied()
    }

    /// Builds a query over this world.
    ///
    /// # Panics
    ///
    /// Panics if `Q` names the same component type twice.
    pub fn query<Q: Fetch>(&mut self, filters: &[Filter]) -> Query<Q> {
        Query::new(self, filters)
    }

    /// Slot usage of every archetype, in creation order.
    #[must_use]
    pub fn describe_memory(&self) -> Vec<ArchetypeStats> {
        self.engine.stats()
    }

    /// Audits the engine and the entity map against each other.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found. Nothing reachable through the
    /// public API produces one.
    pub fn check_integrity(&self) -> StorageResult<()> {
        self.engine.audit()?;

        for (&id, &archetype) in &self.arch {
            if self.engine.get(archetype)?.lookup().slot_of(id).is_none() {
                return Err(StorageDefect::Unrouted { id, archetype });
            }
        }
        for archetype in self.engine.archetypes() {
            for &id in archetype.lookup().ids() {
                if !id.is_invalid() && self.arch.get(&id) != Some(&archetype.id()) {
                    return Err(StorageDefect::Unrouted {
                        id,
                        archetype: archetype.id(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The component tag registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    /// The archetype engine.
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &ArchetypeEngine {
        &self.engine
    }

    pub(crate) fn registry_mut(&mut self) -> &mut TagRegistry {
        &mut self.registry
    }

    pub(crate) fn engine_mut(&mut self) -> &mut ArchetypeEngine {
        &mut self.engine
    }

    /// Entity routes and storage, borrowed apart for a deleting pass.
    pub(crate) fn split_routes_mut(
        &mut self,
    ) -> (&mut HashMap<EntityId, ArchetypeId>, &mut ArchetypeEngine) {
        (&mut self.arch, &mut self.engine)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::{Position, Velocity};

    #[derive(Clone, Debug, PartialEq)]
    struct Name(String);

    impl Component for Name {}

    #[test]
    fn test_world_ids_are_unique() {
        assert_ne!(World::new().id(), World::new().id());
    }

    #[test]
    fn test_write_then_read() {
        let mut world = World::new();
        let id = world.new_id();
        assert!(world.write(id, (Position::new(1.0, 2.0, 3.0), Name("a".into()))));

        assert_eq!(world.read::<Position>(id), Some(Position::new(1.0, 2.0, 3.0)));
        assert_eq!(world.get::<Name>(id), Some(&Name("a".into())));
        assert_eq!(world.read::<Velocity>(id), None);
        assert_eq!(world.len(), 1);
        world.check_integrity().unwrap();
    }

    #[test]
    fn test_empty_and_invalid_writes_are_noops() {
        let mut world = World::new();
        assert!(!world.write(EntityId::new(7), ()));
        assert!(!world.write(EntityId::INVALID, (Position::default(),)));
        assert!(!world.exists(EntityId::new(7)));
        assert!(world.is_empty());
        assert_eq!(world.engine().version(), 0);
    }

    #[test]
    fn test_repeated_type_last_value_wins() {
        let mut world = World::new();
        let id = EntityId::new(3);
        world.write(id, (Name("first".into()), Name("second".into())));
        assert_eq!(world.read::<Name>(id), Some(Name("second".into())));
        world.check_integrity().unwrap();
    }

    #[test]
    fn test_get_mut_edits_in_place() {
        let mut world = World::new();
        let id = EntityId::new(3);
        world.write(id, (Position::default(),));
        world.get_mut::<Position>(id).unwrap().x = 5.0;
        assert!((world.read::<Position>(id).unwrap().x - 5.0).abs() < f32::EPSILON);
        assert!(world.get_mut::<Velocity>(id).is_none());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut world = World::new();
        let id = EntityId::new(4);
        world.write(id, (Position::default(),));

        assert!(world.delete(id));
        assert!(!world.exists(id));
        assert!(!world.delete(id));
        assert!(world.read::<Position>(id).is_none());
        assert!(!world.delete(EntityId::new(99)));
        world.check_integrity().unwrap();
    }

    #[test]
    fn test_archetype_of_follows_migration() {
        let mut world = World::new();
        let id = EntityId::new(5);
        world.write(id, (Position::default(),));
        let before = world.archetype_of(id).unwrap();
        world.write(id, (Velocity::default(),));
        let after = world.archetype_of(id).unwrap();
        assert_ne!(before, after);
        assert_eq!(world.engine().get(after).unwrap().tags().len(), 2);
    }

    #[test]
    fn test_from_config_rejects_reserved_range() {
        let config = WorldConfig { min_id: 1, max_id: 10 };
        assert!(World::from_config(&config).is_err());

        let config = WorldConfig { min_id: 50, max_id: 51 };
        let mut world = World::from_config(&config).unwrap();
        assert_eq!(world.new_id().raw(), 50);
        assert_eq!(world.new_id().raw(), 51);
        assert_eq!(world.new_id().raw(), 50);
    }

    #[test]
    #[should_panic(expected = "greater than max")]
    fn test_set_id_range_panics_on_inverted_range() {
        World::new().set_id_range(10, 5);
    }

    #[test]
    fn test_describe_memory_reports_holes() {
        let mut world = World::new();
        for raw in 2..6 {
            world.write(EntityId::new(raw), (Position::default(),));
        }
        world.delete(EntityId::new(3));

        let stats = world.describe_memory();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].slots, 4);
        assert_eq!(stats[0].holes, 1);
        assert_eq!(stats[0].live, 3);
    }
}
