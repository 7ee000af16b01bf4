//! # Queries
//!
//! A [`Query`] binds a tuple of component types to a [`FilterList`] and
//! walks the matching archetypes column by column.
//!
//! One generic implementation serves every arity from 1 to 12: the
//! [`Fetch`] trait is implemented for component tuples by a macro, and the
//! query itself never names a concrete arity.
//!
//! ## Matching
//!
//! The tuple's types are *required*: an archetype matches only if its tag
//! set contains all of them, on top of any [`Filter`] predicates. Because of
//! that, [`Query::map_id`] and [`Query::map_slices`] hand out plain
//! references. [`Query::read`] bypasses the filter and works for any live
//! entity, so every component it returns is optional.
//!
//! ## Borrowing
//!
//! Every reference produced borrows the `&mut World` passed to the call, so
//! it cannot outlive the call and writes cannot restructure the world while
//! a callback runs. Deletion is the exception: it only tombstones a slot and
//! never touches component data, so [`Query::map_id_deleting`] hands the
//! callback a [`Deleter`] that removes entities immediately.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use super::archetype::{ArchetypeEngine, ArchetypeId, Lookup};
use super::component::{Component, ComponentTag, TagRegistry};
use super::entity::EntityId;
use super::filter::{Filter, FilterList};
use super::storage::{Column, ComponentColumn};
use super::world::{fatal, World, WorldId};
use crate::error::StorageDefect;

/// Downcasts a picked column to a typed slice.
fn typed_slice<'a, C: Component>(column: Option<&'a mut (dyn Column + 'static)>) -> Option<&'a mut [C]> {
    column?
        .as_any_mut()
        .downcast_mut::<ComponentColumn<C>>()
        .map(ComponentColumn::as_mut_slice)
}

/// A tuple of component types a [`Query`] can fetch.
///
/// Implemented for `(A,)` through `(A, B, C, D, E, F, G, H, I, J, K, L)`.
pub trait Fetch: 'static {
    /// One entity's components, all present.
    type Item<'a>
    where
        Self: 'a;

    /// One entity's components, each possibly absent.
    type Maybe<'a>
    where
        Self: 'a;

    /// Whole columns of one archetype.
    type Slices<'a>
    where
        Self: 'a;

    /// Tags of the tuple's types, in tuple order.
    fn register(registry: &mut TagRegistry) -> Vec<ComponentTag>;

    /// All components absent.
    fn none<'a>() -> Self::Maybe<'a>;

    /// Components at `slot` of the picked columns, `None` where a column is
    /// missing.
    fn maybe<'a>(picked: Vec<Option<&'a mut (dyn Column + 'static)>>, slot: usize) -> Self::Maybe<'a>;

    /// Typed columns, or `None` unless every column is present.
    fn slices<'a>(picked: Vec<Option<&'a mut (dyn Column + 'static)>>) -> Option<Self::Slices<'a>>;

    /// Components at `slot` of already typed columns.
    fn item<'s>(slices: &'s mut Self::Slices<'_>, slot: usize) -> Self::Item<'s>;
}

macro_rules! impl_fetch {
    ($(($ty:ident, $idx:tt)),+) => {
        impl<$($ty: Component),+> Fetch for ($($ty,)+) {
            type Item<'a> = ($(&'a mut $ty,)+);
            type Maybe<'a> = ($(Option<&'a mut $ty>,)+);
            type Slices<'a> = ($(&'a mut [$ty],)+);

            fn register(registry: &mut TagRegistry) -> Vec<ComponentTag> {
                vec![$(registry.register::<$ty>()),+]
            }

            fn none<'a>() -> Self::Maybe<'a> {
                ($(Option::<&'a mut $ty>::None,)+)
            }

            fn maybe<'a>(
                picked: Vec<Option<&'a mut (dyn Column + 'static)>>,
                slot: usize,
            ) -> Self::Maybe<'a> {
                let mut picked = picked.into_iter();
                ($(typed_slice::<$ty>(picked.next().flatten()).and_then(|column| column.get_mut(slot)),)+)
            }

            fn slices<'a>(
                picked: Vec<Option<&'a mut (dyn Column + 'static)>>,
            ) -> Option<Self::Slices<'a>> {
                let mut picked = picked.into_iter();
                Some(($(typed_slice::<$ty>(picked.next().flatten())?,)+))
            }

            fn item<'s>(slices: &'s mut Self::Slices<'_>, slot: usize) -> Self::Item<'s> {
                ($(&mut slices.$idx[slot],)+)
            }
        }
    };
}

impl_fetch!((A, 0));
impl_fetch!((A, 0), (B, 1));
impl_fetch!((A, 0), (B, 1), (C, 2));
impl_fetch!((A, 0), (B, 1), (C, 2), (D, 3));
impl_fetch!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4));
impl_fetch!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5));
impl_fetch!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6));
impl_fetch!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7));
impl_fetch!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7), (I, 8));
impl_fetch!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7), (I, 8), (J, 9));
impl_fetch!(
    (A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7), (I, 8), (J, 9), (K, 10)
);
impl_fetch!(
    (A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7), (I, 8), (J, 9), (K, 10),
    (L, 11)
);

/// A typed, filtered accessor over one [`World`].
///
/// # Example
///
/// ```rust,ignore
/// let mut movers = world.query::<(Position, Velocity)>(&[]);
/// movers.map_id(&mut world, |_id, (pos, vel)| {
///     pos.x += vel.x * dt;
/// });
/// ```
pub struct Query<Q: Fetch> {
    world: WorldId,
    tags: Vec<ComponentTag>,
    filter: FilterList,
    _marker: PhantomData<fn() -> Q>,
}

impl<Q: Fetch> Query<Q> {
    /// Builds a query over `world` and refreshes its filter once.
    ///
    /// # Panics
    ///
    /// Panics if the tuple names the same component type twice.
    pub fn new(world: &mut World, filters: &[Filter]) -> Self {
        let registry = world.registry_mut();
        let tags = Q::register(registry);

        let mut seen = HashSet::with_capacity(tags.len());
        if let Some(repeated) = tags.iter().find(|tag| !seen.insert(**tag)) {
            let name = registry.name(*repeated).unwrap_or("<unknown>");
            panic!("query requests component `{name}` more than once");
        }

        let mut filter = FilterList::build(registry, tags.clone(), filters);
        filter.regenerate(world.engine());

        Self {
            world: world.id(),
            tags,
            filter,
            _marker: PhantomData,
        }
    }

    fn check_world(&self, world: &World) {
        assert_eq!(
            self.world,
            world.id(),
            "query used with a world other than the one that built it"
        );
    }

    /// Reads the components of any live entity, matched by the filter or
    /// not. Each component is `None` if the entity's archetype lacks it; all
    /// are `None` for an unknown or invalid id.
    ///
    /// # Panics
    ///
    /// Panics if `world` is not the world this query was built for.
    pub fn read<'w>(&self, world: &'w mut World, id: EntityId) -> Q::Maybe<'w> {
        self.check_world(world);
        if id.is_invalid() {
            return Q::none();
        }
        let Some(archetype_id) = world.archetype_of(id) else {
            return Q::none();
        };

        let archetype = world
            .engine_mut()
            .get_mut(archetype_id)
            .unwrap_or_else(|defect| fatal(defect));
        let Some(slot) = archetype.lookup().slot_of(id) else {
            fatal(StorageDefect::MissingSlot {
                archetype: archetype_id,
                id,
            });
        };
        let (_, picked) = archetype.pick_columns(&self.tags);
        Q::maybe(picked, slot)
    }

    /// Calls `f` for every live entity in every matching archetype.
    ///
    /// Order is archetype creation order, then slot order. Holes are
    /// skipped.
    ///
    /// # Panics
    ///
    /// Panics if `world` is not the world this query was built for.
    pub fn map_id<F>(&mut self, world: &mut World, mut f: F)
    where
        F: FnMut(EntityId, Q::Item<'_>),
    {
        self.map_id_deleting(world, |_, id, item| f(id, item));
    }

    /// Like [`Query::map_id`], but `f` may delete entities through the
    /// [`Deleter`] it is given.
    ///
    /// A deleted entity is gone at once: it is never visited later in the
    /// same pass, and its slot is a hole by the time the pass returns.
    ///
    /// # Panics
    ///
    /// Panics if `world` is not the world this query was built for.
    pub fn map_id_deleting<F>(&mut self, world: &mut World, mut f: F)
    where
        F: FnMut(&mut Deleter<'_>, EntityId, Q::Item<'_>),
    {
        self.check_world(world);
        self.filter.regenerate(world.engine());

        let (routes, engine) = world.split_routes_mut();
        let mut pending = Vec::new();
        for &archetype_id in self.filter.archetypes() {
            flush_pending(engine, &mut pending);
            let archetype = engine.get_mut(archetype_id).unwrap_or_else(|defect| fatal(defect));
            if archetype.is_empty() {
                continue;
            }
            if let Some(tag) = archetype.first_missing_column(&self.tags) {
                fatal(StorageDefect::MissingColumn {
                    archetype: archetype_id,
                    tag,
                });
            }

            let (lookup, picked) = archetype.pick_columns_with_lookup(&self.tags);
            let Some(mut slices) = Q::slices(picked) else {
                fatal(StorageDefect::ColumnType {
                    archetype: archetype_id,
                    tag: self.tags[0],
                    expected: std::any::type_name::<Q>(),
                });
            };
            // Deletes only tombstone, so the id column keeps its length.
            for slot in 0..lookup.ids().len() {
                let id = lookup.ids()[slot];
                if id.is_invalid() {
                    continue;
                }
                let mut deleter = Deleter {
                    current: archetype_id,
                    lookup: &mut *lookup,
                    routes: &mut *routes,
                    pending: &mut pending,
                };
                f(&mut deleter, id, Q::item(&mut slices, slot));
            }
        }
        flush_pending(engine, &mut pending);
    }

    /// Calls `f` once per matching archetype with its raw id column and
    /// component columns, for bulk processing.
    ///
    /// The id slice still contains [`EntityId::INVALID`] at holes; rows at
    /// those positions hold stale data and should be skipped. Archetypes
    /// without any slot are not visited.
    ///
    /// # Panics
    ///
    /// Panics if `world` is not the world this query was built for.
    pub fn map_slices<F>(&mut self, world: &mut World, mut f: F)
    where
        F: FnMut(&[EntityId], Q::Slices<'_>),
    {
        self.check_world(world);
        self.filter.regenerate(world.engine());

        let engine = world.engine_mut();
        for &archetype_id in self.filter.archetypes() {
            let archetype = engine.get_mut(archetype_id).unwrap_or_else(|defect| fatal(defect));
            if archetype.is_empty() {
                continue;
            }
            let (ids, picked) = archetype.pick_columns(&self.tags);
            if let Some(slices) = Q::slices(picked) {
                f(ids, slices);
            }
        }
    }

    /// Number of live entities in matching archetypes.
    ///
    /// # Panics
    ///
    /// Panics if `world` is not the world this query was built for.
    pub fn count(&mut self, world: &World) -> usize {
        self.check_world(world);
        self.filter.regenerate(world.engine());
        self.filter
            .archetypes()
            .iter()
            .map(|&id| {
                world
                    .engine()
                    .get(id)
                    .map_or_else(|defect| fatal(defect), |archetype| archetype.lookup().live_count())
            })
            .sum()
    }

    /// Archetypes matched as of the last refresh, in creation order.
    #[must_use]
    pub fn matched_archetypes(&self) -> &[ArchetypeId] {
        self.filter.archetypes()
    }
}

/// Tombstones deletes queued for archetypes other than the one being walked.
fn flush_pending(engine: &mut ArchetypeEngine, pending: &mut Vec<(ArchetypeId, EntityId)>) {
    for (archetype, id) in pending.drain(..) {
        if let Err(defect) = engine.tag_for_deletion(archetype, id) {
            fatal(defect);
        }
    }
}

/// Deletes entities from inside a [`Query::map_id_deleting`] pass.
///
/// An entity of the archetype being walked is tombstoned on the spot. One
/// living elsewhere leaves the world at once and its slot is tombstoned
/// before that archetype is walked, or when the pass ends.
#[derive(Debug)]
pub struct Deleter<'p> {
    current: ArchetypeId,
    lookup: &'p mut Lookup,
    routes: &'p mut HashMap<EntityId, ArchetypeId>,
    pending: &'p mut Vec<(ArchetypeId, EntityId)>,
}

impl Deleter<'_> {
    /// Deletes `id`. Returns `false` if it did not exist.
    pub fn delete(&mut self, id: EntityId) -> bool {
        let Some(archetype) = self.routes.remove(&id) else {
            return false;
        };
        if archetype == self.current {
            match self.lookup.tombstone(archetype, id) {
                Ok(slot) => tracing::trace!(entity = %id, archetype = %archetype, slot, "tombstoned slot"),
                Err(defect) => fatal(defect),
            }
        } else {
            self.pending.push((archetype, id));
        }
        true
    }

    /// Checks if `id` is still live.
    #[must_use]
    pub fn exists(&self, id: EntityId) -> bool {
        self.routes.contains_key(&id)
    }
}
