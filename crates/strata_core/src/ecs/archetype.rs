//! # Archetype-based Entity Storage
//!
//! Entities with the same component set are stored together, one dense
//! column per component type plus an id column that is index-aligned with
//! every data column:
//!
//! ```text
//! Archetype {Position, Velocity}:
//!   ids:       [ e5,  e9,  0,   e12 ]   <- 0 marks a hole
//!   Position:  [ P5,  P9,  P?,  P12 ]
//!   Velocity:  [ V5,  V9,  V?,  V12 ]
//!   holes:     [ 2 ]
//! ```
//!
//! Deletion never shifts rows. It overwrites the id slot with
//! [`EntityId::INVALID`] and pushes the slot on the free list; the next
//! insertion into the archetype reuses it before the columns grow. Row
//! positions therefore stay stable while an iteration is walking the id
//! column.

use std::collections::HashMap;
use std::fmt;

use super::component::{Bundle, Component, ComponentTag};
use super::entity::EntityId;
use super::storage::{Column, ComponentColumn};
use crate::error::{StorageDefect, StorageResult};

/// Identifier of an archetype within one [`ArchetypeEngine`].
///
/// Ids are dense and assigned in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// Position of this archetype in creation order.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arch#{}", self.0)
    }
}

/// Unordered set of component tags identifying an archetype.
///
/// Stored sorted and deduplicated, so two sets built from the same tags in
/// any order compare and hash equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TagSet {
    tags: Vec<ComponentTag>,
}

impl TagSet {
    /// Creates a set from tags in any order, repeats allowed.
    #[must_use]
    pub fn new(mut tags: Vec<ComponentTag>) -> Self {
        tags.sort_unstable();
        tags.dedup();
        Self { tags }
    }

    /// Checks if the set contains a tag.
    #[inline]
    #[must_use]
    pub fn contains(&self, tag: ComponentTag) -> bool {
        self.tags.binary_search(&tag).is_ok()
    }

    /// Checks if every tag of `other` is in this set.
    #[must_use]
    pub fn is_superset_of(&self, other: &Self) -> bool {
        let mut mine = self.tags.iter();
        other.tags.iter().all(|wanted| mine.any(|tag| tag == wanted))
    }

    /// Returns the union of both sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut tags = Vec::with_capacity(self.tags.len() + other.tags.len());
        tags.extend_from_slice(&self.tags);
        tags.extend_from_slice(&other.tags);
        Self::new(tags)
    }

    /// Tags in ascending order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[ComponentTag] {
        &self.tags
    }

    /// Returns the number of component types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Checks if empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Slot bookkeeping of one archetype.
///
/// - `index`: live entity -> slot
/// - `ids`: slot -> entity, [`EntityId::INVALID`] for a hole
/// - `holes`: free slots, each listed once until reused
#[derive(Debug, Default)]
pub struct Lookup {
    index: HashMap<EntityId, usize>,
    ids: Vec<EntityId>,
    holes: Vec<usize>,
}

impl Lookup {
    /// Slot of a live entity.
    #[inline]
    #[must_use]
    pub fn slot_of(&self, id: EntityId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// The id column, holes included.
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    /// Free slots awaiting reuse.
    #[inline]
    #[must_use]
    pub fn holes(&self) -> &[usize] {
        &self.holes
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.index.len()
    }

    /// Claims a slot for `id`, reusing the most recent hole first.
    ///
    /// # Errors
    ///
    /// Fails if the popped hole lies past the id column or still holds a
    /// live id.
    fn allocate(&mut self, archetype: ArchetypeId, id: EntityId) -> StorageResult<usize> {
        let slot = match self.holes.pop() {
            Some(slot) => {
                match self.ids.get(slot) {
                    None => {
                        return Err(StorageDefect::SlotOutOfBounds {
                            archetype,
                            slot,
                            len: self.ids.len(),
                        })
                    }
                    Some(current) if !current.is_invalid() => {
                        return Err(StorageDefect::DuplicateHole { archetype, slot })
                    }
                    Some(_) => {}
                }
                self.ids[slot] = id;
                slot
            }
            None => {
                self.ids.push(id);
                self.ids.len() - 1
            }
        };
        self.index.insert(id, slot);
        Ok(slot)
    }

    /// Tombstones the slot of `id`: marks it as a hole and frees it for
    /// reuse. Only the id column, the index and the hole list change.
    pub(crate) fn tombstone(&mut self, archetype: ArchetypeId, id: EntityId) -> StorageResult<usize> {
        let slot = self
            .index
            .remove(&id)
            .ok_or(StorageDefect::MissingSlot { archetype, id })?;
        let len = self.ids.len();
        let entry = self
            .ids
            .get_mut(slot)
            .ok_or(StorageDefect::SlotOutOfBounds { archetype, slot, len })?;
        *entry = EntityId::INVALID;
        self.holes.push(slot);
        Ok(slot)
    }
}

/// A column together with the tag it stores.
pub(crate) struct ColumnEntry {
    tag: ComponentTag,
    column: Box<dyn Column>,
}

/// Columns of one archetype handed out for a query pass: the id column plus
/// one optional column per requested tag, in request order.
pub(crate) type PickedColumns<'a> = (&'a [EntityId], Vec<Option<&'a mut (dyn Column + 'static)>>);

/// A single archetype: every entity with exactly this component set.
pub struct Archetype {
    id: ArchetypeId,
    tags: TagSet,
    lookup: Lookup,
    /// Sorted by tag. Created on the first write of each type.
    columns: Vec<ColumnEntry>,
}

impl Archetype {
    fn new(id: ArchetypeId, tags: TagSet) -> Self {
        let columns = Vec::with_capacity(tags.len());
        Self {
            id,
            tags,
            lookup: Lookup::default(),
            columns,
        }
    }

    /// Returns the id of this archetype.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    /// Returns the component set of this archetype.
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Returns the slot bookkeeping.
    #[inline]
    #[must_use]
    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    /// Number of slots, holes included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookup.ids.len()
    }

    /// Checks if the archetype has no slots at all.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.ids.is_empty()
    }

    fn column_position(&self, tag: ComponentTag) -> Result<usize, usize> {
        self.columns.binary_search_by_key(&tag, |entry| entry.tag)
    }

    fn check_slot(&self, slot: usize) -> StorageResult<()> {
        if slot < self.lookup.ids.len() {
            Ok(())
        } else {
            Err(StorageDefect::SlotOutOfBounds {
                archetype: self.id,
                slot,
                len: self.lookup.ids.len(),
            })
        }
    }

    /// Returns the column for `tag`, creating it with `make` if absent.
    fn column_or_insert(
        &mut self,
        tag: ComponentTag,
        make: impl FnOnce() -> Box<dyn Column>,
    ) -> StorageResult<&mut dyn Column> {
        if !self.tags.contains(tag) {
            return Err(StorageDefect::MissingColumn {
                archetype: self.id,
                tag,
            });
        }
        let position = match self.column_position(tag) {
            Ok(position) => position,
            Err(position) => {
                self.columns.insert(position, ColumnEntry { tag, column: make() });
                position
            }
        };
        Ok(self.columns[position].column.as_mut())
    }

    /// Stores a component value at `slot`.
    ///
    /// # Errors
    ///
    /// Fails if `tag` is not part of this archetype, the column stores a
    /// different type, or `slot` is not backed by the id column.
    pub fn write_component<C: Component>(
        &mut self,
        tag: ComponentTag,
        slot: usize,
        value: C,
    ) -> StorageResult<()> {
        self.check_slot(slot)?;
        let id = self.id;
        let column = self.column_or_insert(tag, || Box::new(ComponentColumn::<C>::new()))?;
        let len = column.len();
        let column = column
            .as_any_mut()
            .downcast_mut::<ComponentColumn<C>>()
            .ok_or(StorageDefect::ColumnType {
                archetype: id,
                tag,
                expected: std::any::type_name::<C>(),
            })?;
        if column.put(slot, value) {
            Ok(())
        } else {
            Err(StorageDefect::SlotOutOfBounds {
                archetype: id,
                slot,
                len,
            })
        }
    }

    /// Typed view of a column, `None` if this archetype lacks `tag`.
    ///
    /// # Errors
    ///
    /// Fails if the column stores a different type.
    pub fn column<C: Component>(
        &self,
        tag: ComponentTag,
    ) -> StorageResult<Option<&ComponentColumn<C>>> {
        let Ok(position) = self.column_position(tag) else {
            return Ok(None);
        };
        self.columns[position]
            .column
            .as_any()
            .downcast_ref::<ComponentColumn<C>>()
            .map(Some)
            .ok_or(StorageDefect::ColumnType {
                archetype: self.id,
                tag,
                expected: std::any::type_name::<C>(),
            })
    }

    /// Mutable typed view of a column, `None` if this archetype lacks `tag`.
    ///
    /// # Errors
    ///
    /// Fails if the column stores a different type.
    pub fn column_mut<C: Component>(
        &mut self,
        tag: ComponentTag,
    ) -> StorageResult<Option<&mut ComponentColumn<C>>> {
        let Ok(position) = self.column_position(tag) else {
            return Ok(None);
        };
        let id = self.id;
        self.columns[position]
            .column
            .as_any_mut()
            .downcast_mut::<ComponentColumn<C>>()
            .map(Some)
            .ok_or(StorageDefect::ColumnType {
                archetype: id,
                tag,
                expected: std::any::type_name::<C>(),
            })
    }

    /// Reads the component at `slot`, `None` if this archetype lacks `tag`.
    ///
    /// # Errors
    ///
    /// Fails on a type mismatch or if `slot` is past the column end.
    pub fn component<C: Component>(&self, tag: ComponentTag, slot: usize) -> StorageResult<Option<&C>> {
        self.check_slot(slot)?;
        match self.column::<C>(tag)? {
            Some(column) => column.get(slot).map(Some).ok_or(StorageDefect::ColumnLength {
                archetype: self.id,
                tag,
                column: column.len(),
                ids: self.lookup.ids.len(),
            }),
            None => Ok(None),
        }
    }

    /// Mutable form of [`Archetype::component`].
    ///
    /// # Errors
    ///
    /// Fails on a type mismatch or if `slot` is past the column end.
    pub fn component_mut<C: Component>(
        &mut self,
        tag: ComponentTag,
        slot: usize,
    ) -> StorageResult<Option<&mut C>> {
        self.check_slot(slot)?;
        let (id, ids) = (self.id, self.lookup.ids.len());
        match self.column_mut::<C>(tag)? {
            Some(column) => {
                let len = column.len();
                column.get_mut(slot).map(Some).ok_or(StorageDefect::ColumnLength {
                    archetype: id,
                    tag,
                    column: len,
                    ids,
                })
            }
            None => Ok(None),
        }
    }

    /// First tag of `wanted` without a column in this archetype.
    #[must_use]
    pub fn first_missing_column(&self, wanted: &[ComponentTag]) -> Option<ComponentTag> {
        wanted
            .iter()
            .copied()
            .find(|tag| self.column_position(*tag).is_err())
    }

    /// Splits the archetype into its id column and the requested columns.
    ///
    /// Entry `i` of the returned vector is the column for `wanted[i]`, or
    /// `None` if this archetype has no such column. A tag repeated in
    /// `wanted` is only handed out once.
    pub(crate) fn pick_columns(&mut self, wanted: &[ComponentTag]) -> PickedColumns<'_> {
        let (lookup, picked) = self.pick_columns_with_lookup(wanted);
        (&lookup.ids, picked)
    }

    /// Like [`Archetype::pick_columns`] but hands out the slot bookkeeping
    /// mutably, so slots can be tombstoned while the columns are borrowed.
    pub(crate) fn pick_columns_with_lookup(
        &mut self,
        wanted: &[ComponentTag],
    ) -> (&mut Lookup, Vec<Option<&mut (dyn Column + 'static)>>) {
        let mut picked: Vec<Option<&mut (dyn Column + 'static)>> =
            std::iter::repeat_with(|| None).take(wanted.len()).collect();
        for entry in &mut self.columns {
            if let Some(position) = wanted.iter().position(|tag| *tag == entry.tag) {
                picked[position] = Some(entry.column.as_mut());
            }
        }
        (&mut self.lookup, picked)
    }

    fn tag_for_deletion(&mut self, id: EntityId) -> StorageResult<usize> {
        self.lookup.tombstone(self.id, id)
    }

    /// Verifies the slot bookkeeping and column lengths of this archetype.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn audit(&self) -> StorageResult<()> {
        let ids = &self.lookup.ids;

        for (&id, &slot) in &self.lookup.index {
            if ids.get(slot) != Some(&id) {
                return Err(StorageDefect::StaleIndex {
                    archetype: self.id,
                    id,
                    slot,
                });
            }
        }

        let mut is_hole = vec![false; ids.len()];
        for &slot in &self.lookup.holes {
            let valid = ids.get(slot).is_some_and(|id| id.is_invalid());
            if !valid || std::mem::replace(&mut is_hole[slot], true) {
                return Err(StorageDefect::DuplicateHole {
                    archetype: self.id,
                    slot,
                });
            }
        }
        if let Some(slot) = ids
            .iter()
            .enumerate()
            .position(|(slot, id)| id.is_invalid() != is_hole[slot])
        {
            return Err(StorageDefect::DuplicateHole {
                archetype: self.id,
                slot,
            });
        }

        if ids.is_empty() {
            return Ok(());
        }
        for &tag in self.tags.as_slice() {
            let Ok(position) = self.column_position(tag) else {
                return Err(StorageDefect::MissingColumn {
                    archetype: self.id,
                    tag,
                });
            };
            let column = self.columns[position].column.len();
            if column != ids.len() {
                return Err(StorageDefect::ColumnLength {
                    archetype: self.id,
                    tag,
                    column,
                    ids: ids.len(),
                });
            }
        }
        Ok(())
    }

    /// Memory statistics for this archetype.
    #[must_use]
    pub fn stats(&self) -> ArchetypeStats {
        let slots = self.lookup.ids.len();
        let holes = self.lookup.holes.len();
        ArchetypeStats {
            id: self.id,
            component_count: self.tags.len(),
            slots,
            holes,
            live: self.lookup.live_count(),
        }
    }
}

/// Slot usage of one archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchetypeStats {
    /// The archetype.
    pub id: ArchetypeId,
    /// Number of component types.
    pub component_count: usize,
    /// Allocated slots, holes included.
    pub slots: usize,
    /// Slots waiting for reuse.
    pub holes: usize,
    /// Live entities.
    pub live: usize,
}

impl ArchetypeStats {
    /// Fraction of slots holding live entities (1.0 when empty).
    #[must_use]
    pub fn efficiency(&self) -> f32 {
        if self.slots == 0 {
            1.0
        } else {
            1.0 - (self.holes as f32 / self.slots as f32)
        }
    }
}

/// Registry of all archetypes and owner of their column storage.
///
/// The registry only grows; its length doubles as the version that
/// [`FilterList`](super::filter::FilterList) compares against.
#[derive(Default)]
pub struct ArchetypeEngine {
    archetypes: Vec<Archetype>,
    by_tags: HashMap<TagSet, ArchetypeId>,
}

impl ArchetypeEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry version: bumped each time an archetype is created.
    #[inline]
    #[must_use]
    pub fn version(&self) -> usize {
        self.archetypes.len()
    }

    /// All archetypes in creation order.
    #[inline]
    #[must_use]
    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    /// Looks up an archetype by its exact component set.
    #[must_use]
    pub fn find(&self, tags: &TagSet) -> Option<ArchetypeId> {
        self.by_tags.get(tags).copied()
    }

    /// Returns the archetype for `tags`, creating an empty one on first
    /// occurrence.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` archetypes are created.
    pub fn resolve(&mut self, tags: TagSet) -> ArchetypeId {
        if let Some(id) = self.by_tags.get(&tags) {
            return *id;
        }

        let raw = u32::try_from(self.archetypes.len())
            .unwrap_or_else(|_| panic!("archetype id space exhausted"));
        let id = ArchetypeId(raw);
        tracing::debug!(
            archetype = %id,
            components = tags.len(),
            version = self.archetypes.len() + 1,
            "registered archetype"
        );
        self.by_tags.insert(tags.clone(), id);
        self.archetypes.push(Archetype::new(id, tags));
        id
    }

    /// Returns an archetype.
    ///
    /// # Errors
    ///
    /// [`StorageDefect::MissingArchetype`] if the id is unknown.
    pub fn get(&self, id: ArchetypeId) -> StorageResult<&Archetype> {
        self.archetypes
            .get(id.index())
            .ok_or(StorageDefect::MissingArchetype(id))
    }

    /// Returns an archetype mutably.
    ///
    /// # Errors
    ///
    /// [`StorageDefect::MissingArchetype`] if the id is unknown.
    pub fn get_mut(&mut self, id: ArchetypeId) -> StorageResult<&mut Archetype> {
        self.archetypes
            .get_mut(id.index())
            .ok_or(StorageDefect::MissingArchetype(id))
    }

    /// Borrows two distinct archetypes mutably at once.
    fn pair_mut(
        &mut self,
        first: ArchetypeId,
        second: ArchetypeId,
    ) -> StorageResult<(&mut Archetype, &mut Archetype)> {
        let len = self.archetypes.len();
        for id in [first, second] {
            if id.index() >= len {
                return Err(StorageDefect::MissingArchetype(id));
            }
        }
        let (a, b) = (first.index(), second.index());
        if a < b {
            let (low, high) = self.archetypes.split_at_mut(b);
            Ok((&mut low[a], &mut high[0]))
        } else if a > b {
            let (low, high) = self.archetypes.split_at_mut(a);
            Ok((&mut high[0], &mut low[b]))
        } else {
            Err(StorageDefect::MissingArchetype(second))
        }
    }

    /// Inserts a new entity into `archetype`, reusing a hole if one exists.
    ///
    /// # Errors
    ///
    /// Propagates storage defects.
    pub fn insert<B: Bundle>(
        &mut self,
        archetype: ArchetypeId,
        id: EntityId,
        bundle: B,
        tags: &[ComponentTag],
    ) -> StorageResult<usize> {
        let archetype = self.get_mut(archetype)?;
        let slot = archetype.lookup.allocate(archetype.id, id)?;
        bundle.write_into(archetype, tags, slot)?;
        Ok(slot)
    }

    /// Writes `bundle` to an entity that currently lives in `from`.
    ///
    /// If the bundle adds no new type the values are overwritten in place.
    /// Otherwise the entity moves to the archetype of the union: retained
    /// values are copied across, the bundle is written on top, and the old
    /// slot is tombstoned.
    ///
    /// # Returns
    ///
    /// The archetype the entity lives in afterwards.
    ///
    /// # Errors
    ///
    /// Propagates storage defects.
    pub fn migrate<B: Bundle>(
        &mut self,
        from: ArchetypeId,
        id: EntityId,
        bundle: B,
        tags: &[ComponentTag],
    ) -> StorageResult<ArchetypeId> {
        let current = self.get(from)?.tags();
        if tags.iter().all(|tag| current.contains(*tag)) {
            let archetype = self.get_mut(from)?;
            let slot = archetype.lookup.slot_of(id).ok_or(StorageDefect::MissingSlot {
                archetype: from,
                id,
            })?;
            bundle.write_into(archetype, tags, slot)?;
            return Ok(from);
        }

        let union = current.union(&TagSet::new(tags.to_vec()));
        let to = self.resolve(union);
        let (source, target) = self.pair_mut(from, to)?;

        let source_slot = source.lookup.slot_of(id).ok_or(StorageDefect::MissingSlot {
            archetype: from,
            id,
        })?;
        let target_slot = target.lookup.allocate(to, id)?;

        for entry in &source.columns {
            let column = target.column_or_insert(entry.tag, || entry.column.empty_like())?;
            let len = column.len();
            if !entry.column.copy_row_to(source_slot, column, target_slot) {
                return Err(StorageDefect::SlotOutOfBounds {
                    archetype: to,
                    slot: target_slot,
                    len,
                });
            }
        }
        bundle.write_into(target, tags, target_slot)?;
        source.tag_for_deletion(id)?;

        tracing::trace!(entity = %id, from = %from, to = %to, "migrated entity");
        Ok(to)
    }

    /// Tombstones the slot of `id` in `archetype`. Other slots never move.
    ///
    /// # Errors
    ///
    /// Fails if the entity has no slot there.
    pub fn tag_for_deletion(&mut self, archetype: ArchetypeId, id: EntityId) -> StorageResult<()> {
        let slot = self.get_mut(archetype)?.tag_for_deletion(id)?;
        tracing::trace!(entity = %id, archetype = %archetype, slot, "tombstoned slot");
        Ok(())
    }

    /// Audits every archetype.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn audit(&self) -> StorageResult<()> {
        self.archetypes.iter().try_for_each(Archetype::audit)
    }

    /// Memory statistics for every archetype, in creation order.
    #[must_use]
    pub fn stats(&self) -> Vec<ArchetypeStats> {
        self.archetypes.iter().map(Archetype::stats).collect()
    }
}
