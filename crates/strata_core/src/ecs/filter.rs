//! # Archetype Filters
//!
//! A [`FilterList`] caches which archetypes satisfy a required tag set plus a
//! conjunction of [`Filter`] predicates. Archetypes are never removed and
//! their tag sets never change, so a cached match stays valid forever; a
//! refresh only has to look at archetypes created since the last one.

use std::any::{type_name, TypeId};

use super::archetype::{ArchetypeEngine, ArchetypeId, TagSet};
use super::component::{Component, ComponentTag, TagRegistry};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Presence {
    With,
    Without,
}

/// A predicate over an archetype's component set, named by type.
///
/// # Example
///
/// ```rust,ignore
/// let mut movers = world.query::<(Position, Velocity)>(&[Filter::without::<Frozen>()]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Filter {
    presence: Presence,
    type_id: TypeId,
    name: &'static str,
}

impl Filter {
    /// Matches archetypes that contain `C`.
    #[must_use]
    pub fn with<C: Component>() -> Self {
        Self {
            presence: Presence::With,
            type_id: TypeId::of::<C>(),
            name: type_name::<C>(),
        }
    }

    /// Matches archetypes that do not contain `C`.
    #[must_use]
    pub fn without<C: Component>() -> Self {
        Self {
            presence: Presence::Without,
            type_id: TypeId::of::<C>(),
            name: type_name::<C>(),
        }
    }

    /// Binds this filter to a tag of `registry`.
    #[must_use]
    pub fn resolve(&self, registry: &mut TagRegistry) -> Predicate {
        Predicate {
            tag: registry.register_raw(self.type_id, self.name),
            present: self.presence == Presence::With,
        }
    }
}

/// A [`Filter`] bound to a concrete [`ComponentTag`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Predicate {
    tag: ComponentTag,
    present: bool,
}

impl Predicate {
    /// "Must include `tag`".
    #[must_use]
    pub const fn with(tag: ComponentTag) -> Self {
        Self { tag, present: true }
    }

    /// "Must exclude `tag`".
    #[must_use]
    pub const fn without(tag: ComponentTag) -> Self {
        Self {
            tag,
            present: false,
        }
    }

    /// Checks an archetype's tag set against this predicate.
    #[inline]
    #[must_use]
    pub fn matches(&self, tags: &TagSet) -> bool {
        tags.contains(self.tag) == self.present
    }
}

/// Cached list of archetypes matching a requirement.
#[derive(Clone, Debug)]
pub struct FilterList {
    required: TagSet,
    predicates: Vec<Predicate>,
    matched: Vec<ArchetypeId>,
    /// Registry version seen by the last refresh.
    version: usize,
}

impl FilterList {
    /// Creates an empty, not yet refreshed list.
    #[must_use]
    pub fn new(required: TagSet, predicates: Vec<Predicate>) -> Self {
        Self {
            required,
            predicates,
            matched: Vec::new(),
            version: 0,
        }
    }

    /// Builds a list from required tags and type-named filters.
    #[must_use]
    pub fn build(registry: &mut TagRegistry, required: Vec<ComponentTag>, filters: &[Filter]) -> Self {
        let predicates = filters.iter().map(|filter| filter.resolve(registry)).collect();
        Self::new(TagSet::new(required), predicates)
    }

    /// Checks a tag set: superset of the required tags and every predicate
    /// holds.
    #[must_use]
    pub fn matches(&self, tags: &TagSet) -> bool {
        tags.is_superset_of(&self.required) && self.predicates.iter().all(|p| p.matches(tags))
    }

    /// Brings the cache up to date with `engine`.
    ///
    /// Does nothing when the registry version is unchanged; otherwise only
    /// the archetypes created since the last refresh are examined.
    ///
    /// # Returns
    ///
    /// `true` if any archetype was examined.
    pub fn regenerate(&mut self, engine: &ArchetypeEngine) -> bool {
        let current = engine.version();
        if current == self.version {
            return false;
        }

        let start = self.version.min(current);
        for archetype in &engine.archetypes()[start..] {
            if self.matches(archetype.tags()) {
                self.matched.push(archetype.id());
            }
        }
        self.version = current;
        true
    }

    /// Matching archetypes in creation order.
    #[inline]
    #[must_use]
    pub fn archetypes(&self) -> &[ArchetypeId] {
        &self.matched
    }

    /// Registry version of the last refresh.
    #[inline]
    #[must_use]
    pub fn version(&self) -> usize {
        self.version
    }

    /// The required tag set.
    #[inline]
    #[must_use]
    pub fn required(&self) -> &TagSet {
        &self.required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::{Position, Velocity};

    #[derive(Clone, Copy, Debug)]
    struct Frozen;

    impl Component for Frozen {}

    #[test]
    fn test_predicates() {
        let mut registry = TagRegistry::new();
        let p = registry.register::<Position>();
        let f = registry.register::<Frozen>();
        let tags = TagSet::new(vec![p]);

        assert!(Filter::with::<Position>().resolve(&mut registry).matches(&tags));
        assert!(Filter::without::<Frozen>().resolve(&mut registry).matches(&tags));
        assert!(!Predicate::with(f).matches(&tags));
        assert!(!Predicate::without(p).matches(&tags));
    }

    #[test]
    fn test_filter_registers_unknown_types() {
        let mut registry = TagRegistry::new();
        let predicate = Filter::without::<Frozen>().resolve(&mut registry);
        assert_eq!(registry.tag_of::<Frozen>(), Some(predicate.tag));
    }

    #[test]
    fn test_incremental_regenerate() {
        let mut registry = TagRegistry::new();
        let p = registry.register::<Position>();
        let v = registry.register::<Velocity>();
        let mut engine = ArchetypeEngine::new();

        let mut list = FilterList::build(&mut registry, vec![p], &[Filter::without::<Frozen>()]);
        let f = registry.tag_of::<Frozen>().unwrap();
        assert!(!list.regenerate(&engine));

        let only_p = engine.resolve(TagSet::new(vec![p]));
        engine.resolve(TagSet::new(vec![v]));
        assert!(list.regenerate(&engine));
        assert_eq!(list.archetypes(), &[only_p]);
        assert_eq!(list.version(), 2);

        assert!(!list.regenerate(&engine));

        engine.resolve(TagSet::new(vec![p, f]));
        let pv = engine.resolve(TagSet::new(vec![p, v]));
        assert!(list.regenerate(&engine));
        assert_eq!(list.archetypes(), &[only_p, pv]);
    }

    #[test]
    fn test_required_superset() {
        let mut registry = TagRegistry::new();
        let p = registry.register::<Position>();
        let v = registry.register::<Velocity>();
        let list = FilterList::new(TagSet::new(vec![v, p]), Vec::new());

        assert!(list.matches(&TagSet::new(vec![p, v])));
        assert!(!list.matches(&TagSet::new(vec![p])));
        assert_eq!(list.required().len(), 2);
    }
}
