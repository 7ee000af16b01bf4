//! # Component System
//!
//! Components are plain data attached to entities. Each concrete type gets a
//! [`ComponentTag`] from the world's [`TagRegistry`]; archetypes are keyed by
//! sets of these tags.
//!
//! Values are written through [`Bundle`]s: tuples of one to twelve
//! components that know their own tags and how to store themselves into an
//! archetype slot.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;

use bytemuck::{Pod, Zeroable};

use super::archetype::Archetype;
use crate::error::StorageResult;

/// Marker trait for storable components.
///
/// Components must be:
/// - `Clone`: migration copies retained values into the destination archetype
///   and leaves the tombstoned source slot intact
/// - `Send + Sync + 'static`: columns are type-erased and the world may be
///   handed between threads between frames
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Debug, Default)]
/// struct Health(u32);
///
/// impl Component for Health {}
/// ```
pub trait Component: Clone + Send + Sync + 'static {}

/// Stable identifier of a component type within one world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentTag(u16);

impl ComponentTag {
    /// Returns the dense index of this tag.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tag#{}", self.0)
    }
}

/// Maps concrete component types to [`ComponentTag`]s.
///
/// Owned by a single [`World`](crate::World); tags are handed out densely in
/// first-seen order and never change afterwards.
#[derive(Debug, Default)]
pub struct TagRegistry {
    by_type: HashMap<TypeId, ComponentTag>,
    names: Vec<&'static str>,
}

impl TagRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tag of `C`, assigning one on first use.
    pub fn register<C: Component>(&mut self) -> ComponentTag {
        self.register_raw(TypeId::of::<C>(), type_name::<C>())
    }

    /// Returns the tag for a raw type id, assigning one on first use.
    ///
    /// # Panics
    ///
    /// Panics if more than `u16::MAX` distinct types are registered.
    pub fn register_raw(&mut self, type_id: TypeId, name: &'static str) -> ComponentTag {
        if let Some(tag) = self.by_type.get(&type_id) {
            return *tag;
        }
        let raw = u16::try_from(self.names.len())
            .unwrap_or_else(|_| panic!("component tag space exhausted registering `{name}`"));
        let tag = ComponentTag(raw);
        self.by_type.insert(type_id, tag);
        self.names.push(name);
        tag
    }

    /// Returns the tag of `C` if it was registered.
    #[must_use]
    pub fn tag_of<C: Component>(&self) -> Option<ComponentTag> {
        self.by_type.get(&TypeId::of::<C>()).copied()
    }

    /// Type name recorded for a tag.
    #[must_use]
    pub fn name(&self, tag: ComponentTag) -> Option<&'static str> {
        self.names.get(tag.index()).copied()
    }

    /// Number of registered component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Checks if no type has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A group of component values written together.
///
/// Implemented for `()` (the empty write) and for tuples of one to twelve
/// components.
pub trait Bundle: Send + Sync + 'static {
    /// Tags of the bundle's components, in tuple order. Repeats are kept.
    fn register(registry: &mut TagRegistry) -> Vec<ComponentTag>;

    /// Stores every value of the bundle into `slot` of `archetype`.
    ///
    /// `tags` must be the output of [`Bundle::register`] for the same
    /// registry.
    ///
    /// # Errors
    ///
    /// Propagates storage defects from the archetype.
    fn write_into(
        self,
        archetype: &mut Archetype,
        tags: &[ComponentTag],
        slot: usize,
    ) -> StorageResult<()>;
}

impl Bundle for () {
    fn register(_registry: &mut TagRegistry) -> Vec<ComponentTag> {
        Vec::new()
    }

    fn write_into(
        self,
        _archetype: &mut Archetype,
        _tags: &[ComponentTag],
        _slot: usize,
    ) -> StorageResult<()> {
        Ok(())
    }
}

macro_rules! impl_bundle {
    ($(($ty:ident, $idx:tt)),+) => {
        impl<$($ty: Component),+> Bundle for ($($ty,)+) {
            fn register(registry: &mut TagRegistry) -> Vec<ComponentTag> {
                vec![$(registry.register::<$ty>()),+]
            }

            fn write_into(
                self,
                archetype: &mut Archetype,
                tags: &[ComponentTag],
                slot: usize,
            ) -> StorageResult<()> {
                $(archetype.write_component::<$ty>(tags[$idx], slot, self.$idx)?;)+
                Ok(())
            }
        }
    };
}

impl_bundle!((A, 0));
impl_bundle!((A, 0), (B, 1));
impl_bundle!((A, 0), (B, 1), (C, 2));
impl_bundle!((A, 0), (B, 1), (C, 2), (D, 3));
impl_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4));
impl_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5));
impl_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6));
impl_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7));
impl_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7), (I, 8));
impl_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7), (I, 8), (J, 9));
impl_bundle!(
    (A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7), (I, 8), (J, 9), (K, 10)
);
impl_bundle!(
    (A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7), (I, 8), (J, 9), (K, 10),
    (L, 11)
);

/// Position component for entities.
///
/// Represents a 3D position in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Position {
    /// X coordinate in world space.
    pub x: f32,
    /// Y coordinate in world space.
    pub y: f32,
    /// Z coordinate in world space.
    pub z: f32,
    /// Padding for alignment (ensures 16-byte rows for SIMD lanes).
    pub _padding: f32,
}

impl Component for Position {}

impl Position {
    /// Creates a new position.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            _padding: 0.0,
        }
    }

    /// Returns the squared distance to another position.
    #[inline]
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Views a column of positions as flat `[x, y, z, pad]` lanes.
    #[inline]
    #[must_use]
    pub fn lanes_mut(column: &mut [Self]) -> &mut [[f32; 4]] {
        bytemuck::cast_slice_mut(column)
    }
}

/// Velocity component for entities.
///
/// Represents movement speed in world units per second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Velocity {
    /// X velocity component.
    pub x: f32,
    /// Y velocity component.
    pub y: f32,
    /// Z velocity component.
    pub z: f32,
    /// Padding for alignment.
    pub _padding: f32,
}

impl Component for Velocity {}

impl Velocity {
    /// Creates a new velocity.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            _padding: 0.0,
        }
    }

    /// Views a column of velocities as flat `[x, y, z, pad]` lanes.
    #[inline]
    #[must_use]
    pub fn lanes(column: &[Self]) -> &[[f32; 4]] {
        bytemuck::cast_slice(column)
    }
}
