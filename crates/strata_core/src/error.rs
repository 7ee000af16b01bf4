//! # Error Types
//!
//! Two families, kept apart on purpose:
//!
//! - [`ConfigError`]: configuration that was rejected. Recoverable, returned
//!   from the fallible constructors and loaders.
//! - [`StorageDefect`]: the archetype engine and the world map disagree. The
//!   public contract can never produce one of these; the [`World`] facade
//!   escalates them to a panic, and tests use
//!   [`World::check_integrity`] to assert they stay unreachable.
//!
//! Ordinary conditions (unknown id, missing component, empty write,
//! redundant delete) are not errors at all and are reported through `bool`
//! and `Option` return values.
//!
//! [`World`]: crate::World
//! [`World::check_integrity`]: crate::World::check_integrity

use std::path::PathBuf;

use thiserror::Error;

use crate::ecs::{ArchetypeId, ComponentTag, EntityId};

/// Errors raised while validating or loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The id range is inverted.
    #[error("invalid id range: min {min} is greater than max {max}")]
    InvalidIdRange {
        /// Requested minimum id.
        min: u32,
        /// Requested maximum id.
        max: u32,
    },

    /// A bound of the id range falls on or below the reserved ids.
    #[error("id {value} is reserved: allocation bounds must be greater than 1")]
    ReservedId {
        /// The offending bound.
        value: u32,
    },

    /// The scheduler was given a zero fixed time step.
    #[error("fixed time step must be greater than zero")]
    InvalidTimeStep,

    /// The configuration text is not valid TOML for this schema.
    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration file {path:?}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
}

/// Internal invariant violations inside the storage engine.
///
/// Every variant means the engine's bookkeeping has desynchronized. None of
/// them is reachable through the public API; they exist so the engine can
/// report *what* broke instead of indexing out of bounds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageDefect {
    /// An archetype id is not known to the registry.
    #[error("archetype {0} is missing from the registry")]
    MissingArchetype(ArchetypeId),

    /// The lookup of an archetype has no slot for an entity routed to it.
    #[error("entity {id} has no slot in archetype {archetype}")]
    MissingSlot {
        /// Archetype that should hold the entity.
        archetype: ArchetypeId,
        /// The entity.
        id: EntityId,
    },

    /// A slot index points past the end of the id column.
    #[error("slot {slot} is out of bounds for archetype {archetype} (len {len})")]
    SlotOutOfBounds {
        /// Archetype being addressed.
        archetype: ArchetypeId,
        /// Offending slot.
        slot: usize,
        /// Length of the id column.
        len: usize,
    },

    /// A data column and the id column have different lengths.
    #[error("column {tag} of archetype {archetype} has {column} rows, id column has {ids}")]
    ColumnLength {
        /// Archetype being audited.
        archetype: ArchetypeId,
        /// Column tag.
        tag: ComponentTag,
        /// Column length.
        column: usize,
        /// Id column length.
        ids: usize,
    },

    /// A column holds a different element type than the one requested.
    #[error("column {tag} of archetype {archetype} does not store `{expected}`")]
    ColumnType {
        /// Archetype being addressed.
        archetype: ArchetypeId,
        /// Column tag.
        tag: ComponentTag,
        /// Requested element type.
        expected: &'static str,
    },

    /// A matched archetype lacks a column its tag set promises.
    #[error("archetype {archetype} has no column for {tag}")]
    MissingColumn {
        /// Archetype being addressed.
        archetype: ArchetypeId,
        /// Missing column tag.
        tag: ComponentTag,
    },

    /// A hole appears more than once in a free list, or is not a hole.
    #[error("slot {slot} of archetype {archetype} is listed as free incorrectly")]
    DuplicateHole {
        /// Archetype being audited.
        archetype: ArchetypeId,
        /// Offending slot.
        slot: usize,
    },

    /// The id column and the id index disagree.
    #[error("index of archetype {archetype} maps {id} to slot {slot}, which holds another id")]
    StaleIndex {
        /// Archetype being audited.
        archetype: ArchetypeId,
        /// Entity in the index.
        id: EntityId,
        /// Slot it maps to.
        slot: usize,
    },

    /// The world map routes an entity to an archetype that does not own it.
    #[error("world routes {id} to archetype {archetype}, which does not contain it")]
    Unrouted {
        /// The entity.
        id: EntityId,
        /// Archetype named by the world map.
        archetype: ArchetypeId,
    },
}

/// Result type for storage engine operations.
pub type StorageResult<T> = Result<T, StorageDefect>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
