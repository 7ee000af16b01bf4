//! # Entity Identity
//!
//! Entities are bare 32-bit handles. There is no generation counter: an id
//! handed out again after wraparound carries no history, and keeping
//! recycled ids apart from live ones is the caller's job.

use std::fmt;

use crate::error::{ConfigError, ConfigResult};

/// Opaque entity handle.
///
/// `0` is [`EntityId::INVALID`] and doubles as the hole marker inside an
/// archetype's id column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// The invalid / "none" entity.
    pub const INVALID: Self = Self(0);

    /// Ids at or below this value are never handed out by an [`IdAllocator`].
    pub const FIRST_ENTITY: Self = Self(1);

    /// Largest representable id.
    pub const MAX: Self = Self(u32::MAX);

    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Checks if this is the invalid sentinel.
    #[inline]
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for EntityId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Hands out entity ids from an inclusive `[min, max]` range.
///
/// On reaching `max` the next id is `min` again. Liveness of a recycled id
/// is not checked.
#[derive(Clone, Debug)]
pub struct IdAllocator {
    next: u32,
    min: u32,
    max: u32,
}

impl IdAllocator {
    /// Default lower bound: the first id above the reserved boundary.
    pub const DEFAULT_MIN: u32 = EntityId::FIRST_ENTITY.0 + 1;

    /// Default upper bound.
    pub const DEFAULT_MAX: u32 = u32::MAX;

    /// Creates an allocator over `[min, max]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReservedId`] if either bound is `<= 1` and
    /// [`ConfigError::InvalidIdRange`] if `min > max`.
    pub fn new(min: u32, max: u32) -> ConfigResult<Self> {
        Self::validate(min, max)?;
        Ok(Self {
            next: min,
            min,
            max,
        })
    }

    /// Checks an id range without building an allocator.
    ///
    /// # Errors
    ///
    /// Same rules as [`IdAllocator::new`].
    pub fn validate(min: u32, max: u32) -> ConfigResult<()> {
        let reserved = EntityId::FIRST_ENTITY.0;
        if min <= reserved {
            return Err(ConfigError::ReservedId { value: min });
        }
        if max <= reserved {
            return Err(ConfigError::ReservedId { value: max });
        }
        if min > max {
            return Err(ConfigError::InvalidIdRange { min, max });
        }
        Ok(())
    }

    /// Replaces the range. The cursor is kept and clamped up to `min` on the
    /// next allocation.
    ///
    /// # Errors
    ///
    /// Same rules as [`IdAllocator::new`]; on error the old range is kept.
    pub fn set_range(&mut self, min: u32, max: u32) -> ConfigResult<()> {
        Self::validate(min, max)?;
        self.min = min;
        self.max = max;
        Ok(())
    }

    /// Returns the next id.
    pub fn next_id(&mut self) -> EntityId {
        if self.next < self.min || self.next > self.max {
            self.next = self.min;
        }

        let id = self.next;
        if self.next == self.max {
            self.next = self.min;
        } else {
            self.next += 1;
        }
        EntityId(id)
    }

    /// Lower bound of the range.
    #[inline]
    #[must_use]
    pub const fn min(&self) -> u32 {
        self.min
    }

    /// Upper bound of the range.
    #[inline]
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self {
            next: Self::DEFAULT_MIN,
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}
