//! # Component Columns
//!
//! Dense, index-addressable storage for one component type inside one
//! archetype.
//!
//! - Row `i` of every column belongs to the entity in slot `i` of the
//!   archetype's id column
//! - Tombstoned rows keep their stale value until the slot is reused
//! - [`Column`] erases the element type so an archetype can hold a
//!   heterogeneous set of columns

use std::any::{type_name, Any};

use super::component::Component;

/// Dense storage for a single component type.
///
/// # Type Parameters
///
/// * `C` - The component type to store
///
/// # Example
///
/// ```rust,ignore
/// let mut column: ComponentColumn<Position> = ComponentColumn::new();
/// column.put(0, Position::new(1.0, 2.0, 3.0));
/// ```
#[derive(Clone, Debug)]
pub struct ComponentColumn<C: Component> {
    data: Vec<C>,
}

impl<C: Component> ComponentColumn<C> {
    /// Creates an empty column.
    #[must_use]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Number of rows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Checks if the column has no rows.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Gets a component by row.
    #[inline]
    #[must_use]
    pub fn get(&self, row: usize) -> Option<&C> {
        self.data.get(row)
    }

    /// Gets a mutable component by row.
    #[inline]
    pub fn get_mut(&mut self, row: usize) -> Option<&mut C> {
        self.data.get_mut(row)
    }

    /// Stores `component` at `row`.
    ///
    /// Overwrites an existing row, or appends when `row` is exactly one past
    /// the end.
    ///
    /// # Returns
    ///
    /// `false` if `row` would leave a gap.
    #[inline]
    pub fn put(&mut self, row: usize, component: C) -> bool {
        if let Some(slot) = self.data.get_mut(row) {
            *slot = component;
            true
        } else if row == self.data.len() {
            self.data.push(component);
            true
        } else {
            false
        }
    }

    /// Returns a slice of all rows, tombstoned ones included.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[C] {
        &self.data
    }

    /// Returns a mutable slice of all rows, tombstoned ones included.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [C] {
        &mut self.data
    }
}

impl<C: Component> Default for ComponentColumn<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased interface over a [`ComponentColumn`].
pub trait Column: Any + Send + Sync {
    /// Number of rows.
    fn len(&self) -> usize;

    /// Checks if the column has no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type name, for diagnostics.
    fn element_name(&self) -> &'static str;

    /// Creates an empty column of the same element type.
    fn empty_like(&self) -> Box<dyn Column>;

    /// Copies row `row` of `self` into row `dst_row` of `dst`.
    ///
    /// # Returns
    ///
    /// `false` if `dst` has another element type, `row` is out of bounds, or
    /// `dst_row` would leave a gap.
    fn copy_row_to(&self, row: usize, dst: &mut dyn Column, dst_row: usize) -> bool;

    /// Upcast for downcasting to the concrete column.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete column.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> Column for ComponentColumn<C> {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn element_name(&self) -> &'static str {
        type_name::<C>()
    }

    fn empty_like(&self) -> Box<dyn Column> {
        Box::new(Self::new())
    }

    fn copy_row_to(&self, row: usize, dst: &mut dyn Column, dst_row: usize) -> bool {
        let Some(value) = self.data.get(row) else {
            return false;
        };
        match dst.as_any_mut().downcast_mut::<Self>() {
            Some(dst) => dst.put(dst_row, value.clone()),
            None => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
