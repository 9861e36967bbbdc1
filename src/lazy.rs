//! At-most-once loading cell backing the partial/full entity lifecycle.
//!
//! Listing endpoints return summary payloads (id and name only). An entity
//! built from such a payload keeps its detail in an empty [`Lazy`] and fills
//! it on first access with a single detail fetch.

use std::fmt;
use std::future::Future;

use tokio::sync::OnceCell;

use crate::error::Result;

/// A value that is either already known or loaded on first access.
///
/// Concurrent first accesses run the loader once; the others wait for it.
/// The cell is only filled after the loader has produced the complete
/// value, so a failed or cancelled load leaves it empty and a later access
/// tries again.
pub struct Lazy<T> {
    cell: OnceCell<T>,
}

impl<T> Lazy<T> {
    /// An empty cell; the first [`get_or_load`](Self::get_or_load) fills it.
    pub fn partial() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// A cell that is already loaded.
    pub fn full(value: T) -> Self {
        Self {
            cell: OnceCell::new_with(Some(value)),
        }
    }

    /// Whether the value has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// The loaded value, without loading.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Mutable access to the loaded value, without loading.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.cell.get_mut()
    }

    /// Return the loaded value, running `load` first if the cell is empty.
    pub async fn get_or_load<F, Fut>(&self, load: F) -> Result<&T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.cell.get_or_try_init(load).await
    }

    /// Replace the value unconditionally (used by explicit refreshes).
    pub fn replace(&mut self, value: T) {
        self.cell = OnceCell::new_with(Some(value));
    }
}

impl<T> Default for Lazy<T> {
    fn default() -> Self {
        Self::partial()
    }
}

impl<T: Clone> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            cell: OnceCell::new_with(self.cell.get().cloned()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Full").field(value).finish(),
            None => f.write_str("Partial"),
        }
    }
}
