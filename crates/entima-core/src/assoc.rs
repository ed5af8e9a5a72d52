//! Deferred association collections.
//!
//! An `Assoc<T>` field on an owning entity stands in for its one-to-many
//! association. It starts unloaded; the session resolves it on first access by
//! querying the target table through the owner's foreign key and caches the
//! resulting handle sequence for the rest of the owner's managed lifetime.

use crate::entity::{Entity, EntityRef};
use std::fmt;
use std::sync::OnceLock;

/// A lazily-loaded, ordered collection of related entities.
///
/// Two states:
/// - **Unloaded**: the collection has not been fetched yet
/// - **Loaded**: the handles have been fetched and cached
pub struct Assoc<T: Entity> {
    /// Foreign-key column on the related table pointing back at the owner.
    fk_column: &'static str,
    /// The loaded handles (set at most once per managed lifetime).
    loaded: OnceLock<Vec<EntityRef<T>>>,
}

impl<T: Entity> Assoc<T> {
    /// Create a new unloaded association with the FK column name.
    #[must_use]
    pub fn new(fk_column: &'static str) -> Self {
        Self {
            fk_column,
            loaded: OnceLock::new(),
        }
    }

    /// The FK column name.
    #[must_use]
    pub fn fk_column(&self) -> &'static str {
        self.fk_column
    }

    /// Check if the collection has been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// The loaded handles as a slice (`None` if not loaded).
    #[must_use]
    pub fn get(&self) -> Option<&[EntityRef<T>]> {
        self.loaded.get().map(Vec::as_slice)
    }

    /// Number of loaded items (0 if not loaded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.loaded.get().map_or(0, Vec::len)
    }

    /// Check if the collection is empty (true if not loaded or loaded empty).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaded.get().is_none_or(Vec::is_empty)
    }

    /// Iterate over the loaded handles.
    pub fn iter(&self) -> impl Iterator<Item = &EntityRef<T>> {
        self.loaded.get().map_or([].iter(), |v| v.iter())
    }

    /// Cache the loaded handles (session-internal).
    ///
    /// Returns `Err` with the rejected handles when already loaded.
    pub fn set_loaded(&self, handles: Vec<EntityRef<T>>) -> Result<(), Vec<EntityRef<T>>> {
        self.loaded.set(handles)
    }

    /// Discard the cached handles, returning the collection to unloaded.
    pub fn reset(&mut self) {
        self.loaded = OnceLock::new();
    }
}

impl<T: Entity> Clone for Assoc<T> {
    fn clone(&self) -> Self {
        let cloned = Self::new(self.fk_column);
        if let Some(handles) = self.loaded.get() {
            let _ = cloned.loaded.set(handles.clone());
        }
        cloned
    }
}

impl<T: Entity> fmt::Debug for Assoc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_loaded() { "loaded" } else { "unloaded" };
        f.debug_struct("Assoc")
            .field("fk_column", &self.fk_column)
            .field("state", &state)
            .field("len", &self.len())
            .finish()
    }
}
