//! Book: owner of entity registries and the active backend.

use crate::backend::SharedBackend;
use crate::collection::Collection;
use crate::config::BookConfig;
use crate::error::{CoreError, CoreResult};
use crate::guid::Guid;
use crate::instance::DisplayName;
use crate::types::{EntityType, Timestamp};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

#[derive(Debug, Default)]
struct BookState {
    read_only: bool,
    shutting_down: bool,
    session_dirty: bool,
    dirty_time: Option<Timestamp>,
    counters: HashMap<String, i64>,
}

pub(crate) struct BookInner {
    guid: Guid,
    config: BookConfig,
    collections: RwLock<HashMap<EntityType, Collection>>,
    backend: RwLock<Option<SharedBackend>>,
    state: Mutex<BookState>,
}

/// A set of entity registries plus the backend that persists them.
///
/// `Book` is a cheap handle: clones share the same registries. The backend
/// is referenced, not owned; whoever opened it (usually a
/// [`Session`](crate::Session)) manages its lifetime.
///
/// # Destruction
///
/// [`Book::destroy`] detaches every registry and drops the backend
/// reference. Instances that still point at the book see it as absent from
/// then on, and commits on them take the no-backend path.
/// Dropping the last handle detaches the registries the same way.
#[derive(Clone)]
pub struct Book {
    inner: Arc<BookInner>,
}

/// Non-owning reference to a book, held by instances.
#[derive(Clone)]
pub(crate) struct WeakBook(Weak<BookInner>);

impl WeakBook {
    /// Returns the book unless it was dropped or destroyed.
    pub(crate) fn upgrade(&self) -> Option<Book> {
        let book = Book {
            inner: self.0.upgrade()?,
        };
        if book.is_shutting_down() {
            return None;
        }
        Some(book)
    }
}

impl fmt::Debug for WeakBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakBook")
    }
}

impl Book {
    /// Creates an empty book with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BookConfig::default())
    }

    /// Creates an empty book.
    #[must_use]
    pub fn with_config(config: BookConfig) -> Self {
        let state = BookState {
            read_only: config.read_only,
            ..BookState::default()
        };
        Self {
            inner: Arc::new(BookInner {
                guid: Guid::new(),
                config,
                collections: RwLock::new(HashMap::new()),
                backend: RwLock::new(None),
                state: Mutex::new(state),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakBook {
        WeakBook(Arc::downgrade(&self.inner))
    }

    /// Returns the book's own identity.
    #[must_use]
    pub fn guid(&self) -> Guid {
        self.inner.guid
    }

    /// Returns the configuration the book was created with.
    #[must_use]
    pub fn config(&self) -> &BookConfig {
        &self.inner.config
    }

    /// Returns true if both handles refer to the same book.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Registries
    // ------------------------------------------------------------------

    /// Returns the registry for `entity_type`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BookDestroyed`] after [`Book::destroy`].
    pub fn get_or_create_collection(
        &self,
        entity_type: impl Into<EntityType>,
    ) -> CoreResult<Collection> {
        if self.is_shutting_down() {
            return Err(CoreError::BookDestroyed);
        }
        let entity_type = entity_type.into();
        if let Some(existing) = self.inner.collections.read().get(&entity_type) {
            return Ok(existing.clone());
        }
        let mut collections = self.inner.collections.write();
        let collection = collections
            .entry(entity_type.clone())
            .or_insert_with(|| {
                tracing::debug!(%entity_type, book = %self.inner.guid, "created collection");
                Collection::new(entity_type)
            })
            .clone();
        Ok(collection)
    }

    /// Installs the label hook for every instance of `entity_type`,
    /// creating the registry if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BookDestroyed`] after [`Book::destroy`].
    pub fn set_display_name(
        &self,
        entity_type: impl Into<EntityType>,
        hook: impl DisplayName + 'static,
    ) -> CoreResult<()> {
        let collection = self.get_or_create_collection(entity_type)?;
        collection.set_display_name(Some(Arc::new(hook)));
        Ok(())
    }

    /// Removes the label hook for `entity_type`, restoring the default label.
    pub fn clear_display_name(&self, entity_type: &str) {
        if let Some(collection) = self.collection(entity_type) {
            collection.set_display_name(None);
        }
    }

    /// Returns the registry for `entity_type` if it exists.
    #[must_use]
    pub fn collection(&self, entity_type: &str) -> Option<Collection> {
        self.inner.collections.read().get(entity_type).cloned()
    }

    /// Returns the number of registries.
    #[must_use]
    pub fn collection_count(&self) -> usize {
        self.inner.collections.read().len()
    }

    /// Calls `f` for every registry.
    pub fn for_each_collection(&self, mut f: impl FnMut(&Collection)) {
        let snapshot: Vec<Collection> = self.inner.collections.read().values().cloned().collect();
        for collection in &snapshot {
            f(collection);
        }
    }

    /// Returns true if any instance in any registry is dirty.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let mut dirty = false;
        self.for_each_collection(|c| dirty = dirty || c.is_dirty());
        dirty
    }

    /// Marks every instance in every registry clean.
    pub fn mark_clean(&self) {
        self.for_each_collection(Collection::mark_clean);
    }

    // ------------------------------------------------------------------
    // Backend
    // ------------------------------------------------------------------

    /// Replaces the backend. `None` detaches it.
    ///
    /// Instance dirty state is not touched.
    pub fn set_backend(&self, backend: Option<SharedBackend>) {
        tracing::debug!(
            book = %self.inner.guid,
            attached = backend.is_some(),
            "set backend"
        );
        *self.inner.backend.write() = backend;
    }

    /// Returns the backend, if one is attached and the book is live.
    #[must_use]
    pub fn backend(&self) -> Option<SharedBackend> {
        if self.is_shutting_down() {
            return None;
        }
        self.inner.backend.read().clone()
    }

    // ------------------------------------------------------------------
    // Session state
    // ------------------------------------------------------------------

    /// Records that the book has unsaved changes.
    ///
    /// The first call after a save records the time. Read-only books are
    /// never session-dirty.
    pub fn mark_session_dirty(&self) {
        let mut state = self.inner.state.lock();
        if state.read_only {
            state.session_dirty = false;
            return;
        }
        if !state.session_dirty {
            state.session_dirty = true;
            state.dirty_time = Some(Timestamp::now());
        }
    }

    /// Records that the book has been saved.
    pub fn mark_session_saved(&self) {
        let mut state = self.inner.state.lock();
        state.session_dirty = false;
        state.dirty_time = None;
    }

    /// Returns true if the book has changes not yet saved.
    #[must_use]
    pub fn session_not_saved(&self) -> bool {
        self.inner.state.lock().session_dirty
    }

    /// Returns when the book first became unsaved.
    #[must_use]
    pub fn dirty_time(&self) -> Option<Timestamp> {
        self.inner.state.lock().dirty_time
    }

    /// Returns true if the book may not be saved.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.inner.state.lock().read_only
    }

    /// Makes the book read-only.
    pub fn mark_read_only(&self) {
        self.inner.state.lock().read_only = true;
    }

    // ------------------------------------------------------------------
    // Counters
    // ------------------------------------------------------------------

    /// Returns the current value of counter `name` (0 if never used).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BookDestroyed`] after [`Book::destroy`].
    pub fn counter(&self, name: &str) -> CoreResult<i64> {
        let state = self.inner.state.lock();
        if state.shutting_down {
            return Err(CoreError::BookDestroyed);
        }
        Ok(state.counters.get(name).copied().unwrap_or(0))
    }

    /// Increments counter `name` and returns the new value formatted per
    /// the book's configuration. Marks the book session-dirty.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BookDestroyed`] after [`Book::destroy`] and
    /// [`CoreError::ReadOnly`] on a read-only book.
    pub fn increment_and_format_counter(&self, name: &str) -> CoreResult<String> {
        let value = {
            let mut state = self.inner.state.lock();
            if state.shutting_down {
                return Err(CoreError::BookDestroyed);
            }
            if state.read_only {
                return Err(CoreError::ReadOnly);
            }
            let counter = state.counters.entry(name.to_owned()).or_insert(0);
            *counter += 1;
            *counter
        };
        self.mark_session_dirty();
        Ok(self.inner.config.format_counter(name, value))
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Destroys the book: detaches all registries and drops the backend.
    pub fn destroy(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.shutting_down {
                return;
            }
            state.shutting_down = true;
        }
        let collections: Vec<Collection> =
            self.inner.collections.write().drain().map(|(_, c)| c).collect();
        for collection in &collections {
            collection.detach();
        }
        *self.inner.backend.write() = None;
        tracing::debug!(book = %self.inner.guid, collections = collections.len(), "book destroyed");
    }

    /// Returns true once [`Book::destroy`] has been called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.state.lock().shutting_down
    }
}

impl Drop for BookInner {
    fn drop(&mut self) {
        for collection in self.collections.get_mut().values() {
            collection.detach();
        }
    }
}

impl Default for Book {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Book")
            .field("guid", &self.inner.guid)
            .field("collections", &self.collection_count())
            .field("has_backend", &self.inner.backend.read().is_some())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}
