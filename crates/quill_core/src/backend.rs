//! Backend trait definition.

use crate::book::Book;
use crate::error::BackendError;
use crate::instance::Instance;
use parking_lot::Mutex;
use std::sync::Arc;

/// A backend shared between a book and the session that opened it.
pub type SharedBackend = Arc<Mutex<dyn Backend>>;

/// How a session wants its store opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionOpenMode {
    /// Open an existing store, taking its lock.
    #[default]
    Normal,
    /// Create a new store; fail if one exists.
    NewStore,
    /// Create a new store, replacing any existing one.
    NewOverwrite,
    /// Open an existing store without taking its lock or writing to it.
    ReadOnly,
    /// Open an existing store, breaking a stale lock.
    BreakLock,
}

/// How much of the store a load should bring into memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadType {
    /// The minimum needed to present the book.
    #[default]
    InitialLoad,
    /// Everything in the store.
    LoadAll,
}

/// The last error reported by a backend, plus an optional detail message.
///
/// There is exactly one slot: every backend operation overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSlot {
    last: Option<BackendError>,
    message: Option<String>,
}

impl ErrorSlot {
    /// Creates an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: None,
            message: None,
        }
    }

    /// Overwrites the slot. `None` records success.
    pub fn set(&mut self, error: Option<BackendError>) {
        self.last = error;
        if error.is_none() {
            self.message = None;
        }
    }

    /// Returns the last error without clearing it.
    #[must_use]
    pub const fn get(&self) -> Option<BackendError> {
        self.last
    }

    /// Returns the last error and clears the slot.
    pub fn pop(&mut self) -> Option<BackendError> {
        self.message = None;
        self.last.take()
    }

    /// Records a detail message for the current error.
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// Returns the detail message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// A pluggable persistence session.
///
/// Backends own all knowledge of file formats, databases and wire
/// protocols. The engine only calls the operations below and inspects the
/// single last-error slot afterwards.
///
/// # Invariants
///
/// - Every operation overwrites the error slot, recording `None` on success
/// - `commit` marks the instance clean when it persists it successfully
/// - `safe_sync` refuses to overwrite data it cannot reconcile, reporting
///   [`BackendError::WouldClobber`] instead
/// - Operations may block on I/O; the engine never retries them
///
/// # Implementors
///
/// Concrete backends live outside this crate. `quill_testkit` provides a
/// scriptable mock.
pub trait Backend: Send {
    /// Opens the store at `uri`.
    fn session_begin(&mut self, uri: &str, mode: SessionOpenMode);

    /// Closes the store, releasing any lock.
    fn session_end(&mut self);

    /// Loads store contents into `book`.
    fn load(&mut self, book: &Book, load_type: LoadType);

    /// Writes the whole of `book` to the store.
    fn sync(&mut self, book: &Book);

    /// Writes `book` to the store, refusing to clobber unreconcilable data.
    fn safe_sync(&mut self, book: &Book);

    /// Called when the outermost edit session on `instance` opens.
    fn begin(&mut self, instance: &Instance);

    /// Persists `instance`, or deletes it if it is being destroyed.
    fn commit(&mut self, instance: &Instance);

    /// Discards uncommitted changes to `instance`.
    fn rollback(&mut self, instance: &Instance);

    /// Returns the error slot.
    fn error_slot(&self) -> &ErrorSlot;

    /// Returns the error slot for writing.
    fn error_slot_mut(&mut self) -> &mut ErrorSlot;

    /// Overwrites the last error. `None` records success.
    fn set_error(&mut self, error: Option<BackendError>) {
        self.error_slot_mut().set(error);
    }

    /// Returns the last error without clearing it.
    fn get_error(&self) -> Option<BackendError> {
        self.error_slot().get()
    }

    /// Returns the last error and clears it.
    fn pop_error(&mut self) -> Option<BackendError> {
        self.error_slot_mut().pop()
    }

    /// Records a detail message for the current error.
    fn set_message(&mut self, message: String) {
        self.error_slot_mut().set_message(message);
    }

    /// Returns the detail message for the current error.
    fn get_message(&self) -> Option<String> {
        self.error_slot().message().map(str::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_starts_empty() {
        let slot = ErrorSlot::new();
        assert_eq!(slot.get(), None);
        assert_eq!(slot.message(), None);
    }

    #[test]
    fn get_peeks_pop_consumes() {
        let mut slot = ErrorSlot::new();
        slot.set(Some(BackendError::Locked));
        assert_eq!(slot.get(), Some(BackendError::Locked));
        assert_eq!(slot.get(), Some(BackendError::Locked));
        assert_eq!(slot.pop(), Some(BackendError::Locked));
        assert_eq!(slot.pop(), None);
    }

    #[test]
    fn set_overwrites() {
        let mut slot = ErrorSlot::new();
        slot.set(Some(BackendError::Locked));
        slot.set(Some(BackendError::ReadOnly));
        assert_eq!(slot.get(), Some(BackendError::ReadOnly));
        slot.set(None);
        assert_eq!(slot.get(), None);
    }

    #[test]
    fn success_clears_message() {
        let mut slot = ErrorSlot::new();
        slot.set(Some(BackendError::Misc));
        slot.set_message("disk full");
        assert_eq!(slot.message(), Some("disk full"));
        slot.set(None);
        assert_eq!(slot.message(), None);
    }
}
