//! Test fixtures and callback recorders.
//!
//! Provides a book wired to a [`MockBackend`] and a [`CallbackLog`] that
//! hands out [`CommitHooks`] recording what fired. State is local to each
//! fixture, so tests never share a mutable global.

use crate::mock::MockBackend;
use parking_lot::{Mutex, MutexGuard};
use quill_core::{BackendError, Book, CommitHooks, Guid, Instance};
use std::cell::RefCell;
use std::sync::Arc;

/// Entity type used by fixtures that do not care about the type.
pub const TEST_TYPE: &str = "test type";

/// A book with a mock backend attached.
pub struct TestBook {
    /// The book under test.
    pub book: Book,
    mock: Arc<Mutex<MockBackend>>,
}

impl TestBook {
    /// Creates a book and attaches a fresh mock backend.
    #[must_use]
    pub fn new() -> Self {
        let (mock, shared) = MockBackend::shared();
        let book = Book::new();
        book.set_backend(Some(shared));
        Self { book, mock }
    }

    /// Locks and returns the mock backend.
    pub fn backend(&self) -> MutexGuard<'_, MockBackend> {
        self.mock.lock()
    }

    /// Returns the typed handle to the mock backend.
    #[must_use]
    pub fn mock(&self) -> Arc<Mutex<MockBackend>> {
        Arc::clone(&self.mock)
    }

    /// Creates an instance of [`TEST_TYPE`] in the book.
    #[must_use]
    pub fn instance(&self) -> Instance {
        Instance::create(TEST_TYPE, &self.book)
    }

    /// Creates an instance of `entity_type` in the book.
    #[must_use]
    pub fn instance_of(&self, entity_type: &str) -> Instance {
        Instance::create(entity_type, &self.book)
    }

    /// Detaches the backend, leaving an in-memory book.
    pub fn detach_backend(&self) {
        self.book.set_backend(None);
    }
}

impl Default for TestBook {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `f` with a fresh [`TestBook`].
pub fn with_test_book<F, R>(f: F) -> R
where
    F: FnOnce(&TestBook) -> R,
{
    let fixture = TestBook::new();
    f(&fixture)
}

/// A completion callback that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    /// `on_error` fired for the instance with the code.
    Error(Guid, BackendError),
    /// `on_done` fired for the instance.
    Done(Guid),
    /// `on_free` fired for the instance.
    Free(Guid),
}

/// Records completion callbacks fired by `finalize_commit`.
#[derive(Debug, Default)]
pub struct CallbackLog {
    events: RefCell<Vec<Callback>>,
}

impl CallbackLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns hooks with all three callbacks recording into this log.
    #[must_use]
    pub fn hooks(&self) -> CommitHooks<'_> {
        CommitHooks::new()
            .on_error(move |inst, err| self.events.borrow_mut().push(Callback::Error(inst.guid(), err)))
            .on_done(move |inst| self.events.borrow_mut().push(Callback::Done(inst.guid())))
            .on_free(move |inst| self.events.borrow_mut().push(Callback::Free(inst.guid())))
    }

    /// Returns hooks with only `on_done` recording into this log.
    #[must_use]
    pub fn done_only(&self) -> CommitHooks<'_> {
        CommitHooks::new().on_done(move |inst| self.events.borrow_mut().push(Callback::Done(inst.guid())))
    }

    /// Returns every recorded callback in firing order.
    #[must_use]
    pub fn events(&self) -> Vec<Callback> {
        self.events.borrow().clone()
    }

    /// Returns how many `on_error` callbacks fired.
    #[must_use]
    pub fn errors(&self) -> usize {
        self.count(|c| matches!(c, Callback::Error(..)))
    }

    /// Returns how many `on_done` callbacks fired.
    #[must_use]
    pub fn dones(&self) -> usize {
        self.count(|c| matches!(c, Callback::Done(_)))
    }

    /// Returns how many `on_free` callbacks fired.
    #[must_use]
    pub fn frees(&self) -> usize {
        self.count(|c| matches!(c, Callback::Free(_)))
    }

    fn count(&self, pred: impl Fn(&Callback) -> bool) -> usize {
        self.events.borrow().iter().filter(|c| pred(c)).count()
    }

    /// Forgets recorded callbacks.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}
