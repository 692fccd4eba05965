//! Scriptable mock backend.
//!
//! [`MockBackend`] records every call it receives, keeps committed
//! instances in an in-memory map, and reports whatever error the test
//! injected. Every operation overwrites the error slot, so an injected
//! error sticks until the test clears it.

use parking_lot::Mutex;
use quill_core::{
    Backend, BackendError, Book, EntityType, ErrorSlot, Guid, Instance, LoadType, SessionOpenMode,
    SharedBackend, Slots,
};
use std::collections::HashMap;
use std::sync::Arc;

/// One call received by a [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `session_begin(uri, mode)`.
    SessionBegin {
        /// URI passed by the session.
        uri: String,
        /// Requested open mode.
        mode: SessionOpenMode,
    },
    /// `session_end()`.
    SessionEnd,
    /// `load(book, load_type)`.
    Load(LoadType),
    /// `sync(book)`.
    Sync,
    /// `safe_sync(book)`.
    SafeSync,
    /// `begin(instance)`.
    Begin(Guid),
    /// `commit(instance)`.
    Commit(Guid),
    /// `rollback(instance)`.
    Rollback(Guid),
}

/// What the mock store holds for a committed instance.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Entity type at commit time.
    pub entity_type: Option<EntityType>,
    /// Slot payload at commit time.
    pub slots: Option<Slots>,
    /// Number of successful commits of this instance.
    pub version: i32,
}

/// In-memory backend for tests.
#[derive(Debug, Default)]
pub struct MockBackend {
    errors: ErrorSlot,
    injected: Option<BackendError>,
    unreconcilable: bool,
    calls: Vec<BackendCall>,
    stored: HashMap<Guid, StoredRecord>,
}

impl MockBackend {
    /// Creates a mock that succeeds at everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock and returns both a typed handle and the shared handle
    /// a book or session expects.
    #[must_use]
    pub fn shared() -> (Arc<Mutex<Self>>, SharedBackend) {
        let mock = Arc::new(Mutex::new(Self::new()));
        let shared: SharedBackend = mock.clone();
        (mock, shared)
    }

    /// Makes every following operation report `error` (`None` to succeed).
    pub fn inject_error(&mut self, error: Option<BackendError>) {
        self.injected = error;
    }

    /// Makes `safe_sync` refuse with [`BackendError::WouldClobber`].
    pub fn set_unreconcilable(&mut self, value: bool) {
        self.unreconcilable = value;
    }

    /// Returns every call received so far.
    #[must_use]
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Returns how many received calls satisfy `pred`.
    #[must_use]
    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Returns how many `begin` calls were received.
    #[must_use]
    pub fn begin_count(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::Begin(_)))
    }

    /// Returns how many `commit` calls were received.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::Commit(_)))
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Returns the stored record for `guid`.
    #[must_use]
    pub fn stored(&self, guid: &Guid) -> Option<&StoredRecord> {
        self.stored.get(guid)
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn stored_len(&self) -> usize {
        self.stored.len()
    }

    fn finish(&mut self) {
        let result = self.injected;
        self.set_error(result);
    }
}

impl Backend for MockBackend {
    fn session_begin(&mut self, uri: &str, mode: SessionOpenMode) {
        self.calls.push(BackendCall::SessionBegin {
            uri: uri.to_owned(),
            mode,
        });
        self.finish();
    }

    fn session_end(&mut self) {
        self.calls.push(BackendCall::SessionEnd);
        self.finish();
    }

    fn load(&mut self, _book: &Book, load_type: LoadType) {
        self.calls.push(BackendCall::Load(load_type));
        self.finish();
    }

    fn sync(&mut self, book: &Book) {
        self.calls.push(BackendCall::Sync);
        self.finish();
        if self.injected.is_none() {
            book.mark_clean();
        }
    }

    fn safe_sync(&mut self, book: &Book) {
        self.calls.push(BackendCall::SafeSync);
        if self.unreconcilable && self.injected.is_none() {
            self.set_error(Some(BackendError::WouldClobber));
            return;
        }
        self.finish();
        if self.injected.is_none() {
            book.mark_clean();
        }
    }

    fn begin(&mut self, instance: &Instance) {
        self.calls.push(BackendCall::Begin(instance.guid()));
        self.finish();
    }

    fn commit(&mut self, instance: &Instance) {
        let guid = instance.guid();
        self.calls.push(BackendCall::Commit(guid));
        self.finish();
        if self.injected.is_some() {
            return;
        }
        if instance.is_destroying() {
            self.stored.remove(&guid);
        } else {
            let version = self.stored.get(&guid).map_or(0, |r| r.version) + 1;
            self.stored.insert(
                guid,
                StoredRecord {
                    entity_type: instance.entity_type(),
                    slots: instance.slots(),
                    version,
                },
            );
            instance.set_version(version);
        }
        if instance.is_dirty() {
            instance.mark_clean();
        }
    }

    fn rollback(&mut self, instance: &Instance) {
        self.calls.push(BackendCall::Rollback(instance.guid()));
        self.finish();
    }

    fn error_slot(&self) -> &ErrorSlot {
        &self.errors
    }

    fn error_slot_mut(&mut self) -> &mut ErrorSlot {
        &mut self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_stores_and_cleans() {
        let mut mock = MockBackend::new();
        let inst = Instance::new();
        inst.set_dirty();

        mock.commit(&inst);

        assert_eq!(mock.get_error(), None);
        assert!(!inst.is_dirty());
        assert_eq!(mock.stored(&inst.guid()).unwrap().version, 1);
        assert_eq!(inst.version(), 1);
    }

    #[test]
    fn commit_of_destroying_instance_removes_record() {
        let mut mock = MockBackend::new();
        let inst = Instance::new();
        mock.commit(&inst);
        inst.set_destroying(true);
        mock.commit(&inst);
        assert_eq!(mock.stored_len(), 0);
    }

    #[test]
    fn injected_error_sticks_until_cleared() {
        let mut mock = MockBackend::new();
        let inst = Instance::new();
        inst.set_dirty();
        mock.inject_error(Some(BackendError::Locked));

        mock.commit(&inst);
        assert_eq!(mock.get_error(), Some(BackendError::Locked));
        assert!(inst.is_dirty());
        assert_eq!(mock.stored_len(), 0);

        mock.inject_error(None);
        mock.rollback(&inst);
        assert_eq!(mock.get_error(), None);
    }

    #[test]
    fn unreconcilable_safe_sync_refuses() {
        let mut mock = MockBackend::new();
        let book = Book::new();
        mock.set_unreconcilable(true);
        mock.safe_sync(&book);
        assert_eq!(mock.pop_error(), Some(BackendError::WouldClobber));
        mock.sync(&book);
        assert_eq!(mock.get_error(), None);
    }

    #[test]
    fn records_calls_in_order() {
        let mut mock = MockBackend::new();
        let inst = Instance::new();
        mock.begin(&inst);
        mock.commit(&inst);
        assert_eq!(
            mock.calls(),
            [BackendCall::Begin(inst.guid()), BackendCall::Commit(inst.guid())]
        );
        mock.clear_calls();
        assert!(mock.calls().is_empty());
    }
}
