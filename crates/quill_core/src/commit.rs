//! Edit sessions and the commit protocol.
//!
//! Mutations are bracketed by [`begin_edit`] / [`commit_edit`]. Brackets
//! nest: only the outermost [`begin_edit`] marks the instance dirty and
//! notifies the backend, and only the [`commit_edit`] that brings the level
//! back to zero returns true. The caller then runs [`finalize_commit`],
//! which performs the backend round trip and dispatches the completion
//! callbacks in [`CommitHooks`].
//!
//! ```rust
//! use quill_core::{Book, CommitHooks, Instance};
//!
//! let book = Book::new();
//! let account = Instance::create("Account", &book);
//!
//! account.begin_edit();
//! account.begin_edit();
//! assert!(!account.commit_edit());
//! if account.commit_edit() {
//!     let mut done = false;
//!     assert!(account.finalize_commit(CommitHooks::new().on_done(|_| done = true)));
//!     assert!(done);
//! }
//! ```

use crate::error::BackendError;
use crate::instance::Instance;

type ErrorHook<'a> = Box<dyn FnOnce(&Instance, BackendError) + 'a>;
type InstanceHook<'a> = Box<dyn FnOnce(&Instance) + 'a>;

/// Optional completion callbacks for [`finalize_commit`].
///
/// Each callback fires at most once per finalize call. `on_done` and
/// `on_free` are mutually exclusive; `on_error` fires instead of both when
/// the backend reports a failure.
#[derive(Default)]
pub struct CommitHooks<'a> {
    on_error: Option<ErrorHook<'a>>,
    on_done: Option<InstanceHook<'a>>,
    on_free: Option<InstanceHook<'a>>,
}

impl<'a> CommitHooks<'a> {
    /// Creates an empty set of callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the backend's error code when the commit fails.
    #[must_use]
    pub fn on_error(mut self, f: impl FnOnce(&Instance, BackendError) + 'a) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Called when a save completes.
    #[must_use]
    pub fn on_done(mut self, f: impl FnOnce(&Instance) + 'a) -> Self {
        self.on_done = Some(Box::new(f));
        self
    }

    /// Called when a deletion completes.
    #[must_use]
    pub fn on_free(mut self, f: impl FnOnce(&Instance) + 'a) -> Self {
        self.on_free = Some(Box::new(f));
        self
    }

    fn complete(self, instance: &Instance) {
        let hook = if instance.is_destroying() {
            self.on_free
        } else {
            self.on_done
        };
        if let Some(hook) = hook {
            hook(instance);
        }
    }

    fn fail(self, instance: &Instance, error: BackendError) {
        if let Some(hook) = self.on_error {
            hook(instance, error);
        }
    }
}

/// Opens an edit session on `instance`, or nests inside an open one.
///
/// Returns true only for the outermost entry. That call marks the instance
/// dirty and invokes the backend's `begin` hook once if a backend is
/// reachable. Nested calls just bump the level. An absent instance is a
/// no-op returning false.
pub fn begin_edit(instance: Option<&Instance>) -> bool {
    let Some(instance) = instance else {
        return false;
    };
    let level = instance.increase_edit_level();
    if level > 1 {
        return false;
    }
    if level < 1 {
        instance.set_edit_level(1);
    }
    instance.set_dirty();
    if let Some(backend) = instance.backend() {
        backend.lock().begin(instance);
    }
    true
}

/// Closes one level of the edit session on `instance`.
///
/// Returns true when the session is fully closed; the caller should then
/// run [`finalize_commit`]. More closes than opens are reported through
/// `tracing` and the level is reset to zero, after which the call behaves
/// like a normal final close. An absent instance is a no-op returning false.
pub fn commit_edit(instance: Option<&Instance>) -> bool {
    let Some(instance) = instance else {
        return false;
    };
    let level = instance.decrease_edit_level();
    if level > 0 {
        return false;
    }
    if level < 0 {
        tracing::error!(
            guid = %instance.guid(),
            "unbalanced call - resetting (was {level})"
        );
        instance.reset_edit_level();
    }
    true
}

/// Persists `instance` through its book's backend and dispatches `hooks`.
///
/// Without a reachable backend nothing is persisted, the dirty and infant
/// flags are left alone, `on_free` (when destroying) or `on_done` fires,
/// and the result is true.
///
/// With a backend, its `commit` hook runs and is expected to mark the
/// instance clean on success. If the backend then reports an error,
/// `on_error` fires, the destroying flag is reset and the result is false.
/// Otherwise the instance stops being an infant, `on_free` or `on_done`
/// fires, and the result is true.
///
/// An absent instance is a no-op returning false.
pub fn finalize_commit(instance: Option<&Instance>, hooks: CommitHooks<'_>) -> bool {
    let Some(instance) = instance else {
        return false;
    };
    let Some(backend) = instance.backend() else {
        hooks.complete(instance);
        return true;
    };

    let error = {
        let mut backend = backend.lock();
        backend.commit(instance);
        backend.get_error()
    };

    if let Some(error) = error {
        tracing::debug!(guid = %instance.guid(), code = error.code(), "backend commit failed");
        hooks.fail(instance, error);
        instance.set_destroying(false);
        return false;
    }

    instance.clear_infant();
    hooks.complete(instance);
    true
}

/// Closes one level of the edit session and, when it closes fully, asks the
/// backend to discard uncommitted changes.
///
/// Returns true if the session closed and the rollback reported no error.
pub fn rollback_edit(instance: Option<&Instance>) -> bool {
    let Some(instance) = instance else {
        return false;
    };
    if !commit_edit(Some(instance)) {
        return false;
    }
    match instance.backend() {
        Some(backend) => {
            let mut backend = backend.lock();
            backend.rollback(instance);
            backend.get_error().is_none()
        }
        None => true,
    }
}

/// RAII edit bracket returned by [`Instance::edit`].
///
/// Dropping the guard without calling [`EditSession::commit`] rolls the
/// session back.
#[must_use = "dropping an edit session rolls it back"]
pub struct EditSession<'a> {
    instance: &'a Instance,
    open: bool,
}

impl<'a> EditSession<'a> {
    pub(crate) fn open(instance: &'a Instance) -> Self {
        begin_edit(Some(instance));
        Self {
            instance,
            open: true,
        }
    }

    /// Returns the instance being edited.
    #[must_use]
    pub fn instance(&self) -> &Instance {
        self.instance
    }

    /// Closes the bracket. If it was the outermost one, finalizes the commit
    /// with `hooks` and returns its result; a nested close returns true.
    pub fn commit(mut self, hooks: CommitHooks<'_>) -> bool {
        self.open = false;
        if commit_edit(Some(self.instance)) {
            finalize_commit(Some(self.instance), hooks)
        } else {
            true
        }
    }

    /// Closes the bracket, rolling back if it was the outermost one.
    pub fn rollback(mut self) -> bool {
        self.open = false;
        rollback_edit(Some(self.instance))
    }
}

impl Drop for EditSession<'_> {
    fn drop(&mut self) {
        if self.open {
            rollback_edit(Some(self.instance));
        }
    }
}
