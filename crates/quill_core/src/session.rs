//! Session: a book bound to an open backend.
//!
//! A session forwards open, load, save and close to the backend the caller
//! hands it, and keeps its own error slot for failures it detects before
//! reaching the backend. Locating a backend for a URI is the caller's job.

use crate::backend::{ErrorSlot, LoadType, SessionOpenMode, SharedBackend};
use crate::book::Book;
use crate::error::BackendError;

type CloseHook = Box<dyn FnMut(&Session) + Send>;

/// A book together with the backend session that persists it.
pub struct Session {
    book: Book,
    backend: Option<SharedBackend>,
    uri: Option<String>,
    errors: ErrorSlot,
    close_hooks: Vec<CloseHook>,
}

impl Session {
    /// Creates a session for `book` with no backend attached.
    #[must_use]
    pub fn new(book: Book) -> Self {
        Self {
            book,
            backend: None,
            uri: None,
            errors: ErrorSlot::new(),
            close_hooks: Vec::new(),
        }
    }

    /// Returns the session's book.
    #[must_use]
    pub fn book(&self) -> &Book {
        &self.book
    }

    /// Returns the URI passed to the last successful [`Session::begin`].
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Returns true while a backend is attached.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    /// Opens `backend` at `uri` and attaches it to the book.
    ///
    /// Reports [`BackendError::Locked`] if the session is already open. If
    /// the backend reports an error the session stays closed. Opening in
    /// [`SessionOpenMode::ReadOnly`] marks the book read-only.
    pub fn begin(&mut self, uri: &str, mode: SessionOpenMode, backend: SharedBackend) {
        if self.uri.is_some() {
            self.errors.set(Some(BackendError::Locked));
            return;
        }
        self.errors.set(None);

        let error = {
            let mut be = backend.lock();
            be.session_begin(uri, mode);
            be.get_error()
        };
        if let Some(error) = error {
            tracing::warn!(uri, code = error.code(), "session begin failed");
            self.errors.set(Some(error));
            return;
        }

        if mode == SessionOpenMode::ReadOnly {
            self.book.mark_read_only();
        }
        self.book.set_backend(Some(backend.clone()));
        self.backend = Some(backend);
        self.uri = Some(uri.to_owned());
        tracing::debug!(uri, ?mode, "session begun");
    }

    /// Loads store contents into the book.
    pub fn load(&mut self, load_type: LoadType) {
        self.errors.set(None);
        let Some(backend) = self.backend.clone() else {
            self.errors.set(Some(BackendError::NoBackend));
            return;
        };
        let error = {
            let mut be = backend.lock();
            be.load(&self.book, load_type);
            be.get_error()
        };
        match error {
            Some(error) => self.errors.set(Some(error)),
            None => self.book.mark_session_saved(),
        }
    }

    /// Writes the book through the backend.
    ///
    /// Reports [`BackendError::ReadOnly`] for a read-only book and
    /// [`BackendError::NoHandler`] when no backend is attached.
    pub fn save(&mut self) {
        self.store(false);
    }

    /// Like [`Session::save`], but asks the backend not to overwrite data it
    /// cannot reconcile.
    pub fn safe_save(&mut self) {
        self.store(true);
    }

    fn store(&mut self, safe: bool) {
        self.errors.set(None);
        if self.book.is_read_only() {
            self.errors.set(Some(BackendError::ReadOnly));
            return;
        }
        let Some(backend) = self.backend.clone() else {
            self.errors.set(Some(BackendError::NoHandler));
            return;
        };
        let error = {
            let mut be = backend.lock();
            if safe {
                be.safe_sync(&self.book);
            } else {
                be.sync(&self.book);
            }
            be.get_error()
        };
        match error {
            Some(error) => {
                tracing::warn!(code = error.code(), safe, "save failed");
                self.errors.set(Some(error));
            }
            None => self.book.mark_session_saved(),
        }
    }

    /// Closes the backend session and detaches the backend from the book.
    pub fn end(&mut self) {
        if let Some(backend) = self.backend.take() {
            let error = {
                let mut be = backend.lock();
                be.session_end();
                be.get_error()
            };
            self.errors.set(error);
            tracing::debug!(uri = self.uri.as_deref().unwrap_or(""), "session ended");
        }
        self.book.set_backend(None);
        self.uri = None;
    }

    /// Returns the last error without clearing it.
    ///
    /// The session's own error takes precedence over the backend's.
    #[must_use]
    pub fn get_error(&self) -> Option<BackendError> {
        self.errors
            .get()
            .or_else(|| self.backend.as_ref().and_then(|be| be.lock().get_error()))
    }

    /// Returns the last error and clears it.
    pub fn pop_error(&mut self) -> Option<BackendError> {
        self.errors
            .pop()
            .or_else(|| self.backend.as_ref().and_then(|be| be.lock().pop_error()))
    }

    /// Returns a message describing the last error, or an empty string.
    #[must_use]
    pub fn error_message(&self) -> String {
        if let Some(error) = self.errors.get() {
            return self
                .errors
                .message()
                .map_or_else(|| error.to_string(), str::to_owned);
        }
        let Some(backend) = &self.backend else {
            return String::new();
        };
        let be = backend.lock();
        match be.get_error() {
            Some(error) => be.get_message().unwrap_or_else(|| error.to_string()),
            None => String::new(),
        }
    }

    /// Registers a hook to run from [`Session::call_close_hooks`].
    pub fn add_close_hook(&mut self, hook: impl FnMut(&Session) + Send + 'static) {
        self.close_hooks.push(Box::new(hook));
    }

    /// Runs every close hook in registration order.
    pub fn call_close_hooks(&mut self) {
        let mut hooks = std::mem::take(&mut self.close_hooks);
        for hook in &mut hooks {
            hook(&*self);
        }
        hooks.append(&mut self.close_hooks);
        self.close_hooks = hooks;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.backend.is_some() {
            self.end();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("book", &self.book)
            .field("uri", &self.uri)
            .field("error", &self.errors.get())
            .finish_non_exhaustive()
    }
}
