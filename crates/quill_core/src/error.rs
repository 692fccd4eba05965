//! Error types for quill core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by in-process administrative operations.
///
/// Persistence failures are not reported through this type: they travel
/// through a backend's last-error slot as a [`BackendError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Text could not be parsed as an identity.
    #[error("invalid guid: {input:?}")]
    InvalidGuid {
        /// The rejected input.
        input: String,
    },

    /// Another instance is already registered under this identity.
    #[error("guid {guid} already registered for type {entity_type}")]
    DuplicateGuid {
        /// The colliding identity, in display form.
        guid: String,
        /// Type of the registry where the collision occurred.
        entity_type: String,
    },

    /// The book has been destroyed.
    #[error("book has been destroyed")]
    BookDestroyed,

    /// The book is read-only.
    #[error("book is read-only")]
    ReadOnly,
}

impl CoreError {
    /// Creates an invalid guid error.
    pub fn invalid_guid(input: impl Into<String>) -> Self {
        Self::InvalidGuid {
            input: input.into(),
        }
    }

    /// Creates a duplicate guid error.
    pub fn duplicate_guid(guid: impl ToString, entity_type: impl Into<String>) -> Self {
        Self::DuplicateGuid {
            guid: guid.to_string(),
            entity_type: entity_type.into(),
        }
    }
}

/// Error codes reported by a backend through its last-error slot.
///
/// Codes are stable: [`BackendError::code`] is suitable for logging and for
/// matching by callers that persist error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum BackendError {
    /// No backend handler exists for the requested access method.
    #[error("no suitable backend was found for the requested location")]
    NoHandler,

    /// The book has no backend attached.
    #[error("the book is not attached to any backend")]
    NoBackend,

    /// The location could not be understood.
    #[error("the location could not be parsed")]
    BadUrl,

    /// The requested database does not exist.
    #[error("the requested database does not exist")]
    NoSuchDb,

    /// The backend could not connect to its store.
    #[error("could not connect to the data store")]
    CantConnect,

    /// The connection dropped during an operation.
    #[error("the connection to the data store was lost")]
    ConnectionLost,

    /// The store is locked by another session.
    #[error("the data store is locked by another session")]
    Locked,

    /// A new store would overwrite an existing one.
    #[error("a data store already exists at this location")]
    StoreExists,

    /// The store or book is read-only.
    #[error("the data store is read-only")]
    ReadOnly,

    /// The store was written by a newer version.
    #[error("the data store was written by a newer version")]
    TooNew,

    /// The store contents could not be interpreted.
    #[error("the data store is corrupt")]
    DataCorrupt,

    /// The server reported an internal failure.
    #[error("the server reported an error")]
    ServerError,

    /// Memory could not be allocated.
    #[error("out of memory")]
    Allocation,

    /// Permission to access the store was denied.
    #[error("permission denied")]
    PermissionDenied,

    /// The entity was changed in the store since it was loaded.
    #[error("the entity was modified by another session")]
    Modified,

    /// The entity was deleted in the store since it was loaded.
    #[error("the entity was deleted by another session")]
    ModifiedDestroyed,

    /// The backend could not reconcile store contents with the book.
    #[error("refusing to overwrite data that cannot be reconciled")]
    WouldClobber,

    /// Any other failure.
    #[error("an unspecified backend error occurred")]
    Misc,
}

impl BackendError {
    /// Returns the stable numeric code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::NoHandler => 1,
            Self::NoBackend => 2,
            Self::BadUrl => 3,
            Self::NoSuchDb => 4,
            Self::CantConnect => 5,
            Self::ConnectionLost => 6,
            Self::Locked => 7,
            Self::StoreExists => 8,
            Self::ReadOnly => 9,
            Self::TooNew => 10,
            Self::DataCorrupt => 11,
            Self::ServerError => 12,
            Self::Allocation => 13,
            Self::PermissionDenied => 14,
            Self::Modified => 15,
            Self::ModifiedDestroyed => 16,
            Self::WouldClobber => 17,
            Self::Misc => 99,
        }
    }

    /// Returns a short title suitable for a dialog heading.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::NoHandler | Self::NoBackend | Self::BadUrl => "Cannot open location",
            Self::NoSuchDb => "Database not found",
            Self::CantConnect | Self::ConnectionLost | Self::ServerError => "Connection problem",
            Self::Locked | Self::StoreExists => "Data store in use",
            Self::ReadOnly | Self::PermissionDenied => "Access denied",
            Self::TooNew => "Unsupported version",
            Self::DataCorrupt => "Corrupt data",
            Self::Modified | Self::ModifiedDestroyed | Self::WouldClobber => "Conflicting change",
            Self::Allocation | Self::Misc => "Backend error",
        }
    }

    /// Returns `(title, description)` for presenting the error to a user.
    #[must_use]
    pub fn describe(self) -> (&'static str, String) {
        (self.title(), self.to_string())
    }
}
