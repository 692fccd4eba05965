//! Entity identity.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Number of bytes in an encoded identity.
pub const GUID_SIZE: usize = 16;

/// Globally unique identifier for an instance.
///
/// Guids are 128-bit values that are:
/// - Generated randomly when an instance is created or initialized
/// - Compared by their encoded bytes
/// - Immutable except through an explicit re-key
///
/// The all-zero value is the null identity and is never handed out by
/// [`Guid::new`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Guid([u8; GUID_SIZE]);

impl Guid {
    /// The null identity.
    pub const NULL: Self = Self([0; GUID_SIZE]);

    /// Creates a new random identity.
    #[must_use]
    pub fn new() -> Self {
        loop {
            let guid = Self(Uuid::new_v4().into_bytes());
            if !guid.is_null() {
                return guid;
            }
        }
    }

    /// Returns the null identity.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self::NULL
    }

    /// Returns true if this is the null identity.
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Creates an identity from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; GUID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; GUID_SIZE] {
        &self.0
    }

    /// Creates an identity from a slice.
    ///
    /// Returns `None` if the slice is not exactly 16 bytes.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; GUID_SIZE]>::try_from(slice).ok().map(Self)
    }

    /// Converts to a UUID.
    #[must_use]
    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }
}

impl Default for Guid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uuid().simple())
    }
}

impl FromStr for Guid {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Uuid::try_parse(s.trim())
            .map(|uuid| Self(uuid.into_bytes()))
            .map_err(|_| CoreError::invalid_guid(s))
    }
}

impl From<Uuid> for Guid {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.into_bytes())
    }
}

impl From<[u8; GUID_SIZE]> for Guid {
    fn from(bytes: [u8; GUID_SIZE]) -> Self {
        Self::from_bytes(bytes)
    }
}
