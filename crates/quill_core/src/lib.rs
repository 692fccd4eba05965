//! # Quill Core
//!
//! Transactional entity layer for quill.
//!
//! This crate provides:
//! - [`Instance`], the identity/dirty/edit-level state every persistable
//!   object is built on
//! - The commit protocol: nested [`begin_edit`] / [`commit_edit`] brackets
//!   and [`finalize_commit`] with its completion callbacks
//! - Per-type entity registries ([`Collection`]) owned by a [`Book`]
//! - The [`Backend`] contract that persistence plug-ins implement
//! - [`Session`], which binds a book to an open backend
//!
//! Persistence itself lives in backends outside this crate. A book with no
//! backend is a valid in-memory book.
//!
//! ## Example
//!
//! ```rust
//! use quill_core::{Book, CommitHooks, Instance};
//!
//! let book = Book::new();
//! let account = Instance::create("Account", &book);
//! assert!(account.is_infant());
//!
//! let session = account.edit();
//! assert!(account.is_dirty());
//! assert!(session.commit(CommitHooks::new()));
//! assert_eq!(account.edit_level(), 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod book;
mod collection;
mod commit;
mod config;
mod error;
mod guid;
mod instance;
mod session;
mod slots;
mod types;

pub use backend::{Backend, ErrorSlot, LoadType, SessionOpenMode, SharedBackend};
pub use book::Book;
pub use collection::Collection;
pub use commit::{begin_edit, commit_edit, finalize_commit, rollback_edit, CommitHooks, EditSession};
pub use config::BookConfig;
pub use error::{BackendError, CoreError, CoreResult};
pub use guid::{Guid, GUID_SIZE};
pub use instance::{DisplayName, Instance};
pub use session::Session;
pub use slots::{SlotValue, Slots};
pub use types::{EntityType, Timestamp};
