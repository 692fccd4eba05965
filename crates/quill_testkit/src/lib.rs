//! # Quill Testkit
//!
//! Test utilities for quill.
//!
//! This crate provides:
//! - A scriptable in-memory [`MockBackend`] that records every call
//! - Book fixtures and a [`CallbackLog`] for commit completion callbacks
//! - Property-based edit-script generators using proptest
//! - Capture of `tracing` diagnostics for asserting on reported misuse
//!
//! ## Usage
//!
//! ```rust
//! use quill_testkit::prelude::*;
//!
//! with_test_book(|fixture| {
//!     let inst = fixture.instance();
//!     let log = CallbackLog::new();
//!     inst.begin_edit();
//!     assert!(inst.commit_edit());
//!     assert!(inst.finalize_commit(log.hooks()));
//!     assert_eq!(log.dones(), 1);
//!     assert_eq!(fixture.backend().commit_count(), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod diagnostics;
pub mod fixtures;
pub mod generators;
pub mod mock;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::diagnostics::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::mock::*;
}

pub use diagnostics::*;
pub use fixtures::*;
pub use generators::*;
pub use mock::*;
