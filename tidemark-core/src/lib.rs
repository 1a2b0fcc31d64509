//! Lock-free concurrent skip list with pluggable memory reclamation.
//!
//! # Organization
//!
//! - [`list`] - The skip list, its cursors, and the marked-pointer internals
//! - [`guard`] - The `Guard` reclamation trait and the deferred testing guard
//! - [`common_tests`] - Guard-generic test functions shared by integration tests
//!
//! # Usage
//!
//! Collections are generic over guard type `G: Guard`:
//!
//! ```ignore
//! use tidemark_core::{SkipList, DeferredGuard};
//!
//! let list: SkipList<i64, DeferredGuard> = SkipList::new();
//! list.insert(42);
//! ```

pub mod common_tests;
pub mod guard;
pub mod list;

// Re-export the main types for convenience
pub use guard::{DeferredGuard, DeferredRef, Guard};
pub use list::{Cursor, Iter, SkipList, DEFAULT_MAX_LEVEL};
