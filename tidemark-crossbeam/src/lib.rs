//! Epoch-based memory reclamation for the tidemark skip list.
//!
//! Pairs `tidemark_core::SkipList` with crossbeam-epoch:
//!
//! ```ignore
//! use tidemark_core::SkipList;
//! use tidemark_crossbeam::EpochGuard;
//!
//! let list: SkipList<i64, EpochGuard> = SkipList::new();
//! list.insert(42);
//! ```

mod epoch_guard;

pub use epoch_guard::{EpochGuard, EpochRef};
