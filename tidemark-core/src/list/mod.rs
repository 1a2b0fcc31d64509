//! The lock-free skip list and its cursors.
//!
//! - [`skip_list`] - the ordered structure and its mutators
//! - [`cursor`] - cursors and the cloning iterator
//! - `marked_ptr`, `node` - internal representation

pub mod cursor;
pub(crate) mod marked_ptr;
pub(crate) mod node;
pub mod skip_list;

pub use cursor::{Cursor, Iter};
pub use skip_list::{SkipList, DEFAULT_MAX_LEVEL};
