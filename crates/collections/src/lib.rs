//! `rivet-collections` provides the ordered and indexed containers the
//! linker is built on: a red-black tree used by the symbol and archive
//! indices, and a sparse index table used by the per-file section and
//! symbol tables.
//!
//! Both containers are single-threaded by design; the linking pipeline
//! never shares them across threads.

mod rbtree;
mod table;

pub use rbtree::RbTree;
pub use table::{AlreadyPresent, IndexTable};
