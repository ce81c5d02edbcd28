//! An ordered set of unique keys backed by a skiplist.
//!
//! `SkipList<T>` keeps its keys in ascending order and supports insertion, deletion, and lookup
//! in expected logarithmic time. Nodes are stored in a `TypedArena` and linked by handles, so the
//! list contains no unsafe code and is dropped without recursion.

pub mod arena;
pub mod skiplist;
