//! Probabilistic linked hierarchy of subsequences.

mod error;
mod level;
mod list;

pub use self::error::{Error, Result};
pub use self::list::{IntoIter, Iter, SkipList, DEFAULT_MAX_HEIGHT, DEFAULT_PROBABILITY};
