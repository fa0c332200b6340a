//! Ordered key-value index backed by a red-black tree.
//!
//! [`RbTree`] supports insert/overwrite, exact lookup, floor and ceil
//! queries, min/max and deletion, all in logarithmic time. Keys are
//! ordered by a [`Comparator`] supplied at construction, [`Natural`]
//! by default.

mod comparator;
mod depth;
mod error;
mod rbtree;

pub use crate::comparator::{Comparator, Natural, Reversed};
pub use crate::depth::Depth;
pub use crate::error::Error;
pub use crate::rbtree::{RbTree, Range, Stats};

#[cfg(test)]
mod rbtree_test;
