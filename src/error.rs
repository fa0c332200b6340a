use std::{error, fmt};

/// Error enumerates over all possible errors that this package
/// shall return. Only [`crate::RbTree::validate`] returns them, regular
/// read and write operations cannot fail.
#[derive(Debug, PartialEq)]
pub enum Error<K> {
    /// Fatal case, root node is colored red.
    RedRoot,
    /// Fatal case, a red node with a red child. Carries the child's key.
    ConsecutiveReds(K),
    /// Fatal case, black height differs between two paths. The String
    /// component of this variant can be used for debugging.
    UnbalancedBlacks(String),
    /// Fatal case, index entries are not in sort-order. Carries the
    /// (child, parent) keys.
    SortError(K, K),
    /// Fatal case, child does not point back to its parent.
    BrokenParent(K),
    /// Fatal case, entry count does not match reachable nodes.
    SizeMismatch { expected: usize, found: usize },
}

impl<K> fmt::Display for Error<K>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::RedRoot => write!(f, "root node is red"),
            Error::ConsecutiveReds(key) => write!(f, "consecutive reds at {:?}", key),
            Error::UnbalancedBlacks(msg) => write!(f, "unbalanced blacks, {}", msg),
            Error::SortError(child, parent) => {
                write!(f, "sort error child:{:?} parent:{:?}", child, parent)
            }
            Error::BrokenParent(key) => write!(f, "broken parent link at {:?}", key),
            Error::SizeMismatch { expected, found } => {
                write!(f, "size mismatch expected:{} found:{}", expected, found)
            }
        }
    }
}

impl<K> error::Error for Error<K> where K: fmt::Debug {}
