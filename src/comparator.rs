use std::cmp::Ordering;

/// Comparator defines a total order over keys of type `K`.
///
/// A comparator is fixed for the lifetime of a tree. It must be
/// consistent across calls, otherwise lookups and mutations return
/// arbitrary results; the tree never checks this.
pub trait Comparator<K: ?Sized> {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Order keys using their [`Ord`] implementation. This is the default
/// comparator for [`crate::RbTree`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Natural;

impl<K> Comparator<K> for Natural
where
    K: Ord + ?Sized,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Flip the order of a wrapped comparator.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reversed<C>(pub C);

impl<K, C> Comparator<K> for Reversed<C>
where
    K: ?Sized,
    C: Comparator<K>,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self.0.compare(b, a)
    }
}

impl<K, F> Comparator<K> for F
where
    K: ?Sized,
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}
