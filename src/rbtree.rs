use std::{
    cmp::Ordering,
    fmt, mem,
    ops::{Bound, RangeBounds},
};

use log::debug;
use rand::Rng;

use crate::comparator::{Comparator, Natural};
use crate::depth::Depth;
use crate::error::Error;

/// Index of a node inside the tree's arena.
type NodeId = usize;

/// Absent child or parent. Reads as a black leaf.
const NIL: NodeId = usize::MAX;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Color {
    Red,
    Black,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Side {
    Left = 0,
    Right = 1,
}

impl Side {
    #[inline]
    fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// RbTree manage a single instance of in-memory index using
/// [red-black][rbtree] tree.
///
/// Entries are kept in an arena and linked by index, so the tree owns
/// every node outright and parent links are plain back-references.
/// Keys are ordered by a [`Comparator`] fixed at construction.
///
/// [rbtree]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
#[derive(Clone)]
pub struct RbTree<K, V, C = Natural> {
    nodes: Vec<Node<K, V>>,
    root: NodeId,
    n_count: usize, // number of entries in the tree.
    cmp: C,
}

/// Different ways to construct a new RbTree instance.
impl<K, V> RbTree<K, V, Natural>
where
    K: Ord,
{
    /// Create an empty instance ordered by `K`'s [`Ord`] implementation.
    pub fn new() -> RbTree<K, V, Natural> {
        RbTree::with_comparator(Natural)
    }
}

impl<K, V> Default for RbTree<K, V, Natural>
where
    K: Ord,
{
    fn default() -> Self {
        RbTree::new()
    }
}

impl<K, V, C> RbTree<K, V, C>
where
    C: Comparator<K>,
{
    /// Create an empty instance ordered by `cmp`.
    pub fn with_comparator(cmp: C) -> RbTree<K, V, C> {
        RbTree {
            nodes: Vec::new(),
            root: NIL,
            n_count: Default::default(),
            cmp,
        }
    }

    /// Create a new instance and load it with entries from `iter`.
    /// Later entries overwrite earlier entries with an equal key.
    pub fn load_from<I>(cmp: C, iter: I) -> RbTree<K, V, C>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut tree = RbTree::with_comparator(cmp);
        let mut overwrites = 0;
        for (key, value) in iter {
            if tree.insert(key, value).is_some() {
                overwrites += 1;
            }
        }
        debug!("load_from: {} entries, {} overwrites", tree.len(), overwrites);
        tree
    }
}

/// Maintenance API.
impl<K, V, C> RbTree<K, V, C> {
    /// Return number of entries in this instance.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count
    }

    /// Check whether this index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_count == 0
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = NIL;
        self.n_count = 0;
    }

    /// Return quickly with basic statisics, only entries() and
    /// node_size() are valid with this statisics.
    pub fn stats(&self) -> Stats {
        Stats::new(self.n_count, mem::size_of::<Node<K, V>>())
    }
}

/// Write operations on RbTree instance.
impl<K, V, C> RbTree<K, V, C>
where
    C: Comparator<K>,
{
    /// Set value for key. If there is an existing entry for key, replace
    /// both its key and value in place and return the old value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (mut parent, mut side) = (NIL, Side::Left);
        let mut node = self.root;
        while node != NIL {
            side = match self.cmp.compare(&key, &self.nodes[node].key) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => {
                    let entry = &mut self.nodes[node];
                    entry.key = key;
                    return Some(mem::replace(&mut entry.value, value));
                }
            };
            parent = node;
            node = self.child(node, side);
        }

        let node = self.nodes.len();
        self.nodes.push(Node::new(key, value, parent));
        if parent == NIL {
            self.root = node;
        } else {
            self.set_child(parent, side, node);
        }
        self.insert_fixup(node);
        self.n_count += 1;
        None
    }

    /// Delete key from this instance and return its value. If key is
    /// not present, then delete is effectively a no-op.
    pub fn delete(&mut self, key: &K) -> Option<V> {
        let z = self.find(key);
        if z == NIL {
            return None;
        }

        // y is spliced out, it has at most one child.
        let y = if self.child(z, Side::Left) == NIL || self.child(z, Side::Right) == NIL {
            z
        } else {
            self.extreme(self.child(z, Side::Right), Side::Left)
        };
        let x = match self.child(y, Side::Left) {
            NIL => self.child(y, Side::Right),
            left => left,
        };
        let x_parent = self.parent(y);
        self.replace(y, x);
        if y != z {
            self.swap_payload(z, y);
        }
        if self.nodes[y].color == Color::Black {
            self.delete_fixup(x, x_parent);
        }

        self.n_count -= 1;
        Some(self.release(y).value)
    }
}

/// Read operations on RbTree instance.
impl<K, V, C> RbTree<K, V, C>
where
    C: Comparator<K>,
{
    /// Get the value for key.
    pub fn get(&self, key: &K) -> Option<&V> {
        match self.find(key) {
            NIL => None,
            node => Some(&self.nodes[node].value),
        }
    }

    /// Get a mutable reference to the value for key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        match self.find(key) {
            NIL => None,
            node => Some(&mut self.nodes[node].value),
        }
    }

    /// Check whether key is present in this instance.
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key) != NIL
    }

    /// Return the entry with the greatest key less than or equal to `key`.
    pub fn floor(&self, key: &K) -> Option<(&K, &V)> {
        self.entry(self.seek(key, Side::Left, true))
    }

    /// Return the entry with the smallest key greater than or equal
    /// to `key`.
    pub fn ceil(&self, key: &K) -> Option<(&K, &V)> {
        self.entry(self.seek(key, Side::Right, true))
    }

    /// Range over all entries within `range`, in key order. The returned
    /// iterator can be reversed.
    pub fn range<R>(&self, range: R) -> Range<K, V, C>
    where
        R: RangeBounds<K>,
    {
        let front = match range.start_bound() {
            Bound::Included(key) => self.seek(key, Side::Right, true),
            Bound::Excluded(key) => self.seek(key, Side::Right, false),
            Bound::Unbounded => self.extreme(self.root, Side::Left),
        };
        let back = match range.end_bound() {
            Bound::Included(key) => self.seek(key, Side::Left, true),
            Bound::Excluded(key) => self.seek(key, Side::Left, false),
            Bound::Unbounded => self.extreme(self.root, Side::Right),
        };

        let crossed = front == NIL
            || back == NIL
            || self.cmp.compare(&self.nodes[front].key, &self.nodes[back].key)
                == Ordering::Greater;
        if crossed {
            Range::new(self, NIL, NIL)
        } else {
            Range::new(self, front, back)
        }
    }

    fn find(&self, key: &K) -> NodeId {
        let mut node = self.root;
        while node != NIL {
            node = match self.cmp.compare(key, &self.nodes[node].key) {
                Ordering::Less => self.child(node, Side::Left),
                Ordering::Greater => self.child(node, Side::Right),
                Ordering::Equal => return node,
            };
        }
        NIL
    }

    // Nearest node to `key` on its `toward` side: Side::Right looks for
    // the smallest greater key, Side::Left for the largest smaller key.
    // An equal key matches when inclusive.
    fn seek(&self, key: &K, toward: Side, inclusive: bool) -> NodeId {
        let (mut node, mut found) = (self.root, NIL);
        while node != NIL {
            let hit = match (self.cmp.compare(key, &self.nodes[node].key), toward) {
                (Ordering::Equal, _) if inclusive => return node,
                (Ordering::Less, Side::Right) => true,
                (Ordering::Greater, Side::Left) => true,
                _ => false,
            };
            if hit {
                found = node;
                node = self.child(node, toward.opposite());
            } else {
                node = self.child(node, toward);
            }
        }
        found
    }
}

/// Ordered reads that need no comparator.
impl<K, V, C> RbTree<K, V, C> {
    /// Return the entry with the smallest key.
    pub fn min(&self) -> Option<(&K, &V)> {
        self.entry(self.extreme(self.root, Side::Left))
    }

    /// Return the entry with the largest key.
    pub fn max(&self) -> Option<(&K, &V)> {
        self.entry(self.extreme(self.root, Side::Right))
    }

    /// Return an iterator over all entries in this instance, in key order.
    pub fn iter(&self) -> Range<K, V, C> {
        let front = self.extreme(self.root, Side::Left);
        let back = self.extreme(self.root, Side::Right);
        Range::new(self, front, back)
    }

    /// Return a random entry from this index.
    pub fn random<R: Rng>(&self, rng: &mut R) -> Option<(&K, &V)> {
        if self.root == NIL {
            return None;
        }

        let (mut node, mut at_depth) = (self.root, rng.gen::<u8>() % 40);
        loop {
            let side = if rng.gen::<bool>() { Side::Left } else { Side::Right };
            let next = self.child(node, side);
            if at_depth == 0 || next == NIL {
                break self.entry(node);
            }
            at_depth -= 1;
            node = next;
        }
    }

    /// Render tree shape, one node per line, right subtree on top. Red
    /// nodes are marked with `*`. Meant for debugging, the format is
    /// not stable.
    pub fn dump(&self) -> String
    where
        K: fmt::Debug,
    {
        let mut out = "RbTree\n".to_string();
        if self.root != NIL {
            self.dump_node(self.root, "", true, &mut out);
        }
        out
    }

    fn dump_node(&self, node: NodeId, prefix: &str, tail: bool, out: &mut String)
    where
        K: fmt::Debug,
    {
        let right = self.child(node, Side::Right);
        if right != NIL {
            let pad = if tail { "│   " } else { "    " };
            self.dump_node(right, &(prefix.to_string() + pad), false, out);
        }

        out.push_str(prefix);
        out.push_str(if tail { "└── " } else { "┌── " });
        let n = &self.nodes[node];
        match n.color {
            Color::Red => out.push_str(&format!("*{:?}\n", n.key)),
            Color::Black => out.push_str(&format!("{:?}\n", n.key)),
        }

        let left = self.child(node, Side::Left);
        if left != NIL {
            let pad = if tail { "    " } else { "│   " };
            self.dump_node(left, &(prefix.to_string() + pad), true, out);
        }
    }

    fn entry(&self, node: NodeId) -> Option<(&K, &V)> {
        match node {
            NIL => None,
            node => {
                let n = &self.nodes[node];
                Some((&n.key, &n.value))
            }
        }
    }

    // Walk from `node` down `side` links as far as possible.
    fn extreme(&self, mut node: NodeId, side: Side) -> NodeId {
        if node == NIL {
            return NIL;
        }
        while self.child(node, side) != NIL {
            node = self.child(node, side);
        }
        node
    }

    // In-order neighbour of `node`, successor for Side::Right and
    // predecessor for Side::Left.
    fn step(&self, node: NodeId, side: Side) -> NodeId {
        let child = self.child(node, side);
        if child != NIL {
            return self.extreme(child, side.opposite());
        }
        let (mut node, mut parent) = (node, self.parent(node));
        while parent != NIL && node == self.child(parent, side) {
            node = parent;
            parent = self.parent(parent);
        }
        parent
    }
}

/// Validation.
impl<K, V, C> RbTree<K, V, C>
where
    K: Clone + fmt::Debug,
    C: Comparator<K>,
{
    /// Validate red-black tree with following rules:
    ///
    /// * Root node is black.
    /// * From root to any leaf, no consecutive reds allowed in its path.
    /// * Number of blacks should be same under left child and right child.
    /// * Every child links back to its parent.
    /// * Make sure keys are in sorted order.
    /// * Number of reachable nodes match the entry count.
    ///
    /// Additionally return full statistics on the tree. Refer to [`Stats`]
    /// for more information.
    pub fn validate(&self) -> Result<Stats, Error<K>> {
        let res = self.do_validate();
        if let Err(err) = &res {
            debug!("validate: {}", err);
        }
        res
    }

    fn do_validate(&self) -> Result<Stats, Error<K>> {
        if self.root != NIL && self.nodes[self.root].color == Color::Red {
            return Err(Error::RedRoot);
        }

        let mut depths = Depth::new();
        let mut found = 0;
        let blacks = self.validate_tree(self.root, false, 0, &mut depths, &mut found)?;
        if found != self.n_count || self.nodes.len() != self.n_count {
            let expected = self.n_count;
            return Err(Error::SizeMismatch { expected, found });
        }

        let mut iter = self.iter();
        if let Some(mut prev) = iter.next().map(|(k, _)| k) {
            for (key, _) in iter {
                if self.cmp.compare(prev, key) != Ordering::Less {
                    return Err(Error::SortError(key.clone(), prev.clone()));
                }
                prev = key;
            }
        }

        let mut stats = self.stats();
        stats.set_blacks(blacks);
        stats.set_depths(depths);
        Ok(stats)
    }

    fn validate_tree(
        &self,
        node: NodeId,
        fromred: bool,
        depth: usize,
        depths: &mut Depth,
        found: &mut usize,
    ) -> Result<usize, Error<K>> {
        if node == NIL {
            depths.sample(depth);
            return Ok(0);
        }
        *found += 1;

        let n = &self.nodes[node];
        let red = n.color == Color::Red;
        if fromred && red {
            return Err(Error::ConsecutiveReds(n.key.clone()));
        }

        let mut blacks = [0; 2];
        for side in [Side::Left, Side::Right].iter().copied() {
            let child = self.child(node, side);
            if child != NIL {
                let c = &self.nodes[child];
                if c.parent != node {
                    return Err(Error::BrokenParent(c.key.clone()));
                }
                let want = match side {
                    Side::Left => Ordering::Less,
                    Side::Right => Ordering::Greater,
                };
                if self.cmp.compare(&c.key, &n.key) != want {
                    return Err(Error::SortError(c.key.clone(), n.key.clone()));
                }
            }
            blacks[side as usize] = self.validate_tree(child, red, depth + 1, depths, found)?;
        }

        if blacks[0] != blacks[1] {
            let err = format!("at {:?} left: {} right: {}", n.key, blacks[0], blacks[1]);
            return Err(Error::UnbalancedBlacks(err));
        }
        Ok(if red { blacks[0] } else { blacks[0] + 1 })
    }
}

/// Arena plumbing, rotations and fixups.
impl<K, V, C> RbTree<K, V, C> {
    #[inline]
    fn child(&self, node: NodeId, side: Side) -> NodeId {
        self.nodes[node].child[side as usize]
    }

    #[inline]
    fn set_child(&mut self, node: NodeId, side: Side, child: NodeId) {
        self.nodes[node].child[side as usize] = child
    }

    #[inline]
    fn parent(&self, node: NodeId) -> NodeId {
        self.nodes[node].parent
    }

    #[inline]
    fn is_red(&self, node: NodeId) -> bool {
        node != NIL && self.nodes[node].color == Color::Red
    }

    #[inline]
    fn set_color(&mut self, node: NodeId, color: Color) {
        if node != NIL {
            self.nodes[node].color = color
        }
    }

    // Which side of `parent` holds `node`. A NIL node resolves to the
    // first empty slot, the sibling of a NIL node is never NIL.
    #[inline]
    fn side_of(&self, node: NodeId, parent: NodeId) -> Side {
        if self.child(parent, Side::Left) == node {
            Side::Left
        } else {
            Side::Right
        }
    }

    // Put `new` in the position held by `old`.
    fn replace(&mut self, old: NodeId, new: NodeId) {
        let parent = self.parent(old);
        if parent == NIL {
            self.root = new;
        } else {
            let side = self.side_of(old, parent);
            self.set_child(parent, side, new);
        }
        if new != NIL {
            self.nodes[new].parent = parent;
        }
    }

    //  Side::Left rotation, Side::Right is the mirror.
    //
    //              (i)                       (i)
    //               |                         |
    //              node                       up
    //              /  \                      / \
    //             /    \                    /   \
    //            /      \                  /     \
    //          left      up             node      ur
    //                   / \             /  \
    //                 ul   ur       left    ul
    //
    fn rotate(&mut self, node: NodeId, side: Side) {
        let up = self.child(node, side.opposite());
        if up == NIL {
            return;
        }
        let inner = self.child(up, side);
        self.set_child(node, side.opposite(), inner);
        if inner != NIL {
            self.nodes[inner].parent = node;
        }
        self.replace(node, up);
        self.set_child(up, side, node);
        self.nodes[node].parent = up;
    }

    fn insert_fixup(&mut self, mut node: NodeId) {
        while self.is_red(self.parent(node)) {
            // a red parent is never the root, grand is a real node.
            let parent = self.parent(node);
            let grand = self.parent(parent);
            let side = self.side_of(parent, grand);
            let uncle = self.child(grand, side.opposite());

            if self.is_red(uncle) {
                self.set_color(parent, Color::Black);
                self.set_color(uncle, Color::Black);
                self.set_color(grand, Color::Red);
                node = grand;
                continue;
            }

            if node == self.child(parent, side.opposite()) {
                node = parent;
                self.rotate(node, side);
            }
            let parent = self.parent(node);
            let grand = self.parent(parent);
            self.set_color(parent, Color::Black);
            self.set_color(grand, Color::Red);
            self.rotate(grand, side.opposite());
        }
        let root = self.root;
        self.set_color(root, Color::Black);
    }

    // `x` took the place of a removed black node and carries an extra
    // black. `parent` is tracked apart since x may be NIL.
    fn delete_fixup(&mut self, mut x: NodeId, mut parent: NodeId) {
        while x != self.root && !self.is_red(x) {
            let side = self.side_of(x, parent);
            let far = side.opposite();

            let mut sibling = self.child(parent, far);
            if self.is_red(sibling) {
                self.set_color(sibling, Color::Black);
                self.set_color(parent, Color::Red);
                self.rotate(parent, side);
                sibling = self.child(parent, far);
            }

            let near_nephew = self.child(sibling, side);
            let far_nephew = self.child(sibling, far);
            if !self.is_red(near_nephew) && !self.is_red(far_nephew) {
                self.set_color(sibling, Color::Red);
                x = parent;
                parent = self.parent(x);
                continue;
            }

            if !self.is_red(far_nephew) {
                self.set_color(near_nephew, Color::Black);
                self.set_color(sibling, Color::Red);
                self.rotate(sibling, far);
                sibling = self.child(parent, far);
            }
            let color = self.nodes[parent].color;
            self.set_color(sibling, color);
            self.set_color(parent, Color::Black);
            let far_nephew = self.child(sibling, far);
            self.set_color(far_nephew, Color::Black);
            self.rotate(parent, side);
            x = self.root;
        }
        self.set_color(x, Color::Black);
    }

    fn swap_payload(&mut self, a: NodeId, b: NodeId) {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.nodes.split_at_mut(hi);
        let (x, y) = (&mut head[lo], &mut tail[0]);
        mem::swap(&mut x.key, &mut y.key);
        mem::swap(&mut x.value, &mut y.value);
    }

    // Drop an unlinked node from the arena. The last slot moves into
    // the hole, and its neighbours are re-pointed at the new index.
    fn release(&mut self, node: NodeId) -> Node<K, V> {
        let removed = self.nodes.swap_remove(node);
        let moved = self.nodes.len();
        if node < moved {
            let parent = self.parent(node);
            if parent == NIL {
                self.root = node;
            } else {
                let side = self.side_of(moved, parent);
                self.set_child(parent, side, node);
            }
            for side in [Side::Left, Side::Right].iter().copied() {
                let child = self.child(node, side);
                if child != NIL {
                    self.nodes[child].parent = node;
                }
            }
        }
        removed
    }
}

impl<K, V, C> fmt::Debug for RbTree<K, V, C>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, C> IntoIterator for &'a RbTree<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Range<'a, K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a contiguous run of entries, in key order, returned by
/// [`RbTree::iter`] and [`RbTree::range`].
pub struct Range<'a, K, V, C> {
    tree: &'a RbTree<K, V, C>,
    front: NodeId,
    back: NodeId,
}

impl<'a, K, V, C> Range<'a, K, V, C> {
    fn new(tree: &'a RbTree<K, V, C>, front: NodeId, back: NodeId) -> Self {
        Range { tree, front, back }
    }

    // Yield `front` or `back` and move it towards the other end.
    fn advance(&mut self, side: Side) -> Option<(&'a K, &'a V)> {
        let node = match side {
            Side::Right => self.front,
            Side::Left => self.back,
        };
        if node == NIL {
            return None;
        }
        if self.front == self.back {
            self.front = NIL;
            self.back = NIL;
        } else {
            let next = self.tree.step(node, side);
            match side {
                Side::Right => self.front = next,
                Side::Left => self.back = next,
            }
        }
        self.tree.entry(node)
    }
}

impl<'a, K, V, C> Iterator for Range<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.advance(Side::Right)
    }
}

impl<'a, K, V, C> DoubleEndedIterator for Range<'a, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.advance(Side::Left)
    }
}

/// Node corresponds to a single entry in RbTree instance.
#[derive(Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    color: Color,
    child: [NodeId; 2], // indexed by Side
    parent: NodeId,     // NIL for root
}

impl<K, V> Node<K, V> {
    // new nodes are always red leaves.
    fn new(key: K, value: V, parent: NodeId) -> Node<K, V> {
        Node {
            key,
            value,
            color: Color::Red,
            child: [NIL, NIL],
            parent,
        }
    }
}

/// Statistics on [`RbTree`]. Serves two purpose:
///
/// * To get partial but quick statistics via [`RbTree::stats`] method.
/// * To get full statisics via [`RbTree::validate`] method.
#[derive(Default, Debug)]
pub struct Stats {
    entries: usize, // number of entries in the tree.
    node_size: usize,
    blacks: Option<usize>,
    depths: Option<Depth>,
}

impl Stats {
    fn new(entries: usize, node_size: usize) -> Stats {
        Stats {
            entries,
            node_size,
            blacks: Default::default(),
            depths: Default::default(),
        }
    }

    #[inline]
    fn set_blacks(&mut self, blacks: usize) {
        self.blacks = Some(blacks)
    }

    #[inline]
    fn set_depths(&mut self, depths: Depth) {
        self.depths = Some(depths)
    }

    /// Return number entries in [`RbTree`] instance.
    #[inline]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Return node-size, including over-head for `RbTree<K, V>`. The
    /// overhead is constant, the node size varies with key and value
    /// types. EG:
    ///
    /// ```
    /// use rbtree_index::RbTree;
    /// let tree: RbTree<u64, u64> = RbTree::new();
    ///
    /// // size of key: 8 bytes
    /// // size of value: 8 bytes
    /// // overhead is 32 bytes, links and padded color.
    /// assert_eq!(tree.stats().node_size(), 48);
    /// ```
    #[inline]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Return number of black nodes from root to leaf, sentinel leaf
    /// excluded.
    #[inline]
    pub fn blacks(&self) -> Option<usize> {
        self.blacks
    }

    /// Return [`Depth`] statistics.
    pub fn depths(&self) -> Option<Depth> {
        self.depths.clone()
    }
}
