//! A red-black tree keyed store with ordered keys.
#![warn(missing_docs)]

use std::borrow::Borrow;
use std::cmp::Ordering;

mod rbtree_node;

use rbtree_node::{Arena, NIL};

pub use rbtree_node::{Color, NodeId};

/// A self-balancing ordered key store.
///
/// Search, insert, and delete run in O(log n); the tree height stays
/// within a factor of two of optimal. Nodes live in an internal arena
/// and are addressed by [`NodeId`] handles. A handle returned by
/// [`insert`](RbTree::insert) or [`search`](RbTree::search) stays valid
/// until that node's key is deleted.
pub struct RbTree<K> {
    arena: Arena<K>,
    root: NodeId,
    length: usize,
}

impl<K> RbTree<K> {
    /// Creates a new empty tree.
    pub fn new() -> Self {
        RbTree {
            arena: Arena::new(),
            root: NIL,
            length: 0,
        }
    }

    /// Returns the number of keys in the tree.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true if the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the key stored in a node.
    ///
    /// # Panics
    ///
    /// Panics if the handle names a node that has since been deleted.
    pub fn key(&self, node: NodeId) -> &K {
        self.arena.key(node)
    }

    /// Returns a node's color. Useful for inspecting rebalance results.
    pub fn color(&self, node: NodeId) -> Color {
        self.arena.color(node)
    }
}

impl<K> Default for RbTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> RbTree<K>
where
    K: Ord,
{
    /// Returns the node holding the key, or `None` if the key is absent.
    pub fn search<Q: ?Sized + Ord>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
    {
        let mut current = self.root;
        while !current.is_nil() {
            current = match key.cmp(self.arena.key(current).borrow()) {
                Ordering::Less => self.arena.left(current),
                Ordering::Greater => self.arena.right(current),
                Ordering::Equal => return Some(current),
            };
        }
        None
    }

    /// Returns true if the key is present.
    pub fn contains<Q: ?Sized + Ord>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
    {
        self.search(key).is_some()
    }

    /// Returns the node holding the smallest key.
    pub fn min(&self) -> Option<NodeId> {
        if self.root.is_nil() {
            None
        } else {
            Some(self.leftmost(self.root))
        }
    }

    /// Returns the node holding the largest key.
    pub fn max(&self) -> Option<NodeId> {
        if self.root.is_nil() {
            None
        } else {
            Some(self.rightmost(self.root))
        }
    }

    /// Inserts a key, returning the handle of its node.
    ///
    /// If the key is already present this is a no-op returning the
    /// existing node's handle; the tree is left untouched.
    pub fn insert(&mut self, key: K) -> NodeId {
        let mut parent = NIL;
        let mut current = self.root;
        let mut went_left = false;
        while !current.is_nil() {
            match key.cmp(self.arena.key(current)) {
                Ordering::Equal => return current,
                Ordering::Less => {
                    parent = current;
                    went_left = true;
                    current = self.arena.left(current);
                }
                Ordering::Greater => {
                    parent = current;
                    went_left = false;
                    current = self.arena.right(current);
                }
            }
        }

        let node = self.arena.alloc(key);
        self.length += 1;
        if parent.is_nil() {
            self.root = node;
        } else {
            self.arena.set_parent(node, parent);
            if went_left {
                self.arena.set_left(parent, node);
            } else {
                self.arena.set_right(parent, node);
            }
        }
        self.fix_after_insert(node);
        node
    }

    /// Removes a key, returning it if it was present.
    ///
    /// Deleting an absent key is a no-op returning `None`. When the
    /// victim has two children its in-order predecessor node is relinked
    /// into its place, so handles to other nodes stay valid.
    pub fn delete<Q: ?Sized + Ord>(&mut self, key: &Q) -> Option<K>
    where
        K: Borrow<Q>,
    {
        let target = self.search(key)?;
        self.length -= 1;
        Some(self.unlink(target))
    }

    /// Restores the red-black invariants after linking a new red node.
    ///
    /// Iterative walk toward the root: a red uncle means recolor and
    /// ascend; a black uncle means at most two rotations and the loop
    /// ends. The root is recolored black unconditionally at the end.
    fn fix_after_insert(&mut self, mut z: NodeId) {
        while self.arena.is_red(self.arena.parent(z)) {
            let parent = self.arena.parent(z);
            let grandparent = self.arena.parent(parent);
            if parent == self.arena.left(grandparent) {
                let uncle = self.arena.right(grandparent);
                if self.arena.is_red(uncle) {
                    self.arena.set_color(parent, Color::Black);
                    self.arena.set_color(uncle, Color::Black);
                    self.arena.set_color(grandparent, Color::Red);
                    z = grandparent;
                } else {
                    if z == self.arena.right(parent) {
                        // Inner grandchild: rotate it outward first.
                        z = parent;
                        self.rotate_left(z);
                    }
                    let parent = self.arena.parent(z);
                    let grandparent = self.arena.parent(parent);
                    self.arena.set_color(parent, Color::Black);
                    self.arena.set_color(grandparent, Color::Red);
                    self.rotate_right(grandparent);
                }
            } else {
                let uncle = self.arena.left(grandparent);
                if self.arena.is_red(uncle) {
                    self.arena.set_color(parent, Color::Black);
                    self.arena.set_color(uncle, Color::Black);
                    self.arena.set_color(grandparent, Color::Red);
                    z = grandparent;
                } else {
                    if z == self.arena.left(parent) {
                        z = parent;
                        self.rotate_right(z);
                    }
                    let parent = self.arena.parent(z);
                    let grandparent = self.arena.parent(parent);
                    self.arena.set_color(parent, Color::Black);
                    self.arena.set_color(grandparent, Color::Red);
                    self.rotate_left(grandparent);
                }
            }
        }
        self.arena.set_color(self.root, Color::Black);
    }

    /// Unlinks a node from the tree and returns its key.
    fn unlink(&mut self, z: NodeId) -> K {
        let left = self.arena.left(z);
        let right = self.arena.right(z);
        let mut removed_color = self.arena.color(z);
        // The node inheriting the unlinked position (possibly the
        // sentinel) and its parent after the splice. The parent is
        // tracked separately so the sentinel's parent link is never
        // written or read.
        let x;
        let x_parent;

        if left.is_nil() {
            x = right;
            x_parent = self.arena.parent(z);
            self.replace_child(x_parent, z, x);
        } else if right.is_nil() {
            x = left;
            x_parent = self.arena.parent(z);
            self.replace_child(x_parent, z, x);
        } else {
            // Two children: relink the in-order predecessor into z's
            // place. The freed slot is always z itself, so handles to
            // every other node survive.
            let pred = self.rightmost(left);
            debug_assert!(self.arena.right(pred).is_nil());
            removed_color = self.arena.color(pred);
            x = self.arena.left(pred);
            if pred == left {
                // Predecessor is z's left child; x stays under it.
                x_parent = pred;
            } else {
                x_parent = self.arena.parent(pred);
                self.replace_child(x_parent, pred, x);
                self.arena.set_left(pred, left);
                self.arena.set_parent(left, pred);
            }
            let above = self.arena.parent(z);
            self.replace_child(above, z, pred);
            self.arena.set_right(pred, right);
            self.arena.set_parent(right, pred);
            self.arena.set_color(pred, self.arena.color(z));
        }

        if removed_color == Color::Black {
            self.fix_after_delete(x, x_parent);
        }
        self.arena.free(z)
    }

    /// Restores the red-black invariants after splicing out a black node.
    ///
    /// `x` carries the missing black (it may be the sentinel), `parent`
    /// is its position's parent. Iterative case dispatch: a red sibling
    /// is rotated down to expose a black one; a black sibling with black
    /// children absorbs a recolor and the deficiency moves up; otherwise
    /// at most two rotations settle the debt and the loop ends.
    fn fix_after_delete(&mut self, mut x: NodeId, mut parent: NodeId) {
        while x != self.root && self.arena.is_black(x) {
            if x == self.arena.left(parent) {
                let mut sibling = self.arena.right(parent);
                debug_assert!(!sibling.is_nil());
                if self.arena.is_red(sibling) {
                    self.arena.set_color(sibling, Color::Black);
                    self.arena.set_color(parent, Color::Red);
                    self.rotate_left(parent);
                    sibling = self.arena.right(parent);
                }
                if self.arena.is_black(self.arena.left(sibling))
                    && self.arena.is_black(self.arena.right(sibling))
                {
                    self.arena.set_color(sibling, Color::Red);
                    x = parent;
                    parent = self.arena.parent(x);
                } else {
                    if self.arena.is_black(self.arena.right(sibling)) {
                        // Near child red, far child black: rotate the
                        // near child up to expose a red far child.
                        self.arena.set_color(self.arena.left(sibling), Color::Black);
                        self.arena.set_color(sibling, Color::Red);
                        self.rotate_right(sibling);
                        sibling = self.arena.right(parent);
                    }
                    self.arena.set_color(sibling, self.arena.color(parent));
                    self.arena.set_color(parent, Color::Black);
                    self.arena.set_color(self.arena.right(sibling), Color::Black);
                    self.rotate_left(parent);
                    x = self.root;
                }
            } else {
                let mut sibling = self.arena.left(parent);
                debug_assert!(!sibling.is_nil());
                if self.arena.is_red(sibling) {
                    self.arena.set_color(sibling, Color::Black);
                    self.arena.set_color(parent, Color::Red);
                    self.rotate_right(parent);
                    sibling = self.arena.left(parent);
                }
                if self.arena.is_black(self.arena.left(sibling))
                    && self.arena.is_black(self.arena.right(sibling))
                {
                    self.arena.set_color(sibling, Color::Red);
                    x = parent;
                    parent = self.arena.parent(x);
                } else {
                    if self.arena.is_black(self.arena.left(sibling)) {
                        self.arena.set_color(self.arena.right(sibling), Color::Black);
                        self.arena.set_color(sibling, Color::Red);
                        self.rotate_left(sibling);
                        sibling = self.arena.left(parent);
                    }
                    self.arena.set_color(sibling, self.arena.color(parent));
                    self.arena.set_color(parent, Color::Black);
                    self.arena.set_color(self.arena.left(sibling), Color::Black);
                    self.rotate_right(parent);
                    x = self.root;
                }
            }
        }
        self.arena.set_color(x, Color::Black);
    }

    /// Promotes x's right child into x's position. Colors are untouched;
    /// recoloring is the caller's job.
    fn rotate_left(&mut self, x: NodeId) {
        let y = self.arena.right(x);
        debug_assert!(!y.is_nil());
        let inner = self.arena.left(y);
        self.arena.set_right(x, inner);
        if !inner.is_nil() {
            self.arena.set_parent(inner, x);
        }
        let parent = self.arena.parent(x);
        self.arena.set_parent(y, parent);
        if parent.is_nil() {
            self.root = y;
        } else if self.arena.left(parent) == x {
            self.arena.set_left(parent, y);
        } else {
            self.arena.set_right(parent, y);
        }
        self.arena.set_left(y, x);
        self.arena.set_parent(x, y);
    }

    /// Mirror of [`rotate_left`](Self::rotate_left).
    fn rotate_right(&mut self, x: NodeId) {
        let y = self.arena.left(x);
        debug_assert!(!y.is_nil());
        let inner = self.arena.right(y);
        self.arena.set_left(x, inner);
        if !inner.is_nil() {
            self.arena.set_parent(inner, x);
        }
        let parent = self.arena.parent(x);
        self.arena.set_parent(y, parent);
        if parent.is_nil() {
            self.root = y;
        } else if self.arena.left(parent) == x {
            self.arena.set_left(parent, y);
        } else {
            self.arena.set_right(parent, y);
        }
        self.arena.set_right(y, x);
        self.arena.set_parent(x, y);
    }

    /// Points `parent`'s child link (or the root) from `old` to `new`.
    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        if parent.is_nil() {
            self.root = new;
        } else if self.arena.left(parent) == old {
            self.arena.set_left(parent, new);
        } else {
            self.arena.set_right(parent, new);
        }
        if !new.is_nil() {
            self.arena.set_parent(new, parent);
        }
    }

    fn leftmost(&self, mut node: NodeId) -> NodeId {
        while !self.arena.left(node).is_nil() {
            node = self.arena.left(node);
        }
        node
    }

    fn rightmost(&self, mut node: NodeId) -> NodeId {
        while !self.arena.right(node).is_nil() {
            node = self.arena.right(node);
        }
        node
    }
}

impl<K> Drop for RbTree<K> {
    fn drop(&mut self) {
        let root = self.root;
        self.drop_subtree(root);
    }
}

impl<K> RbTree<K> {
    fn drop_subtree(&mut self, node: NodeId) {
        if node.is_nil() {
            return;
        }
        let left = self.arena.left(node);
        let right = self.arena.right(node);
        self.drop_subtree(left);
        self.drop_subtree(right);
        self.arena.drop_key(node);
    }
}

#[cfg(test)]
impl<K: Clone> RbTree<K> {
    /// Collects the keys in order, for testing purposes.
    fn in_order(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.length);
        self.collect_in_order(self.root, &mut keys);
        keys
    }

    fn collect_in_order(&self, node: NodeId, out: &mut Vec<K>) {
        if node.is_nil() {
            return;
        }
        self.collect_in_order(self.arena.left(node), out);
        out.push(self.arena.key(node).clone());
        self.collect_in_order(self.arena.right(node), out);
    }
}

#[cfg(test)]
impl<K> RbTree<K> {
    /// Number of nodes on the longest root-to-leaf path.
    fn height(&self) -> usize {
        self.node_height(self.root)
    }

    fn node_height(&self, node: NodeId) -> usize {
        if node.is_nil() {
            return 0;
        }
        let left = self.node_height(self.arena.left(node));
        let right = self.node_height(self.arena.right(node));
        1 + left.max(right)
    }
}
