use std::mem::MaybeUninit;

/// Color of a tree node. The sentinel is always black.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Color {
    /// Red nodes may not have red children.
    Red,
    /// Every root-to-leaf path crosses the same number of black nodes.
    Black,
}

/// Opaque handle to a node stored in the tree.
///
/// A handle stays valid until the node it names is deleted. Comparing
/// handles for equality compares node identity, not keys.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NodeId(u32);

/// The shared leaf sentinel: slot 0 of every arena. Black, never keyed.
pub(super) const NIL: NodeId = NodeId(0);

impl NodeId {
    pub(super) fn is_nil(self) -> bool {
        self == NIL
    }
}

// We use MaybeUninit to avoid requiring K: Default and so the sentinel
// slot can exist without a key. `live` marks slots whose key is
// initialized; it turns a read through a stale handle into a panic
// instead of undefined behavior.
pub(super) struct Node<K> {
    pub(super) key: MaybeUninit<K>,
    pub(super) live: bool,
    pub(super) color: Color,
    pub(super) parent: NodeId,
    pub(super) left: NodeId,
    pub(super) right: NodeId,
}

/// Owns all node storage. Down-links (reachability from the tree root)
/// define which slots hold live keys; `parent` indices are non-owning
/// back-references used only during fix-up.
pub(super) struct Arena<K> {
    slots: Vec<Node<K>>,
    free: Vec<NodeId>,
}

impl<K> Arena<K> {
    pub(super) fn new() -> Self {
        // Slot 0 is the sentinel. Its key is never written and its links
        // never change; reading its color or children is always valid.
        Arena {
            slots: vec![Node {
                key: MaybeUninit::uninit(),
                live: false,
                color: Color::Black,
                parent: NIL,
                left: NIL,
                right: NIL,
            }],
            free: Vec::new(),
        }
    }

    /// Allocates a red node with sentinel children, reusing a freed slot
    /// when one is available.
    pub(super) fn alloc(&mut self, key: K) -> NodeId {
        let node = Node {
            key: MaybeUninit::new(key),
            live: true,
            color: Color::Red,
            parent: NIL,
            left: NIL,
            right: NIL,
        };
        match self.free.pop() {
            Some(id) => {
                self.slots[id.0 as usize] = node;
                id
            }
            None => {
                let id = NodeId(self.slots.len() as u32);
                self.slots.push(node);
                id
            }
        }
    }

    /// Moves the key out of an unlinked node and recycles its slot.
    pub(super) fn free(&mut self, id: NodeId) -> K {
        let slot = &mut self.slots[id.0 as usize];
        debug_assert!(slot.live);
        slot.live = false;
        let key = unsafe { slot.key.assume_init_read() };
        self.free.push(id);
        key
    }

    /// Drops the key of a live node in place. Used only during tree drop,
    /// where the slot is abandoned rather than recycled.
    pub(super) fn drop_key(&mut self, id: NodeId) {
        let slot = &mut self.slots[id.0 as usize];
        debug_assert!(slot.live);
        slot.live = false;
        unsafe { slot.key.assume_init_drop() };
    }

    pub(super) fn key(&self, id: NodeId) -> &K {
        let slot = &self.slots[id.0 as usize];
        assert!(slot.live, "stale or sentinel node handle");
        unsafe { &*slot.key.as_ptr() }
    }

    pub(super) fn color(&self, id: NodeId) -> Color {
        self.slots[id.0 as usize].color
    }

    pub(super) fn is_red(&self, id: NodeId) -> bool {
        self.color(id) == Color::Red
    }

    pub(super) fn is_black(&self, id: NodeId) -> bool {
        self.color(id) == Color::Black
    }

    pub(super) fn parent(&self, id: NodeId) -> NodeId {
        self.slots[id.0 as usize].parent
    }

    pub(super) fn left(&self, id: NodeId) -> NodeId {
        self.slots[id.0 as usize].left
    }

    pub(super) fn right(&self, id: NodeId) -> NodeId {
        self.slots[id.0 as usize].right
    }

    /// No-op on the sentinel so fix-up epilogues can recolor
    /// unconditionally; the sentinel stays black.
    pub(super) fn set_color(&mut self, id: NodeId, color: Color) {
        if id.is_nil() {
            return;
        }
        self.slots[id.0 as usize].color = color;
    }

    pub(super) fn set_parent(&mut self, id: NodeId, parent: NodeId) {
        debug_assert!(!id.is_nil());
        self.slots[id.0 as usize].parent = parent;
    }

    pub(super) fn set_left(&mut self, id: NodeId, left: NodeId) {
        debug_assert!(!id.is_nil());
        self.slots[id.0 as usize].left = left;
    }

    pub(super) fn set_right(&mut self, id: NodeId, right: NodeId) {
        debug_assert!(!id.is_nil());
        self.slots[id.0 as usize].right = right;
    }

    /// Slots allocated over the arena's lifetime, sentinel excluded.
    #[cfg(test)]
    pub(super) fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    #[cfg(test)]
    pub(super) fn free_count(&self) -> usize {
        self.free.len()
    }
}
