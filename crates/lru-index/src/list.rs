//! Arena-backed doubly-linked list ordered from most- to least-recently used

/// Null link.
const NIL: usize = usize::MAX;

/// Handle to a node inside an [`EvictionList`].
///
/// A handle stays valid until the node it names is removed. After that the
/// slot may be recycled, so callers must drop handles they have removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(usize);

#[derive(Debug)]
struct Node<T> {
    value: Option<T>,
    prev: usize,
    next: usize,
}

/// Ordered sequence with O(1) push-front, move-to-front and removal of any node
#[derive(Debug)]
pub struct EvictionList<T> {
    nodes: Vec<Node<T>>,
    /// Vacant slots available for reuse
    free: Vec<usize>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<T> EvictionList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty list with room for `capacity` nodes before reallocating
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Most-recently-used node
    pub fn front(&self) -> Option<NodeRef> {
        (self.head != NIL).then_some(NodeRef(self.head))
    }

    /// Least-recently-used node, `None` when the list is empty
    pub fn back(&self) -> Option<NodeRef> {
        (self.tail != NIL).then_some(NodeRef(self.tail))
    }

    /// Borrow the value behind a live handle
    pub fn get(&self, node: NodeRef) -> Option<&T> {
        self.nodes.get(node.0).and_then(|n| n.value.as_ref())
    }

    /// Insert `value` at the front and return its handle
    pub fn push_front(&mut self, value: T) -> NodeRef {
        let node = Node {
            value: Some(value),
            prev: NIL,
            next: NIL,
        };

        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        self.link_front(idx);
        self.len += 1;
        NodeRef(idx)
    }

    /// Promote a node to the front. Stale handles are ignored.
    pub fn move_to_front(&mut self, node: NodeRef) {
        if !self.is_live(node) || self.head == node.0 {
            return;
        }
        self.unlink(node.0);
        self.link_front(node.0);
    }

    /// Unlink a node and hand back its value
    pub fn remove(&mut self, node: NodeRef) -> Option<T> {
        if !self.is_live(node) {
            return None;
        }
        self.unlink(node.0);
        let value = self.nodes[node.0].value.take();
        self.free.push(node.0);
        self.len -= 1;
        value
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
        self.len = 0;
    }

    /// Iterate from front (most recent) to back (least recent)
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn is_live(&self, node: NodeRef) -> bool {
        self.nodes
            .get(node.0)
            .map(|n| n.value.is_some())
            .unwrap_or(false)
    }

    fn link_front(&mut self, idx: usize) {
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);

        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }

        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }

        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = NIL;
    }
}

impl<T> Default for EvictionList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Front-to-back iterator over an [`EvictionList`]
pub struct Iter<'a, T> {
    list: &'a EvictionList<T>,
    cursor: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let node = &self.list.nodes[self.cursor];
        self.cursor = node.next;
        node.value.as_ref()
    }
}
