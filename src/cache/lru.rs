//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

/// Stable reference to a key's slot in an [`LruTracker`].
pub type LruHandle = usize;

const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node {
    /// None while the slot sits on the free list
    key: Option<String>,
    prev: usize,
    next: usize,
}

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Keys live in a slab of nodes linked into a doubly linked list where:
/// - Head = Most recently used
/// - Tail = Least recently used
///
/// A node's slab index is its handle, so touch and remove are O(1). Freed
/// slots are recycled by later pushes.
#[derive(Debug)]
pub struct LruTracker {
    nodes: Vec<Node>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    len: usize,
}

impl Default for LruTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    // == Push Front ==
    /// Adds a key as the most recently used and returns its handle.
    pub fn push_front(&mut self, key: String) -> LruHandle {
        let node = Node {
            key: Some(key),
            prev: NIL,
            next: NIL,
        };
        let handle = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.link_front(handle);
        self.len += 1;
        handle
    }

    // == Touch ==
    /// Marks a key as recently used (moves to front).
    pub fn touch(&mut self, handle: LruHandle) {
        if !self.is_live(handle) || self.head == handle {
            return;
        }
        self.unlink(handle);
        self.link_front(handle);
    }

    // == Remove ==
    /// Removes a key from the tracker, returning it.
    ///
    /// Returns None for a handle that is not currently live.
    pub fn remove(&mut self, handle: LruHandle) -> Option<String> {
        if !self.is_live(handle) {
            return None;
        }
        self.unlink(handle);
        self.len -= 1;
        self.free.push(handle);
        self.nodes[handle].key.take()
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        if self.tail == NIL {
            return None;
        }
        self.remove(self.tail)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    #[cfg(test)]
    pub fn peek_oldest(&self) -> Option<&str> {
        if self.tail == NIL {
            return None;
        }
        self.nodes[self.tail].key.as_deref()
    }

    // == Clear ==
    /// Forgets every key and releases the slab.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
        self.len = 0;
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Order ==
    /// Keys from most to least recently used.
    pub fn order(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.len);
        let mut cur = self.head;
        while cur != NIL {
            let node = &self.nodes[cur];
            if let Some(key) = node.key.as_deref() {
                out.push(key);
            }
            cur = node.next;
        }
        out
    }

    fn is_live(&self, handle: LruHandle) -> bool {
        self.nodes
            .get(handle)
            .is_some_and(|node| node.key.is_some())
    }

    fn link_front(&mut self, handle: LruHandle) {
        self.nodes[handle].prev = NIL;
        self.nodes[handle].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = handle;
        }
        self.head = handle;
        if self.tail == NIL {
            self.tail = handle;
        }
    }

    fn unlink(&mut self, handle: LruHandle) {
        let (prev, next) = {
            let node = &self.nodes[handle];
            (node.prev, node.next)
        };
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
        self.nodes[handle].prev = NIL;
        self.nodes[handle].next = NIL;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with(keys: &[&str]) -> (LruTracker, Vec<LruHandle>) {
        let mut lru = LruTracker::new();
        let handles = keys.iter().map(|k| lru.push_front(k.to_string())).collect();
        (lru, handles)
    }

    #[test]
    fn test_lru_new() {
        let lru = LruTracker::new();
        assert!(lru.is_empty());
        assert_eq!(lru.len(), 0);
        assert_eq!(lru.peek_oldest(), None);
    }

    #[test]
    fn test_lru_push_new_keys() {
        let (lru, _) = tracker_with(&["key1", "key2", "key3"]);

        assert_eq!(lru.len(), 3);
        // key1 is oldest (added first)
        assert_eq!(lru.peek_oldest(), Some("key1"));
        assert_eq!(lru.order(), vec!["key3", "key2", "key1"]);
    }

    #[test]
    fn test_lru_touch_existing_key() {
        let (mut lru, handles) = tracker_with(&["key1", "key2", "key3"]);

        // Touch key1 again - should move to front
        lru.touch(handles[0]);

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some("key2"));
        assert_eq!(lru.order(), vec!["key1", "key3", "key2"]);
    }

    #[test]
    fn test_lru_touch_head_is_noop() {
        let (mut lru, handles) = tracker_with(&["a", "b"]);

        lru.touch(handles[1]);
        assert_eq!(lru.order(), vec!["b", "a"]);
    }

    #[test]
    fn test_lru_evict_oldest() {
        let (mut lru, _) = tracker_with(&["key1", "key2", "key3"]);

        assert_eq!(lru.evict_oldest(), Some("key1".to_string()));
        assert_eq!(lru.len(), 2);

        assert_eq!(lru.evict_oldest(), Some("key2".to_string()));
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_lru_evict_empty() {
        let mut lru = LruTracker::new();
        assert_eq!(lru.evict_oldest(), None);
    }

    #[test]
    fn test_lru_remove_middle() {
        let (mut lru, handles) = tracker_with(&["key1", "key2", "key3"]);

        assert_eq!(lru.remove(handles[1]), Some("key2".to_string()));

        assert_eq!(lru.len(), 2);
        assert_eq!(lru.order(), vec!["key3", "key1"]);
    }

    #[test]
    fn test_lru_remove_stale_handle() {
        let (mut lru, handles) = tracker_with(&["key1", "key2"]);

        assert!(lru.remove(handles[0]).is_some());
        // Second removal through the same handle must not disturb the list
        assert_eq!(lru.remove(handles[0]), None);
        assert_eq!(lru.remove(999), None);
        assert_eq!(lru.order(), vec!["key2"]);
    }

    #[test]
    fn test_lru_reuses_freed_slots() {
        let (mut lru, handles) = tracker_with(&["a", "b"]);

        lru.remove(handles[0]);
        let reused = lru.push_front("c".to_string());

        assert_eq!(reused, handles[0]);
        assert_eq!(lru.order(), vec!["c", "b"]);
        assert_eq!(lru.peek_oldest(), Some("b"));
    }

    #[test]
    fn test_lru_order_after_multiple_touches() {
        let (mut lru, h) = tracker_with(&["a", "b", "c"]);

        // [c, b, a] -> touch a -> [a, c, b] -> touch c -> [c, a, b] -> touch b -> [b, c, a]
        lru.touch(h[0]);
        lru.touch(h[2]);
        lru.touch(h[1]);

        assert_eq!(lru.evict_oldest(), Some("a".to_string()));
        assert_eq!(lru.evict_oldest(), Some("c".to_string()));
        assert_eq!(lru.evict_oldest(), Some("b".to_string()));
        assert!(lru.is_empty());
    }

    #[test]
    fn test_lru_clear() {
        let (mut lru, _) = tracker_with(&["a", "b", "c"]);

        lru.clear();

        assert!(lru.is_empty());
        assert_eq!(lru.evict_oldest(), None);
        assert_eq!(lru.push_front("d".to_string()), 0);
    }
}
