//! Dense scratch tables keyed by node id.
//!
//! Passes attach per-node state to a graph without touching the nodes
//! themselves. A [`NodeMap`] is a flat vector indexed by node id with a
//! fixed capacity: the number of ids the graph had issued when the map
//! was created. Accessing a node minted after that point is a bug in the
//! pass and fails loudly; the `*_and_grow` variants opt into resizing
//! instead. Liveness is not consulted, so state outlives node deletion.

use cranelift_entity::EntityRef;

use crate::graph::Graph;
use crate::refs::NodeRef;

/// Per-node side storage with a fixed id range.
///
/// Every slot starts out unset. `set` and `take` move values in and out;
/// the map never observes the graph after creation.
pub struct NodeMap<T> {
    values: Vec<Option<T>>,
}

impl<T> NodeMap<T> {
    /// Create a map covering every id `graph` has issued so far.
    pub fn new(graph: &Graph) -> Self {
        Self {
            values: (0..graph.id_count()).map(|_| None).collect(),
        }
    }

    /// Number of ids this map covers.
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// Whether `node` falls inside this map's id range.
    pub fn is_in_range(&self, node: NodeRef) -> bool {
        node.index() < self.values.len()
    }

    fn check_range(&self, node: NodeRef) {
        assert!(
            self.is_in_range(node),
            "`{}` is out of range for this map (capacity {})",
            node,
            self.values.len(),
        );
    }

    /// Value stored for `node`, if any.
    ///
    /// # Panics
    ///
    /// Panics if `node` was minted after this map was created.
    pub fn get(&self, node: NodeRef) -> Option<&T> {
        self.check_range(node);
        self.values[node.index()].as_ref()
    }

    /// Mutable access to the value stored for `node`, if any.
    ///
    /// # Panics
    ///
    /// Panics if `node` is out of range.
    pub fn get_mut(&mut self, node: NodeRef) -> Option<&mut T> {
        self.check_range(node);
        self.values[node.index()].as_mut()
    }

    /// Store `value` for `node`, returning the previous value.
    ///
    /// # Panics
    ///
    /// Panics if `node` is out of range.
    pub fn set(&mut self, node: NodeRef, value: T) -> Option<T> {
        self.check_range(node);
        self.values[node.index()].replace(value)
    }

    /// Remove and return the value stored for `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` is out of range.
    pub fn take(&mut self, node: NodeRef) -> Option<T> {
        self.check_range(node);
        self.values[node.index()].take()
    }

    fn grow_to(&mut self, node: NodeRef) {
        if node.index() >= self.values.len() {
            self.values.resize_with(node.index() + 1, || None);
        }
    }

    /// Like [`get`](Self::get), but widens the id range to admit `node`.
    pub fn get_and_grow(&mut self, node: NodeRef) -> Option<&T> {
        self.grow_to(node);
        self.values[node.index()].as_ref()
    }

    /// Like [`set`](Self::set), but widens the id range to admit `node`.
    pub fn set_and_grow(&mut self, node: NodeRef, value: T) -> Option<T> {
        self.grow_to(node);
        self.values[node.index()].replace(value)
    }

    /// The set entries, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeRef, &T)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (NodeRef::new(index), value)))
    }
}

/// Per-node flag storage with a fixed id range.
///
/// The workhorse for visited sets and worklist membership. Same range
/// discipline as [`NodeMap`]: out-of-range ids fail loudly unless the
/// growing variant is used.
pub struct NodeBitMap {
    bits: Vec<u64>,
    capacity: usize,
}

impl NodeBitMap {
    const WORD_BITS: usize = u64::BITS as usize;

    /// Create a bitmap covering every id `graph` has issued so far.
    pub fn new(graph: &Graph) -> Self {
        let capacity = graph.id_count();
        Self {
            bits: vec![0; capacity.div_ceil(Self::WORD_BITS)],
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_in_range(&self, node: NodeRef) -> bool {
        node.index() < self.capacity
    }

    fn check_range(&self, node: NodeRef) {
        assert!(
            self.is_in_range(node),
            "`{}` is out of range for this bitmap (capacity {})",
            node,
            self.capacity,
        );
    }

    /// Whether `node` is marked.
    ///
    /// # Panics
    ///
    /// Panics if `node` is out of range.
    pub fn is_marked(&self, node: NodeRef) -> bool {
        self.check_range(node);
        self.bits[node.index() / Self::WORD_BITS] & Self::bit(node) != 0
    }

    /// Mark `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` is out of range.
    pub fn mark(&mut self, node: NodeRef) {
        self.check_range(node);
        self.bits[node.index() / Self::WORD_BITS] |= Self::bit(node);
    }

    /// Clear `node`'s mark.
    ///
    /// # Panics
    ///
    /// Panics if `node` is out of range.
    pub fn clear(&mut self, node: NodeRef) {
        self.check_range(node);
        self.bits[node.index() / Self::WORD_BITS] &= !Self::bit(node);
    }

    /// Like [`mark`](Self::mark), but widens the id range to admit `node`.
    pub fn mark_and_grow(&mut self, node: NodeRef) {
        if node.index() >= self.capacity {
            self.capacity = node.index() + 1;
            self.bits
                .resize(self.capacity.div_ceil(Self::WORD_BITS), 0);
        }
        self.bits[node.index() / Self::WORD_BITS] |= Self::bit(node);
    }

    /// Clear every mark, keeping the id range.
    pub fn clear_all(&mut self) {
        self.bits.fill(0);
    }

    /// The marked ids, in id order.
    pub fn marked(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.bits.iter().enumerate().flat_map(|(word_index, &word)| {
            let base = word_index * Self::WORD_BITS;
            (0..Self::WORD_BITS)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| NodeRef::new(base + bit))
        })
    }

    fn bit(node: NodeRef) -> u64 {
        1u64 << (node.index() % Self::WORD_BITS)
    }
}
