//! Unregistered node records.
//!
//! A [`NodeData`] is a node that exists outside any graph: it has a kind,
//! schema-driven edge storage, and no id. Edges may be pre-wired with the
//! builder methods; targets are validated against liveness when the record
//! is registered with [`Graph::add`](crate::graph::Graph::add), which
//! consumes the record.

use smallvec::SmallVec;

use crate::kind::{EdgeArity, EdgeRole, EdgeSchema};
use crate::refs::{KindRef, NodeRef};

/// Payload of one edge slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EdgeValue {
    /// A single-valued slot; empty when `None`.
    Single(Option<NodeRef>),
    /// A list-valued slot; entries may individually be empty.
    List(SmallVec<[Option<NodeRef>; 2]>),
}

impl EdgeValue {
    /// The slot's entries as a uniform slice.
    pub fn entries(&self) -> &[Option<NodeRef>] {
        match self {
            EdgeValue::Single(target) => std::slice::from_ref(target),
            EdgeValue::List(items) => items,
        }
    }
}

/// A node that has not yet been registered in a graph.
#[derive(Clone, Debug)]
pub struct NodeData {
    kind: KindRef,
    schema: EdgeSchema,
    edges: SmallVec<[EdgeValue; 2]>,
}

impl NodeData {
    /// Create an unregistered node of `kind` with all slots empty.
    pub fn new(kind: KindRef) -> Self {
        let schema = kind.schema();
        let edges = schema
            .slots()
            .iter()
            .map(|slot| match slot.arity {
                EdgeArity::Single => EdgeValue::Single(None),
                EdgeArity::List => EdgeValue::List(SmallVec::new()),
            })
            .collect();
        NodeData {
            kind,
            schema,
            edges,
        }
    }

    pub fn kind(&self) -> KindRef {
        self.kind
    }

    /// Edge schema of this node's kind.
    pub fn schema(&self) -> &EdgeSchema {
        &self.schema
    }

    /// Current payload of every slot, in schema order.
    pub fn edges(&self) -> &[EdgeValue] {
        &self.edges
    }

    /// Pre-wire the single-valued input slot at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not a single-valued `Input` slot of this kind.
    pub fn with_input(mut self, slot: usize, target: NodeRef) -> Self {
        self.expect_slot(slot, EdgeRole::Input, EdgeArity::Single);
        self.edges[slot] = EdgeValue::Single(Some(target));
        self
    }

    /// Pre-wire the single-valued successor slot at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not a single-valued `Successor` slot of this
    /// kind.
    pub fn with_successor(mut self, slot: usize, target: NodeRef) -> Self {
        self.expect_slot(slot, EdgeRole::Successor, EdgeArity::Single);
        self.edges[slot] = EdgeValue::Single(Some(target));
        self
    }

    /// Append `target` to the list-valued input slot at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not a list-valued `Input` slot of this kind.
    pub fn push_input(mut self, slot: usize, target: NodeRef) -> Self {
        self.expect_slot(slot, EdgeRole::Input, EdgeArity::List);
        self.push_entry(slot, target);
        self
    }

    /// Append `target` to the list-valued successor slot at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not a list-valued `Successor` slot of this kind.
    pub fn push_successor(mut self, slot: usize, target: NodeRef) -> Self {
        self.expect_slot(slot, EdgeRole::Successor, EdgeArity::List);
        self.push_entry(slot, target);
        self
    }

    fn push_entry(&mut self, slot: usize, target: NodeRef) {
        match &mut self.edges[slot] {
            EdgeValue::List(items) => items.push(Some(target)),
            EdgeValue::Single(_) => unreachable!("expect_slot checked the arity"),
        }
    }

    fn expect_slot(&self, slot: usize, role: EdgeRole, arity: EdgeArity) {
        let slots = self.schema.slots();
        assert!(
            slot < slots.len(),
            "kind `{}` has no edge slot {}",
            self.kind.name(),
            slot,
        );
        let decl = slots[slot];
        assert!(
            decl.role == role && decl.arity == arity,
            "edge slot {} (`{}`) of kind `{}` is a {:?} {} slot, not a {:?} {} slot",
            slot,
            decl.name,
            self.kind.name(),
            decl.arity,
            decl.role,
            arity,
            role,
        );
    }

    pub(crate) fn edge(&self, slot: usize) -> &EdgeValue {
        &self.edges[slot]
    }

    pub(crate) fn edge_mut(&mut self, slot: usize) -> &mut EdgeValue {
        &mut self.edges[slot]
    }

    /// Every non-empty edge occurrence as `(slot, index, role, target)`.
    ///
    /// Snapshots into an owned vector so callers can mutate while walking.
    pub(crate) fn occurrences(&self) -> SmallVec<[(usize, u32, EdgeRole, NodeRef); 4]> {
        let mut out = SmallVec::new();
        for (slot, value) in self.edges.iter().enumerate() {
            let role = self.schema.slot(slot).role;
            for (index, entry) in value.entries().iter().enumerate() {
                if let Some(target) = entry {
                    out.push((slot, index as u32, role, *target));
                }
            }
        }
        out
    }

    /// Non-empty targets of all slots with `role`, in slot order.
    pub(crate) fn role_targets(&self, role: EdgeRole) -> impl Iterator<Item = NodeRef> + '_ {
        let schema = self.schema.clone();
        self.edges
            .iter()
            .enumerate()
            .filter(move |(slot, _)| schema.slot(*slot).role == role)
            .flat_map(|(_, value)| value.entries().iter().copied())
            .flatten()
    }

    /// Empty every slot: single slots become unset, lists become empty.
    pub(crate) fn clear_edges(&mut self) {
        for value in &mut self.edges {
            match value {
                EdgeValue::Single(target) => *target = None,
                EdgeValue::List(items) => items.clear(),
            }
        }
    }
}
