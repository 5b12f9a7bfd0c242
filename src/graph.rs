//! Graph: arena-based node storage with identity and lifecycle.
//!
//! All nodes live in a `PrimaryMap` arena owned by `Graph`; a deleted node
//! leaves a permanent tombstone, so ids are never reused and every dense
//! index keyed by id (usage tables, side-tables, per-kind rows) stays
//! valid for the graph's whole life. Inverse indices (usage lists,
//! predecessors) are maintained by every mutation, never recomputed.

use cranelift_entity::{EntityRef, PrimaryMap, SecondaryMap};
use smallvec::SmallVec;
use tracing::trace;

use crate::errors::GraphError;
use crate::event::{NodeEvent, NodeEventListener};
use crate::kind::{EdgeArity, EdgeRole, EdgeSlot};
use crate::node::{EdgeValue, NodeData};
use crate::refs::{KindRef, NodeRef};
use crate::usage::Use;

/// Snapshot of a graph's id watermark.
///
/// Nodes registered after the mark was taken compare as new.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mark(pub(crate) u32);

/// An IR graph: identity allocation, typed edges, and the inverse indices
/// every mutation keeps in lockstep.
pub struct Graph {
    name: Option<String>,
    pub(crate) nodes: PrimaryMap<NodeRef, Option<NodeData>>,
    /// For each node, the input-edge occurrences pointing at it.
    pub(crate) uses: SecondaryMap<NodeRef, SmallVec<[Use; 2]>>,
    /// For each node, the unique node holding a successor edge to it.
    pub(crate) preds: SecondaryMap<NodeRef, Option<NodeRef>>,
    /// Per-kind insertion-ordered rows; dead entries are skipped by
    /// iterators, never purged.
    pub(crate) by_kind: SecondaryMap<KindRef, Vec<NodeRef>>,
    live: usize,
    deleted: usize,
    listeners: Vec<Box<dyn NodeEventListener>>,
}

impl Graph {
    /// Create an empty, unnamed graph.
    pub fn new() -> Self {
        Graph {
            name: None,
            nodes: PrimaryMap::new(),
            uses: SecondaryMap::new(),
            preds: SecondaryMap::new(),
            by_kind: SecondaryMap::new(),
            live: 0,
            deleted: 0,
            listeners: Vec::new(),
        }
    }

    /// Create an empty graph with a diagnostic name.
    pub fn with_name(name: impl Into<String>) -> Self {
        let mut graph = Graph::new();
        graph.name = Some(name.into());
        graph
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    // ========================================================================
    // Counts and marks
    // ========================================================================

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.live
    }

    /// Number of ids issued over the graph's lifetime.
    pub fn id_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes deleted over the graph's lifetime.
    pub fn deleted_node_count(&self) -> usize {
        self.deleted
    }

    /// Snapshot the id watermark.
    pub fn mark(&self) -> Mark {
        Mark(self.nodes.len() as u32)
    }

    /// Whether `node` was registered after `mark` was taken.
    pub fn is_new(&self, mark: Mark, node: NodeRef) -> bool {
        node.index() >= mark.0 as usize
    }

    // ========================================================================
    // Liveness and data access
    // ========================================================================

    /// Whether `node` is alive in this graph.
    pub fn is_alive(&self, node: NodeRef) -> bool {
        self.nodes.get(node).is_some_and(|slot| slot.is_some())
    }

    /// Data of a live node.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not alive in this graph.
    pub fn data(&self, node: NodeRef) -> &NodeData {
        match self.nodes.get(node) {
            Some(Some(data)) => data,
            _ => panic!("{node} is not alive in this graph"),
        }
    }

    /// Data of `node` if it is alive.
    pub fn try_data(&self, node: NodeRef) -> Option<&NodeData> {
        self.nodes.get(node).and_then(|slot| slot.as_ref())
    }

    /// Kind of a live node.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not alive in this graph.
    pub fn kind_of(&self, node: NodeRef) -> KindRef {
        self.data(node).kind()
    }

    /// Mutable access to a live node's record. Callers must keep the
    /// inverse indices in sync; the public API never hands this out.
    pub(crate) fn record_mut(&mut self, node: NodeRef) -> &mut NodeData {
        match self.nodes[node].as_mut() {
            Some(data) => data,
            None => panic!("{node} is not alive in this graph"),
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register `data`, assigning the next id.
    ///
    /// Every pre-wired edge target must be alive in this graph, and every
    /// pre-wired successor target must not already have a predecessor. On
    /// a violation nothing is registered and the record is dropped.
    ///
    /// # Panics
    ///
    /// Panics if the record declares two successor edges to the same
    /// target; a node has at most one predecessor.
    pub fn add(&mut self, data: NodeData) -> Result<NodeRef, GraphError> {
        let occurrences = data.occurrences();

        // Validate before allocating the id so a failed add leaves no trace.
        let mut claimed: SmallVec<[NodeRef; 2]> = SmallVec::new();
        for &(slot, _, role, target) in &occurrences {
            let decl = data.schema().slot(slot);
            if !self.is_alive(target) {
                return Err(GraphError::TargetNotAlive {
                    role,
                    slot: decl.name,
                    target,
                });
            }
            if role == EdgeRole::Successor {
                if let Some(existing) = self.preds[target] {
                    return Err(GraphError::PredecessorConflict {
                        slot: decl.name,
                        target,
                        existing,
                    });
                }
                assert!(
                    !claimed.contains(&target),
                    "record of kind `{}` declares two successor edges to {}",
                    data.kind().name(),
                    target,
                );
                claimed.push(target);
            }
        }

        let kind = data.kind();
        let node = self.nodes.push(Some(data));

        for (slot, index, role, target) in occurrences {
            match role {
                EdgeRole::Input => self.uses[target].push(Use {
                    user: node,
                    slot: slot as u32,
                    index,
                }),
                EdgeRole::Successor => self.preds[target] = Some(node),
            }
        }

        for collection in kind.collection_kinds() {
            self.by_kind[collection].push(node);
        }

        self.live += 1;
        trace!(%node, kind = kind.name(), "registered node");
        self.notify(NodeEvent::NodeAdded, node);
        Ok(node)
    }

    // ========================================================================
    // Edge wiring
    // ========================================================================

    /// Set the single-valued edge slot `slot` of `node`; `None` clears it.
    ///
    /// Input writes update the targets' usage lists, successor writes
    /// update predecessors. Writing the value a slot already holds is a
    /// no-op.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not a single-valued slot of `node`'s kind.
    pub fn set_edge(
        &mut self,
        node: NodeRef,
        slot: usize,
        target: Option<NodeRef>,
    ) -> Result<(), GraphError> {
        let decl = self.edge_write_checks(node, slot, target)?;
        assert!(
            decl.arity == EdgeArity::Single,
            "edge slot {} (`{}`) of {} is list-valued; use set_list_edge",
            slot,
            decl.name,
            node,
        );

        let old = match self.data(node).edge(slot) {
            EdgeValue::Single(target) => *target,
            EdgeValue::List(_) => unreachable!("arity checked above"),
        };
        if old == target {
            return Ok(());
        }
        self.claim_check(decl, target)?;

        match self.record_mut(node).edge_mut(slot) {
            EdgeValue::Single(entry) => *entry = target,
            EdgeValue::List(_) => unreachable!("arity checked above"),
        }
        self.edge_bookkeeping(node, slot as u32, 0, decl.role, old, target);
        Ok(())
    }

    /// Set entry `index` of the list-valued edge slot `slot` of `node`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not a list-valued slot of `node`'s kind, or if
    /// `index` is past the end of the list.
    pub fn set_list_edge(
        &mut self,
        node: NodeRef,
        slot: usize,
        index: usize,
        target: Option<NodeRef>,
    ) -> Result<(), GraphError> {
        let decl = self.edge_write_checks(node, slot, target)?;
        assert!(
            decl.arity == EdgeArity::List,
            "edge slot {} (`{}`) of {} is single-valued; use set_edge",
            slot,
            decl.name,
            node,
        );

        let old = match self.data(node).edge(slot) {
            EdgeValue::List(items) => {
                assert!(
                    index < items.len(),
                    "index {} is out of range for edge slot {} (`{}`) of {} with {} entries",
                    index,
                    slot,
                    decl.name,
                    node,
                    items.len(),
                );
                items[index]
            }
            EdgeValue::Single(_) => unreachable!("arity checked above"),
        };
        if old == target {
            return Ok(());
        }
        self.claim_check(decl, target)?;

        match self.record_mut(node).edge_mut(slot) {
            EdgeValue::List(items) => items[index] = target,
            EdgeValue::Single(_) => unreachable!("arity checked above"),
        }
        self.edge_bookkeeping(node, slot as u32, index as u32, decl.role, old, target);
        Ok(())
    }

    /// Append an entry to the list-valued edge slot `slot` of `node`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not a list-valued slot of `node`'s kind.
    pub fn push_list_edge(
        &mut self,
        node: NodeRef,
        slot: usize,
        target: Option<NodeRef>,
    ) -> Result<(), GraphError> {
        let decl = self.edge_write_checks(node, slot, target)?;
        assert!(
            decl.arity == EdgeArity::List,
            "edge slot {} (`{}`) of {} is single-valued; use set_edge",
            slot,
            decl.name,
            node,
        );
        self.claim_check(decl, target)?;

        let index = match self.record_mut(node).edge_mut(slot) {
            EdgeValue::List(items) => {
                items.push(target);
                (items.len() - 1) as u32
            }
            EdgeValue::Single(_) => unreachable!("arity checked above"),
        };
        self.edge_bookkeeping(node, slot as u32, index, decl.role, None, target);
        Ok(())
    }

    /// Shared wiring preconditions: the node is alive, the slot exists,
    /// and a non-empty target is alive.
    fn edge_write_checks(
        &self,
        node: NodeRef,
        slot: usize,
        target: Option<NodeRef>,
    ) -> Result<EdgeSlot, GraphError> {
        if !self.is_alive(node) {
            return Err(GraphError::NotAlive { node });
        }
        let schema = self.data(node).schema();
        assert!(
            slot < schema.len(),
            "kind `{}` of {} has no edge slot {}",
            self.kind_of(node).name(),
            node,
            slot,
        );
        let decl = schema.slot(slot);
        if let Some(target) = target {
            if !self.is_alive(target) {
                return Err(GraphError::TargetNotAlive {
                    role: decl.role,
                    slot: decl.name,
                    target,
                });
            }
        }
        Ok(decl)
    }

    /// A successor target must not already have a predecessor.
    fn claim_check(&self, decl: EdgeSlot, target: Option<NodeRef>) -> Result<(), GraphError> {
        if decl.role == EdgeRole::Successor {
            if let Some(target) = target {
                if let Some(existing) = self.preds[target] {
                    return Err(GraphError::PredecessorConflict {
                        slot: decl.name,
                        target,
                        existing,
                    });
                }
            }
        }
        Ok(())
    }

    /// Update the inverse indices after one edge entry changed from `old`
    /// to `target`, and fire the matching events.
    fn edge_bookkeeping(
        &mut self,
        node: NodeRef,
        slot: u32,
        index: u32,
        role: EdgeRole,
        old: Option<NodeRef>,
        target: Option<NodeRef>,
    ) {
        match role {
            EdgeRole::Input => {
                if let Some(old) = old {
                    self.remove_use(
                        old,
                        Use {
                            user: node,
                            slot,
                            index,
                        },
                    );
                    if self.uses[old].is_empty() && self.is_alive(old) {
                        self.notify(NodeEvent::ZeroUsages, old);
                    }
                }
                if let Some(target) = target {
                    self.uses[target].push(Use {
                        user: node,
                        slot,
                        index,
                    });
                }
                self.notify(NodeEvent::InputChanged, node);
            }
            EdgeRole::Successor => {
                if let Some(old) = old {
                    self.preds[old] = None;
                }
                if let Some(target) = target {
                    self.preds[target] = Some(node);
                }
            }
        }
        trace!(%node, slot, index, ?old, ?target, "edge write");
    }

    /// Remove one use entry from `target`'s usage list, preserving the
    /// relative order of the remaining entries.
    pub(crate) fn remove_use(&mut self, target: NodeRef, entry: Use) {
        let list = &mut self.uses[target];
        let position = list.iter().position(|u| *u == entry);
        debug_assert!(
            position.is_some(),
            "use entry {entry:?} missing from the usage list of {target}",
        );
        if let Some(position) = position {
            list.remove(position);
        }
    }

    // ========================================================================
    // Edge reads
    // ========================================================================

    /// Target of the single-valued edge slot `slot` of `node`, if set.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not alive or `slot` is not a single-valued slot
    /// of its kind.
    pub fn edge(&self, node: NodeRef, slot: usize) -> Option<NodeRef> {
        match self.data(node).edge(slot) {
            EdgeValue::Single(target) => *target,
            EdgeValue::List(_) => panic!(
                "edge slot {} of {} is list-valued; use list_edge",
                slot, node,
            ),
        }
    }

    /// Entries of the list-valued edge slot `slot` of `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not alive or `slot` is not a list-valued slot
    /// of its kind.
    pub fn list_edge(&self, node: NodeRef, slot: usize) -> &[Option<NodeRef>] {
        match self.data(node).edge(slot) {
            EdgeValue::List(items) => items,
            EdgeValue::Single(_) => panic!(
                "edge slot {} of {} is single-valued; use edge",
                slot, node,
            ),
        }
    }

    /// Non-empty input targets of `node`, in slot order.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not alive in this graph.
    pub fn inputs(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        self.data(node).role_targets(EdgeRole::Input)
    }

    /// Non-empty successor targets of `node`, in slot order.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not alive in this graph.
    pub fn successors(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        self.data(node).role_targets(EdgeRole::Successor)
    }

    /// The unique node holding a successor edge to `node`, if any.
    pub fn predecessor(&self, node: NodeRef) -> Option<NodeRef> {
        self.preds[node]
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Delete `node`, refusing while anything still references it.
    pub fn safe_delete(&mut self, node: NodeRef) -> Result<(), GraphError> {
        if !self.is_alive(node) {
            return Err(GraphError::NotAlive { node });
        }
        let count = self.uses[node].len();
        if count > 0 {
            return Err(GraphError::UsagesRemain { node, count });
        }
        if let Some(predecessor) = self.preds[node] {
            return Err(GraphError::PredecessorRemains { node, predecessor });
        }
        self.disconnect_outgoing(node);
        self.tombstone(node);
        Ok(())
    }

    /// Delete `node` unconditionally, disconnecting it from the graph.
    ///
    /// Incoming input edges are emptied (their users keep the slot, now
    /// unset) and the predecessor's successor edge to `node` is cleared,
    /// so the usage-transpose invariant holds on return.
    pub fn delete(&mut self, node: NodeRef) -> Result<(), GraphError> {
        if !self.is_alive(node) {
            return Err(GraphError::NotAlive { node });
        }

        // Sever incoming input edges.
        let incoming = std::mem::take(&mut self.uses[node]);
        for entry in &incoming {
            self.clear_edge_entry(entry.user, entry.slot as usize, entry.index);
            self.notify(NodeEvent::InputChanged, entry.user);
        }

        // Detach from the predecessor's successor slot.
        if let Some(predecessor) = self.preds[node] {
            for (slot, index, role, target) in self.data(predecessor).occurrences() {
                if role == EdgeRole::Successor && target == node {
                    self.clear_edge_entry(predecessor, slot, index);
                }
            }
            self.preds[node] = None;
        }

        self.disconnect_outgoing(node);
        self.tombstone(node);
        Ok(())
    }

    fn clear_edge_entry(&mut self, user: NodeRef, slot: usize, index: u32) {
        match self.record_mut(user).edge_mut(slot) {
            EdgeValue::Single(entry) => *entry = None,
            EdgeValue::List(items) => items[index as usize] = None,
        }
    }

    /// Clear `node`'s outgoing edges, updating the inverse indices.
    fn disconnect_outgoing(&mut self, node: NodeRef) {
        for (slot, index, role, target) in self.data(node).occurrences() {
            match role {
                EdgeRole::Input => {
                    self.remove_use(
                        target,
                        Use {
                            user: node,
                            slot: slot as u32,
                            index,
                        },
                    );
                    if self.uses[target].is_empty() && self.is_alive(target) {
                        self.notify(NodeEvent::ZeroUsages, target);
                    }
                }
                EdgeRole::Successor => self.preds[target] = None,
            }
        }
        self.record_mut(node).clear_edges();
    }

    fn tombstone(&mut self, node: NodeRef) {
        self.nodes[node] = None;
        self.live -= 1;
        self.deleted += 1;
        trace!(%node, "deleted node");
        self.notify(NodeEvent::NodeRemoved, node);
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Push an event listener; it observes every subsequent mutation.
    pub fn push_listener(&mut self, listener: Box<dyn NodeEventListener>) {
        self.listeners.push(listener);
    }

    /// Pop the most recently pushed listener.
    pub fn pop_listener(&mut self) -> Option<Box<dyn NodeEventListener>> {
        self.listeners.pop()
    }

    pub(crate) fn notify(&mut self, event: NodeEvent, node: NodeRef) {
        if self.listeners.is_empty() {
            return;
        }
        // Listeners get no graph access, so taking the stack out cannot
        // lose concurrent pushes.
        let mut listeners = std::mem::take(&mut self.listeners);
        for listener in &mut listeners {
            match event {
                NodeEvent::NodeAdded => listener.node_added(node),
                NodeEvent::InputChanged => listener.input_changed(node),
                NodeEvent::ZeroUsages => listener.zero_usages(node),
                NodeEvent::NodeRemoved => listener.node_removed(node),
            }
        }
        self.listeners = listeners;
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::KindBuilder;

    fn leaf_kind() -> KindRef {
        KindBuilder::new("TestLeaf").register()
    }

    fn binary_kind() -> KindRef {
        KindBuilder::new("TestBinary").input("x").input("y").register()
    }

    fn control_kind() -> KindRef {
        KindBuilder::new("TestControl").successor("next").register()
    }

    #[test]
    fn add_assigns_increasing_ids() {
        let mut graph = Graph::with_name("ids");
        let kind = leaf_kind();
        let a = graph.add(NodeData::new(kind)).unwrap();
        let b = graph.add(NodeData::new(kind)).unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.id_count(), 2);
        assert_eq!(graph.name(), Some("ids"));
        assert!(graph.is_alive(a));
        assert_eq!(graph.kind_of(a), kind);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let mut graph = Graph::new();
        let kind = leaf_kind();
        let a = graph.add(NodeData::new(kind)).unwrap();
        let b = graph.add(NodeData::new(kind)).unwrap();
        graph.safe_delete(b).unwrap();
        let c = graph.add(NodeData::new(kind)).unwrap();
        assert_eq!(c.index(), 2);
        assert!(!graph.is_alive(b));
        assert!(graph.is_alive(a));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.deleted_node_count(), 1);
        assert_eq!(graph.id_count(), 3);
    }

    #[test]
    fn add_rejects_dead_input_target() {
        let mut graph = Graph::new();
        let leaf = leaf_kind();
        let binary = binary_kind();
        let dead = graph.add(NodeData::new(leaf)).unwrap();
        graph.safe_delete(dead).unwrap();

        let err = graph
            .add(NodeData::new(binary).with_input(0, dead))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::TargetNotAlive {
                role: EdgeRole::Input,
                slot: "x",
                target: dead,
            },
        );
        let message = err.to_string();
        assert!(message.contains("Input"));
        assert!(message.contains("not alive"));
        // The failed add issued no id.
        assert_eq!(graph.id_count(), 1);
    }

    #[test]
    fn add_rejects_dead_successor_target() {
        let mut graph = Graph::new();
        let leaf = leaf_kind();
        let control = control_kind();
        let dead = graph.add(NodeData::new(leaf)).unwrap();
        graph.safe_delete(dead).unwrap();

        let err = graph
            .add(NodeData::new(control).with_successor(0, dead))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Successor"));
        assert!(message.contains("not alive"));
    }

    #[test]
    fn set_edge_maintains_usage_duality() {
        let mut graph = Graph::new();
        let leaf = leaf_kind();
        let binary = binary_kind();
        let a = graph.add(NodeData::new(leaf)).unwrap();
        let b = graph.add(NodeData::new(leaf)).unwrap();
        let user = graph.add(NodeData::new(binary).with_input(0, a)).unwrap();

        assert_eq!(graph.usages(a).collect::<Vec<_>>(), vec![user]);
        assert_eq!(graph.usage_count(b), 0);

        graph.set_edge(user, 0, Some(b)).unwrap();
        assert_eq!(graph.usage_count(a), 0);
        assert_eq!(graph.usages(b).collect::<Vec<_>>(), vec![user]);

        graph.set_edge(user, 0, None).unwrap();
        assert_eq!(graph.usage_count(b), 0);
        assert!(!graph.has_usages(b));
    }

    #[test]
    fn set_edge_rejects_dead_target() {
        let mut graph = Graph::new();
        let leaf = leaf_kind();
        let binary = binary_kind();
        let a = graph.add(NodeData::new(leaf)).unwrap();
        let user = graph.add(NodeData::new(binary)).unwrap();
        graph.safe_delete(a).unwrap();

        let err = graph.set_edge(user, 1, Some(a)).unwrap_err();
        assert_eq!(
            err,
            GraphError::TargetNotAlive {
                role: EdgeRole::Input,
                slot: "y",
                target: a,
            },
        );
        // The slot stayed unset.
        assert_eq!(graph.edge(user, 1), None);
    }

    #[test]
    fn list_edges_track_individual_entries() {
        let mut graph = Graph::new();
        let leaf = leaf_kind();
        let phi = KindBuilder::new("TestPhi").input_list("values").register();
        let a = graph.add(NodeData::new(leaf)).unwrap();
        let b = graph.add(NodeData::new(leaf)).unwrap();
        let merge = graph.add(NodeData::new(phi)).unwrap();

        graph.push_list_edge(merge, 0, Some(a)).unwrap();
        graph.push_list_edge(merge, 0, Some(a)).unwrap();
        graph.push_list_edge(merge, 0, None).unwrap();
        assert_eq!(graph.usage_count(a), 2);
        assert_eq!(graph.list_edge(merge, 0), &[Some(a), Some(a), None]);

        graph.set_list_edge(merge, 0, 1, Some(b)).unwrap();
        assert_eq!(graph.usage_count(a), 1);
        assert_eq!(graph.usage_count(b), 1);
        assert_eq!(graph.list_edge(merge, 0), &[Some(a), Some(b), None]);
    }

    #[test]
    fn successor_wiring_tracks_predecessor() {
        let mut graph = Graph::new();
        let control = control_kind();
        let first = graph.add(NodeData::new(control)).unwrap();
        let second = graph.add(NodeData::new(control)).unwrap();

        graph.set_edge(first, 0, Some(second)).unwrap();
        assert_eq!(graph.predecessor(second), Some(first));
        assert_eq!(graph.predecessor(first), None);

        // A second claim on the same target is refused.
        let third = graph.add(NodeData::new(control)).unwrap();
        let err = graph.set_edge(third, 0, Some(second)).unwrap_err();
        assert_eq!(
            err,
            GraphError::PredecessorConflict {
                slot: "next",
                target: second,
                existing: first,
            },
        );

        graph.set_edge(first, 0, None).unwrap();
        assert_eq!(graph.predecessor(second), None);
        graph.set_edge(third, 0, Some(second)).unwrap();
        assert_eq!(graph.predecessor(second), Some(third));
    }

    #[test]
    fn safe_delete_refuses_referenced_nodes() {
        let mut graph = Graph::new();
        let leaf = leaf_kind();
        let binary = binary_kind();
        let control = control_kind();

        let a = graph.add(NodeData::new(leaf)).unwrap();
        let user = graph.add(NodeData::new(binary).with_input(0, a)).unwrap();
        assert_eq!(
            graph.safe_delete(a),
            Err(GraphError::UsagesRemain { node: a, count: 1 }),
        );

        let head = graph.add(NodeData::new(control)).unwrap();
        let tail = graph.add(NodeData::new(control)).unwrap();
        graph.set_edge(head, 0, Some(tail)).unwrap();
        assert_eq!(
            graph.safe_delete(tail),
            Err(GraphError::PredecessorRemains {
                node: tail,
                predecessor: head,
            }),
        );

        // Clearing the references makes both deletable.
        graph.set_edge(user, 0, None).unwrap();
        graph.safe_delete(a).unwrap();
        graph.set_edge(head, 0, None).unwrap();
        graph.safe_delete(tail).unwrap();
    }

    #[test]
    fn delete_disconnects_both_directions() {
        let mut graph = Graph::new();
        let leaf = leaf_kind();
        let binary = binary_kind();

        let a = graph.add(NodeData::new(leaf)).unwrap();
        let middle = graph.add(NodeData::new(binary).with_input(0, a)).unwrap();
        let user = graph
            .add(NodeData::new(binary).with_input(0, middle).with_input(1, middle))
            .unwrap();

        // middle is used twice and uses a once.
        assert_eq!(graph.usage_count(middle), 2);
        assert_eq!(graph.usage_count(a), 1);

        graph.delete(middle).unwrap();
        assert!(!graph.is_alive(middle));
        assert_eq!(graph.usage_count(a), 0);
        assert_eq!(graph.edge(user, 0), None);
        assert_eq!(graph.edge(user, 1), None);
        assert_eq!(graph.usage_count(middle), 0);
    }

    #[test]
    fn delete_detaches_predecessor() {
        let mut graph = Graph::new();
        let control = control_kind();
        let head = graph.add(NodeData::new(control)).unwrap();
        let tail = graph.add(NodeData::new(control)).unwrap();
        graph.set_edge(head, 0, Some(tail)).unwrap();

        graph.delete(tail).unwrap();
        assert_eq!(graph.edge(head, 0), None);
        assert!(graph.is_alive(head));
    }

    #[test]
    fn deleting_a_dead_node_is_rejected() {
        let mut graph = Graph::new();
        let kind = leaf_kind();
        let a = graph.add(NodeData::new(kind)).unwrap();
        graph.safe_delete(a).unwrap();
        assert_eq!(graph.delete(a), Err(GraphError::NotAlive { node: a }));
        assert_eq!(graph.safe_delete(a), Err(GraphError::NotAlive { node: a }));
    }

    #[test]
    fn marks_classify_nodes_by_age() {
        let mut graph = Graph::new();
        let kind = leaf_kind();
        let old = graph.add(NodeData::new(kind)).unwrap();
        let mark = graph.mark();
        let young = graph.add(NodeData::new(kind)).unwrap();

        assert!(!graph.is_new(mark, old));
        assert!(graph.is_new(mark, young));
    }

    #[test]
    fn self_input_is_legal_and_deletable() {
        let mut graph = Graph::new();
        let binary = binary_kind();
        let node = graph.add(NodeData::new(binary)).unwrap();
        graph.set_edge(node, 0, Some(node)).unwrap();
        assert_eq!(graph.usages(node).collect::<Vec<_>>(), vec![node]);

        graph.delete(node).unwrap();
        assert!(!graph.is_alive(node));
        assert_eq!(graph.usage_count(node), 0);
    }
}
