//! Observation hooks for graph mutations.
//!
//! Listeners are pushed onto a stack on the graph and see every mutation
//! made while they are installed. They receive node ids only, not graph
//! access: a listener that wants to inspect or react must record the id
//! and act after the mutation returns.

use crate::refs::NodeRef;

/// A change to a graph worth observing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeEvent {
    /// A node was registered with the graph.
    NodeAdded,
    /// An input edge of the node changed.
    InputChanged,
    /// The node's usage list became empty while the node is still alive.
    ZeroUsages,
    /// The node was deleted.
    NodeRemoved,
}

/// Receives [`NodeEvent`]s from a graph it is installed on.
///
/// Implement [`event`](Self::event) to observe everything, or override
/// the per-event methods for the cases of interest; each defaults to the
/// catch-all.
pub trait NodeEventListener {
    /// Catch-all handler. The default does nothing.
    fn event(&mut self, event: NodeEvent, node: NodeRef) {
        let _ = (event, node);
    }

    fn node_added(&mut self, node: NodeRef) {
        self.event(NodeEvent::NodeAdded, node);
    }

    fn input_changed(&mut self, node: NodeRef) {
        self.event(NodeEvent::InputChanged, node);
    }

    fn zero_usages(&mut self, node: NodeRef) {
        self.event(NodeEvent::ZeroUsages, node);
    }

    fn node_removed(&mut self, node: NodeRef) {
        self.event(NodeEvent::NodeRemoved, node);
    }
}
