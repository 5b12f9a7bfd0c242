//! Integrity errors raised by graph mutations.

use thiserror::Error;

use crate::kind::EdgeRole;
use crate::refs::NodeRef;

/// An integrity violation detected by a graph mutation.
///
/// These report bugs in the calling pass, not recoverable conditions: no
/// operation that returns one has applied any of its effects, except where
/// a composite rewire documents otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    /// An edge was pointed at a node that is not alive in this graph.
    #[error("{role} `{slot}` target {target} is not alive")]
    TargetNotAlive {
        /// Role of the slot being wired.
        role: EdgeRole,
        /// Declared name of the slot being wired.
        slot: &'static str,
        /// The rejected target.
        target: NodeRef,
    },

    /// An operation addressed a node that is not alive in this graph.
    #[error("{node} is not alive in this graph")]
    NotAlive { node: NodeRef },

    /// A node cannot replace itself at its own usages or predecessor.
    #[error("cannot replace {node} with itself")]
    ReplaceWithSelf { node: NodeRef },

    /// Deletion was refused because input edges still point at the node.
    #[error("cannot delete {node}: {count} use(s) remain")]
    UsagesRemain { node: NodeRef, count: usize },

    /// Deletion was refused because a successor edge still points at the
    /// node.
    #[error("cannot delete {node}: it is still a successor of {predecessor}")]
    PredecessorRemains {
        node: NodeRef,
        predecessor: NodeRef,
    },

    /// A successor edge tried to claim a target that already has a
    /// predecessor.
    #[error("Successor `{slot}` target {target} already has predecessor {existing}")]
    PredecessorConflict {
        /// Declared name of the successor slot being wired.
        slot: &'static str,
        target: NodeRef,
        existing: NodeRef,
    },
}
