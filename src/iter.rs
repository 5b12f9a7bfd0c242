//! Mutation-tolerant iteration over nodes by kind.
//!
//! Per-kind rows are append-only: registration pushes the node onto the
//! row of its kind and of every iterable ancestor kind, and deletion
//! leaves the entry in place as a tombstone. A traversal is therefore
//! just a position in a row; it holds no borrow of the graph, re-checks
//! liveness at every step, and sees nodes appended behind it. There is no
//! modification counter and no concurrent-modification failure: mutating
//! the graph mid-traversal is the normal pass pattern.

use crate::graph::{Graph, Mark};
use crate::refs::{KindRef, NodeRef};

impl Graph {
    /// Restartable sequence over the live nodes in `kind`'s collection.
    ///
    /// The collection holds the nodes registered with kind `kind` plus,
    /// when `kind` is iterable, the nodes of its subkinds.
    pub fn nodes(&self, kind: KindRef) -> TypedNodes {
        TypedNodes { kind }
    }

    /// Whether any live node is in `kind`'s collection.
    pub fn has_node(&self, kind: KindRef) -> bool {
        self.by_kind[kind].iter().any(|node| self.is_alive(*node))
    }

    /// All live nodes, in id order.
    pub fn live_nodes(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.nodes.keys().filter(move |node| self.is_alive(*node))
    }

    /// Live nodes registered after `mark` was taken, in id order.
    pub fn nodes_since(&self, mark: Mark) -> impl Iterator<Item = NodeRef> + '_ {
        self.nodes
            .keys()
            .skip(mark.0 as usize)
            .filter(move |node| self.is_alive(*node))
    }
}

/// A restartable sequence of the live nodes in one kind's collection.
///
/// Each [`cursor`](TypedNodes::cursor) begins a fresh traversal; the
/// borrowing [`iter`](TypedNodes::iter) serves read-only walks.
#[derive(Clone, Copy, Debug)]
pub struct TypedNodes {
    kind: KindRef,
}

impl TypedNodes {
    /// Begin a fresh traversal.
    pub fn cursor(&self) -> TypedNodeCursor {
        TypedNodeCursor {
            kind: self.kind,
            pos: 0,
        }
    }

    /// Borrowing iterator over the currently live nodes, for traversals
    /// that do not mutate the graph.
    pub fn iter<'g>(&self, graph: &'g Graph) -> impl Iterator<Item = NodeRef> + 'g {
        graph.by_kind[self.kind]
            .iter()
            .copied()
            .filter(move |node| graph.is_alive(*node))
    }

    /// First live node, if any.
    pub fn first(&self, graph: &Graph) -> Option<NodeRef> {
        self.iter(graph).next()
    }

    /// Number of live nodes at this instant.
    pub fn count(&self, graph: &Graph) -> usize {
        self.iter(graph).count()
    }

    pub fn is_empty(&self, graph: &Graph) -> bool {
        self.first(graph).is_none()
    }

    /// Snapshot of the live nodes, for loops that want a fixed worklist
    /// instead of append visibility.
    pub fn to_vec(&self, graph: &Graph) -> Vec<NodeRef> {
        self.iter(graph).collect()
    }
}

/// One in-progress traversal over a kind's collection.
///
/// The cursor stores a position, not a borrow: pass the graph to each
/// step, and mutate it freely between steps. Dead entries are skipped at
/// yield time, so a node deleted at any point before being visited is
/// never returned, and nodes appended while the traversal is in progress
/// are visited in append order. `has_next` returning `true` does not
/// guarantee that the following `next` returns a node: a deletion between
/// the two calls can empty the remainder of the row.
#[derive(Clone, Copy, Debug)]
pub struct TypedNodeCursor {
    kind: KindRef,
    pos: usize,
}

impl TypedNodeCursor {
    /// Advance to and return the next live node.
    pub fn next(&mut self, graph: &Graph) -> Option<NodeRef> {
        let row = &graph.by_kind[self.kind];
        while self.pos < row.len() {
            let candidate = row[self.pos];
            self.pos += 1;
            if graph.is_alive(candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Whether a live node currently lies ahead of the cursor.
    ///
    /// Skips permanently dead entries as it scans (ids are never reused,
    /// so a tombstoned entry can never come back); the next node yielded
    /// is unaffected.
    pub fn has_next(&mut self, graph: &Graph) -> bool {
        let row = &graph.by_kind[self.kind];
        while self.pos < row.len() {
            if graph.is_alive(row[self.pos]) {
                return true;
            }
            self.pos += 1;
        }
        false
    }
}
