//! Entity handles for graph entities.
//!
//! Each handle is a thin `u32` wrapper providing type-safe indexing into
//! the arena storage owned by [`Graph`](crate::graph::Graph) and into the
//! process-wide kind registry.

use cranelift_entity::entity_impl;

/// Reference to a node in a graph's arena.
///
/// Ids are assigned at registration, in increasing order, and are never
/// reused for the life of the graph; a deleted node's id stays tombstoned.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(u32);
entity_impl!(NodeRef, "node");

/// Reference to a registered node kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KindRef(u32);
entity_impl!(KindRef, "kind");
