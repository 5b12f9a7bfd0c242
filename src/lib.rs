//! Sea IR: a mutable graph substrate for compiler intermediate
//! representations.
//!
//! Nodes carry a stable identity and typed input and successor edges
//! declared per kind. The graph maintains the reverse structures
//! incrementally: usage lists for inputs, a predecessor table for
//! successors, and per-kind collections that tolerate deletion and
//! insertion mid-traversal. Rewrite passes build on the bulk rewire
//! operations and the scratch tables keyed by node id.

// === Node identity and kinds ===
pub mod kind;
pub mod refs;

// === Graph storage and mutation ===
pub mod graph;
pub mod node;

// === Def-use and iteration ===
pub mod iter;
pub mod map;
pub mod usage;

// === Observation and verification ===
pub mod errors;
pub mod event;
pub mod verify;

pub use errors::GraphError;
pub use event::{NodeEvent, NodeEventListener};
pub use graph::{Graph, Mark};
pub use iter::{TypedNodeCursor, TypedNodes};
pub use kind::{EdgeArity, EdgeRole, EdgeSchema, EdgeSlot, KindBuilder};
pub use map::{NodeBitMap, NodeMap};
pub use node::{EdgeValue, NodeData};
pub use refs::{KindRef, NodeRef};
pub use usage::Use;
