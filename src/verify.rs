//! Consistency verification for graph bookkeeping.
//!
//! The graph maintains three derived structures incrementally: usage
//! lists (the transpose of input edges), the predecessor table (the
//! transpose of successor edges), and the per-kind collections. This
//! module re-derives each from the edge storage and reports every
//! divergence, in both directions: derived entries nothing justifies,
//! and edges no derived entry mirrors.

use std::fmt;

use crate::graph::Graph;
use crate::kind::EdgeRole;
use crate::refs::NodeRef;

// ============================================================================
// Error types
// ============================================================================

/// Describes a divergence between input edges and usage lists.
pub struct UseChainError {
    pub message: String,
}

impl fmt::Display for UseChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for UseChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Describes a divergence between successor edges and the predecessor table.
pub struct PredecessorError {
    pub message: String,
}

impl fmt::Display for PredecessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for PredecessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Describes a live node whose collection row holds it other than once.
pub struct CollectionError {
    /// Name of the kind whose collection diverged.
    pub kind_name: &'static str,
    /// The node with the wrong number of appearances.
    pub node: NodeRef,
    /// How many times the node appears in the row.
    pub appearances: usize,
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "collection for kind `{}` holds {} {} time(s), expected exactly once",
            self.kind_name, self.node, self.appearances,
        )
    }
}

impl fmt::Debug for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Describes a node or deletion counter that disagrees with the arena.
pub struct CounterError {
    pub message: String,
}

impl fmt::Display for CounterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for CounterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Result of verification.
#[derive(Default)]
pub struct VerificationReport {
    pub use_chain_errors: Vec<UseChainError>,
    pub predecessor_errors: Vec<PredecessorError>,
    pub collection_errors: Vec<CollectionError>,
    pub counter_errors: Vec<CounterError>,
}

impl VerificationReport {
    pub fn is_ok(&self) -> bool {
        self.use_chain_errors.is_empty()
            && self.predecessor_errors.is_empty()
            && self.collection_errors.is_empty()
            && self.counter_errors.is_empty()
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "verification passed");
        }
        if !self.use_chain_errors.is_empty() {
            writeln!(f, "{} use-chain error(s) found:", self.use_chain_errors.len())?;
            for err in &self.use_chain_errors {
                writeln!(f, "  - {}", err)?;
            }
        }
        if !self.predecessor_errors.is_empty() {
            writeln!(
                f,
                "{} predecessor error(s) found:",
                self.predecessor_errors.len()
            )?;
            for err in &self.predecessor_errors {
                writeln!(f, "  - {}", err)?;
            }
        }
        if !self.collection_errors.is_empty() {
            writeln!(
                f,
                "{} collection error(s) found:",
                self.collection_errors.len()
            )?;
            for err in &self.collection_errors {
                writeln!(f, "  - {}", err)?;
            }
        }
        if !self.counter_errors.is_empty() {
            writeln!(f, "{} counter error(s) found:", self.counter_errors.len())?;
            for err in &self.counter_errors {
                writeln!(f, "  - {}", err)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Use-chain verification
// ============================================================================

/// Check that usage lists are the exact transpose of the input edges.
///
/// Direction 1: every non-empty input entry of a live node must have a
/// matching usage entry on its target. Direction 2: every usage entry
/// must name a live user whose input entry at that slot actually holds
/// the node. Deleted nodes must have empty usage lists.
pub fn verify_use_chains(graph: &Graph) -> VerificationReport {
    let mut errors = Vec::new();

    for node in graph.nodes.keys() {
        if !graph.is_alive(node) {
            if !graph.uses[node].is_empty() {
                errors.push(UseChainError {
                    message: format!(
                        "deleted {} still has {} usage entry(s)",
                        node,
                        graph.uses[node].len(),
                    ),
                });
            }
            continue;
        }

        let data = graph.data(node);
        for (slot, index, role, target) in data.occurrences() {
            if role != EdgeRole::Input {
                continue;
            }
            let slot_name = data.schema().slot(slot).name;
            if !graph.is_alive(target) {
                errors.push(UseChainError {
                    message: format!(
                        "input slot `{}` of {} points at deleted {}",
                        slot_name, node, target,
                    ),
                });
                continue;
            }
            let found = graph.uses[target]
                .iter()
                .any(|u| u.user == node && u.slot == slot as u32 && u.index == index);
            if !found {
                errors.push(UseChainError {
                    message: format!(
                        "entry #{} of input slot `{}` on {} uses {} but no usage entry exists",
                        index, slot_name, node, target,
                    ),
                });
            }
        }
    }

    for node in graph.nodes.keys() {
        for entry in graph.uses(node) {
            if !graph.is_alive(entry.user) {
                errors.push(UseChainError {
                    message: format!(
                        "usage entry for {} names deleted user {}",
                        node, entry.user,
                    ),
                });
                continue;
            }
            let data = graph.data(entry.user);
            let slot = entry.slot as usize;
            let is_input_slot = data
                .schema()
                .slots()
                .get(slot)
                .is_some_and(|decl| decl.role == EdgeRole::Input);
            let actual = data
                .edges()
                .get(slot)
                .and_then(|value| value.entries().get(entry.index as usize))
                .copied()
                .flatten();
            if !is_input_slot || actual != Some(node) {
                errors.push(UseChainError {
                    message: format!(
                        "usage entry for {} claims entry #{} of slot {} on {}, but that entry holds {:?}",
                        node, entry.index, entry.slot, entry.user, actual,
                    ),
                });
            }
        }
    }

    VerificationReport {
        use_chain_errors: errors,
        ..Default::default()
    }
}

// ============================================================================
// Predecessor verification
// ============================================================================

/// Check that the predecessor table is the exact transpose of the
/// successor edges, and that no deleted node is recorded on either side.
pub fn verify_predecessors(graph: &Graph) -> VerificationReport {
    let mut errors = Vec::new();

    for node in graph.nodes.keys() {
        if !graph.is_alive(node) {
            if let Some(stale) = graph.preds[node] {
                errors.push(PredecessorError {
                    message: format!("deleted {} still records predecessor {}", node, stale),
                });
            }
            continue;
        }

        let data = graph.data(node);
        for (slot, _, role, target) in data.occurrences() {
            if role != EdgeRole::Successor {
                continue;
            }
            let slot_name = data.schema().slot(slot).name;
            if !graph.is_alive(target) {
                errors.push(PredecessorError {
                    message: format!(
                        "successor slot `{}` of {} points at deleted {}",
                        slot_name, node, target,
                    ),
                });
                continue;
            }
            if graph.preds[target] != Some(node) {
                errors.push(PredecessorError {
                    message: format!(
                        "successor edge {} -> {} is not mirrored; {} records {:?}",
                        node, target, target, graph.preds[target],
                    ),
                });
            }
        }

        if let Some(pred) = graph.preds[node] {
            let claims = graph.is_alive(pred)
                && graph
                    .data(pred)
                    .role_targets(EdgeRole::Successor)
                    .any(|t| t == node);
            if !claims {
                errors.push(PredecessorError {
                    message: format!(
                        "{} records predecessor {} but no successor edge points back",
                        node, pred,
                    ),
                });
            }
        }
    }

    VerificationReport {
        predecessor_errors: errors,
        ..Default::default()
    }
}

// ============================================================================
// Collection verification
// ============================================================================

/// Check that every live node appears exactly once in the row of its own
/// kind and of each iterable ancestor kind.
pub fn verify_collections(graph: &Graph) -> VerificationReport {
    let mut errors = Vec::new();

    for node in graph.nodes.keys().filter(|n| graph.is_alive(*n)) {
        let kind = graph.kind_of(node);
        for collection in kind.collection_kinds() {
            let appearances = graph.by_kind[collection]
                .iter()
                .filter(|entry| **entry == node)
                .count();
            if appearances != 1 {
                errors.push(CollectionError {
                    kind_name: collection.name(),
                    node,
                    appearances,
                });
            }
        }
    }

    VerificationReport {
        collection_errors: errors,
        ..Default::default()
    }
}

/// Run every verification and combine results, adding counter checks.
pub fn verify_graph(graph: &Graph) -> VerificationReport {
    let uses = verify_use_chains(graph);
    let preds = verify_predecessors(graph);
    let collections = verify_collections(graph);

    let mut counter_errors = Vec::new();
    let live = graph.live_nodes().count();
    if graph.node_count() != live {
        counter_errors.push(CounterError {
            message: format!(
                "live counter reads {} but {} node(s) are alive",
                graph.node_count(),
                live,
            ),
        });
    }
    let dead = graph.id_count() - live;
    if graph.deleted_node_count() != dead {
        counter_errors.push(CounterError {
            message: format!(
                "deleted counter reads {} but {} id(s) are tombstoned",
                graph.deleted_node_count(),
                dead,
            ),
        });
    }

    VerificationReport {
        use_chain_errors: uses.use_chain_errors,
        predecessor_errors: preds.predecessor_errors,
        collection_errors: collections.collection_errors,
        counter_errors,
    }
}

/// Debug-only verification that panics on any error.
///
/// Only runs under `cfg!(debug_assertions)`. Useful for checkpoints
/// after rewrite passes.
pub fn debug_assert_graph(graph: &Graph, context: &str) {
    if !cfg!(debug_assertions) {
        return;
    }
    let report = verify_graph(graph);
    if !report.is_ok() {
        panic!("graph verification failed after `{}`:\n{}", context, report);
    }
}

// ============================================================================
// Tests
// ============================================================================
