//! Def-use tracking and bulk rewires.
//!
//! Every input-edge write records a [`Use`] on the target; the list is the
//! exact transpose of the live input edges naming that target, maintained
//! incrementally by [`Graph`]'s wiring and deletion primitives. This
//! module adds the queries and the bulk rewire operations passes build on.

use smallvec::SmallVec;
use tracing::trace;

use crate::errors::GraphError;
use crate::event::NodeEvent;
use crate::graph::Graph;
use crate::kind::EdgeRole;
use crate::node::EdgeValue;
use crate::refs::NodeRef;

/// A single use of a node: which node uses it, at which edge slot entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Use {
    pub user: NodeRef,
    /// Schema position of the input slot in the user's kind.
    pub slot: u32,
    /// Entry index within a list-valued slot; `0` for single slots.
    pub index: u32,
}

impl Graph {
    /// Use entries currently pointing at `node`.
    pub fn uses(&self, node: NodeRef) -> &[Use] {
        &self.uses[node]
    }

    /// Nodes using `node`, one element per use entry.
    ///
    /// Restartable: each call reads the list as it currently stands. A
    /// node using `node` through two slots appears twice.
    pub fn usages(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        self.uses[node].iter().map(|entry| entry.user)
    }

    /// Number of use entries pointing at `node`.
    pub fn usage_count(&self, node: NodeRef) -> usize {
        self.uses[node].len()
    }

    /// Whether any input edge points at `node`.
    pub fn has_usages(&self, node: NodeRef) -> bool {
        !self.uses[node].is_empty()
    }

    /// Rewire every use of `node` to `replacement`.
    ///
    /// With an empty `replacement` the using slots become unset. `node`'s
    /// usage list is empty on return; `node` itself need not be alive (a
    /// node with no uses makes this a no-op).
    pub fn replace_at_usages(
        &mut self,
        node: NodeRef,
        replacement: Option<NodeRef>,
    ) -> Result<(), GraphError> {
        self.check_replacement(node, replacement)?;

        let old_uses = std::mem::take(&mut self.uses[node]);
        for &entry in &old_uses {
            self.rewire_use(entry, node, replacement);
        }
        if !old_uses.is_empty() && self.is_alive(node) {
            self.notify(NodeEvent::ZeroUsages, node);
        }
        trace!(%node, moved = old_uses.len(), "replaced at usages");
        Ok(())
    }

    /// Rewire the uses of `node` whose user satisfies `predicate`.
    ///
    /// The predicate is consulted once per use entry recorded at call
    /// time, in list order, with shared access to the graph as already
    /// rewired so far. Non-matching entries stay on `node` in their
    /// original relative order. An always-true predicate degenerates to
    /// [`replace_at_usages`](Self::replace_at_usages); an always-false one
    /// is a no-op.
    pub fn replace_at_matching_usages(
        &mut self,
        node: NodeRef,
        replacement: Option<NodeRef>,
        mut predicate: impl FnMut(&Graph, NodeRef) -> bool,
    ) -> Result<(), GraphError> {
        self.check_replacement(node, replacement)?;

        let old_uses = std::mem::take(&mut self.uses[node]);
        let total = old_uses.len();
        let mut kept: SmallVec<[Use; 2]> = SmallVec::new();
        for entry in old_uses {
            if predicate(&*self, entry.user) {
                self.rewire_use(entry, node, replacement);
            } else {
                kept.push(entry);
            }
        }
        let emptied = kept.is_empty();
        self.uses[node] = kept;
        if total > 0 && emptied && self.is_alive(node) {
            self.notify(NodeEvent::ZeroUsages, node);
        }
        Ok(())
    }

    /// Rewire the incoming successor edge of `node` to `replacement`.
    ///
    /// No-op if `node` has no predecessor. With an empty `replacement`
    /// the predecessor's successor slot becomes unset.
    pub fn replace_at_predecessor(
        &mut self,
        node: NodeRef,
        replacement: Option<NodeRef>,
    ) -> Result<(), GraphError> {
        self.check_replacement(node, replacement)?;

        let Some(predecessor) = self.preds[node] else {
            return Ok(());
        };
        for (slot, index, role, target) in self.data(predecessor).occurrences() {
            if role != EdgeRole::Successor || target != node {
                continue;
            }
            if let Some(replacement) = replacement {
                if let Some(existing) = self.preds[replacement] {
                    return Err(GraphError::PredecessorConflict {
                        slot: self.data(predecessor).schema().slot(slot).name,
                        target: replacement,
                        existing,
                    });
                }
            }
            match self.record_mut(predecessor).edge_mut(slot) {
                EdgeValue::Single(entry) => *entry = replacement,
                EdgeValue::List(items) => items[index as usize] = replacement,
            }
            self.preds[node] = None;
            if let Some(replacement) = replacement {
                self.preds[replacement] = Some(predecessor);
            }
            // A node has one predecessor, so one occurrence matches.
            break;
        }
        Ok(())
    }

    /// Rewire all uses and the predecessor of `node` to `replacement`,
    /// then delete `node`.
    ///
    /// If the predecessor rewire is refused (the replacement already has a
    /// predecessor), the usage rewire has already been applied.
    pub fn replace_and_delete(
        &mut self,
        node: NodeRef,
        replacement: NodeRef,
    ) -> Result<(), GraphError> {
        if !self.is_alive(node) {
            return Err(GraphError::NotAlive { node });
        }
        self.replace_at_usages(node, Some(replacement))?;
        self.replace_at_predecessor(node, Some(replacement))?;
        self.safe_delete(node)
    }

    fn check_replacement(
        &self,
        node: NodeRef,
        replacement: Option<NodeRef>,
    ) -> Result<(), GraphError> {
        if let Some(replacement) = replacement {
            if replacement == node {
                return Err(GraphError::ReplaceWithSelf { node });
            }
            if !self.is_alive(replacement) {
                return Err(GraphError::NotAlive { node: replacement });
            }
        }
        Ok(())
    }

    /// Point one recorded use at `replacement` instead of `from`,
    /// updating storage, the replacement's usage list, and the user's
    /// input-changed event.
    fn rewire_use(&mut self, entry: Use, from: NodeRef, replacement: Option<NodeRef>) {
        match self.record_mut(entry.user).edge_mut(entry.slot as usize) {
            EdgeValue::Single(target) => {
                debug_assert_eq!(*target, Some(from));
                *target = replacement;
            }
            EdgeValue::List(items) => {
                debug_assert_eq!(items[entry.index as usize], Some(from));
                items[entry.index as usize] = replacement;
            }
        }
        if let Some(replacement) = replacement {
            self.uses[replacement].push(entry);
        }
        self.notify(NodeEvent::InputChanged, entry.user);
    }
}
