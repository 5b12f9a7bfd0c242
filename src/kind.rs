//! Node kinds: edge schemas and the process-wide kind registry.
//!
//! A kind describes a node's edge slots (inputs and successors, single- or
//! list-valued), its place in the subkind hierarchy, and whether its
//! per-kind collection aggregates subkind nodes. Kinds are registered once
//! with [`KindBuilder`] and live for the process lifetime; every query goes
//! through the [`KindRef`] handle.

use std::fmt;
use std::sync::{Arc, LazyLock};

use cranelift_entity::PrimaryMap;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::refs::KindRef;

// ============================================================================
// Edge slots
// ============================================================================

/// Whether an edge slot is a data input or a control-flow successor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeRole {
    /// Data edge; the target's usage list records the referrer.
    Input,
    /// Control-flow edge; the target records the referrer as its
    /// predecessor instead of a usage.
    Successor,
}

impl fmt::Display for EdgeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeRole::Input => f.write_str("Input"),
            EdgeRole::Successor => f.write_str("Successor"),
        }
    }
}

/// Whether an edge slot holds one target or an ordered list of targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeArity {
    Single,
    List,
}

/// One declared edge slot of a kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeSlot {
    pub name: &'static str,
    pub role: EdgeRole,
    pub arity: EdgeArity,
}

/// The edge slots of one kind, inherited slots first.
///
/// Computed once at registration and shared; cloning is cheap.
#[derive(Clone, Debug)]
pub struct EdgeSchema {
    slots: Arc<[EdgeSlot]>,
}

impl EdgeSchema {
    /// All slots in declaration order.
    pub fn slots(&self) -> &[EdgeSlot] {
        &self.slots
    }

    /// Number of declared slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Descriptor of the slot at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn slot(&self, slot: usize) -> EdgeSlot {
        self.slots[slot]
    }

    /// Position of the slot named `name`, if declared.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    /// Positions and descriptors of the input slots.
    pub fn inputs(&self) -> impl Iterator<Item = (usize, EdgeSlot)> + '_ {
        self.of_role(EdgeRole::Input)
    }

    /// Positions and descriptors of the successor slots.
    pub fn successors(&self) -> impl Iterator<Item = (usize, EdgeSlot)> + '_ {
        self.of_role(EdgeRole::Successor)
    }

    fn of_role(&self, role: EdgeRole) -> impl Iterator<Item = (usize, EdgeSlot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(move |(_, s)| s.role == role)
            .map(|(i, s)| (i, *s))
    }
}

// ============================================================================
// Registry
// ============================================================================

struct KindInfo {
    name: &'static str,
    parent: Option<KindRef>,
    iterable: bool,
    schema: EdgeSchema,
    /// Collections a node of this kind is inserted into: the kind itself,
    /// then every iterable ancestor, nearest first.
    collections: SmallVec<[KindRef; 2]>,
}

struct KindRegistry {
    kinds: PrimaryMap<KindRef, KindInfo>,
}

static REGISTRY: LazyLock<RwLock<KindRegistry>> = LazyLock::new(|| {
    RwLock::new(KindRegistry {
        kinds: PrimaryMap::new(),
    })
});

impl KindRef {
    /// Name the kind was registered under.
    pub fn name(self) -> &'static str {
        REGISTRY.read().kinds[self].name
    }

    /// Edge schema computed at registration.
    pub fn schema(self) -> EdgeSchema {
        REGISTRY.read().kinds[self].schema.clone()
    }

    /// Direct superkind, if any.
    pub fn parent(self) -> Option<KindRef> {
        REGISTRY.read().kinds[self].parent
    }

    /// Whether this kind's collection aggregates nodes of its subkinds.
    pub fn is_iterable(self) -> bool {
        REGISTRY.read().kinds[self].iterable
    }

    /// Whether `self` is `other` or a transitive subkind of it.
    pub fn is_subkind_of(self, other: KindRef) -> bool {
        let registry = REGISTRY.read();
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = registry.kinds[kind].parent;
        }
        false
    }

    pub(crate) fn collection_kinds(self) -> SmallVec<[KindRef; 2]> {
        REGISTRY.read().kinds[self].collections.clone()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Fluent, one-shot registration of a node kind.
///
/// Slots are addressed by position in declaration order, inherited slots
/// first. Registration is process-wide and permanent.
///
/// ```
/// use sea_ir::KindBuilder;
///
/// let value = KindBuilder::new("Value").iterable().register();
/// let add = KindBuilder::new("Add")
///     .subkind_of(value)
///     .input("x")
///     .input("y")
///     .register();
/// assert!(add.is_subkind_of(value));
/// assert_eq!(add.schema().len(), 2);
/// ```
pub struct KindBuilder {
    name: &'static str,
    parent: Option<KindRef>,
    iterable: bool,
    slots: Vec<EdgeSlot>,
}

impl KindBuilder {
    pub fn new(name: &'static str) -> Self {
        KindBuilder {
            name,
            parent: None,
            iterable: false,
            slots: Vec::new(),
        }
    }

    /// Inherit `parent`'s slots and hierarchy position.
    pub fn subkind_of(mut self, parent: KindRef) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Make this kind's collection aggregate nodes of its subkinds.
    pub fn iterable(mut self) -> Self {
        self.iterable = true;
        self
    }

    /// Declare a single-valued input slot.
    pub fn input(self, name: &'static str) -> Self {
        self.slot(name, EdgeRole::Input, EdgeArity::Single)
    }

    /// Declare a list-valued input slot.
    pub fn input_list(self, name: &'static str) -> Self {
        self.slot(name, EdgeRole::Input, EdgeArity::List)
    }

    /// Declare a single-valued successor slot.
    pub fn successor(self, name: &'static str) -> Self {
        self.slot(name, EdgeRole::Successor, EdgeArity::Single)
    }

    /// Declare a list-valued successor slot.
    pub fn successor_list(self, name: &'static str) -> Self {
        self.slot(name, EdgeRole::Successor, EdgeArity::List)
    }

    fn slot(mut self, name: &'static str, role: EdgeRole, arity: EdgeArity) -> Self {
        self.slots.push(EdgeSlot { name, role, arity });
        self
    }

    /// Register the kind and return its handle.
    ///
    /// # Panics
    ///
    /// Panics if a declared slot name collides with another slot of this
    /// kind or with an inherited slot.
    pub fn register(self) -> KindRef {
        let mut registry = REGISTRY.write();

        // Flatten the schema: inherited slots first, then this kind's own.
        let mut slots: Vec<EdgeSlot> = match self.parent {
            Some(parent) => registry.kinds[parent].schema.slots().to_vec(),
            None => Vec::new(),
        };
        slots.extend_from_slice(&self.slots);
        for (i, slot) in slots.iter().enumerate() {
            for earlier in &slots[..i] {
                assert!(
                    earlier.name != slot.name,
                    "kind `{}`: duplicate edge slot name `{}`",
                    self.name,
                    slot.name,
                );
            }
        }

        let mut iterable_ancestors: SmallVec<[KindRef; 2]> = SmallVec::new();
        let mut current = self.parent;
        while let Some(kind) = current {
            if registry.kinds[kind].iterable {
                iterable_ancestors.push(kind);
            }
            current = registry.kinds[kind].parent;
        }

        let kind = registry.kinds.push(KindInfo {
            name: self.name,
            parent: self.parent,
            iterable: self.iterable,
            schema: EdgeSchema {
                slots: slots.into(),
            },
            collections: SmallVec::new(),
        });

        let mut collections: SmallVec<[KindRef; 2]> = SmallVec::new();
        collections.push(kind);
        collections.extend(iterable_ancestors);
        registry.kinds[kind].collections = collections;

        kind
    }
}
