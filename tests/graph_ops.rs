//! End-to-end graph rewriting scenarios.
//!
//! These tests drive the public API the way a rewrite pass would: build
//! a small node dialect, traverse collections while mutating them, run
//! bulk rewires, and check the bookkeeping with the verifier afterwards.

use std::sync::LazyLock;

use sea_ir::verify::verify_graph;
use sea_ir::{Graph, KindBuilder, KindRef, NodeBitMap, NodeData, NodeMap};

struct Dialect {
    value: KindRef,
    param: KindRef,
    add: KindRef,
    phi: KindRef,
    ret: KindRef,
    jump: KindRef,
    stop: KindRef,
}

static DIALECT: LazyLock<Dialect> = LazyLock::new(|| {
    let value = KindBuilder::new("Value").iterable().register();
    let param = KindBuilder::new("Param").subkind_of(value).register();
    let add = KindBuilder::new("Add")
        .subkind_of(value)
        .input("lhs")
        .input("rhs")
        .register();
    let phi = KindBuilder::new("Phi")
        .subkind_of(value)
        .input_list("operands")
        .register();
    let ret = KindBuilder::new("Return").input("result").register();
    let jump = KindBuilder::new("Jump").successor("next").register();
    let stop = KindBuilder::new("Stop").register();
    Dialect {
        value,
        param,
        add,
        phi,
        ret,
        jump,
        stop,
    }
});

// ============================================================================
// Data-flow rewrites
// ============================================================================

/// Deduplicate a repeated addition, then sweep values nothing uses.
#[test]
fn value_numbering_then_dead_code_sweep() {
    let d = &*DIALECT;
    let mut graph = Graph::with_name("vn");

    let a = graph.add(NodeData::new(d.param)).unwrap();
    let b = graph.add(NodeData::new(d.param)).unwrap();
    let s1 = graph
        .add(NodeData::new(d.add).with_input(0, a).with_input(1, b))
        .unwrap();
    let s2 = graph
        .add(NodeData::new(d.add).with_input(0, a).with_input(1, b))
        .unwrap();
    let out = graph
        .add(NodeData::new(d.add).with_input(0, s1).with_input(1, s2))
        .unwrap();
    let ret = graph.add(NodeData::new(d.ret).with_input(0, out)).unwrap();

    // `s2` recomputes `s1`; fold it away.
    graph.replace_and_delete(s2, s1).unwrap();
    assert!(!graph.is_alive(s2));
    assert_eq!(graph.inputs(out).collect::<Vec<_>>(), vec![s1, s1]);
    assert_eq!(graph.usage_count(s1), 2);

    // A dangling chain for the sweep to find.
    let t1 = graph
        .add(NodeData::new(d.add).with_input(0, a).with_input(1, a))
        .unwrap();
    let t2 = graph
        .add(NodeData::new(d.add).with_input(0, t1).with_input(1, b))
        .unwrap();

    // Sweep until no value dies: deleting a user can strand its inputs.
    let mut removed = true;
    while removed {
        removed = false;
        let mut cursor = graph.nodes(d.value).cursor();
        while let Some(node) = cursor.next(&graph) {
            if !graph.has_usages(node) {
                graph.safe_delete(node).unwrap();
                removed = true;
            }
        }
    }

    assert!(!graph.is_alive(t1));
    assert!(!graph.is_alive(t2));
    assert!(graph.is_alive(a) && graph.is_alive(b));
    assert_eq!(graph.node_count(), 5);
    assert_eq!(graph.usages(out).collect::<Vec<_>>(), vec![ret]);

    let report = verify_graph(&graph);
    assert!(report.is_ok(), "{}", report);
}

/// Collapse a phi whose operands all name the same value.
#[test]
fn redundant_phi_collapses_to_operand() {
    let d = &*DIALECT;
    let mut graph = Graph::new();

    let x = graph.add(NodeData::new(d.param)).unwrap();
    let phi = graph
        .add(NodeData::new(d.phi).push_input(0, x).push_input(0, x))
        .unwrap();
    let user = graph
        .add(NodeData::new(d.add).with_input(0, phi).with_input(1, x))
        .unwrap();
    let ret = graph.add(NodeData::new(d.ret).with_input(0, user)).unwrap();

    let redundant = graph.list_edge(phi, 0).iter().flatten().all(|t| *t == x);
    assert!(redundant);

    graph.replace_and_delete(phi, x).unwrap();
    assert_eq!(graph.inputs(user).collect::<Vec<_>>(), vec![x, x]);
    assert_eq!(graph.usages(user).collect::<Vec<_>>(), vec![ret]);

    let report = verify_graph(&graph);
    assert!(report.is_ok(), "{}", report);
}

/// Move one class of usages over to a replacement, leaving the rest.
#[test]
fn predicate_splits_usages_by_kind() {
    let d = &*DIALECT;
    let mut graph = Graph::new();

    let x = graph.add(NodeData::new(d.param)).unwrap();
    let y = graph.add(NodeData::new(d.param)).unwrap();
    let cheap = graph
        .add(NodeData::new(d.add).with_input(0, x).with_input(1, x))
        .unwrap();
    let merge = graph.add(NodeData::new(d.phi).push_input(0, x)).unwrap();

    graph
        .replace_at_matching_usages(x, Some(y), |g, user| g.kind_of(user) == d.phi)
        .unwrap();

    assert_eq!(graph.list_edge(merge, 0), &[Some(y)]);
    assert_eq!(graph.inputs(cheap).collect::<Vec<_>>(), vec![x, x]);
    assert_eq!(graph.usage_count(x), 2);
    assert_eq!(graph.usage_count(y), 1);

    let report = verify_graph(&graph);
    assert!(report.is_ok(), "{}", report);
}

// ============================================================================
// Control-flow rewrites
// ============================================================================

/// Remove a trampoline jump from a control chain.
#[test]
fn straighten_jump_chain() {
    let d = &*DIALECT;
    let mut graph = Graph::new();

    let stop = graph.add(NodeData::new(d.stop)).unwrap();
    let j2 = graph
        .add(NodeData::new(d.jump).with_successor(0, stop))
        .unwrap();
    let j1 = graph
        .add(NodeData::new(d.jump).with_successor(0, j2))
        .unwrap();
    let start = graph
        .add(NodeData::new(d.jump).with_successor(0, j1))
        .unwrap();

    // `j1` merely forwards to `j2`. Free `j2`'s predecessor slot first,
    // then splice `start` straight through and drop the trampoline.
    graph.set_edge(j1, 0, None).unwrap();
    graph.replace_at_predecessor(j1, Some(j2)).unwrap();
    graph.safe_delete(j1).unwrap();

    assert_eq!(graph.edge(start, 0), Some(j2));
    assert_eq!(graph.predecessor(j2), Some(start));
    assert_eq!(graph.successors(j2).collect::<Vec<_>>(), vec![stop]);
    assert_eq!(graph.predecessor(stop), Some(j2));

    let report = verify_graph(&graph);
    assert!(report.is_ok(), "{}", report);
}

// ============================================================================
// Marks and scratch tables
// ============================================================================

/// Post-process only the nodes an expansion step appended.
#[test]
fn expansion_marks_and_scratch_tables() {
    let d = &*DIALECT;
    let mut graph = Graph::new();

    let a = graph.add(NodeData::new(d.param)).unwrap();
    let b = graph.add(NodeData::new(d.param)).unwrap();
    let before = graph.mark();

    let lo = graph
        .add(NodeData::new(d.add).with_input(0, a).with_input(1, b))
        .unwrap();
    let hi = graph
        .add(NodeData::new(d.add).with_input(0, lo).with_input(1, b))
        .unwrap();

    assert!(graph.is_new(before, lo));
    assert!(graph.is_new(before, hi));
    assert!(!graph.is_new(before, a));
    assert_eq!(graph.nodes_since(before).collect::<Vec<_>>(), vec![lo, hi]);

    // Operand depth over the value collection; registration order means
    // inputs are seen before their users here.
    let mut depth: NodeMap<usize> = NodeMap::new(&graph);
    let mut visited = NodeBitMap::new(&graph);
    depth.set(a, 0);
    depth.set(b, 0);
    for node in graph.nodes(d.value).iter(&graph) {
        if depth.get(node).is_none() {
            let deepest = graph
                .inputs(node)
                .filter_map(|input| depth.get(input).copied())
                .max()
                .unwrap_or(0);
            depth.set(node, deepest + 1);
        }
        visited.mark(node);
    }

    assert_eq!(depth.get(lo), Some(&1));
    assert_eq!(depth.get(hi), Some(&2));
    assert_eq!(visited.marked().count(), 4);
}
