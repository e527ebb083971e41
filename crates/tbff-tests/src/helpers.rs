//! Shared network builders and generators for integration tests.

use proptest::prelude::*;
use tbff_core::types::{Allocation, FlowNetwork, FlowNode};
use tbff_flow::normalize_all;

/// Tolerance for comparing propagated values.
pub const EPSILON: f64 = 1e-6;

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < EPSILON,
        "expected {expected}, got {actual}"
    );
}

pub fn node(id: &str, name: &str, min: f64, max: f64) -> FlowNode {
    FlowNode::new(id, name, min, max)
}

/// Alice (100 in, max 50) -> Bob (max 30) -> Carol (max 40).
pub fn linear_network() -> FlowNetwork {
    FlowNetwork::new(
        "Linear Flow",
        vec![
            node("alice", "Alice", 10.0, 50.0).with_external_flow(100.0),
            node("bob", "Bob", 10.0, 30.0),
            node("carol", "Carol", 10.0, 40.0),
        ],
        vec![
            Allocation::new("alloc_1", "alice", "bob", 1.0),
            Allocation::new("alloc_2", "bob", "carol", 1.0),
        ],
    )
}

/// Source splits 60/40 into two projects that both feed Commons.
pub fn split_network() -> FlowNetwork {
    FlowNetwork::new(
        "Split Flow",
        vec![
            node("source", "Source", 5.0, 20.0).with_external_flow(100.0),
            node("project_a", "Project A", 15.0, 40.0),
            node("project_b", "Project B", 15.0, 40.0),
            node("commons", "Commons", 10.0, 30.0),
        ],
        vec![
            Allocation::new("alloc_1", "source", "project_a", 0.6),
            Allocation::new("alloc_2", "source", "project_b", 0.4),
            Allocation::new("alloc_3", "project_a", "commons", 1.0),
            Allocation::new("alloc_4", "project_b", "commons", 1.0),
        ],
    )
}

/// Alice -> Bob -> Carol -> Alice, 50 injected at Alice.
pub fn circular_network() -> FlowNetwork {
    FlowNetwork::new(
        "Circular Flow",
        vec![
            node("alice", "Alice", 10.0, 30.0).with_external_flow(50.0),
            node("bob", "Bob", 10.0, 30.0),
            node("carol", "Carol", 10.0, 30.0),
        ],
        vec![
            Allocation::new("alloc_1", "alice", "bob", 1.0),
            Allocation::new("alloc_2", "bob", "carol", 1.0),
            Allocation::new("alloc_3", "carol", "alice", 1.0),
        ],
    )
}

/// One node receiving far more than it can absorb, with nowhere to send it.
pub fn overflowing_network(external: f64, max: f64) -> FlowNetwork {
    FlowNetwork::new(
        "Overflow",
        vec![node("x", "X", 0.0, max).with_external_flow(external)],
        vec![],
    )
}

/// Two nodes feeding each other everything above a tiny capacity. Inflow
/// keeps growing, so the run never converges.
pub fn runaway_cycle() -> FlowNetwork {
    FlowNetwork::new(
        "Runaway",
        vec![
            node("a", "A", 0.0, 1.0).with_external_flow(100.0),
            node("b", "B", 0.0, 1.0),
        ],
        vec![
            Allocation::new("ab", "a", "b", 1.0),
            Allocation::new("ba", "b", "a", 1.0),
        ],
    )
}

/// Random well-formed networks: up to eight nodes, random thresholds and
/// sources, up to two edges per node on average (cycles included), with
/// every sibling set normalized.
pub fn arb_network() -> impl Strategy<Value = FlowNetwork> {
    (1usize..=8)
        .prop_flat_map(|n| {
            let nodes = prop::collection::vec(
                (
                    0.0f64..50.0,
                    0.0f64..100.0,
                    prop_oneof![Just(0.0), 0.0f64..200.0],
                ),
                n,
            );
            let edges = prop::collection::vec((0..n, 0..n, 0.0f64..=1.0), 0..=n * 2);
            (nodes, edges)
        })
        .prop_map(|(nodes, edges)| {
            let nodes = nodes
                .into_iter()
                .enumerate()
                .map(|(i, (min, band, external))| {
                    node(&format!("n{i}"), &format!("Node {i}"), min, min + band)
                        .with_external_flow(external)
                })
                .collect();
            let allocations = edges
                .into_iter()
                .filter(|(source, target, _)| source != target)
                .enumerate()
                .map(|(i, (source, target, pct))| {
                    Allocation::new(format!("e{i}"), format!("n{source}"), format!("n{target}"), pct)
                })
                .collect();
            let mut network = FlowNetwork::new("random", nodes, allocations);
            normalize_all(&mut network);
            network
        })
}
