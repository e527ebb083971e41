//! Overflow sink lifecycle.
//!
//! Runs once per propagation, strictly after the iteration loop, so the
//! loop's edge set never changes mid-run. A sink is inserted when some
//! node has outflow above [`OVERFLOW_OUTFLOW_THRESHOLD`] and no outgoing
//! allocation. It is removed once no node needs it and no allocation
//! targets it.

use std::collections::HashSet;

use tbff_core::constants::{OVERFLOW_OUTFLOW_THRESHOLD, OVERFLOW_SINK_ID};
use tbff_core::traits::PropagationObserver;
use tbff_core::types::{FlowNetwork, FlowNode, NodeId};

use crate::config::{EngineConfig, SinkPolicy};
use crate::node::update_node_properties;

/// What the lifecycle phase did to the sink.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkChange {
    Unchanged,
    /// A sink was created and fed the unallocated outflow.
    Inserted { id: NodeId, inflow: f64 },
    /// An existing sink received this run's unallocated outflow
    /// ([`SinkPolicy::RecomputeEachRun`] only).
    Refed { id: NodeId, added: f64 },
    Removed { id: NodeId },
}

/// Ids of every node with at least one outgoing allocation.
fn allocated_sources(network: &FlowNetwork) -> HashSet<&str> {
    network
        .allocations
        .iter()
        .map(|a| a.source_node_id.as_str())
        .collect()
}

/// Non-sink nodes with positive outflow and no outgoing allocation.
fn unallocated<'a>(
    network: &'a FlowNetwork,
    sources: &'a HashSet<&str>,
) -> impl Iterator<Item = &'a FlowNode> + 'a {
    network.nodes.iter().filter(move |n| {
        !n.is_overflow_sink && n.outflow > 0.0 && !sources.contains(n.id.as_str())
    })
}

/// True iff some non-sink node has outflow above the threshold and
/// nowhere to send it.
pub fn needs_overflow_sink(network: &FlowNetwork) -> bool {
    let sources = allocated_sources(network);
    unallocated(network, &sources).any(|n| n.outflow > OVERFLOW_OUTFLOW_THRESHOLD)
}

/// Total outflow of non-sink nodes without outgoing allocations.
pub fn unallocated_outflow(network: &FlowNetwork) -> f64 {
    let sources = allocated_sources(network);
    unallocated(network, &sources).map(|n| n.outflow).sum()
}

/// True iff some allocation routes flow into `sink`.
fn is_targeted(network: &FlowNetwork, sink: &NodeId) -> bool {
    network.allocations.iter().any(|a| a.target_node_id == *sink)
}

/// Insert, re-feed or remove the sink to match the network's current state.
///
/// An existing sink that an allocation still targets is kept even when no
/// node is stranded; dropping it would strand that allocation's source.
pub fn reconcile_overflow_sink(
    network: &mut FlowNetwork,
    config: &EngineConfig,
    observer: &mut dyn PropagationObserver,
) -> SinkChange {
    let stranded = needs_overflow_sink(network);
    let sink = network.overflow_node_id.clone();
    let needed = stranded || sink.as_ref().is_some_and(|id| is_targeted(network, id));
    match (needed, sink) {
        (true, None) => {
            let sink = insert_sink(network, config);
            observer.on_sink_inserted(&sink);
            SinkChange::Inserted {
                id: sink.id,
                inflow: sink.inflow,
            }
        }
        (false, Some(id)) => {
            remove_sink(network, &id);
            observer.on_sink_removed(&id);
            SinkChange::Removed { id }
        }
        (true, Some(id)) => match config.sink_policy {
            SinkPolicy::SetOnce => SinkChange::Unchanged,
            SinkPolicy::RecomputeEachRun => refeed_sink(network, id, observer),
        },
        (false, None) => SinkChange::Unchanged,
    }
}

fn insert_sink(network: &mut FlowNetwork, config: &EngineConfig) -> FlowNode {
    let inflow = unallocated_outflow(network);
    let mut sink = FlowNode::overflow_sink(unique_sink_id(network), config.sink_position);
    sink.inflow = inflow;
    update_node_properties(&mut sink);

    network.overflow_node_id = Some(sink.id.clone());
    network.nodes.push(sink.clone());
    sink
}

fn refeed_sink(
    network: &mut FlowNetwork,
    id: NodeId,
    observer: &mut dyn PropagationObserver,
) -> SinkChange {
    let added = unallocated_outflow(network);
    if let Some(sink) = network.node_mut(id.as_str()) {
        sink.inflow += added;
        update_node_properties(sink);
        observer.on_sink_refed(sink, added);
    }
    SinkChange::Refed { id, added }
}

/// Drop the sink, its back-reference and any allocation leaving it.
/// Only called once nothing targets the sink.
fn remove_sink(network: &mut FlowNetwork, id: &NodeId) {
    network.nodes.retain(|n| !n.is_overflow_sink);
    network.overflow_node_id = None;
    network.allocations.retain(|a| a.source_node_id != *id);
}

/// [`OVERFLOW_SINK_ID`], suffixed if a caller node already uses it.
fn unique_sink_id(network: &FlowNetwork) -> NodeId {
    if !network.contains_node(OVERFLOW_SINK_ID) {
        return NodeId::from(OVERFLOW_SINK_ID);
    }
    (1..)
        .map(|n| format!("{OVERFLOW_SINK_ID}-{n}"))
        .find(|candidate| !network.contains_node(candidate))
        .map(NodeId::from)
        .unwrap_or_else(|| NodeId::from(OVERFLOW_SINK_ID))
}
