//! Caller-side edits applied between propagation runs.
//!
//! Every edit that touches allocations renormalizes the affected source's
//! sibling set and nothing else. Computed node fields are never written
//! here; callers re-run propagation to refresh them.

use std::collections::HashSet;

use tbff_core::constants::ALLOCATION_ID_PREFIX;
use tbff_core::error::NetworkError;
use tbff_core::types::{Allocation, AllocationId, FlowNetwork, NodeId};
use tbff_core::validation::{sanitize_flow, sanitize_percentage};

use crate::normalize::normalize_allocations;

/// Set the flow injected into `node_id` every cycle. Negative values are
/// clamped to zero.
pub fn set_external_flow(
    network: &mut FlowNetwork,
    node_id: &str,
    value: f64,
) -> Result<(), NetworkError> {
    let value = sanitize_flow(node_id, value)?;
    let node = network
        .node_mut(node_id)
        .ok_or_else(|| NetworkError::UnknownNode(node_id.to_string()))?;
    if node.is_overflow_sink {
        return Err(NetworkError::SinkNotEditable(node_id.to_string()));
    }
    node.external_flow = value;
    Ok(())
}

/// Append an allocation from `source` to `target` and renormalize the
/// source's outgoing set. Returns the generated id.
pub fn create_allocation(
    network: &mut FlowNetwork,
    source: &str,
    target: &str,
    percentage: f64,
) -> Result<AllocationId, NetworkError> {
    for endpoint in [source, target] {
        if !network.contains_node(endpoint) {
            return Err(NetworkError::UnknownNode(endpoint.to_string()));
        }
    }

    let id = next_allocation_id(network);
    if source == target {
        return Err(NetworkError::SelfLoop(id.to_string()));
    }
    let percentage = sanitize_percentage(id.as_str(), percentage)?;

    network
        .allocations
        .push(Allocation::new(id.clone(), source, target, percentage));
    normalize_outgoing(network, source);
    Ok(id)
}

/// Change one allocation's percentage (clamped to `[0, 1]`) and renormalize
/// its siblings.
pub fn update_allocation_percentage(
    network: &mut FlowNetwork,
    allocation_id: &str,
    value: f64,
) -> Result<(), NetworkError> {
    let value = sanitize_percentage(allocation_id, value)?;
    let allocation = network
        .allocations
        .iter_mut()
        .find(|a| a.id.as_str() == allocation_id)
        .ok_or_else(|| NetworkError::UnknownAllocation(allocation_id.to_string()))?;
    allocation.percentage = value;
    let source = allocation.source_node_id.clone();
    normalize_outgoing(network, source.as_str());
    Ok(())
}

/// Remove an allocation and renormalize the remaining siblings.
pub fn delete_allocation(
    network: &mut FlowNetwork,
    allocation_id: &str,
) -> Result<Allocation, NetworkError> {
    let pos = network
        .allocations
        .iter()
        .position(|a| a.id.as_str() == allocation_id)
        .ok_or_else(|| NetworkError::UnknownAllocation(allocation_id.to_string()))?;
    let removed = network.allocations.remove(pos);
    normalize_outgoing(network, removed.source_node_id.as_str());
    Ok(removed)
}

/// Normalize the outgoing allocations of `source`. Allocations from other
/// nodes are untouched.
pub fn normalize_outgoing(network: &mut FlowNetwork, source: &str) {
    let siblings: Vec<Allocation> = network.outgoing(source).cloned().collect();
    if siblings.is_empty() {
        return;
    }
    let normalized = normalize_allocations(&siblings);
    let targets = network
        .allocations
        .iter_mut()
        .filter(|a| a.source_node_id.as_str() == source);
    for (allocation, fixed) in targets.zip(normalized) {
        allocation.percentage = fixed.percentage;
    }
}

/// Normalize every source's outgoing set. Used on snapshots loaded from
/// outside, whose percentages may never have been normalized.
pub fn normalize_all(network: &mut FlowNetwork) {
    let mut seen = HashSet::new();
    let sources: Vec<NodeId> = network
        .allocations
        .iter()
        .filter(|a| seen.insert(a.source_node_id.clone()))
        .map(|a| a.source_node_id.clone())
        .collect();
    for source in sources {
        normalize_outgoing(network, source.as_str());
    }
}

/// First unused `alloc_<n>`, starting after the current allocation count.
fn next_allocation_id(network: &FlowNetwork) -> AllocationId {
    let mut n = network.allocations.len() + 1;
    loop {
        let candidate = format!("{ALLOCATION_ID_PREFIX}{n}");
        if network.allocation(&candidate).is_none() {
            return AllocationId::from(candidate);
        }
        n += 1;
    }
}
