//! Structural validation of network snapshots.
//!
//! Two levels:
//!
//! - **Snapshot** ([`validate_network`]): referential integrity and value
//!   ranges across the whole network. Run by the engine before every
//!   propagation so dangling references fail fast instead of silently
//!   dropping flow.
//! - **Boundary** ([`sanitize_flow`], [`sanitize_percentage`]): single values
//!   entering through caller edits. Non-finite input is rejected, finite
//!   out-of-range input is clamped.

use std::collections::HashSet;

use crate::error::NetworkError;
use crate::types::{FlowNetwork, FlowNode};

/// Validate a complete network snapshot.
///
/// - Node ids and allocation ids are unique
/// - Every node passes [`validate_node`]
/// - At most one overflow sink, and `overflow_node_id` names exactly it
/// - Every allocation references existing nodes and is not a self-loop
/// - Every percentage is finite and within `[0, 1]`
pub fn validate_network(network: &FlowNetwork) -> Result<(), NetworkError> {
    let mut node_ids = HashSet::with_capacity(network.nodes.len());
    for node in &network.nodes {
        if !node_ids.insert(node.id.as_str()) {
            return Err(NetworkError::DuplicateNode(node.id.to_string()));
        }
        validate_node(node)?;
    }

    validate_overflow_sink(network)?;

    let mut allocation_ids = HashSet::with_capacity(network.allocations.len());
    for allocation in &network.allocations {
        if !allocation_ids.insert(allocation.id.as_str()) {
            return Err(NetworkError::DuplicateAllocation(allocation.id.to_string()));
        }
        for endpoint in [&allocation.source_node_id, &allocation.target_node_id] {
            if !node_ids.contains(endpoint.as_str()) {
                return Err(NetworkError::DanglingReference {
                    allocation: allocation.id.to_string(),
                    node: endpoint.to_string(),
                });
            }
        }
        if allocation.source_node_id == allocation.target_node_id {
            return Err(NetworkError::SelfLoop(allocation.id.to_string()));
        }
        if !allocation.percentage.is_finite() || !(0.0..=1.0).contains(&allocation.percentage) {
            return Err(NetworkError::InvalidPercentage {
                allocation: allocation.id.to_string(),
                value: allocation.percentage,
            });
        }
    }

    Ok(())
}

/// Validate a single node's caller-supplied values.
///
/// - `external_flow` is finite and non-negative (zero on the sink)
/// - `min_absorption` is finite and non-negative
/// - `max_absorption` is non-negative and at least `min_absorption`;
///   `+inf` is allowed
pub fn validate_node(node: &FlowNode) -> Result<(), NetworkError> {
    let flow = node.external_flow;
    if !flow.is_finite() || flow < 0.0 || (node.is_overflow_sink && flow != 0.0) {
        return Err(NetworkError::InvalidFlow {
            node: node.id.to_string(),
            value: flow,
        });
    }

    let (min, max) = (node.min_absorption, node.max_absorption);
    // NaN fails every comparison below.
    let thresholds_ok = min.is_finite() && min >= 0.0 && max >= min;
    if !thresholds_ok {
        return Err(NetworkError::InvalidThresholds {
            node: node.id.to_string(),
            min,
            max,
        });
    }

    Ok(())
}

/// Check that the sink flag and the `overflow_node_id` back-reference agree.
fn validate_overflow_sink(network: &FlowNetwork) -> Result<(), NetworkError> {
    let mut sinks = network.nodes.iter().filter(|n| n.is_overflow_sink);
    let sink = sinks.next();
    if sinks.next().is_some() {
        return Err(NetworkError::MultipleOverflowSinks);
    }

    match (&network.overflow_node_id, sink) {
        (None, None) => Ok(()),
        (Some(id), Some(sink)) if *id == sink.id => Ok(()),
        (Some(id), _) => Err(NetworkError::OverflowSinkMismatch(id.to_string())),
        (None, Some(sink)) => Err(NetworkError::OverflowSinkMismatch(sink.id.to_string())),
    }
}

/// Accept a caller-supplied external flow, clamping negatives to zero.
pub fn sanitize_flow(node: &str, value: f64) -> Result<f64, NetworkError> {
    if !value.is_finite() {
        return Err(NetworkError::InvalidFlow {
            node: node.to_string(),
            value,
        });
    }
    Ok(value.max(0.0))
}

/// Accept a caller-supplied percentage, clamping into `[0, 1]`.
pub fn sanitize_percentage(allocation: &str, value: f64) -> Result<f64, NetworkError> {
    if !value.is_finite() {
        return Err(NetworkError::InvalidPercentage {
            allocation: allocation.to_string(),
            value,
        });
    }
    Ok(value.clamp(0.0, 1.0))
}
