//! Node property updater.
//!
//! Derives `absorbed`, `outflow` and `status` from a node's current inflow
//! and thresholds. The engine runs it in place on every node once per
//! iteration.

use tbff_core::constants::MINIMUM_STATUS_TOLERANCE;
use tbff_core::types::{FlowNetwork, FlowNode, NodeStatus};

use crate::totals::recompute_totals;

/// Status for an absorbed amount against the node's thresholds.
///
/// Checked in order: starved, saturated, minimum, healthy. A node whose
/// `min == max` and that absorbs exactly that amount is saturated.
pub fn node_status(absorbed: f64, min_absorption: f64, max_absorption: f64) -> NodeStatus {
    if absorbed < min_absorption {
        NodeStatus::Starved
    } else if absorbed >= max_absorption {
        NodeStatus::Saturated
    } else if (absorbed - min_absorption).abs() < MINIMUM_STATUS_TOLERANCE {
        NodeStatus::Minimum
    } else {
        NodeStatus::Healthy
    }
}

/// Recompute a node's derived fields from its current inflow.
///
/// `absorbed = min(inflow, max_absorption)`, `outflow = max(0, inflow - absorbed)`.
pub fn update_node_properties(node: &mut FlowNode) {
    let absorbed = node.inflow.min(node.max_absorption);
    node.absorbed = absorbed;
    node.outflow = (node.inflow - absorbed).max(0.0);
    node.status = node_status(absorbed, node.min_absorption, node.max_absorption);
}

/// Recompute every node's derived fields and the network totals from the
/// current inflows, without propagating.
pub fn refresh_snapshot(network: &mut FlowNetwork) {
    network.nodes.iter_mut().for_each(update_node_properties);
    recompute_totals(network);
}
