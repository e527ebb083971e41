//! Network-wide totals, always derived from scratch.

use serde::{Deserialize, Serialize};
use tbff_core::types::{FlowNetwork, FlowNode};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTotals {
    /// Sum of injected `external_flow`, not of per-node inflow.
    pub total_inflow: f64,
    pub total_absorbed: f64,
    pub total_outflow: f64,
}

/// Reduce a node set to its totals.
pub fn network_totals(nodes: &[FlowNode]) -> NetworkTotals {
    nodes.iter().fold(NetworkTotals::default(), |acc, n| NetworkTotals {
        total_inflow: acc.total_inflow + n.external_flow,
        total_absorbed: acc.total_absorbed + n.absorbed,
        total_outflow: acc.total_outflow + n.outflow,
    })
}

/// Overwrite the snapshot's totals with values derived from its nodes.
pub fn recompute_totals(network: &mut FlowNetwork) {
    let totals = network_totals(&network.nodes);
    network.total_inflow = totals.total_inflow;
    network.total_absorbed = totals.total_absorbed;
    network.total_outflow = totals.total_outflow;
}
