//! Observer that reports propagation progress through `tracing`.

use tbff_core::traits::PropagationObserver;
use tbff_core::types::{FlowNetwork, FlowNode, NodeId, PropagationResult};
use tracing::{debug, info, trace, warn};

/// Logs every propagation event at a level matched to its volume.
///
/// Run boundaries and sink changes go to `info`, the cap warning to `warn`,
/// every tenth iteration to `debug` and the rest to `trace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PropagationObserver for TracingObserver {
    fn on_start(&mut self, network: &FlowNetwork) {
        let external: f64 = network.nodes.iter().map(|n| n.external_flow).sum();
        info!(
            network = %network.name,
            nodes = network.nodes.len(),
            allocations = network.allocations.len(),
            external,
            "propagate: started"
        );
        for node in network.nodes.iter().filter(|n| n.external_flow > 0.0) {
            debug!(node = %node.id, external_flow = node.external_flow, "propagate: source");
        }
    }

    fn on_iteration(&mut self, iteration: u32, max_change: f64, converged: bool) {
        if converged || iteration % 10 == 0 {
            debug!(iteration, max_change, converged, "propagate: iteration");
        } else {
            trace!(iteration, max_change, "propagate: iteration");
        }
    }

    fn on_sink_inserted(&mut self, sink: &FlowNode) {
        info!(sink = %sink.id, inflow = sink.inflow, "overflow: sink inserted");
    }

    fn on_sink_removed(&mut self, sink_id: &NodeId) {
        info!(sink = %sink_id, "overflow: sink removed");
    }

    fn on_sink_refed(&mut self, sink: &FlowNode, added: f64) {
        debug!(sink = %sink.id, added, inflow = sink.inflow, "overflow: sink re-fed");
    }

    fn on_finish(&mut self, result: &PropagationResult) {
        let net = &result.network;
        if result.converged {
            info!(
                iterations = result.iterations,
                total_inflow = net.total_inflow,
                total_absorbed = net.total_absorbed,
                total_outflow = net.total_outflow,
                particles = result.particles.len(),
                "propagate: converged"
            );
        } else {
            warn!(
                iterations = result.iterations,
                total_absorbed = net.total_absorbed,
                "propagate: iteration cap reached"
            );
        }
        for node in &net.nodes {
            debug!(
                node = %node.id,
                inflow = node.inflow,
                absorbed = node.absorbed,
                outflow = node.outflow,
                status = %node.status,
                "propagate: node state"
            );
        }
    }
}
