//! Trait interfaces for the TBFF engine.
//!
//! - [`FlowPropagator`]: steady-state flow computation (tbff-flow implements)
//! - [`PropagationObserver`]: progress hook invoked by a propagator

use crate::error::NetworkError;
use crate::types::{FlowNetwork, FlowNode, NodeId, PropagationResult};

/// Computes the steady-state (or best-effort) distribution of flow.
///
/// Implementations take a snapshot by reference and return a new one;
/// the input is never mutated. A run is bounded and synchronous.
pub trait FlowPropagator: Send + Sync {
    /// Propagate flow, reporting progress to `observer`.
    fn propagate_observed(
        &self,
        network: &FlowNetwork,
        observer: &mut dyn PropagationObserver,
    ) -> Result<PropagationResult, NetworkError>;

    /// Propagate flow without observation.
    ///
    /// Default implementation delegates to
    /// [`propagate_observed`](Self::propagate_observed) with a [`NoopObserver`].
    fn propagate(&self, network: &FlowNetwork) -> Result<PropagationResult, NetworkError> {
        self.propagate_observed(network, &mut NoopObserver)
    }
}

/// Structured progress events emitted during propagation.
///
/// Every method has an empty default so implementors only override the
/// events they care about.
pub trait PropagationObserver {
    /// Called once after validation, before the first iteration.
    fn on_start(&mut self, _network: &FlowNetwork) {}

    /// Called after every iteration with the largest inflow change.
    fn on_iteration(&mut self, _iteration: u32, _max_change: f64, _converged: bool) {}

    /// Called when the overflow sink is created.
    fn on_sink_inserted(&mut self, _sink: &FlowNode) {}

    /// Called when the overflow sink is removed.
    fn on_sink_removed(&mut self, _sink_id: &NodeId) {}

    /// Called when an existing sink receives `added` more inflow after the
    /// loop.
    fn on_sink_refed(&mut self, _sink: &FlowNode, _added: f64) {}

    /// Called once with the final result.
    fn on_finish(&mut self, _result: &PropagationResult) {}
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PropagationObserver for NoopObserver {}
