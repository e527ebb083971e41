//! Propagation engine implementing the [`FlowPropagator`] trait.
//!
//! Nodes are addressed by their position in `FlowNetwork::nodes` for the
//! whole run. Allocations are resolved once into per-node route lists, so
//! an iteration is two passes over flat vectors with no id lookups.

use std::collections::HashMap;

use tbff_core::error::{ConfigError, NetworkError};
use tbff_core::traits::{FlowPropagator, PropagationObserver};
use tbff_core::types::{FlowNetwork, FlowNode, PropagationResult};
use tbff_core::validation::validate_network;

use crate::config::EngineConfig;
use crate::node::update_node_properties;
use crate::observer::TracingObserver;
use crate::overflow::reconcile_overflow_sink;
use crate::particles::seed_particles;
use crate::totals::recompute_totals;

/// The production propagator.
///
/// Each run:
/// - validates the snapshot and works on a copy of it
/// - iterates until the largest inflow change drops below the threshold
///   or the iteration cap is hit
/// - reconciles the overflow sink, seeds particles and recomputes totals
#[derive(Debug, Clone, Default)]
pub struct FlowEngine {
    config: EngineConfig,
}

impl FlowEngine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a validated configuration.
    pub fn with_config(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the iteration loop in place. Returns `(iterations, converged)`.
    ///
    /// Derived fields are refreshed once more after the loop so they match
    /// the last accepted inflows.
    fn iterate(
        &self,
        nodes: &mut [FlowNode],
        routes: &[Vec<Route>],
        observer: &mut dyn PropagationObserver,
    ) -> (u32, bool) {
        let mut iterations = 0;
        let mut converged = false;
        let mut next = vec![0.0; nodes.len()];

        while iterations < self.config.max_iterations && !converged {
            iterations += 1;
            nodes.iter_mut().for_each(update_node_properties);

            for (slot, node) in next.iter_mut().zip(nodes.iter()) {
                *slot = node.external_flow;
            }
            // Outflow from nodes without routes is dropped here and picked
            // up by the overflow sink after the loop.
            for (node, out) in nodes.iter().zip(routes) {
                if node.outflow <= 0.0 {
                    continue;
                }
                for route in out {
                    next[route.target] += node.outflow * route.percentage;
                }
            }

            let max_change = nodes
                .iter()
                .zip(&next)
                .map(|(node, inflow)| (inflow - node.inflow).abs())
                .fold(0.0, f64::max);
            converged = max_change < self.config.convergence_threshold;

            for (node, inflow) in nodes.iter_mut().zip(&next) {
                node.inflow = *inflow;
            }
            observer.on_iteration(iterations, max_change, converged);
        }

        nodes.iter_mut().for_each(update_node_properties);
        (iterations, converged)
    }
}

/// One outgoing edge, resolved to the target's index.
#[derive(Debug, Clone, Copy)]
struct Route {
    target: usize,
    percentage: f64,
}

/// Resolve every allocation to a route on its source's list.
fn build_routes(network: &FlowNetwork) -> Result<Vec<Vec<Route>>, NetworkError> {
    let index: HashMap<&str, usize> = network
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();
    let resolve = |allocation: &str, node: &str| {
        index
            .get(node)
            .copied()
            .ok_or_else(|| NetworkError::DanglingReference {
                allocation: allocation.to_string(),
                node: node.to_string(),
            })
    };

    let mut routes = vec![Vec::new(); network.nodes.len()];
    for a in &network.allocations {
        let source = resolve(a.id.as_str(), a.source_node_id.as_str())?;
        let target = resolve(a.id.as_str(), a.target_node_id.as_str())?;
        routes[source].push(Route {
            target,
            percentage: a.percentage,
        });
    }
    Ok(routes)
}

impl FlowPropagator for FlowEngine {
    fn propagate_observed(
        &self,
        network: &FlowNetwork,
        observer: &mut dyn PropagationObserver,
    ) -> Result<PropagationResult, NetworkError> {
        validate_network(network)?;
        let routes = build_routes(network)?;

        let mut net = network.clone();
        for node in &mut net.nodes {
            node.inflow = node.external_flow;
        }
        observer.on_start(&net);

        let (iterations, converged) = self.iterate(&mut net.nodes, &routes, observer);

        reconcile_overflow_sink(&mut net, &self.config, observer);
        let particles = seed_particles(&net);
        recompute_totals(&mut net);

        let result = PropagationResult {
            network: net,
            iterations,
            converged,
            particles,
        };
        observer.on_finish(&result);
        Ok(result)
    }

    fn propagate(&self, network: &FlowNetwork) -> Result<PropagationResult, NetworkError> {
        self.propagate_observed(network, &mut TracingObserver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SinkPolicy;
    use crate::edit::create_allocation;
    use tbff_core::types::{Allocation, FlowNode, NodeId, NodeStatus};

    fn node(id: &str, max: f64) -> FlowNode {
        FlowNode::new(id, id, 0.0, max)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn linear_chain() -> FlowNetwork {
        FlowNetwork::new(
            "linear",
            vec![
                node("a", 50.0).with_external_flow(100.0),
                node("b", 30.0),
                node("c", 40.0),
            ],
            vec![
                Allocation::new("ab", "a", "b", 1.0),
                Allocation::new("bc", "b", "c", 1.0),
            ],
        )
    }

    fn cycle() -> FlowNetwork {
        FlowNetwork::new(
            "cycle",
            vec![node("a", 1.0).with_external_flow(100.0), node("b", 1.0)],
            vec![
                Allocation::new("ab", "a", "b", 1.0),
                Allocation::new("ba", "b", "a", 1.0),
            ],
        )
    }

    fn single_overflowing() -> FlowNetwork {
        FlowNetwork::new(
            "single",
            vec![node("x", 20.0).with_external_flow(200.0)],
            vec![],
        )
    }

    #[test]
    fn linear_chain_steady_state() {
        let result = FlowEngine::new().propagate(&linear_chain()).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 3);

        let net = &result.network;
        let a = net.node("a").unwrap();
        let b = net.node("b").unwrap();
        let c = net.node("c").unwrap();
        assert!(close(a.absorbed, 50.0) && close(a.outflow, 50.0));
        assert!(close(b.absorbed, 30.0) && close(b.outflow, 20.0));
        assert!(close(c.absorbed, 20.0) && close(c.outflow, 0.0));
        assert_eq!(b.status, NodeStatus::Saturated);
        assert!(net.overflow_node_id.is_none());
    }

    #[test]
    fn split_then_merge() {
        let net = FlowNetwork::new(
            "split",
            vec![
                node("source", 20.0).with_external_flow(100.0),
                node("project-a", 40.0),
                node("project-b", 40.0),
                node("commons", 30.0),
            ],
            vec![
                Allocation::new("sa", "source", "project-a", 0.6),
                Allocation::new("sb", "source", "project-b", 0.4),
                Allocation::new("ac", "project-a", "commons", 1.0),
                Allocation::new("bc", "project-b", "commons", 1.0),
            ],
        );
        let result = FlowEngine::new().propagate(&net).unwrap();
        assert!(result.converged);

        let out = &result.network;
        let pa = out.node("project-a").unwrap();
        let pb = out.node("project-b").unwrap();
        let commons = out.node("commons").unwrap();
        assert!(close(out.node("source").unwrap().outflow, 80.0));
        assert!(close(pa.inflow, 48.0) && close(pa.absorbed, 40.0) && close(pa.outflow, 8.0));
        assert!(close(pb.inflow, 32.0) && close(pb.absorbed, 32.0) && close(pb.outflow, 0.0));
        assert!(close(commons.inflow, 8.0) && close(commons.absorbed, 8.0));
        assert!(close(out.total_inflow, 100.0));
        assert!(close(out.total_absorbed, 100.0));
    }

    #[test]
    fn unallocated_excess_inserts_sink() {
        let result = FlowEngine::new().propagate(&single_overflowing()).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 1);

        let net = &result.network;
        assert_eq!(net.overflow_node_id, Some(NodeId::from("overflow-sink")));
        let sink = net.overflow_sink().unwrap();
        assert!(close(sink.inflow, 180.0));
        assert!(close(sink.absorbed, 180.0));
        assert_eq!(sink.status, NodeStatus::Healthy);
        assert!(result
            .particles
            .iter()
            .any(|p| p.allocation_id == "virtual_x_overflow"));
    }

    #[test]
    fn sink_removed_once_excess_is_allocated() {
        let engine = FlowEngine::new();
        let first = engine.propagate(&single_overflowing()).unwrap();

        let mut edited = first.network.clone();
        edited.nodes.push(node("y", 1_000.0));
        create_allocation(&mut edited, "x", "y", 1.0).unwrap();

        let second = engine.propagate(&edited).unwrap();
        assert!(second.network.overflow_node_id.is_none());
        assert!(second.network.nodes.iter().all(|n| !n.is_overflow_sink));
        assert!(close(second.network.node("y").unwrap().absorbed, 180.0));
    }

    #[test]
    fn set_once_sink_is_not_refed() {
        let engine = FlowEngine::new();
        let first = engine.propagate(&single_overflowing()).unwrap();
        let second = engine.propagate(&first.network).unwrap();
        let sink = second.network.overflow_sink().unwrap();
        assert_eq!(sink.inflow, 0.0);
        assert_eq!(second.network.nodes.len(), 2);
    }

    #[test]
    fn recompute_policy_refeeds_sink() {
        let engine = FlowEngine::with_config(EngineConfig {
            sink_policy: SinkPolicy::RecomputeEachRun,
            ..EngineConfig::default()
        })
        .unwrap();
        let first = engine.propagate(&single_overflowing()).unwrap();
        let second = engine.propagate(&first.network).unwrap();
        assert!(close(second.network.overflow_sink().unwrap().inflow, 180.0));
    }

    #[test]
    fn cycle_hits_iteration_cap() {
        let result = FlowEngine::new().propagate(&cycle()).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 100);
        for n in &result.network.nodes {
            assert!((n.absorbed + n.outflow - n.inflow).abs() < 1e-6);
            assert!(n.absorbed <= n.max_absorption);
        }
    }

    #[test]
    fn configured_cap_is_respected() {
        let engine = FlowEngine::with_config(EngineConfig {
            max_iterations: 2,
            ..EngineConfig::default()
        })
        .unwrap();
        let result = engine.propagate(&cycle()).unwrap();
        assert_eq!(result.iterations, 2);
        assert!(!result.converged);
    }

    #[test]
    fn invalid_config_rejected() {
        let err = FlowEngine::with_config(EngineConfig {
            max_iterations: 0,
            ..EngineConfig::default()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::ZeroIterations);
    }

    #[test]
    fn input_snapshot_is_untouched() {
        let input = linear_chain();
        let before = input.clone();
        FlowEngine::new().propagate(&input).unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn dangling_reference_fails_fast() {
        let mut net = linear_chain();
        net.allocations.push(Allocation::new("cz", "c", "ghost", 1.0));
        let err = FlowEngine::new().propagate(&net).unwrap_err();
        assert_eq!(
            err,
            NetworkError::DanglingReference {
                allocation: "cz".into(),
                node: "ghost".into(),
            }
        );
    }

    #[test]
    fn empty_network_converges_immediately() {
        let result = FlowEngine::new()
            .propagate(&FlowNetwork::new("empty", vec![], vec![]))
            .unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 1);
        assert!(result.particles.is_empty());
    }

    #[derive(Default)]
    struct Recorder {
        started: usize,
        iterations: Vec<(u32, bool)>,
        inserted: Vec<NodeId>,
        refed: Vec<(NodeId, f64)>,
        finished: usize,
    }

    impl PropagationObserver for Recorder {
        fn on_start(&mut self, _network: &FlowNetwork) {
            self.started += 1;
        }
        fn on_iteration(&mut self, iteration: u32, _max_change: f64, converged: bool) {
            self.iterations.push((iteration, converged));
        }
        fn on_sink_inserted(&mut self, sink: &FlowNode) {
            self.inserted.push(sink.id.clone());
        }
        fn on_sink_refed(&mut self, sink: &FlowNode, added: f64) {
            self.refed.push((sink.id.clone(), added));
        }
        fn on_finish(&mut self, _result: &PropagationResult) {
            self.finished += 1;
        }
    }

    #[test]
    fn observer_sees_every_event() {
        let mut recorder = Recorder::default();
        FlowEngine::new()
            .propagate_observed(&single_overflowing(), &mut recorder)
            .unwrap();
        assert_eq!(recorder.started, 1);
        assert_eq!(recorder.iterations, vec![(1, true)]);
        assert_eq!(recorder.inserted, vec![NodeId::from("overflow-sink")]);
        assert_eq!(recorder.finished, 1);
        assert!(recorder.refed.is_empty());
    }

    #[test]
    fn observer_sees_refeed_under_recompute_policy() {
        let engine = FlowEngine::with_config(EngineConfig {
            sink_policy: SinkPolicy::RecomputeEachRun,
            ..EngineConfig::default()
        })
        .unwrap();
        let first = engine.propagate(&single_overflowing()).unwrap();

        let mut recorder = Recorder::default();
        engine
            .propagate_observed(&first.network, &mut recorder)
            .unwrap();
        assert!(recorder.inserted.is_empty());
        assert_eq!(recorder.refed.len(), 1);
        assert_eq!(recorder.refed[0].0, NodeId::from("overflow-sink"));
        assert!(close(recorder.refed[0].1, 180.0));
    }

    #[test]
    fn observer_not_called_on_invalid_input() {
        let mut net = linear_chain();
        net.allocations.push(Allocation::new("aa", "a", "a", 1.0));
        let mut recorder = Recorder::default();
        assert!(FlowEngine::new()
            .propagate_observed(&net, &mut recorder)
            .is_err());
        assert_eq!(recorder.started, 0);
    }
}
