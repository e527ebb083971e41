//! Particle seeds for the animation layer.
//!
//! More flow on an edge means more particles, spread evenly along it.
//! Moving particles frame by frame is the renderer's job.

use std::collections::{HashMap, HashSet};

use tbff_core::constants::{
    MAX_OVERFLOW_PARTICLES, MAX_PARTICLES_PER_EDGE, OVERFLOW_PARTICLE_FLOW_UNIT,
    PARTICLE_BASE_SPEED, PARTICLE_FLOW_UNIT, PARTICLE_SPEED_DIVISOR,
};
use tbff_core::types::{FlowNetwork, FlowNode, ParticleSpec};

/// `clamp(floor(flow / unit), 1, max)`.
pub fn particle_count(flow: f64, unit: f64, max: usize) -> usize {
    // Negative and NaN ratios saturate to 0 on the cast.
    ((flow / unit).floor() as usize).clamp(1, max)
}

/// Seed particles for every allocation carrying flow, plus virtual edges
/// into the overflow sink when one exists.
///
/// Run on the snapshot after the sink lifecycle phase, so a sink inserted
/// in this run already gets overflow particles and a sink removed in this
/// run gets none. Seeding from the input snapshot would lag one run behind.
pub fn seed_particles(network: &FlowNetwork) -> Vec<ParticleSpec> {
    let nodes: HashMap<&str, &FlowNode> = network
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n))
        .collect();
    let mut particles = Vec::new();
    let mut next_id = 0usize;

    for allocation in &network.allocations {
        let Some(source) = nodes.get(allocation.source_node_id.as_str()) else {
            continue;
        };
        if source.outflow <= 0.0 {
            continue;
        }

        let flow = source.outflow * allocation.percentage;
        let count = particle_count(flow, PARTICLE_FLOW_UNIT, MAX_PARTICLES_PER_EDGE);
        let speed = PARTICLE_BASE_SPEED + flow / PARTICLE_SPEED_DIVISOR;
        for i in 0..count {
            particles.push(ParticleSpec {
                id: format!("particle_{next_id}"),
                allocation_id: allocation.id.to_string(),
                progress: i as f64 / count as f64,
                amount: flow / count as f64,
                speed,
            });
            next_id += 1;
        }
    }

    if network.overflow_node_id.is_none() {
        return particles;
    }

    let sources: HashSet<&str> = network
        .allocations
        .iter()
        .map(|a| a.source_node_id.as_str())
        .collect();
    let stranded = network
        .nodes
        .iter()
        .filter(|n| !n.is_overflow_sink && n.outflow > 0.0 && !sources.contains(n.id.as_str()));
    for node in stranded {
        let count = particle_count(
            node.outflow,
            OVERFLOW_PARTICLE_FLOW_UNIT,
            MAX_OVERFLOW_PARTICLES,
        );
        for i in 0..count {
            particles.push(ParticleSpec {
                id: format!("particle_overflow_{next_id}"),
                allocation_id: format!("virtual_{}_overflow", node.id),
                progress: i as f64 / count as f64,
                amount: node.outflow / count as f64,
                speed: PARTICLE_BASE_SPEED,
            });
            next_id += 1;
        }
    }

    particles
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbff_core::types::{Allocation, NodeId, Position};

    fn with_outflow(id: &str, outflow: f64) -> FlowNode {
        let mut n = FlowNode::new(id, id, 0.0, 10.0);
        n.inflow = 10.0 + outflow;
        n.absorbed = 10.0;
        n.outflow = outflow;
        n
    }

    #[test]
    fn count_is_clamped() {
        assert_eq!(particle_count(0.0, 10.0, 10), 1);
        assert_eq!(particle_count(9.9, 10.0, 10), 1);
        assert_eq!(particle_count(35.0, 10.0, 10), 3);
        assert_eq!(particle_count(500.0, 10.0, 10), 10);
        assert_eq!(particle_count(-4.0, 10.0, 10), 1);
        assert_eq!(particle_count(f64::NAN, 10.0, 10), 1);
    }

    #[test]
    fn particles_follow_edge_flow() {
        let net = FlowNetwork::new(
            "n",
            vec![with_outflow("a", 80.0), with_outflow("b", 0.0), with_outflow("c", 0.0)],
            vec![
                Allocation::new("ab", "a", "b", 0.6),
                Allocation::new("ac", "a", "c", 0.4),
            ],
        );
        let particles = seed_particles(&net);

        let ab: Vec<_> = particles.iter().filter(|p| p.allocation_id == "ab").collect();
        let ac: Vec<_> = particles.iter().filter(|p| p.allocation_id == "ac").collect();
        assert_eq!(ab.len(), 4); // 48 units
        assert_eq!(ac.len(), 3); // 32 units

        let progress: Vec<f64> = ab.iter().map(|p| p.progress).collect();
        assert_eq!(progress, vec![0.0, 0.25, 0.5, 0.75]);
        assert!((ab[0].amount - 12.0).abs() < 1e-9);
        assert!((ab[0].speed - (0.01 + 48.0 / 1000.0)).abs() < 1e-12);
    }

    #[test]
    fn idle_sources_seed_nothing() {
        let net = FlowNetwork::new(
            "n",
            vec![with_outflow("a", 0.0), with_outflow("b", 0.0)],
            vec![Allocation::new("ab", "a", "b", 1.0)],
        );
        assert!(seed_particles(&net).is_empty());
    }

    #[test]
    fn ids_are_unique_and_sequential() {
        let net = FlowNetwork::new(
            "n",
            vec![with_outflow("a", 25.0), with_outflow("b", 25.0), with_outflow("c", 0.0)],
            vec![
                Allocation::new("ac", "a", "c", 1.0),
                Allocation::new("bc", "b", "c", 1.0),
            ],
        );
        let ids: Vec<String> = seed_particles(&net).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["particle_0", "particle_1", "particle_2", "particle_3"]);
    }

    #[test]
    fn stranded_outflow_gets_virtual_edge_when_sink_exists() {
        let mut net = FlowNetwork::new(
            "n",
            vec![
                with_outflow("x", 180.0),
                FlowNode::overflow_sink("overflow-sink", Position::default()),
            ],
            vec![],
        );
        assert!(seed_particles(&net).is_empty());

        net.overflow_node_id = Some(NodeId::from("overflow-sink"));
        let particles = seed_particles(&net);
        assert_eq!(particles.len(), 5);
        assert!(particles.iter().all(|p| p.allocation_id == "virtual_x_overflow"));
        assert!(particles.iter().all(|p| p.speed == 0.01));
        assert_eq!(particles[0].id, "particle_overflow_0");
        assert!((particles[0].amount - 36.0).abs() < 1e-9);
    }
}
