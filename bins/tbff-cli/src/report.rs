//! Plain-text rendering of a propagation result.

use std::fmt;

use tbff_core::types::PropagationResult;

/// Node table plus totals, for terminal output.
pub struct Report<'a>(pub &'a PropagationResult);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        let net = &result.network;
        let name = if net.name.is_empty() { "network" } else { net.name.as_str() };
        let outcome = if result.converged {
            "converged"
        } else {
            "iteration cap reached"
        };
        writeln!(f, "{name}: {outcome} after {} iterations", result.iterations)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<24} {:<10} {:>10} {:>10} {:>10} {:>10}",
            "NODE", "STATUS", "EXTERNAL", "INFLOW", "ABSORBED", "OUTFLOW"
        )?;
        for node in &net.nodes {
            let label = if node.is_overflow_sink {
                format!("{} (sink)", node.id.as_str())
            } else {
                node.id.as_str().to_string()
            };
            writeln!(
                f,
                "{:<24} {:<10} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
                label,
                node.status.to_string(),
                node.external_flow,
                node.inflow,
                node.absorbed,
                node.outflow
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "total inflow {:.2}, absorbed {:.2}, outflow {:.2}",
            net.total_inflow, net.total_absorbed, net.total_outflow
        )?;
        write!(f, "particles: {}", result.particles.len())
    }
}
