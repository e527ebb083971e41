//! Engine configuration.
//!
//! Provides [`EngineConfig`] with the default iteration
//! cap, convergence threshold and overflow-sink behaviour. Built
//! programmatically or deserialized from JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tbff_core::constants::{CONVERGENCE_THRESHOLD, MAX_ITERATIONS};
use tbff_core::error::ConfigError;
use tbff_core::types::Position;

/// How an existing overflow sink is fed on later propagation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SinkPolicy {
    /// The sink's inflow is only set when it is inserted. On later runs it
    /// is reset like any other node and receives only allocated flow.
    #[default]
    SetOnce,
    /// Every run adds the current unallocated outflow to an existing sink.
    #[serde(alias = "recompute")]
    RecomputeEachRun,
}

impl fmt::Display for SinkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetOnce => f.write_str("set-once"),
            Self::RecomputeEachRun => f.write_str("recompute-each-run"),
        }
    }
}

impl FromStr for SinkPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "set-once" => Ok(Self::SetOnce),
            "recompute" | "recompute-each-run" => Ok(Self::RecomputeEachRun),
            other => Err(ConfigError::UnknownSinkPolicy(other.to_string())),
        }
    }
}

/// Configuration for a [`FlowEngine`](crate::engine::FlowEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Upper bound on iterations per propagation run.
    pub max_iterations: u32,
    /// Largest per-node inflow change accepted as converged.
    pub convergence_threshold: f64,
    pub sink_policy: SinkPolicy,
    /// Layout position given to a newly inserted sink.
    pub sink_position: Position,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            convergence_threshold: CONVERGENCE_THRESHOLD,
            sink_policy: SinkPolicy::default(),
            sink_position: Position::overflow_sink(),
        }
    }
}

impl EngineConfig {
    /// Reject settings that would make propagation meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        let t = self.convergence_threshold;
        if !t.is_finite() || t <= 0.0 {
            return Err(ConfigError::InvalidThreshold(t));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_iterations, 100);
        assert_eq!(cfg.convergence_threshold, 0.01);
        assert_eq!(cfg.sink_policy, SinkPolicy::SetOnce);
        assert_eq!(cfg.sink_position, Position::new(600.0, 300.0));
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn zero_iterations_rejected() {
        let cfg = EngineConfig {
            max_iterations: 0,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroIterations));
    }

    #[test]
    fn bad_threshold_rejected() {
        for t in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let cfg = EngineConfig {
                convergence_threshold: t,
                ..EngineConfig::default()
            };
            assert!(
                matches!(cfg.validate(), Err(ConfigError::InvalidThreshold(_))),
                "threshold {t} should be rejected"
            );
        }
    }

    #[test]
    fn sink_policy_parses() {
        assert_eq!("set-once".parse::<SinkPolicy>(), Ok(SinkPolicy::SetOnce));
        assert_eq!(
            "recompute".parse::<SinkPolicy>(),
            Ok(SinkPolicy::RecomputeEachRun)
        );
        assert_eq!(
            "recompute-each-run".parse::<SinkPolicy>(),
            Ok(SinkPolicy::RecomputeEachRun)
        );
        assert_eq!(
            "sometimes".parse::<SinkPolicy>(),
            Err(ConfigError::UnknownSinkPolicy("sometimes".into()))
        );
    }

    #[test]
    fn sink_policy_display_parses_back() {
        for policy in [SinkPolicy::SetOnce, SinkPolicy::RecomputeEachRun] {
            assert_eq!(policy.to_string().parse::<SinkPolicy>(), Ok(policy));
        }
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"maxIterations": 25, "sinkPolicy": "recompute"}"#).unwrap();
        assert_eq!(cfg.max_iterations, 25);
        assert_eq!(cfg.sink_policy, SinkPolicy::RecomputeEachRun);
        assert_eq!(cfg.convergence_threshold, CONVERGENCE_THRESHOLD);
    }
}
