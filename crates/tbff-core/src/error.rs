//! Error types for the TBFF flow network.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("duplicate node id: {0}")] DuplicateNode(String),
    #[error("duplicate allocation id: {0}")] DuplicateAllocation(String),
    #[error("unknown node: {0}")] UnknownNode(String),
    #[error("unknown allocation: {0}")] UnknownAllocation(String),
    #[error("allocation {allocation} references missing node {node}")] DanglingReference { allocation: String, node: String },
    #[error("allocation {0} routes a node to itself")] SelfLoop(String),
    #[error("invalid percentage on {allocation}: {value}")] InvalidPercentage { allocation: String, value: f64 },
    #[error("invalid flow on {node}: {value}")] InvalidFlow { node: String, value: f64 },
    #[error("invalid thresholds on {node}: min {min}, max {max}")] InvalidThresholds { node: String, min: f64, max: f64 },
    #[error("more than one overflow sink")] MultipleOverflowSinks,
    #[error("overflow node id does not name the sink: {0}")] OverflowSinkMismatch(String),
    #[error("overflow sink is not editable: {0}")] SinkNotEditable(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("max_iterations must be at least 1")] ZeroIterations,
    #[error("convergence threshold must be positive and finite: {0}")] InvalidThreshold(f64),
    #[error("unknown sink policy: {0}")] UnknownSinkPolicy(String),
}

#[derive(Error, Debug)]
pub enum TbffError {
    #[error(transparent)] Network(#[from] NetworkError),
    #[error(transparent)] Config(#[from] ConfigError),
    #[error("serialization: {0}")] Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_reference_message_names_both_ids() {
        let err = NetworkError::DanglingReference {
            allocation: "alloc_1".into(),
            node: "ghost".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("alloc_1"));
        assert!(msg.contains("ghost"));
    }

    #[test]
    fn umbrella_converts_from_network_error() {
        let err: TbffError = NetworkError::UnknownNode("a".into()).into();
        assert!(matches!(err, TbffError::Network(NetworkError::UnknownNode(_))));
        assert_eq!(err.to_string(), "unknown node: a");
    }

    #[test]
    fn umbrella_converts_from_config_error() {
        let err: TbffError = ConfigError::ZeroIterations.into();
        assert!(matches!(err, TbffError::Config(ConfigError::ZeroIterations)));
    }
}
