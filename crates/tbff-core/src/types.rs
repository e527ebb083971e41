//! Core network types: nodes, allocations, network snapshots.
//!
//! All flow quantities are `f64` units per cycle. Computed node fields
//! (`inflow`, `absorbed`, `outflow`, `status`) are written only by the
//! propagation engine; callers edit `external_flow` and allocations.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{OVERFLOW_SINK_NAME, OVERFLOW_SINK_X, OVERFLOW_SINK_Y};
use crate::error::TbffError;

/// Stable identifier of a node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Stable identifier of an allocation edge.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AllocationId(pub String);

impl AllocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AllocationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AllocationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for AllocationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Health of a node, derived from absorbed flow against its thresholds.
///
/// # Examples
///
/// ```
/// use tbff_core::types::NodeStatus;
/// assert_eq!(NodeStatus::default(), NodeStatus::Starved);
/// assert_eq!(NodeStatus::Saturated.to_string(), "saturated");
/// ```
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Absorbed flow is below `min_absorption`.
    #[default]
    Starved,
    /// Absorbed flow sits at `min_absorption`.
    Minimum,
    /// Between the thresholds.
    Healthy,
    /// Absorbed flow has reached `max_absorption`.
    Saturated,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starved => "starved",
            Self::Minimum => "minimum",
            Self::Healthy => "healthy",
            Self::Saturated => "saturated",
        };
        f.write_str(s)
    }
}

/// Layout position. Carried for the rendering layer, ignored by the engine.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Default position of a freshly inserted overflow sink.
    pub const fn overflow_sink() -> Self {
        Self::new(OVERFLOW_SINK_X, OVERFLOW_SINK_Y)
    }
}

/// `+inf` capacity is written as JSON `null` and read back from `null` or
/// an absent field.
mod unbounded {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if *value == f64::INFINITY {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }

    pub fn default() -> f64 {
        f64::INFINITY
    }
}

/// An account in the flow network.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Flow needed to leave the starved state.
    pub min_absorption: f64,
    /// Ceiling on absorbed flow. `+inf` for the overflow sink.
    #[serde(with = "unbounded", default = "unbounded::default")]
    pub max_absorption: f64,
    /// Total flow entering this node in the current cycle.
    #[serde(default)]
    pub inflow: f64,
    /// Portion of inflow retained.
    #[serde(default)]
    pub absorbed: f64,
    /// `inflow - absorbed`, forwarded along allocations.
    #[serde(default)]
    pub outflow: f64,
    #[serde(default)]
    pub status: NodeStatus,
    /// Flow injected by the caller every cycle.
    #[serde(default)]
    pub external_flow: f64,
    #[serde(default)]
    pub is_overflow_sink: bool,
}

impl FlowNode {
    /// A regular node with zeroed flow state.
    pub fn new(
        id: impl Into<NodeId>,
        name: impl Into<String>,
        min_absorption: f64,
        max_absorption: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            x: 0.0,
            y: 0.0,
            min_absorption,
            max_absorption,
            inflow: 0.0,
            absorbed: 0.0,
            outflow: 0.0,
            status: NodeStatus::Starved,
            external_flow: 0.0,
            is_overflow_sink: false,
        }
    }

    /// The synthetic catch-all sink: no minimum, unbounded capacity.
    pub fn overflow_sink(id: impl Into<NodeId>, position: Position) -> Self {
        Self {
            x: position.x,
            y: position.y,
            status: NodeStatus::Healthy,
            is_overflow_sink: true,
            ..Self::new(id, OVERFLOW_SINK_NAME, 0.0, f64::INFINITY)
        }
    }

    pub fn with_external_flow(mut self, external_flow: f64) -> Self {
        self.external_flow = external_flow;
        self
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_absorption == f64::INFINITY
    }
}

/// A percentage-weighted directed edge routing part of a node's outflow.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub id: AllocationId,
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    /// Fraction of the source's outflow, in `[0, 1]`.
    pub percentage: f64,
}

impl Allocation {
    pub fn new(
        id: impl Into<AllocationId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        percentage: f64,
    ) -> Self {
        Self {
            id: id.into(),
            source_node_id: source.into(),
            target_node_id: target.into(),
            percentage,
        }
    }
}

/// A network snapshot: nodes, allocations and derived totals.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FlowNetwork {
    #[serde(default)]
    pub name: String,
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
    /// Sum of `external_flow` over all nodes.
    #[serde(default)]
    pub total_inflow: f64,
    /// Sum of `absorbed` over all nodes.
    #[serde(default)]
    pub total_absorbed: f64,
    /// Sum of `outflow` over all nodes.
    #[serde(default)]
    pub total_outflow: f64,
    /// Back-reference to the overflow sink, owned by `nodes`.
    #[serde(default)]
    pub overflow_node_id: Option<NodeId>,
}

impl FlowNetwork {
    /// Assemble a snapshot with zeroed totals and no overflow sink.
    pub fn new(name: impl Into<String>, nodes: Vec<FlowNode>, allocations: Vec<Allocation>) -> Self {
        Self {
            name: name.into(),
            nodes,
            allocations,
            ..Self::default()
        }
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id.as_str() == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut FlowNode> {
        self.nodes.iter_mut().find(|n| n.id.as_str() == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn allocation(&self, id: &str) -> Option<&Allocation> {
        self.allocations.iter().find(|a| a.id.as_str() == id)
    }

    /// Allocations leaving `node_id`, in insertion order.
    pub fn outgoing<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Allocation> + 'a {
        self.allocations
            .iter()
            .filter(move |a| a.source_node_id.as_str() == node_id)
    }

    pub fn has_outgoing(&self, node_id: &str) -> bool {
        self.outgoing(node_id).next().is_some()
    }

    /// The overflow sink referenced by `overflow_node_id`, if present.
    pub fn overflow_sink(&self) -> Option<&FlowNode> {
        self.overflow_node_id
            .as_ref()
            .and_then(|id| self.node(id.as_str()))
    }

    /// Parse a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, TbffError> {
        serde_json::from_str(json).map_err(|e| TbffError::Serialization(e.to_string()))
    }

    /// Pretty-printed JSON encoding.
    pub fn to_json_pretty(&self) -> Result<String, TbffError> {
        serde_json::to_string_pretty(self).map_err(|e| TbffError::Serialization(e.to_string()))
    }
}

/// Animation seed for one particle travelling along an edge.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticleSpec {
    pub id: String,
    /// Allocation id, or `virtual_<node>_overflow` for sink-bound flow.
    pub allocation_id: String,
    /// Position along the edge in `[0, 1)`.
    pub progress: f64,
    pub amount: f64,
    pub speed: f64,
}

/// Outcome of one propagation run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropagationResult {
    pub network: FlowNetwork,
    /// Iterations executed, at most the configured cap.
    pub iterations: u32,
    /// `false` when the cap was reached first; the state is best-effort.
    pub converged: bool,
    pub particles: Vec<ParticleSpec>,
}
