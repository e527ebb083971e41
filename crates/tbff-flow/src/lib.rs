//! # tbff-flow — Flow propagation engine.
//!
//! Computes how flow circulates through a network of accounts:
//! - **Normalization**: outgoing percentages of every node sum to 1, and a
//!   lone allocation is forced to 100%.
//! - **Absorption**: each node keeps `min(inflow, max_absorption)` and
//!   forwards the rest.
//! - **Propagation**: synchronous iterations redistribute outflow along
//!   allocations until the largest inflow change drops below the
//!   convergence threshold or the iteration cap is hit.
//! - **Overflow sink**: a synthetic node is inserted to absorb outflow that
//!   has nowhere to go, and removed once it is no longer needed.

pub mod config;
pub mod edit;
pub mod engine;
pub mod node;
pub mod normalize;
pub mod observer;
pub mod overflow;
pub mod particles;
pub mod totals;

pub use config::{EngineConfig, SinkPolicy};
pub use edit::{
    create_allocation, delete_allocation, normalize_all, normalize_outgoing, set_external_flow,
    update_allocation_percentage,
};
pub use engine::FlowEngine;
pub use node::{node_status, refresh_snapshot, update_node_properties};
pub use normalize::normalize_allocations;
pub use observer::TracingObserver;
pub use totals::{NetworkTotals, network_totals, recompute_totals};
