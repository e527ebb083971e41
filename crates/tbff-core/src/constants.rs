//! Engine constants. All flow quantities are per-cycle units as `f64`.

/// Upper bound on synchronous propagation iterations per run.
pub const MAX_ITERATIONS: u32 = 100;

/// Propagation converges once the largest per-node inflow change between
/// two consecutive iterations drops below this value.
pub const CONVERGENCE_THRESHOLD: f64 = 0.01;

/// Outgoing percentages within this distance of 1.0 are left untouched by
/// the normalizer.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-4;

/// Absorbed flow within this distance of `min_absorption` reports
/// [`NodeStatus::Minimum`](crate::types::NodeStatus::Minimum).
pub const MINIMUM_STATUS_TOLERANCE: f64 = 0.01;

/// Outflow above this value with no outgoing allocation requires an
/// overflow sink.
pub const OVERFLOW_OUTFLOW_THRESHOLD: f64 = 0.01;

/// Preferred identifier of the synthetic overflow sink.
pub const OVERFLOW_SINK_ID: &str = "overflow-sink";

/// Display name of the synthetic overflow sink.
pub const OVERFLOW_SINK_NAME: &str = "Overflow";

/// Default layout position of a freshly inserted sink.
pub const OVERFLOW_SINK_X: f64 = 600.0;
pub const OVERFLOW_SINK_Y: f64 = 300.0;

/// Percentage given to a newly drawn allocation before normalization.
pub const DEFAULT_ALLOCATION_PERCENTAGE: f64 = 0.5;

/// Prefix for generated allocation identifiers (`alloc_<n>`).
pub const ALLOCATION_ID_PREFIX: &str = "alloc_";

// --- Particle seeding ---

/// Flow units represented by one particle on an allocation edge.
pub const PARTICLE_FLOW_UNIT: f64 = 10.0;

/// Maximum particles seeded on a single allocation edge.
pub const MAX_PARTICLES_PER_EDGE: usize = 10;

/// Flow units represented by one particle on a virtual overflow edge.
pub const OVERFLOW_PARTICLE_FLOW_UNIT: f64 = 20.0;

/// Maximum particles seeded on a single virtual overflow edge.
pub const MAX_OVERFLOW_PARTICLES: usize = 5;

/// Base particle speed (progress per animation frame).
pub const PARTICLE_BASE_SPEED: f64 = 0.01;

/// Flow amount that adds 1.0 to a particle's speed.
pub const PARTICLE_SPEED_DIVISOR: f64 = 1000.0;
