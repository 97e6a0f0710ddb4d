pub mod config;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{
    AgentsConfig, GridConfig, HostConfig, InteractionConfig, OutputConfig, PhysicsConfig,
    SensorsConfig, SimulationConfig, StrokeConfig, TrailConfig,
};
pub use sim_params::{FieldInit, ParamError, Placement, SimParams, ROW_GRANULARITY};
pub use snapshot::{FieldSnapshot, FieldStats};
pub use vecmath::{angle_to_vec, Vec2};
