//! Physarum trail-network simulation engine.
//!
//! A fixed population of agents senses and deposits onto a diffusing,
//! decaying trail field on a toroidal grid. [`Engine`] owns all state and
//! sequences the stages; renderers and input devices plug in through
//! [`FieldObserver`] and [`InteractionSource`].

pub mod agents;
pub mod counters;
pub mod deposition;
pub mod diffusion;
pub mod error;
pub mod field;
pub mod interaction;
pub mod render;
pub mod sensing;
pub mod simulation;

pub use agents::{Agent, AgentStore};
pub use error::{EngineError, EngineState};
pub use field::{Field, Grid};
pub use interaction::{FixedInteraction, InteractionSource, NoInteraction, ScriptedInteraction};
pub use render::{FieldObserver, FieldView, OutputFormat, SnapshotRecorder};
pub use simulation::{runs_field_cycle, Engine, TickReport};

pub use physarum_common as common;
