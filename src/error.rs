//! Error taxonomy for the engine lifecycle.
//!
//! Steady-state ticks do not fail; everything here is raised by lifecycle
//! calls (`reset`, `update_params`, or calls made in the wrong state).

use physarum_common::ParamError;
use std::error::Error;
use std::fmt;

/// Lifecycle state of an [`Engine`](crate::simulation::Engine).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed, no field or agents allocated yet.
    Uninitialized,
    /// Field and agents allocated; `step` may be called.
    Ready,
    /// A tick is in progress. Observed from outside only if a tick unwound.
    Stepping,
    /// Resources released; the engine accepts no further calls.
    ShutDown,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Stepping => "stepping",
            Self::ShutDown => "shut down",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the engine's lifecycle operations.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineError {
    /// Invalid parameter combination. The engine keeps its prior state.
    Configuration(ParamError),
    /// Field or agent storage could not be allocated. The engine keeps its prior state.
    ResourceExhaustion {
        /// Which store failed to allocate.
        what: &'static str,
        /// Number of elements requested.
        elements: usize,
    },
    /// The call requires a `Ready` engine.
    NotReady { state: EngineState },
    /// A previous tick did not complete; only `reset` recovers.
    Poisoned,
    /// The engine was shut down.
    ShutDown,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(e) => write!(f, "invalid configuration: {e}"),
            Self::ResourceExhaustion { what, elements } => {
                write!(f, "failed to allocate {elements} elements for {what}")
            }
            Self::NotReady { state } => write!(f, "engine is {state}, expected ready"),
            Self::Poisoned => write!(f, "a previous tick did not complete; reset required"),
            Self::ShutDown => write!(f, "engine has been shut down"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Configuration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParamError> for EngineError {
    fn from(e: ParamError) -> Self {
        Self::Configuration(e)
    }
}

/// Allocates a zero-filled buffer, reporting allocation failure instead of aborting.
pub(crate) fn try_alloc<T: Clone + Default>(
    what: &'static str,
    elements: usize,
) -> Result<Vec<T>, EngineError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(elements)
        .map_err(|_| EngineError::ResourceExhaustion { what, elements })?;
    buffer.resize(elements, T::default());
    Ok(buffer)
}
