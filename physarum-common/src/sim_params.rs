use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// Grid resolution must be a multiple of this so rows split evenly into parallel work.
pub const ROW_GRANULARITY: usize = 8;

/// Initial distribution of agent positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// Uniform over the whole grid.
    Uniform,
    /// Uniform over a disc around the grid center; `radius` is a fraction of `rez`.
    Disc { radius: f32 },
    /// Normal cluster around the grid center; `sigma` is a fraction of `rez`.
    Gaussian { sigma: f32 },
}

impl Default for Placement {
    fn default() -> Self {
        Placement::Uniform
    }
}

/// Initial content of both field buffers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldInit {
    Zero,
    /// Uniform noise in `[0, amplitude)`, identical in read and write buffers.
    Noise { amplitude: f32 },
}

impl Default for FieldInit {
    fn default() -> Self {
        FieldInit::Zero
    }
}

/// Simulation parameters, read by every stage on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    // Structural (changing these requires a reset)
    pub rez: usize,
    pub agent_count: usize,

    // Reset policy
    pub seed: u64,
    pub placement: Placement,
    pub field_init: FieldInit,

    // Trail
    pub trail_decay_factor: f32,
    pub diffusion_range: usize,
    pub deposit_amount: f32,

    // Sensors
    pub sensor_count: usize,
    pub sensor_range: f32,
    pub sensor_angle_deg: f32, // half-spread of the sensor fan
    pub debug_sensors: bool,

    // Physics
    pub mass: f32,
    pub drag: f32,
    pub speed: f32,
    pub sensor_force: f32,

    // Interaction
    pub brush_size: f32,
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            rez: 512,
            agent_count: 64,
            seed: 0,
            placement: Placement::Uniform,
            field_init: FieldInit::Zero,
            trail_decay_factor: 0.9,
            diffusion_range: 1,
            deposit_amount: 1.0,
            sensor_count: 3,
            sensor_range: 1.0,
            sensor_angle_deg: 45.0,
            debug_sensors: false,
            mass: 1.0,
            drag: 0.0,
            speed: 1.0,
            sensor_force: 1.0,
            brush_size: 10.0,
        }
    }
}

/// An invalid parameter combination.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    ZeroResolution,
    ResolutionGranularity { rez: usize, granularity: usize },
    NoAgents,
    DecayOutOfRange(f32),
    DiffusionTooWide { range: usize, rez: usize },
    NoSensors,
    NonFinite(&'static str),
    Negative(&'static str),
    NonPositiveMass(f32),
    DragOutOfRange(f32),
    InvalidPlacement(Placement),
    /// `rez` and `agent_count` can only change through a reset.
    StructuralChange(&'static str),
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroResolution => write!(f, "grid resolution must be greater than 0"),
            Self::ResolutionGranularity { rez, granularity } => {
                write!(f, "grid resolution {rez} is not a multiple of {granularity}")
            }
            Self::NoAgents => write!(f, "agent count must be greater than 0"),
            Self::DecayOutOfRange(d) => write!(f, "trail decay factor {d} is outside [0, 1]"),
            Self::DiffusionTooWide { range, rez } => {
                write!(f, "diffusion range {range} does not fit in a {rez}x{rez} grid")
            }
            Self::NoSensors => write!(f, "sensor count must be at least 1"),
            Self::NonFinite(name) => write!(f, "{name} must be finite"),
            Self::Negative(name) => write!(f, "{name} must not be negative"),
            Self::NonPositiveMass(m) => write!(f, "mass {m} must be positive"),
            Self::DragOutOfRange(d) => write!(f, "drag {d} is outside [0, 1]"),
            Self::InvalidPlacement(p) => write!(f, "invalid placement {p:?}"),
            Self::StructuralChange(name) => {
                write!(f, "{name} cannot change between ticks; reset instead")
            }
        }
    }
}

impl Error for ParamError {}

fn check_non_negative(name: &'static str, value: f32) -> Result<(), ParamError> {
    if !value.is_finite() {
        return Err(ParamError::NonFinite(name));
    }
    if value < 0.0 {
        return Err(ParamError::Negative(name));
    }
    Ok(())
}

impl SimParams {
    /// Checks every parameter combination the stages rely on.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.rez == 0 {
            return Err(ParamError::ZeroResolution);
        }
        if self.rez % ROW_GRANULARITY != 0 {
            return Err(ParamError::ResolutionGranularity {
                rez: self.rez,
                granularity: ROW_GRANULARITY,
            });
        }
        if self.agent_count == 0 {
            return Err(ParamError::NoAgents);
        }
        if !(0.0..=1.0).contains(&self.trail_decay_factor) {
            return Err(ParamError::DecayOutOfRange(self.trail_decay_factor));
        }
        // rez is non-zero here; equivalent to 2r + 1 > rez without overflow
        if self.diffusion_range > (self.rez - 1) / 2 {
            return Err(ParamError::DiffusionTooWide {
                range: self.diffusion_range,
                rez: self.rez,
            });
        }
        if self.sensor_count == 0 {
            return Err(ParamError::NoSensors);
        }
        check_non_negative("sensor_range", self.sensor_range)?;
        check_non_negative("sensor_angle_deg", self.sensor_angle_deg)?;
        check_non_negative("deposit_amount", self.deposit_amount)?;
        check_non_negative("speed", self.speed)?;
        check_non_negative("brush_size", self.brush_size)?;
        if !self.sensor_force.is_finite() {
            return Err(ParamError::NonFinite("sensor_force"));
        }
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(ParamError::NonPositiveMass(self.mass));
        }
        if !(0.0..=1.0).contains(&self.drag) {
            return Err(ParamError::DragOutOfRange(self.drag));
        }
        match self.placement {
            Placement::Uniform => {}
            Placement::Disc { radius } if radius.is_finite() && radius > 0.0 => {}
            Placement::Gaussian { sigma } if sigma.is_finite() && sigma > 0.0 => {}
            other => return Err(ParamError::InvalidPlacement(other)),
        }
        if let FieldInit::Noise { amplitude } = self.field_init {
            check_non_negative("field_init.amplitude", amplitude)?;
        }
        Ok(())
    }

    /// Validates `next` as a between-tick replacement for `self`.
    pub fn validate_update(&self, next: &SimParams) -> Result<(), ParamError> {
        if next.rez != self.rez {
            return Err(ParamError::StructuralChange("rez"));
        }
        if next.agent_count != self.agent_count {
            return Err(ParamError::StructuralChange("agent_count"));
        }
        next.validate()
    }

    /// Total number of field cells.
    #[inline(always)]
    pub fn num_cells(&self) -> usize {
        self.rez * self.rez
    }
}
