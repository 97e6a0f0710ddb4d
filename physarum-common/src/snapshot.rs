use serde::{Deserialize, Serialize};

/// Summary statistics of a field buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    /// Sum of all cell values.
    pub total_mass: f64,
    pub max_value: f32,
    pub mean_value: f32,
}

/// A render-side copy of the published field at a specific tick.
///
/// Snapshots only flow outward to renderers; the engine never loads one back.
/// Every field is always serialized so the stream stays readable by bincode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSnapshot {
    /// Number of ticks completed when the snapshot was taken.
    pub tick: u64,
    /// Side length of the square field.
    pub rez: u32,
    pub agent_count: u32,
    pub stats: FieldStats,
    /// Row-major copy of the read buffer (`y * rez + x`).
    pub field: Vec<f32>,
    /// Sensor hit counts for the last tick, if requested.
    pub debug: Option<Vec<f32>>,
    /// Brush center active during the last tick.
    pub interaction: Option<(f32, f32)>,
    /// Brush radius in cells, for drawing the brush outline.
    pub brush_size: f32,
    /// Optional: raw [x, y] positions of all agents.
    pub positions: Option<Vec<(f32, f32)>>,
}
