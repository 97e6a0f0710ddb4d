use crate::sim_params::{FieldInit, Placement, SimParams};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// Grid settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GridConfig {
    #[serde(default = "default_rez")]
    pub rez: usize,
    #[serde(default)]
    pub field_init: FieldInit,
}

// Agent population and its initial distribution
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AgentsConfig {
    #[serde(default = "default_agent_count")]
    pub count: usize,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub placement: Placement,
}

// Trail field behaviour
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TrailConfig {
    #[serde(default = "default_decay")]
    pub decay_factor: f32,
    #[serde(default = "default_diffusion_range")]
    pub diffusion_range: usize,
    #[serde(default = "default_one")]
    pub deposit_amount: f32,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SensorsConfig {
    #[serde(default = "default_sensor_count")]
    pub count: usize,
    #[serde(default = "default_one")]
    pub range: f32,
    #[serde(default = "default_sensor_angle")]
    pub angle_deg: f32,
    /// Write sensor tip hits into the debug channel for the renderer.
    #[serde(default)]
    pub debug: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PhysicsConfig {
    #[serde(default = "default_one")]
    pub mass: f32,
    #[serde(default)]
    pub drag: f32,
    #[serde(default = "default_one")]
    pub speed: f32,
    #[serde(default = "default_one")]
    pub sensor_force: f32,
}

/// One scripted brush stroke, active for ticks in `[start_tick, end_tick)`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct StrokeConfig {
    pub start_tick: u64,
    pub end_tick: u64,
    pub x: f32,
    pub y: f32,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InteractionConfig {
    #[serde(default = "default_brush_size")]
    pub brush_size: f32,
    #[serde(default)]
    pub strokes: Vec<StrokeConfig>,
}

// Host driver cadence (how the binary schedules ticks per frame)
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct HostConfig {
    #[serde(default = "default_steps_per_frame")]
    pub steps_per_frame: u32,
    /// Ticks only run on frames where `frame % step_mod == 0`.
    #[serde(default = "default_step_mod")]
    pub step_mod: u32,
    #[serde(default = "default_total_frames")]
    pub total_frames: u32,
    #[serde(default = "default_record_interval")]
    pub record_interval_frames: u32,
    #[serde(default)]
    pub threads: Option<usize>,
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_base_filename")]
    pub base_filename: String,
    #[serde(default = "default_true")]
    pub save_stats: bool,
    #[serde(default)]
    pub save_positions: bool,
    #[serde(default)]
    pub save_positions_in_snapshot: bool,
    #[serde(default)]
    pub save_debug_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

/// Main configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SimulationConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub trail: TrailConfig,
    #[serde(default)]
    pub sensors: SensorsConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_rez() -> usize {
    512
}

fn default_agent_count() -> usize {
    64
}

fn default_decay() -> f32 {
    0.9
}

fn default_diffusion_range() -> usize {
    1
}

fn default_sensor_count() -> usize {
    3
}

fn default_sensor_angle() -> f32 {
    45.0
}

fn default_brush_size() -> f32 {
    10.0
}

fn default_steps_per_frame() -> u32 {
    1
}

fn default_step_mod() -> u32 {
    1
}

fn default_total_frames() -> u32 {
    600
}

fn default_record_interval() -> u32 {
    10
}

fn default_one() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_base_filename() -> String {
    "physarum".to_string()
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig { rez: default_rez(), field_init: FieldInit::Zero }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        AgentsConfig { count: default_agent_count(), seed: 0, placement: Placement::Uniform }
    }
}

impl Default for TrailConfig {
    fn default() -> Self {
        TrailConfig {
            decay_factor: default_decay(),
            diffusion_range: default_diffusion_range(),
            deposit_amount: default_one(),
        }
    }
}

impl Default for SensorsConfig {
    fn default() -> Self {
        SensorsConfig {
            count: default_sensor_count(),
            range: default_one(),
            angle_deg: default_sensor_angle(),
            debug: false,
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig { mass: 1.0, drag: 0.0, speed: 1.0, sensor_force: 1.0 }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        InteractionConfig { brush_size: default_brush_size(), strokes: Vec::new() }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            steps_per_frame: default_steps_per_frame(),
            step_mod: default_step_mod(),
            total_frames: default_total_frames(),
            record_interval_frames: default_record_interval(),
            threads: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: default_base_filename(),
            save_stats: true,
            save_positions: false,
            save_positions_in_snapshot: false,
            save_debug_in_snapshot: false,
            format: None,
        }
    }
}

impl SimulationConfig {
    /// Loads the configuration from a TOML file and validates it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read config file '{}'", path_ref.display()))?;
        let config = Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config in '{}'", path_ref.display()))?;
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(text).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.get_sim_params()
            .validate()
            .context("Invalid simulation parameters")?;
        if self.host.step_mod == 0 {
            anyhow::bail!("host.step_mod must be at least 1.");
        }
        if self.host.record_interval_frames == 0 {
            anyhow::bail!("host.record_interval_frames must be at least 1.");
        }
        if let Some(bad) = self.interaction.strokes.iter().find(|s| s.end_tick < s.start_tick) {
            anyhow::bail!(
                "Stroke ending at tick {} starts later, at tick {}.",
                bad.end_tick,
                bad.start_tick
            );
        }
        Ok(())
    }

    /// Flattens the configuration into the parameters the engine reads each tick.
    pub fn get_sim_params(&self) -> SimParams {
        SimParams {
            rez: self.grid.rez,
            agent_count: self.agents.count,
            seed: self.agents.seed,
            placement: self.agents.placement,
            field_init: self.grid.field_init,
            trail_decay_factor: self.trail.decay_factor,
            diffusion_range: self.trail.diffusion_range,
            deposit_amount: self.trail.deposit_amount,
            sensor_count: self.sensors.count,
            sensor_range: self.sensors.range,
            sensor_angle_deg: self.sensors.angle_deg,
            debug_sensors: self.sensors.debug,
            mass: self.physics.mass,
            drag: self.physics.drag,
            speed: self.physics.speed,
            sensor_force: self.physics.sensor_force,
            brush_size: self.interaction.brush_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_host_defaults() {
        let config = SimulationConfig::from_toml_str("").unwrap();
        assert_eq!(config.get_sim_params(), SimParams::default());
        assert_eq!(config.host.steps_per_frame, 1);
        assert_eq!(config.host.step_mod, 1);
    }

    #[test]
    fn parses_sections_and_tagged_enums() {
        let text = r#"
            [grid]
            rez = 256
            field_init = { kind = "noise", amplitude = 0.5 }

            [agents]
            count = 1000
            seed = 7
            placement = { kind = "disc", radius = 0.25 }

            [trail]
            decay_factor = 0.95
            diffusion_range = 2

            [interaction]
            brush_size = 6.0
            strokes = [{ start_tick = 10, end_tick = 40, x = 128.0, y = 64.0 }]

            [host]
            steps_per_frame = 4
            step_mod = 2
        "#;
        let config = SimulationConfig::from_toml_str(text).unwrap();
        let params = config.get_sim_params();
        assert_eq!(params.rez, 256);
        assert_eq!(params.agent_count, 1000);
        assert_eq!(params.field_init, FieldInit::Noise { amplitude: 0.5 });
        assert_eq!(params.placement, Placement::Disc { radius: 0.25 });
        assert_eq!(params.diffusion_range, 2);
        assert_eq!(config.interaction.strokes.len(), 1);
        assert_eq!(config.host.steps_per_frame, 4);
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(SimulationConfig::from_toml_str("[agents]\ncount = 0\n").is_err());
        assert!(SimulationConfig::from_toml_str("[host]\nstep_mod = 0\n").is_err());
        assert!(SimulationConfig::from_toml_str("[grid]\nrez = 100\n").is_err());
    }
}
