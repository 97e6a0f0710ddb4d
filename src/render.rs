//! Render-side collaborators.
//!
//! The engine hands a read-only [`FieldView`] of the published buffer to a
//! [`FieldObserver`]. [`SnapshotRecorder`] is the headless observer: it copies
//! views into [`FieldSnapshot`]s and writes them out for the visualizer.

use crate::agents::AgentStore;
use crate::field::Grid;
use anyhow::{Context, Result};
use log::{info, warn};
use physarum_common::{FieldSnapshot, SimParams, Vec2};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Read-only view of the latest published state.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    /// Number of ticks completed so far.
    pub tick: u64,
    pub params: &'a SimParams,
    /// The published (read) buffer.
    pub field: &'a Grid,
    /// Sensor hits from the last tick; all zero unless sensor debugging is on.
    pub debug: &'a Grid,
    pub agents: &'a AgentStore,
    /// Brush center used by the last tick.
    pub interaction: Option<Vec2>,
}

/// Consumes the published field, typically once per host frame.
pub trait FieldObserver {
    fn observe(&mut self, view: &FieldView<'_>) -> Result<()>;
}

/// On-disk encoding for recorded snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    /// u32 snapshot count followed by the snapshots; the visualizer reads this.
    Bincode,
    MessagePack,
}

impl OutputFormat {
    /// Parses the config name, falling back to JSON for unknown names.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.unwrap_or("json") {
            "json" => OutputFormat::Json,
            "bincode" => OutputFormat::Bincode,
            "messagepack" => OutputFormat::MessagePack,
            other => {
                warn!("Unknown output format: {}. Using JSON instead.", other);
                OutputFormat::Json
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Bincode => "bin",
            OutputFormat::MessagePack => "msgpack",
        }
    }
}

/// Collects field snapshots in memory.
#[derive(Debug, Default)]
pub struct SnapshotRecorder {
    include_debug: bool,
    include_positions: bool,
    snapshots: Vec<FieldSnapshot>,
}

impl SnapshotRecorder {
    pub fn new(include_debug: bool, include_positions: bool) -> Self {
        Self { include_debug, include_positions, snapshots: Vec::new() }
    }

    pub fn snapshots(&self) -> &[FieldSnapshot] {
        &self.snapshots
    }

    /// Writes all snapshots to `{base_filename}_snapshots.{ext}` and returns the path.
    pub fn save(&self, base_filename: &str, format: OutputFormat) -> Result<PathBuf> {
        let path = PathBuf::from(format!("{}_snapshots.{}", base_filename, format.extension()));
        let file = File::create(&path)
            .with_context(|| format!("Error creating snapshot file '{}'", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer, format)
            .with_context(|| format!("Error writing snapshots to '{}'", path.display()))?;
        writer.flush()?;
        info!("All {} snapshots saved to {}", self.snapshots.len(), path.display());
        Ok(path)
    }

    /// Encodes all snapshots into `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Json => serde_json::to_writer(writer, &self.snapshots)?,
            OutputFormat::Bincode => {
                let count = u32::try_from(self.snapshots.len()).context("Too many snapshots")?;
                bincode::serialize_into(&mut *writer, &count)?;
                for snapshot in &self.snapshots {
                    bincode::serialize_into(&mut *writer, snapshot)?;
                }
            }
            OutputFormat::MessagePack => rmp_serde::encode::write(writer, &self.snapshots)?,
        }
        Ok(())
    }
}

impl FieldObserver for SnapshotRecorder {
    fn observe(&mut self, view: &FieldView<'_>) -> Result<()> {
        let snapshot = FieldSnapshot {
            tick: view.tick,
            rez: u32::try_from(view.field.rez()).context("Grid too large to record")?,
            agent_count: u32::try_from(view.agents.len()).context("Too many agents to record")?,
            stats: view.field.stats(),
            field: view.field.as_slice().to_vec(),
            debug: self.include_debug.then(|| view.debug.as_slice().to_vec()),
            interaction: view.interaction.map(|c| (c.x, c.y)),
            brush_size: view.params.brush_size,
            positions: self.include_positions.then(|| view.agents.positions()),
        };
        log::debug!(
            "Recorded snapshot at tick {} (mass {:.3}, max {:.3}).",
            snapshot.tick,
            snapshot.stats.total_mass,
            snapshot.stats.max_value
        );
        self.snapshots.push(snapshot);
        Ok(())
    }
}

/// Writes final agent positions as CSV (`x,y` header).
pub fn write_positions_csv<P: AsRef<Path>>(path: P, agents: &AgentStore) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Error creating CSV file '{}'", path.display()))?;
    writer.write_record(["x", "y"])?;
    for agent in agents.iter() {
        writer.write_record(&[
            format!("{:.4}", agent.position.x),
            format!("{:.4}", agent.position.y),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
