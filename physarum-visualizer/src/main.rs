use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Builder;
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_circle_mut;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn, LevelFilter};
use palette::{FromColor, Hsv, Srgb};
use physarum_common::{FieldSnapshot, SimulationConfig};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input snapshot file path (.bin, written with format = "bincode")
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the PNG frames are written to
    #[arg(short, long, default_value = "frames")]
    output: PathBuf,

    /// Pixels per field cell along each axis
    #[arg(long, default_value_t = 2)]
    scale: u32,

    /// Normalize every frame against the brightest value of the whole run
    /// instead of its own maximum
    #[arg(long)]
    global_max: bool,

    /// Tint cells hit by sensors (needs snapshots recorded with debug data)
    #[arg(long)]
    debug_overlay: bool,

    /// Draw the brush outline when a brush was active
    #[arg(long)]
    brush: bool,

    /// Plot agent positions (needs snapshots recorded with positions)
    #[arg(long)]
    agents: bool,

    /// Optional path to the config.toml the run was made with
    #[arg(long)]
    config: Option<PathBuf>,

    /// Snapshots decoded and rendered per parallel batch
    #[arg(long, default_value_t = 16)]
    chunk_size: usize,
}

/// Settings shared by every rendered frame.
#[derive(Debug, Clone, Copy)]
struct RenderSettings {
    scale: u32,
    /// Overrides the per-frame maximum when set.
    normalize_to: Option<f32>,
    debug_overlay: bool,
    brush: bool,
    agents: bool,
}

const BRUSH_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const AGENT_COLOR: Rgba<u8> = Rgba([255, 80, 80, 255]);
const DEBUG_TINT: [f32; 3] = [0.0, 255.0, 140.0];

/// Maps a normalized trail intensity in `[0, 1]` to a color.
///
/// Dark violet for empty cells, through blue and teal, to pale amber for
/// saturated ones.
fn trail_color(t: f32) -> [u8; 3] {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let hue = 270.0 - 230.0 * t;
    let saturation = 0.9 - 0.5 * t;
    let value = 0.05 + 0.95 * t.sqrt();
    let rgb = Srgb::from_color(Hsv::new(hue, saturation, value));
    [
        (rgb.red * 255.0).round() as u8,
        (rgb.green * 255.0).round() as u8,
        (rgb.blue * 255.0).round() as u8,
    ]
}

/// Log-scaled normalization; trails span several orders of magnitude.
fn normalize(value: f32, max: f32) -> f32 {
    if max <= 0.0 || value <= 0.0 {
        return 0.0;
    }
    (value.ln_1p() / max.ln_1p()).min(1.0)
}

fn blend(base: [u8; 3], tint: [f32; 3], amount: f32) -> [u8; 3] {
    let amount = amount.clamp(0.0, 1.0);
    let mut out = [0u8; 3];
    for c in 0..3 {
        out[c] = (base[c] as f32 * (1.0 - amount) + tint[c] * amount).round() as u8;
    }
    out
}

/// Pixel covering grid position `(x, y)`, using the same flipped mapping as the cells.
fn to_pixel(x: f32, y: f32, scale: u32, size: u32) -> (i32, i32) {
    let px = (x * scale as f32).floor() as i32;
    let py = size as i32 - 1 - (y * scale as f32).floor() as i32;
    (px, py)
}

/// Renders one snapshot to an RGBA image of `rez * scale` pixels per side.
fn render_frame(snapshot: &FieldSnapshot, settings: &RenderSettings) -> Result<RgbaImage> {
    let rez = snapshot.rez as usize;
    if snapshot.field.len() != rez * rez {
        bail!(
            "snapshot at tick {} has {} cells, expected {}",
            snapshot.tick,
            snapshot.field.len(),
            rez * rez
        );
    }
    let scale = settings.scale.max(1);
    let size = snapshot.rez * scale;
    let max = settings.normalize_to.unwrap_or(snapshot.stats.max_value);

    let debug = snapshot
        .debug
        .as_deref()
        .filter(|d| settings.debug_overlay && d.len() == rez * rez);
    let max_hits = debug.map_or(0.0, |d| d.iter().copied().fold(0.0f32, f32::max));

    // Row 0 of the field is drawn at the bottom.
    let mut image = RgbaImage::from_fn(size, size, |px, py| {
        let x = (px / scale) as usize;
        let y = rez - 1 - (py / scale) as usize;
        let i = y * rez + x;
        let mut rgb = trail_color(normalize(snapshot.field[i], max));
        if let Some(hits) = debug {
            if hits[i] > 0.0 && max_hits > 0.0 {
                rgb = blend(rgb, DEBUG_TINT, 0.3 + 0.7 * hits[i] / max_hits);
            }
        }
        Rgba([rgb[0], rgb[1], rgb[2], 255])
    });

    if settings.agents {
        if let Some(positions) = &snapshot.positions {
            for &(x, y) in positions {
                let (px, py) = to_pixel(x, y, scale, size);
                if px >= 0 && py >= 0 && (px as u32) < size && (py as u32) < size {
                    image.put_pixel(px as u32, py as u32, AGENT_COLOR);
                }
            }
        }
    }

    if settings.brush {
        if let Some((x, y)) = snapshot.interaction {
            let radius = (snapshot.brush_size * scale as f32).round() as i32;
            if radius > 0 {
                let center = to_pixel(x, y, scale, size);
                draw_hollow_circle_mut(&mut image, center, radius, BRUSH_COLOR);
            }
        }
    }

    Ok(image)
}

fn frame_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("frame_{:05}.png", index))
}

/// Decodes the next `count` snapshots from a bincode stream.
fn read_chunk<R: Read>(reader: &mut R, count: usize) -> Result<Vec<FieldSnapshot>> {
    (0..count)
        .map(|_| bincode::deserialize_from(&mut *reader).context("Failed to decode snapshot"))
        .collect()
}

/// Reads the `u32` snapshot count that prefixes the stream.
fn read_header<R: Read>(reader: &mut R) -> Result<u32> {
    bincode::deserialize_from(reader).context("Failed to read snapshot count from header")
}

/// First pass over the stream for `--global-max`.
fn scan_global_max(path: &Path) -> Result<f32> {
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("Failed to open input file: {}", path.display()))?,
    );
    let count = read_header(&mut reader)?;
    let mut max = 0.0f32;
    for _ in 0..count {
        let snapshot: FieldSnapshot =
            bincode::deserialize_from(&mut reader).context("Failed to decode snapshot")?;
        max = max.max(snapshot.stats.max_value);
    }
    Ok(max)
}

fn main() -> Result<()> {
    let args = Args::parse();
    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    Builder::from_default_env().filter(None, LevelFilter::Info).init();

    info!("Starting Physarum Visualizer...");
    info!("Input file: {}", args.input.display());
    info!("Output directory: {}", args.output.display());

    let mut expected_rez = None;
    if let Some(config_path) = &args.config {
        match SimulationConfig::load(config_path) {
            Ok(config) => {
                let params = config.get_sim_params();
                info!(
                    "Run configuration: {}x{} field, {} agents, decay {}, diffusion range {}.",
                    params.rez,
                    params.rez,
                    params.agent_count,
                    params.trail_decay_factor,
                    params.diffusion_range
                );
                expected_rez = Some(params.rez);
            }
            Err(e) => warn!("Failed to load config file '{}': {:#}", config_path.display(), e),
        }
    }

    let normalize_to = if args.global_max {
        let max = scan_global_max(&args.input)?;
        info!("Normalizing all frames to a maximum trail value of {:.4}", max);
        Some(max)
    } else {
        None
    };
    let settings = RenderSettings {
        scale: args.scale,
        normalize_to,
        debug_overlay: args.debug_overlay,
        brush: args.brush,
        agents: args.agents,
    };

    let input_file = File::open(&args.input)
        .with_context(|| format!("Failed to open input file: {}", args.input.display()))?;
    let mut reader = BufReader::new(input_file);
    let snapshot_count = read_header(&mut reader)? as usize;
    info!("Found {} snapshots in the file", snapshot_count);
    if snapshot_count == 0 {
        warn!("Input file contains no snapshots. Exiting.");
        return Ok(());
    }

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory {}", args.output.display()))?;

    let progress_bar = ProgressBar::new(snapshot_count as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template(
                "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) [{eta}]",
            )?
            .progress_chars("#>-"),
    );

    let start_time = Instant::now();
    let chunk_size = args.chunk_size.max(1);
    let mut written = 0usize;
    let mut warned_rez = false;

    while written < snapshot_count {
        let chunk = read_chunk(&mut reader, chunk_size.min(snapshot_count - written))
            .with_context(|| format!("Failed reading snapshots after frame {}", written))?;

        if let (Some(rez), Some(first)) = (expected_rez, chunk.first()) {
            if first.rez as usize != rez && !warned_rez {
                warn!("Snapshot resolution {} differs from config resolution {}.", first.rez, rez);
                warned_rez = true;
            }
        }

        let base_index = written;
        chunk
            .par_iter()
            .enumerate()
            .try_for_each(|(i, snapshot)| -> Result<()> {
                let image = render_frame(snapshot, &settings)?;
                let path = frame_path(&args.output, base_index + i);
                image
                    .save(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                debug!("Tick {} -> {}", snapshot.tick, path.display());
                progress_bar.inc(1);
                Ok(())
            })?;
        written += chunk.len();
    }

    progress_bar.finish_with_message(format!("Rendered {} frames", written));
    let duration = start_time.elapsed();
    info!(
        "Rendering completed in {:.2?} ({:.1} frames per second)",
        duration,
        written as f64 / duration.as_secs_f64()
    );
    info!("Frames saved to: {}", args.output.display());
    Ok(())
}
