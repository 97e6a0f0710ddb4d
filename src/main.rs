use anyhow::{Context, Result};
use log::{debug, info, trace, warn};
use std::time::Instant;

use physarum_common::SimulationConfig;
use physarum_engine::render::write_positions_csv;
use physarum_engine::{Engine, OutputFormat, ScriptedInteraction, SnapshotRecorder};

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    info!("Starting Physarum Engine...");

    // --- Load Configuration ---
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = SimulationConfig::load(&config_path)?;
    info!("Loaded configuration from {}", config_path);

    // --- Configure Rayon Thread Pool (Optional) ---
    if let Some(threads) = config.host.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure the rayon thread pool")?;
    }
    info!("Using {} Rayon threads.", rayon::current_num_threads());

    // --- Initialize Simulation ---
    let mut engine = Engine::new(config.get_sim_params());
    engine.reset().context("Failed to reset the simulation")?;
    debug!("Simulation Parameters: {:#?}", engine.params());

    let mut input = ScriptedInteraction::new(config.interaction.strokes.clone());
    if config.interaction.strokes.is_empty() {
        info!("No brush strokes configured.");
    } else {
        info!("Replaying {} brush strokes.", config.interaction.strokes.len());
    }

    let mut recorder = SnapshotRecorder::new(
        config.output.save_debug_in_snapshot,
        config.output.save_positions_in_snapshot,
    );
    if config.output.save_debug_in_snapshot && !config.sensors.debug {
        warn!(
            "save_debug_in_snapshot is set but sensors.debug is off; debug frames will be empty."
        );
    }

    // --- Host Frame Loop ---
    let host = &config.host;
    info!(
        "Running {} frames ({} ticks per active frame, every {} frame(s)); recording every {} frames.",
        host.total_frames, host.steps_per_frame, host.step_mod, host.record_interval_frames
    );

    let start_time = Instant::now();
    let mut previous_print_time = start_time;

    // Initial snapshot (tick 0)
    engine.render(&mut recorder).context("Failed to record initial snapshot")?;

    for frame in 0..host.total_frames {
        let frame_start_time = Instant::now();
        if frame % host.step_mod == 0 {
            for _ in 0..host.steps_per_frame {
                // A failing tick leaves the engine undefined; abort rather than continue.
                engine
                    .step(&mut input)
                    .with_context(|| format!("Simulation step failed during frame {}", frame))?;
            }
        }
        let frame_duration = frame_start_time.elapsed();

        let is_record_frame = (frame + 1) % host.record_interval_frames == 0;
        let is_last_frame = frame + 1 == host.total_frames;
        let should_print_status = previous_print_time.elapsed().as_secs_f64() >= 5.0;

        if is_record_frame || is_last_frame {
            engine
                .render(&mut recorder)
                .with_context(|| format!("Failed to record snapshot at frame {}", frame + 1))?;
        }

        if should_print_status || is_last_frame {
            let stats = engine.view()?.field.stats();
            info!(
                "Frame [{}/{}] | Ticks: {} | Trail mass: {:.2} | Max: {:.3} | Frame Time: {:6.2} ms | Elapsed: {:.2} s",
                frame + 1,
                host.total_frames,
                engine.tick_count(),
                stats.total_mass,
                stats.max_value,
                frame_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = Instant::now();
        } else {
            trace!(
                "Frame [{}/{}] completed in {:.2} ms",
                frame + 1,
                host.total_frames,
                frame_duration.as_secs_f64() * 1000.0
            );
        }
    }

    let total_duration = start_time.elapsed();
    info!(
        "Simulation finished {} ticks in {:.3} seconds.",
        engine.tick_count(),
        total_duration.as_secs_f64()
    );

    // --- Save Recorded Data ---
    let output = &config.output;
    if output.save_stats {
        let format = OutputFormat::from_name(output.format.as_deref());
        recorder.save(&output.base_filename, format)?;
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }

    if output.save_positions {
        let filename = format!("{}_final_positions.csv", output.base_filename);
        if let Some(agents) = engine.agents() {
            write_positions_csv(&filename, agents)?;
            info!("Final positions saved to {}", filename);
        }
    } else {
        info!("Skipping saving final positions as per config.");
    }

    engine.shutdown();
    info!("Simulation Complete.");
    Ok(())
}
