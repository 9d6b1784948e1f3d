//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::Overrides;
use contracts::DatasetBlueprint;
use tokio::sync::watch;
use tracing::{info, warn};

use super::{describe_camera, load_blueprint};
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let max_ticks = apply_overrides(&mut blueprint, args)?;

    info!(
        map = %blueprint.world.map,
        delta_seconds = blueprint.world.delta_seconds,
        traffic = blueprint.world.traffic_vehicles,
        stride = blueprint.collection.tick_stride,
        max_ticks = ?max_ticks,
        output = %blueprint.output_dir().display(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint, max_ticks);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        max_ticks,
    });

    // Setup graceful shutdown handler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, finishing current tick...");
        let _ = shutdown_tx.send(true);
    });

    info!("Starting collection...");
    let result = pipeline.run(shutdown_rx).await;
    signal_task.abort();

    let stats = result.context("Collection run failed")?;
    info!(
        ticks = stats.summary.ticks,
        frames_recorded = stats.summary.frames_recorded,
        partial_frames = stats.summary.partial_frames,
        duration_secs = stats.duration.as_secs_f64(),
        ticks_per_second = format!("{:.2}", stats.ticks_per_second()),
        "Collection completed"
    );
    stats.print_summary();

    info!("CARLA Dataset finished");
    Ok(())
}

/// Apply CLI overrides and re-validate; returns the effective tick limit
fn apply_overrides(blueprint: &mut DatasetBlueprint, args: &RunArgs) -> Result<Option<u64>, CliError> {
    if let Some(ref output) = args.output {
        info!(output = %output.display(), "Overriding output root from CLI");
    }
    let overrides = Overrides {
        output: args.output.clone(),
        max_ticks: args.max_ticks,
    };
    Ok(overrides.apply(blueprint)?)
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &DatasetBlueprint, max_ticks: Option<u64>) {
    let world = &blueprint.world;
    let collection = &blueprint.collection;

    println!("\n=== Configuration Summary ===\n");
    println!("World:");
    println!("  Map: {}", world.map);
    println!("  Delta seconds: {}", world.delta_seconds);
    println!("  Traffic vehicles: {}", world.traffic_vehicles);
    match world.seed {
        Some(seed) => println!("  Seed: {}", seed),
        None => println!("  Seed: random"),
    }

    println!("\nEgo: {}", blueprint.ego.blueprint);
    println!("\nSensors:");
    println!("  camera:   {}", describe_camera(&blueprint.sensors.camera));
    println!("  semantic: {}", describe_camera(&blueprint.sensors.semantic));
    println!("  instance: {}", describe_camera(&blueprint.sensors.instance));
    println!("  gnss:     noise {}", if blueprint.sensors.gnss.noise.is_zero() { "off" } else { "on" });

    println!("\nCollection:");
    println!("  Tick stride: {}", collection.tick_stride);
    println!("  Collect timeout: {}ms", collection.collect_timeout_ms);
    match max_ticks {
        Some(n) => println!("  Max ticks: {}", n),
        None => println!("  Max ticks: until interrupted"),
    }
    println!("  Annotate: {} (max distance {} m)", collection.annotate, collection.max_distance);

    println!("\nRecorder:");
    println!("  Output: {}", blueprint.output_dir().display());
    println!("  Capacity: {} frames", blueprint.recorder.capacity);
    println!();
}
