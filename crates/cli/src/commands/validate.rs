//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::DatasetBlueprint;
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    map: String,
    traffic_vehicles: usize,
    image_size: String,
    tick_stride: u64,
    output_dir: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let (result, failure) = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    match failure {
        None => Ok(()),
        Some(e) => Err(e).context("Configuration validation failed"),
    }
}

fn validate_config(args: &ValidateArgs) -> (ValidationResult, Option<CliError>) {
    let config_path = args.config.display().to_string();

    match load_blueprint(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let camera = &blueprint.sensors.camera;
            let result = ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    map: blueprint.world.map.clone(),
                    traffic_vehicles: blueprint.world.traffic_vehicles,
                    image_size: format!("{}x{}", camera.width, camera.height),
                    tick_stride: blueprint.collection.tick_stride,
                    output_dir: blueprint.output_dir().display().to_string(),
                }),
            };
            (result, None)
        }
        Err(e) => {
            let result = ValidationResult {
                valid: false,
                config_path,
                error: Some(e.to_string()),
                warnings: None,
                summary: None,
            };
            (result, Some(e))
        }
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &DatasetBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let world = &blueprint.world;
    let sensors = &blueprint.sensors;
    let collection = &blueprint.collection;

    if !world.sync_mode {
        warnings.push("world.sync_mode = false is ignored - the world always ticks synchronously".to_string());
    }

    if world.traffic_vehicles == 0 && collection.annotate {
        warnings.push("No traffic vehicles - bounding box files will be empty".to_string());
    }

    if !collection.annotate {
        warnings.push("collection.annotate = false - no bounding_box.xml will be written".to_string());
    }

    if let Some(max) = collection.max_ticks {
        if max < collection.tick_stride {
            warnings.push(format!(
                "max_ticks ({}) is below tick_stride ({}) - at most one frame will be recorded",
                max, collection.tick_stride
            ));
        }
    }

    for (name, camera) in [("semantic", &sensors.semantic), ("instance", &sensors.instance)] {
        if camera.width != sensors.camera.width || camera.height != sensors.camera.height {
            warnings.push(format!(
                "sensors.{} is {}x{} but sensors.camera is {}x{} - label images will not align",
                name, camera.width, camera.height, sensors.camera.width, sensors.camera.height
            ));
        }
    }

    let frame_ms = world.delta_seconds * 1000.0;
    if (collection.collect_timeout_ms as f64) < frame_ms {
        warnings.push(format!(
            "collect_timeout_ms ({}) is shorter than one frame ({:.0}ms)",
            collection.collect_timeout_ms, frame_ms
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Map: {}", summary.map);
            println!("  Traffic vehicles: {}", summary.traffic_vehicles);
            println!("  Image size: {}", summary.image_size);
            println!("  Tick stride: {}", summary.tick_stride);
            println!("  Output: {}", summary.output_dir);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
