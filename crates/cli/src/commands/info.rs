//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{DatasetBlueprint, DropPolicy, GeoLocation, Transform};
use serde::Serialize;
use tracing::info;

use super::{describe_camera, load_blueprint};
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    world: WorldInfo,
    ego: EgoInfo,
    sensors: Vec<SensorInfo>,
    collection: CollectionInfo,
    recorder: RecorderInfo,
}

#[derive(Serialize)]
struct WorldInfo {
    map: String,
    delta_seconds: f64,
    sync_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    georeference: GeoLocation,
    traffic_vehicles: usize,
}

#[derive(Serialize)]
struct EgoInfo {
    blueprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    spawn_point: Option<Transform>,
}

#[derive(Serialize)]
struct SensorInfo {
    channel: &'static str,
    blueprint: &'static str,
    transform: Transform,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    artifacts: Vec<&'static str>,
}

#[derive(Serialize)]
struct CollectionInfo {
    tick_stride: u64,
    collect_timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_ticks: Option<u64>,
    annotate: bool,
    max_distance: f64,
    queue_capacity: usize,
    drop_policy: DropPolicy,
}

#[derive(Serialize)]
struct RecorderInfo {
    output_dir: String,
    capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &DatasetBlueprint) -> ConfigInfo {
    let world = &blueprint.world;
    let collection = &blueprint.collection;

    let sensors = blueprint
        .sensors
        .specs()
        .iter()
        .map(|spec| SensorInfo {
            channel: spec.channel().as_str(),
            blueprint: spec.blueprint_id(),
            transform: spec.transform(),
            image: spec.camera().map(describe_camera),
            artifacts: spec.channel().artifact_suffixes().to_vec(),
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        world: WorldInfo {
            map: world.map.clone(),
            delta_seconds: world.delta_seconds,
            sync_mode: world.sync_mode,
            seed: world.seed,
            georeference: world.georeference,
            traffic_vehicles: world.traffic_vehicles,
        },
        ego: EgoInfo {
            blueprint: blueprint.ego.blueprint.clone(),
            spawn_point: blueprint.ego.spawn_point,
        },
        sensors,
        collection: CollectionInfo {
            tick_stride: collection.tick_stride,
            collect_timeout_ms: collection.collect_timeout_ms,
            max_ticks: collection.max_ticks,
            annotate: collection.annotate,
            max_distance: collection.max_distance,
            queue_capacity: collection.queue_capacity,
            drop_policy: collection.drop_policy,
        },
        recorder: RecorderInfo {
            output_dir: blueprint.output_dir().display().to_string(),
            capacity: blueprint.recorder.capacity,
        },
    }
}

fn print_config_info(blueprint: &DatasetBlueprint) {
    let world = &blueprint.world;
    let geo = &world.georeference;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               CARLA Dataset Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // World info
    println!("📍 World");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Map: {}", world.map);
    println!(
        "   ├─ Step: {}s ({})",
        world.delta_seconds,
        if world.sync_mode { "synchronous" } else { "asynchronous requested" }
    );
    println!(
        "   ├─ Georeference: {:.6}, {:.6}, {:.1} m",
        geo.latitude, geo.longitude, geo.altitude
    );
    println!("   └─ Traffic vehicles: {}", world.traffic_vehicles);

    // Ego
    println!("\n🚗 Ego");
    println!("   ├─ Blueprint: {}", blueprint.ego.blueprint);
    match &blueprint.ego.spawn_point {
        Some(t) => println!(
            "   └─ Spawn: ({:.1}, {:.1}, {:.1}) yaw {:.1}°",
            t.location.x, t.location.y, t.location.z, t.rotation.yaw
        ),
        None => println!("   └─ Spawn: ring road"),
    }

    // Sensors
    let specs = blueprint.sensors.specs();
    println!("\n📷 Sensors ({})", specs.len());
    for (i, spec) in specs.iter().enumerate() {
        let prefix = if i == specs.len() - 1 { "└─" } else { "├─" };
        let location = spec.transform().location;
        let detail = spec
            .camera()
            .map(describe_camera)
            .unwrap_or_else(|| "geodetic".to_string());
        println!(
            "   {} {} ({}) at ({:.1}, {:.1}, {:.1}) - {} → {}",
            prefix,
            spec.channel(),
            spec.blueprint_id(),
            location.x,
            location.y,
            location.z,
            detail,
            spec.channel().artifact_suffixes().join(", ")
        );
    }

    // Collection
    let collection = &blueprint.collection;
    println!("\n⚙️  Collection");
    println!("   ├─ Tick stride: {}", collection.tick_stride);
    println!("   ├─ Collect timeout: {}ms", collection.collect_timeout_ms);
    match collection.max_ticks {
        Some(n) => println!("   ├─ Max ticks: {}", n),
        None => println!("   ├─ Max ticks: until interrupted"),
    }
    if collection.annotate {
        println!("   ├─ Annotation: on (max distance {} m)", collection.max_distance);
    } else {
        println!("   ├─ Annotation: off");
    }
    println!(
        "   └─ Queue: {} per channel, {:?}",
        collection.queue_capacity, collection.drop_policy
    );

    // Recorder
    println!("\n📤 Recorder");
    println!("   ├─ Output: {}", blueprint.output_dir().display());
    println!("   └─ Capacity: {} frames", blueprint.recorder.capacity);

    println!();
}
