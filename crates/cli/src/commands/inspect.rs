//! `inspect` command implementation.
//!
//! Groups the files of a dataset directory by frame and reports which frames
//! are missing channel artifacts.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use contracts::{Channel, BOUNDING_BOX_SUFFIX};
use recorder::{parse_artifact_name, parse_voc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cli::InspectArgs;
use crate::error::CliError;

/// Dataset summary for JSON output
#[derive(Debug, Default, Serialize)]
struct InspectReport {
    dir: String,
    frames: usize,
    complete_frames: usize,
    /// Complete frames per channel
    channels: BTreeMap<&'static str, usize>,
    /// Files per artifact suffix
    artifacts: BTreeMap<&'static str, usize>,
    annotated_frames: usize,
    total_boxes: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    incomplete: Vec<IncompleteFrame>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    invalid_annotations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    unrecognized: Vec<String>,
}

#[derive(Debug, Serialize)]
struct IncompleteFrame {
    frame: String,
    missing: Vec<&'static str>,
}

/// Execute the `inspect` command
pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    info!(dir = %args.dir.display(), "Inspecting dataset");

    let report = inspect_dir(&args.dir)
        .with_context(|| format!("Failed to inspect {}", args.dir.display()))?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize inspect report")?;
        println!("{}", json);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn inspect_dir(dir: &Path) -> Result<InspectReport, CliError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| CliError::dataset(dir.display().to_string(), e.to_string()))?;

    let mut report = InspectReport {
        dir: dir.display().to_string(),
        ..Default::default()
    };
    let mut frames: BTreeMap<(String, u64, u64), BTreeSet<&'static str>> = BTreeMap::new();

    for entry in entries {
        let entry = entry.map_err(|e| CliError::dataset(dir.display().to_string(), e.to_string()))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();

        let Some(name) = parse_artifact_name(&file_name) else {
            debug!(file = %file_name, "not a dataset artifact");
            report.unrecognized.push(file_name);
            continue;
        };
        *report.artifacts.entry(name.suffix).or_insert(0) += 1;

        if name.suffix == BOUNDING_BOX_SUFFIX {
            match read_box_count(&entry.path()) {
                Ok(count) => {
                    report.annotated_frames += 1;
                    report.total_boxes += count;
                }
                Err(message) => {
                    warn!(file = %file_name, error = %message, "unreadable annotation");
                    report.invalid_annotations.push(file_name.clone());
                }
            }
        }

        frames.entry(name.frame_key()).or_default().insert(name.suffix);
    }

    report.frames = frames.len();
    for ((map, timestamp, frame), suffixes) in &frames {
        let missing = missing_suffixes(suffixes);
        for channel in Channel::ALL {
            let complete = channel
                .artifact_suffixes()
                .iter()
                .all(|suffix| suffixes.contains(suffix));
            if complete {
                *report.channels.entry(channel.as_str()).or_insert(0) += 1;
            }
        }

        if missing.is_empty() {
            report.complete_frames += 1;
        } else {
            report.incomplete.push(IncompleteFrame {
                frame: format!("{}_{:06}_{:06}", map, timestamp, frame),
                missing,
            });
        }
    }
    report.unrecognized.sort();
    report.invalid_annotations.sort();

    info!(
        frames = report.frames,
        complete = report.complete_frames,
        boxes = report.total_boxes,
        "Dataset inspected"
    );
    Ok(report)
}

/// Channel artifacts absent from one frame; annotations are optional
fn missing_suffixes(present: &BTreeSet<&'static str>) -> Vec<&'static str> {
    Channel::ALL
        .iter()
        .flat_map(|c| c.artifact_suffixes().iter().copied())
        .filter(|suffix| !present.contains(suffix))
        .collect()
}

fn read_box_count(path: &Path) -> std::result::Result<usize, String> {
    let xml = fs::read_to_string(path).map_err(|e| e.to_string())?;
    parse_voc(&xml).map(|set| set.len()).map_err(|e| e.to_string())
}

fn print_report(report: &InspectReport) {
    println!("\n=== Dataset {} ===\n", report.dir);
    println!("Frames: {} ({} complete)", report.frames, report.complete_frames);

    println!("\nChannels (complete frames):");
    for channel in Channel::ALL {
        let count = report.channels.get(channel.as_str()).copied().unwrap_or(0);
        println!("  {:<9} {}", channel.as_str(), count);
    }

    println!("\nArtifacts:");
    for (suffix, count) in &report.artifacts {
        println!("  {:<17} {}", suffix, count);
    }

    println!(
        "\nAnnotations: {} frame(s), {} box(es)",
        report.annotated_frames, report.total_boxes
    );

    if !report.incomplete.is_empty() {
        println!("\n⚠ Incomplete frames ({}):", report.incomplete.len());
        for frame in &report.incomplete {
            println!("  - {} missing {}", frame.frame, frame.missing.join(", "));
        }
    }
    if !report.invalid_annotations.is_empty() {
        println!("\n⚠ Unreadable annotations:");
        for name in &report.invalid_annotations {
            println!("  - {}", name);
        }
    }
    if !report.unrecognized.is_empty() {
        println!("\nOther files: {}", report.unrecognized.len());
    }
    println!();
}
