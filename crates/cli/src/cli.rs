//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CARLA Dataset - multi-modal dataset collector for CARLA-style worlds
#[derive(Parser, Debug)]
#[command(
    name = "carla-dataset",
    author,
    version,
    about = "CARLA multi-modal dataset collector",
    long_about = "Collects time-aligned RGB, semantic, instance and GNSS samples from a \n\
                  simulated world, annotates 2D bounding boxes and writes the dataset to disk."
)]
pub struct Cli {
    /// Default log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(
        long,
        default_value = "info",
        global = true,
        env = "CARLA_DATASET_LOG_LEVEL"
    )]
    pub log_level: String,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CARLA_DATASET_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the collection loop
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Summarize a recorded dataset directory
    Inspect(InspectArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "CARLA_DATASET_CONFIG"
    )]
    pub config: PathBuf,

    /// Number of ticks to run, overriding collection.max_ticks (0 = until interrupted)
    #[arg(long, env = "CARLA_DATASET_MAX_TICKS")]
    pub max_ticks: Option<u64>,

    /// Output root, overriding recorder.save_path
    #[arg(short, long, env = "CARLA_DATASET_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "CARLA_DATASET_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `inspect` command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Dataset directory (one map's output folder)
    #[arg(short, long)]
    pub dir: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_overrides() {
        let cli = Cli::try_parse_from([
            "carla-dataset",
            "--log-format",
            "json",
            "run",
            "--config",
            "town.toml",
            "--max-ticks",
            "20",
            "--output",
            "/tmp/out",
            "--dry-run",
        ])
        .unwrap();

        assert!(matches!(cli.log_format, LogFormat::Json));
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("town.toml"));
                assert_eq!(args.max_ticks, Some(20));
                assert_eq!(args.output, Some(PathBuf::from("/tmp/out")));
                assert!(args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn inspect_requires_dir() {
        assert!(Cli::try_parse_from(["carla-dataset", "inspect"]).is_err());
        let cli = Cli::try_parse_from(["carla-dataset", "inspect", "--dir", "outputs/Town01"]).unwrap();
        assert!(matches!(cli.command, Commands::Inspect(_)));
    }
}
