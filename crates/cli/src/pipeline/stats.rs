//! Pipeline statistics.

use std::path::PathBuf;
use std::time::Duration;

use observability::MetricsSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Collection counters aggregated over the run
    pub summary: MetricsSummary,

    /// Total duration of the run, setup and teardown included
    pub duration: Duration,

    /// Number of sensors that were attached
    pub sensors: usize,

    /// World frame at the end of collection
    pub final_frame: u64,

    /// Simulation time covered by the run (seconds)
    pub simulated_seconds: f64,

    /// Vehicles released with the world
    pub actors_released: usize,

    /// Directory the dataset was written to
    pub output_dir: PathBuf,
}

impl PipelineStats {
    /// Ticks per second of wall time
    pub fn ticks_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.summary.ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                   Collection Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Ticks/s: {:.2}", self.ticks_per_second());
        println!("   ├─ Final frame: {}", self.final_frame);
        println!("   ├─ Simulated time: {:.2}s", self.simulated_seconds);
        println!("   ├─ Sensors: {}", self.sensors);
        println!("   ├─ Vehicles released: {}", self.actors_released);
        println!("   └─ Output: {}", self.output_dir.display());

        println!("\n{}", self.summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_per_second_handles_zero_duration() {
        let mut stats = PipelineStats::default();
        stats.summary.ticks = 40;
        assert_eq!(stats.ticks_per_second(), 0.0);

        stats.duration = Duration::from_secs(2);
        assert!((stats.ticks_per_second() - 20.0).abs() < 1e-9);
    }
}
