//! Pipeline orchestrator - coordinates all components.
//!
//! One collection step is `tick → collect → (annotate → buffer)`. Shutdown
//! always runs in the same order, also on error paths and on Ctrl-C:
//! flush the recorder, destroy the sensor rig, release the world.

use std::time::{Duration, Instant};

use actor_factory::SimulatedWorld;
use anyhow::{Context, Result};
use contracts::{ActorId, Channel, DatasetBlueprint, Storage, World};
use geometry::{BoundingBoxExtractor, EgoPose};
use ingestion::{BackpressureConfig, SensorRig};
use observability::{CollectionMetricsAggregator, MetricsSummary};
use recorder::{BoundedRecorder, DirectoryStorage, FlushReport};
use sync_engine::{FrameSynchronizer, SyncError};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The dataset blueprint, CLI overrides applied
    pub blueprint: DatasetBlueprint,

    /// Maximum number of collection ticks (None = until shutdown)
    pub max_ticks: Option<u64>,
}

/// What one collection step produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Frame sealed and buffered; `boxes` is None when annotation is off
    Recorded { frame: u64, boxes: Option<usize> },
    /// Frame sealed but not on the recording stride
    Skipped { frame: u64 },
    /// Collection timed out before every channel delivered
    Partial { frame: u64, missing: Vec<Channel> },
}

/// Result of a finished collection
pub struct Collected<S> {
    pub summary: MetricsSummary,
    pub recorder: BoundedRecorder<S>,
    /// Sensors that failed to tear down
    pub sensor_failures: usize,
    pub sensors: usize,
}

/// Collection loop over one world, bound to a sensor rig and a recorder
pub struct Collector<'w, W, S> {
    world: &'w W,
    ego: ActorId,
    rig: SensorRig,
    synchronizer: FrameSynchronizer,
    extractor: Option<BoundingBoxExtractor>,
    recorder: BoundedRecorder<S>,
    tick_stride: u64,
    collect_timeout: Duration,
    aggregator: CollectionMetricsAggregator,
    stale_seen: u64,
}

impl<'w, W: World, S: Storage> Collector<'w, W, S> {
    /// Spawn the rig on the ego and warm up with one tick
    ///
    /// The warm-up frame brings the ego into effect and is never recorded.
    /// If setup fails after the rig was spawned, the rig is destroyed before
    /// returning.
    #[instrument(name = "collector_setup", skip_all, fields(map = %world.map_name()))]
    pub async fn setup(
        world: &'w W,
        blueprint: &DatasetBlueprint,
        recorder: BoundedRecorder<S>,
    ) -> Result<Self> {
        let ego = world.ego().context("world has no ego vehicle")?;
        let backpressure = BackpressureConfig::from(&blueprint.collection);
        let mut rig = SensorRig::spawn(world, &blueprint.sensors, ego, &backpressure)
            .await
            .context("Failed to spawn sensor rig")?;

        let synchronizer = match FrameSynchronizer::new(rig.channels()) {
            Ok(synchronizer) => synchronizer,
            Err(e) => {
                rig.destroy_all(world).await;
                return Err(e).context("Failed to configure frame synchronizer");
            }
        };

        let extractor = match (blueprint.collection.annotate, rig.camera()) {
            (true, Some(camera)) => Some(BoundingBoxExtractor::new(
                *camera.intrinsic(),
                blueprint.collection.max_distance,
            )),
            (true, None) => {
                warn!("annotation enabled but no camera attached, boxes disabled");
                None
            }
            (false, _) => None,
        };

        let mut collector = Self {
            world,
            ego,
            rig,
            synchronizer,
            extractor,
            recorder,
            tick_stride: blueprint.collection.tick_stride.max(1),
            collect_timeout: blueprint.collection.collect_timeout(),
            aggregator: CollectionMetricsAggregator::new(),
            stale_seen: 0,
        };

        if let Err(e) = collector.warm_up().await {
            collector.rig.destroy_all(world).await;
            return Err(e);
        }

        info!(
            ego,
            sensors = collector.rig.len(),
            stride = collector.tick_stride,
            annotate = collector.extractor.is_some(),
            "collector ready"
        );
        Ok(collector)
    }

    async fn warm_up(&mut self) -> Result<()> {
        let frame = self.world.tick().await.context("warm-up tick failed")?;
        match self.synchronizer.collect(self.collect_timeout).await {
            Ok(_) => debug!(frame, "warm-up frame discarded"),
            Err(e) if e.is_partial() => warn!(frame, error = %e, "warm-up frame incomplete"),
            Err(e) => return Err(e).context("warm-up collection failed"),
        }
        Ok(())
    }

    /// Ticks completed since setup
    pub fn ticks(&self) -> u64 {
        self.aggregator.summary().ticks
    }

    pub fn rig(&self) -> &SensorRig {
        &self.rig
    }

    pub fn recorder(&self) -> &BoundedRecorder<S> {
        &self.recorder
    }

    /// Advance the world once and collect the matching frame
    ///
    /// # Errors
    /// World tick failures, channel failures other than a timeout, and
    /// recorder failures. A partial frame is not an error.
    pub async fn step(&mut self) -> Result<StepOutcome> {
        let tick = self.world.tick().await.context("world tick failed")?;
        self.aggregator.record_tick();
        observability::record_tick(tick);

        let started = Instant::now();
        let collected = self.synchronizer.collect(self.collect_timeout).await;
        self.sync_stale();

        let frame = match collected {
            Ok(frame) => frame,
            Err(SyncError::PartialFrame {
                frame_number,
                missing,
                ..
            }) => {
                self.aggregator.record_partial(&missing);
                return Ok(StepOutcome::Partial {
                    frame: frame_number,
                    missing,
                });
            }
            Err(e) => return Err(e).context("frame collection failed"),
        };
        self.aggregator
            .record_sealed(started.elapsed().as_secs_f64() * 1000.0);

        let frame_number = frame.frame_number();
        if frame_number % self.tick_stride != 0 {
            return Ok(StepOutcome::Skipped {
                frame: frame_number,
            });
        }

        let (frame, boxes) = match &self.extractor {
            Some(extractor) => {
                let ego = EgoPose {
                    id: self.ego,
                    transform: self.world.actor_transform(self.ego)?,
                };
                let camera = self.rig.camera_transform(self.world)?;
                let set = extractor.extract(&self.world.actors(), &ego, &camera);
                let count = set.len();
                observability::record_boxes(count);
                (frame.with_bounding_boxes(set), Some(count))
            }
            None => (frame, None),
        };

        let report = self
            .recorder
            .buffer(frame)
            .await
            .with_context(|| format!("failed to buffer frame {frame_number}"))?;
        if let Some(report) = report {
            self.record_flush(&report);
        }
        self.aggregator.record_recorded(boxes);
        debug!(frame = frame_number, ?boxes, "frame recorded");

        Ok(StepOutcome::Recorded {
            frame: frame_number,
            boxes,
        })
    }

    fn sync_stale(&mut self) {
        let stale = self.synchronizer.stats().stale_discarded;
        self.aggregator.record_stale(stale - self.stale_seen);
        self.stale_seen = stale;
    }

    fn record_flush(&mut self, report: &FlushReport) {
        self.aggregator
            .record_flush(report.artifacts, report.duration.as_secs_f64() * 1000.0);
    }

    /// Flush what is buffered, then destroy the rig
    ///
    /// The rig is destroyed even when the flush fails; the flush error is
    /// returned afterwards.
    #[instrument(name = "collector_finish", skip_all)]
    pub async fn finish(mut self) -> Result<Collected<S>> {
        let flushed = self.recorder.flush().await;
        if let Ok(report) = &flushed {
            self.record_flush(report);
        }

        let sensors = self.rig.len();
        let sensor_failures = self.rig.destroy_all(self.world).await;
        flushed.context("final flush failed")?;

        Ok(Collected {
            summary: self.aggregator.summary(),
            recorder: self.recorder,
            sensor_failures,
            sensors,
        })
    }
}

/// Drive a collector until `max_ticks`, a shutdown request or an error
///
/// Shutdown requests are observed between ticks only. `finish` runs on
/// every exit path.
pub async fn collect<W: World, S: Storage>(
    world: &W,
    blueprint: &DatasetBlueprint,
    recorder: BoundedRecorder<S>,
    max_ticks: Option<u64>,
    shutdown: &watch::Receiver<bool>,
) -> Result<Collected<S>> {
    let mut collector = Collector::setup(world, blueprint, recorder).await?;

    let looped = loop {
        if *shutdown.borrow() {
            warn!(ticks = collector.ticks(), "shutdown requested, stopping collection");
            break Ok(());
        }
        if max_ticks.is_some_and(|max| collector.ticks() >= max) {
            info!(ticks = collector.ticks(), "reached max ticks");
            break Ok(());
        }
        if let Err(e) = collector.step().await {
            break Err(e);
        }
    };

    let finished = collector.finish().await;
    looped?;
    finished
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run against a simulated world, writing under `recorder.save_path/<map>`
    #[instrument(
        name = "pipeline_run",
        skip_all,
        fields(map = %self.config.blueprint.world.map)
    )]
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<PipelineStats> {
        let started = Instant::now();
        let blueprint = &self.config.blueprint;

        let world = SimulatedWorld::from_blueprint(blueprint)
            .map_err(|e| CliError::collection(e.to_string()))
            .context("Failed to create simulated world")?;
        info!(
            seed = world.seed(),
            vehicles = world.vehicle_count(),
            "Simulated world created"
        );

        let recorder = match BoundedRecorder::<DirectoryStorage>::create(
            &blueprint.recorder,
            &blueprint.world.map,
        ) {
            Ok(recorder) => recorder,
            Err(e) => {
                world.shutdown().await;
                return Err(CliError::collection(e.to_string()))
                    .context("Failed to prepare output directory");
            }
        };
        let output_dir = recorder.storage().root().to_path_buf();
        info!(output = %output_dir.display(), "Recording into output directory");

        let collected = collect(
            &world,
            blueprint,
            recorder,
            self.config.max_ticks,
            &shutdown,
        )
        .await;

        let final_frame = world.frame();
        let simulated_seconds = world.elapsed_seconds();
        let actors_released = world.shutdown().await;
        info!(actors_released, "World released");

        let collected = collected?;
        if collected.sensor_failures > 0 {
            warn!(failures = collected.sensor_failures, "Some sensors failed to tear down");
        }

        Ok(PipelineStats {
            summary: collected.summary,
            duration: started.elapsed(),
            sensors: collected.sensors,
            final_frame,
            simulated_seconds,
            actors_released,
            output_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recorder::{parse_artifact_name, parse_voc, MemoryStorage};

    fn small_blueprint() -> DatasetBlueprint {
        let mut bp = DatasetBlueprint::for_map("Town01");
        bp.world.seed = Some(7);
        bp.world.traffic_vehicles = 3;
        for camera in [
            &mut bp.sensors.camera,
            &mut bp.sensors.semantic,
            &mut bp.sensors.instance,
        ] {
            camera.width = 64;
            camera.height = 32;
        }
        bp.collection.tick_stride = 1;
        bp.collection.collect_timeout_ms = 500;
        bp.recorder.capacity = 2;
        bp
    }

    fn memory_recorder(capacity: usize) -> BoundedRecorder<MemoryStorage> {
        BoundedRecorder::new(capacity, "Town01", MemoryStorage::new()).unwrap()
    }

    #[tokio::test]
    async fn records_every_frame_on_stride_one() {
        let bp = small_blueprint();
        let world = SimulatedWorld::from_blueprint(&bp).unwrap();
        let mut collector = Collector::setup(&world, &bp, memory_recorder(2)).await.unwrap();

        let mut recorded = Vec::new();
        for _ in 0..5 {
            match collector.step().await.unwrap() {
                StepOutcome::Recorded { frame, boxes } => {
                    assert!(boxes.is_some());
                    recorded.push(frame);
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert!(recorded.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(collector.recorder().size(), 1);

        let collected = collector.finish().await.unwrap();
        assert_eq!(collected.summary.ticks, 5);
        assert_eq!(collected.summary.frames_recorded, 5);
        assert_eq!(collected.summary.partial_frames, 0);
        assert_eq!(collected.sensor_failures, 0);
        assert_eq!(world.listening_count(), 0);

        // img + color + labelIds + instance + gnss + bounding box per frame
        let storage = collected.recorder.storage();
        assert_eq!(storage.len(), 5 * 6);
        assert_eq!(collected.summary.artifacts_written, 30);

        let frames: std::collections::BTreeSet<u64> = storage
            .names()
            .filter_map(parse_artifact_name)
            .map(|name| name.frame_number)
            .collect();
        assert_eq!(frames.into_iter().collect::<Vec<_>>(), recorded);

        world.shutdown().await;
    }

    #[tokio::test]
    async fn lead_vehicle_is_annotated() {
        let bp = small_blueprint();
        let world = SimulatedWorld::from_blueprint(&bp).unwrap();
        let mut collector = Collector::setup(&world, &bp, memory_recorder(4)).await.unwrap();

        let outcome = collector.step().await.unwrap();
        let StepOutcome::Recorded { frame, boxes } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert!(boxes.unwrap_or(0) >= 1, "lead vehicle should be boxed");

        let collected = collector.finish().await.unwrap();
        let xml_name = collected
            .recorder
            .storage()
            .names()
            .find(|n| n.ends_with("bounding_box.xml") && n.contains(&format!("_{frame:06}_")))
            .map(str::to_owned)
            .unwrap();
        let xml = std::str::from_utf8(collected.recorder.storage().get(&xml_name).unwrap()).unwrap();
        let set = parse_voc(xml).unwrap();
        assert_eq!(set.width, 64);
        assert_eq!(set.height, 32);
        assert!(set.boxes.iter().all(|b| b.class_name == "vehicle"));

        world.shutdown().await;
    }

    #[tokio::test]
    async fn stride_skips_off_frames() {
        let mut bp = small_blueprint();
        bp.collection.tick_stride = 2;
        bp.collection.annotate = false;
        let world = SimulatedWorld::from_blueprint(&bp).unwrap();
        let mut collector = Collector::setup(&world, &bp, memory_recorder(8)).await.unwrap();

        for _ in 0..4 {
            match collector.step().await.unwrap() {
                StepOutcome::Recorded { frame, boxes } => {
                    assert_eq!(frame % 2, 0);
                    assert_eq!(boxes, None);
                }
                StepOutcome::Skipped { frame } => assert_eq!(frame % 2, 1),
                other => panic!("unexpected outcome {other:?}"),
            }
        }

        let collected = collector.finish().await.unwrap();
        assert_eq!(collected.summary.frames_sealed, 4);
        assert_eq!(collected.summary.frames_recorded, 2);
        // no bounding_box.xml without annotation
        assert_eq!(collected.recorder.storage().len(), 2 * 5);

        world.shutdown().await;
    }

    #[tokio::test]
    async fn muted_channel_yields_partial_frames() {
        let mut bp = small_blueprint();
        bp.collection.collect_timeout_ms = 100;
        let world = SimulatedWorld::from_blueprint(&bp).unwrap();
        let mut collector = Collector::setup(&world, &bp, memory_recorder(4)).await.unwrap();

        world.mute_channel(Channel::Gnss, true);
        match collector.step().await.unwrap() {
            StepOutcome::Partial { missing, .. } => assert_eq!(missing, vec![Channel::Gnss]),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(collector.recorder().is_empty());

        world.mute_channel(Channel::Gnss, false);
        let outcome = collector.step().await.unwrap();
        assert!(matches!(outcome, StepOutcome::Recorded { .. }), "got {outcome:?}");

        let collected = collector.finish().await.unwrap();
        assert_eq!(collected.summary.partial_frames, 1);
        assert_eq!(collected.summary.channel_missing_counts.get(&Channel::Gnss), Some(&1));
        assert_eq!(collected.summary.frames_recorded, 1);

        world.shutdown().await;
    }

    #[tokio::test]
    async fn failed_final_flush_still_releases_sensors() {
        let bp = small_blueprint();
        let world = SimulatedWorld::from_blueprint(&bp).unwrap();
        let recorder = BoundedRecorder::new(8, "Town01", MemoryStorage::refusing("gnss.json")).unwrap();
        let mut collector = Collector::setup(&world, &bp, recorder).await.unwrap();
        collector.step().await.unwrap();

        assert!(collector.finish().await.is_err());
        assert_eq!(world.listening_count(), 0);

        world.shutdown().await;
    }

    #[tokio::test]
    async fn collect_stops_at_max_ticks() {
        let bp = small_blueprint();
        let world = SimulatedWorld::from_blueprint(&bp).unwrap();
        let (_tx, rx) = watch::channel(false);

        let collected = collect(&world, &bp, memory_recorder(2), Some(3), &rx)
            .await
            .unwrap();
        assert_eq!(collected.summary.ticks, 3);
        assert!(collected.recorder.is_empty());
        assert_eq!(collected.recorder.storage().len(), 3 * 6);

        world.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_request_stops_before_first_tick() {
        let bp = small_blueprint();
        let world = SimulatedWorld::from_blueprint(&bp).unwrap();
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let collected = collect(&world, &bp, memory_recorder(2), None, &rx)
            .await
            .unwrap();
        assert_eq!(collected.summary.ticks, 0);
        assert!(collected.recorder.storage().is_empty());
        assert_eq!(world.listening_count(), 0);

        world.shutdown().await;
    }

    #[tokio::test]
    async fn pipeline_writes_dataset_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut bp = small_blueprint();
        bp.recorder.save_path = dir.path().to_path_buf();

        let (_tx, rx) = watch::channel(false);
        let stats = Pipeline::new(PipelineConfig {
            blueprint: bp,
            max_ticks: Some(2),
        })
        .run(rx)
        .await
        .unwrap();

        assert_eq!(stats.summary.frames_recorded, 2);
        assert_eq!(stats.sensors, 4);
        assert_eq!(stats.output_dir, dir.path().join("Town01"));
        assert!(stats.actors_released >= 4);
        // warm-up tick plus two collected ticks
        assert_eq!(stats.final_frame, 3);
        assert!((stats.simulated_seconds - 3.0 * 0.05).abs() < 1e-9);

        let files = std::fs::read_dir(&stats.output_dir).unwrap().count();
        assert_eq!(files, 2 * 6);
    }
}
