//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 跨 crate 合约一致性
//! - 模拟世界 e2e 测试（无需模拟器）

#[cfg(test)]
mod contract_tests {
    use contracts::{Channel, BOUNDING_BOX_SUFFIX};

    #[test]
    fn every_suffix_maps_back_to_its_channel() {
        for channel in Channel::ALL {
            for suffix in channel.artifact_suffixes() {
                assert_eq!(recorder::suffix_channel(suffix), Some(channel));
            }
        }
        assert_eq!(recorder::suffix_channel(BOUNDING_BOX_SUFFIX), None);
        assert_eq!(recorder::naming::known_suffixes().count(), 6);
    }

    #[test]
    fn default_blueprint_passes_validation() {
        let bp = config_loader::ConfigLoader::defaults_for_map("Town10HD").unwrap();
        assert_eq!(bp.sensors.specs().len(), Channel::ALL.len());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::{BTreeMap, BTreeSet};
    use std::time::Duration;

    use actor_factory::{SimulatedWorld, TAG_ROAD, TAG_SKY};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Channel, DatasetBlueprint, SamplePayload, World};
    use geometry::{BoundingBoxExtractor, EgoPose};
    use ingestion::{BackpressureConfig, SensorRig};
    use recorder::{parse_artifact_name, parse_voc, BoundedRecorder, GnssRecord, MemoryStorage};
    use sync_engine::{FrameSynchronizer, SyncError};

    const CONFIG: &str = r#"
        [world]
        map = "Town03"
        delta_seconds = 0.05
        seed = 42
        traffic_vehicles = 4
        start_frame = 100

        [world.georeference]
        latitude = 49.0
        longitude = 8.0
        altitude = 110.0

        [sensors.camera]
        width = 96
        height = 48

        [sensors.semantic]
        width = 96
        height = 48

        [sensors.instance]
        width = 96
        height = 48

        [collection]
        tick_stride = 1
        collect_timeout_ms = 500
        queue_capacity = 4

        [recorder]
        capacity = 3
    "#;

    const TIMEOUT: Duration = Duration::from_millis(500);

    fn blueprint() -> DatasetBlueprint {
        ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap()
    }

    struct Harness {
        rig: SensorRig,
        synchronizer: FrameSynchronizer,
        extractor: BoundingBoxExtractor,
    }

    async fn attach(world: &SimulatedWorld, bp: &DatasetBlueprint) -> Harness {
        let ego = world.ego().unwrap();
        let rig = SensorRig::spawn(
            world,
            &bp.sensors,
            ego,
            &BackpressureConfig::from(&bp.collection),
        )
        .await
        .unwrap();
        let synchronizer = FrameSynchronizer::new(rig.channels()).unwrap();
        let extractor = BoundingBoxExtractor::new(
            *rig.camera().unwrap().intrinsic(),
            bp.collection.max_distance,
        );
        Harness {
            rig,
            synchronizer,
            extractor,
        }
    }

    /// tick → collect → annotate → buffer, without the CLI
    #[tokio::test]
    async fn test_e2e_simulated_collection() {
        let bp = blueprint();
        let world = SimulatedWorld::from_blueprint(&bp).unwrap();
        let mut h = attach(&world, &bp).await;
        let storage = MemoryStorage::new();
        let mut recorder = BoundedRecorder::new(bp.recorder.capacity, &bp.world.map, storage).unwrap();

        let ego = world.ego().unwrap();
        let mut recorded = Vec::new();
        for _ in 0..7 {
            let tick = world.tick().await.unwrap();
            let frame = h.synchronizer.collect(TIMEOUT).await.unwrap();
            assert_eq!(frame.frame_number(), tick);
            assert_eq!(frame.len(), Channel::ALL.len());

            let pose = EgoPose {
                id: ego,
                transform: world.actor_transform(ego).unwrap(),
            };
            let camera = h.rig.camera_transform(&world).unwrap();
            let boxes = h.extractor.extract(&world.actors(), &pose, &camera);
            assert!(boxes.boxes.iter().all(|b| b.is_inside(96, 48)));

            recorded.push(tick);
            recorder.buffer(frame.with_bounding_boxes(boxes)).await.unwrap();
            assert!(recorder.size() <= bp.recorder.capacity);
        }
        recorder.flush().await.unwrap();
        assert_eq!(recorder.size(), 0);

        assert_eq!(h.rig.destroy_all(&world).await, 0);
        assert_eq!(world.shutdown().await, 1 + 4);

        // 6 artifacts per frame, all named after frames that were ticked
        let storage = recorder.into_storage();
        assert_eq!(storage.len(), recorded.len() * 6);
        let mut per_frame: BTreeMap<u64, BTreeSet<&str>> = BTreeMap::new();
        for name in storage.names() {
            let parsed = parse_artifact_name(name).unwrap();
            assert_eq!(parsed.map, "Town03");
            per_frame.entry(parsed.frame_number).or_default().insert(parsed.suffix);
        }
        assert_eq!(per_frame.keys().copied().collect::<Vec<_>>(), recorded);
        assert!(per_frame.values().all(|suffixes| suffixes.len() == 6));
    }

    #[tokio::test]
    async fn test_e2e_artifacts_decode() {
        let bp = blueprint();
        let world = SimulatedWorld::from_blueprint(&bp).unwrap();
        let mut h = attach(&world, &bp).await;
        let mut recorder = BoundedRecorder::new(4, &bp.world.map, MemoryStorage::new()).unwrap();

        let tick = world.tick().await.unwrap();
        let frame = h.synchronizer.collect(TIMEOUT).await.unwrap();
        let gnss_actor = h.rig.sensor(Channel::Gnss).unwrap().actor_id();
        let gnss_pose = world.actor_transform(gnss_actor).unwrap();
        let ego = world.ego().unwrap();
        let pose = EgoPose {
            id: ego,
            transform: world.actor_transform(ego).unwrap(),
        };
        let camera = h.rig.camera_transform(&world).unwrap();
        let boxes = h.extractor.extract(&world.actors(), &pose, &camera);
        let box_count = boxes.len();
        recorder.buffer(frame.with_bounding_boxes(boxes)).await.unwrap();
        recorder.flush().await.unwrap();

        h.rig.destroy_all(&world).await;
        world.shutdown().await;

        let storage = recorder.into_storage();
        let find = |suffix: &str| {
            let name = storage
                .names()
                .find(|n| n.ends_with(suffix))
                .unwrap_or_else(|| panic!("no {suffix}"))
                .to_owned();
            storage.get(&name).unwrap().to_vec()
        };

        let rgb = image::load_from_memory(&find("img.png")).unwrap();
        assert_eq!((rgb.width(), rgb.height()), (96, 48));

        // level camera: sky above the horizon, road at the bottom edge
        let labels = image::load_from_memory(&find("labelIds.png")).unwrap().to_luma8();
        assert_eq!(labels.get_pixel(0, 0).0[0], TAG_SKY);
        assert_eq!(labels.get_pixel(0, 47).0[0], TAG_ROAD);

        let record: GnssRecord = serde_json::from_slice(&find("gnss.json")).unwrap();
        assert_eq!(record.frame, tick);
        let local = contracts::Location::new(
            record.x.unwrap(),
            record.y.unwrap(),
            record.z.unwrap(),
        );
        assert!(
            local.distance(&gnss_pose.location) < 0.5,
            "gnss local {local:?} vs sensor {:?}",
            gnss_pose.location
        );

        let xml = String::from_utf8(find("bounding_box.xml")).unwrap();
        let set = parse_voc(&xml).unwrap();
        assert_eq!((set.width, set.height, set.depth), (96, 48, 3));
        assert_eq!(set.len(), box_count);
        assert!(box_count >= 1, "lead vehicle should be annotated");
    }

    #[tokio::test]
    async fn test_e2e_muted_channel_partial_frame() {
        let bp = blueprint();
        let world = SimulatedWorld::from_blueprint(&bp).unwrap();
        let mut h = attach(&world, &bp).await;

        world.mute_channel(Channel::Semantic, true);
        let tick = world.tick().await.unwrap();
        let err = h
            .synchronizer
            .collect(Duration::from_millis(100))
            .await
            .unwrap_err();
        match err {
            SyncError::PartialFrame {
                frame_number,
                ref missing,
                waited_ms,
            } => {
                assert_eq!(frame_number, tick);
                assert_eq!(missing, &vec![Channel::Semantic]);
                assert!(waited_ms >= 100);
            }
            other => panic!("unexpected error {other:?}"),
        }

        world.mute_channel(Channel::Semantic, false);
        let next = world.tick().await.unwrap();
        let frame = h.synchronizer.collect(TIMEOUT).await.unwrap();
        assert_eq!(frame.frame_number(), next);
        assert_eq!(h.synchronizer.stats().partial_frames, 1);

        h.rig.destroy_all(&world).await;
        world.shutdown().await;
    }

    /// A channel that fell behind catches up by discarding old samples
    #[tokio::test]
    async fn test_e2e_stale_samples_discarded() {
        let bp = blueprint();
        let world = SimulatedWorld::from_blueprint(&bp).unwrap();
        let mut h = attach(&world, &bp).await;

        // camera misses frame N, the other channels deliver both N and N+1
        world.mute_channel(Channel::Camera, true);
        world.tick().await.unwrap();
        world.mute_channel(Channel::Camera, false);
        let latest = world.tick().await.unwrap();

        let frame = h.synchronizer.collect(TIMEOUT).await.unwrap();
        assert_eq!(frame.frame_number(), latest);
        assert_eq!(h.synchronizer.stats().stale_discarded, 3);

        let timestamps: BTreeSet<u64> = frame
            .samples()
            .map(|s| (s.timestamp * 1000.0).round() as u64)
            .collect();
        assert_eq!(timestamps.len(), 1, "samples of one frame share a timestamp");
        assert!(frame.samples().all(|s| match &s.payload {
            SamplePayload::Camera(image) | SamplePayload::Instance(image) => image.is_consistent(),
            SamplePayload::Semantic { color, labels } => color.is_consistent() && labels.is_consistent(),
            SamplePayload::Gnss(_) => true,
        }));

        h.rig.destroy_all(&world).await;
        world.shutdown().await;
    }

    #[tokio::test]
    async fn test_e2e_directory_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut bp = blueprint();
        bp.recorder.save_path = dir.path().to_path_buf();
        bp.collection.annotate = false;

        let world = SimulatedWorld::from_blueprint(&bp).unwrap();
        let mut h = attach(&world, &bp).await;
        let mut recorder = BoundedRecorder::create(&bp.recorder, &bp.world.map).unwrap();

        for _ in 0..4 {
            world.tick().await.unwrap();
            let frame = h.synchronizer.collect(TIMEOUT).await.unwrap();
            recorder.buffer(frame).await.unwrap();
        }
        recorder.flush().await.unwrap();
        h.rig.destroy_all(&world).await;
        world.shutdown().await;

        let files: Vec<String> = std::fs::read_dir(bp.output_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        // no bounding_box.xml without annotation
        assert_eq!(files.len(), 4 * 5);
        assert!(files.iter().all(|f| parse_artifact_name(f).is_some()));
        assert!(!files.iter().any(|f| f.ends_with("bounding_box.xml")));
    }
}
