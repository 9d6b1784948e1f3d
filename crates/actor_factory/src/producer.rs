//! Per-sensor producer threads
//!
//! Each listening sensor owns one thread. The world hands it a render job per
//! tick; the thread renders into a buffer it reuses across jobs and passes a
//! borrow of that buffer to the sensor callback.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use contracts::{ActorId, ActorSnapshot, Channel, RawPayload, RawSensorData, SensorDataCallback, Transform};
use tracing::{debug, trace, warn};

use crate::error::{Result, SimulationError};
use crate::render::Renderer;

/// Work for one tick
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub frame: u64,
    pub timestamp: f64,
    /// World pose of the sensor
    pub sensor_transform: Transform,
    /// Vehicles alive after the tick
    pub actors: Arc<[ActorSnapshot]>,
}

/// Handle on a running producer thread
pub struct Producer {
    jobs: Option<Sender<RenderJob>>,
    handle: Option<JoinHandle<()>>,
}

impl Producer {
    /// Start the thread for `sensor_id`
    ///
    /// `parent` is hidden from camera renders.
    pub fn start(
        sensor_id: ActorId,
        channel: Channel,
        parent: ActorId,
        renderer: Renderer,
        callback: SensorDataCallback,
    ) -> Result<Self> {
        let (jobs, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(format!("sim-{}-{}", channel, sensor_id))
            .spawn(move || run(sensor_id, parent, renderer, receiver, callback))
            .map_err(|source| SimulationError::Producer { sensor_id, source })?;

        Ok(Self {
            jobs: Some(jobs),
            handle: Some(handle),
        })
    }

    pub fn is_listening(&self) -> bool {
        self.jobs.is_some()
    }

    /// Queue a job; false once the producer is closed or its thread is gone
    pub fn submit(&self, job: RenderJob) -> bool {
        match &self.jobs {
            Some(jobs) => jobs.send(job).is_ok(),
            None => false,
        }
    }

    /// Stop accepting jobs; the thread exits after the queued ones
    pub fn close(&mut self) {
        self.jobs = None;
    }

    /// Close and hand back the thread for joining
    pub fn finish(mut self) -> Option<JoinHandle<()>> {
        self.close();
        self.handle.take()
    }
}

fn run(
    sensor_id: ActorId,
    parent: ActorId,
    mut renderer: Renderer,
    jobs: Receiver<RenderJob>,
    callback: SensorDataCallback,
) {
    let payload = match &renderer {
        Renderer::Camera(camera) => RawPayload::Image {
            width: camera.width(),
            height: camera.height(),
            bgra: Vec::with_capacity(camera.width() as usize * camera.height() as usize * 4),
        },
        Renderer::Gnss(_) => RawPayload::Gnss(Default::default()),
    };
    let mut raw = RawSensorData {
        frame: 0,
        timestamp: 0.0,
        payload,
    };

    debug!(sensor_id, "producer started");
    while let Ok(job) = jobs.recv() {
        raw.frame = job.frame;
        raw.timestamp = job.timestamp;
        match (&mut renderer, &mut raw.payload) {
            (Renderer::Camera(camera), RawPayload::Image { bgra, .. }) => {
                camera.render(&job.sensor_transform, &job.actors, parent, bgra);
            }
            (Renderer::Gnss(gnss), RawPayload::Gnss(reading)) => {
                *reading = gnss.measure(&job.sensor_transform.location);
            }
            _ => {
                warn!(sensor_id, "renderer does not match payload");
                break;
            }
        }
        callback(&raw);
        trace!(sensor_id, frame = job.frame, "data delivered");
    }
    debug!(sensor_id, "producer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::GnssRenderer;
    use contracts::{GeoLocation, GnssConfig, Location};
    use std::sync::Mutex;

    fn job(frame: u64) -> RenderJob {
        RenderJob {
            frame,
            timestamp: frame as f64 * 0.05,
            sensor_transform: Transform::from_location(Location::new(1.0, 0.0, 2.0)),
            actors: Arc::from(Vec::new()),
        }
    }

    #[test]
    fn delivers_jobs_in_order_until_finished() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let renderer = Renderer::Gnss(GnssRenderer::new(GeoLocation::default(), &GnssConfig::default(), 0).unwrap());
        let producer = Producer::start(
            1001,
            Channel::Gnss,
            1000,
            renderer,
            Arc::new(move |raw: &RawSensorData| {
                if let RawPayload::Gnss(reading) = raw.payload {
                    sink.lock().unwrap().push((raw.frame, reading.altitude));
                }
            }),
        )
        .unwrap();

        assert!(producer.is_listening());
        assert!(producer.submit(job(1)));
        assert!(producer.submit(job(2)));
        producer.finish().unwrap().join().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 2.0), (2, 2.0)]);
    }

    #[test]
    fn closed_producer_rejects_jobs() {
        let renderer = Renderer::Gnss(GnssRenderer::new(GeoLocation::default(), &GnssConfig::default(), 0).unwrap());
        let mut producer =
            Producer::start(1001, Channel::Gnss, 1000, renderer, Arc::new(|_: &RawSensorData| {})).unwrap();
        producer.close();
        assert!(!producer.is_listening());
        assert!(!producer.submit(job(1)));
        producer.finish().unwrap().join().unwrap();
    }
}
