//! Software event camera.
//!
//! Emits batches of events from a background thread on a virtual sensor
//! clock: a vertical bar sweeping across the sensor plus uniform noise. It
//! lets the whole pipeline run without hardware and exposes an in-memory
//! bias facility.

use crate::bias::{BiasFacility, MemoryBiases};
use crate::collector::source::{EventCallback, EventSource, SourceError, SourceId, SourceProvider};
use crate::collector::types::{Event, Geometry, Polarity, Timestamp};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Parameters of the synthetic camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    /// Events delivered per callback
    pub events_per_batch: usize,
    /// Sensor time covered by one batch, also the real delay between batches
    pub batch_interval_us: u64,
    /// Seed for the noise generator
    pub seed: u64,
    /// Whether the device exposes a bias facility
    pub biases: bool,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            events_per_batch: 256,
            batch_interval_us: 500,
            seed: 0x5eed,
            biases: true,
        }
    }
}

/// Provider for synthetic cameras.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    config: SyntheticConfig,
    devices: Vec<SourceId>,
}

impl SyntheticProvider {
    /// A provider reporting a single synthetic camera.
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            devices: vec![SourceId::new("synthetic:0")],
        }
    }

    /// A provider with no camera attached.
    pub fn disconnected() -> Self {
        Self {
            config: SyntheticConfig::default(),
            devices: Vec::new(),
        }
    }
}

impl SourceProvider for SyntheticProvider {
    fn list_available(&self) -> Vec<SourceId> {
        self.devices.clone()
    }

    fn open(&mut self, id: &SourceId) -> Result<Box<dyn EventSource>, SourceError> {
        if !self.devices.contains(id) {
            return Err(SourceError::DeviceUnavailable(format!("no camera named {id}")));
        }
        Ok(Box::new(SyntheticSource::new(id.clone(), self.config.clone())))
    }
}

type SharedCallbacks = Arc<Mutex<Vec<EventCallback>>>;

/// An open synthetic camera.
pub struct SyntheticSource {
    id: SourceId,
    config: SyntheticConfig,
    callbacks: SharedCallbacks,
    biases: Option<MemoryBiases>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SyntheticSource {
    pub fn new(id: SourceId, config: SyntheticConfig) -> Self {
        let biases = config.biases.then(MemoryBiases::with_defaults);
        Self {
            id,
            config,
            callbacks: Arc::new(Mutex::new(Vec::new())),
            biases,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }
}

impl EventSource for SyntheticSource {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn geometry(&self) -> Geometry {
        Geometry::new(self.config.width, self.config.height)
    }

    fn subscribe(&mut self, callback: EventCallback) {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    fn start(&mut self) -> Result<(), SourceError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SourceError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let callbacks = self.callbacks.clone();
        let config = self.config.clone();
        let handle = thread::Builder::new()
            .name(format!("{}-events", self.id))
            .spawn(move || run_generator(config, callbacks, running))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                SourceError::DeviceUnavailable(format!("failed to spawn event thread: {e}"))
            })?;
        self.thread_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn biases(&mut self) -> Option<&mut dyn BiasFacility> {
        self.biases.as_mut().map(|b| b as &mut dyn BiasFacility)
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_generator(config: SyntheticConfig, callbacks: SharedCallbacks, running: Arc<AtomicBool>) {
    let geometry = Geometry::new(config.width, config.height);
    if geometry.is_empty() {
        return;
    }
    let mut rng = StdRng::seed_from_u64(config.seed);
    let interval = config.batch_interval_us.max(1);
    let mut clock: Timestamp = 0;
    let mut batch = Vec::with_capacity(config.events_per_batch);

    while running.load(Ordering::SeqCst) {
        fill_batch(&mut batch, &mut rng, geometry, clock, interval, config.events_per_batch);
        {
            let mut callbacks = callbacks.lock().unwrap_or_else(PoisonError::into_inner);
            for callback in callbacks.iter_mut() {
                callback(&batch);
            }
        }
        clock += interval as Timestamp;
        thread::sleep(Duration::from_micros(interval));
    }
}

/// Fill `batch` with `count` events spread over `[start, start + span)`.
fn fill_batch(
    batch: &mut Vec<Event>,
    rng: &mut StdRng,
    geometry: Geometry,
    start: Timestamp,
    span: u64,
    count: usize,
) {
    batch.clear();
    // Bar advances one column per millisecond.
    let bar_x = ((start / 1000) as u64 % u64::from(geometry.width)) as u16;
    for i in 0..count {
        let offset = (i as u64 * span / count.max(1) as u64) as Timestamp;
        let (x, y) = if i % 2 == 0 {
            (bar_x, rng.gen_range(0..geometry.height) as u16)
        } else {
            (
                rng.gen_range(0..geometry.width) as u16,
                rng.gen_range(0..geometry.height) as u16,
            )
        };
        let polarity = if rng.gen_bool(0.5) {
            Polarity::On
        } else {
            Polarity::Off
        };
        batch.push(Event::new(x, y, polarity, start + offset));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_provider_lists_and_opens() {
        let mut provider = SyntheticProvider::new(SyntheticConfig::default());
        let ids = provider.list_available();
        assert_eq!(ids, vec![SourceId::new("synthetic:0")]);
        let source = provider.open_first_available().unwrap();
        assert_eq!(source.geometry(), Geometry::new(640, 480));
    }

    #[test]
    fn test_disconnected_provider_reports_unavailable() {
        let mut provider = SyntheticProvider::disconnected();
        assert!(matches!(
            provider.open_first_available(),
            Err(SourceError::DeviceUnavailable(_))
        ));
        assert!(provider.open(&SourceId::new("synthetic:9")).is_err());
    }

    #[test]
    fn test_batches_are_in_bounds_and_ordered() {
        let config = SyntheticConfig {
            width: 32,
            height: 16,
            events_per_batch: 64,
            batch_interval_us: 200,
            ..SyntheticConfig::default()
        };
        let mut source = SyntheticSource::new(SourceId::new("synthetic:0"), config);
        let (tx, rx) = bounded(4);
        source.subscribe(Box::new(move |events: &[Event]| {
            let _ = tx.try_send(events.to_vec());
        }));
        source.start().unwrap();
        assert_eq!(source.start(), Err(SourceError::AlreadyRunning));

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        source.stop();
        assert!(!source.is_running());

        assert_eq!(first.len(), 64);
        let geometry = source.geometry();
        assert!(first.iter().all(|e| geometry.contains(e.x, e.y)));
        assert!(first.windows(2).all(|w| w[0].t <= w[1].t));
        assert!(first.last().unwrap().t <= second.first().unwrap().t);
    }

    #[test]
    fn test_bias_facility_optional() {
        let config = SyntheticConfig {
            biases: false,
            ..SyntheticConfig::default()
        };
        let mut source = SyntheticSource::new(SourceId::new("synthetic:0"), config);
        assert!(source.biases().is_none());

        let mut source =
            SyntheticSource::new(SourceId::new("synthetic:0"), SyntheticConfig::default());
        assert!(source.biases().is_some());
    }
}
