//! Counts vehicles per type from a simulated sensor feed.
//!
//! Stands in for the network-attached sensor reader the core engine treats
//! as an opaque `Source` (§1's non-goals): a real deployment would read
//! newline-delimited JSON off a socket here instead of generating it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cascade::{
    Event, EventCollector, EngineConfig, FieldGrouping, Job, Operator, RunningJob, Source, SourceSpec, OperatorSpec,
    StreamEngine,
};

/// Simulates a fixed-rate feed of vehicle sensor readings. Each instance
/// reads from a disjoint slice of a shared counter so that parallel
/// instances do not emit duplicate readings.
#[derive(Clone)]
struct SensorReader {
    remaining: Arc<AtomicU64>,
    vehicle_types: Vec<&'static str>,
}

impl SensorReader {
    fn new(total_readings: u64) -> Self {
        Self {
            remaining: Arc::new(AtomicU64::new(total_readings)),
            vehicle_types: vec!["car", "truck", "motorcycle", "bus"],
        }
    }
}

impl Source for SensorReader {
    fn setup_instance(&mut self, instance: usize) {
        log::info!("sensor reader instance {instance} ready");
    }

    fn get_events(&mut self, collector: &mut EventCollector) {
        let remaining = self.remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            if n == 0 {
                None
            } else {
                Some(n - 1)
            }
        });
        let Ok(n) = remaining else {
            // Feed exhausted; sleep instead of busy-polling (§6's "busy
            // poll is the user's responsibility to prevent").
            std::thread::sleep(Duration::from_millis(50));
            return;
        };
        let vehicle_type = self.vehicle_types[(n as usize) % self.vehicle_types.len()];
        collector.add_default(Event::single("vehicle_type", vehicle_type));
    }
}

/// Counts vehicles of each type seen by this instance. Instance state is
/// private (the engine deep-clones the component once per instance, §4.6),
/// so no locking is needed here even though several instances run in
/// parallel.
#[derive(Clone, Default)]
struct VehicleCounter {
    counts: std::collections::HashMap<String, u64>,
}

impl Operator for VehicleCounter {
    fn setup_instance(&mut self, instance: usize) {
        log::info!("vehicle counter instance {instance} ready");
    }

    fn apply(&mut self, _stream_name: &str, event: &Event, collector: &mut EventCollector) {
        let Some(vehicle_type) = event.get_field("vehicle_type").and_then(|v| v.as_str()) else {
            return;
        };
        let count = self.counts.entry(vehicle_type.to_string()).or_insert(0);
        *count += 1;
        collector.add_default(Event::single("vehicle_type", vehicle_type).with_stream_name("counted"));
        log::debug!("{vehicle_type}: {count}");
    }
}

fn main() {
    env_logger::init();

    let job = Job::new("vehicle-monitoring");
    let source_stream = job
        .add_source(SourceSpec::new("sensor-reader", 2, SensorReader::new(500)))
        .expect("sensor reader registered once");

    let counter = job.add_operator(
        OperatorSpec::new("vehicle-counter", 4, VehicleCounter::default())
            .with_grouping("default", FieldGrouping::new(|e: &Event| {
                e.get_field("vehicle_type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string()
            })),
    );
    source_stream.apply_operator(&counter).expect("single edge");

    let engine = StreamEngine::new(EngineConfig::default());
    let running: RunningJob = engine.submit(job).expect("topology is valid");

    std::thread::sleep(Duration::from_secs(2));
    running.stop();
}
