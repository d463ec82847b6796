//! End-to-end tests exercising the physical topology `StreamEngine::submit`
//! materialises: real worker threads, real bounded queues, real
//! dispatchers. These correspond to the literal scenarios of §8 of the
//! design.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cascade::{
    AllGrouping, EngineConfig, EngineError, Event, EventCollector, FieldGrouping, Job, NamedStreams, Operator,
    OperatorSpec, RoundRobin, Source, SourceSpec, StreamEngine,
};

/// Polls `condition` until it returns `true` or `timeout` elapses, panicking
/// in the latter case. Everything under test here completes in
/// microseconds; a generous timeout just keeps the test from hanging if
/// something regresses.
fn wait_until(mut condition: impl FnMut() -> bool, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !condition() {
        if Instant::now() >= deadline {
            panic!("condition was not met within {timeout:?}");
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// A source that hands out a fixed list of events once each, then idles.
#[derive(Clone)]
struct FixedFeed {
    items: Arc<Mutex<VecDeque<&'static str>>>,
}

impl FixedFeed {
    fn new(items: &[&'static str]) -> Self {
        Self {
            items: Arc::new(Mutex::new(items.iter().copied().collect())),
        }
    }
}

impl Source for FixedFeed {
    fn setup_instance(&mut self, _instance: usize) {}

    fn get_events(&mut self, collector: &mut EventCollector) {
        let next = self.items.lock().unwrap().pop_front();
        match next {
            Some(v) => collector.add_default(Event::single("v", v)),
            None => std::thread::sleep(Duration::from_millis(10)),
        }
    }
}

/// Appends `(instance, value)` into a shared, user-synchronized sink so the
/// test can observe what each instance received, in the order it arrived.
#[derive(Clone)]
struct RecordingOperator {
    seen: Arc<Mutex<Vec<(usize, String)>>>,
    instance: usize,
}

impl RecordingOperator {
    fn new(seen: Arc<Mutex<Vec<(usize, String)>>>) -> Self {
        Self { seen, instance: 0 }
    }
}

impl Operator for RecordingOperator {
    fn setup_instance(&mut self, instance: usize) {
        self.instance = instance;
    }

    fn apply(&mut self, _stream_name: &str, event: &Event, _collector: &mut EventCollector) {
        let value = event
            .get_field("v")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        self.seen.lock().unwrap().push((self.instance, value));
    }
}

fn values_for(seen: &[(usize, String)], instance: usize) -> Vec<String> {
    seen.iter()
        .filter(|(i, _)| *i == instance)
        .map(|(_, v)| v.clone())
        .collect()
}

#[test]
fn round_robin_fan_out_matches_scenario_one() {
    let job = Job::new("round-robin");
    let feed = FixedFeed::new(&["a", "b", "c", "d", "e"]);
    let source_stream = job.add_source(SourceSpec::new("feed", 1, feed)).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let op = job.add_operator(OperatorSpec::new("recorder", 2, RecordingOperator::new(seen.clone())));
    source_stream.apply_operator(&op).unwrap();

    let running = StreamEngine::new(EngineConfig::default()).submit(job).unwrap();
    wait_until(|| seen.lock().unwrap().len() >= 5, Duration::from_secs(5));
    running.stop();

    let seen = seen.lock().unwrap();
    assert_eq!(values_for(&seen, 0), vec!["a", "c", "e"]);
    assert_eq!(values_for(&seen, 1), vec!["b", "d"]);
}

#[test]
fn field_grouping_keeps_the_same_key_on_one_instance() {
    let job = Job::new("field-grouping");
    let feed = FixedFeed::new(&["k1", "k2", "k1", "k3", "k2"]);
    let source_stream = job.add_source(SourceSpec::new("feed", 1, feed)).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let op = job.add_operator(
        OperatorSpec::new("recorder", 3, RecordingOperator::new(seen.clone())).with_grouping(
            "default",
            FieldGrouping::new(|e: &Event| e.get_field("v").and_then(|v| v.as_str()).unwrap().to_string()),
        ),
    );
    source_stream.apply_operator(&op).unwrap();

    let running = StreamEngine::new(EngineConfig::default()).submit(job).unwrap();
    wait_until(|| seen.lock().unwrap().len() >= 5, Duration::from_secs(5));
    running.stop();

    let seen = seen.lock().unwrap();
    let instance_of = |key: &str| {
        seen.iter()
            .find(|(_, v)| v == key)
            .map(|(i, _)| *i)
            .unwrap_or_else(|| panic!("key {key} never arrived"))
    };
    let k1_instances: Vec<usize> = seen.iter().filter(|(_, v)| v == "k1").map(|(i, _)| *i).collect();
    let k2_instances: Vec<usize> = seen.iter().filter(|(_, v)| v == "k2").map(|(i, _)| *i).collect();
    assert_eq!(k1_instances.len(), 2);
    assert!(k1_instances.iter().all(|i| *i == k1_instances[0]));
    assert_eq!(k2_instances.len(), 2);
    assert!(k2_instances.iter().all(|i| *i == k2_instances[0]));
    assert_eq!(instance_of("k1"), k1_instances[0]);
}

#[test]
fn all_grouping_broadcasts_to_every_instance_in_order() {
    let job = Job::new("all-grouping");
    let feed = FixedFeed::new(&["first", "second"]);
    let source_stream = job.add_source(SourceSpec::new("feed", 1, feed)).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let op = job.add_operator(
        OperatorSpec::new("recorder", 3, RecordingOperator::new(seen.clone()))
            .with_grouping("default", AllGrouping::new()),
    );
    source_stream.apply_operator(&op).unwrap();

    let running = StreamEngine::new(EngineConfig::default()).submit(job).unwrap();
    wait_until(|| seen.lock().unwrap().len() >= 6, Duration::from_secs(5));
    running.stop();

    let seen = seen.lock().unwrap();
    for instance in 0..3 {
        assert_eq!(values_for(&seen, instance), vec!["first", "second"]);
    }
}

#[test]
fn named_inputs_apply_per_input_grouping() {
    let job = Job::new("named-inputs");
    let vehicle_feed = FixedFeed::new(&["v1", "v2", "v3", "v4"]);
    let temperature_feed = FixedFeed::new(&["t1", "t2"]);

    let vehicle_stream = job.add_source(SourceSpec::new("vehicle-feed", 1, vehicle_feed)).unwrap();
    let temperature_stream = job
        .add_source(SourceSpec::new("temperature-feed", 1, temperature_feed))
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let joiner = job.add_operator(
        OperatorSpec::join("joiner", 2, RecordingOperator::new(seen.clone()))
            .with_grouping("vehicle", RoundRobin::new())
            .with_grouping("temperature", AllGrouping::new()),
    );

    NamedStreams::of([("vehicle", vehicle_stream), ("temperature", temperature_stream)])
        .join(&joiner)
        .unwrap();

    let running = StreamEngine::new(EngineConfig::default()).submit(job).unwrap();
    // 4 vehicle events split 2/2, 2 temperature events broadcast to both => 8 total.
    wait_until(|| seen.lock().unwrap().len() >= 8, Duration::from_secs(5));
    running.stop();

    let seen = seen.lock().unwrap();
    let vehicle_total: usize = (0..2).map(|i| values_for(&seen, i).iter().filter(|v| v.starts_with('v')).count()).sum();
    assert_eq!(vehicle_total, 4);
    for instance in 0..2 {
        let vehicle_count = values_for(&seen, instance).iter().filter(|v| v.starts_with('v')).count();
        assert_eq!(vehicle_count, 2, "vehicle events should split 50/50");
        let temperature_count = values_for(&seen, instance).iter().filter(|v| v.starts_with('t')).count();
        assert_eq!(temperature_count, 2, "temperature events should reach every instance");
    }
}

#[test]
fn duplicate_edge_is_rejected() {
    let job = Job::new("duplicate-edge");
    let feed = FixedFeed::new(&["a"]);
    let source_stream = job.add_source(SourceSpec::new("feed", 1, feed)).unwrap();
    let op = job.add_operator(OperatorSpec::new(
        "recorder",
        1,
        RecordingOperator::new(Arc::new(Mutex::new(Vec::new()))),
    ));

    source_stream.apply_operator(&op).unwrap();
    let err = source_stream.apply_operator(&op).unwrap_err();
    assert!(matches!(err, EngineError::DuplicateEdge { .. }));
}

#[test]
fn cyclic_topology_is_rejected_at_submit() {
    let job = Job::new("cyclic");
    let feed = FixedFeed::new(&["a"]);
    let source_stream = job.add_source(SourceSpec::new("feed", 1, feed)).unwrap();

    let first = job.add_operator(OperatorSpec::new(
        "first",
        1,
        RecordingOperator::new(Arc::new(Mutex::new(Vec::new()))),
    ));
    let second = job.add_operator(OperatorSpec::new(
        "second",
        1,
        RecordingOperator::new(Arc::new(Mutex::new(Vec::new()))),
    ));

    let s1 = source_stream.apply_operator(&first).unwrap();
    let s2 = s1.apply_operator(&second).unwrap();
    // Feeding `second`'s output back into `first` closes a cycle.
    s2.apply_operator(&first).unwrap();

    let err = StreamEngine::new(EngineConfig::default()).submit(job).unwrap_err();
    assert!(matches!(err, EngineError::CyclicTopology(_)));
}
