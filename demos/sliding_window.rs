//! Counts events per 5-second sliding window over a synthetic timed-event
//! feed, exercising §4.5 of the design end to end including the idle
//! ticker that lets windows close under a stalled input.

use std::time::Duration;

use cascade::{
    clock::now_ms, EngineConfig, Event, EventCollector, EventWindow, Job, RunningJob, SlidingTimeWindowingStrategy,
    Source, SourceSpec, StreamEngine, WindowOperator,
};

/// Emits one timestamped event roughly every 200ms, tagged with the wall
/// clock at the moment of emission so `WindowingOperator` can bucket it by
/// event time.
struct TickingFeed {
    emitted: u64,
}

impl Clone for TickingFeed {
    fn clone(&self) -> Self {
        Self { emitted: 0 }
    }
}

impl Source for TickingFeed {
    fn setup_instance(&mut self, instance: usize) {
        log::info!("ticking feed instance {instance} ready");
    }

    fn get_events(&mut self, collector: &mut EventCollector) {
        std::thread::sleep(Duration::from_millis(200));
        self.emitted += 1;
        collector.add_default(Event::single("seq", self.emitted).with_timestamp(now_ms()));
    }
}

/// Prints the number of events each closed window contained.
#[derive(Clone, Default)]
struct WindowCounter;

impl WindowOperator for WindowCounter {
    fn setup_instance(&mut self, instance: usize) {
        log::info!("window counter instance {instance} ready");
    }

    fn apply_window(&mut self, window: EventWindow, _collector: &mut EventCollector) {
        log::info!(
            "window [{}, {}) closed with {} event(s)",
            window.start(),
            window.end(),
            window.events().len()
        );
    }
}

fn main() {
    env_logger::init();

    let job = Job::new("sliding-window-counts");
    let feed = job
        .add_source(SourceSpec::new("ticking-feed", 1, TickingFeed { emitted: 0 }))
        .expect("feed registered once");

    // A 5-second window sliding every 1 second with a 500ms watermark.
    let strategy = SlidingTimeWindowingStrategy::new(5_000, 1_000, 500);
    feed.with_windowing(strategy)
        .apply_operator("window-counter", 1, WindowCounter::default())
        .expect("single edge");

    let engine = StreamEngine::new(EngineConfig::default());
    let running: RunningJob = engine.submit(job).expect("topology is valid");

    std::thread::sleep(Duration::from_secs(10));
    running.stop();
}
