use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{EngineError, EngineResult};
use crate::event::Event;
use crate::window::{EventWindow, WindowingStrategy};

/// A sliding time window of `length_ms`, advancing every `interval_ms`, with
/// events accepted up to `watermark_ms` late (§3, §4.5 of the design).
///
/// `FixedTimeWindowingStrategy` from the design is not a distinct type here:
/// it is the special case `interval_ms == length_ms`, constructed with
/// [`SlidingTimeWindowingStrategy::fixed`].
#[derive(Clone)]
pub struct SlidingTimeWindowingStrategy {
    length_ms: i64,
    interval_ms: i64,
    watermark_ms: i64,
    windows: BTreeMap<i64, EventWindow>,
}

impl SlidingTimeWindowingStrategy {
    /// `length_ms >= interval_ms > 0`, `watermark_ms >= 0`.
    pub fn new(length_ms: i64, interval_ms: i64, watermark_ms: i64) -> Self {
        assert!(interval_ms > 0, "interval must be strictly positive");
        assert!(length_ms >= interval_ms, "length must be >= interval");
        assert!(watermark_ms >= 0, "watermark must be non-negative");
        Self {
            length_ms,
            interval_ms,
            watermark_ms,
            windows: BTreeMap::new(),
        }
    }

    /// A fixed (non-overlapping) window: `interval_ms == length_ms`.
    pub fn fixed(length_ms: i64, watermark_ms: i64) -> Self {
        Self::new(length_ms, length_ms, watermark_ms)
    }

    fn is_late(&self, event_time: i64, processing_time: i64) -> bool {
        event_time + self.watermark_ms < processing_time
    }
}

impl WindowingStrategy for SlidingTimeWindowingStrategy {
    fn add(&mut self, event: &Event, processing_time: i64) -> EngineResult<()> {
        let event_time = event.timestamp().ok_or(EngineError::UntimedEvent)?;
        if self.is_late(event_time, processing_time) {
            log::trace!("dropping late event with timestamp {event_time}");
            return Ok(());
        }

        let most_recent_start = (event_time.div_euclid(self.interval_ms)) * self.interval_ms;
        let mut start = most_recent_start;
        while event_time < start + self.length_ms {
            let window = self
                .windows
                .entry(start)
                .or_insert_with(|| EventWindow::new(start, start + self.length_ms));
            window.push(event.clone());
            start -= self.interval_ms;
        }
        Ok(())
    }

    fn ready_windows(&mut self, processing_time: i64) -> Vec<EventWindow> {
        let expired_starts: Vec<i64> = self
            .windows
            .iter()
            .filter(|(_, window)| processing_time >= window.end() + self.watermark_ms)
            .map(|(start, _)| *start)
            .collect();

        // `BTreeMap` iterates in ascending key order, so `expired_starts` is
        // already ascending by start time.
        expired_starts
            .into_iter()
            .filter_map(|start| self.windows.remove(&start))
            .collect()
    }

    fn idle_tick_interval(&self) -> Duration {
        let millis = self.interval_ms.min(self.watermark_ms.max(1)).min(100).max(1);
        Duration::from_millis(millis as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(t: i64) -> Event {
        Event::single("t", t).with_timestamp(t)
    }

    #[test]
    fn an_event_lands_in_every_covering_window() {
        let mut strategy = SlidingTimeWindowingStrategy::new(10_000, 5_000, 0);
        strategy.add(&timed(7_000), 7_000).unwrap();
        // t=7000 falls in [0,10000) and [5000,15000)
        assert_eq!(strategy.windows.len(), 2);
        assert!(strategy.windows.contains_key(&0));
        assert!(strategy.windows.contains_key(&5_000));
    }

    #[test]
    fn late_events_are_dropped() {
        let mut strategy = SlidingTimeWindowingStrategy::fixed(5_000, 2_000);
        // event_time + watermark < processing_time  =>  100 + 2000 < 3000
        strategy.add(&timed(100), 3_000).unwrap();
        assert!(strategy.windows.is_empty());
    }

    #[test]
    fn untimed_events_are_rejected() {
        let mut strategy = SlidingTimeWindowingStrategy::fixed(5_000, 0);
        let err = strategy.add(&Event::single("x", 1), 0).unwrap_err();
        assert!(matches!(err, EngineError::UntimedEvent));
    }

    #[test]
    fn fixed_window_closure_matches_the_literal_scenario() {
        // Scenario 5 of the design: length=5000, watermark=2000.
        let mut strategy = SlidingTimeWindowingStrategy::fixed(5_000, 2_000);
        strategy.add(&timed(100), 100).unwrap();
        strategy.add(&timed(4_900), 4_900).unwrap();
        strategy.add(&timed(5_000), 5_000).unwrap();

        assert!(strategy.ready_windows(6_999).is_empty());

        let ready = strategy.ready_windows(7_000);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].start(), 0);
        assert_eq!(ready[0].events().len(), 2);

        assert!(strategy.ready_windows(11_999).is_empty());
        let ready = strategy.ready_windows(12_000);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].start(), 5_000);
    }

    #[test]
    fn ready_windows_are_emitted_in_ascending_start_order() {
        let mut strategy = SlidingTimeWindowingStrategy::fixed(1_000, 0);
        strategy.add(&timed(2_500), 2_500).unwrap();
        strategy.add(&timed(500), 500).unwrap();
        let ready = strategy.ready_windows(10_000);
        let starts: Vec<_> = ready.iter().map(|w| w.start()).collect();
        assert_eq!(starts, vec![0, 2_000]);
    }
}
