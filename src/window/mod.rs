//! Windowing strategies and the user/engine operator split that closes over
//! them (§4.5 of the design).

mod operator;
mod sliding;

pub use operator::{WindowOperator, WindowingOperator};
pub use sliding::SlidingTimeWindowingStrategy;

use std::time::Duration;

use crate::error::EngineResult;
use crate::event::Event;

/// A half-open interval `[start, end)` of event time owning every event
/// whose timestamp fell inside it.
///
/// Once a `WindowingStrategy` hands a window to `get_event_windows`/
/// `ready_windows`, the window is released from the strategy's index: it is
/// emitted exactly once.
#[derive(Debug, Clone)]
pub struct EventWindow {
    start: i64,
    end: i64,
    events: Vec<Event>,
}

impl EventWindow {
    pub(crate) fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            events: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

/// A strategy that buckets timestamped events into [`EventWindow`]s and
/// decides, given the current processing time, which windows are closed and
/// ready to be emitted.
///
/// A `WindowingStrategy` is single-threaded: it is owned by exactly one
/// `WindowingOperator` instance, so no synchronization is needed internally.
pub trait WindowingStrategy: dyn_clone::DynClone + Send {
    /// Add a timestamped event at the given processing time. Fails with
    /// `EngineError::UntimedEvent` only if called incorrectly by engine code
    /// (every caller in this crate always supplies a timed event; exposed
    /// for strategies implemented outside it).
    fn add(&mut self, event: &Event, processing_time: i64) -> EngineResult<()>;

    /// Return every window that is closed and past its watermark as of
    /// `processing_time`, removing them from the strategy's internal index.
    /// Ascending start-time order.
    fn ready_windows(&mut self, processing_time: i64) -> Vec<EventWindow>;

    /// How often the engine should invoke [`WindowingOperator::on_idle_tick`]
    /// when no event has arrived, so that closure makes progress under a
    /// stalled input (§4.5's idle-ticker resolution of the open question).
    fn idle_tick_interval(&self) -> Duration;
}

dyn_clone::clone_trait_object!(WindowingStrategy);
