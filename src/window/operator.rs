use std::time::Duration;

use dyn_clone::DynClone;

use crate::clock::now_ms;
use crate::collector::EventCollector;
use crate::event::Event;
use crate::graph::component::Operator;
use crate::window::{EventWindow, WindowingStrategy};

/// A user-level operator whose unit of work is an entire closed
/// [`EventWindow`] rather than a single event.
///
/// Implement this the way you would implement [`Operator`], but emit into
/// `collector` once per window instead of once per event. `apply_window` is
/// called from the same worker thread as `setup_instance`, in window-start
/// ascending order whenever more than one window closes at once.
pub trait WindowOperator: DynClone + Send {
    fn setup_instance(&mut self, instance: usize);

    fn apply_window(&mut self, window: EventWindow, collector: &mut EventCollector);
}

dyn_clone::clone_trait_object!(WindowOperator);

/// The engine-internal adapter that owns a [`WindowingStrategy`] and
/// delegates every window it closes to a user [`WindowOperator`] (§4.5,
/// §9 of the design).
///
/// `Stream::with_windowing(strategy).apply_operator(...)` builds one of
/// these for you; user code never constructs it directly.
#[derive(Clone)]
pub struct WindowingOperator {
    strategy: Box<dyn WindowingStrategy>,
    user_operator: Box<dyn WindowOperator>,
}

impl WindowingOperator {
    pub fn new(strategy: Box<dyn WindowingStrategy>, user_operator: Box<dyn WindowOperator>) -> Self {
        Self {
            strategy,
            user_operator,
        }
    }

    fn emit_ready_windows(&mut self, processing_time: i64, collector: &mut EventCollector) {
        for window in self.strategy.ready_windows(processing_time) {
            log::debug!(
                "closing window [{}, {}) with {} event(s)",
                window.start(),
                window.end(),
                window.events().len()
            );
            self.user_operator.apply_window(window, collector);
        }
    }
}

impl Operator for WindowingOperator {
    fn setup_instance(&mut self, instance: usize) {
        self.user_operator.setup_instance(instance);
    }

    fn apply(&mut self, _stream_name: &str, event: &Event, collector: &mut EventCollector) {
        let processing_time = now_ms();
        if let Err(err) = self.strategy.add(event, processing_time) {
            log::warn!("windowing operator dropped an event: {err}");
        }
        self.emit_ready_windows(processing_time, collector);
    }

    fn idle_tick_interval(&self) -> Option<Duration> {
        Some(self.strategy.idle_tick_interval())
    }

    fn on_idle_tick(&mut self, collector: &mut EventCollector) {
        self.emit_ready_windows(now_ms(), collector);
    }
}
