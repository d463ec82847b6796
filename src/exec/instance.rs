//! Per-instance worker loops for sources and operators (§4.6 of the design).

use std::panic::{self, AssertUnwindSafe};
use std::thread::JoinHandle;

use indexmap::IndexMap;

use crate::collector::EventCollector;
use crate::graph::component::{Operator, Source};
use crate::queue::EventQueue;

/// Per-channel set of downstream queues an instance fans its output into.
pub(crate) type OutgoingQueues = IndexMap<String, Vec<EventQueue>>;

/// Run `f`, logging and swallowing a panic instead of letting it take the
/// whole worker thread down. This is the engine's "recoverable per-event failure"
/// path for user code that has no `Result` to report through (`get_events`,
/// `apply`, `apply_window` are all infallible by signature).
fn guard<R>(label: &str, f: impl FnOnce() -> R + panic::UnwindSafe) -> Option<R> {
    panic::catch_unwind(f).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic payload was not a string".to_string());
        log::warn!("{label} panicked: {message}");
    })
    .ok()
}

/// Fan a collector's events out to every registered channel's queues,
/// dropping any queue that turns out to be closed. Returns `true` once no
/// outgoing queue remains at all, the signal for the caller to stop the
/// instance (nothing downstream can ever receive its output again).
fn fan_out(collector: &EventCollector, outgoing: &mut OutgoingQueues, label: &str) -> bool {
    for channel in collector.registered_channels() {
        let Some(queues) = outgoing.get_mut(channel) else {
            continue;
        };
        for event in collector.event_list(channel) {
            queues.retain(|queue| match queue.put(event.clone()) {
                Ok(()) => true,
                Err(err) => {
                    log::error!("{label}: downstream queue on channel `{channel}` closed: {err}");
                    false
                }
            });
        }
    }
    outgoing.values().all(Vec::is_empty)
}

pub(crate) fn spawn_source_instance(
    component_name: String,
    index: usize,
    mut source: Box<dyn Source>,
    channels: Vec<String>,
    mut outgoing: OutgoingQueues,
) -> JoinHandle<()> {
    let label = format!("{component_name}#{index} (source)");
    let had_outgoing_queues = outgoing.values().any(|queues| !queues.is_empty());
    std::thread::Builder::new()
        .name(label.clone())
        .spawn(move || {
            source.setup_instance(index);
            log::debug!("{label} started");
            let mut collector = EventCollector::new();
            for channel in &channels {
                collector.register_channel(channel);
            }
            loop {
                collector.clear();
                guard(&label, AssertUnwindSafe(|| source.get_events(&mut collector)));
                if had_outgoing_queues && fan_out(&collector, &mut outgoing, &label) {
                    break;
                }
            }
            log::debug!("{label} stopped");
        })
        .expect("failed to spawn source instance thread")
}

pub(crate) fn spawn_operator_instance(
    component_name: String,
    index: usize,
    mut operator: Box<dyn Operator>,
    input_queue: EventQueue,
    channels: Vec<String>,
    mut outgoing: OutgoingQueues,
) -> JoinHandle<()> {
    let label = format!("{component_name}#{index} (operator)");
    let had_outgoing_queues = outgoing.values().any(|queues| !queues.is_empty());
    std::thread::Builder::new()
        .name(label.clone())
        .spawn(move || {
            operator.setup_instance(index);
            log::debug!("{label} started");
            let mut collector = EventCollector::new();
            for channel in &channels {
                collector.register_channel(channel);
            }
            loop {
                // Bounded wait when the operator opted into idle ticking
                // (only `WindowingOperator` does); otherwise block forever,
                // the way a plain single-input operator is expected to.
                let received = match operator.idle_tick_interval() {
                    Some(interval) => input_queue.take_timeout(interval),
                    None => input_queue.take().map(Some),
                };
                let event = match received {
                    Ok(event) => event,
                    Err(err) => {
                        log::error!("{label}: {err}");
                        break;
                    }
                };

                collector.clear();
                match &event {
                    Some(event) => {
                        let stream_name = event.stream_name_or_default().to_string();
                        guard(
                            &label,
                            AssertUnwindSafe(|| operator.apply(&stream_name, event, &mut collector)),
                        );
                    }
                    None => {
                        guard(&label, AssertUnwindSafe(|| operator.on_idle_tick(&mut collector)));
                    }
                }

                if had_outgoing_queues && fan_out(&collector, &mut outgoing, &label) {
                    break;
                }
            }
            log::debug!("{label} stopped");
        })
        .expect("failed to spawn operator instance thread")
}
