//! Wall-clock access for the windowing strategies (§4.5 of the design).
//!
//! Window closure is driven by processing time, not event time propagated
//! from sources, so every `WindowingOperator` instance needs a cheap way to
//! read "now" in milliseconds. `coarsetime` avoids a syscall on every single
//! event by caching the last reading and updating it from a background
//! thread; `now_ms` below is explicit about the slight staleness that
//! implies, since closure at millisecond granularity does not need to be
//! exact to the microsecond.
use coarsetime::Clock;

/// The current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    Clock::now_since_epoch().as_millis() as i64
}
