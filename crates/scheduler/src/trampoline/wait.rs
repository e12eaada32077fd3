//! Strategies for waiting out a queued task's due time.
//!
//! Both honor cancellation right up to the moment the task would start.

use std::thread;
use std::time::{Duration, Instant};

use crate::runner::Runner;

/// Far enough out that nothing scheduled there will run in practice.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// `now + delay`, clamped instead of overflowing.
pub(crate) fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Wait until `due` unless `runner` is canceled first. Imminent due times
/// are spun out by yielding the thread; anything past `short_wait` arms a
/// timer. Returns `true` when the task should run.
pub(crate) fn until_due(due: Instant, runner: &Runner, short_wait: Duration) -> bool {
    if due.saturating_duration_since(Instant::now()) < short_wait {
        spin_until(due, runner)
    } else {
        runner.sleep_until(due)
    }
}

fn spin_until(due: Instant, runner: &Runner) -> bool {
    while Instant::now() < due {
        if runner.is_canceled() {
            return false;
        }
        thread::yield_now();
    }
    !runner.is_canceled()
}
