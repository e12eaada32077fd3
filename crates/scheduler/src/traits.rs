use std::fmt;
use std::time::{Duration, Instant};

use crate::runner::Runner;
use crate::stats::SchedulerStats;
use crate::task::{Again, AgainAfter, Next};

/// The contract shared by every scheduler in the family.
///
/// Dispatch never fails: every method accepts the task and returns a
/// [`Runner`]. Panics inside a task are not caught by the scheduler.
pub trait Scheduler: fmt::Display {
    /// Current instant according to the scheduler's clock.
    fn now(&self) -> Instant {
        Instant::now()
    }

    /// Time elapsed since `t`, saturating at zero.
    fn since(&self, t: Instant) -> Duration {
        self.now().saturating_duration_since(t)
    }

    /// Run `task` as soon as the scheduler's policy allows.
    fn schedule<F>(&self, task: F) -> Runner
    where
        F: FnOnce() + Send + 'static;

    /// Run `task`, handing it an [`Again`] that schedules another iteration.
    fn schedule_recursive<F>(&self, task: F) -> Runner
    where
        F: Fn(&Again) + Send + 'static;

    /// Run `task` starting at loop index `from`. The task passes the next
    /// index to [`Next::call`] to continue the loop.
    fn schedule_loop<F>(&self, from: usize, task: F) -> Runner
    where
        F: Fn(usize, &Next) + Send + 'static;

    /// Run `task` once `due` has elapsed. Due times are lower bounds.
    fn schedule_future<F>(&self, due: Duration, task: F) -> Runner
    where
        F: FnOnce() + Send + 'static;

    /// Run `task` once `due` has elapsed; [`AgainAfter`] reschedules it with
    /// a fresh delay.
    fn schedule_future_recursive<F>(&self, due: Duration, task: F) -> Runner
    where
        F: Fn(&AgainAfter) + Send + 'static;

    /// Block until no task is queued or in flight. Work scheduled while
    /// waiting extends the wait.
    fn wait(&self);

    /// Discard queued tasks that have not started. Never interrupts a
    /// running task.
    fn cancel(&self);

    /// Give the scheduler a chance to run other work.
    fn yield_now(&self);

    fn is_concurrent(&self) -> bool;

    /// Number of tasks queued or running.
    fn count(&self) -> usize;

    fn stats(&self) -> SchedulerStats;
}
