//! Concurrent scheduler: one OS thread per top-level task.
//!
//! Recursive submissions get a thread of their own that drives a private,
//! deferred [`Trampoline`]. Every iteration of one chain therefore runs
//! serially on that thread, while separate chains race each other.
//! Nothing is shared between chains except the active-unit counter.

mod wait_group;
#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel;
use stupid_core::SchedulerSettings;
use tracing::{debug, error, trace};

use crate::error::SchedulerError;
use crate::runner::Runner;
use crate::stats::{SchedulerKind, SchedulerStats, TaskCounters};
use crate::task::{Again, AgainAfter, Next};
use crate::trampoline::{deadline_after, DrainMode, Trampoline};
use crate::traits::Scheduler;

use self::wait_group::WaitGroup;

/// Thread-per-task scheduler. Safe to share between threads; wrap it in an
/// `Arc` or use the process-wide instance from [`crate::global`].
pub struct Goroutine {
    settings: SchedulerSettings,
    active: WaitGroup,
    spawned: AtomicU64,
    counters: Arc<TaskCounters>,
}

impl Goroutine {
    pub fn new() -> Self {
        Self::with_settings(&SchedulerSettings::default())
    }

    pub fn with_settings(settings: &SchedulerSettings) -> Self {
        Self {
            settings: settings.clone(),
            active: WaitGroup::default(),
            spawned: AtomicU64::new(0),
            counters: Arc::new(TaskCounters::default()),
        }
    }

    /// Start one execution unit. The active count is raised before the
    /// thread exists and lowered when `job` returns or unwinds. If the
    /// thread cannot be started the reservation is released with the
    /// dropped closure.
    fn spawn_unit<F>(&self, job: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let active = self.active.enter();
        let id = self.spawned.fetch_add(1, Ordering::Relaxed);
        let mut builder = thread::Builder::new().name(format!("{}-{}", self.settings.thread_name, id));
        if let Some(size) = self.settings.stack_size {
            builder = builder.stack_size(size);
        }
        builder.spawn(move || {
            let _active = active;
            job();
        })?;
        trace!(unit = id, "execution unit started");
        Ok(())
    }

    /// Run `task` on a new unit once `ready` says so.
    fn dispatch<F, R>(&self, ready: R, task: F) -> Runner
    where
        F: FnOnce() + Send + 'static,
        R: FnOnce(&Runner) -> bool + Send + 'static,
    {
        let runner = Runner::new();
        let gate = runner.clone();
        let counters = Arc::clone(&self.counters);
        let spawned = self.spawn_unit(move || {
            if ready(&gate) {
                counters.record_executed();
                task();
            } else {
                debug!("skipping canceled task");
                counters.record_canceled();
            }
        });
        if let Err(e) = spawned {
            error!(error = %e, "dropping task");
            runner.cancel();
        }
        runner
    }

    /// Start a unit that owns a private trampoline, let `start` put the
    /// first iteration on it, hand that iteration's runner back to the
    /// caller, then drain the chain.
    fn dispatch_chain<S>(&self, start: S) -> Runner
    where
        S: FnOnce(&Trampoline) -> Runner + Send + 'static,
    {
        let (tx, rx) = channel::bounded(1);
        let settings = self.settings.clone();
        let counters = Arc::clone(&self.counters);
        let spawned = self.spawn_unit(move || {
            let serial = Trampoline::with_settings(DrainMode::Deferred, &settings);
            // The caller may have stopped listening; the chain still runs.
            let _ = tx.send(start(&serial));
            serial.wait();
            counters.merge(&serial.stats());
        });
        match spawned {
            Ok(()) => rx.recv().unwrap_or_else(|_| Runner::canceled()),
            Err(e) => {
                error!(error = %e, "dropping recursive task");
                Runner::canceled()
            }
        }
    }
}

impl Default for Goroutine {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for Goroutine {
    fn schedule<F>(&self, task: F) -> Runner
    where
        F: FnOnce() + Send + 'static,
    {
        self.dispatch(|gate| !gate.is_canceled(), task)
    }

    fn schedule_recursive<F>(&self, task: F) -> Runner
    where
        F: Fn(&Again) + Send + 'static,
    {
        self.dispatch_chain(move |serial| serial.schedule_recursive(task))
    }

    fn schedule_loop<F>(&self, from: usize, task: F) -> Runner
    where
        F: Fn(usize, &Next) + Send + 'static,
    {
        self.dispatch_chain(move |serial| serial.schedule_loop(from, task))
    }

    fn schedule_future<F>(&self, due: Duration, task: F) -> Runner
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = deadline_after(due);
        self.dispatch(move |gate| gate.sleep_until(deadline), task)
    }

    fn schedule_future_recursive<F>(&self, due: Duration, task: F) -> Runner
    where
        F: Fn(&AgainAfter) + Send + 'static,
    {
        self.dispatch_chain(move |serial| serial.schedule_future_recursive(due, task))
    }

    /// Block until every dispatched unit has finished. Calling this from a
    /// task running on the same scheduler never returns, since that task's
    /// own unit is still counted.
    fn wait(&self) {
        self.active.wait();
    }

    /// Dispatched units cannot be recalled. Cancel individual runners to
    /// keep work that has not started from running.
    fn cancel(&self) {
        debug!(active = self.count(), "scheduler-wide cancel has no effect on dispatched units");
    }

    fn yield_now(&self) {
        thread::yield_now();
    }

    fn is_concurrent(&self) -> bool {
        true
    }

    fn count(&self) -> usize {
        self.active.count()
    }

    fn stats(&self) -> SchedulerStats {
        self.counters.snapshot(SchedulerKind::Goroutine, 0, self.count())
    }
}

impl fmt::Display for Goroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Goroutine{{ tasks = {} }}", self.count())
    }
}

impl fmt::Debug for Goroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Goroutine")
            .field("thread_name", &self.settings.thread_name)
            .field("tasks", &self.count())
            .finish()
    }
}
