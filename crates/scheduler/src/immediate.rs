//! Synchronous scheduler: every task runs in-line on the caller's thread.
//!
//! Recursive tasks call straight back into scheduling, so each iteration
//! adds native stack frames. Very deep chains belong on a [`Trampoline`].
//!
//! [`Trampoline`]: crate::trampoline::Trampoline

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::runner::Runner;
use crate::stats::{SchedulerKind, SchedulerStats, TaskCounters};
use crate::task::{Again, AgainAfter, Next};
use crate::traits::Scheduler;

/// Runs tasks immediately. Delays are slept out on the calling thread.
///
/// Safe to share between threads; there is no queue to protect.
#[derive(Debug, Clone, Default)]
pub struct Immediate {
    counters: Arc<TaskCounters>,
}

impl Immediate {
    pub fn new() -> Self {
        Self::default()
    }

    fn run(&self, task: impl FnOnce()) -> Runner {
        self.counters.record_executed();
        task();
        // The task has finished; canceling the handle can no longer matter.
        Runner::new()
    }

    fn run_recursive(&self, task: Rc<dyn Fn(&Again)>) {
        let again = {
            let this = self.clone();
            let task = Rc::clone(&task);
            Again::new(move || this.run_recursive(Rc::clone(&task)))
        };
        self.run(|| task(&again));
    }

    fn run_future_recursive(&self, due: Duration, task: Rc<dyn Fn(&AgainAfter)>) {
        thread::sleep(due);
        let again = {
            let this = self.clone();
            let task = Rc::clone(&task);
            AgainAfter::new(move |due| this.run_future_recursive(due, Rc::clone(&task)))
        };
        self.run(|| task(&again));
    }

    fn run_loop(&self, index: usize, task: Rc<dyn Fn(usize, &Next)>) {
        let next = {
            let this = self.clone();
            let task = Rc::clone(&task);
            Next::new(move |next| this.run_loop(next, Rc::clone(&task)))
        };
        self.run(|| task(index, &next));
    }
}

impl Scheduler for Immediate {
    fn schedule<F>(&self, task: F) -> Runner
    where
        F: FnOnce() + Send + 'static,
    {
        self.run(task)
    }

    fn schedule_recursive<F>(&self, task: F) -> Runner
    where
        F: Fn(&Again) + Send + 'static,
    {
        self.run_recursive(Rc::new(task));
        Runner::new()
    }

    fn schedule_loop<F>(&self, from: usize, task: F) -> Runner
    where
        F: Fn(usize, &Next) + Send + 'static,
    {
        self.run_loop(from, Rc::new(task));
        Runner::new()
    }

    fn schedule_future<F>(&self, due: Duration, task: F) -> Runner
    where
        F: FnOnce() + Send + 'static,
    {
        thread::sleep(due);
        self.run(task)
    }

    fn schedule_future_recursive<F>(&self, due: Duration, task: F) -> Runner
    where
        F: Fn(&AgainAfter) + Send + 'static,
    {
        self.run_future_recursive(due, Rc::new(task));
        Runner::new()
    }

    /// Nothing is ever pending once a schedule call has returned.
    fn wait(&self) {}

    fn cancel(&self) {}

    fn yield_now(&self) {
        thread::yield_now();
    }

    fn is_concurrent(&self) -> bool {
        false
    }

    fn count(&self) -> usize {
        0
    }

    fn stats(&self) -> SchedulerStats {
        self.counters.snapshot(SchedulerKind::Immediate, 0, 0)
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Immediate{ Synchronous:Immediate }")
    }
}
