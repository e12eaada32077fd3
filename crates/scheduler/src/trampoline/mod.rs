//! Serial scheduler: a time-ordered task queue drained by one thread.
//!
//! Recursive tasks reschedule through the queue instead of calling
//! themselves, so a chain of any length runs as a flat loop inside the
//! drain and never grows the native stack.
//!
//! A [`Trampoline`] is `!Send` and `!Sync`. The queue belongs to the thread
//! that created it and is never locked.

mod queue;
mod wait;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use stupid_core::SchedulerSettings;
use tracing::{debug, trace};

use crate::runner::Runner;
use crate::stats::{SchedulerKind, SchedulerStats, TaskCounters};
use crate::task::{Again, AgainAfter, Next};
use crate::traits::Scheduler;

pub(crate) use self::wait::deadline_after;
use self::queue::{Entry, TaskQueue};

/// When the queue gets drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainMode {
    /// A task scheduled while no drain is running is drained right away on
    /// the scheduling thread. Tasks scheduled from inside a running task
    /// join the drain already in progress.
    Inline,
    /// Tasks only queue up. [`Scheduler::wait`] or [`Scheduler::yield_now`]
    /// runs them.
    Deferred,
}

/// Single-threaded serial scheduler.
///
/// Clones share one queue.
#[derive(Clone)]
pub struct Trampoline {
    inner: Rc<Inner>,
}

struct Inner {
    owner: ThreadId,
    mode: DrainMode,
    short_wait: Duration,
    queue: RefCell<TaskQueue>,
    draining: Cell<bool>,
    running: Cell<usize>,
    counters: TaskCounters,
}

impl Trampoline {
    /// Inline-draining trampoline with default settings.
    pub fn new() -> Self {
        Self::with_settings(DrainMode::Inline, &SchedulerSettings::default())
    }

    /// Trampoline that only runs tasks on `wait`/`yield_now`.
    pub fn deferred() -> Self {
        Self::with_settings(DrainMode::Deferred, &SchedulerSettings::default())
    }

    pub fn with_settings(mode: DrainMode, settings: &SchedulerSettings) -> Self {
        Self {
            inner: Rc::new(Inner {
                owner: thread::current().id(),
                mode,
                short_wait: settings.short_wait_threshold(),
                queue: RefCell::new(TaskQueue::default()),
                draining: Cell::new(false),
                running: Cell::new(0),
                counters: TaskCounters::default(),
            }),
        }
    }

    pub fn mode(&self) -> DrainMode {
        self.inner.mode
    }

    /// Identity of the thread that owns the queue.
    pub fn owner(&self) -> ThreadId {
        self.inner.owner
    }

    /// Whether a task is queued.
    pub fn has_pending(&self) -> bool {
        !self.inner.queue.borrow().is_empty()
    }
}

impl Default for Trampoline {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn enqueue(&self, due: Instant, runner: Runner, run: Box<dyn FnOnce()>) {
        {
            let mut queue = self.queue.borrow_mut();
            queue.insert(Entry { due, run, runner });
            trace!(queued = queue.len(), "task queued");
        }
        if self.mode == DrainMode::Inline && !self.draining.get() {
            self.drain();
        }
    }

    fn drain(&self) {
        let _draining = DrainGuard::enter(&self.draining);
        while self.run_next() {}
    }

    /// Pop the earliest entry, wait for its due time and run it unless it
    /// was canceled. Returns `false` when the queue was empty.
    fn run_next(&self) -> bool {
        let Some(entry) = self.queue.borrow_mut().pop() else {
            return false;
        };
        let _running = RunningGuard::enter(&self.running);
        if wait::until_due(entry.due, &entry.runner, self.short_wait) {
            self.counters.record_executed();
            (entry.run)();
        } else {
            debug!("skipping canceled task");
            self.counters.record_canceled();
        }
        true
    }

    fn count(&self) -> usize {
        self.queue.borrow().len() + self.running.get()
    }
}

// ── Recursive chains ─────────────────────────────────────────────────
//
// Each iteration is a fresh queue entry. The capability holds a weak
// reference to the queue so a dropped trampoline frees its chains.

fn enqueue_recursive(inner: &Rc<Inner>, runner: Runner, task: Rc<dyn Fn(&Again)>) {
    let again = {
        let weak = Rc::downgrade(inner);
        let runner = runner.clone();
        let task = Rc::clone(&task);
        Again::new(move || {
            if let Some(inner) = Weak::upgrade(&weak) {
                enqueue_recursive(&inner, runner.clone(), Rc::clone(&task));
            }
        })
    };
    inner.enqueue(Instant::now(), runner, Box::new(move || task(&again)));
}

fn enqueue_future_recursive(
    inner: &Rc<Inner>,
    due: Duration,
    runner: Runner,
    task: Rc<dyn Fn(&AgainAfter)>,
) {
    let again = {
        let weak = Rc::downgrade(inner);
        let runner = runner.clone();
        let task = Rc::clone(&task);
        AgainAfter::new(move |due| {
            if let Some(inner) = Weak::upgrade(&weak) {
                enqueue_future_recursive(&inner, due, runner.clone(), Rc::clone(&task));
            }
        })
    };
    inner.enqueue(deadline_after(due), runner, Box::new(move || task(&again)));
}

fn enqueue_loop(inner: &Rc<Inner>, index: usize, runner: Runner, task: Rc<dyn Fn(usize, &Next)>) {
    let next = {
        let weak = Rc::downgrade(inner);
        let runner = runner.clone();
        let task = Rc::clone(&task);
        Next::new(move |next| {
            if let Some(inner) = Weak::upgrade(&weak) {
                enqueue_loop(&inner, next, runner.clone(), Rc::clone(&task));
            }
        })
    };
    inner.enqueue(Instant::now(), runner, Box::new(move || task(index, &next)));
}

impl Trampoline {
    // Inherent versions drop the `Send` bound: a task may capture the
    // trampoline it runs on and schedule more work onto it.

    pub fn schedule<F>(&self, task: F) -> Runner
    where
        F: FnOnce() + 'static,
    {
        let runner = Runner::new();
        self.inner.enqueue(Instant::now(), runner.clone(), Box::new(task));
        runner
    }

    pub fn schedule_recursive<F>(&self, task: F) -> Runner
    where
        F: Fn(&Again) + 'static,
    {
        let runner = Runner::new();
        enqueue_recursive(&self.inner, runner.clone(), Rc::new(task));
        runner
    }

    pub fn schedule_loop<F>(&self, from: usize, task: F) -> Runner
    where
        F: Fn(usize, &Next) + 'static,
    {
        let runner = Runner::new();
        enqueue_loop(&self.inner, from, runner.clone(), Rc::new(task));
        runner
    }

    pub fn schedule_future<F>(&self, due: Duration, task: F) -> Runner
    where
        F: FnOnce() + 'static,
    {
        let runner = Runner::new();
        self.inner.enqueue(deadline_after(due), runner.clone(), Box::new(task));
        runner
    }

    pub fn schedule_future_recursive<F>(&self, due: Duration, task: F) -> Runner
    where
        F: Fn(&AgainAfter) + 'static,
    {
        let runner = Runner::new();
        enqueue_future_recursive(&self.inner, due, runner.clone(), Rc::new(task));
        runner
    }
}

impl Scheduler for Trampoline {
    fn schedule<F>(&self, task: F) -> Runner
    where
        F: FnOnce() + Send + 'static,
    {
        Trampoline::schedule(self, task)
    }

    fn schedule_recursive<F>(&self, task: F) -> Runner
    where
        F: Fn(&Again) + Send + 'static,
    {
        Trampoline::schedule_recursive(self, task)
    }

    fn schedule_loop<F>(&self, from: usize, task: F) -> Runner
    where
        F: Fn(usize, &Next) + Send + 'static,
    {
        Trampoline::schedule_loop(self, from, task)
    }

    fn schedule_future<F>(&self, due: Duration, task: F) -> Runner
    where
        F: FnOnce() + Send + 'static,
    {
        Trampoline::schedule_future(self, due, task)
    }

    fn schedule_future_recursive<F>(&self, due: Duration, task: F) -> Runner
    where
        F: Fn(&AgainAfter) + Send + 'static,
    {
        Trampoline::schedule_future_recursive(self, due, task)
    }

    /// Drain the queue on the calling thread. Tasks scheduled while draining
    /// run in the same call; `cancel` from inside a task ends it early.
    fn wait(&self) {
        self.inner.drain();
    }

    fn cancel(&self) {
        // Taken out first so entry destructors never run under the borrow.
        let dropped = self.inner.queue.borrow_mut().take();
        for entry in &dropped {
            entry.runner.cancel();
            self.inner.counters.record_canceled();
        }
        debug!(dropped = dropped.len(), "trampoline canceled");
    }

    /// Run at most one queued task. Work it schedules stays queued. With
    /// nothing queued this just yields the thread.
    fn yield_now(&self) {
        let _draining = DrainGuard::enter(&self.inner.draining);
        if !self.inner.run_next() {
            thread::yield_now();
        }
    }

    fn is_concurrent(&self) -> bool {
        false
    }

    fn count(&self) -> usize {
        self.inner.count()
    }

    fn stats(&self) -> SchedulerStats {
        let queued = self.inner.queue.borrow().len();
        self.inner
            .counters
            .snapshot(SchedulerKind::Trampoline, queued, self.inner.count())
    }
}

impl fmt::Display for Trampoline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trampoline{{ owner = {:?}, tasks = {} }}", self.inner.owner, self.count())
    }
}

impl fmt::Debug for Trampoline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trampoline")
            .field("owner", &self.inner.owner)
            .field("mode", &self.inner.mode)
            .field("tasks", &self.count())
            .finish()
    }
}

// ── Bookkeeping guards ───────────────────────────────────────────────
//
// Restored on drop so a panicking task leaves the trampoline usable.

struct DrainGuard<'a> {
    flag: &'a Cell<bool>,
    prev: bool,
}

impl<'a> DrainGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        let prev = flag.replace(true);
        Self { flag, prev }
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.prev);
    }
}

struct RunningGuard<'a> {
    running: &'a Cell<usize>,
}

impl<'a> RunningGuard<'a> {
    fn enter(running: &'a Cell<usize>) -> Self {
        running.set(running.get() + 1);
        Self { running }
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.running.set(self.running.get() - 1);
    }
}
