//! Well-known scheduler instances.
//!
//! The concurrent and immediate schedulers are process-wide and built once,
//! either explicitly through [`init`] or lazily from the environment on the
//! first call to [`global`]. The registry is never mutated afterwards.
//!
//! Serial schedulers cannot be shared across threads, so every thread gets
//! its own inline [`Trampoline`] through [`current_thread`].

use std::sync::OnceLock;
use std::thread;

use stupid_core::{Config, SchedulerSettings};
use tracing::{info, warn};

use crate::error::SchedulerError;
use crate::goroutine::Goroutine;
use crate::immediate::Immediate;
use crate::trampoline::{DrainMode, Trampoline};
use crate::traits::Scheduler;

static GLOBAL: OnceLock<Schedulers> = OnceLock::new();

thread_local! {
    static CURRENT: Trampoline = Trampoline::with_settings(DrainMode::Inline, global().settings());
}

/// The process-wide scheduler set.
#[derive(Debug)]
pub struct Schedulers {
    settings: SchedulerSettings,
    immediate: Immediate,
    concurrent: Goroutine,
}

impl Schedulers {
    pub fn new(settings: SchedulerSettings) -> Result<Self, SchedulerError> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    fn build(settings: SchedulerSettings) -> Self {
        Self {
            immediate: Immediate::new(),
            concurrent: Goroutine::with_settings(&settings),
            settings,
        }
    }

    fn from_env() -> Self {
        let settings = Config::from_env().scheduler;
        match settings.validate() {
            Ok(()) => Self::build(settings),
            Err(e) => {
                warn!(error = %e, "invalid scheduler settings, using defaults");
                Self::build(SchedulerSettings::default())
            }
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn immediate(&self) -> &Immediate {
        &self.immediate
    }

    pub fn concurrent(&self) -> &Goroutine {
        &self.concurrent
    }

    /// The calling thread's serial scheduler.
    pub fn current_thread(&self) -> Trampoline {
        current_thread()
    }
}

/// Install the process-wide schedulers. Fails if they already exist,
/// including when [`global`] built them from the environment first.
pub fn init(settings: SchedulerSettings) -> Result<&'static Schedulers, SchedulerError> {
    let schedulers = Schedulers::new(settings)?;
    GLOBAL
        .set(schedulers)
        .map_err(|_| SchedulerError::AlreadyInitialized)?;
    info!("scheduler registry initialized");
    Ok(global())
}

/// The process-wide schedulers, built from the environment on first use.
pub fn global() -> &'static Schedulers {
    GLOBAL.get_or_init(Schedulers::from_env)
}

/// This thread's inline trampoline. A task scheduled on it while it is
/// idle runs before the call returns; tasks scheduled from inside that task
/// run after it, in order.
pub fn current_thread() -> Trampoline {
    CURRENT.with(Trampoline::clone)
}

/// Run one task queued on this thread's trampoline, or yield the thread if
/// there is none.
pub fn yield_now() {
    let ran = CURRENT
        .try_with(|serial| {
            if serial.has_pending() {
                serial.yield_now();
                true
            } else {
                false
            }
        })
        .unwrap_or(false);
    if !ran {
        thread::yield_now();
    }
}
