//! Cancellation handle returned by every scheduling operation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam::channel::{self, select, Receiver, Sender};
use parking_lot::Mutex;

/// Handle to a scheduled task. Canceling it before the task starts keeps the
/// task from running; canceling after that has no effect.
///
/// Clones share the same signal. A recursive chain hands out one `Runner`
/// for all of its iterations.
#[derive(Clone)]
pub struct Runner {
    signal: Arc<Signal>,
}

/// Write-once gate. The sender is dropped on cancel, which wakes every
/// receiver blocked on `closed`.
struct Signal {
    canceled: AtomicBool,
    gate: Mutex<Option<Sender<()>>>,
    closed: Receiver<()>,
}

impl Runner {
    pub fn new() -> Self {
        let (tx, rx) = channel::bounded(0);
        Self {
            signal: Arc::new(Signal {
                canceled: AtomicBool::new(false),
                gate: Mutex::new(Some(tx)),
                closed: rx,
            }),
        }
    }

    /// A runner whose task will never run.
    pub(crate) fn canceled() -> Self {
        let runner = Self::new();
        runner.cancel();
        runner
    }

    /// Cancel the task. Idempotent: racing or repeated calls are harmless.
    pub fn cancel(&self) {
        if self.signal.canceled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.signal.gate.lock().take();
    }

    pub fn is_canceled(&self) -> bool {
        self.signal.canceled.load(Ordering::Acquire)
    }

    /// Block until `deadline` passes or the runner is canceled.
    ///
    /// Returns `true` when the deadline was reached and the runner is still
    /// live, i.e. the task may run now.
    pub(crate) fn sleep_until(&self, deadline: Instant) -> bool {
        if deadline > Instant::now() {
            select! {
                recv(self.signal.closed) -> _ => return false,
                recv(channel::at(deadline)) -> _ => {}
            }
        }
        !self.is_canceled()
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("canceled", &self.is_canceled())
            .finish()
    }
}
