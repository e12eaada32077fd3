use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Which member of the scheduler family produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    Immediate,
    Trampoline,
    Goroutine,
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerKind::Immediate => "immediate",
            SchedulerKind::Trampoline => "trampoline",
            SchedulerKind::Goroutine => "goroutine",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of a scheduler, for logs and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStats {
    pub kind: SchedulerKind,
    /// Tasks waiting in a queue (serial schedulers only).
    pub queued: usize,
    /// Tasks queued or in flight, the same number `count()` reports.
    pub active: usize,
    /// Tasks that ran to completion or are running now.
    pub executed: u64,
    /// Tasks skipped because their runner was canceled before they started.
    pub canceled: u64,
}

/// Lifetime counters shared by the execution paths of one scheduler.
#[derive(Debug, Default)]
pub(crate) struct TaskCounters {
    executed: AtomicU64,
    canceled: AtomicU64,
}

impl TaskCounters {
    pub(crate) fn record_executed(&self) {
        self.executed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_canceled(&self) {
        self.canceled.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold in the totals of a scheduler that ran on our behalf.
    pub(crate) fn merge(&self, other: &SchedulerStats) {
        self.executed.fetch_add(other.executed, Ordering::Relaxed);
        self.canceled.fetch_add(other.canceled, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, kind: SchedulerKind, queued: usize, active: usize) -> SchedulerStats {
        SchedulerStats {
            kind,
            queued,
            active,
            executed: self.executed.load(Ordering::Relaxed),
            canceled: self.canceled.load(Ordering::Relaxed),
        }
    }
}
