//! Active-unit counter with a blocking wait for zero.
//!
//! The count itself is only ever touched atomically. The mutex exists so a
//! waiter cannot miss the wakeup sent when the count drops to zero.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

#[derive(Clone, Default)]
pub(crate) struct WaitGroup {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    active: AtomicUsize,
    lock: Mutex<()>,
    idle: Condvar,
}

/// One unit of in-flight work. Dropping it, including while unwinding,
/// marks the unit finished.
pub(crate) struct ActiveGuard {
    inner: Arc<Inner>,
}

impl WaitGroup {
    pub(crate) fn enter(&self) -> ActiveGuard {
        self.inner.active.fetch_add(1, Ordering::AcqRel);
        ActiveGuard { inner: Arc::clone(&self.inner) }
    }

    pub(crate) fn count(&self) -> usize {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Block until the count is zero. Units entered while waiting extend
    /// the wait.
    pub(crate) fn wait(&self) {
        let mut guard = self.inner.lock.lock();
        while self.inner.active.load(Ordering::Acquire) > 0 {
            self.inner.idle.wait(&mut guard);
        }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if self.inner.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _guard = self.inner.lock.lock();
            self.inner.idle.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn wait_on_idle_group_returns() {
        let wg = WaitGroup::default();
        wg.wait();
        assert_eq!(wg.count(), 0);
    }

    #[test]
    fn guards_count_up_and_down() {
        let wg = WaitGroup::default();
        let a = wg.enter();
        let b = wg.enter();
        assert_eq!(wg.count(), 2);
        drop(a);
        assert_eq!(wg.count(), 1);
        drop(b);
        assert_eq!(wg.count(), 0);
    }

    #[test]
    fn wait_blocks_until_last_guard_drops() {
        let wg = WaitGroup::default();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let guard = wg.enter();
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(5 * (i + 1)));
                    drop(guard);
                })
            })
            .collect();
        wg.wait();
        assert_eq!(wg.count(), 0);
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn guard_released_on_panic() {
        let wg = WaitGroup::default();
        let guard = wg.enter();
        let handle = thread::spawn(move || {
            let _guard = guard;
            panic!("unit failed");
        });
        assert!(handle.join().is_err());
        wg.wait();
        assert_eq!(wg.count(), 0);
    }
}
