//! Rescheduling capabilities handed to recursive tasks.
//!
//! A recursive task never calls back into the submission API itself. It is
//! given one of these handles instead, and calling it schedules the next
//! iteration under the rules of the scheduler that ran the current one.
//! The handles are `!Send`: an iteration is always rescheduled from the
//! thread of control that owns the chain.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Schedules another iteration of a recursive task as soon as possible.
#[derive(Clone)]
pub struct Again {
    reschedule: Rc<dyn Fn()>,
}

impl Again {
    pub(crate) fn new(reschedule: impl Fn() + 'static) -> Self {
        Self { reschedule: Rc::new(reschedule) }
    }

    pub fn call(&self) {
        (self.reschedule)()
    }
}

/// Schedules another iteration of a recursive task after a delay.
#[derive(Clone)]
pub struct AgainAfter {
    reschedule: Rc<dyn Fn(Duration)>,
}

impl AgainAfter {
    pub(crate) fn new(reschedule: impl Fn(Duration) + 'static) -> Self {
        Self { reschedule: Rc::new(reschedule) }
    }

    pub fn call(&self, due: Duration) {
        (self.reschedule)(due)
    }
}

/// Schedules the iteration for loop index `next`.
#[derive(Clone)]
pub struct Next {
    reschedule: Rc<dyn Fn(usize)>,
}

impl Next {
    pub(crate) fn new(reschedule: impl Fn(usize) + 'static) -> Self {
        Self { reschedule: Rc::new(reschedule) }
    }

    pub fn call(&self, next: usize) {
        (self.reschedule)(next)
    }
}

impl fmt::Debug for Again {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Again")
    }
}

impl fmt::Debug for AgainAfter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AgainAfter")
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Next")
    }
}
