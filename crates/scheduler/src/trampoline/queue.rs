use std::collections::VecDeque;
use std::time::Instant;

use crate::runner::Runner;

/// A queued task: when it may run, what it runs, and how it is canceled.
pub(crate) struct Entry {
    pub(crate) due: Instant,
    pub(crate) run: Box<dyn FnOnce()>,
    pub(crate) runner: Runner,
}

/// Pending tasks ordered by due time, ties in insertion order.
#[derive(Default)]
pub(crate) struct TaskQueue {
    entries: VecDeque<Entry>,
}

impl TaskQueue {
    /// Insert after every entry due at or before `entry.due`, which keeps
    /// same-instant entries in the order they were scheduled.
    pub(crate) fn insert(&mut self, entry: Entry) {
        let at = self.entries.partition_point(|e| e.due <= entry.due);
        self.entries.insert(at, entry);
    }

    pub(crate) fn pop(&mut self) -> Option<Entry> {
        self.entries.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn take(&mut self) -> VecDeque<Entry> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;

    fn entry(due: Instant, log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> Entry {
        let log = Rc::clone(log);
        Entry {
            due,
            run: Box::new(move || log.borrow_mut().push(name)),
            runner: Runner::new(),
        }
    }

    fn drain(queue: &mut TaskQueue) {
        while let Some(e) = queue.pop() {
            (e.run)();
        }
    }

    #[test]
    fn equal_due_times_keep_insertion_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let now = Instant::now();
        let mut queue = TaskQueue::default();
        queue.insert(entry(now, &log, "A"));
        queue.insert(entry(now, &log, "B"));
        queue.insert(entry(now, &log, "C"));
        drain(&mut queue);
        assert_eq!(*log.borrow(), vec!["A", "B", "C"]);
    }

    #[test]
    fn earlier_due_time_goes_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let now = Instant::now();
        let mut queue = TaskQueue::default();
        queue.insert(entry(now + Duration::from_millis(10), &log, "X"));
        queue.insert(entry(now + Duration::from_millis(5), &log, "Y"));
        queue.insert(entry(now + Duration::from_millis(5), &log, "Z"));
        queue.insert(entry(now, &log, "W"));
        assert_eq!(queue.len(), 4);
        drain(&mut queue);
        assert_eq!(*log.borrow(), vec!["W", "Y", "Z", "X"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn take_empties_the_queue() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut queue = TaskQueue::default();
        queue.insert(entry(Instant::now(), &log, "A"));
        let taken = queue.take();
        assert_eq!(taken.len(), 1);
        assert!(queue.is_empty());
        assert!(log.borrow().is_empty());
    }
}
