use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use stupid_core::SchedulerSettings;

use super::Goroutine;
use crate::traits::Scheduler;

const MS: Duration = Duration::from_millis(1);

#[test]
fn recursive_chain_runs_in_order() {
    let concurrent = Goroutine::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let i = AtomicUsize::new(0);
    let out = Arc::clone(&seen);
    concurrent.schedule_recursive(move |again| {
        let n = i.fetch_add(1, Ordering::SeqCst);
        out.lock().unwrap().push(n);
        if n + 1 < 5 {
            again.call();
        }
    });
    concurrent.wait();
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    assert_eq!(concurrent.count(), 0);
}

#[test]
fn chains_are_serial_within_and_concurrent_across() {
    let concurrent = Goroutine::new();
    let seen: Arc<Mutex<Vec<(char, usize)>>> = Arc::new(Mutex::new(Vec::new()));
    let threads = Arc::new(Mutex::new(Vec::new()));
    for chain in ['a', 'b'] {
        let out = Arc::clone(&seen);
        let names = Arc::clone(&threads);
        let i = AtomicUsize::new(0);
        concurrent.schedule_recursive(move |again| {
            let n = i.fetch_add(1, Ordering::SeqCst);
            out.lock().unwrap().push((chain, n));
            names.lock().unwrap().push((chain, thread::current().id()));
            if n + 1 < 5 {
                again.call();
            }
        });
    }
    concurrent.wait();

    let seen = seen.lock().unwrap();
    for chain in ['a', 'b'] {
        let order: Vec<usize> = seen.iter().filter(|(c, _)| *c == chain).map(|(_, n)| *n).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4], "chain {chain}");
    }

    // Each chain stays on its own unit, and the two units differ.
    let threads = threads.lock().unwrap();
    let unit = |chain: char| {
        let ids: Vec<_> = threads.iter().filter(|(c, _)| *c == chain).map(|(_, id)| *id).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        ids[0]
    };
    assert_ne!(unit('a'), unit('b'));
}

#[test]
fn canceled_future_never_runs() {
    let concurrent = Goroutine::new();
    let sentinel = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&sentinel);
    let runner = concurrent.schedule_future(10 * MS, move || {
        s.fetch_add(1, Ordering::SeqCst);
    });
    runner.cancel();
    runner.cancel();
    concurrent.wait();
    thread::sleep(15 * MS);
    assert_eq!(sentinel.load(Ordering::SeqCst), 0);
    assert_eq!(concurrent.count(), 0);
    assert_eq!(concurrent.stats().canceled, 1);
}

#[test]
fn canceling_first_iteration_stops_future_chain() {
    let concurrent = Goroutine::new();
    let ticks = Arc::new(AtomicUsize::new(0));
    let t = Arc::clone(&ticks);
    concurrent.schedule_future(10 * MS, || {});
    let running = concurrent.schedule_future_recursive(10 * MS, move |again| {
        t.fetch_add(1, Ordering::SeqCst);
        again.call(10 * MS);
    });
    running.cancel();
    concurrent.wait();
    assert_eq!(ticks.load(Ordering::SeqCst), 0);
    assert_eq!(concurrent.count(), 0);
}

#[test]
fn count_tracks_in_flight_units() {
    let concurrent = Goroutine::new();
    for _ in 0..3 {
        concurrent.schedule_future(30 * MS, || {});
    }
    assert_eq!(concurrent.count(), 3);
    assert_eq!(concurrent.to_string(), "Goroutine{ tasks = 3 }");
    concurrent.wait();
    assert_eq!(concurrent.count(), 0);
    assert_eq!(concurrent.stats().executed, 3);
}

#[test]
fn wait_covers_work_scheduled_by_running_tasks() {
    let concurrent = Arc::new(Goroutine::new());
    let hits = Arc::new(AtomicUsize::new(0));
    let (c, h) = (Arc::clone(&concurrent), Arc::clone(&hits));
    concurrent.schedule(move || {
        let h2 = Arc::clone(&h);
        c.schedule_future(10 * MS, move || {
            h2.fetch_add(1, Ordering::SeqCst);
        });
        h.fetch_add(1, Ordering::SeqCst);
    });
    concurrent.wait();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn wait_from_other_threads_while_submitting() {
    let concurrent = Arc::new(Goroutine::new());
    let hits = Arc::new(AtomicUsize::new(0));
    let submitters: Vec<_> = (0..4)
        .map(|_| {
            let (c, h) = (Arc::clone(&concurrent), Arc::clone(&hits));
            thread::spawn(move || {
                for _ in 0..10 {
                    let h = Arc::clone(&h);
                    c.schedule(move || {
                        h.fetch_add(1, Ordering::SeqCst);
                    });
                }
                c.wait();
            })
        })
        .collect();
    for s in submitters {
        s.join().unwrap();
    }
    concurrent.wait();
    assert_eq!(hits.load(Ordering::SeqCst), 40);
    assert_eq!(concurrent.count(), 0);
}

#[test]
fn panicking_task_does_not_hang_wait() {
    let concurrent = Goroutine::new();
    concurrent.schedule(|| panic!("task failed"));
    concurrent.wait();
    assert_eq!(concurrent.count(), 0);
}

#[test]
fn units_carry_the_configured_name() {
    let settings = SchedulerSettings {
        thread_name: "unit-test".into(),
        ..SchedulerSettings::default()
    };
    let concurrent = Goroutine::with_settings(&settings);
    let name = Arc::new(Mutex::new(String::new()));
    let n = Arc::clone(&name);
    concurrent.schedule(move || {
        *n.lock().unwrap() = thread::current().name().unwrap_or_default().to_string();
    });
    concurrent.wait();
    assert!(name.lock().unwrap().starts_with("unit-test-"));
}

#[test]
fn loop_runs_on_private_trampoline() {
    let concurrent = Goroutine::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let out = Arc::clone(&seen);
    concurrent.schedule_loop(3, move |index, next| {
        out.lock().unwrap().push(index);
        if index > 0 {
            next.call(index - 1);
        }
    });
    concurrent.wait();
    assert_eq!(*seen.lock().unwrap(), vec![3, 2, 1, 0]);
    assert_eq!(concurrent.stats().executed, 4);
}

#[test]
fn scheduler_cancel_is_a_no_op() {
    let concurrent = Goroutine::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let h = Arc::clone(&hits);
    concurrent.schedule_future(5 * MS, move || {
        h.fetch_add(1, Ordering::SeqCst);
    });
    concurrent.cancel();
    concurrent.wait();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(concurrent.is_concurrent());
}

#[test]
fn future_respects_due_time() {
    let concurrent = Goroutine::new();
    let start = Instant::now();
    let elapsed = Arc::new(Mutex::new(Duration::ZERO));
    let e = Arc::clone(&elapsed);
    concurrent.schedule_future(20 * MS, move || {
        *e.lock().unwrap() = start.elapsed();
    });
    concurrent.wait();
    assert!(*elapsed.lock().unwrap() >= 20 * MS);
}
