//! scheduler-demo: walks through the scheduler family.
//!
//! Each subcommand prints the order tasks ran in, so the difference between
//! in-line, serial and concurrent dispatch is visible on the terminal.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;

use stupid_core::config::{load_dotenv, Config};
use stupid_core::logging::init_tracing;
use stupid_scheduler::{current_thread, global, Scheduler, SchedulerStats};

// ── CLI ─────────────────────────────────────────────────────────────

/// Demonstrates immediate, serial and concurrent task scheduling.
#[derive(Parser, Debug)]
#[command(name = "scheduler-demo", version, about)]
struct Cli {
    /// Print scheduler stats as JSON after the scenario.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    scenario: Scenario,
}

#[derive(Subcommand, Debug)]
enum Scenario {
    /// Nested schedules on the current thread's trampoline (breadth-first).
    Serial,
    /// Independent recursive chains on the concurrent scheduler.
    Concurrent {
        /// Number of top-level chains.
        #[arg(long, default_value_t = 2)]
        chains: usize,
        /// Iterations per chain.
        #[arg(long, default_value_t = 5)]
        iterations: usize,
    },
    /// Nested schedules on the immediate scheduler (depth-first).
    Immediate,
    /// Cancel a future task before it is due.
    Cancel {
        /// Delay of the task in milliseconds.
        #[arg(long, default_value_t = 10)]
        due_ms: u64,
    },
}

// ── Scenarios ───────────────────────────────────────────────────────

fn serial() -> SchedulerStats {
    let serial = current_thread();
    println!("before");
    let outer = serial.clone();
    serial.schedule(move || {
        println!("> outer");
        let inner = outer.clone();
        outer.schedule(move || {
            println!("> inner");
            inner.schedule(|| println!("leaf"));
            println!("< inner");
        });
        println!("< outer");
    });
    println!("after (tasks = {})", serial.count());
    serial.stats()
}

fn concurrent(chains: usize, iterations: usize) -> SchedulerStats {
    let concurrent = global().concurrent();
    for chain in 0..chains {
        let i = AtomicUsize::new(0);
        concurrent.schedule_recursive(move |again| {
            let n = i.fetch_add(1, Ordering::SeqCst);
            println!("chain {chain}: {n}");
            if n + 1 < iterations {
                again.call();
            }
        });
    }
    concurrent.wait();
    println!("{concurrent}");
    concurrent.stats()
}

fn immediate() -> SchedulerStats {
    let immediate = global().immediate();
    println!("before");
    immediate.schedule(move || {
        println!("> outer");
        global().immediate().schedule(|| {
            println!("> inner");
            global().immediate().schedule(|| println!("leaf"));
            println!("< inner");
        });
        println!("< outer");
    });
    println!("after");
    immediate.stats()
}

fn cancel(due: Duration) -> SchedulerStats {
    let concurrent = global().concurrent();
    let sentinel = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&sentinel);
    let runner = concurrent.schedule_future(due, move || {
        s.fetch_add(1, Ordering::SeqCst);
    });
    runner.cancel();
    concurrent.wait();
    println!(
        "runs = {}, tasks = {}",
        sentinel.load(Ordering::SeqCst),
        concurrent.count()
    );
    concurrent.stats()
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    let cli = Cli::parse();

    let config = Config::from_env();
    config.validate()?;
    config.log_summary();

    let stats = match cli.scenario {
        Scenario::Serial => serial(),
        Scenario::Concurrent { chains, iterations } => concurrent(chains, iterations),
        Scenario::Immediate => immediate(),
        Scenario::Cancel { due_ms } => cancel(Duration::from_millis(due_ms)),
    };

    info!(kind = %stats.kind, executed = stats.executed, canceled = stats.canceled, "scenario finished");
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}
