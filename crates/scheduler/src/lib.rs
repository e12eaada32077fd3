//! Interchangeable task schedulers with uniform cancellation and
//! completion tracking.
//!
//! - [`Immediate`] runs every task synchronously on the caller's thread.
//! - [`Trampoline`] queues tasks by due time and drains them serially on the
//!   thread that owns it. Recursive chains run as a loop, not as recursion.
//! - [`Goroutine`] runs each top-level task on its own thread. A recursive
//!   chain stays serial on a private trampoline inside one of those threads.
//!
//! All three implement [`Scheduler`] and hand back a [`Runner`] for every
//! submission.

pub mod error;
pub mod goroutine;
pub mod immediate;
pub mod registry;
pub mod runner;
pub mod stats;
pub mod task;
pub mod traits;
pub mod trampoline;

pub use error::SchedulerError;
pub use goroutine::Goroutine;
pub use immediate::Immediate;
pub use registry::{current_thread, global, init, yield_now, Schedulers};
pub use runner::Runner;
pub use stats::{SchedulerKind, SchedulerStats};
pub use task::{Again, AgainAfter, Next};
pub use traits::Scheduler;
pub use trampoline::{DrainMode, Trampoline};
