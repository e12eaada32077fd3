pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, SchedulerSettings};
pub use error::*;
