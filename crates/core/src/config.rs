use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StupidError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

/// Parse a profiled env var, warning and returning `None` on garbage.
fn profiled_env_parse<T: FromStr>(profile: &str, key: &str) -> Option<T> {
    let raw = profiled_env_opt(profile, key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable config value");
            None
        }
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub scheduler: SchedulerSettings,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `STUPID_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("STUPID_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            scheduler: SchedulerSettings::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  scheduler:   short_wait={}ms, thread_name={}, stack_size={}",
            self.scheduler.short_wait_threshold_ms,
            self.scheduler.thread_name,
            self.scheduler
                .stack_size
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(platform default)".into()),
        );
    }

    /// Return the config as a JSON value for diagnostics.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "scheduler": {
                "short_wait_threshold_ms": self.scheduler.short_wait_threshold_ms,
                "thread_name": self.scheduler.thread_name,
                "stack_size": self.scheduler.stack_size,
            },
        })
    }

    pub fn validate(&self) -> Result<(), StupidError> {
        self.scheduler.validate()
    }
}

// ── Section configs ───────────────────────────────────────────

/// Upper bound on the busy-wait window. Past this the spin burns a core for
/// longer than any timer wakeup costs.
pub const MAX_SHORT_WAIT_MS: u64 = 60_000;

/// Smallest stack we hand to an execution unit.
pub const MIN_STACK_SIZE: usize = 64 * 1024;

/// Tuning for the scheduler family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Tasks due sooner than this are waited for by yielding in a loop;
    /// later ones arm a timer.
    #[serde(default = "default_short_wait_threshold_ms")]
    pub short_wait_threshold_ms: u64,
    /// Name prefix for concurrent execution units.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
    /// Stack size in bytes for concurrent execution units. None = platform default.
    #[serde(default)]
    pub stack_size: Option<usize>,
}

fn default_short_wait_threshold_ms() -> u64 { 999 }
fn default_thread_name() -> String { "stupid-sched".into() }

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            short_wait_threshold_ms: default_short_wait_threshold_ms(),
            thread_name: default_thread_name(),
            stack_size: None,
        }
    }
}

impl SchedulerSettings {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            short_wait_threshold_ms: profiled_env_parse(p, "SCHED_SHORT_WAIT_MS")
                .unwrap_or_else(default_short_wait_threshold_ms),
            thread_name: profiled_env_or(p, "SCHED_THREAD_NAME", "stupid-sched"),
            stack_size: profiled_env_parse(p, "SCHED_STACK_SIZE"),
        }
    }

    pub fn short_wait_threshold(&self) -> Duration {
        Duration::from_millis(self.short_wait_threshold_ms)
    }

    pub fn validate(&self) -> Result<(), StupidError> {
        if self.short_wait_threshold_ms > MAX_SHORT_WAIT_MS {
            return Err(StupidError::Config(format!(
                "short_wait_threshold_ms {} exceeds {}",
                self.short_wait_threshold_ms, MAX_SHORT_WAIT_MS
            )));
        }
        if let Some(size) = self.stack_size {
            if size < MIN_STACK_SIZE {
                return Err(StupidError::Config(format!(
                    "stack_size {} is below the {} byte minimum",
                    size, MIN_STACK_SIZE
                )));
            }
        }
        if self.thread_name.is_empty() {
            return Err(StupidError::Config("thread_name must not be empty".into()));
        }
        Ok(())
    }
}
