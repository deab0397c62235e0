use std::{path::PathBuf, time::Duration};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(200);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);
pub const DEFAULT_FETCH_CONCURRENCY: usize = 12;
pub const DEFAULT_MAX_BYTES: u64 = 25 * 1024 * 1024;

pub fn default_user_agent() -> String {
    format!("stockroom-mirror/{}", env!("CARGO_PKG_VERSION"))
}

/// Everything the mirror service needs to run.
#[derive(Debug, Clone)]
pub struct MirrorSettings {
    /// Root directory of the local image store.
    pub store_root: PathBuf,
    pub fetch: FetchSettings,
    pub retry: RetryPolicy,
    /// Upper bound on concurrent remote fetches across all keys.
    pub fetch_concurrency: usize,
}

impl MirrorSettings {
    pub fn new(store_root: impl Into<PathBuf>) -> Self {
        Self {
            store_root: store_root.into(),
            fetch: FetchSettings::default(),
            retry: RetryPolicy::default(),
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    /// Longest one flight can run once it holds a fetch permit.
    pub fn flight_budget(&self) -> Duration {
        self.retry.worst_case(self.fetch.timeout)
    }
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub max_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            max_bytes: DEFAULT_MAX_BYTES,
            user_agent: default_user_agent(),
        }
    }
}

/// Bounded exponential backoff for transient fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total fetch attempts per materialization, first one included.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `failed_attempts + 1`, given how many attempts
    /// have already failed in this wave.
    pub fn backoff_after(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    /// Total time spent when every attempt runs into `fetch_timeout`,
    /// backoff sleeps included. Time queued for a fetch permit is not
    /// counted.
    pub fn worst_case(&self, fetch_timeout: Duration) -> Duration {
        let attempts = self.max_attempts.max(1);
        (1..attempts)
            .map(|failed| self.backoff_after(failed))
            .fold(fetch_timeout.saturating_mul(attempts), Duration::saturating_add)
    }
}
