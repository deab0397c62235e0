use std::time::Duration;

use thiserror::Error;

use crate::models::Config;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },
    #[error("server host must not be empty")]
    EmptyHost,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

const MIN_SANE_TIMEOUT: Duration = Duration::from_secs(1);

/// Reject configurations the mirror cannot run with and warn about ones
/// that are merely questionable.
pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();
    let fetch = &config.fetch;

    if config.server.host.trim().is_empty() {
        return Err(ConfigGuardRailError::EmptyHost);
    }

    for (field, is_zero) in [
        ("fetch.max_attempts", fetch.max_attempts == 0),
        ("fetch.concurrency", fetch.concurrency == 0),
        ("fetch.max_bytes", fetch.max_bytes == 0),
        ("fetch.timeout", fetch.timeout.is_zero()),
    ] {
        if is_zero {
            return Err(ConfigGuardRailError::ZeroValue { field });
        }
    }

    if fetch.initial_backoff > fetch.max_backoff {
        warnings.push_with_hint(
            format!(
                "initial backoff {} exceeds max backoff {}; every retry waits {}",
                humantime::format_duration(fetch.initial_backoff),
                humantime::format_duration(fetch.max_backoff),
                humantime::format_duration(fetch.max_backoff),
            ),
            "Lower IMAGE_FETCH_INITIAL_BACKOFF or raise IMAGE_FETCH_MAX_BACKOFF",
        );
    }

    if fetch.timeout < MIN_SANE_TIMEOUT {
        warnings.push_with_hint(
            format!(
                "fetch timeout {} is very short; most remote images will time out",
                humantime::format_duration(fetch.timeout)
            ),
            "Set IMAGE_FETCH_TIMEOUT to a few seconds or more",
        );
    }

    if fetch.max_attempts == 1 {
        warnings.push("retries are disabled (IMAGE_FETCH_MAX_ATTEMPTS=1)");
    }

    Ok(warnings)
}
