use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::key::CacheKey;

/// Flat lifecycle tag of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum CacheStatus {
    Missing,
    Downloading,
    Ready,
    Failed,
}

/// A fully written, durably stored local copy.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadyImage {
    pub local_path: PathBuf,
    pub byte_len: u64,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub sha256: String,
    pub content_type: String,
    pub ready_at: DateTime<Utc>,
}

/// Entry state. Only `Ready` carries a local path, so a path without a
/// ready status (or the reverse) is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "status", rename_all = "snake_case")
)]
pub enum EntryState {
    #[default]
    Missing,
    Downloading,
    Ready(ReadyImage),
    Failed,
}

impl EntryState {
    pub fn status(&self) -> CacheStatus {
        match self {
            EntryState::Missing => CacheStatus::Missing,
            EntryState::Downloading => CacheStatus::Downloading,
            EntryState::Ready(_) => CacheStatus::Ready,
            EntryState::Failed => CacheStatus::Failed,
        }
    }

    pub fn ready(&self) -> Option<&ReadyImage> {
        match self {
            EntryState::Ready(image) => Some(image),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheEntry {
    pub key: CacheKey,
    /// URL supplied by the caller that moved the entry into `Downloading`.
    pub remote_url: Option<String>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub state: EntryState,
    /// Remote fetch attempts made for this key, across all waves.
    pub attempt_count: u32,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn missing(key: CacheKey) -> Self {
        Self {
            key,
            remote_url: None,
            state: EntryState::Missing,
            attempt_count: 0,
            last_error: None,
            last_attempt_at: None,
        }
    }

    pub fn status(&self) -> CacheStatus {
        self.state.status()
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.state.ready().map(|image| image.local_path.as_path())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, EntryState::Ready(_))
    }
}
