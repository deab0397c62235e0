//! In-memory cache registry with per-key single-flight coordination.
//!
//! Each key owns a slot guarded by its own short-lived mutex; the map itself
//! is sharded, so unrelated keys never contend. A download in progress is
//! represented by a watch channel stored in the slot. Late arrivals clone the
//! receiver and wait for the leader's terminal outcome instead of starting a
//! second fetch. The slot lock is never held across an await.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::Utc;
use dashmap::DashMap;
use stockroom_model::{CacheEntry, CacheKey, EntryState, ReadyImage};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::MirrorError;

/// Terminal result of one materialization wave, shared by every waiter.
pub type FlightOutcome = Result<ReadyImage, MirrorError>;

type OutcomeSlot = Option<FlightOutcome>;

#[derive(Default)]
pub struct CacheRegistry {
    slots: DashMap<CacheKey, Arc<KeySlot>>,
}

struct KeySlot {
    state: Mutex<SlotState>,
}

struct SlotState {
    entry: CacheEntry,
    flight: Option<watch::Receiver<OutcomeSlot>>,
}

/// What a materialize caller should do after consulting the registry.
#[derive(Debug)]
pub enum Admission {
    /// Already materialized; nothing to fetch.
    Ready(ReadyImage),
    /// Another caller is downloading this key; wait for its outcome.
    Join(FlightWaiter),
    /// This caller owns the download and must complete the lease.
    Lead(FlightLease),
}

/// Handle for awaiting the outcome of an in-flight download.
#[derive(Debug, Clone)]
pub struct FlightWaiter {
    key: CacheKey,
    rx: watch::Receiver<OutcomeSlot>,
}

impl FlightWaiter {
    pub async fn wait(mut self) -> FlightOutcome {
        match self.rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or_else(|| {
                Err(MirrorError::Aborted(format!(
                    "flight for {} ended without an outcome",
                    self.key
                )))
            }),
            Err(_) => Err(MirrorError::Aborted(format!(
                "flight for {} was dropped",
                self.key
            ))),
        }
    }
}

/// Exclusive right to run the download for one key.
///
/// Dropping a lease without calling [`FlightLease::complete`] (a panicking
/// task, for instance) marks the entry `Failed` and releases the waiters.
pub struct FlightLease {
    key: CacheKey,
    slot: Arc<KeySlot>,
    tx: Option<watch::Sender<OutcomeSlot>>,
    rx: watch::Receiver<OutcomeSlot>,
}

impl FlightLease {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn waiter(&self) -> FlightWaiter {
        FlightWaiter {
            key: self.key.clone(),
            rx: self.rx.clone(),
        }
    }

    /// Bookkeeping for one remote fetch attempt.
    pub fn record_attempt(&self) -> u32 {
        let mut state = self.slot.lock();
        state.entry.attempt_count = state.entry.attempt_count.saturating_add(1);
        state.entry.last_attempt_at = Some(Utc::now());
        state.entry.attempt_count
    }

    /// Publish the terminal outcome: the entry is updated first, then every
    /// waiter is released with the same result.
    pub fn complete(mut self, outcome: FlightOutcome) {
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: FlightOutcome) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        {
            let mut state = self.slot.lock();
            match &outcome {
                Ok(image) => {
                    state.entry.state = EntryState::Ready(image.clone());
                    state.entry.last_error = None;
                }
                Err(err) => {
                    state.entry.state = EntryState::Failed;
                    state.entry.last_error = Some(err.to_string());
                }
            }
            state.flight = None;
        }
        tx.send_replace(Some(outcome));
    }
}

impl Drop for FlightLease {
    fn drop(&mut self) {
        if self.tx.is_some() {
            warn!(key = %self.key, "flight lease dropped before completion");
            let reason = format!("download task for {} stopped early", self.key);
            self.finish(Err(MirrorError::Aborted(reason)));
        }
    }
}

impl fmt::Debug for FlightLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlightLease")
            .field("key", &self.key)
            .field("completed", &self.tx.is_none())
            .finish()
    }
}

impl KeySlot {
    fn new(key: CacheKey) -> Self {
        Self {
            state: Mutex::new(SlotState {
                entry: CacheEntry::missing(key),
                flight: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // Critical sections only assign fields; a poisoned slot is still
        // internally consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &CacheKey) -> Arc<KeySlot> {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }
        Arc::clone(
            self.slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(KeySlot::new(key.clone())))
                .value(),
        )
    }

    /// Current entry for `key`. Unknown keys read as `Missing`; the lookup
    /// itself never inserts.
    pub fn snapshot(&self, key: &CacheKey) -> CacheEntry {
        match self.slots.get(key) {
            Some(slot) => slot.lock().entry.clone(),
            None => CacheEntry::missing(key.clone()),
        }
    }

    pub fn ready(&self, key: &CacheKey) -> Option<ReadyImage> {
        let slot = self.slots.get(key)?;
        let state = slot.lock();
        state.entry.state.ready().cloned()
    }

    /// Number of keys the registry has seen.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.lock().flight.is_some())
            .count()
    }

    /// Decide whether the caller returns immediately, joins an existing
    /// flight, or leads a new one. Only the leader moves the entry into
    /// `Downloading` and records `remote_url`.
    pub fn begin(&self, key: &CacheKey, remote_url: &str) -> Admission {
        let slot = self.slot(key);
        let mut state = slot.lock();

        if let Some(image) = state.entry.state.ready() {
            return Admission::Ready(image.clone());
        }

        if let Some(rx) = &state.flight {
            debug!(%key, "singleflight wait");
            return Admission::Join(FlightWaiter {
                key: key.clone(),
                rx: rx.clone(),
            });
        }

        let (tx, rx) = watch::channel(None);
        state.entry.state = EntryState::Downloading;
        state.entry.remote_url = Some(remote_url.to_string());
        state.entry.last_error = None;
        state.flight = Some(rx.clone());
        drop(state);

        debug!(%key, "singleflight lead");
        Admission::Lead(FlightLease {
            key: key.clone(),
            slot,
            tx: Some(tx),
            rx,
        })
    }

    /// Register a blob found on disk as `Ready`. Returns `false` when the key
    /// is already ready or has a download in progress.
    pub fn adopt(&self, key: &CacheKey, image: ReadyImage) -> bool {
        let slot = self.slot(key);
        let mut state = slot.lock();
        if state.flight.is_some() || state.entry.is_ready() {
            return false;
        }
        state.entry.state = EntryState::Ready(image);
        state.entry.last_error = None;
        true
    }
}

impl fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("entries", &self.slots.len())
            .finish()
    }
}
