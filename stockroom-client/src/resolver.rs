//! Per-image display state for consumers of the mirror.
//!
//! An [`ImageResolver`] decides what a single image slot shows: the local
//! mirrored copy, the remote URL, or a placeholder icon. It never blocks on
//! a download. A miss shows the remote URL right away and materializes in
//! the background, swapping to the local copy when that finishes.

use std::{
    path::PathBuf,
    sync::{Arc, Weak},
};

use log::{debug, warn};
use stockroom_model::{CacheKey, MaterializeResponse};
use tokio::{runtime::Handle, sync::watch};

use crate::api::MirrorApi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverState {
    Init,
    CheckingLocal,
    ShowingLocal {
        local_path: PathBuf,
    },
    /// Remote URL on screen. `materializing` is true while a background
    /// download may still swap in the local copy.
    ShowingRemote {
        remote_url: String,
        materializing: bool,
    },
    /// Terminal.
    ShowingPlaceholder,
}

/// What the renderer should draw right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplaySource {
    Local(PathBuf),
    Remote(String),
    Placeholder,
}

impl ResolverState {
    /// Nothing is drawn until the existence check settles, so the first
    /// two states render as the placeholder icon.
    pub fn display(&self) -> DisplaySource {
        match self {
            ResolverState::ShowingLocal { local_path } => {
                DisplaySource::Local(local_path.clone())
            }
            ResolverState::ShowingRemote { remote_url, .. } => {
                DisplaySource::Remote(remote_url.clone())
            }
            ResolverState::Init
            | ResolverState::CheckingLocal
            | ResolverState::ShowingPlaceholder => DisplaySource::Placeholder,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolverState::ShowingPlaceholder)
    }
}

/// Display state of one `(sku, index, remote_url)` slot.
///
/// Dropping the resolver tears it down: a background download keeps
/// running for other consumers but its result is no longer applied.
#[derive(Debug)]
pub struct ImageResolver {
    api: Arc<dyn MirrorApi>,
    sku: String,
    index: u32,
    remote_url: Option<String>,
    state: Arc<watch::Sender<ResolverState>>,
}

impl ImageResolver {
    pub fn new(
        api: Arc<dyn MirrorApi>,
        sku: impl Into<String>,
        index: u32,
        remote_url: Option<String>,
    ) -> Self {
        let (state, _) = watch::channel(ResolverState::Init);
        Self {
            api,
            sku: sku.into(),
            index,
            remote_url: remote_url.filter(|url| !url.trim().is_empty()),
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> ResolverState {
        self.state.borrow().clone()
    }

    pub fn display(&self) -> DisplaySource {
        self.state.borrow().display()
    }

    /// Receive every state change instead of polling.
    pub fn subscribe(&self) -> watch::Receiver<ResolverState> {
        self.state.subscribe()
    }

    /// Run the existence check and settle on a first display state.
    ///
    /// Only the first call does any work; later calls return the current
    /// state.
    pub async fn resolve(&self) -> ResolverState {
        let Some(remote_url) = self.remote_url.clone() else {
            self.transition(
                |state| matches!(state, ResolverState::Init),
                ResolverState::ShowingPlaceholder,
            );
            return self.state();
        };

        if !self.transition(
            |state| matches!(state, ResolverState::Init),
            ResolverState::CheckingLocal,
        ) {
            return self.state();
        }

        let key = match CacheKey::new(&self.sku, self.index) {
            Ok(key) => key,
            Err(err) => {
                warn!(
                    "[ImageResolver] {}#{} is not a valid cache key ({err}); showing remote only",
                    self.sku, self.index
                );
                self.show_remote(remote_url, false);
                return self.state();
            }
        };

        match self.api.check_exists(&key).await {
            Ok(found) if found.exists => match found.local_path {
                Some(local_path) => {
                    self.transition(
                        |state| matches!(state, ResolverState::CheckingLocal),
                        ResolverState::ShowingLocal {
                            local_path: local_path.into(),
                        },
                    );
                }
                None => self.show_remote_and_materialize(key, remote_url),
            },
            Ok(_) => self.show_remote_and_materialize(key, remote_url),
            Err(err) => {
                warn!(
                    "[ImageResolver] Existence check for {key} failed ({err}); showing remote only"
                );
                self.show_remote(remote_url, false);
            }
        }

        self.state()
    }

    /// The displayed image failed to load. Terminal for this resolver.
    pub fn report_render_failure(&self) {
        let changed = self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = ResolverState::ShowingPlaceholder;
            true
        });
        if changed {
            debug!(
                "[ImageResolver] Render failed for {}#{}; showing placeholder",
                self.sku, self.index
            );
        }
    }

    fn show_remote(&self, remote_url: String, materializing: bool) {
        self.transition(
            |state| matches!(state, ResolverState::CheckingLocal),
            ResolverState::ShowingRemote {
                remote_url,
                materializing,
            },
        );
    }

    fn show_remote_and_materialize(&self, key: CacheKey, remote_url: String) {
        let Ok(handle) = Handle::try_current() else {
            warn!("[ImageResolver] No async runtime; {key} will not be mirrored");
            self.show_remote(remote_url, false);
            return;
        };

        self.show_remote(remote_url.clone(), true);

        let api = Arc::clone(&self.api);
        let state = Arc::downgrade(&self.state);
        handle.spawn(async move {
            let outcome = api.materialize(&key, &remote_url).await;
            apply_materialized(&state, &key, outcome);
        });
    }

    /// Replace the state with `next` when `allowed` holds for the current
    /// one. Returns whether the state changed.
    fn transition(
        &self,
        allowed: impl FnOnce(&ResolverState) -> bool,
        next: ResolverState,
    ) -> bool {
        self.state.send_if_modified(|state| {
            if !allowed(state) {
                return false;
            }
            *state = next;
            true
        })
    }
}

fn apply_materialized(
    state: &Weak<watch::Sender<ResolverState>>,
    key: &CacheKey,
    outcome: Result<MaterializeResponse, crate::ClientError>,
) {
    let Some(state) = state.upgrade() else {
        debug!("[ImageResolver] {key} materialized after teardown; nothing to swap");
        return;
    };

    let local_path = match outcome {
        Ok(MaterializeResponse {
            success: true,
            local_path: Some(local_path),
            ..
        }) => Some(PathBuf::from(local_path)),
        Ok(response) => {
            warn!(
                "[ImageResolver] Materialize of {key} failed: {}",
                response.error.as_deref().unwrap_or("unknown error")
            );
            None
        }
        Err(err) => {
            warn!("[ImageResolver] Materialize request for {key} failed: {err}");
            None
        }
    };

    state.send_if_modified(|current| {
        let ResolverState::ShowingRemote { remote_url, .. } = current else {
            return false;
        };
        *current = match &local_path {
            Some(local_path) => ResolverState::ShowingLocal {
                local_path: local_path.clone(),
            },
            None => ResolverState::ShowingRemote {
                remote_url: std::mem::take(remote_url),
                materializing: false,
            },
        };
        true
    });
}
