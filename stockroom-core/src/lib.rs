//! Core of the Stockroom image mirror.
//!
//! Remote product photos are mirrored into a local, key-addressed store so
//! renders stop depending on the original host. The pieces, leaves first:
//!
//! - [`infra::cache::LocalStore`]: atomic tmp-then-rename blob storage.
//! - [`infra::cache::CacheRegistry`]: per-key entry state and single-flight
//!   coordination.
//! - [`infra::fetch::HttpFetcher`]: bounded, verified remote fetches.
//! - [`mirror::Materializer`] and [`mirror::ExistenceChecker`], tied
//!   together by [`MirrorService`].

pub mod error;
pub mod infra;
pub mod mirror;

pub use error::{FetchError, MirrorError, Result, StoreError};
pub use infra::fetch::{FetchedImage, HttpFetcher, ImageFetcher};
pub use mirror::{
    ExistenceChecker, FetchSettings, MirrorService, MirrorSettings,
    RetryPolicy,
};
