//! Shared data models for the Stockroom image mirror.
//!
//! Everything that crosses a crate or process boundary lives here: the
//! validated [`CacheKey`], the per-key [`CacheEntry`] lifecycle, the JSON
//! request/response payloads exchanged with the mirror service, and the
//! versioned route table shared by the server and its clients.
//!
//! Serde support is gated behind the `serde` feature so the core types can
//! be used without pulling in serialization.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod api;
pub mod entry;
pub mod error;
pub mod key;
pub mod routes;

pub use api::{
    ErrorKind, ExistsResponse, HealthResponse, MaterializeRequest,
    MaterializeResponse,
};
pub use entry::{CacheEntry, CacheStatus, EntryState, ReadyImage};
pub use error::KeyError;
pub use key::{CacheKey, CacheKeyParts, MAX_SKU_LEN};
