//! Consumer side of the Stockroom image mirror.
//!
//! [`ImageResolver`] decides, per image slot, whether to show the local
//! mirrored copy, the remote URL, or a placeholder. It talks to the mirror
//! through [`MirrorApi`], implemented over HTTP by [`ApiClient`] and
//! in-process by [`LocalMirror`].
//!
//! Logging goes through the `log` facade; the host application picks the
//! backend.

pub mod api;
pub mod api_client;
pub mod error;
pub mod local;
pub mod resolver;

pub use api::MirrorApi;
pub use api_client::{ApiClient, default_request_timeout};
pub use error::ClientError;
pub use local::LocalMirror;
pub use resolver::{DisplaySource, ImageResolver, ResolverState};
