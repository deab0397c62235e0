mod blob;
mod entry;
mod exists;
mod materialize;

pub use blob::get_image_blob_handler;
pub use entry::get_entry_handler;
pub use exists::get_exists_handler;
pub use materialize::post_materialize_handler;

use stockroom_model::{CacheKey, ErrorKind};

use crate::infra::errors::AppError;

/// Validate `{sku}/{index}` path segments into a cache key.
///
/// The index is taken as text so that malformed values get the same
/// `invalid_key` error body as a rejected SKU.
pub(crate) fn key_from_path(sku: &str, index: &str) -> Result<CacheKey, AppError> {
    let index: u32 = index.trim().parse().map_err(|_| {
        AppError::bad_request(format!("invalid cache key: bad image index {index:?}"))
            .with_kind(ErrorKind::InvalidKey)
    })?;
    Ok(CacheKey::new(sku, index)?)
}
