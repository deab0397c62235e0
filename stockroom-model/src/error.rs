use thiserror::Error;

/// Why a `(sku, index)` pair was refused as a cache key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("sku must not be empty")]
    EmptySku,

    #[error("sku is {len} bytes long; the limit is {max}")]
    SkuTooLong { len: usize, max: usize },

    #[error("sku contains disallowed character {ch:?}")]
    InvalidCharacter { ch: char },

    #[error("sku {sku:?} could escape the store root")]
    PathTraversal { sku: String },

    #[error("image index must start at 1")]
    ZeroIndex,
}
