use std::fmt;

use crate::error::KeyError;

/// Longest SKU accepted, in bytes.
pub const MAX_SKU_LEN: usize = 64;

/// Stable identifier for one image slot of one inventory item.
///
/// A key is only ever constructed through [`CacheKey::new`], which trims
/// surrounding whitespace from the SKU, validates it and folds it to ASCII
/// upper case. SKUs are case-insensitive: `sku123` and `SKU123` are the
/// same key, so distinct keys stay distinct storage addresses even on
/// case-insensitive filesystems. Anything else unusual is rejected rather
/// than rewritten.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "CacheKeyParts", into = "CacheKeyParts")
)]
pub struct CacheKey {
    sku: String,
    index: u32,
}

impl CacheKey {
    pub fn new(sku: impl AsRef<str>, index: u32) -> Result<Self, KeyError> {
        let sku = sku.as_ref().trim();
        validate_sku(sku)?;
        if index == 0 {
            return Err(KeyError::ZeroIndex);
        }
        Ok(Self {
            sku: sku.to_ascii_uppercase(),
            index,
        })
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    /// One-based image sequence number within the item.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn into_parts(self) -> CacheKeyParts {
        CacheKeyParts {
            sku: self.sku,
            index: self.index,
        }
    }
}

fn validate_sku(sku: &str) -> Result<(), KeyError> {
    if sku.is_empty() {
        return Err(KeyError::EmptySku);
    }
    if sku.len() > MAX_SKU_LEN {
        return Err(KeyError::SkuTooLong {
            len: sku.len(),
            max: MAX_SKU_LEN,
        });
    }
    if let Some(ch) = sku
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(KeyError::InvalidCharacter { ch });
    }
    if sku.starts_with('.') || sku.contains("..") {
        return Err(KeyError::PathTraversal {
            sku: sku.to_string(),
        });
    }
    Ok(())
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CacheKey")
            .field(&self.sku)
            .field(&self.index)
            .finish()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.sku, self.index)
    }
}

/// Unvalidated `(sku, index)` pair as it arrives over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheKeyParts {
    pub sku: String,
    pub index: u32,
}

impl CacheKeyParts {
    pub fn new(sku: impl Into<String>, index: u32) -> Self {
        Self {
            sku: sku.into(),
            index,
        }
    }
}

impl TryFrom<CacheKeyParts> for CacheKey {
    type Error = KeyError;

    fn try_from(parts: CacheKeyParts) -> Result<Self, Self::Error> {
        CacheKey::new(parts.sku, parts.index)
    }
}

impl From<CacheKey> for CacheKeyParts {
    fn from(key: CacheKey) -> Self {
        key.into_parts()
    }
}
