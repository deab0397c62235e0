use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use stockroom_model::CacheKey;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

const TMP_MARKER: &str = ".tmp-";

/// File-backed image blobs addressed by cache key.
///
/// Layout is `<root>/<sku>/<index>`. Writes land in a uniquely named
/// sibling temp file and are renamed into place only once fully flushed,
/// so nothing ever observes a partial file under a final path.
#[derive(Clone, Debug)]
pub struct LocalStore {
    root: PathBuf,
}

/// A complete blob discovered on disk by [`LocalStore::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub key: CacheKey,
    pub path: PathBuf,
    pub byte_len: u64,
}

impl LocalStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location for `key`. Pure: depends only on the root and the key.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.sku()).join(key.index().to_string())
    }

    pub async fn ensure_root(&self) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|err| StoreError::io("create store root", &self.root, err))
    }

    pub async fn exists(&self, key: &CacheKey) -> bool {
        tokio::fs::metadata(self.path_for(key))
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    /// Atomic write (tmp + fsync + rename). Replaces any previous blob.
    pub async fn write(
        &self,
        key: &CacheKey,
        bytes: &[u8],
    ) -> StoreResult<PathBuf> {
        let path = self.path_for(key);
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| StoreError::io("create image dir", &dir, err))?;

        let tmp = dir.join(format!(
            "{}{TMP_MARKER}{}",
            key.index(),
            Uuid::new_v4().simple()
        ));

        if let Err(err) = write_fully(&tmp, bytes).await {
            discard(&tmp).await;
            return Err(err);
        }

        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            discard(&tmp).await;
            return Err(StoreError::io("move image blob into", &path, err));
        }

        debug!(%key, path = %path.display(), bytes = bytes.len(), "stored image blob");
        Ok(path)
    }

    pub async fn read(&self, key: &CacheKey) -> StoreResult<Vec<u8>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(path))
            }
            Err(err) => Err(StoreError::io("read image blob", path, err)),
        }
    }

    /// Walk the store, returning every complete blob and deleting temp
    /// files abandoned by an interrupted writer.
    pub async fn scan(&self) -> StoreResult<Vec<StoredFile>> {
        let mut found = Vec::new();

        let mut skus = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(found);
            }
            Err(err) => {
                return Err(StoreError::io("list store root", &self.root, err));
            }
        };

        while let Some(sku_dir) = skus
            .next_entry()
            .await
            .map_err(|err| StoreError::io("list store root", &self.root, err))?
        {
            let sku_path = sku_dir.path();
            if !sku_dir.file_type().await.is_ok_and(|t| t.is_dir()) {
                continue;
            }
            let Some(sku) = sku_dir.file_name().to_str().map(str::to_owned)
            else {
                continue;
            };

            let mut files = tokio::fs::read_dir(&sku_path)
                .await
                .map_err(|err| StoreError::io("list image dir", &sku_path, err))?;

            while let Some(file) = files.next_entry().await.map_err(|err| {
                StoreError::io("list image dir", &sku_path, err)
            })? {
                let path = file.path();
                let Some(name) = file.file_name().to_str().map(str::to_owned)
                else {
                    continue;
                };

                if name.contains(TMP_MARKER) {
                    warn!(path = %path.display(), "removing abandoned temp blob");
                    discard(&path).await;
                    continue;
                }

                let Some(key) = name
                    .parse::<u32>()
                    .ok()
                    .and_then(|index| CacheKey::new(&sku, index).ok())
                    .filter(|key| key.sku() == sku)
                else {
                    debug!(path = %path.display(), "skipping unrecognized file in image store");
                    continue;
                };

                let Ok(meta) = file.metadata().await else {
                    continue;
                };
                if meta.is_file() {
                    found.push(StoredFile {
                        key,
                        path,
                        byte_len: meta.len(),
                    });
                }
            }
        }

        Ok(found)
    }
}

async fn write_fully(tmp: &Path, bytes: &[u8]) -> StoreResult<()> {
    let mut file = tokio::fs::File::create(tmp)
        .await
        .map_err(|err| StoreError::io("create temp image blob", tmp, err))?;
    file.write_all(bytes)
        .await
        .map_err(|err| StoreError::io("write temp image blob", tmp, err))?;
    file.flush()
        .await
        .map_err(|err| StoreError::io("flush temp image blob", tmp, err))?;
    file.sync_all()
        .await
        .map_err(|err| StoreError::io("sync temp image blob", tmp, err))?;
    Ok(())
}

async fn discard(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await
        && err.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %err, "failed to remove temp blob");
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
