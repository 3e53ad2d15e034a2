//! File-backed blob store: one JSON document per scope inside a data directory.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::{merge_within_quota, select, BlobError, BlobMap, BlobStore, Scope};

pub struct FileBlobStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileBlobStore {
    /// Open (or create) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, BlobError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "blob store opened");
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    /// Path of the JSON document backing `scope`.
    pub fn scope_path(&self, scope: Scope) -> PathBuf {
        self.dir.join(format!("{}.json", scope.as_str()))
    }

    fn read_scope(&self, scope: Scope) -> Result<BlobMap, BlobError> {
        let path = self.scope_path(scope);
        if !path.exists() {
            return Ok(BlobMap::new());
        }
        let contents = std::fs::read_to_string(&path)?;
        if contents.trim().is_empty() {
            return Ok(BlobMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Atomic write: temp file in the same directory, then rename over the target.
    fn write_scope(&self, scope: Scope, data: &BlobMap) -> Result<(), BlobError> {
        let path = self.scope_path(scope);
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(data)?;
        std::fs::write(&tmp_path, &bytes)?;
        std::fs::rename(&tmp_path, &path)?;
        tracing::trace!(scope = %scope, bytes = bytes.len(), "scope written");
        Ok(())
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, scope: Scope, keys: &[&str]) -> Result<BlobMap, BlobError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.read_scope(scope)?;
        Ok(select(&current, keys))
    }

    fn set(&self, scope: Scope, items: BlobMap) -> Result<(), BlobError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.read_scope(scope)?;
        let merged = merge_within_quota(scope, scope.default_quota(), &current, items)?;
        self.write_scope(scope, &merged)
    }

    fn remove(&self, scope: Scope, keys: &[&str]) -> Result<(), BlobError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut current = self.read_scope(scope)?;
        let before = current.len();
        for key in keys {
            current.remove(*key);
        }
        if current.len() != before {
            self.write_scope(scope, &current)?;
        }
        Ok(())
    }

    fn clear(&self, scope: Scope) -> Result<(), BlobError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let path = self.scope_path(scope);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }
}
