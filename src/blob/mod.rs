//! Host key/value persistence with two scopes.
//!
//! The [`BlobStore`] trait mirrors the browser storage API the explainer was built
//! against: `get`/`set`/`remove`/`clear` over JSON values, split into a small
//! [`Scope::Sync`] area for settings and a larger [`Scope::Local`] area for the
//! serialized history table and one-shot handoff payloads. Writes are full-value
//! overwrites per key and are rejected up front when they would exceed the
//! scope's [`Quota`].

pub mod file;
pub mod handoff;
pub mod memory;

pub use file::FileBlobStore;
pub use memory::MemoryBlobStore;

use serde_json::Value;
use thiserror::Error;

/// A partial key → value map, as returned by `get` and accepted by `set`.
pub type BlobMap = serde_json::Map<String, Value>;

/// Storage area a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Small, size-limited area for settings and prompt configuration.
    Sync,
    /// Larger area for the history table image and transfer payloads.
    Local,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Local => "local",
        }
    }

    /// Quota the host enforces for this scope.
    pub fn default_quota(&self) -> Quota {
        match self {
            Self::Sync => Quota::SYNC,
            Self::Local => Quota::LOCAL,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte limits for one scope, measured as `key.len() + JSON(value).len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub total_bytes: usize,
    pub item_bytes: Option<usize>,
}

impl Quota {
    pub const SYNC: Quota = Quota {
        total_bytes: 102_400,
        item_bytes: Some(8_192),
    };

    pub const LOCAL: Quota = Quota {
        total_bytes: 10_485_760,
        item_bytes: None,
    };

    pub const UNLIMITED: Quota = Quota {
        total_bytes: usize::MAX,
        item_bytes: None,
    };
}

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("{scope} storage quota exceeded: {needed} bytes > {limit} bytes")]
    QuotaExceeded {
        scope: Scope,
        needed: usize,
        limit: usize,
    },

    #[error("{scope} storage item {key:?} too large: {needed} bytes > {limit} bytes")]
    ItemTooLarge {
        scope: Scope,
        key: String,
        needed: usize,
        limit: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed storage data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key/value persistence API consumed by the history store and settings.
///
/// All methods are synchronous; implementations serialize access internally so a
/// single store can be shared behind an `Arc` across tasks.
pub trait BlobStore: Send + Sync {
    /// Fetch the subset of `keys` that exist. Missing keys are simply absent.
    fn get(&self, scope: Scope, keys: &[&str]) -> Result<BlobMap, BlobError>;

    /// Overwrite every key in `items`. Either all keys are written or none are.
    fn set(&self, scope: Scope, items: BlobMap) -> Result<(), BlobError>;

    /// Delete `keys`; keys that do not exist are ignored.
    fn remove(&self, scope: Scope, keys: &[&str]) -> Result<(), BlobError>;

    /// Drop every key in the scope.
    fn clear(&self, scope: Scope) -> Result<(), BlobError>;

    /// Convenience wrapper around [`get`](Self::get) for a single key.
    fn get_one(&self, scope: Scope, key: &str) -> Result<Option<Value>, BlobError> {
        Ok(self.get(scope, &[key])?.remove(key))
    }

    /// Convenience wrapper around [`set`](Self::set) for a single key.
    fn set_one(&self, scope: Scope, key: &str, value: Value) -> Result<(), BlobError> {
        let mut items = BlobMap::new();
        items.insert(key.to_string(), value);
        self.set(scope, items)
    }
}

/// Size of one entry as the host accounts for it.
fn entry_size(key: &str, value: &Value) -> usize {
    key.len() + value.to_string().len()
}

/// Merge `items` into `current`, returning the new scope contents if they fit `quota`.
pub(crate) fn merge_within_quota(
    scope: Scope,
    quota: Quota,
    current: &BlobMap,
    items: BlobMap,
) -> Result<BlobMap, BlobError> {
    if let Some(limit) = quota.item_bytes {
        for (key, value) in &items {
            let needed = entry_size(key, value);
            if needed > limit {
                return Err(BlobError::ItemTooLarge {
                    scope,
                    key: key.clone(),
                    needed,
                    limit,
                });
            }
        }
    }

    let mut merged = current.clone();
    merged.extend(items);

    let needed: usize = merged.iter().map(|(k, v)| entry_size(k, v)).sum();
    if needed > quota.total_bytes {
        return Err(BlobError::QuotaExceeded {
            scope,
            needed,
            limit: quota.total_bytes,
        });
    }

    Ok(merged)
}

/// Pick the requested keys out of a scope's contents.
pub(crate) fn select(current: &BlobMap, keys: &[&str]) -> BlobMap {
    keys.iter()
        .filter_map(|k| current.get(*k).map(|v| ((*k).to_string(), v.clone())))
        .collect()
}
