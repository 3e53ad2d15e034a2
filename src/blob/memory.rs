use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{merge_within_quota, select, BlobError, BlobMap, BlobStore, Quota, Scope};

/// Process-local blob store. Nothing survives the process; used by tests and by
/// callers that want an isolated history store.
pub struct MemoryBlobStore {
    scopes: Mutex<HashMap<Scope, BlobMap>>,
    sync_quota: Quota,
    local_quota: Quota,
}

impl MemoryBlobStore {
    /// Store enforcing the host's default quotas.
    pub fn new() -> Self {
        Self::with_quotas(Quota::SYNC, Quota::LOCAL)
    }

    pub fn with_quotas(sync_quota: Quota, local_quota: Quota) -> Self {
        Self {
            scopes: Mutex::new(HashMap::new()),
            sync_quota,
            local_quota,
        }
    }

    fn quota(&self, scope: Scope) -> Quota {
        match scope {
            Scope::Sync => self.sync_quota,
            Scope::Local => self.local_quota,
        }
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, scope: Scope, keys: &[&str]) -> Result<BlobMap, BlobError> {
        let scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(scopes
            .get(&scope)
            .map(|current| select(current, keys))
            .unwrap_or_default())
    }

    fn set(&self, scope: Scope, items: BlobMap) -> Result<(), BlobError> {
        let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        let current = scopes.entry(scope).or_default();
        let merged = merge_within_quota(scope, self.quota(scope), current, items)?;
        *current = merged;
        Ok(())
    }

    fn remove(&self, scope: Scope, keys: &[&str]) -> Result<(), BlobError> {
        let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = scopes.get_mut(&scope) {
            for key in keys {
                current.remove(*key);
            }
        }
        Ok(())
    }

    fn clear(&self, scope: Scope) -> Result<(), BlobError> {
        let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        scopes.remove(&scope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scopes_are_isolated() {
        let store = MemoryBlobStore::new();
        store.set_one(Scope::Sync, "apiKey", json!("sk-test")).unwrap();

        assert!(store.get_one(Scope::Local, "apiKey").unwrap().is_none());
        assert_eq!(store.get_one(Scope::Sync, "apiKey").unwrap(), Some(json!("sk-test")));
    }

    #[test]
    fn failed_set_leaves_scope_untouched() {
        let store = MemoryBlobStore::with_quotas(
            Quota::SYNC,
            Quota {
                total_bytes: 32,
                item_bytes: None,
            },
        );
        store.set_one(Scope::Local, "a", json!("ok")).unwrap();

        let err = store.set_one(Scope::Local, "b", json!("y".repeat(64)));
        assert!(err.is_err());
        assert_eq!(store.get_one(Scope::Local, "a").unwrap(), Some(json!("ok")));
        assert!(store.get_one(Scope::Local, "b").unwrap().is_none());
    }

    #[test]
    fn remove_and_clear() {
        let store = MemoryBlobStore::new();
        store.set_one(Scope::Local, "a", json!(1)).unwrap();
        store.set_one(Scope::Local, "b", json!(2)).unwrap();

        store.remove(Scope::Local, &["a", "missing"]).unwrap();
        assert!(store.get_one(Scope::Local, "a").unwrap().is_none());
        assert!(store.get_one(Scope::Local, "b").unwrap().is_some());

        store.clear(Scope::Local).unwrap();
        assert!(store.get(Scope::Local, &["a", "b"]).unwrap().is_empty());
    }
}
