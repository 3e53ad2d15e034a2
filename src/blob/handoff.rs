//! One-shot payloads passed between surfaces through the local scope.
//!
//! A producer [`stash`]es a payload under `<prefix>-<epoch millis>` and hands the
//! key to the consumer, which [`take`]s it: the read and the delete happen together
//! so a payload is delivered at most once.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{BlobStore, Scope};
use crate::error::{ExplainerError, Result};

/// Prefix used for Markdown viewer payloads.
pub const VIEWER_PREFIX: &str = "markdown-viewer";

/// Write `payload` under a fresh `<prefix>-<timestamp>` key and return the key.
pub fn stash<T: Serialize>(blobs: &dyn BlobStore, prefix: &str, payload: &T) -> Result<String> {
    let key = format!("{prefix}-{}", chrono::Utc::now().timestamp_millis());
    let value = serde_json::to_value(payload)?;
    blobs
        .set_one(Scope::Local, &key, value)
        .map_err(|e| ExplainerError::storage(format!("failed to stash handoff payload {key}"), e))?;
    tracing::debug!(key = %key, "handoff payload stashed");
    Ok(key)
}

/// Read and delete the payload stored under `key`. `Ok(None)` if it was already taken.
pub fn take<T: DeserializeOwned>(blobs: &dyn BlobStore, key: &str) -> Result<Option<T>> {
    let value = blobs
        .get_one(Scope::Local, key)
        .map_err(|e| ExplainerError::storage(format!("failed to read handoff payload {key}"), e))?;

    let Some(value) = value else {
        return Ok(None);
    };

    blobs
        .remove(Scope::Local, &[key])
        .map_err(|e| ExplainerError::storage(format!("failed to delete handoff payload {key}"), e))?;

    Ok(Some(serde_json::from_value(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Note {
        body: String,
    }

    #[test]
    fn payload_is_delivered_once() {
        let blobs = MemoryBlobStore::new();
        let note = Note {
            body: "hello".into(),
        };

        let key = stash(&blobs, VIEWER_PREFIX, &note).unwrap();
        assert!(key.starts_with("markdown-viewer-"));

        let first: Option<Note> = take(&blobs, &key).unwrap();
        assert_eq!(first, Some(note));

        let second: Option<Note> = take(&blobs, &key).unwrap();
        assert!(second.is_none());
    }
}
