//! Session-only history used when the history store cannot persist.
//!
//! Records pushed here live in memory for the current session and are mirrored,
//! best effort, into the legacy local key so that
//! [`HistoryStore::migrate_legacy`](super::HistoryStore::migrate_legacy) can pick
//! them up once the store works again. Nothing here is durable.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;

use super::store::LEGACY_KEY;
use super::types::NewRecord;
use crate::blob::{BlobStore, Scope};

/// Most recent records kept by the fallback list.
pub const FALLBACK_CAPACITY: usize = 20;

pub struct SessionFallback {
    blobs: Arc<dyn BlobStore>,
    records: VecDeque<NewRecord>,
    capacity: usize,
}

impl SessionFallback {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_capacity(blobs, FALLBACK_CAPACITY)
    }

    pub fn with_capacity(blobs: Arc<dyn BlobStore>, capacity: usize) -> Self {
        Self {
            blobs,
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Keep `record` as the most recent entry, dropping the oldest past capacity.
    ///
    /// The stored legacy list is extended rather than replaced, so entries left
    /// by earlier sessions stay pending until migration.
    pub fn push(&mut self, record: NewRecord) {
        self.mirror(&record);
        self.records.push_front(record);
        self.records.truncate(self.capacity);
        tracing::warn!(
            kept = self.records.len(),
            "history store unavailable: record kept in session memory only and may be lost"
        );
    }

    /// Most recent first.
    pub fn records(&self) -> impl Iterator<Item = &NewRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn mirror(&self, record: &NewRecord) {
        let entry = match serde_json::to_value(record) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "could not encode session history");
                return;
            }
        };
        let mut pending = match self.blobs.get_one(Scope::Local, LEGACY_KEY) {
            Ok(Some(Value::Array(items))) => items,
            Ok(None) => Vec::new(),
            Ok(Some(_)) => {
                tracing::warn!(key = LEGACY_KEY, "stored session history is not a list, leaving it untouched");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored session history");
                return;
            }
        };
        pending.insert(0, entry);
        if let Err(e) = self.blobs.set_one(Scope::Local, LEGACY_KEY, Value::Array(pending)) {
            tracing::warn!(error = %e, "could not mirror session history to storage");
        }
    }
}
