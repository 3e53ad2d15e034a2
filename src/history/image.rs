//! The persisted form of the history table.
//!
//! The whole table is written as one JSON document under a single local-scope key
//! after every mutation. `next_id` travels with the rows so ids keep increasing
//! across deletions and reloads.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::HistoryRecord;
use crate::db::schema::SCHEMA_VERSION;
use crate::error::{ExplainerError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableImage {
    pub schema_version: u32,
    pub next_id: i64,
    /// Rows in ascending id order.
    pub records: Vec<HistoryRecord>,
}

impl TableImage {
    pub fn new(next_id: i64, records: Vec<HistoryRecord>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            next_id,
            records,
        }
    }

    /// Decode and validate a stored image.
    ///
    /// Fails with [`ExplainerError::CorruptState`] when the value does not parse,
    /// comes from a newer schema, or contains duplicate or non-positive ids.
    pub fn decode(value: Value) -> Result<Self> {
        let mut image: TableImage = serde_json::from_value(value)
            .map_err(|e| ExplainerError::CorruptState(format!("history image does not parse: {e}")))?;

        if image.schema_version > SCHEMA_VERSION {
            return Err(ExplainerError::CorruptState(format!(
                "history image has schema version {} but this build understands {}",
                image.schema_version, SCHEMA_VERSION
            )));
        }

        let mut seen = HashSet::with_capacity(image.records.len());
        for record in &image.records {
            if record.id <= 0 || !seen.insert(record.id) {
                return Err(ExplainerError::CorruptState(format!(
                    "history image contains invalid or duplicate id {}",
                    record.id
                )));
            }
        }

        let max_id = image.records.iter().map(|r| r.id).max().unwrap_or(0);
        if image.next_id <= max_id {
            tracing::warn!(
                next_id = image.next_id,
                max_id,
                "history image next_id behind stored rows, advancing"
            );
            image.next_id = max_id + 1;
        }

        Ok(image)
    }
}
