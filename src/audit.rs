//! Audit trail of granted entries.
//!
//! One append per granted access, immutable once written. The append is
//! best-effort relative to the unlock that triggered it: a store failure
//! here is reported to the caller (the state machine warn-logs it) and
//! never rolls back the door transition.
//!
//! The dashboard history view reads the trail back through a capped
//! subscription, most-recent-first, with the product's search filter:
//! case-insensitive substring on the resolved name, case-sensitive
//! substring on the identifier.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::watch;

use crate::error::StoreError;
use crate::store::{AuditEntry, CredentialRecord, RecordStore, Snapshot, AUDIT_COLLECTION};

/// Audit timestamps carry minute granularity in the local clock.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// The history view only ever shows the most recent entries.
pub const HISTORY_LIMIT: usize = 50;

pub struct AuditLogger {
    store: Arc<dyn RecordStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Append one entry for a granted access. Returns the store key.
    pub async fn record(
        &self,
        granted: &CredentialRecord,
        identifier: &str,
        timestamp: DateTime<Local>,
    ) -> Result<String, StoreError> {
        let entry = AuditEntry {
            name: granted.display_name.clone(),
            identifier: identifier.to_string(),
            timestamp: timestamp.format(TIMESTAMP_FORMAT).to_string(),
        };
        let key = self.store.push(AUDIT_COLLECTION, &entry.to_value()).await?;
        tracing::info!(
            identifier = identifier,
            name = %granted.display_name,
            "entry recorded in audit trail"
        );
        Ok(key)
    }

    /// Live history view for the dashboard, capped to the most recent
    /// entries; each snapshot decodes with [`decode_history`]. Dropping
    /// the receiver ends the view.
    pub async fn subscribe(&self) -> Result<watch::Receiver<Snapshot>, StoreError> {
        self.store
            .subscribe(AUDIT_COLLECTION, Some(HISTORY_LIMIT))
            .await
    }
}

/// Decode a raw snapshot into entries, most-recent-first. Malformed rows
/// are skipped with a warning; the history view must keep rendering even
/// if one record was hand-edited in the hosted console.
pub fn decode_history(snapshot: &Snapshot) -> Vec<AuditEntry> {
    let mut entries: Vec<AuditEntry> = snapshot
        .iter()
        .filter_map(|(key, value)| {
            match AuditEntry::from_value(&format!("{AUDIT_COLLECTION}/{key}"), value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("skipping audit row: {e}");
                    None
                }
            }
        })
        .collect();
    entries.reverse();
    entries
}

/// The dashboard search filter: name matches case-insensitively,
/// identifier matches case-sensitively. An empty query matches everything.
pub fn matches_search(entry: &AuditEntry, query: &str) -> bool {
    entry
        .name
        .to_lowercase()
        .contains(&query.to_lowercase())
        || entry.identifier.contains(query)
}
