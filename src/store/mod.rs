//! Record store abstraction.
//!
//! The hosted database is treated as an opaque, path-addressed key-value
//! tree with point reads, full overwrites, idempotent deletes, appends with
//! store-generated keys, and eventually-consistent collection snapshots.
//! Two implementations:
//!
//! - [`FirebaseStore`]: the production backend, speaking the Realtime
//!   Database REST surface over HTTPS. Subscriptions are realized by
//!   polling; the core only requires last-write-observed semantics.
//! - [`MemoryStore`]: in-process backend for unit tests and offline demo
//!   mode, with immediate subscription notification.
//!
//! The core performs no locking or transactions on top of the store: it is
//! a shared multi-writer resource with last-write-wins semantics.

pub mod firebase;
pub mod memory;
pub mod record;

pub use firebase::FirebaseStore;
pub use memory::MemoryStore;
pub use record::{AuditEntry, CredentialRecord, Role};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::StoreError;

/// Credential records, keyed by normalized identifier.
pub const USERS_COLLECTION: &str = "usuarios_autorizados";
/// Single door-state value, `"ABIERTO"` or `"CERRADO"`.
pub const DOOR_STATE_PATH: &str = "estado_puerta";
/// Append-only audit trail of granted entries.
pub const AUDIT_COLLECTION: &str = "registro_ingresos";

/// Full-collection snapshot: `(key, value)` rows in key order. Store push
/// keys sort chronologically, so key order is insertion order.
pub type Snapshot = Vec<(String, Value)>;

/// Path of a keyed record inside a collection.
pub fn child_path(collection: &str, key: &str) -> String {
    format!("{collection}/{key}")
}

/// Abstract record store.
///
/// Every method is a suspension point. Implementations must not retry
/// automatically; retry policy belongs to callers, and the core never
/// retries authorization reads.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Point read. `Ok(None)` when nothing exists at the path.
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Full overwrite of the value at the path (upsert, no merge).
    async fn put(&self, path: &str, value: &Value) -> Result<(), StoreError>;

    /// Idempotent removal; succeeds whether or not the path exists.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Append under a store-generated, chronologically sortable key.
    /// Returns the generated key.
    async fn push(&self, path: &str, value: &Value) -> Result<String, StoreError>;

    /// One-shot snapshot of a collection, optionally capped to the last
    /// `limit_to_last` rows in key order.
    async fn snapshot(
        &self,
        path: &str,
        limit_to_last: Option<usize>,
    ) -> Result<Snapshot, StoreError>;

    /// Live view of a collection. The receiver holds the latest snapshot
    /// and is updated on every observed change until dropped.
    async fn subscribe(
        &self,
        path: &str,
        limit_to_last: Option<usize>,
    ) -> Result<watch::Receiver<Snapshot>, StoreError>;
}
