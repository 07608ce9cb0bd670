//! User directory management for the admin dashboard.
//!
//! Creates, deletes and lists credential records. Uniqueness is the store
//! key itself: creating a user under an existing identifier overwrites the
//! old record in full (no merge, no optimistic-lock check). Deletion is
//! unconditional and idempotent. The live user list is a subscription the
//! dashboard re-renders on every snapshot.

use std::sync::Arc;

use tokio::sync::watch;

use crate::auth::normalize_id;
use crate::error::{DirectoryError, StoreError, ValidationError};
use crate::signal::{SignalSender, TerminalSignal};
use crate::store::{
    child_path, CredentialRecord, RecordStore, Role, Snapshot, USERS_COLLECTION,
};

/// One row of the user list: store key plus decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub identifier: String,
    pub record: CredentialRecord,
}

pub struct UserDirectory {
    store: Arc<dyn RecordStore>,
    signals: SignalSender,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn RecordStore>, signals: SignalSender) -> Self {
        Self { store, signals }
    }

    /// Create (or overwrite) a credential record. All three fields are
    /// required after normalization; nothing is written otherwise.
    /// Returns the normalized identifier the record was stored under.
    pub async fn create_user(
        &self,
        raw_name: &str,
        raw_id: &str,
        raw_pin: &str,
        is_teacher: bool,
    ) -> Result<String, DirectoryError> {
        let name = raw_name.trim();
        let id = normalize_id(raw_id);
        let pin = raw_pin.trim();

        if name.is_empty() || id.is_empty() || pin.is_empty() {
            let reason = ValidationError::IncompleteForm;
            let _ = self.signals.send(TerminalSignal::ValidationFailed { reason });
            return Err(reason.into());
        }

        let role = if is_teacher { Role::Teacher } else { Role::Student };
        let record = CredentialRecord::new(name, pin, role);
        self.store
            .put(&child_path(USERS_COLLECTION, &id), &record.to_value())
            .await
            .map_err(DirectoryError::Store)?;

        tracing::info!(identifier = %id, role = role.as_str(), "credential record saved");
        let _ = self.signals.send(TerminalSignal::UserSaved);
        Ok(id)
    }

    /// Remove a credential record by identifier. Succeeds whether or not
    /// the record exists; historical audit entries are unaffected.
    pub async fn delete_user(&self, raw_id: &str) -> Result<(), StoreError> {
        let id = normalize_id(raw_id);
        self.store.delete(&child_path(USERS_COLLECTION, &id)).await?;
        tracing::info!(identifier = %id, "credential record deleted");
        let _ = self.signals.send(TerminalSignal::UserDeleted);
        Ok(())
    }

    /// Live user list; each snapshot decodes with [`decode_users`] and the
    /// list restarts by re-subscribing. Dropping the receiver ends it.
    pub async fn subscribe(&self) -> Result<watch::Receiver<Snapshot>, StoreError> {
        self.store.subscribe(USERS_COLLECTION, None).await
    }
}

/// Decode a raw snapshot into directory rows, skipping malformed records
/// with a warning so one bad row cannot blank the whole list.
pub fn decode_users(snapshot: &Snapshot) -> Vec<DirectoryEntry> {
    snapshot
        .iter()
        .filter_map(|(key, value)| {
            match CredentialRecord::from_value(&child_path(USERS_COLLECTION, key), value) {
                Ok(record) => Some(DirectoryEntry {
                    identifier: key.clone(),
                    record,
                }),
                Err(e) => {
                    tracing::warn!("skipping user row: {e}");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::signal_channel;
    use crate::store::MemoryStore;

    fn directory(store: &Arc<MemoryStore>) -> (UserDirectory, crate::signal::SignalReceiver) {
        let (tx, rx) = signal_channel();
        (UserDirectory::new(store.clone() as Arc<dyn RecordStore>, tx), rx)
    }

    #[tokio::test]
    async fn create_then_get_round_trips_with_normalized_key() {
        let store = Arc::new(MemoryStore::new());
        let (dir, mut rx) = directory(&store);

        let id = dir
            .create_user("Ana Pérez", "12.345.678-9", "1234", false)
            .await
            .unwrap();
        assert_eq!(id, "123456789");

        let value = store
            .get("usuarios_autorizados/123456789")
            .await
            .unwrap()
            .unwrap();
        let record = CredentialRecord::from_value("x", &value).unwrap();
        assert_eq!(record.display_name, "Ana Pérez");
        assert_eq!(record.pin, "1234");
        assert_eq!(record.role, Role::Student);
        assert_eq!(rx.try_recv().unwrap(), TerminalSignal::UserSaved);
    }

    #[tokio::test]
    async fn teacher_flag_assigns_teacher_role() {
        let store = Arc::new(MemoryStore::new());
        let (dir, _rx) = directory(&store);

        dir.create_user("Ana Pérez", "123456789", "1234", true).await.unwrap();

        let list = dir.subscribe().await.unwrap();
        let users = decode_users(&list.borrow());
        assert_eq!(users[0].record.role, Role::Teacher);
    }

    #[tokio::test]
    async fn incomplete_form_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let (dir, mut rx) = directory(&store);

        let result = dir.create_user("", "123", "1", false).await;
        assert!(matches!(
            result,
            Err(DirectoryError::Validation(ValidationError::IncompleteForm))
        ));
        assert!(store.snapshot(USERS_COLLECTION, None).await.unwrap().is_empty());
        assert_eq!(
            rx.try_recv().unwrap(),
            TerminalSignal::ValidationFailed {
                reason: ValidationError::IncompleteForm
            }
        );

        // An identifier that normalizes to nothing is incomplete too.
        let result = dir.create_user("Ana", ".-.", "1", false).await;
        assert!(result.is_err());
        assert!(store.snapshot(USERS_COLLECTION, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_overwrites_existing_identifier() {
        let store = Arc::new(MemoryStore::new());
        let (dir, _rx) = directory(&store);

        dir.create_user("Ana Pérez", "123456789", "1234", false).await.unwrap();
        dir.create_user("Ana P. Rojas", "12.345.678-9", "5678", true).await.unwrap();

        let list = dir.subscribe().await.unwrap();
        let users = decode_users(&list.borrow());
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].record.display_name, "Ana P. Rojas");
        assert_eq!(users[0].record.pin, "5678");
        assert_eq!(users[0].record.role, Role::Teacher);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let (dir, mut rx) = directory(&store);

        dir.create_user("Ana Pérez", "123456789", "1234", false).await.unwrap();
        dir.delete_user("123456789").await.unwrap();
        dir.delete_user("123456789").await.unwrap();

        let list = dir.subscribe().await.unwrap();
        assert!(decode_users(&list.borrow()).is_empty());
        let _ = rx.try_recv(); // UserSaved
        assert_eq!(rx.try_recv().unwrap(), TerminalSignal::UserDeleted);
        assert_eq!(rx.try_recv().unwrap(), TerminalSignal::UserDeleted);
    }

    #[tokio::test]
    async fn list_skips_malformed_rows() {
        let store = Arc::new(MemoryStore::new());
        let (dir, _rx) = directory(&store);

        dir.create_user("Ana Pérez", "123456789", "1234", true).await.unwrap();
        store
            .put(
                "usuarios_autorizados/junk",
                &serde_json::json!({"nombre": "Sin Pin"}),
            )
            .await
            .unwrap();

        let list = dir.subscribe().await.unwrap();
        let users = decode_users(&list.borrow());
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].identifier, "123456789");
    }

    #[tokio::test]
    async fn subscription_tracks_creates_and_deletes() {
        let store = Arc::new(MemoryStore::new());
        let (dir, _rx) = directory(&store);

        let mut sub = dir.subscribe().await.unwrap();
        assert!(decode_users(&sub.borrow()).is_empty());

        dir.create_user("Ana Pérez", "123456789", "1234", false).await.unwrap();
        sub.changed().await.unwrap();
        assert_eq!(decode_users(&sub.borrow()).len(), 1);

        dir.delete_user("123456789").await.unwrap();
        sub.changed().await.unwrap();
        assert!(decode_users(&sub.borrow()).is_empty());
    }
}
