//! Authorization engine.
//!
//! Pure decision functions over the inputs and a single store read. No
//! side effects on grant: the entry state machine owns the unlock, the
//! audit append and the signals. Two gates with deliberately different
//! shapes:
//!
//! - Entry: identifier + PIN + display name (case-insensitive).
//! - Admin: identifier + PIN + Teacher role. The name is never checked.
//!
//! Store failures propagate as errors so callers fail closed; they are
//! never retried here.

use std::sync::Arc;

use crate::error::{DenyReason, StoreError};
use crate::store::{child_path, CredentialRecord, RecordStore, Role, USERS_COLLECTION};

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Granted(CredentialRecord),
    Denied(DenyReason),
}

/// Strip identifier punctuation (dots and the check-digit dash) and
/// surrounding whitespace. The result is the record store key; an empty
/// result means no lookup is possible.
pub fn normalize_id(raw: &str) -> String {
    raw.replace(['.', '-'], "").trim().to_string()
}

/// Display names compare case-insensitively after a single trim. Unicode
/// simple case folding via `to_lowercase`; diacritics must match exactly.
fn names_match(typed: &str, stored: &str) -> bool {
    typed.to_lowercase() == stored.to_lowercase()
}

pub struct AuthEngine {
    store: Arc<dyn RecordStore>,
}

impl AuthEngine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    async fn lookup(&self, id: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let path = child_path(USERS_COLLECTION, id);
        match self.store.get(&path).await? {
            Some(value) => Ok(Some(CredentialRecord::from_value(&path, &value)?)),
            None => Ok(None),
        }
    }

    /// Decide an entry attempt from raw kiosk form input.
    pub async fn authorize_entry(
        &self,
        raw_name: &str,
        raw_id: &str,
        raw_pin: &str,
    ) -> Result<Decision, StoreError> {
        let id = normalize_id(raw_id);
        let pin = raw_pin.trim();
        let name = raw_name.trim();

        if id.is_empty() || pin.is_empty() {
            return Ok(Decision::Denied(DenyReason::EmptyInput));
        }

        match self.lookup(&id).await? {
            None => Ok(Decision::Denied(DenyReason::UserNotFound)),
            Some(record) => {
                if record.pin == pin && names_match(name, &record.display_name) {
                    Ok(Decision::Granted(record))
                } else {
                    Ok(Decision::Denied(DenyReason::BadCredentials))
                }
            }
        }
    }

    /// Decide an admin escalation attempt. Identifier + PIN + Teacher role;
    /// the typed name plays no part.
    pub async fn authorize_admin(
        &self,
        raw_id: &str,
        raw_pin: &str,
    ) -> Result<Decision, StoreError> {
        let id = normalize_id(raw_id);
        let pin = raw_pin.trim();

        if id.is_empty() || pin.is_empty() {
            return Ok(Decision::Denied(DenyReason::EmptyInput));
        }

        match self.lookup(&id).await? {
            None => Ok(Decision::Denied(DenyReason::UserNotFound)),
            Some(record) => {
                if record.pin == pin && record.role == Role::Teacher {
                    Ok(Decision::Granted(record))
                } else {
                    Ok(Decision::Denied(DenyReason::BadCredentials))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Role};

    async fn seeded_engine() -> (Arc<MemoryStore>, AuthEngine) {
        let store = Arc::new(MemoryStore::new());
        let juan = CredentialRecord::new("Juan Soto", "9999", Role::Student);
        let ana = CredentialRecord::new("Ana Pérez", "1234", Role::Teacher);
        store
            .put("usuarios_autorizados/111111111", &juan.to_value())
            .await
            .unwrap();
        store
            .put("usuarios_autorizados/123456789", &ana.to_value())
            .await
            .unwrap();
        let engine = AuthEngine::new(store.clone() as Arc<dyn RecordStore>);
        (store, engine)
    }

    #[test]
    fn normalize_strips_punctuation_and_trims() {
        assert_eq!(normalize_id(" 11.111.111-1 "), "111111111");
        assert_eq!(normalize_id("12.345.678-9"), "123456789");
        assert_eq!(normalize_id(".-."), "");
        assert_eq!(normalize_id("  "), "");
    }

    #[tokio::test]
    async fn empty_id_or_pin_denies_without_lookup() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true); // any lookup would error
        let engine = AuthEngine::new(store as Arc<dyn RecordStore>);

        let decision = engine.authorize_entry("Juan Soto", "...", "9999").await.unwrap();
        assert_eq!(decision, Decision::Denied(DenyReason::EmptyInput));

        let decision = engine.authorize_entry("Juan Soto", "111", "  ").await.unwrap();
        assert_eq!(decision, Decision::Denied(DenyReason::EmptyInput));
    }

    #[tokio::test]
    async fn unknown_identifier_is_user_not_found() {
        let (_store, engine) = seeded_engine().await;
        let decision = engine
            .authorize_entry("Nadie", "999999999", "0000")
            .await
            .unwrap();
        assert_eq!(decision, Decision::Denied(DenyReason::UserNotFound));
    }

    #[tokio::test]
    async fn entry_grants_on_case_insensitive_name() {
        let (_store, engine) = seeded_engine().await;
        let decision = engine
            .authorize_entry("JUAN SOTO", "11.111.111-1", "9999")
            .await
            .unwrap();
        match decision {
            Decision::Granted(record) => assert_eq!(record.display_name, "Juan Soto"),
            other => panic!("expected grant, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_pin_is_bad_credentials() {
        let (_store, engine) = seeded_engine().await;
        let decision = engine
            .authorize_entry("Juan Soto", "111111111", "0000")
            .await
            .unwrap();
        assert_eq!(decision, Decision::Denied(DenyReason::BadCredentials));
    }

    #[tokio::test]
    async fn wrong_name_is_bad_credentials() {
        let (_store, engine) = seeded_engine().await;
        let decision = engine
            .authorize_entry("Pedro Soto", "111111111", "9999")
            .await
            .unwrap();
        assert_eq!(decision, Decision::Denied(DenyReason::BadCredentials));
    }

    #[tokio::test]
    async fn admin_ignores_typed_name_entirely() {
        let (_store, engine) = seeded_engine().await;
        // Ana is a Teacher; no name is even passed to the admin gate.
        let decision = engine.authorize_admin("12.345.678-9", "1234").await.unwrap();
        match decision {
            Decision::Granted(record) => {
                assert_eq!(record.display_name, "Ana Pérez");
                assert_eq!(record.role, Role::Teacher);
            }
            other => panic!("expected grant, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn student_cannot_escalate_even_with_right_pin() {
        let (_store, engine) = seeded_engine().await;
        let decision = engine.authorize_admin("111111111", "9999").await.unwrap();
        assert_eq!(decision, Decision::Denied(DenyReason::BadCredentials));
    }

    #[tokio::test]
    async fn store_outage_propagates_for_fail_closed_handling() {
        let (store, engine) = seeded_engine().await;
        store.set_offline(true);
        let result = engine.authorize_entry("Juan Soto", "111111111", "9999").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn malformed_record_is_an_error_not_a_grant() {
        let (store, engine) = seeded_engine().await;
        store
            .put(
                "usuarios_autorizados/555",
                &serde_json::json!({"nombre": "Sin Pin"}),
            )
            .await
            .unwrap();
        let result = engine.authorize_entry("Sin Pin", "555", "1").await;
        assert!(matches!(result, Err(StoreError::MalformedRecord { .. })));
    }
}
