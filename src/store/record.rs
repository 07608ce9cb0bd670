//! Typed records at the store boundary.
//!
//! The hosted store is schemaless: records arrive as free-form JSON. This
//! module is the single place where that JSON is checked against the shapes
//! the core requires. A missing or mistyped field becomes
//! [`StoreError::MalformedRecord`], never a panic or a silently stringified
//! blank.
//!
//! Wire field names (`nombre`, `pin`, `rol`, `rut`, `fecha_hora`) are fixed
//! by the deployed database and must not change.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// Role tag carried by every credential record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Estudiante")]
    Student,
    #[serde(rename = "Docente")]
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "Estudiante",
            Self::Teacher => "Docente",
        }
    }
}

/// An authorized person, keyed in the store by normalized identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Free-text display name, compared case-insensitively during entry.
    #[serde(rename = "nombre")]
    pub display_name: String,
    /// Digit string compared by exact equality.
    pub pin: String,
    #[serde(rename = "rol")]
    pub role: Role,
}

impl CredentialRecord {
    pub fn new(display_name: impl Into<String>, pin: impl Into<String>, role: Role) -> Self {
        Self {
            display_name: display_name.into(),
            pin: pin.into(),
            role,
        }
    }

    /// Decode a raw store value, reporting the offending path on failure.
    pub fn from_value(path: &str, value: &Value) -> Result<Self, StoreError> {
        serde_json::from_value(value.clone())
            .map_err(|e| StoreError::malformed(path, e.to_string()))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("credential record serializes to plain JSON")
    }
}

/// One granted access, append-only and immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Resolved display name from the matched record, not the typed input.
    #[serde(rename = "nombre")]
    pub name: String,
    /// Normalized identifier used for the successful match.
    #[serde(rename = "rut")]
    pub identifier: String,
    /// Grant time, `%Y-%m-%d %H:%M` in the local clock.
    #[serde(rename = "fecha_hora")]
    pub timestamp: String,
}

impl AuditEntry {
    /// Decode a raw store value, reporting the offending path on failure.
    pub fn from_value(path: &str, value: &Value) -> Result<Self, StoreError> {
        serde_json::from_value(value.clone())
            .map_err(|e| StoreError::malformed(path, e.to_string()))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("audit entry serializes to plain JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credential_decodes_wire_names() {
        let value = json!({"nombre": "Juan Soto", "pin": "9999", "rol": "Estudiante"});
        let record = CredentialRecord::from_value("usuarios_autorizados/111111111", &value).unwrap();
        assert_eq!(record.display_name, "Juan Soto");
        assert_eq!(record.pin, "9999");
        assert_eq!(record.role, Role::Student);
    }

    #[test]
    fn credential_round_trips() {
        let record = CredentialRecord::new("Ana Pérez", "1234", Role::Teacher);
        let value = record.to_value();
        assert_eq!(value["nombre"], "Ana Pérez");
        assert_eq!(value["rol"], "Docente");
        let back = CredentialRecord::from_value("x", &value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn missing_pin_is_malformed_not_a_crash() {
        let value = json!({"nombre": "Juan Soto", "rol": "Estudiante"});
        let err = CredentialRecord::from_value("usuarios_autorizados/1", &value).unwrap_err();
        match err {
            StoreError::MalformedRecord { path, detail } => {
                assert_eq!(path, "usuarios_autorizados/1");
                assert!(detail.contains("pin"));
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn unknown_role_is_malformed() {
        let value = json!({"nombre": "X", "pin": "1", "rol": "Director"});
        assert!(matches!(
            CredentialRecord::from_value("usuarios_autorizados/1", &value),
            Err(StoreError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn audit_entry_decodes_wire_names() {
        let value = json!({"nombre": "Juan Soto", "rut": "111111111", "fecha_hora": "2026-08-07 14:05"});
        let entry = AuditEntry::from_value("registro_ingresos/k1", &value).unwrap();
        assert_eq!(entry.name, "Juan Soto");
        assert_eq!(entry.identifier, "111111111");
        assert_eq!(entry.timestamp, "2026-08-07 14:05");
    }
}
