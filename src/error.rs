//! Error taxonomy for the access-control core.
//!
//! Three families, kept deliberately separate:
//! - [`DenyReason`]: credential-check outcomes. Not errors in the Rust
//!   sense (a wrong PIN is a normal result), but each maps to a stable
//!   message key the presentation layer can localize or assert against.
//! - [`ValidationError`]: form-level rejections detected before any store
//!   call is issued.
//! - [`StoreError`]: transport and decoding failures from the record store.
//!   On the authorization path these fail closed (the door never unlocks on
//!   ambiguous store state); on the audit path they are warn-logged only.

use thiserror::Error;

/// Why an entry or admin authorization attempt was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Normalized identifier or PIN was empty; no store lookup performed.
    EmptyInput,
    /// No credential record exists under the normalized identifier.
    UserNotFound,
    /// A record exists but the PIN or display name did not match.
    BadCredentials,
}

impl DenyReason {
    /// Stable message key for localization and test assertions.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::EmptyInput => "auth.empty_input",
            Self::UserNotFound => "auth.user_not_found",
            Self::BadCredentials => "auth.bad_credentials",
        }
    }
}

/// Form validation failures, reported synchronously before any store write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// One or more required fields were empty after normalization.
    #[error("incomplete form: name, identifier and PIN are all required")]
    IncompleteForm,
}

impl ValidationError {
    /// Stable message key for localization and test assertions.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::IncompleteForm => "directory.incomplete_form",
        }
    }
}

/// Failures raised by the record store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or answered with a non-success status.
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    /// A record came back without the shape the core requires.
    #[error("malformed record at '{path}': {detail}")]
    MalformedRecord { path: String, detail: String },
}

impl StoreError {
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::Unavailable(detail.into())
    }

    pub fn malformed(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedRecord {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

/// Errors from user directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_reason_keys_are_stable() {
        assert_eq!(DenyReason::EmptyInput.message_key(), "auth.empty_input");
        assert_eq!(DenyReason::UserNotFound.message_key(), "auth.user_not_found");
        assert_eq!(
            DenyReason::BadCredentials.message_key(),
            "auth.bad_credentials"
        );
    }

    #[test]
    fn validation_key_is_stable() {
        assert_eq!(
            ValidationError::IncompleteForm.message_key(),
            "directory.incomplete_form"
        );
    }

    #[test]
    fn store_error_display_includes_path() {
        let err = StoreError::malformed("usuarios_autorizados/123", "missing field `pin`");
        assert!(err.to_string().contains("usuarios_autorizados/123"));
        assert!(err.to_string().contains("missing field `pin`"));
    }

    #[test]
    fn directory_error_wraps_validation() {
        let err = DirectoryError::from(ValidationError::IncompleteForm);
        assert!(matches!(
            err,
            DirectoryError::Validation(ValidationError::IncompleteForm)
        ));
    }
}
