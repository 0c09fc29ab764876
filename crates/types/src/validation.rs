//! Input validation for the write path.
//!
//! Malformed drafts are rejected here, before any storage access. Validation
//! is shape-level only: action strings are never checked against the advisory
//! table, and actor identity is trusted as given (authorization is the
//! enclosing system's concern).

use std::fmt;

use crate::config::EngineConfig;
use crate::events::EventDraft;

/// Maximum accepted action string length in UTF-8 bytes.
pub const MAX_ACTION_BYTES: usize = 256;

/// Validation error with structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the violated constraint.
    pub constraint: String,
}

impl ValidationError {
    fn new(field: &str, constraint: impl Into<String>) -> Self {
        Self { field: field.to_string(), constraint: constraint.into() }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

impl std::error::Error for ValidationError {}

/// Validates a draft against shape constraints and configured bounds.
///
/// Checks:
/// - `action` is non-empty and at most [`MAX_ACTION_BYTES`] bytes
/// - `actor.id` is non-empty
/// - `idempotency_key`, when present, is non-empty
/// - `version`, when present, is at least 1
/// - `metadata` has at most `config.max_metadata_entries` entries
///
/// # Errors
///
/// Returns [`ValidationError`] naming the offending field and constraint.
pub fn validate_draft(draft: &EventDraft, config: &EngineConfig) -> Result<(), ValidationError> {
    if draft.action.is_empty() {
        return Err(ValidationError::new("action", "must not be empty"));
    }
    if draft.action.len() > MAX_ACTION_BYTES {
        return Err(ValidationError::new(
            "action",
            format!("must be at most {MAX_ACTION_BYTES} bytes, got {}", draft.action.len()),
        ));
    }
    if draft.actor.id.is_empty() {
        return Err(ValidationError::new("actor.id", "must not be empty"));
    }
    if let Some(key) = &draft.idempotency_key {
        if key.is_empty() {
            return Err(ValidationError::new(
                "idempotency_key",
                "must not be empty when present",
            ));
        }
    }
    if let Some(version) = draft.version {
        if version == 0 {
            return Err(ValidationError::new("version", "must be at least 1"));
        }
    }
    if draft.metadata.len() > config.max_metadata_entries {
        return Err(ValidationError::new(
            "metadata",
            format!(
                "must have at most {} entries, got {}",
                config.max_metadata_entries,
                draft.metadata.len()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::events::{Actor, ActorKind};

    fn draft(action: &str) -> EventDraft {
        EventDraft::builder().action(action).actor(Actor::new(ActorKind::User, "u1")).build()
    }

    #[test]
    fn valid_draft_passes() {
        validate_draft(&draft("user.signed_in"), &EngineConfig::default()).expect("valid");
    }

    #[test]
    fn empty_action_rejected() {
        let err = validate_draft(&draft(""), &EngineConfig::default()).expect_err("invalid");
        assert_eq!(err.field, "action");
    }

    #[test]
    fn oversized_action_rejected() {
        let long = "a".repeat(MAX_ACTION_BYTES + 1);
        let err = validate_draft(&draft(&long), &EngineConfig::default()).expect_err("invalid");
        assert_eq!(err.field, "action");
    }

    #[test]
    fn empty_actor_id_rejected() {
        let mut d = draft("user.signed_in");
        d.actor.id.clear();
        let err = validate_draft(&d, &EngineConfig::default()).expect_err("invalid");
        assert_eq!(err.field, "actor.id");
    }

    #[test]
    fn empty_idempotency_key_rejected() {
        let mut d = draft("user.signed_in");
        d.idempotency_key = Some(String::new());
        let err = validate_draft(&d, &EngineConfig::default()).expect_err("invalid");
        assert_eq!(err.field, "idempotency_key");
    }

    #[test]
    fn zero_version_rejected() {
        let mut d = draft("user.signed_in");
        d.version = Some(0);
        let err = validate_draft(&d, &EngineConfig::default()).expect_err("invalid");
        assert_eq!(err.field, "version");
    }

    #[test]
    fn metadata_entry_bound_enforced() {
        let config = EngineConfig::builder().max_metadata_entries(2).build().expect("config");
        let mut metadata = BTreeMap::new();
        for i in 0..3 {
            metadata.insert(format!("k{i}"), "v".to_string());
        }
        let mut d = draft("user.signed_in");
        d.metadata = metadata;
        let err = validate_draft(&d, &config).expect_err("invalid");
        assert_eq!(err.field, "metadata");
    }

    #[test]
    fn custom_action_strings_stay_legal() {
        // The advisory table is not enforced at write time
        validate_draft(&draft("totally.custom.verb"), &EngineConfig::default()).expect("valid");
    }
}
