//! Secret domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scope a secret is attached to
///
/// Repo-scoped secrets override project-scoped secrets of the same name
/// when the dispatcher materializes a job payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretScope {
    Project,
    Repo,
}

impl SecretScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretScope::Project => "project",
            SecretScope::Repo => "repo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "project" => Some(SecretScope::Project),
            "repo" => Some(SecretScope::Repo),
            _ => None,
        }
    }
}

/// An encrypted secret value
///
/// `encrypted_value` and `iv` are base64; the plaintext only exists in
/// memory during dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub id: Uuid,
    pub scope: SecretScope,
    pub scope_id: Uuid,
    pub name: String,
    #[serde(skip_serializing)]
    pub encrypted_value: String,
    #[serde(skip_serializing)]
    pub iv: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validate a secret name: `^[A-Z][A-Z0-9_]*$`
pub fn is_valid_secret_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_name_validation() {
        assert!(is_valid_secret_name("API_KEY"));
        assert!(is_valid_secret_name("TOKEN2"));
        assert!(is_valid_secret_name("A"));
        assert!(!is_valid_secret_name(""));
        assert!(!is_valid_secret_name("api_key"));
        assert!(!is_valid_secret_name("2TOKEN"));
        assert!(!is_valid_secret_name("_KEY"));
        assert!(!is_valid_secret_name("API-KEY"));
        assert!(!is_valid_secret_name("API KEY"));
    }
}
