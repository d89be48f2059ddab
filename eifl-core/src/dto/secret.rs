//! Secret administration DTOs
//!
//! Secret values travel inbound only; listings expose names and timestamps,
//! never plaintext or ciphertext.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::secret::Secret;

/// Request to store a secret at a scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSecret {
    pub name: String,
    pub value: String,
}

/// Secret listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretInfo {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Secret> for SecretInfo {
    fn from(secret: Secret) -> Self {
        Self {
            name: secret.name,
            created_at: secret.created_at,
            updated_at: secret.updated_at,
        }
    }
}
