//! API key model for authentication.
//!
//! API clients (internal tools, the compliance portal, partner integrations)
//! authenticate with a bearer key. Keys are stored as SHA-256 hashes.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Represents a row of the `api_keys` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,

    /// SHA-256 hash of the actual API key (64 hex characters)
    pub key_hash: String,

    /// Name of the client holding this key; recorded as note author and
    /// document creator
    pub client_name: String,

    pub created_at: DateTime<Utc>,

    /// Inactive keys are rejected during authentication
    pub is_active: bool,
}

/// Hex-encoded SHA-256 of a raw API key.
pub fn hash_api_key(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}
