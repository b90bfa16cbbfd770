//! Third-party API key records
//!
//! The encrypted key material lives only in the store and the vault; the
//! `ApiKey` model handed to callers never carries it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored API key metadata (at most one per (user, service) pair)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: String,
    pub user_id: String,

    /// Service name, e.g. "openai"
    pub service: String,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyCreateRequest {
    pub service: String,
    pub key: String,
}

/// Update for an existing key record
///
/// `key: None` (or empty) keeps the current material; `is_active` is always applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyUpdateRequest {
    #[serde(default)]
    pub key: Option<String>,
    pub is_active: bool,
}
