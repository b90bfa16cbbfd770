//! Service Layer Error Types
//!
//! One error type for every service operation. Variants map onto the
//! caller-facing classes: validation, authorization, missing entities,
//! credentials, upstream LLM failures, decryption and persistence.

use crate::db::DatabaseError;
use crate::models::ValidationError;
use crate::services::llm::LlmError;
use crate::vault::VaultError;
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Request rejected before any store or network access
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Caller is not the owner (or lacks read access)
    #[error("Unauthorized: {context}")]
    Unauthorized { context: String },

    /// Entity absent or already soft-deleted
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// No explicit, stored or default API key could be resolved
    #[error("No API key available for service '{service}'")]
    NoCredential { service: String },

    /// LLM transport failure, timeout or non-success response
    #[error("Upstream request failed: {context}")]
    Upstream { context: String },

    /// Stored credential is corrupt, forged or sealed with another key
    #[error("Failed to decrypt stored credential: {0}")]
    Decryption(#[source] VaultError),

    /// Underlying persistence failure (including rolled-back transactions)
    #[error("Store operation failed: {0}")]
    Store(#[source] DatabaseError),

    /// Materialization stopped partway; earlier rows were kept
    #[error(
        "Materialization stopped after {nodes_created} nodes and {edges_created} edges: {source}"
    )]
    PartialMaterialization {
        nodes_created: usize,
        edges_created: usize,
        #[source]
        source: DatabaseError,
    },

    /// Encryption failure or invalid vault configuration
    #[error("Vault error: {0}")]
    Vault(#[source] VaultError),
}

impl ServiceError {
    pub fn unauthorized(context: impl Into<String>) -> Self {
        Self::Unauthorized {
            context: context.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn no_credential(service: impl Into<String>) -> Self {
        Self::NoCredential {
            service: service.into(),
        }
    }

    pub fn upstream(context: impl Into<String>) -> Self {
        Self::Upstream {
            context: context.into(),
        }
    }

    /// True for the persistence class, including partial materialization
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::PartialMaterialization { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::RowNotFound { entity, id } => Self::NotFound { kind: entity, id },
            other => Self::Store(other),
        }
    }
}

impl From<VaultError> for ServiceError {
    fn from(err: VaultError) -> Self {
        if err.is_corrupt_input() {
            Self::Decryption(err)
        } else {
            Self::Vault(err)
        }
    }
}

impl From<LlmError> for ServiceError {
    fn from(err: LlmError) -> Self {
        Self::upstream(err.to_string())
    }
}
