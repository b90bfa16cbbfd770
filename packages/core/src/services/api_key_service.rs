//! API key records: per-user third-party credentials sealed by the vault
//!
//! Plaintext keys only exist transiently: on the way into [`CredentialVault::encrypt`]
//! and on the way out of [`ApiKeyService::decrypted_key`]. They are never
//! logged and never part of a returned [`ApiKey`].

use crate::db::ApiKeyStore;
use crate::models::{require_non_empty, ApiKey, ApiKeyCreateRequest, ApiKeyUpdateRequest};
use crate::services::error::ServiceError;
use crate::vault::CredentialVault;
use std::sync::Arc;

/// Service name used for LLM credentials
pub const OPENAI_SERVICE: &str = "openai";

#[derive(Clone)]
pub struct ApiKeyService {
    store: Arc<dyn ApiKeyStore>,
    vault: Arc<CredentialVault>,
}

impl ApiKeyService {
    pub fn new(store: Arc<dyn ApiKeyStore>, vault: Arc<CredentialVault>) -> Self {
        Self { store, vault }
    }

    async fn owned_key(&self, caller: &str, id: &str) -> Result<ApiKey, ServiceError> {
        let key = self
            .store
            .get_api_key(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("api key", id))?;

        if key.user_id != caller {
            return Err(ServiceError::unauthorized(format!(
                "user {} does not own api key {}",
                caller, id
            )));
        }
        Ok(key)
    }

    /// Store a key for (owner, service)
    ///
    /// An existing record for the same service is overwritten and reactivated.
    pub async fn create(
        &self,
        owner: &str,
        request: ApiKeyCreateRequest,
    ) -> Result<ApiKey, ServiceError> {
        require_non_empty(owner, "user_id")?;
        require_non_empty(&request.service, "service")?;
        require_non_empty(&request.key, "key")?;

        let sealed = self.vault.encrypt(&request.key)?;
        let record = self
            .store
            .upsert_api_key(owner, &request.service, &sealed)
            .await?;

        tracing::info!(
            "Stored {} API key {} for user {}",
            record.service,
            record.id,
            owner
        );
        Ok(record)
    }

    /// Newest first; never includes key material
    pub async fn list(&self, owner: &str) -> Result<Vec<ApiKey>, ServiceError> {
        Ok(self.store.list_api_keys(owner).await?)
    }

    pub async fn get(&self, caller: &str, id: &str) -> Result<ApiKey, ServiceError> {
        self.owned_key(caller, id).await
    }

    pub async fn get_by_service(
        &self,
        owner: &str,
        service: &str,
    ) -> Result<Option<ApiKey>, ServiceError> {
        Ok(self.store.get_api_key_by_service(owner, service).await?)
    }

    /// Owner-only update
    ///
    /// A non-empty `key` is re-encrypted and replaces the stored material;
    /// `is_active` is always applied.
    pub async fn update(
        &self,
        caller: &str,
        id: &str,
        request: ApiKeyUpdateRequest,
    ) -> Result<ApiKey, ServiceError> {
        self.owned_key(caller, id).await?;

        let sealed = match request.key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => Some(self.vault.encrypt(key)?),
            None => None,
        };

        self.store
            .update_api_key(id, sealed.as_deref(), request.is_active)
            .await?
            .ok_or_else(|| ServiceError::not_found("api key", id))
    }

    pub async fn delete(&self, caller: &str, id: &str) -> Result<(), ServiceError> {
        self.owned_key(caller, id).await?;

        if !self.store.delete_api_key(id).await? {
            return Err(ServiceError::not_found("api key", id));
        }
        Ok(())
    }

    /// Plaintext key for (owner, service)
    ///
    /// `None` when no record exists or the record is inactive.
    ///
    /// # Errors
    ///
    /// `Decryption` when the stored material is corrupt or was sealed under
    /// another secret.
    pub async fn decrypted_key(
        &self,
        owner: &str,
        service: &str,
    ) -> Result<Option<String>, ServiceError> {
        match self.store.get_encrypted_key(owner, service).await? {
            Some((sealed, true)) => Ok(Some(self.vault.decrypt(&sealed)?)),
            Some((_, false)) | None => Ok(None),
        }
    }
}
