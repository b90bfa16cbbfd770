//! Vault error types

use thiserror::Error;

/// Failures raised while deriving keys, sealing or opening API key material
#[derive(Error, Debug)]
pub enum VaultError {
    /// Stored value is not valid base64
    #[error("Stored credential is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    /// Decoded value cannot even hold a nonce
    #[error("Stored credential too short: {len} bytes, need at least {min}")]
    CiphertextTooShort { len: usize, min: usize },

    /// GCM tag verification failed (wrong key or tampered data)
    #[error("Credential authentication failed")]
    AuthenticationFailed,

    /// Decrypted bytes are not UTF-8
    #[error("Decrypted credential is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed")]
    Encryption,
}

impl VaultError {
    pub fn key_derivation(msg: impl Into<String>) -> Self {
        Self::KeyDerivation(msg.into())
    }

    /// True for failures caused by the stored value rather than by configuration
    pub fn is_corrupt_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidEncoding(_)
                | Self::CiphertextTooShort { .. }
                | Self::AuthenticationFailed
                | Self::InvalidUtf8(_)
        )
    }
}
