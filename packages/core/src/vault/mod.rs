//! Credential Vault
//!
//! Symmetric encryption of per-user third-party API keys with AES-256-GCM.
//!
//! # Stored Format
//!
//! `base64(nonce[12] || ciphertext || tag[16])` using the standard alphabet
//! with padding. A fresh random nonce is drawn for every encryption.
//!
//! # Key Derivation
//!
//! - [`KeyDerivation::ZeroPad`]: the configured secret's bytes are zero-padded
//!   (or truncated) to 32 bytes. Compatible with existing stored credentials,
//!   but not a real KDF.
//! - [`KeyDerivation::Argon2id`]: the key is derived with Argon2id (default
//!   parameters) from the secret and a configured salt.
//!
//! The two modes produce different keys. Stored credentials are never
//! re-encrypted automatically when the mode changes, and there is no key
//! rotation: changing the secret invalidates every stored credential.
//!
//! # Examples
//!
//! ```rust
//! use ideagraph_core::vault::{CredentialVault, KeyDerivation};
//!
//! let vault = CredentialVault::new("server-secret", &KeyDerivation::ZeroPad)?;
//! let sealed = vault.encrypt("sk-live-123")?;
//! assert_eq!(vault.decrypt(&sealed)?, "sk-live-123");
//! # Ok::<(), ideagraph_core::vault::VaultError>(())
//! ```

mod error;

pub use error::VaultError;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;

/// GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// Smallest salt accepted by [`KeyDerivation::Argon2id`]
pub const MIN_SALT_LEN: usize = 8;

/// How the 32-byte cipher key is obtained from the configured secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum KeyDerivation {
    /// Zero-pad or truncate the secret to 32 bytes
    #[default]
    ZeroPad,

    /// Argon2id with default parameters
    Argon2id { salt: String },
}

impl KeyDerivation {
    /// Derive the cipher key from `secret`
    ///
    /// The returned buffer is wiped on drop.
    pub fn derive(&self, secret: &str) -> Result<Zeroizing<[u8; KEY_LEN]>, VaultError> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);

        match self {
            KeyDerivation::ZeroPad => {
                let bytes = secret.as_bytes();
                let len = bytes.len().min(KEY_LEN);
                key[..len].copy_from_slice(&bytes[..len]);
            }
            KeyDerivation::Argon2id { salt } => {
                if salt.len() < MIN_SALT_LEN {
                    return Err(VaultError::key_derivation(format!(
                        "salt must be at least {} bytes",
                        MIN_SALT_LEN
                    )));
                }
                argon2::Argon2::default()
                    .hash_password_into(secret.as_bytes(), salt.as_bytes(), &mut key[..])
                    .map_err(|e| VaultError::key_derivation(e.to_string()))?;
            }
        }

        Ok(key)
    }
}

/// Encrypts and decrypts stored API keys
#[derive(Clone)]
pub struct CredentialVault {
    cipher: Aes256Gcm,
}

impl fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVault")
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

impl CredentialVault {
    /// Build a vault from the configured secret
    ///
    /// # Errors
    ///
    /// `KeyDerivation` if Argon2id rejects its inputs.
    pub fn new(secret: &str, derivation: &KeyDerivation) -> Result<Self, VaultError> {
        let key = derivation.derive(secret)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
        Ok(Self { cipher })
    }

    /// Seal `plaintext`, returning the base64 storage form
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| VaultError::Encryption)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(nonce.as_slice());
        sealed.extend_from_slice(&ciphertext);

        Ok(general_purpose::STANDARD.encode(sealed))
    }

    /// Open a value produced by [`encrypt`](Self::encrypt)
    ///
    /// # Errors
    ///
    /// - `InvalidEncoding` if the value is not base64
    /// - `CiphertextTooShort` if it cannot contain a nonce
    /// - `AuthenticationFailed` on a wrong key or any tampering
    /// - `InvalidUtf8` if the plaintext is not text
    pub fn decrypt(&self, encoded: &str) -> Result<String, VaultError> {
        let sealed = general_purpose::STANDARD.decode(encoded)?;

        if sealed.len() < NONCE_LEN {
            return Err(VaultError::CiphertextTooShort {
                len: sealed.len(),
                min: NONCE_LEN,
            });
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| VaultError::AuthenticationFailed)?;

        Ok(String::from_utf8(plaintext)?)
    }
}
