//! Runtime configuration
//!
//! Plain structs with defaults, assembled from environment variables at
//! startup and passed explicitly to the services that need them. Nothing
//! here is global.
//!
//! | Variable                 | Meaning                                        |
//! |--------------------------|------------------------------------------------|
//! | `IDEAGRAPH_DB_PATH`      | libsql database file (`./data/ideagraph.db`)   |
//! | `API_KEY_ENCRYPTION_KEY` | vault secret (required)                        |
//! | `API_KEY_KDF`            | `zeropad` (default) or `argon2id`              |
//! | `API_KEY_KDF_SALT`       | Argon2id salt, at least 8 bytes                |
//! | `OPENAI_API_KEY`         | fallback LLM credential                        |
//! | `OPENAI_BASE_URL`        | chat completions base URL                      |
//! | `OPENAI_MODEL`           | model identifier                               |
//! | `LLM_TIMEOUT_SECS`       | outbound request timeout                       |

use crate::vault::{KeyDerivation, MIN_SALT_LEN};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DATABASE_PATH: &str = "./data/ideagraph.db";
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 500;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a creative brainstorming assistant. \
Generate concise, innovative ideas for the given topic. \
Each idea should be clear, actionable, and directly relevant to the topic. \
Format your response as a JSON array of ideas.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            reason: reason.into(),
        }
    }
}

/// Vault secret and key-derivation mode
#[derive(Clone, Default, PartialEq)]
pub struct VaultConfig {
    pub secret: String,
    pub key_derivation: KeyDerivation,
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("secret", &"[REDACTED]")
            .field("key_derivation", &self.key_derivation)
            .finish()
    }
}

impl VaultConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::Missing("API_KEY_ENCRYPTION_KEY"));
        }
        if let KeyDerivation::Argon2id { salt } = &self.key_derivation {
            if salt.len() < MIN_SALT_LEN {
                return Err(ConfigError::invalid(
                    "API_KEY_KDF_SALT",
                    format!("must be at least {} bytes", MIN_SALT_LEN),
                ));
            }
        }
        Ok(())
    }
}

/// Outbound LLM settings for idea generation
#[derive(Clone, PartialEq)]
pub struct PipelineConfig {
    /// Base URL; requests go to `{api_base_url}/chat/completions`
    pub api_base_url: String,
    pub model: String,

    /// Process-wide fallback credential (lowest priority in key resolution)
    pub default_api_key: Option<String>,

    pub request_timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            default_api_key: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field(
                "default_api_key",
                &self.default_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ConfigError::invalid(
                "OPENAI_BASE_URL",
                "must start with http:// or https://",
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::invalid("OPENAI_MODEL", "must not be empty"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid("LLM_TIMEOUT_SECS", "must be positive"));
        }
        Ok(())
    }
}

/// Everything a process needs to run the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub vault: VaultConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_path = get("IDEAGRAPH_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

        let key_derivation = match get("API_KEY_KDF").as_deref().map(str::to_ascii_lowercase) {
            None => KeyDerivation::ZeroPad,
            Some(mode) if mode == "zeropad" => KeyDerivation::ZeroPad,
            Some(mode) if mode == "argon2id" => KeyDerivation::Argon2id {
                salt: get("API_KEY_KDF_SALT").ok_or(ConfigError::Missing("API_KEY_KDF_SALT"))?,
            },
            Some(other) => {
                return Err(ConfigError::invalid(
                    "API_KEY_KDF",
                    format!("unknown mode '{}' (expected zeropad or argon2id)", other),
                ))
            }
        };

        let vault = VaultConfig {
            secret: lookup("API_KEY_ENCRYPTION_KEY").unwrap_or_default(),
            key_derivation,
        };

        let mut pipeline = PipelineConfig {
            default_api_key: get("OPENAI_API_KEY"),
            ..Default::default()
        };
        if let Some(url) = get("OPENAI_BASE_URL") {
            pipeline.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("OPENAI_MODEL") {
            pipeline.model = model;
        }
        if let Some(raw) = get("LLM_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("LLM_TIMEOUT_SECS", "expected whole seconds"))?;
            pipeline.request_timeout = Duration::from_secs(secs);
        }

        let config = Self {
            database_path,
            vault,
            pipeline,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.vault.validate()?;
        self.pipeline.validate()
    }
}
