//! IdeaGraph Core Business Logic Layer
//!
//! This crate turns a topic into a laid-out graph of ideas inside a
//! user-owned mind map.
//!
//! # Architecture
//!
//! - **libsql/Turso**: Embedded SQLite-compatible store for maps, nodes, edges and API keys
//! - **Credential Vault**: AES-256-GCM sealing of third-party API keys at rest
//! - **Idea Pipeline**: Prompt → LLM → tolerant normalization → layout → nodes and edges
//!
//! # Modules
//!
//! - [`models`] - Data structures (MindMap, Node, Edge, ApiKey, Idea)
//! - [`services`] - Business services (GraphService, ApiKeyService, IdeaPipeline)
//! - [`db`] - Database layer with libsql integration
//! - [`vault`] - Symmetric encryption of stored credentials
//! - [`config`] - Environment-driven configuration

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod vault;

// Re-export commonly used types
pub use config::{AppConfig, ConfigError, PipelineConfig, VaultConfig};
pub use models::*;
pub use services::*;
pub use vault::{CredentialVault, KeyDerivation, VaultError};
