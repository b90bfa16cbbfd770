//! Business Services
//!
//! This module contains the core business logic services:
//!
//! - `GraphService` - Mind map, node and edge CRUD with ownership rules
//! - `ApiKeyService` - Per-user credentials sealed by the vault
//! - `IdeaPipeline` - LLM idea generation and materialization into nodes
//! - `ResponseNormalizer` - Tolerant parsing of free-form LLM output
//! - `LayoutEngine` - Placement of generated nodes around an anchor
//!
//! Services coordinate between the database layer and application logic,
//! implementing business rules and orchestrating multi-step operations.

pub mod api_key_service;
pub mod error;
pub mod graph_service;
pub mod idea_pipeline;
pub mod layout;
pub mod llm;
pub mod normalizer;
pub mod prompt;

pub use api_key_service::{ApiKeyService, OPENAI_SERVICE};
pub use error::ServiceError;
pub use graph_service::GraphService;
pub use idea_pipeline::{
    clamp_count, GenerateRequest, IdeaPipeline, KeySource, MaterializeRequest, Materialized,
    DEFAULT_IDEA_COUNT, IDEA_TYPE, MAX_IDEA_COUNT,
};
pub use layout::{LayoutEngine, LayoutStrategy, Position};
pub use llm::{CompletionRequest, LlmClient, LlmError, OpenAiClient};
pub use normalizer::{FieldExtractor, Normalization, ParseStrategy, ResponseNormalizer};
pub use prompt::GenerationType;
