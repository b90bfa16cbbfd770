//! Data Models
//!
//! This module contains the core data structures used throughout IdeaGraph:
//!
//! - `MindMap` - User-owned container for a graph of nodes and edges
//! - `Node` - Positioned, content-bearing graph vertex
//! - `Edge` - Directed, typed connection between two nodes of one mind map
//! - `ApiKey` - Per-user third-party credential record (key material never exposed)
//! - `Idea` - Transient LLM-generated text awaiting materialization
//!
//! Style and metadata blobs are opaque JSON objects that default to `{}`.

mod api_key;
mod edge;
mod idea;
mod mind_map;
mod node;

pub use api_key::{ApiKey, ApiKeyCreateRequest, ApiKeyUpdateRequest};
pub use edge::{Edge, EdgeCreateRequest, DEFAULT_EDGE_TYPE};
pub use idea::{Idea, DEFAULT_IDEA_CONFIDENCE};
pub use mind_map::{
    MindMap, MindMapCreateRequest, MindMapDetails, MindMapStatus, MindMapUpdate,
};
pub use node::{Node, NodeCreateRequest, NodePosition, NodeUpdate, DEFAULT_NODE_TYPE};

use thiserror::Error;

/// Validation errors raised before any store or network access
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Invalid parent reference: {0}")]
    InvalidParent(String),

    #[error("Invalid edge endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ValidationError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Fail with `MissingField` when a required string is empty or whitespace.
pub(crate) fn require_non_empty(value: &str, field: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::missing(field));
    }
    Ok(())
}

/// Normalize an optional JSON blob, substituting `{}` for absent or null values.
pub(crate) fn json_or_empty_object(value: Option<serde_json::Value>) -> serde_json::Value {
    match value {
        Some(serde_json::Value::Null) | None => serde_json::json!({}),
        Some(v) => v,
    }
}
