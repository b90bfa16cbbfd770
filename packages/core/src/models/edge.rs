//! Edge Data Structures
//!
//! Edges are directed and typed. At most one edge may exist per ordered
//! (source, target) pair within a mind map; deleting either endpoint or the
//! owning mind map removes the edge.

use super::json_or_empty_object;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Edge type used when the caller does not provide one
pub const DEFAULT_EDGE_TYPE: &str = "default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub mind_map_id: String,
    pub source_id: String,
    pub target_id: String,
    pub edge_type: String,
    pub style_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Edge {
    /// Create a new edge with an auto-generated UUID and `{}` style
    pub fn new(
        mind_map_id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            mind_map_id: mind_map_id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            edge_type: DEFAULT_EDGE_TYPE.to_string(),
            style_data: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    /// Set the type tag; an empty string keeps the default
    pub fn with_edge_type(mut self, edge_type: impl Into<String>) -> Self {
        let edge_type = edge_type.into();
        if !edge_type.is_empty() {
            self.edge_type = edge_type;
        }
        self
    }

    pub fn with_style(mut self, style_data: Option<serde_json::Value>) -> Self {
        self.style_data = json_or_empty_object(style_data);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeCreateRequest {
    pub mind_map_id: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub edge_type: String,
    #[serde(default)]
    pub style_data: Option<serde_json::Value>,
}

impl EdgeCreateRequest {
    pub fn into_edge(self) -> Edge {
        Edge::new(self.mind_map_id, self.source_id, self.target_id)
            .with_edge_type(self.edge_type)
            .with_style(self.style_data)
    }
}
