//! Node Data Structures
//!
//! A node is a positioned, content-bearing vertex of a mind map.
//!
//! # Architecture
//!
//! - **Parent link**: Optional self-reference forming a forest. Deleting a parent
//!   cascades to its children. Parent links are independent of edges.
//! - **Opaque JSON**: `style_data` and `metadata` are stored verbatim and default
//!   to `{}` when the caller supplies none.
//! - **Coalescing updates**: `NodeUpdate` treats empty strings and `0.0`
//!   positions as "no change".
//!
//! # Examples
//!
//! ```rust
//! use ideagraph_core::models::Node;
//! use serde_json::json;
//!
//! let root = Node::new("map-1", "Renewable energy", 0.0, 0.0);
//! let child = Node::new("map-1", "Solar", 200.0, 0.0)
//!     .with_parent(Some(root.id.clone()))
//!     .with_node_type("idea")
//!     .with_style(Some(json!({"color": "#ffcc00"})));
//! assert_eq!(child.metadata, json!({}));
//! ```

use super::json_or_empty_object;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Node type used when the caller does not provide one
pub const DEFAULT_NODE_TYPE: &str = "default";

/// A positioned, content-bearing graph vertex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Owning mind map
    pub mind_map_id: String,

    /// Parent node (creation context, cascades on delete)
    pub parent_id: Option<String>,

    /// Free-text content
    pub content: String,

    pub position_x: f64,
    pub position_y: f64,

    /// Type tag (e.g. "default", "idea")
    pub node_type: String,

    /// Opaque style blob
    pub style_data: serde_json::Value,

    /// Opaque metadata blob
    pub metadata: serde_json::Value,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Create a new root-level node with an auto-generated UUID
    ///
    /// Style and metadata start as `{}` and the type as [`DEFAULT_NODE_TYPE`].
    pub fn new(
        mind_map_id: impl Into<String>,
        content: impl Into<String>,
        position_x: f64,
        position_y: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            mind_map_id: mind_map_id.into(),
            parent_id: None,
            content: content.into(),
            position_x,
            position_y,
            node_type: DEFAULT_NODE_TYPE.to_string(),
            style_data: serde_json::json!({}),
            metadata: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Set the type tag; an empty string keeps the default
    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        let node_type = node_type.into();
        if !node_type.is_empty() {
            self.node_type = node_type;
        }
        self
    }

    pub fn with_style(mut self, style_data: Option<serde_json::Value>) -> Self {
        self.style_data = json_or_empty_object(style_data);
        self
    }

    pub fn with_metadata(mut self, metadata: Option<serde_json::Value>) -> Self {
        self.metadata = json_or_empty_object(metadata);
        self
    }
}

/// Request to create a node inside a mind map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeCreateRequest {
    pub mind_map_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_y: f64,
    #[serde(default)]
    pub node_type: String,
    #[serde(default)]
    pub style_data: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl NodeCreateRequest {
    /// Materialize the request into a fresh `Node` (new id, defaults applied)
    pub fn into_node(self) -> Node {
        Node::new(self.mind_map_id, self.content, self.position_x, self.position_y)
            .with_parent(self.parent_id)
            .with_node_type(self.node_type)
            .with_style(self.style_data)
            .with_metadata(self.metadata)
    }
}

/// Sparse node update (coalesce-to-existing semantics)
///
/// Every field is optional. In addition, `Some("")` for strings and
/// `Some(0.0)` for positions are treated as "no change": an update cannot
/// clear content or move a node to exactly `0.0`. Use batch position updates
/// to set exact coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl NodeUpdate {
    /// Drop the "zero-valued" entries so that only real changes remain
    pub fn normalized(self) -> Self {
        Self {
            content: self.content.filter(|c| !c.is_empty()),
            position_x: self.position_x.filter(|x| *x != 0.0),
            position_y: self.position_y.filter(|y| *y != 0.0),
            node_type: self.node_type.filter(|t| !t.is_empty()),
            style_data: self.style_data.filter(|v| !v.is_null()),
            metadata: self.metadata.filter(|v| !v.is_null()),
        }
    }

    /// True when the update would change nothing
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.position_x.is_none()
            && self.position_y.is_none()
            && self.node_type.is_none()
            && self.style_data.is_none()
            && self.metadata.is_none()
    }
}

/// One entry of an atomic batch position update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePosition {
    pub id: String,
    pub position_x: f64,
    pub position_y: f64,
}

impl NodePosition {
    pub fn new(id: impl Into<String>, position_x: f64, position_y: f64) -> Self {
        Self {
            id: id.into(),
            position_x,
            position_y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_node_defaults() {
        let node = Node::new("map-1", "content", 1.5, -2.0);
        assert_eq!(node.node_type, DEFAULT_NODE_TYPE);
        assert_eq!(node.style_data, json!({}));
        assert_eq!(node.metadata, json!({}));
        assert!(node.parent_id.is_none());
        assert!(Uuid::parse_str(&node.id).is_ok());
    }

    #[test]
    fn test_create_request_applies_defaults() {
        let request = NodeCreateRequest {
            mind_map_id: "map-1".to_string(),
            content: "Solar".to_string(),
            style_data: Some(json!(null)),
            ..Default::default()
        };
        let node = request.into_node();
        assert_eq!(node.node_type, DEFAULT_NODE_TYPE);
        assert_eq!(node.style_data, json!({}));
    }

    #[test]
    fn test_update_normalization_drops_zero_values() {
        let update = NodeUpdate {
            content: Some(String::new()),
            position_x: Some(0.0),
            position_y: Some(12.0),
            node_type: Some(String::new()),
            ..Default::default()
        }
        .normalized();

        assert!(update.content.is_none());
        assert!(update.position_x.is_none());
        assert_eq!(update.position_y, Some(12.0));
        assert!(update.node_type.is_none());
        assert!(!update.is_empty());
        assert!(NodeUpdate::default().normalized().is_empty());
    }
}
