//! Mind Map Data Structures
//!
//! A mind map is owned exclusively by the user who created it. Deletion is a
//! soft status transition; rows are never physically removed.

use super::{Edge, Node};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a mind map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MindMapStatus {
    #[default]
    Active,
    Deleted,
}

impl MindMapStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MindMapStatus::Active => "active",
            MindMapStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for MindMapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MindMapStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MindMapStatus::Active),
            "deleted" => Ok(MindMapStatus::Deleted),
            other => Err(format!("unknown mind map status '{}'", other)),
        }
    }
}

/// A user-owned container for a graph of nodes and edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMap {
    pub id: String,

    /// Owning user; the only identity allowed to mutate the map
    pub user_id: String,

    pub title: String,
    pub description: String,

    /// Public maps are readable (never writable) by non-owners
    pub is_public: bool,

    pub status: MindMapStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MindMap {
    /// True when `user_id` is the owner
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Owners can always read; everyone else only when the map is public
    pub fn is_readable_by(&self, user_id: &str) -> bool {
        self.is_owned_by(user_id) || self.is_public
    }
}

/// A mind map together with every node and edge it contains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapDetails {
    #[serde(flatten)]
    pub mind_map: MindMap,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapCreateRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
}

/// Sparse mind map update
///
/// Absent fields and empty strings leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MindMapStatus>,
}
