//! TursoStore - libsql implementation of the persistence traits
//!
//! Thin wrapper around `DatabaseService`: model ↔ row conversion lives here,
//! SQL lives in `DatabaseService`, and ownership rules live in the services.
//!
//! # Examples
//!
//! ```rust,no_run
//! use ideagraph_core::db::{DatabaseService, GraphStore, TursoStore};
//! use ideagraph_core::models::Node;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/ideagraph.db")).await?);
//!     let store = TursoStore::new(db);
//!
//!     let node = store.create_node(Node::new("map-1", "Solar", 0.0, 0.0)).await?;
//!     println!("created {}", node.id);
//!     Ok(())
//! }
//! ```

use crate::db::graph_store::{ApiKeyStore, GraphStore};
use crate::db::{
    DatabaseError, DatabaseService, DbCreateEdgeParams, DbCreateMindMapParams, DbCreateNodeParams,
    DbUpdateMindMapParams, DbUpdateNodeParams,
};
use crate::models::{
    ApiKey, Edge, MindMap, MindMapStatus, MindMapUpdate, Node, NodePosition, NodeUpdate,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::Row;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// TursoStore implements `GraphStore` and `ApiKeyStore` for libsql
#[derive(Debug, Clone)]
pub struct TursoStore {
    db: Arc<DatabaseService>,
}

impl TursoStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Parse timestamp from database - handles both SQLite and RFC3339 formats
    ///
    /// SQLite CURRENT_TIMESTAMP returns: "YYYY-MM-DD HH:MM:SS"
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        Err(DatabaseError::row_conversion(format!(
            "Unable to parse timestamp '{}' as SQLite or RFC3339 format",
            s
        )))
    }

    fn column_error(name: &str, e: libsql::Error) -> DatabaseError {
        DatabaseError::row_conversion(format!("Failed to get {}: {}", name, e))
    }

    fn get_text(row: &Row, idx: i32, name: &str) -> Result<String, DatabaseError> {
        row.get::<String>(idx).map_err(|e| Self::column_error(name, e))
    }

    fn get_optional_text(row: &Row, idx: i32, name: &str) -> Result<Option<String>, DatabaseError> {
        row.get::<Option<String>>(idx)
            .map_err(|e| Self::column_error(name, e))
    }

    fn get_real(row: &Row, idx: i32, name: &str) -> Result<f64, DatabaseError> {
        row.get::<f64>(idx).map_err(|e| Self::column_error(name, e))
    }

    fn get_flag(row: &Row, idx: i32, name: &str) -> Result<bool, DatabaseError> {
        row.get::<i64>(idx)
            .map(|v| v != 0)
            .map_err(|e| Self::column_error(name, e))
    }

    fn get_timestamp(row: &Row, idx: i32, name: &str) -> Result<DateTime<Utc>, DatabaseError> {
        let raw = Self::get_text(row, idx, name)?;
        Self::parse_timestamp(&raw)
    }

    fn get_json(row: &Row, idx: i32, name: &str) -> Result<Value, DatabaseError> {
        let raw = Self::get_text(row, idx, name)?;
        serde_json::from_str(&raw).map_err(|e| {
            DatabaseError::row_conversion(format!("Failed to parse {} JSON: {}", name, e))
        })
    }

    fn to_json_string(value: &Value) -> Result<String, DatabaseError> {
        serde_json::to_string(value)
            .map_err(|e| DatabaseError::row_conversion(format!("Failed to serialize JSON: {}", e)))
    }

    /// Columns: id, user_id, title, description, is_public, status, created_at, updated_at
    fn row_to_mind_map(row: &Row) -> Result<MindMap, DatabaseError> {
        let status_str = Self::get_text(row, 5, "status")?;
        let status = status_str
            .parse::<MindMapStatus>()
            .map_err(DatabaseError::row_conversion)?;

        Ok(MindMap {
            id: Self::get_text(row, 0, "id")?,
            user_id: Self::get_text(row, 1, "user_id")?,
            title: Self::get_text(row, 2, "title")?,
            description: Self::get_text(row, 3, "description")?,
            is_public: Self::get_flag(row, 4, "is_public")?,
            status,
            created_at: Self::get_timestamp(row, 6, "created_at")?,
            updated_at: Self::get_timestamp(row, 7, "updated_at")?,
        })
    }

    /// Columns: id, mind_map_id, parent_id, content, position_x, position_y,
    /// node_type, style_data, metadata, created_at, updated_at
    fn row_to_node(row: &Row) -> Result<Node, DatabaseError> {
        Ok(Node {
            id: Self::get_text(row, 0, "id")?,
            mind_map_id: Self::get_text(row, 1, "mind_map_id")?,
            parent_id: Self::get_optional_text(row, 2, "parent_id")?,
            content: Self::get_text(row, 3, "content")?,
            position_x: Self::get_real(row, 4, "position_x")?,
            position_y: Self::get_real(row, 5, "position_y")?,
            node_type: Self::get_text(row, 6, "node_type")?,
            style_data: Self::get_json(row, 7, "style_data")?,
            metadata: Self::get_json(row, 8, "metadata")?,
            created_at: Self::get_timestamp(row, 9, "created_at")?,
            updated_at: Self::get_timestamp(row, 10, "updated_at")?,
        })
    }

    /// Columns: id, mind_map_id, source_id, target_id, edge_type, style_data, created_at
    fn row_to_edge(row: &Row) -> Result<Edge, DatabaseError> {
        Ok(Edge {
            id: Self::get_text(row, 0, "id")?,
            mind_map_id: Self::get_text(row, 1, "mind_map_id")?,
            source_id: Self::get_text(row, 2, "source_id")?,
            target_id: Self::get_text(row, 3, "target_id")?,
            edge_type: Self::get_text(row, 4, "edge_type")?,
            style_data: Self::get_json(row, 5, "style_data")?,
            created_at: Self::get_timestamp(row, 6, "created_at")?,
        })
    }

    /// Columns: id, user_id, service, is_active, created_at, updated_at
    fn row_to_api_key(row: &Row) -> Result<ApiKey, DatabaseError> {
        Ok(ApiKey {
            id: Self::get_text(row, 0, "id")?,
            user_id: Self::get_text(row, 1, "user_id")?,
            service: Self::get_text(row, 2, "service")?,
            is_active: Self::get_flag(row, 3, "is_active")?,
            created_at: Self::get_timestamp(row, 4, "created_at")?,
            updated_at: Self::get_timestamp(row, 5, "updated_at")?,
        })
    }

    fn rows_to<T>(
        rows: Vec<Row>,
        convert: fn(&Row) -> Result<T, DatabaseError>,
    ) -> Result<Vec<T>, DatabaseError> {
        rows.iter().map(convert).collect()
    }

    async fn fetch_node(&self, id: &str) -> Result<Node, DatabaseError> {
        self.get_node(id)
            .await?
            .ok_or_else(|| DatabaseError::RowNotFound {
                entity: "node",
                id: id.to_string(),
            })
    }

    async fn fetch_edge(&self, id: &str) -> Result<Edge, DatabaseError> {
        self.get_edge(id)
            .await?
            .ok_or_else(|| DatabaseError::RowNotFound {
                entity: "edge",
                id: id.to_string(),
            })
    }
}

/// Serialized JSON blobs for one node, kept alive while params borrow them
struct NodeBlobs {
    style_data: String,
    metadata: String,
}

impl NodeBlobs {
    fn of(node: &Node) -> Result<Self, DatabaseError> {
        Ok(Self {
            style_data: TursoStore::to_json_string(&node.style_data)?,
            metadata: TursoStore::to_json_string(&node.metadata)?,
        })
    }

    fn params<'a>(&'a self, node: &'a Node) -> DbCreateNodeParams<'a> {
        DbCreateNodeParams {
            id: &node.id,
            mind_map_id: &node.mind_map_id,
            parent_id: node.parent_id.as_deref(),
            content: &node.content,
            position_x: node.position_x,
            position_y: node.position_y,
            node_type: &node.node_type,
            style_data: &self.style_data,
            metadata: &self.metadata,
        }
    }
}

fn edge_params<'a>(edge: &'a Edge, style_data: &'a str) -> DbCreateEdgeParams<'a> {
    DbCreateEdgeParams {
        id: &edge.id,
        mind_map_id: &edge.mind_map_id,
        source_id: &edge.source_id,
        target_id: &edge.target_id,
        edge_type: &edge.edge_type,
        style_data,
    }
}

#[async_trait]
impl GraphStore for TursoStore {
    async fn create_mind_map(&self, mind_map: MindMap) -> Result<MindMap, DatabaseError> {
        self.db
            .db_create_mind_map(DbCreateMindMapParams {
                id: &mind_map.id,
                user_id: &mind_map.user_id,
                title: &mind_map.title,
                description: &mind_map.description,
                is_public: mind_map.is_public,
            })
            .await?;

        self.get_mind_map(&mind_map.id)
            .await?
            .ok_or_else(|| DatabaseError::RowNotFound {
                entity: "mind map",
                id: mind_map.id.clone(),
            })
    }

    async fn get_mind_map(&self, id: &str) -> Result<Option<MindMap>, DatabaseError> {
        match self.db.db_get_mind_map(id).await? {
            Some(row) => Ok(Some(Self::row_to_mind_map(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_mind_maps(&self, user_id: &str) -> Result<Vec<MindMap>, DatabaseError> {
        let rows = self.db.db_list_mind_maps(user_id).await?;
        Self::rows_to(rows, Self::row_to_mind_map)
    }

    async fn update_mind_map(
        &self,
        id: &str,
        update: MindMapUpdate,
    ) -> Result<Option<MindMap>, DatabaseError> {
        let affected = self
            .db
            .db_update_mind_map(
                id,
                DbUpdateMindMapParams {
                    title: update.title.as_deref(),
                    description: update.description.as_deref(),
                    is_public: update.is_public,
                    status: update.status.map(|s| s.as_str()),
                },
            )
            .await?;

        if affected == 0 {
            return Ok(None);
        }

        // A status update to `deleted` makes the map invisible to get_mind_map
        self.get_mind_map(id).await
    }

    async fn soft_delete_mind_map(&self, id: &str) -> Result<bool, DatabaseError> {
        Ok(self.db.db_soft_delete_mind_map(id).await? > 0)
    }

    async fn create_node(&self, node: Node) -> Result<Node, DatabaseError> {
        let blobs = NodeBlobs::of(&node)?;
        self.db.db_create_node(blobs.params(&node)).await?;
        self.fetch_node(&node.id).await
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>, DatabaseError> {
        match self.db.db_get_node(id).await? {
            Some(row) => Ok(Some(Self::row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_nodes(&self, mind_map_id: &str) -> Result<Vec<Node>, DatabaseError> {
        let rows = self.db.db_list_nodes(mind_map_id).await?;
        Self::rows_to(rows, Self::row_to_node)
    }

    async fn update_node(
        &self,
        id: &str,
        update: NodeUpdate,
    ) -> Result<Option<Node>, DatabaseError> {
        let update = update.normalized();

        let style_data = update
            .style_data
            .as_ref()
            .map(Self::to_json_string)
            .transpose()?;
        let metadata = update
            .metadata
            .as_ref()
            .map(Self::to_json_string)
            .transpose()?;

        let affected = self
            .db
            .db_update_node(
                id,
                DbUpdateNodeParams {
                    content: update.content.as_deref(),
                    position_x: update.position_x,
                    position_y: update.position_y,
                    node_type: update.node_type.as_deref(),
                    style_data: style_data.as_deref(),
                    metadata: metadata.as_deref(),
                },
            )
            .await?;

        if affected == 0 {
            return Ok(None);
        }

        self.get_node(id).await
    }

    async fn delete_node(&self, id: &str) -> Result<bool, DatabaseError> {
        Ok(self.db.db_delete_node(id).await? > 0)
    }

    async fn batch_update_positions(
        &self,
        positions: &[NodePosition],
    ) -> Result<(), DatabaseError> {
        self.db.db_batch_update_positions(positions).await
    }

    async fn create_edge(&self, edge: Edge) -> Result<Edge, DatabaseError> {
        let style_data = Self::to_json_string(&edge.style_data)?;
        self.db
            .db_create_edge(edge_params(&edge, &style_data))
            .await?;
        self.fetch_edge(&edge.id).await
    }

    async fn get_edge(&self, id: &str) -> Result<Option<Edge>, DatabaseError> {
        match self.db.db_get_edge(id).await? {
            Some(row) => Ok(Some(Self::row_to_edge(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_edges(&self, mind_map_id: &str) -> Result<Vec<Edge>, DatabaseError> {
        let rows = self.db.db_list_edges(mind_map_id).await?;
        Self::rows_to(rows, Self::row_to_edge)
    }

    async fn delete_edge(&self, id: &str) -> Result<bool, DatabaseError> {
        Ok(self.db.db_delete_edge(id).await? > 0)
    }

    async fn delete_edge_by_nodes(
        &self,
        source_id: &str,
        target_id: &str,
    ) -> Result<bool, DatabaseError> {
        Ok(self.db.db_delete_edge_by_nodes(source_id, target_id).await? > 0)
    }

    async fn create_nodes_and_edges(
        &self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Result<(Vec<Node>, Vec<Edge>), DatabaseError> {
        let node_blobs = nodes
            .iter()
            .map(NodeBlobs::of)
            .collect::<Result<Vec<_>, _>>()?;
        let edge_styles = edges
            .iter()
            .map(|e| Self::to_json_string(&e.style_data))
            .collect::<Result<Vec<_>, _>>()?;

        let node_rows: Vec<DbCreateNodeParams<'_>> = node_blobs
            .iter()
            .zip(nodes.iter())
            .map(|(blobs, node)| blobs.params(node))
            .collect();
        let edge_rows: Vec<DbCreateEdgeParams<'_>> = edges
            .iter()
            .zip(edge_styles.iter())
            .map(|(edge, style)| edge_params(edge, style))
            .collect();

        self.db
            .db_create_nodes_and_edges(&node_rows, &edge_rows)
            .await?;

        let mut created_nodes = Vec::with_capacity(nodes.len());
        for node in &nodes {
            created_nodes.push(self.fetch_node(&node.id).await?);
        }

        let mut created_edges = Vec::with_capacity(edges.len());
        for edge in &edges {
            created_edges.push(self.fetch_edge(&edge.id).await?);
        }

        Ok((created_nodes, created_edges))
    }
}

#[async_trait]
impl ApiKeyStore for TursoStore {
    async fn upsert_api_key(
        &self,
        user_id: &str,
        service: &str,
        encrypted_key: &str,
    ) -> Result<ApiKey, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        self.db
            .db_upsert_api_key(&id, user_id, service, encrypted_key)
            .await?;

        // The record may have kept an older id when it already existed
        self.get_api_key_by_service(user_id, service)
            .await?
            .ok_or_else(|| DatabaseError::RowNotFound {
                entity: "api key",
                id,
            })
    }

    async fn get_api_key(&self, id: &str) -> Result<Option<ApiKey>, DatabaseError> {
        match self.db.db_get_api_key(id).await? {
            Some(row) => Ok(Some(Self::row_to_api_key(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_api_key_by_service(
        &self,
        user_id: &str,
        service: &str,
    ) -> Result<Option<ApiKey>, DatabaseError> {
        match self.db.db_get_api_key_by_service(user_id, service).await? {
            Some(row) => Ok(Some(Self::row_to_api_key(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_encrypted_key(
        &self,
        user_id: &str,
        service: &str,
    ) -> Result<Option<(String, bool)>, DatabaseError> {
        match self.db.db_get_api_key_material(user_id, service).await? {
            Some(row) => {
                let encrypted = Self::get_text(&row, 0, "encrypted_key")?;
                let is_active = Self::get_flag(&row, 1, "is_active")?;
                Ok(Some((encrypted, is_active)))
            }
            None => Ok(None),
        }
    }

    async fn list_api_keys(&self, user_id: &str) -> Result<Vec<ApiKey>, DatabaseError> {
        let rows = self.db.db_list_api_keys(user_id).await?;
        Self::rows_to(rows, Self::row_to_api_key)
    }

    async fn update_api_key(
        &self,
        id: &str,
        encrypted_key: Option<&str>,
        is_active: bool,
    ) -> Result<Option<ApiKey>, DatabaseError> {
        let affected = self
            .db
            .db_update_api_key(id, encrypted_key, is_active)
            .await?;

        if affected == 0 {
            return Ok(None);
        }

        self.get_api_key(id).await
    }

    async fn delete_api_key(&self, id: &str) -> Result<bool, DatabaseError> {
        Ok(self.db.db_delete_api_key(id).await? > 0)
    }
}
