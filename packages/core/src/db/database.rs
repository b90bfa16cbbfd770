//! Database Connection Management
//!
//! This module provides the core database connection and initialization
//! functionality using libsql for IdeaGraph's relational store.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//! - **Foreign keys**: Enabled on every connection for cascade deletes
//! - **Raw SQL only**: `db_*` methods return rows or affected-row counts and
//!   contain no ownership or validation logic (the service layer does that)
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions.** It applies the
//! busy timeout and the foreign-key pragma, both of which are per-connection
//! settings in SQLite.
//!
//! ```no_run
//! # use ideagraph_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db_service = DatabaseService::new(PathBuf::from("./data/ideagraph.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::db::error::DatabaseError;
use crate::models::NodePosition;
use libsql::{Builder, Connection, Database, Row, Rows};
use std::path::PathBuf;
use std::sync::Arc;

/// Database service for managing libsql connection and schema
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

/// Parameters for mind map insertion
pub struct DbCreateMindMapParams<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub is_public: bool,
}

/// Parameters for a coalescing mind map update (`None` keeps the stored value)
pub struct DbUpdateMindMapParams<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub is_public: Option<bool>,
    pub status: Option<&'a str>,
}

/// Parameters for node insertion (avoids too-many-arguments lint)
pub struct DbCreateNodeParams<'a> {
    pub id: &'a str,
    pub mind_map_id: &'a str,
    pub parent_id: Option<&'a str>,
    pub content: &'a str,
    pub position_x: f64,
    pub position_y: f64,
    pub node_type: &'a str,
    pub style_data: &'a str,
    pub metadata: &'a str,
}

/// Parameters for a coalescing node update (`None` keeps the stored value)
pub struct DbUpdateNodeParams<'a> {
    pub content: Option<&'a str>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub node_type: Option<&'a str>,
    pub style_data: Option<&'a str>,
    pub metadata: Option<&'a str>,
}

/// Parameters for edge insertion
pub struct DbCreateEdgeParams<'a> {
    pub id: &'a str,
    pub mind_map_id: &'a str,
    pub source_id: &'a str,
    pub target_id: &'a str,
    pub edge_type: &'a str,
    pub style_data: &'a str,
}

const MIND_MAP_COLUMNS: &str =
    "id, user_id, title, description, is_public, status, created_at, updated_at";

const NODE_COLUMNS: &str = "id, mind_map_id, parent_id, content, position_x, position_y, \
     node_type, style_data, metadata, created_at, updated_at";

const EDGE_COLUMNS: &str =
    "id, mind_map_id, source_id, target_id, edge_type, style_data, created_at";

const API_KEY_COLUMNS: &str = "id, user_id, service, is_active, created_at, updated_at";

const INSERT_NODE_SQL: &str = "INSERT INTO nodes (id, mind_map_id, parent_id, content, position_x, position_y, node_type, style_data, metadata)
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";

const INSERT_EDGE_SQL: &str = "INSERT INTO edges (id, mind_map_id, source_id, target_id, edge_type, style_data)
     VALUES (?, ?, ?, ?, ?, ?)";

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the parent directory cannot be created, the
    /// connection fails, or schema initialization fails.
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema().await?;

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    async fn execute_pragma(&self, conn: &Connection, pragma: &str) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// Idempotent: every statement is `IF NOT EXISTS`.
    ///
    /// # Schema
    ///
    /// - `mind_maps`: soft-deleted via `status`, never physically removed by the app
    /// - `nodes`: cascade on mind map and on parent node deletion
    /// - `edges`: cascade on either endpoint and on mind map deletion;
    ///   UNIQUE (mind_map_id, source_id, target_id)
    /// - `api_keys`: UNIQUE (user_id, service)
    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        let statements = [
            (
                "mind_maps table",
                "CREATE TABLE IF NOT EXISTS mind_maps (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    is_public INTEGER NOT NULL DEFAULT 0,
                    status TEXT NOT NULL DEFAULT 'active',
                    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
                )",
            ),
            (
                "nodes table",
                "CREATE TABLE IF NOT EXISTS nodes (
                    id TEXT PRIMARY KEY,
                    mind_map_id TEXT NOT NULL,
                    parent_id TEXT,
                    content TEXT NOT NULL,
                    position_x REAL NOT NULL DEFAULT 0,
                    position_y REAL NOT NULL DEFAULT 0,
                    node_type TEXT NOT NULL DEFAULT 'default',
                    style_data JSON NOT NULL DEFAULT '{}',
                    metadata JSON NOT NULL DEFAULT '{}',
                    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                    FOREIGN KEY (mind_map_id) REFERENCES mind_maps(id) ON DELETE CASCADE,
                    -- Parent deletion cascades to children (independent of edges)
                    FOREIGN KEY (parent_id) REFERENCES nodes(id) ON DELETE CASCADE
                )",
            ),
            (
                "edges table",
                "CREATE TABLE IF NOT EXISTS edges (
                    id TEXT PRIMARY KEY,
                    mind_map_id TEXT NOT NULL,
                    source_id TEXT NOT NULL,
                    target_id TEXT NOT NULL,
                    edge_type TEXT NOT NULL DEFAULT 'default',
                    style_data JSON NOT NULL DEFAULT '{}',
                    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                    UNIQUE (mind_map_id, source_id, target_id),
                    FOREIGN KEY (mind_map_id) REFERENCES mind_maps(id) ON DELETE CASCADE,
                    FOREIGN KEY (source_id) REFERENCES nodes(id) ON DELETE CASCADE,
                    FOREIGN KEY (target_id) REFERENCES nodes(id) ON DELETE CASCADE
                )",
            ),
            (
                "api_keys table",
                "CREATE TABLE IF NOT EXISTS api_keys (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    service TEXT NOT NULL,
                    encrypted_key TEXT NOT NULL,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                    UNIQUE (user_id, service)
                )",
            ),
            (
                "index 'idx_mind_maps_user'",
                "CREATE INDEX IF NOT EXISTS idx_mind_maps_user ON mind_maps(user_id, status)",
            ),
            (
                "index 'idx_nodes_mind_map'",
                "CREATE INDEX IF NOT EXISTS idx_nodes_mind_map ON nodes(mind_map_id)",
            ),
            (
                "index 'idx_nodes_parent'",
                "CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id)",
            ),
            (
                "index 'idx_edges_mind_map'",
                "CREATE INDEX IF NOT EXISTS idx_edges_mind_map ON edges(mind_map_id)",
            ),
            (
                "index 'idx_edges_target'",
                "CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id)",
            ),
        ];

        for (label, sql) in statements {
            conn.execute(sql, ()).await.map_err(|e| {
                DatabaseError::initialization_failed(format!("Failed to create {}: {}", label, e))
            })?;
        }

        Ok(())
    }

    /// Get a raw connection to the database
    ///
    /// **⚠️ WARNING**: The returned connection has neither the busy timeout nor
    /// foreign keys enabled. Use `connect_with_timeout()` in async code.
    pub fn connect(&self) -> Result<Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with busy timeout and foreign keys configured
    ///
    /// The 5-second busy timeout lets concurrent requests wait for a lock
    /// instead of failing with `SQLITE_BUSY`. Foreign keys must be enabled per
    /// connection for the cascade rules to fire.
    pub async fn connect_with_timeout(&self) -> Result<Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }

    /// Run a single-row SELECT and return the first row, if any
    async fn query_one(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
        label: &str,
    ) -> Result<Option<Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn.prepare(sql).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare {} query: {}", label, e))
        })?;

        let mut rows = stmt.query(params).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute {} query: {}", label, e))
        })?;

        rows.next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))
    }

    /// Run a multi-row SELECT and collect every row
    async fn query_all(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
        label: &str,
    ) -> Result<Vec<Row>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn.prepare(sql).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare {} query: {}", label, e))
        })?;

        let rows = stmt.query(params).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute {} query: {}", label, e))
        })?;

        collect_rows(rows).await
    }

    //
    // MIND MAP OPERATIONS
    //

    pub async fn db_create_mind_map(
        &self,
        params: DbCreateMindMapParams<'_>,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO mind_maps (id, user_id, title, description, is_public, status)
             VALUES (?, ?, ?, ?, ?, 'active')",
            (
                params.id,
                params.user_id,
                params.title,
                params.description,
                params.is_public as i64,
            ),
        )
        .await
        .map_err(|e| DatabaseError::from_write("Failed to insert mind map", e))?;

        Ok(())
    }

    /// Fetch a mind map row; soft-deleted maps are invisible
    pub async fn db_get_mind_map(&self, id: &str) -> Result<Option<Row>, DatabaseError> {
        self.query_one(
            &format!(
                "SELECT {} FROM mind_maps WHERE id = ? AND status != 'deleted'",
                MIND_MAP_COLUMNS
            ),
            [id],
            "get_mind_map",
        )
        .await
    }

    /// List a user's non-deleted mind maps, most recently updated first
    pub async fn db_list_mind_maps(&self, user_id: &str) -> Result<Vec<Row>, DatabaseError> {
        self.query_all(
            &format!(
                "SELECT {} FROM mind_maps WHERE user_id = ? AND status != 'deleted'
                 ORDER BY updated_at DESC, rowid DESC",
                MIND_MAP_COLUMNS
            ),
            [user_id],
            "list_mind_maps",
        )
        .await
    }

    /// Coalescing update; returns affected rows (0 = missing or already deleted)
    pub async fn db_update_mind_map(
        &self,
        id: &str,
        params: DbUpdateMindMapParams<'_>,
    ) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "UPDATE mind_maps
             SET title = COALESCE(NULLIF(?, ''), title),
                 description = COALESCE(NULLIF(?, ''), description),
                 is_public = COALESCE(?, is_public),
                 status = COALESCE(NULLIF(?, ''), status),
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ? AND status != 'deleted'",
            libsql::params![
                params.title,
                params.description,
                params.is_public.map(|p| p as i64),
                params.status,
                id
            ],
        )
        .await
        .map_err(|e| DatabaseError::from_write("Failed to update mind map", e))
    }

    /// Soft delete; returns affected rows (0 = missing or already deleted)
    pub async fn db_soft_delete_mind_map(&self, id: &str) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "UPDATE mind_maps SET status = 'deleted', updated_at = CURRENT_TIMESTAMP
             WHERE id = ? AND status != 'deleted'",
            [id],
        )
        .await
        .map_err(|e| DatabaseError::from_write("Failed to delete mind map", e))
    }

    //
    // NODE OPERATIONS
    //

    /// Insert a node
    ///
    /// Created_at and updated_at are set automatically by the database.
    pub async fn db_create_node(&self, params: DbCreateNodeParams<'_>) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        insert_node(&conn, &params).await
    }

    pub async fn db_get_node(&self, id: &str) -> Result<Option<Row>, DatabaseError> {
        self.query_one(
            &format!("SELECT {} FROM nodes WHERE id = ?", NODE_COLUMNS),
            [id],
            "get_node",
        )
        .await
    }

    pub async fn db_list_nodes(&self, mind_map_id: &str) -> Result<Vec<Row>, DatabaseError> {
        self.query_all(
            &format!(
                "SELECT {} FROM nodes WHERE mind_map_id = ? ORDER BY created_at, rowid",
                NODE_COLUMNS
            ),
            [mind_map_id],
            "list_nodes",
        )
        .await
    }

    /// Coalescing node update; returns affected rows (0 = node missing)
    ///
    /// Empty strings are treated as "no change" in SQL as well, matching the
    /// model-level normalization.
    pub async fn db_update_node(
        &self,
        id: &str,
        params: DbUpdateNodeParams<'_>,
    ) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "UPDATE nodes
             SET content = COALESCE(NULLIF(?, ''), content),
                 position_x = COALESCE(?, position_x),
                 position_y = COALESCE(?, position_y),
                 node_type = COALESCE(NULLIF(?, ''), node_type),
                 style_data = COALESCE(?, style_data),
                 metadata = COALESCE(?, metadata),
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
            libsql::params![
                params.content,
                params.position_x,
                params.position_y,
                params.node_type,
                params.style_data,
                params.metadata,
                id
            ],
        )
        .await
        .map_err(|e| DatabaseError::from_write("Failed to update node", e))
    }

    /// Delete a node; returns affected rows (0 = node didn't exist)
    ///
    /// DELETE CASCADE removes child nodes (parent_id) and incident edges.
    pub async fn db_delete_node(&self, id: &str) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("DELETE FROM nodes WHERE id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete node: {}", e)))
    }

    /// Batch update node positions in a transaction
    ///
    /// All updates succeed or none persist. A position referencing a missing
    /// node aborts the batch with `RowNotFound` after rolling back.
    pub async fn db_batch_update_positions(
        &self,
        positions: &[NodePosition],
    ) -> Result<(), DatabaseError> {
        if positions.is_empty() {
            return Ok(());
        }

        let conn = self.connect_with_timeout().await?;

        conn.execute("BEGIN TRANSACTION", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
        })?;

        for position in positions {
            let result = conn
                .execute(
                    "UPDATE nodes SET position_x = ?, position_y = ?, updated_at = CURRENT_TIMESTAMP
                     WHERE id = ?",
                    (
                        position.position_x,
                        position.position_y,
                        position.id.as_str(),
                    ),
                )
                .await;

            match result {
                Ok(0) => {
                    let _rollback = conn.execute("ROLLBACK", ()).await;
                    return Err(DatabaseError::RowNotFound {
                        entity: "node",
                        id: position.id.clone(),
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    let _rollback = conn.execute("ROLLBACK", ()).await;
                    return Err(DatabaseError::sql_execution(format!(
                        "Failed to update position of node {}: {}",
                        position.id, e
                    )));
                }
            }
        }

        commit(&conn).await
    }

    //
    // EDGE OPERATIONS
    //

    pub async fn db_create_edge(&self, params: DbCreateEdgeParams<'_>) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        insert_edge(&conn, &params).await
    }

    pub async fn db_get_edge(&self, id: &str) -> Result<Option<Row>, DatabaseError> {
        self.query_one(
            &format!("SELECT {} FROM edges WHERE id = ?", EDGE_COLUMNS),
            [id],
            "get_edge",
        )
        .await
    }

    pub async fn db_list_edges(&self, mind_map_id: &str) -> Result<Vec<Row>, DatabaseError> {
        self.query_all(
            &format!(
                "SELECT {} FROM edges WHERE mind_map_id = ? ORDER BY created_at, rowid",
                EDGE_COLUMNS
            ),
            [mind_map_id],
            "list_edges",
        )
        .await
    }

    pub async fn db_delete_edge(&self, id: &str) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("DELETE FROM edges WHERE id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete edge: {}", e)))
    }

    pub async fn db_delete_edge_by_nodes(
        &self,
        source_id: &str,
        target_id: &str,
    ) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "DELETE FROM edges WHERE source_id = ? AND target_id = ?",
            [source_id, target_id],
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete edge: {}", e)))
    }

    /// Insert nodes, then edges, in a single transaction
    ///
    /// Nodes are inserted first so edges may reference them. Any failure rolls
    /// back the whole batch.
    pub async fn db_create_nodes_and_edges(
        &self,
        nodes: &[DbCreateNodeParams<'_>],
        edges: &[DbCreateEdgeParams<'_>],
    ) -> Result<(), DatabaseError> {
        if nodes.is_empty() && edges.is_empty() {
            return Ok(());
        }

        let conn = self.connect_with_timeout().await?;

        conn.execute("BEGIN TRANSACTION", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
        })?;

        for params in nodes {
            if let Err(e) = insert_node(&conn, params).await {
                let _rollback = conn.execute("ROLLBACK", ()).await;
                return Err(e);
            }
        }

        for params in edges {
            if let Err(e) = insert_edge(&conn, params).await {
                let _rollback = conn.execute("ROLLBACK", ()).await;
                return Err(e);
            }
        }

        commit(&conn).await
    }

    //
    // API KEY OPERATIONS
    //

    /// Insert or overwrite the key for (user, service)
    ///
    /// An existing record keeps its id, receives the new material and is
    /// reactivated.
    pub async fn db_upsert_api_key(
        &self,
        id: &str,
        user_id: &str,
        service: &str,
        encrypted_key: &str,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO api_keys (id, user_id, service, encrypted_key, is_active)
             VALUES (?, ?, ?, ?, 1)
             ON CONFLICT (user_id, service) DO UPDATE SET
                 encrypted_key = excluded.encrypted_key,
                 is_active = 1,
                 updated_at = CURRENT_TIMESTAMP",
            [id, user_id, service, encrypted_key],
        )
        .await
        .map_err(|e| DatabaseError::from_write("Failed to upsert API key", e))?;

        Ok(())
    }

    pub async fn db_get_api_key(&self, id: &str) -> Result<Option<Row>, DatabaseError> {
        self.query_one(
            &format!("SELECT {} FROM api_keys WHERE id = ?", API_KEY_COLUMNS),
            [id],
            "get_api_key",
        )
        .await
    }

    pub async fn db_get_api_key_by_service(
        &self,
        user_id: &str,
        service: &str,
    ) -> Result<Option<Row>, DatabaseError> {
        self.query_one(
            &format!(
                "SELECT {} FROM api_keys WHERE user_id = ? AND service = ?",
                API_KEY_COLUMNS
            ),
            [user_id, service],
            "get_api_key_by_service",
        )
        .await
    }

    /// Fetch `(encrypted_key, is_active)` for (user, service)
    pub async fn db_get_api_key_material(
        &self,
        user_id: &str,
        service: &str,
    ) -> Result<Option<Row>, DatabaseError> {
        self.query_one(
            "SELECT encrypted_key, is_active FROM api_keys WHERE user_id = ? AND service = ?",
            [user_id, service],
            "get_api_key_material",
        )
        .await
    }

    pub async fn db_list_api_keys(&self, user_id: &str) -> Result<Vec<Row>, DatabaseError> {
        self.query_all(
            &format!(
                "SELECT {} FROM api_keys WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
                API_KEY_COLUMNS
            ),
            [user_id],
            "list_api_keys",
        )
        .await
    }

    /// Update key material and/or active flag; returns affected rows
    pub async fn db_update_api_key(
        &self,
        id: &str,
        encrypted_key: Option<&str>,
        is_active: bool,
    ) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "UPDATE api_keys
             SET encrypted_key = COALESCE(?, encrypted_key),
                 is_active = ?,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
            libsql::params![encrypted_key, is_active as i64, id],
        )
        .await
        .map_err(|e| DatabaseError::from_write("Failed to update API key", e))
    }

    pub async fn db_delete_api_key(&self, id: &str) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("DELETE FROM api_keys WHERE id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete API key: {}", e)))
    }
}

async fn insert_node(conn: &Connection, params: &DbCreateNodeParams<'_>) -> Result<(), DatabaseError> {
    conn.execute(
        INSERT_NODE_SQL,
        libsql::params![
            params.id,
            params.mind_map_id,
            params.parent_id,
            params.content,
            params.position_x,
            params.position_y,
            params.node_type,
            params.style_data,
            params.metadata
        ],
    )
    .await
    .map_err(|e| DatabaseError::from_write(&format!("Failed to insert node {}", params.id), e))?;

    Ok(())
}

async fn insert_edge(conn: &Connection, params: &DbCreateEdgeParams<'_>) -> Result<(), DatabaseError> {
    conn.execute(
        INSERT_EDGE_SQL,
        libsql::params![
            params.id,
            params.mind_map_id,
            params.source_id,
            params.target_id,
            params.edge_type,
            params.style_data
        ],
    )
    .await
    .map_err(|e| DatabaseError::from_write(&format!("Failed to insert edge {}", params.id), e))?;

    Ok(())
}

async fn commit(conn: &Connection) -> Result<(), DatabaseError> {
    if let Err(e) = conn.execute("COMMIT", ()).await {
        let _rollback = conn.execute("ROLLBACK", ()).await;
        return Err(DatabaseError::sql_execution(format!(
            "Failed to commit transaction: {}",
            e
        )));
    }
    Ok(())
}

async fn collect_rows(mut rows: Rows) -> Result<Vec<Row>, DatabaseError> {
    let mut collected = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
    {
        collected.push(row);
    }
    Ok(collected)
}
