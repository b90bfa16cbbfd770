//! Persistence traits for the mind map graph and for API key records
//!
//! `GraphStore` and `ApiKeyStore` sit between the services (ownership checks,
//! validation, orchestration) and a concrete backend. `TursoStore` is the
//! libsql implementation; tests substitute wrappers to inject failures.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: every method is async so embedded and networked
//!    backends share one surface
//! 2. **Ownership Semantics**: create methods take ownership of the model and
//!    return the stored version (database-assigned timestamps)
//! 3. **Typed Errors**: methods return `DatabaseError` so callers can tell
//!    constraint violations from missing rows and transport failures
//! 4. **Transactions**: only `batch_update_positions` and
//!    `create_nodes_and_edges` are atomic; every other call is a single
//!    statement
//!
//! # Examples
//!
//! ```rust,no_run
//! use ideagraph_core::db::{DatabaseService, GraphStore, TursoStore};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/ideagraph.db")).await?);
//!     let store: Arc<dyn GraphStore> = Arc::new(TursoStore::new(db));
//!
//!     let nodes = store.list_nodes("map-1").await?;
//!     println!("{} nodes", nodes.len());
//!     Ok(())
//! }
//! ```

use crate::db::DatabaseError;
use crate::models::{ApiKey, Edge, MindMap, MindMapUpdate, Node, NodePosition, NodeUpdate};
use async_trait::async_trait;

/// Abstraction layer for mind map, node and edge persistence
///
/// Implementations enforce referential invariants (cascades, edge uniqueness)
/// but never ownership; that is the service layer's job.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a single store can be shared by
/// concurrent request handlers.
#[async_trait]
pub trait GraphStore: Send + Sync {
    //
    // MIND MAPS
    //

    async fn create_mind_map(&self, mind_map: MindMap) -> Result<MindMap, DatabaseError>;

    /// Get a mind map by ID; soft-deleted maps are reported as `None`
    async fn get_mind_map(&self, id: &str) -> Result<Option<MindMap>, DatabaseError>;

    /// A user's non-deleted maps, most recently updated first
    async fn list_mind_maps(&self, user_id: &str) -> Result<Vec<MindMap>, DatabaseError>;

    /// Coalescing update; `None` when the map is missing or deleted
    async fn update_mind_map(
        &self,
        id: &str,
        update: MindMapUpdate,
    ) -> Result<Option<MindMap>, DatabaseError>;

    /// Mark a map deleted; `false` when there was nothing to delete
    async fn soft_delete_mind_map(&self, id: &str) -> Result<bool, DatabaseError>;

    //
    // NODES
    //

    /// Insert a node
    ///
    /// # Errors
    ///
    /// - `ForeignKeyViolation` if the mind map or parent does not exist
    /// - `UniqueViolation` if the node ID already exists
    async fn create_node(&self, node: Node) -> Result<Node, DatabaseError>;

    async fn get_node(&self, id: &str) -> Result<Option<Node>, DatabaseError>;

    /// All nodes of a mind map in creation order
    async fn list_nodes(&self, mind_map_id: &str) -> Result<Vec<Node>, DatabaseError>;

    /// Coalescing update (see [`NodeUpdate::normalized`]); `None` when the node is missing
    async fn update_node(
        &self,
        id: &str,
        update: NodeUpdate,
    ) -> Result<Option<Node>, DatabaseError>;

    /// Physical delete cascading to children and incident edges
    ///
    /// Returns `false` when zero rows were affected.
    async fn delete_node(&self, id: &str) -> Result<bool, DatabaseError>;

    /// Apply every position in one transaction
    ///
    /// # Errors
    ///
    /// `RowNotFound` if any referenced node is missing; nothing persists.
    async fn batch_update_positions(&self, positions: &[NodePosition])
        -> Result<(), DatabaseError>;

    //
    // EDGES
    //

    /// Insert an edge
    ///
    /// # Errors
    ///
    /// `UniqueViolation` if an edge already connects (source, target) in the map.
    async fn create_edge(&self, edge: Edge) -> Result<Edge, DatabaseError>;

    async fn get_edge(&self, id: &str) -> Result<Option<Edge>, DatabaseError>;

    async fn list_edges(&self, mind_map_id: &str) -> Result<Vec<Edge>, DatabaseError>;

    async fn delete_edge(&self, id: &str) -> Result<bool, DatabaseError>;

    async fn delete_edge_by_nodes(
        &self,
        source_id: &str,
        target_id: &str,
    ) -> Result<bool, DatabaseError>;

    //
    // BATCH
    //

    /// Insert nodes and then edges as a single transaction
    ///
    /// Either every row is committed or none is.
    async fn create_nodes_and_edges(
        &self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Result<(Vec<Node>, Vec<Edge>), DatabaseError>;
}

/// Persistence for per-user third-party API key records
///
/// Key material crosses this boundary only in its encrypted form.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Insert, or overwrite and reactivate the existing (user, service) record
    async fn upsert_api_key(
        &self,
        user_id: &str,
        service: &str,
        encrypted_key: &str,
    ) -> Result<ApiKey, DatabaseError>;

    async fn get_api_key(&self, id: &str) -> Result<Option<ApiKey>, DatabaseError>;

    async fn get_api_key_by_service(
        &self,
        user_id: &str,
        service: &str,
    ) -> Result<Option<ApiKey>, DatabaseError>;

    /// Encrypted material and active flag for (user, service)
    async fn get_encrypted_key(
        &self,
        user_id: &str,
        service: &str,
    ) -> Result<Option<(String, bool)>, DatabaseError>;

    /// Newest first
    async fn list_api_keys(&self, user_id: &str) -> Result<Vec<ApiKey>, DatabaseError>;

    /// Replace the material (when given) and set the active flag
    async fn update_api_key(
        &self,
        id: &str,
        encrypted_key: Option<&str>,
        is_active: bool,
    ) -> Result<Option<ApiKey>, DatabaseError>;

    async fn delete_api_key(&self, id: &str) -> Result<bool, DatabaseError>;
}
