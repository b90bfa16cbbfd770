//! Graph Service - Mind map, node and edge operations
//!
//! Business logic layer over [`GraphStore`]:
//!
//! - Validation of required fields before any store access
//! - Ownership: only the owner of a mind map may mutate it or anything in it
//! - Read access: the owner, or anyone when the map is public
//! - Soft delete of mind maps; soft-deleted maps behave as missing everywhere
//! - Atomic batch position updates
//!
//! Every operation takes the authenticated caller's user ID as its first
//! argument. Authentication itself happens outside this crate.

use crate::db::GraphStore;
use crate::models::{
    require_non_empty, Edge, EdgeCreateRequest, MindMap, MindMapCreateRequest, MindMapDetails,
    MindMapStatus, MindMapUpdate, Node, NodeCreateRequest, NodePosition, NodeUpdate,
    ValidationError,
};
use crate::services::error::ServiceError;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct GraphService {
    store: Arc<dyn GraphStore>,
}

impl GraphService {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Underlying store, for callers that already enforced ownership
    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    //
    // ACCESS HELPERS
    //

    async fn load_mind_map(&self, id: &str) -> Result<MindMap, ServiceError> {
        self.store
            .get_mind_map(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("mind map", id))
    }

    /// Load a map the caller owns (`NotFound`, then `Unauthorized`)
    pub async fn owned_mind_map(&self, caller: &str, id: &str) -> Result<MindMap, ServiceError> {
        let mind_map = self.load_mind_map(id).await?;
        if !mind_map.is_owned_by(caller) {
            return Err(ServiceError::unauthorized(format!(
                "user {} does not own mind map {}",
                caller, id
            )));
        }
        Ok(mind_map)
    }

    /// Load a map the caller may read (owner or public)
    pub async fn readable_mind_map(
        &self,
        caller: &str,
        id: &str,
    ) -> Result<MindMap, ServiceError> {
        let mind_map = self.load_mind_map(id).await?;
        if !mind_map.is_readable_by(caller) {
            return Err(ServiceError::unauthorized(format!(
                "user {} cannot read mind map {}",
                caller, id
            )));
        }
        Ok(mind_map)
    }

    async fn load_node(&self, id: &str) -> Result<Node, ServiceError> {
        self.store
            .get_node(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("node", id))
    }

    async fn load_edge(&self, id: &str) -> Result<Edge, ServiceError> {
        self.store
            .get_edge(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("edge", id))
    }

    /// Load a node in a map the caller owns
    async fn owned_node(&self, caller: &str, id: &str) -> Result<Node, ServiceError> {
        let node = self.load_node(id).await?;
        self.owned_mind_map(caller, &node.mind_map_id).await?;
        Ok(node)
    }

    //
    // MIND MAPS
    //

    pub async fn create_mind_map(
        &self,
        owner: &str,
        request: MindMapCreateRequest,
    ) -> Result<MindMap, ServiceError> {
        require_non_empty(owner, "user_id")?;
        require_non_empty(&request.title, "title")?;

        let now = Utc::now();
        let mind_map = MindMap {
            id: Uuid::new_v4().to_string(),
            user_id: owner.to_string(),
            title: request.title,
            description: request.description,
            is_public: request.is_public,
            status: MindMapStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let created = self.store.create_mind_map(mind_map).await?;
        tracing::debug!("Created mind map {} for user {}", created.id, owner);
        Ok(created)
    }

    pub async fn list_mind_maps(&self, owner: &str) -> Result<Vec<MindMap>, ServiceError> {
        Ok(self.store.list_mind_maps(owner).await?)
    }

    pub async fn get_mind_map(&self, caller: &str, id: &str) -> Result<MindMap, ServiceError> {
        self.readable_mind_map(caller, id).await
    }

    /// Map plus every node and edge it contains
    pub async fn get_mind_map_details(
        &self,
        caller: &str,
        id: &str,
    ) -> Result<MindMapDetails, ServiceError> {
        let mind_map = self.readable_mind_map(caller, id).await?;
        let nodes = self.store.list_nodes(id).await?;
        let edges = self.store.list_edges(id).await?;
        Ok(MindMapDetails {
            mind_map,
            nodes,
            edges,
        })
    }

    /// Owner-only coalescing update; empty strings keep the stored value
    pub async fn update_mind_map(
        &self,
        caller: &str,
        id: &str,
        update: MindMapUpdate,
    ) -> Result<MindMap, ServiceError> {
        let current = self.owned_mind_map(caller, id).await?;
        let status = update.status;

        match self.store.update_mind_map(id, update).await? {
            Some(updated) => Ok(updated),
            // Status moved to `deleted`: the row is now invisible to reads
            None if status == Some(MindMapStatus::Deleted) => Ok(MindMap {
                status: MindMapStatus::Deleted,
                updated_at: Utc::now(),
                ..current
            }),
            None => Err(ServiceError::not_found("mind map", id)),
        }
    }

    /// Owner-only soft delete; a second delete reports `NotFound`
    pub async fn delete_mind_map(&self, caller: &str, id: &str) -> Result<(), ServiceError> {
        self.owned_mind_map(caller, id).await?;

        if !self.store.soft_delete_mind_map(id).await? {
            return Err(ServiceError::not_found("mind map", id));
        }

        tracing::info!("Soft-deleted mind map {}", id);
        Ok(())
    }

    //
    // NODES
    //

    /// Owner-only node creation
    ///
    /// A `parent_id`, when given, must name a node of the same map.
    pub async fn create_node(
        &self,
        caller: &str,
        request: NodeCreateRequest,
    ) -> Result<Node, ServiceError> {
        require_non_empty(&request.mind_map_id, "mind_map_id")?;
        require_non_empty(&request.content, "content")?;
        if !request.position_x.is_finite() || !request.position_y.is_finite() {
            return Err(ValidationError::invalid("position", "must be finite").into());
        }

        self.owned_mind_map(caller, &request.mind_map_id).await?;

        let request = NodeCreateRequest {
            parent_id: request.parent_id.filter(|p| !p.is_empty()),
            ..request
        };

        if let Some(parent_id) = &request.parent_id {
            match self.store.get_node(parent_id).await? {
                Some(parent) if parent.mind_map_id == request.mind_map_id => {}
                _ => return Err(ValidationError::InvalidParent(parent_id.clone()).into()),
            }
        }

        Ok(self.store.create_node(request.into_node()).await?)
    }

    pub async fn list_nodes(&self, caller: &str, mind_map_id: &str) -> Result<Vec<Node>, ServiceError> {
        self.readable_mind_map(caller, mind_map_id).await?;
        Ok(self.store.list_nodes(mind_map_id).await?)
    }

    pub async fn get_node(&self, caller: &str, id: &str) -> Result<Node, ServiceError> {
        let node = self.load_node(id).await?;
        self.readable_mind_map(caller, &node.mind_map_id).await?;
        Ok(node)
    }

    /// Owner-only coalescing update (see [`NodeUpdate::normalized`])
    pub async fn update_node(
        &self,
        caller: &str,
        id: &str,
        update: NodeUpdate,
    ) -> Result<Node, ServiceError> {
        let coordinates = [update.position_x, update.position_y];
        if coordinates.iter().flatten().any(|c| !c.is_finite()) {
            return Err(ValidationError::invalid("position", "must be finite").into());
        }

        let current = self.owned_node(caller, id).await?;

        let update = update.normalized();
        if update.is_empty() {
            return Ok(current);
        }

        self.store
            .update_node(id, update)
            .await?
            .ok_or_else(|| ServiceError::not_found("node", id))
    }

    /// Owner-only physical delete, cascading to children and incident edges
    pub async fn delete_node(&self, caller: &str, id: &str) -> Result<(), ServiceError> {
        self.owned_node(caller, id).await?;

        if !self.store.delete_node(id).await? {
            return Err(ServiceError::not_found("node", id));
        }
        Ok(())
    }

    /// Move many nodes at once; all positions persist or none do
    ///
    /// The caller must own the map of every referenced node.
    pub async fn batch_update_positions(
        &self,
        caller: &str,
        positions: &[NodePosition],
    ) -> Result<(), ServiceError> {
        if positions.is_empty() {
            return Err(ValidationError::missing("positions").into());
        }

        let mut checked_maps = HashSet::new();
        for position in positions {
            require_non_empty(&position.id, "id")?;
            if !position.position_x.is_finite() || !position.position_y.is_finite() {
                return Err(ValidationError::invalid(
                    "position",
                    format!("non-finite coordinates for node {}", position.id),
                )
                .into());
            }

            let node = self.load_node(&position.id).await?;
            if checked_maps.insert(node.mind_map_id.clone()) {
                self.owned_mind_map(caller, &node.mind_map_id).await?;
            }
        }

        self.store.batch_update_positions(positions).await?;
        tracing::debug!("Updated {} node positions", positions.len());
        Ok(())
    }

    //
    // EDGES
    //

    /// Owner-only edge creation
    ///
    /// Both endpoints must exist in the named map. A second edge for the same
    /// (source, target) pair is rejected by the store.
    pub async fn create_edge(
        &self,
        caller: &str,
        request: EdgeCreateRequest,
    ) -> Result<Edge, ServiceError> {
        require_non_empty(&request.mind_map_id, "mind_map_id")?;
        require_non_empty(&request.source_id, "source_id")?;
        require_non_empty(&request.target_id, "target_id")?;

        self.owned_mind_map(caller, &request.mind_map_id).await?;

        for endpoint in [&request.source_id, &request.target_id] {
            match self.store.get_node(endpoint).await? {
                Some(node) if node.mind_map_id == request.mind_map_id => {}
                _ => return Err(ValidationError::InvalidEndpoint(endpoint.clone()).into()),
            }
        }

        Ok(self.store.create_edge(request.into_edge()).await?)
    }

    pub async fn list_edges(&self, caller: &str, mind_map_id: &str) -> Result<Vec<Edge>, ServiceError> {
        self.readable_mind_map(caller, mind_map_id).await?;
        Ok(self.store.list_edges(mind_map_id).await?)
    }

    pub async fn get_edge(&self, caller: &str, id: &str) -> Result<Edge, ServiceError> {
        let edge = self.load_edge(id).await?;
        self.readable_mind_map(caller, &edge.mind_map_id).await?;
        Ok(edge)
    }

    pub async fn delete_edge(&self, caller: &str, id: &str) -> Result<(), ServiceError> {
        let edge = self.load_edge(id).await?;
        self.owned_mind_map(caller, &edge.mind_map_id).await?;

        if !self.store.delete_edge(id).await? {
            return Err(ServiceError::not_found("edge", id));
        }
        Ok(())
    }

    /// Delete the edge from `source_id` to `target_id`
    ///
    /// Ownership is checked through the source node's map.
    pub async fn delete_edge_by_nodes(
        &self,
        caller: &str,
        source_id: &str,
        target_id: &str,
    ) -> Result<(), ServiceError> {
        self.owned_node(caller, source_id).await?;

        if !self.store.delete_edge_by_nodes(source_id, target_id).await? {
            return Err(ServiceError::not_found(
                "edge",
                format!("{} -> {}", source_id, target_id),
            ));
        }
        Ok(())
    }
}
