//! Idea Pipeline - LLM-generated ideas materialized as graph nodes
//!
//! Two steps, usually called back to back:
//!
//! 1. [`IdeaPipeline::generate`]: resolve a credential, render the prompt,
//!    call the LLM and normalize its reply into [`Idea`]s
//! 2. [`IdeaPipeline::materialize`]: lay the ideas out around an anchor and
//!    create one node per idea (plus a parent → child edge when a parent is
//!    given)
//!
//! # Credential Resolution
//!
//! First non-empty wins: the explicit key on the request, then the caller's
//! active stored `openai` key, then the configured default key.
//!
//! # Partial Failure
//!
//! `materialize` creates rows one at a time and does not roll back: on a
//! store failure it returns [`ServiceError::PartialMaterialization`] with
//! the number of nodes and edges already created. `materialize_atomic`
//! creates everything in one transaction instead.

use crate::config::PipelineConfig;
use crate::models::{require_non_empty, Edge, Idea, Node, ValidationError};
use crate::services::api_key_service::{ApiKeyService, OPENAI_SERVICE};
use crate::services::error::ServiceError;
use crate::services::graph_service::GraphService;
use crate::services::layout::{LayoutEngine, LayoutStrategy};
use crate::services::llm::{CompletionRequest, LlmClient};
use crate::services::normalizer::ResponseNormalizer;
use crate::services::prompt::GenerationType;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_IDEA_COUNT: usize = 5;
pub const MAX_IDEA_COUNT: usize = 10;

/// Node and edge type given to materialized ideas
pub const IDEA_TYPE: &str = "idea";

/// Clamp a requested idea count: non-positive means the default, the
/// maximum caps everything else
pub fn clamp_count(requested: i64) -> usize {
    if requested <= 0 {
        DEFAULT_IDEA_COUNT
    } else {
        (requested as usize).min(MAX_IDEA_COUNT)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub mind_map_id: String,
    pub topic: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub generation_type: GenerationType,
    /// Clamped with [`clamp_count`]
    #[serde(default)]
    pub count: i64,
    /// Explicit credential; overrides stored and default keys
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializeRequest {
    pub mind_map_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub ideas: Vec<Idea>,
    #[serde(default)]
    pub anchor_x: f64,
    #[serde(default)]
    pub anchor_y: f64,
    #[serde(default)]
    pub layout: LayoutStrategy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Materialized {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Where the credential for a generation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Explicit,
    Stored,
    Default,
}

pub struct IdeaPipeline {
    graph: GraphService,
    api_keys: ApiKeyService,
    llm: Arc<dyn LlmClient>,
    normalizer: ResponseNormalizer,
    layout: LayoutEngine,
    config: PipelineConfig,
}

impl IdeaPipeline {
    pub fn new(
        graph: GraphService,
        api_keys: ApiKeyService,
        llm: Arc<dyn LlmClient>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            graph,
            api_keys,
            llm,
            normalizer: ResponseNormalizer::default(),
            layout: LayoutEngine,
            config,
        }
    }

    pub fn with_normalizer(mut self, normalizer: ResponseNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Pick the credential for `caller`
    ///
    /// A stored key that fails to decrypt is skipped with a warning so the
    /// default key can still be used.
    pub async fn resolve_api_key(
        &self,
        caller: &str,
        explicit: Option<&str>,
    ) -> Result<(String, KeySource), ServiceError> {
        if let Some(key) = explicit.filter(|k| !k.is_empty()) {
            return Ok((key.to_string(), KeySource::Explicit));
        }

        match self.api_keys.decrypted_key(caller, OPENAI_SERVICE).await {
            Ok(Some(key)) if !key.is_empty() => return Ok((key, KeySource::Stored)),
            Ok(_) => {}
            Err(ServiceError::Decryption(e)) => {
                tracing::warn!(
                    "Ignoring undecryptable {} key for user {}: {}",
                    OPENAI_SERVICE,
                    caller,
                    e
                );
            }
            Err(e) => return Err(e),
        }

        match self.config.default_api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => Ok((key.to_string(), KeySource::Default)),
            None => Err(ServiceError::no_credential(OPENAI_SERVICE)),
        }
    }

    /// Ask the LLM for ideas about `request.topic`
    ///
    /// # Errors
    ///
    /// - `Validation` if the mind map ID is missing
    /// - `NotFound` / `Unauthorized` unless the caller owns the map
    /// - `NoCredential` if no key can be resolved
    /// - `Upstream` on transport failure, timeout, non-2xx or empty choices
    pub async fn generate(
        &self,
        caller: &str,
        request: GenerateRequest,
    ) -> Result<Vec<Idea>, ServiceError> {
        require_non_empty(&request.mind_map_id, "mind_map_id")?;
        self.graph
            .owned_mind_map(caller, &request.mind_map_id)
            .await?;

        let count = clamp_count(request.count);
        let (api_key, source) = self
            .resolve_api_key(caller, request.api_key.as_deref())
            .await?;
        tracing::debug!(
            "Resolved API key for user {} from {:?} source",
            caller,
            source
        );

        let user_prompt =
            request
                .generation_type
                .render_prompt(&request.topic, &request.context, count);

        let raw = self
            .llm
            .complete(CompletionRequest {
                api_key,
                system_prompt: self.config.system_prompt.clone(),
                user_prompt,
            })
            .await?;

        let normalized = self.normalizer.normalize_detailed(&raw, count);

        tracing::info!(
            "Generated {} ideas ({} requested, {:?}) for mind map {}",
            normalized.ideas.len(),
            count,
            normalized.strategy,
            request.mind_map_id
        );

        Ok(normalized.ideas)
    }

    /// Validate the request and build (unsaved) nodes and edges
    async fn plan(
        &self,
        caller: &str,
        request: &MaterializeRequest,
    ) -> Result<(Vec<Node>, Option<String>), ServiceError> {
        require_non_empty(&request.mind_map_id, "mind_map_id")?;
        for (i, idea) in request.ideas.iter().enumerate() {
            if idea.content.trim().is_empty() {
                return Err(ValidationError::missing(format!("ideas[{}].content", i)).into());
            }
        }
        if !request.anchor_x.is_finite() || !request.anchor_y.is_finite() {
            return Err(ValidationError::invalid("anchor", "must be finite").into());
        }

        self.graph
            .owned_mind_map(caller, &request.mind_map_id)
            .await?;

        let parent_id = request.parent_id.clone().filter(|p| !p.is_empty());
        if let Some(parent_id) = &parent_id {
            match self.graph.store().get_node(parent_id).await? {
                Some(parent) if parent.mind_map_id == request.mind_map_id => {}
                _ => return Err(ValidationError::InvalidParent(parent_id.clone()).into()),
            }
        }

        let positions = self.layout.compute_positions(
            request.anchor_x,
            request.anchor_y,
            request.ideas.len(),
            request.layout,
        );

        let nodes = request
            .ideas
            .iter()
            .zip(positions)
            .map(|(idea, position)| {
                Node::new(
                    request.mind_map_id.clone(),
                    idea.content.clone(),
                    position.x,
                    position.y,
                )
                .with_parent(parent_id.clone())
                .with_node_type(IDEA_TYPE)
            })
            .collect();

        Ok((nodes, parent_id))
    }

    fn idea_edge(mind_map_id: &str, parent_id: &str, child_id: &str) -> Edge {
        Edge::new(mind_map_id, parent_id, child_id).with_edge_type(IDEA_TYPE)
    }

    /// Create one node per idea, and a parent → node edge when a parent is set
    ///
    /// Rows are created sequentially without an enclosing transaction. On a
    /// store failure, everything created so far stays and the error reports
    /// how much that was.
    pub async fn materialize(
        &self,
        caller: &str,
        request: MaterializeRequest,
    ) -> Result<Materialized, ServiceError> {
        let (planned, parent_id) = self.plan(caller, &request).await?;
        let store = self.graph.store();

        let mut result = Materialized {
            nodes: Vec::with_capacity(planned.len()),
            edges: Vec::new(),
        };

        for node in planned {
            let node = match store.create_node(node).await {
                Ok(node) => node,
                Err(source) => return Err(partial_failure(&request, &result, source)),
            };
            let node_id = node.id.clone();
            result.nodes.push(node);

            if let Some(parent_id) = &parent_id {
                let edge = Self::idea_edge(&request.mind_map_id, parent_id, &node_id);
                match store.create_edge(edge).await {
                    Ok(edge) => result.edges.push(edge),
                    Err(source) => return Err(partial_failure(&request, &result, source)),
                }
            }
        }

        tracing::info!(
            "Materialized {} nodes and {} edges in mind map {}",
            result.nodes.len(),
            result.edges.len(),
            request.mind_map_id
        );
        Ok(result)
    }

    /// Same as [`materialize`](Self::materialize), but all-or-nothing
    pub async fn materialize_atomic(
        &self,
        caller: &str,
        request: MaterializeRequest,
    ) -> Result<Materialized, ServiceError> {
        let (nodes, parent_id) = self.plan(caller, &request).await?;

        let edges = match &parent_id {
            Some(parent_id) => nodes
                .iter()
                .map(|node| Self::idea_edge(&request.mind_map_id, parent_id, &node.id))
                .collect(),
            None => Vec::new(),
        };

        let (nodes, edges) = self
            .graph
            .store()
            .create_nodes_and_edges(nodes, edges)
            .await?;

        tracing::info!(
            "Atomically materialized {} nodes and {} edges in mind map {}",
            nodes.len(),
            edges.len(),
            request.mind_map_id
        );
        Ok(Materialized { nodes, edges })
    }
}

fn partial_failure(
    request: &MaterializeRequest,
    done: &Materialized,
    source: crate::db::DatabaseError,
) -> ServiceError {
    tracing::warn!(
        "Materialization in mind map {} stopped after {} nodes and {} edges: {}",
        request.mind_map_id,
        done.nodes.len(),
        done.edges.len(),
        source
    );
    ServiceError::PartialMaterialization {
        nodes_created: done.nodes.len(),
        edges_created: done.edges.len(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_count() {
        assert_eq!(clamp_count(0), 5);
        assert_eq!(clamp_count(-3), 5);
        assert_eq!(clamp_count(1), 1);
        assert_eq!(clamp_count(7), 7);
        assert_eq!(clamp_count(10), 10);
        assert_eq!(clamp_count(11), 10);
        assert_eq!(clamp_count(i64::MAX), 10);
    }

    #[test]
    fn test_generate_request_never_serializes_api_key() {
        let request = GenerateRequest {
            mind_map_id: "m".to_string(),
            topic: "t".to_string(),
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
