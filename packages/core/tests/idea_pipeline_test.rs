//! Integration tests for IdeaPipeline
//!
//! Tests cover:
//! - Generate then materialize, end to end against a real store
//! - Credential resolution order (explicit, stored, default)
//! - Ownership checks before any LLM call
//! - Partial and atomic materialization
//! - OpenAiClient against a mock HTTP server

use anyhow::Result;
use async_trait::async_trait;
use ideagraph_core::{
    db::{DatabaseError, DatabaseService, GraphStore, TursoStore},
    ApiKeyCreateRequest, ApiKeyService, CompletionRequest, CredentialVault, Edge, GenerateRequest,
    GenerationType, GraphService, Idea, IdeaPipeline, KeyDerivation, KeySource, LayoutStrategy,
    LlmClient, LlmError, MaterializeRequest, MindMap, MindMapCreateRequest, MindMapUpdate, Node,
    NodeCreateRequest, NodePosition, NodeUpdate, OpenAiClient, PipelineConfig, ServiceError,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OWNER: &str = "alice";

// =========================================================================
// Test Doubles
// =========================================================================

/// LLM stand-in that replays a fixed reply and records every request
struct StubLlm {
    reply: Result<String, fn() -> LlmError>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StubLlm {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing(error: fn() -> LlmError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for StubLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request);
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(error) => Err(error()),
        }
    }
}

/// Store wrapper whose `create_node` fails once `node_budget` nodes exist
struct FailingStore {
    inner: Arc<TursoStore>,
    node_budget: usize,
    created: AtomicUsize,
}

#[async_trait]
impl GraphStore for FailingStore {
    async fn create_mind_map(&self, mind_map: MindMap) -> Result<MindMap, DatabaseError> {
        self.inner.create_mind_map(mind_map).await
    }
    async fn get_mind_map(&self, id: &str) -> Result<Option<MindMap>, DatabaseError> {
        self.inner.get_mind_map(id).await
    }
    async fn list_mind_maps(&self, user_id: &str) -> Result<Vec<MindMap>, DatabaseError> {
        self.inner.list_mind_maps(user_id).await
    }
    async fn update_mind_map(
        &self,
        id: &str,
        update: MindMapUpdate,
    ) -> Result<Option<MindMap>, DatabaseError> {
        self.inner.update_mind_map(id, update).await
    }
    async fn soft_delete_mind_map(&self, id: &str) -> Result<bool, DatabaseError> {
        self.inner.soft_delete_mind_map(id).await
    }
    async fn create_node(&self, node: Node) -> Result<Node, DatabaseError> {
        if self.created.fetch_add(1, Ordering::SeqCst) >= self.node_budget {
            return Err(DatabaseError::sql_execution("injected failure"));
        }
        self.inner.create_node(node).await
    }
    async fn get_node(&self, id: &str) -> Result<Option<Node>, DatabaseError> {
        self.inner.get_node(id).await
    }
    async fn list_nodes(&self, mind_map_id: &str) -> Result<Vec<Node>, DatabaseError> {
        self.inner.list_nodes(mind_map_id).await
    }
    async fn update_node(
        &self,
        id: &str,
        update: NodeUpdate,
    ) -> Result<Option<Node>, DatabaseError> {
        self.inner.update_node(id, update).await
    }
    async fn delete_node(&self, id: &str) -> Result<bool, DatabaseError> {
        self.inner.delete_node(id).await
    }
    async fn batch_update_positions(
        &self,
        positions: &[NodePosition],
    ) -> Result<(), DatabaseError> {
        self.inner.batch_update_positions(positions).await
    }
    async fn create_edge(&self, edge: Edge) -> Result<Edge, DatabaseError> {
        self.inner.create_edge(edge).await
    }
    async fn get_edge(&self, id: &str) -> Result<Option<Edge>, DatabaseError> {
        self.inner.get_edge(id).await
    }
    async fn list_edges(&self, mind_map_id: &str) -> Result<Vec<Edge>, DatabaseError> {
        self.inner.list_edges(mind_map_id).await
    }
    async fn delete_edge(&self, id: &str) -> Result<bool, DatabaseError> {
        self.inner.delete_edge(id).await
    }
    async fn delete_edge_by_nodes(
        &self,
        source_id: &str,
        target_id: &str,
    ) -> Result<bool, DatabaseError> {
        self.inner.delete_edge_by_nodes(source_id, target_id).await
    }
    async fn create_nodes_and_edges(
        &self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Result<(Vec<Node>, Vec<Edge>), DatabaseError> {
        self.inner.create_nodes_and_edges(nodes, edges).await
    }
}

// =========================================================================
// Helpers
// =========================================================================

struct TestEnv {
    store: Arc<TursoStore>,
    graph: GraphService,
    api_keys: ApiKeyService,
    _temp_dir: TempDir,
}

impl TestEnv {
    async fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let db = Arc::new(DatabaseService::new(temp_dir.path().join("test.db")).await?);
        let store = Arc::new(TursoStore::new(db));
        let vault = Arc::new(CredentialVault::new("pipeline-secret", &KeyDerivation::ZeroPad)?);
        Ok(Self {
            graph: GraphService::new(store.clone()),
            api_keys: ApiKeyService::new(store.clone(), vault),
            store,
            _temp_dir: temp_dir,
        })
    }

    fn pipeline(&self, llm: Arc<StubLlm>, default_api_key: Option<&str>) -> IdeaPipeline {
        let config = PipelineConfig {
            default_api_key: default_api_key.map(str::to_string),
            ..Default::default()
        };
        IdeaPipeline::new(self.graph.clone(), self.api_keys.clone(), llm, config)
    }

    async fn create_map(&self) -> Result<MindMap> {
        Ok(self
            .graph
            .create_mind_map(
                OWNER,
                MindMapCreateRequest {
                    title: "Energy".to_string(),
                    ..Default::default()
                },
            )
            .await?)
    }

    async fn create_root(&self, mind_map_id: &str) -> Result<Node> {
        Ok(self
            .graph
            .create_node(
                OWNER,
                NodeCreateRequest {
                    mind_map_id: mind_map_id.to_string(),
                    content: "Root".to_string(),
                    ..Default::default()
                },
            )
            .await?)
    }
}

fn generate_request(mind_map_id: &str, count: i64) -> GenerateRequest {
    GenerateRequest {
        mind_map_id: mind_map_id.to_string(),
        topic: "renewable energy".to_string(),
        context: "small towns".to_string(),
        generation_type: GenerationType::New,
        count,
        api_key: Some("sk-explicit".to_string()),
    }
}

fn ideas(contents: &[&str]) -> Vec<Idea> {
    contents.iter().map(|c| Idea::new(*c)).collect()
}

// =========================================================================
// End-to-End
// =========================================================================

#[tokio::test]
async fn test_generate_and_materialize_horizontal() -> Result<()> {
    let env = TestEnv::new().await?;
    let map = env.create_map().await?;
    let llm = StubLlm::replying(r#"["Solar micro-grids","Wind co-ops","Battery recycling"]"#);
    let pipeline = env.pipeline(llm.clone(), None);

    let generated = pipeline.generate(OWNER, generate_request(&map.id, 3)).await?;
    let contents: Vec<&str> = generated.iter().map(|i| i.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["Solar micro-grids", "Wind co-ops", "Battery recycling"]
    );
    assert!(generated.iter().all(|i| i.confidence == 0.7));

    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].api_key, "sk-explicit");
    assert_eq!(
        requests[0].user_prompt,
        "Generate 3 creative ideas about: renewable energy. Context: small towns"
    );

    let materialized = pipeline
        .materialize(
            OWNER,
            MaterializeRequest {
                mind_map_id: map.id.clone(),
                parent_id: None,
                ideas: generated,
                anchor_x: 0.0,
                anchor_y: 0.0,
                layout: LayoutStrategy::Horizontal,
            },
        )
        .await?;

    assert!(materialized.edges.is_empty());
    let xs: Vec<f64> = materialized.nodes.iter().map(|n| n.position_x).collect();
    assert_eq!(xs, vec![-250.0, 0.0, 250.0]);
    assert!(materialized.nodes.iter().all(|n| n.position_y == 0.0));
    assert!(materialized.nodes.iter().all(|n| n.node_type == "idea"));

    let stored = env.graph.list_nodes(OWNER, &map.id).await?;
    assert_eq!(stored.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_materialize_under_parent_creates_idea_edges() -> Result<()> {
    let env = TestEnv::new().await?;
    let map = env.create_map().await?;
    let root = env.create_root(&map.id).await?;
    let pipeline = env.pipeline(StubLlm::replying("[]"), None);

    let materialized = pipeline
        .materialize(
            OWNER,
            MaterializeRequest {
                mind_map_id: map.id.clone(),
                parent_id: Some(root.id.clone()),
                ideas: ideas(&["Solar", "Wind"]),
                anchor_x: 100.0,
                anchor_y: 100.0,
                layout: LayoutStrategy::Radial,
            },
        )
        .await?;

    assert_eq!(materialized.nodes.len(), 2);
    assert_eq!(materialized.edges.len(), 2);
    for (node, edge) in materialized.nodes.iter().zip(&materialized.edges) {
        assert_eq!(node.parent_id.as_deref(), Some(root.id.as_str()));
        assert_eq!(edge.source_id, root.id);
        assert_eq!(edge.target_id, node.id);
        assert_eq!(edge.edge_type, "idea");

        let distance = (node.position_x - 100.0).hypot(node.position_y - 100.0);
        assert!((distance - 200.0).abs() < 1e-6);
    }
    Ok(())
}

#[tokio::test]
async fn test_materialize_empty_ideas_is_noop() -> Result<()> {
    let env = TestEnv::new().await?;
    let map = env.create_map().await?;
    let pipeline = env.pipeline(StubLlm::replying("[]"), None);

    let materialized = pipeline
        .materialize(
            OWNER,
            MaterializeRequest {
                mind_map_id: map.id.clone(),
                ..Default::default()
            },
        )
        .await?;
    assert!(materialized.nodes.is_empty());
    assert!(materialized.edges.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_generate_falls_back_to_line_parsing() -> Result<()> {
    let env = TestEnv::new().await?;
    let map = env.create_map().await?;
    let pipeline = env.pipeline(StubLlm::replying("Solar roofs\n\n  Wind co-ops  \n"), None);

    let generated = pipeline.generate(OWNER, generate_request(&map.id, 5)).await?;
    let contents: Vec<&str> = generated.iter().map(|i| i.content.as_str()).collect();
    assert_eq!(contents, vec!["Solar roofs", "Wind co-ops"]);
    Ok(())
}

#[tokio::test]
async fn test_generate_clamps_count_in_prompt() -> Result<()> {
    let env = TestEnv::new().await?;
    let map = env.create_map().await?;
    let llm = StubLlm::replying("[]");
    let pipeline = env.pipeline(llm.clone(), None);

    pipeline.generate(OWNER, generate_request(&map.id, 0)).await?;
    pipeline.generate(OWNER, generate_request(&map.id, 50)).await?;

    let requests = llm.requests();
    assert!(requests[0].user_prompt.starts_with("Generate 5 "));
    assert!(requests[1].user_prompt.starts_with("Generate 10 "));
    Ok(())
}

// =========================================================================
// Credential Resolution
// =========================================================================

#[tokio::test]
async fn test_stored_key_used_when_no_explicit_key() -> Result<()> {
    let env = TestEnv::new().await?;
    let map = env.create_map().await?;
    env.api_keys
        .create(
            OWNER,
            ApiKeyCreateRequest {
                service: "openai".to_string(),
                key: "sk-stored".to_string(),
            },
        )
        .await?;
    let llm = StubLlm::replying("[]");
    let pipeline = env.pipeline(llm.clone(), Some("sk-default"));

    let (key, source) = pipeline.resolve_api_key(OWNER, Some("")).await?;
    assert_eq!((key.as_str(), source), ("sk-stored", KeySource::Stored));

    let (key, source) = pipeline.resolve_api_key(OWNER, Some("sk-explicit")).await?;
    assert_eq!((key.as_str(), source), ("sk-explicit", KeySource::Explicit));

    pipeline
        .generate(
            OWNER,
            GenerateRequest {
                api_key: None,
                ..generate_request(&map.id, 3)
            },
        )
        .await?;
    assert_eq!(llm.requests()[0].api_key, "sk-stored");
    Ok(())
}

#[tokio::test]
async fn test_default_key_is_last_resort() -> Result<()> {
    let env = TestEnv::new().await?;
    let pipeline = env.pipeline(StubLlm::replying("[]"), Some("sk-default"));

    let (key, source) = pipeline.resolve_api_key(OWNER, None).await?;
    assert_eq!((key.as_str(), source), ("sk-default", KeySource::Default));
    Ok(())
}

#[tokio::test]
async fn test_undecryptable_stored_key_falls_through_to_default() -> Result<()> {
    let env = TestEnv::new().await?;
    let foreign = CredentialVault::new("some-other-secret", &KeyDerivation::ZeroPad)?;
    ideagraph_core::db::ApiKeyStore::upsert_api_key(
        env.store.as_ref(),
        OWNER,
        "openai",
        &foreign.encrypt("sk-foreign")?,
    )
    .await?;
    let pipeline = env.pipeline(StubLlm::replying("[]"), Some("sk-default"));

    let (key, source) = pipeline.resolve_api_key(OWNER, None).await?;
    assert_eq!((key.as_str(), source), ("sk-default", KeySource::Default));
    Ok(())
}

#[tokio::test]
async fn test_no_credential_available() -> Result<()> {
    let env = TestEnv::new().await?;
    let map = env.create_map().await?;
    let llm = StubLlm::replying("[]");
    let pipeline = env.pipeline(llm.clone(), None);

    let err = pipeline
        .generate(
            OWNER,
            GenerateRequest {
                api_key: None,
                ..generate_request(&map.id, 3)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NoCredential { .. }));
    assert!(llm.requests().is_empty());
    Ok(())
}

// =========================================================================
// Authorization and Upstream Errors
// =========================================================================

#[tokio::test]
async fn test_generate_requires_map_ownership() -> Result<()> {
    let env = TestEnv::new().await?;
    let map = env.create_map().await?;
    let llm = StubLlm::replying("[]");
    let pipeline = env.pipeline(llm.clone(), None);

    let err = pipeline
        .generate("mallory", generate_request(&map.id, 3))
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());

    let err = pipeline
        .generate(OWNER, generate_request("no-such-map", 3))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    assert!(llm.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_llm_failure_is_upstream() -> Result<()> {
    let env = TestEnv::new().await?;
    let map = env.create_map().await?;
    let pipeline = env.pipeline(StubLlm::failing(|| LlmError::Timeout), None);

    let err = pipeline
        .generate(OWNER, generate_request(&map.id, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Upstream { .. }));
    Ok(())
}

#[tokio::test]
async fn test_materialize_rejects_parent_from_other_map() -> Result<()> {
    let env = TestEnv::new().await?;
    let map = env.create_map().await?;
    let other = env.create_map().await?;
    let foreign_root = env.create_root(&other.id).await?;
    let pipeline = env.pipeline(StubLlm::replying("[]"), None);

    let err = pipeline
        .materialize(
            OWNER,
            MaterializeRequest {
                mind_map_id: map.id.clone(),
                parent_id: Some(foreign_root.id),
                ideas: ideas(&["Solar"]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert!(env.graph.list_nodes(OWNER, &map.id).await?.is_empty());
    Ok(())
}

// =========================================================================
// Partial and Atomic Materialization
// =========================================================================

#[tokio::test]
async fn test_materialize_reports_partial_progress() -> Result<()> {
    let env = TestEnv::new().await?;
    let map = env.create_map().await?;
    let root = env.create_root(&map.id).await?;

    let failing = Arc::new(FailingStore {
        inner: env.store.clone(),
        node_budget: 2,
        created: AtomicUsize::new(0),
    });
    let pipeline = IdeaPipeline::new(
        GraphService::new(failing),
        env.api_keys.clone(),
        StubLlm::replying("[]"),
        PipelineConfig::default(),
    );

    let err = pipeline
        .materialize(
            OWNER,
            MaterializeRequest {
                mind_map_id: map.id.clone(),
                parent_id: Some(root.id.clone()),
                ideas: ideas(&["One", "Two", "Three"]),
                layout: LayoutStrategy::Vertical,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    match err {
        ServiceError::PartialMaterialization {
            nodes_created,
            edges_created,
            ..
        } => {
            assert_eq!(nodes_created, 2);
            assert_eq!(edges_created, 2);
        }
        other => panic!("expected partial materialization, got {other:?}"),
    }

    // Root plus the two ideas created before the failure
    assert_eq!(env.graph.list_nodes(OWNER, &map.id).await?.len(), 3);
    assert_eq!(env.graph.list_edges(OWNER, &map.id).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_materialize_atomic_commits_everything() -> Result<()> {
    let env = TestEnv::new().await?;
    let map = env.create_map().await?;
    let root = env.create_root(&map.id).await?;
    let pipeline = env.pipeline(StubLlm::replying("[]"), None);

    let materialized = pipeline
        .materialize_atomic(
            OWNER,
            MaterializeRequest {
                mind_map_id: map.id.clone(),
                parent_id: Some(root.id.clone()),
                ideas: ideas(&["One", "Two", "Three", "Four"]),
                layout: LayoutStrategy::Grid,
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(materialized.nodes.len(), 4);
    assert_eq!(materialized.edges.len(), 4);
    assert_eq!(env.graph.list_nodes(OWNER, &map.id).await?.len(), 5);
    assert_eq!(env.graph.list_edges(OWNER, &map.id).await?.len(), 4);
    Ok(())
}

// =========================================================================
// OpenAiClient
// =========================================================================

fn client_for(server: &MockServer) -> Result<OpenAiClient> {
    let config = PipelineConfig {
        api_base_url: server.uri(),
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    };
    Ok(OpenAiClient::new(&config)?)
}

fn completion(api_key: &str) -> CompletionRequest {
    CompletionRequest {
        api_key: api_key.to_string(),
        system_prompt: "system".to_string(),
        user_prompt: "Generate 2 creative ideas about: tea. Context: ".to_string(),
    }
}

#[tokio::test]
async fn test_openai_client_returns_first_choice() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-live"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "[\"Matcha\", \"Chai\"]"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let content = client_for(&server)?.complete(completion("sk-live")).await?;
    assert_eq!(content, "[\"Matcha\", \"Chai\"]");
    Ok(())
}

#[tokio::test]
async fn test_openai_client_non_success_status() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = client_for(&server)?
        .complete(completion("sk-bad"))
        .await
        .unwrap_err();
    match err {
        LlmError::Status { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_openai_client_empty_choices() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = client_for(&server)?
        .complete(completion("sk-live"))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse));
    assert_eq!(err.to_string(), "no ideas generated");
    Ok(())
}

#[tokio::test]
async fn test_openai_client_timeout_surfaces_as_upstream() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "[\"Late\"]"}}]}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = PipelineConfig {
        api_base_url: server.uri(),
        request_timeout: Duration::from_millis(200),
        ..Default::default()
    };

    let err = OpenAiClient::new(&config)?
        .complete(completion("sk-live"))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Timeout), "got {err:?}");

    let env = TestEnv::new().await?;
    let map = env.create_map().await?;
    let pipeline = IdeaPipeline::new(
        env.graph.clone(),
        env.api_keys.clone(),
        Arc::new(OpenAiClient::new(&config)?),
        config,
    );

    let err = pipeline
        .generate(OWNER, generate_request(&map.id, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Upstream { .. }));
    assert!(err.to_string().contains("timed out"));
    Ok(())
}
