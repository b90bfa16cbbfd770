//! Integration tests for GraphService
//!
//! Tests cover:
//! - Ownership and public read access
//! - Soft delete of mind maps
//! - Coalescing updates
//! - Atomic batch position updates
//! - Edge uniqueness and endpoint validation
//! - Cascading node deletion

use anyhow::Result;
use ideagraph_core::{
    db::{DatabaseService, TursoStore},
    EdgeCreateRequest, GraphService, MindMap, MindMapCreateRequest, MindMapStatus, MindMapUpdate,
    NodeCreateRequest, NodePosition, NodeUpdate, ServiceError, ValidationError,
};
use std::sync::Arc;
use tempfile::TempDir;

const OWNER: &str = "alice";
const STRANGER: &str = "mallory";

/// Test helper: Create a test environment
async fn create_test_env() -> Result<(GraphService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let db = Arc::new(DatabaseService::new(db_path).await?);
    let service = GraphService::new(Arc::new(TursoStore::new(db)));
    Ok((service, temp_dir))
}

async fn create_map(service: &GraphService, is_public: bool) -> Result<MindMap> {
    Ok(service
        .create_mind_map(
            OWNER,
            MindMapCreateRequest {
                title: "Energy".to_string(),
                description: "Renewables".to_string(),
                is_public,
            },
        )
        .await?)
}

fn node_request(mind_map_id: &str, content: &str, x: f64, y: f64) -> NodeCreateRequest {
    NodeCreateRequest {
        mind_map_id: mind_map_id.to_string(),
        content: content.to_string(),
        position_x: x,
        position_y: y,
        ..Default::default()
    }
}

fn edge_request(mind_map_id: &str, source_id: &str, target_id: &str) -> EdgeCreateRequest {
    EdgeCreateRequest {
        mind_map_id: mind_map_id.to_string(),
        source_id: source_id.to_string(),
        target_id: target_id.to_string(),
        ..Default::default()
    }
}

// =========================================================================
// Mind Map Tests
// =========================================================================

#[tokio::test]
async fn test_create_mind_map_requires_title() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;

    let err = service
        .create_mind_map(OWNER, MindMapCreateRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::MissingField(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_private_map_hidden_from_other_users() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let map = create_map(&service, false).await?;

    assert_eq!(service.get_mind_map(OWNER, &map.id).await?.id, map.id);

    let err = service.get_mind_map(STRANGER, &map.id).await.unwrap_err();
    assert!(err.is_unauthorized());
    Ok(())
}

#[tokio::test]
async fn test_public_map_readable_but_not_writable() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let map = create_map(&service, true).await?;
    let node = service
        .create_node(OWNER, node_request(&map.id, "Solar", 10.0, 20.0))
        .await?;

    let other = service
        .create_node(OWNER, node_request(&map.id, "Wind", 50.0, 20.0))
        .await?;
    let edge = service
        .create_edge(OWNER, edge_request(&map.id, &node.id, &other.id))
        .await?;

    let details = service.get_mind_map_details(STRANGER, &map.id).await?;
    assert_eq!(details.nodes.len(), 2);
    assert_eq!(service.get_node(STRANGER, &node.id).await?.content, "Solar");
    assert_eq!(service.get_edge(STRANGER, &edge.id).await?.id, edge.id);

    let err = service
        .update_node(
            STRANGER,
            &node.id,
            NodeUpdate {
                content: Some("Defaced".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert!(service.delete_node(STRANGER, &node.id).await.unwrap_err().is_unauthorized());
    assert!(service.delete_edge(STRANGER, &edge.id).await.unwrap_err().is_unauthorized());

    // Nothing changed
    assert_eq!(service.get_node(OWNER, &node.id).await?.content, "Solar");
    assert_eq!(service.list_edges(OWNER, &map.id).await?.len(), 1);

    let err = service
        .create_node(STRANGER, node_request(&map.id, "Wind", 0.0, 0.0))
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());

    let err = service
        .update_mind_map(
            STRANGER,
            &map.id,
            MindMapUpdate {
                title: Some("Hijacked".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    Ok(())
}

#[tokio::test]
async fn test_update_mind_map_coalesces_empty_strings() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let map = create_map(&service, false).await?;

    let updated = service
        .update_mind_map(
            OWNER,
            &map.id,
            MindMapUpdate {
                title: Some(String::new()),
                description: Some("Storage too".to_string()),
                is_public: Some(true),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(updated.title, "Energy");
    assert_eq!(updated.description, "Storage too");
    assert!(updated.is_public);
    Ok(())
}

#[tokio::test]
async fn test_soft_deleted_map_behaves_as_missing() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let map = create_map(&service, true).await?;
    let other = create_map(&service, false).await?;

    service.delete_mind_map(OWNER, &map.id).await?;

    assert!(service.get_mind_map(OWNER, &map.id).await.unwrap_err().is_not_found());
    assert!(service.list_nodes(OWNER, &map.id).await.unwrap_err().is_not_found());
    assert!(service.delete_mind_map(OWNER, &map.id).await.unwrap_err().is_not_found());

    let listed = service.list_mind_maps(OWNER).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, other.id);
    Ok(())
}

#[tokio::test]
async fn test_status_update_to_deleted_soft_deletes() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let map = create_map(&service, false).await?;

    let updated = service
        .update_mind_map(
            OWNER,
            &map.id,
            MindMapUpdate {
                status: Some(MindMapStatus::Deleted),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.status, MindMapStatus::Deleted);
    assert!(service.get_mind_map(OWNER, &map.id).await.unwrap_err().is_not_found());
    Ok(())
}

// =========================================================================
// Node Tests
// =========================================================================

#[tokio::test]
async fn test_create_node_applies_defaults() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let map = create_map(&service, false).await?;

    let node = service
        .create_node(OWNER, node_request(&map.id, "Solar", 1.5, -2.5))
        .await?;

    assert_eq!(node.node_type, "default");
    assert_eq!(node.style_data, serde_json::json!({}));
    assert_eq!(node.metadata, serde_json::json!({}));
    assert_eq!(node.parent_id, None);

    let listed = service.list_nodes(OWNER, &map.id).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].position_x, 1.5);
    assert_eq!(listed[0].position_y, -2.5);
    Ok(())
}

#[tokio::test]
async fn test_create_node_rejects_parent_from_other_map() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let map = create_map(&service, false).await?;
    let other = create_map(&service, false).await?;
    let foreign = service
        .create_node(OWNER, node_request(&other.id, "Elsewhere", 0.0, 0.0))
        .await?;

    let err = service
        .create_node(
            OWNER,
            NodeCreateRequest {
                parent_id: Some(foreign.id.clone()),
                ..node_request(&map.id, "Child", 0.0, 0.0)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::InvalidParent(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_create_node_in_missing_map() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;

    let err = service
        .create_node(OWNER, node_request("no-such-map", "Orphan", 0.0, 0.0))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn test_update_node_keeps_zero_valued_fields() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let map = create_map(&service, false).await?;
    let node = service
        .create_node(OWNER, node_request(&map.id, "Solar", 40.0, 60.0))
        .await?;

    let updated = service
        .update_node(
            OWNER,
            &node.id,
            NodeUpdate {
                content: Some(String::new()),
                position_x: Some(0.0),
                position_y: Some(75.0),
                node_type: Some("note".to_string()),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(updated.content, "Solar");
    assert_eq!(updated.position_x, 40.0);
    assert_eq!(updated.position_y, 75.0);
    assert_eq!(updated.node_type, "note");

    let unchanged = service
        .update_node(OWNER, &node.id, NodeUpdate::default())
        .await?;
    assert_eq!(unchanged.position_y, 75.0);
    Ok(())
}

#[tokio::test]
async fn test_update_node_rejects_non_finite_position() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let map = create_map(&service, false).await?;
    let node = service
        .create_node(OWNER, node_request(&map.id, "Solar", 40.0, 60.0))
        .await?;

    for (x, y) in [(Some(f64::NAN), None), (None, Some(f64::INFINITY))] {
        let err = service
            .update_node(
                OWNER,
                &node.id,
                NodeUpdate {
                    position_x: x,
                    position_y: y,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::InvalidField { .. })
        ));
    }

    let stored = service.get_node(OWNER, &node.id).await?;
    assert_eq!((stored.position_x, stored.position_y), (40.0, 60.0));
    Ok(())
}

#[tokio::test]
async fn test_delete_node_cascades_to_children_and_edges() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let map = create_map(&service, false).await?;
    let root = service
        .create_node(OWNER, node_request(&map.id, "Root", 0.0, 0.0))
        .await?;
    let child = service
        .create_node(
            OWNER,
            NodeCreateRequest {
                parent_id: Some(root.id.clone()),
                ..node_request(&map.id, "Child", 100.0, 0.0)
            },
        )
        .await?;
    let sibling = service
        .create_node(OWNER, node_request(&map.id, "Sibling", 0.0, 100.0))
        .await?;
    service
        .create_edge(OWNER, edge_request(&map.id, &root.id, &sibling.id))
        .await?;

    service.delete_node(OWNER, &root.id).await?;

    let remaining = service.list_nodes(OWNER, &map.id).await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, sibling.id);
    assert!(service.get_node(OWNER, &child.id).await.unwrap_err().is_not_found());
    assert!(service.list_edges(OWNER, &map.id).await?.is_empty());
    Ok(())
}

// =========================================================================
// Batch Position Tests
// =========================================================================

#[tokio::test]
async fn test_batch_update_positions() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let map = create_map(&service, false).await?;
    let a = service
        .create_node(OWNER, node_request(&map.id, "A", 1.0, 1.0))
        .await?;
    let b = service
        .create_node(OWNER, node_request(&map.id, "B", 2.0, 2.0))
        .await?;

    service
        .batch_update_positions(
            OWNER,
            &[
                NodePosition::new(&a.id, 0.0, 0.0),
                NodePosition::new(&b.id, -30.0, 45.5),
            ],
        )
        .await?;

    let a = service.get_node(OWNER, &a.id).await?;
    let b = service.get_node(OWNER, &b.id).await?;
    assert_eq!((a.position_x, a.position_y), (0.0, 0.0));
    assert_eq!((b.position_x, b.position_y), (-30.0, 45.5));
    Ok(())
}

#[tokio::test]
async fn test_batch_update_with_unknown_node_changes_nothing() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let map = create_map(&service, false).await?;
    let a = service
        .create_node(OWNER, node_request(&map.id, "A", 1.0, 1.0))
        .await?;

    let err = service
        .batch_update_positions(
            OWNER,
            &[
                NodePosition::new(&a.id, 500.0, 500.0),
                NodePosition::new("ghost", 1.0, 1.0),
            ],
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let a = service.get_node(OWNER, &a.id).await?;
    assert_eq!((a.position_x, a.position_y), (1.0, 1.0));
    Ok(())
}

#[tokio::test]
async fn test_batch_update_requires_ownership_of_every_map() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let mine = create_map(&service, false).await?;
    let theirs = service
        .create_mind_map(
            STRANGER,
            MindMapCreateRequest {
                title: "Theirs".to_string(),
                ..Default::default()
            },
        )
        .await?;
    let a = service
        .create_node(OWNER, node_request(&mine.id, "A", 1.0, 1.0))
        .await?;
    let b = service
        .create_node(STRANGER, node_request(&theirs.id, "B", 2.0, 2.0))
        .await?;

    let err = service
        .batch_update_positions(
            OWNER,
            &[
                NodePosition::new(&a.id, 9.0, 9.0),
                NodePosition::new(&b.id, 9.0, 9.0),
            ],
        )
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());

    assert_eq!(service.get_node(OWNER, &a.id).await?.position_x, 1.0);
    Ok(())
}

#[tokio::test]
async fn test_batch_update_rejects_empty_batch() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;

    let err = service.batch_update_positions(OWNER, &[]).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    Ok(())
}

// =========================================================================
// Edge Tests
// =========================================================================

#[tokio::test]
async fn test_duplicate_edge_rejected() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let map = create_map(&service, false).await?;
    let a = service
        .create_node(OWNER, node_request(&map.id, "A", 0.0, 0.0))
        .await?;
    let b = service
        .create_node(OWNER, node_request(&map.id, "B", 0.0, 0.0))
        .await?;

    let edge = service
        .create_edge(OWNER, edge_request(&map.id, &a.id, &b.id))
        .await?;
    assert_eq!(edge.edge_type, "default");

    let err = service
        .create_edge(OWNER, edge_request(&map.id, &a.id, &b.id))
        .await
        .unwrap_err();
    assert!(err.is_store_error());

    // Reverse direction is a distinct edge
    service
        .create_edge(OWNER, edge_request(&map.id, &b.id, &a.id))
        .await?;
    assert_eq!(service.list_edges(OWNER, &map.id).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_edge_endpoints_must_belong_to_map() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let map = create_map(&service, false).await?;
    let other = create_map(&service, false).await?;
    let a = service
        .create_node(OWNER, node_request(&map.id, "A", 0.0, 0.0))
        .await?;
    let foreign = service
        .create_node(OWNER, node_request(&other.id, "F", 0.0, 0.0))
        .await?;

    let err = service
        .create_edge(OWNER, edge_request(&map.id, &a.id, &foreign.id))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::InvalidEndpoint(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_delete_edge_by_nodes() -> Result<()> {
    let (service, _temp_dir) = create_test_env().await?;
    let map = create_map(&service, false).await?;
    let a = service
        .create_node(OWNER, node_request(&map.id, "A", 0.0, 0.0))
        .await?;
    let b = service
        .create_node(OWNER, node_request(&map.id, "B", 0.0, 0.0))
        .await?;
    service
        .create_edge(OWNER, edge_request(&map.id, &a.id, &b.id))
        .await?;

    let err = service
        .delete_edge_by_nodes(STRANGER, &a.id, &b.id)
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());

    service.delete_edge_by_nodes(OWNER, &a.id, &b.id).await?;
    assert!(service.list_edges(OWNER, &map.id).await?.is_empty());

    let err = service
        .delete_edge_by_nodes(OWNER, &a.id, &b.id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}
