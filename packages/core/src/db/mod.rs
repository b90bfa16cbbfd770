//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Connection management and schema initialization (`DatabaseService`)
//! - Persistence traits consumed by the services (`GraphStore`, `ApiKeyStore`)
//! - The libsql implementation of those traits (`TursoStore`)
//!
//! # Architecture
//!
//! `DatabaseService` owns raw SQL and returns rows or affected-row counts.
//! `TursoStore` converts rows into models. Ownership and validation are
//! enforced one layer up, in `services`.

mod database;
mod error;
mod graph_store;
mod turso_store;

pub use database::{
    DatabaseService, DbCreateEdgeParams, DbCreateMindMapParams, DbCreateNodeParams,
    DbUpdateMindMapParams, DbUpdateNodeParams,
};
pub use error::DatabaseError;
pub use graph_store::{ApiKeyStore, GraphStore};
pub use turso_store::TursoStore;
