//! Development Idea Generation Binary
//!
//! Runs the full pipeline once against a local database: generate ideas for
//! a topic, lay them out and materialize them into a mind map, then print
//! the created nodes and edges as JSON.
//!
//! # Usage
//!
//! ```bash
//! API_KEY_ENCRYPTION_KEY=dev-secret OPENAI_API_KEY=sk-... \
//!     cargo run --bin dev-generate -- --topic "urban gardening" --layout radial
//!
//! # Expand an existing node in an existing map
//! cargo run --bin dev-generate -- --map <id> --parent <node-id> --type expand --count 3
//! ```
//!
//! Run with `--help` for the full argument list.
//!
//! # Environment Variables
//!
//! See [`AppConfig::from_env`]. `RUST_LOG` controls log output.
//!
//! **DEVELOPMENT ONLY**: no authentication, the `--user` flag is trusted.

use std::convert::Infallible;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use ideagraph_core::db::{DatabaseService, TursoStore};
use ideagraph_core::{
    ApiKeyService, AppConfig, CredentialVault, GenerateRequest, GenerationType, GraphService,
    IdeaPipeline, LayoutStrategy, MaterializeRequest, MindMapCreateRequest, OpenAiClient,
};

#[derive(Parser, Debug)]
#[command(name = "dev-generate")]
#[command(about = "Generate ideas for a topic and materialize them into a mind map")]
#[command(version)]
struct Args {
    /// Topic text
    #[arg(long, default_value = "new product ideas")]
    topic: String,

    /// Extra context appended to the prompt
    #[arg(long, default_value = "")]
    context: String,

    /// Acting user ID (trusted, no authentication)
    #[arg(long, default_value = "dev-user")]
    user: String,

    /// Existing mind map ID; a new map is created when omitted
    #[arg(long)]
    map: Option<String>,

    /// Parent node to attach ideas to
    #[arg(long)]
    parent: Option<String>,

    /// radial | horizontal | vertical | grid
    #[arg(long, default_value = "grid", value_parser = parse_layout)]
    layout: LayoutStrategy,

    /// new | expand | improve | branch
    #[arg(long = "type", default_value = "new", value_parser = parse_generation_type)]
    generation_type: GenerationType,

    /// Number of ideas; non-positive means 5, capped at 10
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    count: i64,

    /// Explicit key, overrides stored and default keys
    #[arg(long)]
    api_key: Option<String>,
}

fn parse_layout(name: &str) -> Result<LayoutStrategy, Infallible> {
    Ok(LayoutStrategy::parse(name))
}

fn parse_generation_type(name: &str) -> Result<GenerationType, Infallible> {
    Ok(GenerationType::parse(name))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,ideagraph_core=debug")),
        )
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env().context("invalid configuration")?;

    tracing::info!("IdeaGraph dev-generate");
    tracing::info!("Database: {}", config.database_path.display());
    tracing::info!("Model: {} at {}", config.pipeline.model, config.pipeline.api_base_url);

    let db = Arc::new(DatabaseService::new(config.database_path.clone()).await?);
    let store = Arc::new(TursoStore::new(db));
    let vault = Arc::new(CredentialVault::new(
        &config.vault.secret,
        &config.vault.key_derivation,
    )?);

    let graph = GraphService::new(store.clone());
    let api_keys = ApiKeyService::new(store, vault);
    let llm = Arc::new(OpenAiClient::new(&config.pipeline)?);
    let pipeline = IdeaPipeline::new(graph.clone(), api_keys, llm, config.pipeline.clone());

    let user = args.user.as_str();

    let mind_map_id = match &args.map {
        Some(id) => graph.get_mind_map(user, id).await?.id,
        None => {
            let created = graph
                .create_mind_map(
                    user,
                    MindMapCreateRequest {
                        title: args.topic.clone(),
                        ..Default::default()
                    },
                )
                .await?;
            tracing::info!("Created mind map {}", created.id);
            created.id
        }
    };

    let ideas = pipeline
        .generate(
            user,
            GenerateRequest {
                mind_map_id: mind_map_id.clone(),
                topic: args.topic,
                context: args.context,
                generation_type: args.generation_type,
                count: args.count,
                api_key: args.api_key,
            },
        )
        .await?;

    if ideas.is_empty() {
        bail!("model returned no usable ideas");
    }

    let materialized = pipeline
        .materialize(
            user,
            MaterializeRequest {
                mind_map_id: mind_map_id.clone(),
                parent_id: args.parent,
                ideas,
                anchor_x: 0.0,
                anchor_y: 0.0,
                layout: args.layout,
            },
        )
        .await?;

    println!("{}", serde_json::to_string_pretty(&materialized)?);
    tracing::info!(
        "Done: {} nodes, {} edges in mind map {}",
        materialized.nodes.len(),
        materialized.edges.len(),
        mind_map_id
    );

    Ok(())
}
