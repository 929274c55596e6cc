//! Server setup and initialization
//!
//! Wires together storage, the executor registry, the execution engine, the
//! run driver and the HTTP routes.

use crate::{
    api::{create_run_routes, RunsState},
    config::Config,
    runtime::{ExecutionEngine, ExecutorRegistry, WorkflowRunner},
    workflow::{storage::WorkflowStorage, types::Workflow},
};
use anyhow::{Context as _, Result};
use axum::{routing::get, Router};
use std::{path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Create the main Axum application with all routes
///
/// Opens (and if needed creates) the workflow database, applies the seed
/// file, builds the executor registry and engine, and mounts the routes.
pub async fn create_app(config: Config) -> Result<Router> {
    if let Some(data_dir) = config
        .database
        .path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
    {
        tracing::info!("📁 Ensuring data directory exists: {}", data_dir.display());
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
    }

    tracing::info!("📋 Initializing workflow storage");
    let storage = WorkflowStorage::connect(&config.database.path).await?;
    storage.init_schema().await?;

    if let Some(seed_file) = &config.database.seed_file {
        let seeded = seed_workflows(&storage, seed_file).await?;
        tracing::info!("🌱 Seeded {} workflows from {}", seeded, seed_file.display());
    }

    tracing::info!("⚙️ Initializing executor registry");
    let registry = ExecutorRegistry::standard(&config.engine.http_settings())
        .context("Failed to initialize HTTP client")?;
    tracing::debug!("🧩 Registered node types: {:?}", registry.node_types());

    tracing::info!("🚀 Initializing execution engine");
    let engine = ExecutionEngine::new(Arc::new(storage), Arc::new(registry));
    let runner = WorkflowRunner::new(Arc::new(engine), config.engine.retry_policy());
    tracing::debug!("🔁 Retry policy: {:?}", runner.policy());

    let app = create_router(Arc::new(runner));
    tracing::info!("✅ Application initialized successfully");
    Ok(app)
}

/// Mount the health check and run routes over `runner`
pub fn create_router(runner: Arc<WorkflowRunner>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .merge(create_run_routes().with_state(RunsState { runner }))
}

/// Save every workflow listed in the JSON array at `seed_file`
///
/// Returns how many workflows were saved.
pub async fn seed_workflows(storage: &WorkflowStorage, seed_file: &Path) -> Result<usize> {
    let raw = tokio::fs::read_to_string(seed_file)
        .await
        .with_context(|| format!("Failed to read seed file {}", seed_file.display()))?;
    let workflows: Vec<Workflow> = serde_json::from_str(&raw)
        .with_context(|| format!("Seed file {} is not a workflow array", seed_file.display()))?;

    for workflow in &workflows {
        storage
            .save_workflow(workflow)
            .await
            .with_context(|| format!("Failed to seed workflow {}", workflow.id))?;
        tracing::debug!("🌱 Seeded workflow: {} ({})", workflow.id, workflow.name);
    }
    Ok(workflows.len())
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting nodeflow server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
