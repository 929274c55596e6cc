//! nodeflow server entry point
//!
//! Reads configuration from the environment and serves:
//! - Run triggers at /api/runs and /api/workflows/{workflow_id}/execute
//! - Health check at /healthz

use nodeflow::{config::Config, server::start_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (defaults to 0.0.0.0:3004 and data/nodeflow.db)
    let config = Config::default();

    start_server(config).await
}
