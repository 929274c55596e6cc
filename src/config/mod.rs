//! Configuration management for the nodeflow service
//!
//! Server binding, workflow database and run execution settings, read from
//! `NODEFLOW_*` environment variables with defaults for local use.

use crate::runtime::{nodes::HttpRequestSettings, runner::RetryPolicy};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, str::FromStr, time::Duration};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Run execution configuration
    pub engine: EngineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Workflow database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding workflows (default: "data/nodeflow.db")
    pub path: PathBuf,
    /// JSON file with an array of workflows saved at start-up
    pub seed_file: Option<PathBuf>,
}

/// Run execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-request timeout for HTTP request nodes, in seconds
    pub http_timeout_secs: u64,
    /// Total invocations allowed per run
    pub max_attempts: u32,
    /// Pause between invocations of a failed run, in milliseconds
    pub retry_delay_ms: u64,
    /// Reject HTTP request nodes that have no `variableName`
    pub require_variable_name: bool,
}

impl EngineConfig {
    pub fn http_settings(&self) -> HttpRequestSettings {
        HttpRequestSettings {
            timeout: Duration::from_secs(self.http_timeout_secs),
            require_variable_name: self.require_variable_name,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Parsed env var, or `default` when unset or unparseable
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("NODEFLOW_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("NODEFLOW_PORT", 3004),
            },
            database: DatabaseConfig {
                path: std::env::var("NODEFLOW_DATABASE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("data/nodeflow.db")),
                seed_file: std::env::var("NODEFLOW_SEED_FILE")
                    .ok()
                    .filter(|path| !path.trim().is_empty())
                    .map(PathBuf::from),
            },
            engine: EngineConfig {
                http_timeout_secs: env_or("NODEFLOW_HTTP_TIMEOUT_SECS", 30),
                max_attempts: env_or("NODEFLOW_MAX_ATTEMPTS", 5),
                retry_delay_ms: env_or("NODEFLOW_RETRY_DELAY_MS", 1000),
                require_variable_name: env_or("NODEFLOW_REQUIRE_VARIABLE_NAME", false),
            },
        }
    }
}
