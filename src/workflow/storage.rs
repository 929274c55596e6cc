//! SQLite persistence layer for workflow graphs
//!
//! Workflows, nodes and connections live in three tables. Saves replace the
//! whole node/connection set of a workflow in one transaction, mirroring how
//! the editor submits its graph; loads read all three tables inside one
//! transaction so a run never sees half of a save.

use crate::{
    error::{EngineError, EngineResult},
    workflow::{
        source::WorkflowSource,
        types::{Connection, Node, Workflow},
    },
};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool},
    Row,
};
use std::{collections::HashSet, path::Path};

/// SQLite-based workflow storage manager
#[derive(Debug, Clone)]
pub struct WorkflowStorage {
    /// SQLite connection pool for the workflow database
    pool: SqlitePool,
}

impl WorkflowStorage {
    /// Create new storage instance with an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database file at `db_path`, creating it if missing
    pub async fn connect(db_path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options).await?;
        tracing::info!("🗄️ Opened workflow database: {}", db_path.display());
        Ok(Self::new(pool))
    }

    /// Initialize the workflow storage schema
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                workflow_id TEXT NOT NULL REFERENCES workflows(id) ON DELETE CASCADE,
                id TEXT NOT NULL,
                position INTEGER NOT NULL,
                node_type TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (workflow_id, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS connections (
                workflow_id TEXT NOT NULL REFERENCES workflows(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                source_node_id TEXT NOT NULL,
                target_node_id TEXT NOT NULL,
                PRIMARY KEY (workflow_id, position)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store a new workflow or replace an existing one wholesale
    ///
    /// Rejects duplicate node ids and connections whose endpoints are not
    /// nodes of this workflow before touching the database.
    pub async fn save_workflow(&self, workflow: &Workflow) -> EngineResult<()> {
        validate_membership(workflow)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO workflows (id, name, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&workflow.id)
        .bind(&workflow.name)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM connections WHERE workflow_id = ?")
            .bind(&workflow.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM nodes WHERE workflow_id = ?")
            .bind(&workflow.id)
            .execute(&mut *tx)
            .await?;

        for (position, node) in workflow.nodes.iter().enumerate() {
            let data = serde_json::to_string(&node.data)
                .map_err(|e| EngineError::Storage(e.to_string()))?;
            sqlx::query(
                "INSERT INTO nodes (workflow_id, id, position, node_type, data) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&workflow.id)
            .bind(&node.id)
            .bind(position as i64)
            .bind(&node.node_type)
            .bind(data)
            .execute(&mut *tx)
            .await?;
        }

        for (position, connection) in workflow.connections.iter().enumerate() {
            sqlx::query(
                "INSERT INTO connections (workflow_id, position, source_node_id, target_node_id) VALUES (?, ?, ?, ?)",
            )
            .bind(&workflow.id)
            .bind(position as i64)
            .bind(&connection.source)
            .bind(&connection.target)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "💾 Saved workflow '{}' ({} nodes, {} connections)",
            workflow.id,
            workflow.nodes.len(),
            workflow.connections.len()
        );
        Ok(())
    }

    /// Retrieve a workflow by ID with its nodes in insertion order
    pub async fn get_workflow(&self, id: &str) -> EngineResult<Option<Workflow>> {
        let mut tx = self.pool.begin().await?;

        let Some(row) = sqlx::query("SELECT id, name FROM workflows WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let node_rows = sqlx::query(
            "SELECT id, node_type, data FROM nodes WHERE workflow_id = ? ORDER BY position",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let connection_rows = sqlx::query(
            "SELECT source_node_id, target_node_id FROM connections WHERE workflow_id = ? ORDER BY position",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut nodes = Vec::with_capacity(node_rows.len());
        for row in node_rows {
            let data_json: String = row.get("data");
            let data: Map<String, Value> = serde_json::from_str(&data_json)
                .map_err(|e| EngineError::Storage(format!("corrupt node data: {e}")))?;
            nodes.push(Node {
                id: row.get("id"),
                node_type: row.get("node_type"),
                data,
            });
        }

        let connections = connection_rows
            .into_iter()
            .map(|row| Connection {
                source: row.get("source_node_id"),
                target: row.get("target_node_id"),
            })
            .collect();

        Ok(Some(Workflow {
            id: row.get("id"),
            name: row.get("name"),
            nodes,
            connections,
        }))
    }

    /// List all workflows with basic metadata
    pub async fn list_workflows(&self) -> EngineResult<Vec<WorkflowMetadata>> {
        let rows = sqlx::query(
            "SELECT id, name, CAST(created_at AS TEXT) AS created_at, CAST(updated_at AS TEXT) AS updated_at FROM workflows ORDER BY updated_at DESC, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| WorkflowMetadata {
                id: row.get("id"),
                name: row.get("name"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
            .collect())
    }

    /// Delete a workflow together with its nodes and connections
    pub async fn delete_workflow(&self, id: &str) -> EngineResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM connections WHERE workflow_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM nodes WHERE workflow_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl WorkflowSource for WorkflowStorage {
    async fn load_workflow(&self, workflow_id: &str) -> EngineResult<Workflow> {
        self.get_workflow(workflow_id)
            .await?
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.to_string()))
    }
}

/// Both endpoints of every connection must be nodes of the same workflow
fn validate_membership(workflow: &Workflow) -> EngineResult<()> {
    let mut ids = HashSet::with_capacity(workflow.nodes.len());
    for node in &workflow.nodes {
        if !ids.insert(node.id.as_str()) {
            return Err(EngineError::InvalidGraph {
                workflow_id: workflow.id.clone(),
                reason: format!("duplicate node id '{}'", node.id),
            });
        }
    }

    for connection in &workflow.connections {
        for endpoint in [&connection.source, &connection.target] {
            if !ids.contains(endpoint.as_str()) {
                return Err(EngineError::InvalidGraph {
                    workflow_id: workflow.id.clone(),
                    reason: format!(
                        "connection {} -> {} references unknown node '{}'",
                        connection.source, connection.target, endpoint
                    ),
                });
            }
        }
    }

    Ok(())
}

/// Basic workflow metadata for listing operations
#[derive(Debug, serde::Serialize)]
pub struct WorkflowMetadata {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}
