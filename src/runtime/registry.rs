//! Executor registry
//!
//! Immutable `NodeType -> executor` map, built once at start-up and handed to
//! the orchestrator. There is no way to mutate it afterwards.

use crate::{
    error::{EngineError, EngineResult},
    runtime::{
        executor::NodeExecutor,
        nodes::{HttpRequestExecutor, HttpRequestSettings, ManualTriggerExecutor},
    },
    workflow::types::NodeType,
};
use std::{collections::HashMap, fmt, sync::Arc};

pub struct ExecutorRegistry {
    executors: HashMap<NodeType, Arc<dyn NodeExecutor>>,
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("node_types", &self.node_types())
            .finish()
    }
}

impl ExecutorRegistry {
    pub fn builder() -> ExecutorRegistryBuilder {
        ExecutorRegistryBuilder::default()
    }

    /// Registry with an executor for every [`NodeType`]
    ///
    /// Adding a variant to `NodeType` without deciding its executor here is a
    /// compile error.
    pub fn standard(settings: &HttpRequestSettings) -> Result<Self, reqwest::Error> {
        let trigger: Arc<dyn NodeExecutor> = Arc::new(ManualTriggerExecutor);
        let http: Arc<dyn NodeExecutor> = Arc::new(HttpRequestExecutor::new(settings)?);

        let mut builder = Self::builder();
        for node_type in NodeType::ALL {
            let executor = match node_type {
                NodeType::Initial | NodeType::ManualTrigger => Arc::clone(&trigger),
                NodeType::HttpRequest => Arc::clone(&http),
            };
            builder = builder.register_shared(node_type, executor);
        }
        Ok(builder.build())
    }

    /// Look up the executor for a persisted type tag
    ///
    /// Tags that are not a known [`NodeType`] and known types without a
    /// registered executor both fail with [`EngineError::UnknownNodeType`].
    pub fn resolve(&self, type_tag: &str, node_id: &str) -> EngineResult<Arc<dyn NodeExecutor>> {
        let unknown = || EngineError::UnknownNodeType {
            node_id: node_id.to_string(),
            node_type: type_tag.to_string(),
        };
        let node_type: NodeType = type_tag.parse().map_err(|_| unknown())?;
        self.executors
            .get(&node_type)
            .cloned()
            .ok_or_else(unknown)
    }

    /// Registered node types, in declaration order
    pub fn node_types(&self) -> Vec<NodeType> {
        NodeType::ALL
            .into_iter()
            .filter(|node_type| self.executors.contains_key(node_type))
            .collect()
    }
}

#[derive(Default)]
pub struct ExecutorRegistryBuilder {
    executors: HashMap<NodeType, Arc<dyn NodeExecutor>>,
}

impl ExecutorRegistryBuilder {
    /// Map `node_type` to `executor`, replacing any earlier mapping
    pub fn register<E>(self, node_type: NodeType, executor: E) -> Self
    where
        E: NodeExecutor + 'static,
    {
        self.register_shared(node_type, Arc::new(executor))
    }

    pub fn register_shared(mut self, node_type: NodeType, executor: Arc<dyn NodeExecutor>) -> Self {
        self.executors.insert(node_type, executor);
        self
    }

    pub fn build(self) -> ExecutorRegistry {
        tracing::debug!("🧩 Executor registry built with {} node types", self.executors.len());
        ExecutorRegistry {
            executors: self.executors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_covers_every_node_type() {
        let registry = ExecutorRegistry::standard(&HttpRequestSettings::default()).unwrap();
        assert_eq!(registry.node_types(), NodeType::ALL.to_vec());
        for node_type in NodeType::ALL {
            assert!(registry.resolve(node_type.as_tag(), "n").is_ok());
        }
    }

    #[test]
    fn unknown_tag_is_reported_with_node() {
        let registry = ExecutorRegistry::standard(&HttpRequestSettings::default()).unwrap();
        match registry.resolve("SEND_EMAIL", "mailer") {
            Err(EngineError::UnknownNodeType { node_id, node_type }) => {
                assert_eq!(node_id, "mailer");
                assert_eq!(node_type, "SEND_EMAIL");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("SEND_EMAIL must not resolve"),
        }
    }

    #[test]
    fn known_type_without_mapping_is_unknown() {
        let registry = ExecutorRegistry::builder()
            .register(NodeType::ManualTrigger, ManualTriggerExecutor)
            .build();

        assert!(registry.resolve("MANUAL_TRIGGER", "t").is_ok());
        let err = registry.resolve("HTTP_REQUEST", "h").err().unwrap();
        assert!(matches!(err, EngineError::UnknownNodeType { .. }));
        assert!(!err.is_retriable());
        assert_eq!(registry.node_types(), vec![NodeType::ManualTrigger]);
    }
}
