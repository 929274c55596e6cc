//! Core workflow type definitions
//!
//! Defines workflows, nodes and connections as they are persisted by the editor,
//! plus the trigger event and run result exchanged with the outside world.
//! These types are serialized/deserialized from camelCase JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// Context threaded through a run. No schema: keys are a namespace shared by
/// every executor of the run.
pub type Context = Map<String, Value>;

/// A complete workflow definition: an ordered node list and its connections
///
/// Node order is insertion order and is significant: the scheduler uses it to
/// break ties between nodes that are ready at the same time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique workflow identifier
    pub id: String,
    /// Human-readable workflow name
    pub name: String,
    /// Nodes in insertion order
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Directed connections between nodes of this workflow
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// A single node in the workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier within the workflow
    pub id: String,
    /// Persisted type tag (e.g. "HTTP_REQUEST"). Kept as the raw tag so an
    /// unknown type reaches the executor registry and fails there with a
    /// message naming the node.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Node configuration, validated by its executor
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Directed edge `source -> target` between two nodes of the same workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Upstream node ID
    pub source: String,
    /// Downstream node ID
    pub target: String,
}

/// Node types the engine knows how to execute
///
/// Closed set: adding a variant forces every exhaustive `match` over it
/// (notably the standard executor table) to handle the new type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    /// Placeholder node the editor creates in an empty workflow
    Initial,
    /// Entry point fired by a user from the editor
    ManualTrigger,
    /// Outbound HTTP call
    /// Expected data: { "endpoint": "https://...", "method": "POST", "body": "{...}", "variableName": "res" }
    HttpRequest,
}

impl NodeType {
    /// Every variant, in declaration order
    pub const ALL: [NodeType; 3] = [
        NodeType::Initial,
        NodeType::ManualTrigger,
        NodeType::HttpRequest,
    ];

    /// Persisted tag for this type
    pub fn as_tag(&self) -> &'static str {
        match self {
            NodeType::Initial => "INITIAL",
            NodeType::ManualTrigger => "MANUAL_TRIGGER",
            NodeType::HttpRequest => "HTTP_REQUEST",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Tag that does not name any [`NodeType`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTag(pub String);

impl FromStr for NodeType {
    type Err = UnknownTag;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|kind| kind.as_tag() == tag)
            .ok_or_else(|| UnknownTag(tag.to_string()))
    }
}

/// Event that starts a run
///
/// `workflowId` is optional on the wire so that its absence can be reported as
/// a fatal run error instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub initial_data: Option<Context>,
}

impl TriggerEvent {
    /// Event for `workflow_id` with an optional initial payload
    pub fn new(workflow_id: impl Into<String>, initial_data: Option<Context>) -> Self {
        Self {
            workflow_id: Some(workflow_id.into()),
            initial_data,
        }
    }
}

/// Successful run output: `{ workflowId, result }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub workflow_id: String,
    pub result: Context,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_type_tags_parse_back() {
        for kind in NodeType::ALL {
            assert_eq!(kind.as_tag().parse::<NodeType>(), Ok(kind));
        }
        assert_eq!(
            "UNKNOWN_TYPE".parse::<NodeType>(),
            Err(UnknownTag("UNKNOWN_TYPE".into()))
        );
    }

    #[test]
    fn workflow_deserializes_editor_json() {
        let workflow: Workflow = serde_json::from_value(json!({
            "id": "wf-1",
            "name": "Fetch todos",
            "nodes": [
                { "id": "a", "type": "MANUAL_TRIGGER" },
                { "id": "b", "type": "HTTP_REQUEST", "data": { "endpoint": "https://example.com" } }
            ],
            "connections": [{ "source": "a", "target": "b" }]
        }))
        .unwrap();

        assert_eq!(workflow.nodes[0].node_type, "MANUAL_TRIGGER");
        assert!(workflow.nodes[0].data.is_empty());
        assert_eq!(workflow.nodes[1].data["endpoint"], "https://example.com");
        assert_eq!(workflow.connections[0].target, "b");
    }

    #[test]
    fn trigger_event_tolerates_missing_fields() {
        let event: TriggerEvent = serde_json::from_value(json!({})).unwrap();
        assert_eq!(event, TriggerEvent::default());

        let event: TriggerEvent =
            serde_json::from_value(json!({ "workflowId": "wf", "initialData": { "x": 1 } }))
                .unwrap();
        assert_eq!(event.workflow_id.as_deref(), Some("wf"));
        assert_eq!(event.initial_data.unwrap()["x"], 1);
    }
}
