//! Topological scheduler
//!
//! Linearizes a workflow graph with Kahn's algorithm over a petgraph DiGraph.
//! Graph node indices follow the workflow's node insertion order, and the
//! ready set always yields its lowest index first, so the same workflow is
//! always scheduled the same way.

use crate::{
    error::{EngineError, EngineResult},
    workflow::types::{Node, Workflow},
};
use petgraph::{
    graph::{DiGraph, NodeIndex},
    Direction,
};
use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};

/// Compute the execution order for `workflow`
///
/// Every connection `u -> v` places `u` before `v`. Nodes that become ready
/// together run in insertion order. Fails with [`EngineError::CyclicGraph`]
/// when some nodes can never become ready.
pub fn topological_sort(workflow: &Workflow) -> EngineResult<Vec<Node>> {
    let graph = build_graph(workflow)?;

    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|idx| graph.neighbors_directed(idx, Direction::Incoming).count())
        .collect();

    let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph
        .node_indices()
        .filter(|idx| in_degree[idx.index()] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(workflow.nodes.len());
    while let Some(Reverse(idx)) = ready.pop() {
        order.push(idx);
        // One entry per connection, so parallel connections are counted and
        // released symmetrically.
        for successor in graph.neighbors_directed(idx, Direction::Outgoing) {
            let degree = &mut in_degree[successor.index()];
            *degree -= 1;
            if *degree == 0 {
                ready.push(Reverse(successor));
            }
        }
    }

    if order.len() < workflow.nodes.len() {
        let unscheduled: Vec<String> = graph
            .node_indices()
            .filter(|idx| in_degree[idx.index()] > 0)
            .map(|idx| workflow.nodes[graph[idx]].id.clone())
            .collect();
        tracing::error!(
            "❌ Workflow '{}' contains a cycle, unscheduled nodes: {:?}",
            workflow.id,
            unscheduled
        );
        return Err(EngineError::CyclicGraph {
            workflow_id: workflow.id.clone(),
            unscheduled,
        });
    }

    let ordered: Vec<Node> = order
        .into_iter()
        .map(|idx| workflow.nodes[graph[idx]].clone())
        .collect();
    tracing::debug!(
        "📋 Execution order for '{}': {:?}",
        workflow.id,
        ordered.iter().map(|node| node.id.as_str()).collect::<Vec<_>>()
    );
    Ok(ordered)
}

/// Build a DiGraph whose node weights are positions in `workflow.nodes`
fn build_graph(workflow: &Workflow) -> EngineResult<DiGraph<usize, ()>> {
    let mut graph = DiGraph::with_capacity(workflow.nodes.len(), workflow.connections.len());
    let mut node_id_to_index: HashMap<&str, NodeIndex> = HashMap::new();

    for (position, node) in workflow.nodes.iter().enumerate() {
        let idx = graph.add_node(position);
        if node_id_to_index.insert(node.id.as_str(), idx).is_some() {
            return Err(EngineError::InvalidGraph {
                workflow_id: workflow.id.clone(),
                reason: format!("duplicate node id '{}'", node.id),
            });
        }
    }

    for connection in &workflow.connections {
        let resolve = |id: &str| {
            node_id_to_index
                .get(id)
                .copied()
                .ok_or_else(|| EngineError::InvalidGraph {
                    workflow_id: workflow.id.clone(),
                    reason: format!(
                        "connection {} -> {} references unknown node '{}'",
                        connection.source, connection.target, id
                    ),
                })
        };
        let from = resolve(&connection.source)?;
        let to = resolve(&connection.target)?;
        graph.add_edge(from, to, ());
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::Connection;

    fn workflow(nodes: &[&str], connections: &[(&str, &str)]) -> Workflow {
        Workflow {
            id: "wf".to_string(),
            name: "test".to_string(),
            nodes: nodes
                .iter()
                .map(|id| Node {
                    id: id.to_string(),
                    node_type: "INITIAL".to_string(),
                    data: Default::default(),
                })
                .collect(),
            connections: connections
                .iter()
                .map(|(source, target)| Connection {
                    source: source.to_string(),
                    target: target.to_string(),
                })
                .collect(),
        }
    }

    fn ids(order: &[Node]) -> Vec<&str> {
        order.iter().map(|node| node.id.as_str()).collect()
    }

    fn assert_respects_connections(workflow: &Workflow, order: &[Node]) {
        let position = |id: &str| order.iter().position(|node| node.id == id).unwrap();
        assert_eq!(order.len(), workflow.nodes.len());
        for connection in &workflow.connections {
            assert!(
                position(&connection.source) < position(&connection.target),
                "{} must precede {}",
                connection.source,
                connection.target
            );
        }
    }

    #[test]
    fn linear_chain_is_ordered_regardless_of_insertion() {
        let wf = workflow(&["c", "b", "a"], &[("a", "b"), ("b", "c")]);
        let order = topological_sort(&wf).unwrap();
        assert_eq!(ids(&order), vec!["a", "b", "c"]);
    }

    #[test]
    fn fan_out_follows_insertion_order() {
        let wf = workflow(&["A", "B", "C", "D"], &[("A", "B"), ("B", "C"), ("B", "D")]);
        assert_eq!(ids(&topological_sort(&wf).unwrap()), vec!["A", "B", "C", "D"]);

        let wf = workflow(&["A", "B", "D", "C"], &[("A", "B"), ("B", "C"), ("B", "D")]);
        assert_eq!(ids(&topological_sort(&wf).unwrap()), vec!["A", "B", "D", "C"]);
    }

    #[test]
    fn isolated_nodes_and_disconnected_subgraphs_are_scheduled() {
        let wf = workflow(
            &["solo", "x2", "y1", "x1", "y2"],
            &[("x1", "x2"), ("y1", "y2")],
        );
        let order = topological_sort(&wf).unwrap();
        assert_eq!(ids(&order), vec!["solo", "y1", "x1", "x2", "y2"]);
        assert_respects_connections(&wf, &order);
    }

    #[test]
    fn fan_in_and_parallel_connections() {
        let wf = workflow(
            &["join", "left", "right", "root"],
            &[
                ("root", "left"),
                ("root", "right"),
                ("left", "join"),
                ("right", "join"),
                ("left", "join"),
            ],
        );
        let order = topological_sort(&wf).unwrap();
        assert_eq!(ids(&order), vec!["root", "left", "right", "join"]);
    }

    #[test]
    fn diamond_with_shortcut_respects_every_connection() {
        let wf = workflow(
            &["e", "d", "c", "b", "a"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "e"), ("a", "e")],
        );
        let order = topological_sort(&wf).unwrap();
        assert_respects_connections(&wf, &order);
    }

    #[test]
    fn scheduling_is_deterministic() {
        let wf = workflow(
            &["n5", "n1", "n4", "n2", "n3", "n0"],
            &[("n0", "n3"), ("n1", "n3"), ("n2", "n4"), ("n3", "n5")],
        );
        let first = topological_sort(&wf).unwrap();
        for _ in 0..10 {
            assert_eq!(topological_sort(&wf).unwrap(), first);
        }
    }

    #[test]
    fn cycle_fails_with_unscheduled_nodes() {
        let wf = workflow(
            &["start", "a", "b", "c"],
            &[("start", "a"), ("a", "b"), ("b", "c"), ("c", "a")],
        );
        match topological_sort(&wf) {
            Err(EngineError::CyclicGraph {
                workflow_id,
                unscheduled,
            }) => {
                assert_eq!(workflow_id, "wf");
                assert_eq!(unscheduled, vec!["a", "b", "c"]);
            }
            other => panic!("expected CyclicGraph, got {other:?}"),
        }
    }

    #[test]
    fn nodes_downstream_of_a_cycle_are_reported_as_unscheduled() {
        let wf = workflow(&["a", "b", "c"], &[("a", "b"), ("b", "a"), ("b", "c")]);
        let err = topological_sort(&wf).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Workflow 'wf' contains a cycle; unscheduled nodes: [a, b, c]"
        );
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let wf = workflow(&["a"], &[("a", "a")]);
        assert!(matches!(
            topological_sort(&wf),
            Err(EngineError::CyclicGraph { .. })
        ));
    }

    #[test]
    fn dangling_connection_and_duplicate_ids_are_invalid() {
        let wf = workflow(&["a"], &[("a", "ghost")]);
        assert!(matches!(
            topological_sort(&wf),
            Err(EngineError::InvalidGraph { .. })
        ));

        let wf = workflow(&["a", "a"], &[]);
        assert!(matches!(
            topological_sort(&wf),
            Err(EngineError::InvalidGraph { .. })
        ));
    }

    #[test]
    fn empty_workflow_schedules_nothing() {
        let wf = workflow(&[], &[]);
        assert!(topological_sort(&wf).unwrap().is_empty());
    }
}
