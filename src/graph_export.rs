//! Graph export functionality for dependency visualization.
//!
//! [`Container::export_graph`] snapshots the dependency graph (services,
//! params, tags, decorators and the edges between them) together with the
//! detected cycles. The snapshot renders to Graphviz DOT or Mermaid, and to
//! JSON with the `graph-export` feature.

use crate::{Container, Key};

#[cfg(feature = "graph-export")]
use serde::{Deserialize, Serialize};

/// A node of the exported graph.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct GraphNode {
    /// Pretty node name, e.g. `@db` or `%dsn%`
    pub id: String,
    /// Node kind: service, param, tag, decorated_by_tag or decorator
    pub kind: String,
    /// Effective scope, for services
    pub scope: Option<String>,
}

/// A dependency edge; `from` depends on `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

/// Snapshot of a container's dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct GraphExport {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Closed cycles, in report order
    pub cycles: Vec<Vec<String>>,
}

impl GraphExport {
    /// Renders the graph for Graphviz.
    ///
    /// Nodes that sit on a cycle are drawn in red.
    pub fn to_dot(&self) -> String {
        let on_cycle = |id: &str| self.cycles.iter().any(|c| c.iter().any(|n| n == id));

        let mut output = String::new();
        output.push_str("digraph DependencyGraph {\n");
        output.push_str("  rankdir=TB;\n");
        output.push_str("  node [shape=box];\n\n");

        for node in &self.nodes {
            let shape = match node.kind.as_str() {
                "service" => "box",
                "param" => "note",
                _ => "ellipse",
            };
            let color = if on_cycle(&node.id) {
                "salmon"
            } else {
                match node.scope.as_deref() {
                    Some("shared") => "lightblue",
                    Some("contextual") => "lightgreen",
                    Some("non_shared") => "lightyellow",
                    _ => "white",
                }
            };
            let label = match &node.scope {
                Some(scope) => format!("{}\\n({})", escape(&node.id), scope),
                None => escape(&node.id),
            };
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\", shape={}, fillcolor={}, style=filled];\n",
                escape(&node.id),
                label,
                shape,
                color
            ));
        }

        output.push('\n');

        for edge in &self.edges {
            output.push_str(&format!("  \"{}\" -> \"{}\";\n", escape(&edge.from), escape(&edge.to)));
        }

        output.push_str("}\n");
        output
    }

    /// Renders the graph as a Mermaid flowchart.
    ///
    /// Node names are not valid Mermaid ids, so nodes are numbered in
    /// order and labelled with their name.
    pub fn to_mermaid(&self) -> String {
        let position = |id: &str| self.nodes.iter().position(|n| n.id == id);

        let mut output = String::new();
        output.push_str("graph TD\n");

        for (i, node) in self.nodes.iter().enumerate() {
            let label = node.id.replace('"', "#quot;");
            match node.kind.as_str() {
                "service" => output.push_str(&format!("  n{}[\"{}\"]\n", i, label)),
                "param" => output.push_str(&format!("  n{}[/\"{}\"/]\n", i, label)),
                _ => output.push_str(&format!("  n{}(\"{}\")\n", i, label)),
            }
        }

        for edge in &self.edges {
            if let (Some(from), Some(to)) = (position(&edge.from), position(&edge.to)) {
                output.push_str(&format!("  n{} --> n{}\n", from, to));
            }
        }

        output.push_str("\n  classDef shared fill:#e1f5fe\n");
        output.push_str("  classDef contextual fill:#e8f5e8\n");
        output.push_str("  classDef non_shared fill:#fff3e0\n");

        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(scope) = &node.scope {
                output.push_str(&format!("  class n{} {}\n", i, scope));
            }
        }

        output
    }

    /// Serializes the snapshot as pretty-printed JSON.
    #[cfg(feature = "graph-export")]
    pub fn to_json(&self) -> crate::DiResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::DiError::msg(format!("graph serialization failed: {}", e)))
    }
}

fn escape(id: &str) -> String {
    id.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Container {
    /// Snapshots the dependency graph of the current configuration.
    pub fn export_graph(&self) -> GraphExport {
        let state = self.inner.state.read_recursive();
        let warm = state.warm();
        let graph = warm.graph();

        let nodes = graph
            .nodes()
            .into_iter()
            .map(|key| GraphNode {
                id: key.to_string(),
                kind: key.kind().to_string(),
                scope: key.as_service().and_then(|id| warm.scope(id)).map(|scope| scope.to_string()),
            })
            .collect();
        let edges = graph
            .edges()
            .into_iter()
            .map(|(from, to)| GraphEdge {
                from: from.to_string(),
                to: to.to_string(),
            })
            .collect();
        let cycles = warm
            .cycles()
            .iter()
            .map(|cycle| cycle.iter().map(Key::to_string).collect())
            .collect();

        GraphExport { nodes, edges, cycles }
    }
}
