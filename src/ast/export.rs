//! Graph export for parse trees.
//!
//! Maps a tree to a directed graph payload: one record per node (labelled
//! with its kind), one boxed record per terminal (labelled with the JSON
//! string form of the text) and one edge per parent/child relation. The
//! payload serializes to JSON for graph drawing front ends and also renders
//! as Graphviz DOT.

use serde::{Deserialize, Serialize};

use crate::ast::{Child, Node};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub directed: bool,
    pub edges: Vec<Edge>,
    pub nodes: Vec<GraphNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub name: usize,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub tail: usize,
    pub head: usize,
}

impl Graph {
    /// Builds the graph payload for a tree. Identifiers start at 1 and are
    /// assigned in depth-first, left-to-right order.
    pub fn from_node(root: &Node) -> Graph {
        let mut builder = GraphBuilder::default();
        let id = builder.next_id();
        builder.visit(root, id);
        Graph {
            directed: true,
            edges: builder.edges,
            nodes: builder.nodes,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Renders the graph in Graphviz DOT syntax.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph ast {\n");
        for node in &self.nodes {
            out.push_str(&format!(
                "  n{} [label={}",
                node.name,
                dot_quote(&node.attributes.label)
            ));
            if let Some(shape) = &node.attributes.shape {
                out.push_str(&format!(", shape={}", shape));
            }
            out.push_str("];\n");
        }
        for edge in &self.edges {
            out.push_str(&format!("  n{} -> n{};\n", edge.tail, edge.head));
        }
        out.push_str("}\n");
        out
    }
}

#[derive(Default)]
struct GraphBuilder {
    last_id: usize,
    edges: Vec<Edge>,
    nodes: Vec<GraphNode>,
}

impl GraphBuilder {
    fn next_id(&mut self) -> usize {
        self.last_id += 1;
        self.last_id
    }

    fn visit(&mut self, node: &Node, id: usize) {
        self.nodes.push(GraphNode {
            name: id,
            attributes: Attributes {
                label: node.kind.clone(),
                shape: None,
            },
        });
        for child in &node.children {
            let cid = self.next_id();
            self.edges.push(Edge { tail: id, head: cid });
            match child {
                Child::Node(n) => self.visit(n, cid),
                Child::Text(t) => self.nodes.push(GraphNode {
                    name: cid,
                    attributes: Attributes {
                        label: terminal_label(t),
                        shape: Some("box".to_string()),
                    },
                }),
            }
        }
    }
}

fn terminal_label(text: &str) -> String {
    // Serializing a str cannot fail.
    serde_json::to_string(text).unwrap_or_else(|_| format!("{:?}", text))
}

fn dot_quote(label: &str) -> String {
    let mut out = String::with_capacity(label.len() + 2);
    out.push('"');
    for ch in label.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_and_terminals_become_graph_records() {
        let tree = node!("Definition", node!("Label", "start"), node!("String", "x"));
        let graph = Graph::from_node(&tree);

        assert!(graph.directed);
        assert_eq!(graph.nodes.len(), 5);
        assert_eq!(graph.edges.len(), 4);

        let labels: Vec<_> = graph
            .nodes
            .iter()
            .map(|n| n.attributes.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Definition", "Label", "\"start\"", "String", "\"x\""]);
        assert_eq!(graph.edges[0], Edge { tail: 1, head: 2 });
        assert_eq!(graph.edges[1], Edge { tail: 2, head: 3 });
        assert_eq!(graph.edges[2], Edge { tail: 1, head: 4 });
    }

    #[test]
    fn terminals_are_boxed() {
        let graph = Graph::from_node(&node!("String", "a"));
        assert_eq!(graph.nodes[0].attributes.shape, None);
        assert_eq!(graph.nodes[1].attributes.shape.as_deref(), Some("box"));
    }

    #[test]
    fn dot_output_lists_nodes_then_edges() {
        let graph = Graph::from_node(&node!("Dot"));
        assert_eq!(graph.to_dot(), "digraph ast {\n  n1 [label=\"Dot\"];\n}\n");
    }
}
