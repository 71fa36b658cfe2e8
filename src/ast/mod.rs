//! AST module for fixedpoint
//!
//! This module provides the uniform tree node produced by the PEG engine and
//! consumed by grammar compilation and graph export. Grammar tables are
//! written with the same node type, which is what lets the meta-grammar
//! describe itself.

// ============================================================================
// IMPORTS
// ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Represents a span in the source text, as byte offsets.
///
/// # Examples
///
/// ```rust
/// use fixedpoint::ast::Span;
/// let span = Span { start: 0, end: 5 };
/// assert_eq!(span.len(), 5);
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A tree node: a `kind` tag and an ordered list of children.
///
/// Nodes built by a parse carry the span they were built from; nodes written
/// by hand (grammar tables) do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: String,
    pub children: Vec<Child>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

/// A child of a [`Node`]: either another node or a terminal text value.
///
/// Child nodes are shared read-only so that memoized parse results can be
/// reused by several parents without copying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Child {
    Node(Arc<Node>),
    Text(String),
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Node {
    /// Builds a node without source information.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fixedpoint::ast::{Child, Node};
    /// let n = Node::new("Label", vec![Child::from("start")]);
    /// assert_eq!(n.kind, "Label");
    /// assert_eq!(n.text(), "start");
    /// assert!(n.span.is_none());
    /// ```
    pub fn new(kind: impl Into<String>, children: Vec<Child>) -> Self {
        Self {
            kind: kind.into(),
            children,
            span: None,
        }
    }

    /// Builds a node tagged with the input range it was built from.
    pub fn spanned(kind: impl Into<String>, children: Vec<Child>, span: Span) -> Self {
        Self {
            kind: kind.into(),
            children,
            span: Some(span),
        }
    }

    /// Iterates over the node children only, skipping terminals.
    pub fn child_nodes(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter_map(Child::as_node)
    }

    /// Iterates over the terminal children only, skipping nodes.
    pub fn child_texts(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(Child::as_text)
    }

    /// Returns the first child node of the given kind.
    pub fn find(&self, kind: &str) -> Option<&Node> {
        self.child_nodes().find(|n| n.kind == kind)
    }

    /// Concatenation of every terminal below this node, left to right.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    /// Returns a copy of this tree with every span removed.
    ///
    /// Useful to compare a parsed tree against a hand-written one.
    pub fn without_spans(&self) -> Node {
        Node {
            kind: self.kind.clone(),
            children: self
                .children
                .iter()
                .map(|child| match child {
                    Child::Node(n) => Child::Node(Arc::new(n.without_spans())),
                    Child::Text(t) => Child::Text(t.clone()),
                })
                .collect(),
            span: None,
        }
    }

    /// Renders the tree as an indented outline, one node or terminal per line.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.pretty_into(&mut out, 0);
        out
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Child::Node(n) => n.collect_text(out),
                Child::Text(t) => out.push_str(t),
            }
        }
    }

    fn pretty_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&indent);
        out.push_str(&self.kind);
        if let Some(span) = self.span {
            out.push_str(&format!(" @{}..{}", span.start, span.end));
        }
        out.push('\n');
        for child in &self.children {
            match child {
                Child::Node(n) => n.pretty_into(out, depth + 1),
                Child::Text(t) => {
                    out.push_str(&"  ".repeat(depth + 1));
                    out.push_str(&format!("{:?}\n", t));
                }
            }
        }
    }
}

impl Child {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Child::Node(n) => Some(n),
            Child::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Child::Text(t) => Some(t),
            Child::Node(_) => None,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Child::Node(_))
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(Arc::new(node))
    }
}

impl From<Arc<Node>> for Child {
    fn from(node: Arc<Node>) -> Self {
        Child::Node(node)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl fmt::Display for Node {
    /// S-expression form: `(Kind child ...)`, terminals quoted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.kind)?;
        for child in &self.children {
            match child {
                Child::Node(n) => write!(f, " {}", n)?,
                Child::Text(t) => write!(f, " {:?}", t)?,
            }
        }
        write!(f, ")")
    }
}

// ============================================================================
// CONSTRUCTION MACRO
// ============================================================================

/// Builds a [`Node`] from a kind and any number of children convertible into
/// [`Child`] (nodes, `&str`, `String`).
///
/// # Examples
///
/// ```rust
/// use fixedpoint::node;
/// let n = node!("Sequence", node!("String", "<-"), node!("Label", "Spacing"));
/// assert_eq!(n.to_string(), r#"(Sequence (String "<-") (Label "Spacing"))"#);
/// ```
#[macro_export]
macro_rules! node {
    ($kind:expr $(, $child:expr)* $(,)?) => {
        $crate::ast::Node::new($kind, vec![$($crate::ast::Child::from($child)),*])
    };
}

// ============================================================================
// MODULE EXPORTS
// ============================================================================

pub mod export;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_concatenates_terminals_in_order() {
        let n = node!("Definition", node!("Label", "start"), node!("String", "x"), "!");
        assert_eq!(n.text(), "startx!");
        assert_eq!(n.child_nodes().count(), 2);
        assert_eq!(n.child_texts().collect::<Vec<_>>(), vec!["!"]);
    }

    #[test]
    fn empty_node_is_a_valid_leaf() {
        let n = node!("ZeroOrMore");
        assert!(n.children.is_empty());
        assert_eq!(n.text(), "");
        assert_eq!(n.to_string(), "(ZeroOrMore)");
    }

    #[test]
    fn without_spans_strips_every_level() {
        let inner = Node::spanned("Label", vec![Child::from("a")], Span::new(0, 1));
        let outer = Node::spanned("Definition", vec![Child::from(inner)], Span::new(0, 3));
        let stripped = outer.without_spans();
        assert_eq!(stripped, node!("Definition", node!("Label", "a")));
    }

    #[test]
    fn find_returns_first_matching_child() {
        let n = node!("Definition", node!("Label", "a"), node!("Label", "b"));
        assert_eq!(n.find("Label").map(|l| l.text()), Some("a".to_string()));
        assert!(n.find("String").is_none());
    }
}
