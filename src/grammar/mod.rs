//! Grammar registry and the PEG expression vocabulary.
//!
//! A [`Grammar`] maps rule names to [`Expr`] values. References between
//! rules are names, looked up when the grammar is evaluated, so rules may be
//! declared in any order and may refer to each other recursively. Every
//! reference is checked when the grammar is built.
//!
//! Grammars come from three places:
//! - Rust code, through [`GrammarBuilder`];
//! - node tables such as the meta-grammar ([`Grammar::from_table`]);
//! - grammar source text, parsed with the meta-grammar itself
//!   ([`Grammar::from_source`]).

use log::debug;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::ast::{Child, Node};
use crate::errors::{FixedpointError, GrammarError, ParseError, SourceContext};
use crate::peg::Packrat;

pub mod meta;
pub mod source;
pub mod validate;

// ============================================================================
// EXPRESSION VOCABULARY
// ============================================================================

/// A parsing expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Ordered choice: the first alternative that matches wins.
    Choice(Vec<Expr>),
    /// All members in order, each starting where the previous one stopped.
    Sequence(Vec<Expr>),
    ZeroOrOne(Box<Expr>),
    ZeroOrMore(Box<Expr>),
    OneOrMore(Box<Expr>),
    /// `&e`: succeeds without consuming iff `e` matches.
    Lookahead(Box<Expr>),
    /// `!e`: succeeds without consuming iff `e` fails.
    NotLookahead(Box<Expr>),
    /// `%e`: keeps what `e` matched as a value of the enclosing node.
    Argument(Box<Expr>),
    /// Wraps the values of `expr` into a node of the given kind.
    Node { kind: String, expr: Box<Expr> },
    /// Reference to a rule by name.
    Label(String),
    /// Reference to a rule whose body is a choice, trying only the
    /// alternatives from `skip` onwards.
    Index { rule: String, skip: usize },
    /// Literal text.
    String(String),
    CharClass(Vec<ClassItem>),
    /// Any single character.
    Dot,
}

/// One member of a character class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassItem {
    Char(char),
    /// Inclusive range.
    Range(char, char),
}

impl ClassItem {
    pub fn contains(&self, c: char) -> bool {
        match *self {
            ClassItem::Char(x) => x == c,
            ClassItem::Range(lo, hi) => lo <= c && c <= hi,
        }
    }
}

impl Expr {
    pub fn choice(alternatives: Vec<Expr>) -> Expr {
        Expr::Choice(alternatives)
    }

    pub fn seq(items: Vec<Expr>) -> Expr {
        Expr::Sequence(items)
    }

    pub fn opt(expr: Expr) -> Expr {
        Expr::ZeroOrOne(Box::new(expr))
    }

    pub fn star(expr: Expr) -> Expr {
        Expr::ZeroOrMore(Box::new(expr))
    }

    pub fn plus(expr: Expr) -> Expr {
        Expr::OneOrMore(Box::new(expr))
    }

    pub fn and(expr: Expr) -> Expr {
        Expr::Lookahead(Box::new(expr))
    }

    pub fn not(expr: Expr) -> Expr {
        Expr::NotLookahead(Box::new(expr))
    }

    pub fn arg(expr: Expr) -> Expr {
        Expr::Argument(Box::new(expr))
    }

    pub fn node(kind: impl Into<String>, expr: Expr) -> Expr {
        Expr::Node {
            kind: kind.into(),
            expr: Box::new(expr),
        }
    }

    pub fn label(rule: impl Into<String>) -> Expr {
        Expr::Label(rule.into())
    }

    pub fn index(rule: impl Into<String>, skip: usize) -> Expr {
        Expr::Index {
            rule: rule.into(),
            skip,
        }
    }

    pub fn lit(text: impl Into<String>) -> Expr {
        Expr::String(text.into())
    }

    pub fn class(items: Vec<ClassItem>) -> Expr {
        Expr::CharClass(items)
    }

    /// The kind name this expression has in node tables.
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Choice(_) => "Choice",
            Expr::Sequence(_) => "Sequence",
            Expr::ZeroOrOne(_) => "ZeroOrOne",
            Expr::ZeroOrMore(_) => "ZeroOrMore",
            Expr::OneOrMore(_) => "OneOrMore",
            Expr::Lookahead(_) => "Lookahead",
            Expr::NotLookahead(_) => "NotLookahead",
            Expr::Argument(_) => "Argument",
            Expr::Node { .. } => "Node",
            Expr::Label(_) => "Label",
            Expr::Index { .. } => "Index",
            Expr::String(_) => "String",
            Expr::CharClass(_) => "CharClass",
            Expr::Dot => "Dot",
        }
    }

    /// Direct sub-expressions, left to right.
    pub fn operands(&self) -> Vec<&Expr> {
        match self {
            Expr::Choice(items) | Expr::Sequence(items) => items.iter().collect(),
            Expr::ZeroOrOne(e)
            | Expr::ZeroOrMore(e)
            | Expr::OneOrMore(e)
            | Expr::Lookahead(e)
            | Expr::NotLookahead(e)
            | Expr::Argument(e) => vec![e.as_ref()],
            Expr::Node { expr, .. } => vec![expr.as_ref()],
            Expr::Label(_)
            | Expr::Index { .. }
            | Expr::String(_)
            | Expr::CharClass(_)
            | Expr::Dot => vec![],
        }
    }

    /// Converts a node-table expression into an [`Expr`].
    ///
    /// `rule` only names the rule in error messages. Literal texts are taken
    /// as they are; see [`Grammar::from_ast`] for escaped sources.
    pub fn from_node(rule: &str, node: &Node) -> Result<Expr, GrammarError> {
        Compiler {
            rule,
            literals: Literals::Verbatim,
        }
        .compile(node)
    }
}

// ============================================================================
// NODE COMPILATION
// ============================================================================

/// How literal texts (strings and class items) are written in a node tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Literals {
    /// Hand-written tables: the text is the literal.
    Verbatim,
    /// Parsed grammar sources: the text still carries escape sequences.
    Escaped,
}

struct Compiler<'a> {
    rule: &'a str,
    literals: Literals,
}

impl Compiler<'_> {
    fn compile(&self, node: &Node) -> Result<Expr, GrammarError> {
        match node.kind.as_str() {
            "Choice" => Ok(Expr::Choice(self.operands(node)?)),
            "Sequence" => Ok(Expr::Sequence(self.operands(node)?)),
            "ZeroOrOne" => Ok(Expr::ZeroOrOne(self.single(node)?)),
            "ZeroOrMore" => Ok(Expr::ZeroOrMore(self.single(node)?)),
            "OneOrMore" => Ok(Expr::OneOrMore(self.single(node)?)),
            "Lookahead" => Ok(Expr::Lookahead(self.single(node)?)),
            "NotLookahead" => Ok(Expr::NotLookahead(self.single(node)?)),
            "Argument" => Ok(Expr::Argument(self.single(node)?)),
            "Node" => self.node_wrapper(node),
            "Label" => Ok(Expr::Label(self.name(node)?)),
            "Index" => self.index(node),
            "String" => self.string(node),
            "CharClass" => self.char_class(node),
            "Dot" => {
                if node.children.is_empty() {
                    Ok(Expr::Dot)
                } else {
                    Err(self.malformed("Dot", "takes no children"))
                }
            }
            other => Err(self.malformed(other, "unknown expression kind")),
        }
    }

    fn operands(&self, node: &Node) -> Result<Vec<Expr>, GrammarError> {
        node.children
            .iter()
            .map(|child| match child {
                Child::Node(n) => self.compile(n),
                Child::Text(t) => Err(self.malformed(
                    &node.kind,
                    &format!("unexpected terminal {:?} among operands", t),
                )),
            })
            .collect()
    }

    fn single(&self, node: &Node) -> Result<Box<Expr>, GrammarError> {
        match node.children.as_slice() {
            [Child::Node(n)] => Ok(Box::new(self.compile(n)?)),
            _ => Err(self.malformed(&node.kind, "expects exactly one operand")),
        }
    }

    fn node_wrapper(&self, node: &Node) -> Result<Expr, GrammarError> {
        match node.children.as_slice() {
            [Child::Text(kind), Child::Node(body)] => Ok(Expr::node(kind.clone(), self.compile(body)?)),
            _ => Err(self.malformed("Node", "expects a kind name and one operand")),
        }
    }

    fn name(&self, node: &Node) -> Result<String, GrammarError> {
        match node.children.as_slice() {
            [Child::Text(name)] if !name.is_empty() => Ok(name.clone()),
            _ => Err(self.malformed(&node.kind, "expects one rule name")),
        }
    }

    fn index(&self, node: &Node) -> Result<Expr, GrammarError> {
        let (label, number) = match node.children.as_slice() {
            [Child::Node(label), Child::Text(number)] if label.kind == "Label" => (label, number),
            _ => return Err(self.malformed("Index", "expects a label and an alternative number")),
        };
        let skip = number
            .trim()
            .parse::<usize>()
            .map_err(|_| self.malformed("Index", &format!("{:?} is not an alternative number", number)))?;
        Ok(Expr::index(self.name(label)?, skip))
    }

    fn string(&self, node: &Node) -> Result<Expr, GrammarError> {
        let text = match node.children.as_slice() {
            [] => String::new(),
            [Child::Text(t)] => self.literal(t),
            _ => return Err(self.malformed("String", "expects one literal")),
        };
        Ok(Expr::String(text))
    }

    fn char_class(&self, node: &Node) -> Result<Expr, GrammarError> {
        if node.children.is_empty() {
            return Err(GrammarError::EmptyExpression {
                rule: self.rule.to_string(),
                kind: "CharClass".to_string(),
            });
        }
        let mut items = Vec::with_capacity(node.children.len());
        for child in &node.children {
            let Child::Text(raw) = child else {
                return Err(self.malformed("CharClass", "expects terminal items"));
            };
            let item: Vec<char> = self.literal(raw).chars().collect();
            match item.as_slice() {
                [c] => items.push(ClassItem::Char(*c)),
                [lo, '-', hi] => items.push(ClassItem::Range(*lo, *hi)),
                _ => {
                    return Err(self.malformed(
                        "CharClass",
                        &format!("{:?} is neither a character nor a range", raw),
                    ))
                }
            }
        }
        Ok(Expr::CharClass(items))
    }

    fn literal(&self, raw: &str) -> String {
        match self.literals {
            Literals::Verbatim => raw.to_string(),
            Literals::Escaped => source::unescape(raw),
        }
    }

    fn malformed(&self, kind: &str, reason: &str) -> GrammarError {
        GrammarError::MalformedExpression {
            rule: self.rule.to_string(),
            kind: kind.to_string(),
            reason: reason.to_string(),
        }
    }
}

// ============================================================================
// GRAMMAR REGISTRY
// ============================================================================

/// A named rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub expr: Expr,
}

/// A validated set of rules with a designated start rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    rules: Vec<Rule>,
    by_name: HashMap<String, usize>,
    start: String,
}

static META: Lazy<Grammar> = Lazy::new(meta::grammar);

impl Grammar {
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::default()
    }

    /// The self-describing grammar of grammar sources.
    pub fn meta() -> &'static Grammar {
        &META
    }

    /// Builds a grammar from `(rule name, expression node)` pairs. The first
    /// pair names the start rule.
    pub fn from_table<I, S>(table: I) -> Result<Grammar, GrammarError>
    where
        I: IntoIterator<Item = (S, Node)>,
        S: Into<String>,
    {
        let mut builder = Grammar::builder();
        for (name, node) in table {
            let name = name.into();
            let expr = Expr::from_node(&name, &node)?;
            builder = builder.rule(name, expr);
        }
        builder.build()
    }

    /// Builds a grammar from the tree the meta-grammar produces for a
    /// grammar source: a root whose children are `Definition` nodes.
    ///
    /// `%Name <- e` definitions wrap their body into a `Name` node. String
    /// and class literals are unescaped.
    pub fn from_ast(root: &Node) -> Result<Grammar, GrammarError> {
        let mut builder = Grammar::builder();
        for definition in root.child_nodes().filter(|n| n.kind == "Definition") {
            let (lhs, body) = match definition.children.as_slice() {
                [Child::Node(lhs), Child::Node(body)] => (lhs, body),
                _ => {
                    return Err(GrammarError::MalformedExpression {
                        rule: root.kind.clone(),
                        kind: "Definition".to_string(),
                        reason: "expects a name and a body".to_string(),
                    })
                }
            };
            let (name, wrap) = definition_name(lhs)?;
            let expr = Compiler {
                rule: &name,
                literals: Literals::Escaped,
            }
            .compile(body)?;
            let expr = if wrap { Expr::node(name.clone(), expr) } else { expr };
            builder = builder.rule(name, expr);
        }
        builder.build()
    }

    /// Parses grammar source text with the meta-grammar and builds it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fixedpoint::grammar::Grammar;
    /// let g = Grammar::from_source("%Greeting <- 'hi' ' '* %Name\nName <- [a-z]+").unwrap();
    /// let tree = g.parse("hi  bob").unwrap();
    /// assert_eq!(tree.to_string(), r#"(Greeting "bob")"#);
    /// ```
    pub fn from_source(text: &str) -> Result<Grammar, FixedpointError> {
        Grammar::from_source_context(&SourceContext::anonymous(text))
    }

    pub fn from_source_context(source: &SourceContext) -> Result<Grammar, FixedpointError> {
        let root = Packrat::new(Grammar::meta(), &source.content)
            .named(&source.name)
            .parse("start")?;
        debug!(
            "grammar source '{}' holds {} definitions",
            source.name,
            root.child_nodes().count()
        );
        Ok(Grammar::from_ast(&root)?)
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    /// Same rules, different start rule.
    pub fn with_start(mut self, rule: &str) -> Result<Grammar, GrammarError> {
        if !self.by_name.contains_key(rule) {
            return Err(GrammarError::UnknownStartRule {
                rule: rule.to_string(),
            });
        }
        self.start = rule.to_string();
        Ok(self)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rule_index(name).map(|i| &self.rules[i])
    }

    pub fn rule_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Parses the whole input from the start rule.
    pub fn parse(&self, input: &str) -> Result<Node, ParseError> {
        Packrat::new(self, input).parse(&self.start)
    }

    /// Parses the whole input from the given rule.
    pub fn parse_rule(&self, rule: &str, input: &str) -> Result<Node, ParseError> {
        Packrat::new(self, input).parse(rule)
    }
}

fn definition_name(lhs: &Node) -> Result<(String, bool), GrammarError> {
    let malformed = || GrammarError::MalformedExpression {
        rule: lhs.text(),
        kind: "Definition".to_string(),
        reason: format!("cannot name a rule with a {} node", lhs.kind),
    };
    match lhs.kind.as_str() {
        "Label" => Ok((lhs.text(), false)),
        "Node" => match lhs.find("Label") {
            Some(label) => Ok((label.text(), true)),
            None => Err(malformed()),
        },
        _ => Err(malformed()),
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Collects rules, then validates them all at once.
///
/// # Examples
///
/// ```rust
/// use fixedpoint::grammar::{Expr, Grammar};
/// let g = Grammar::builder()
///     .rule("List", Expr::node("List", Expr::seq(vec![
///         Expr::arg(Expr::label("Item")),
///         Expr::star(Expr::seq(vec![Expr::lit(","), Expr::arg(Expr::label("Item"))])),
///     ])))
///     .rule("Item", Expr::plus(Expr::lit("x")))
///     .build()
///     .unwrap();
/// assert_eq!(g.parse("xx,x").unwrap().to_string(), r#"(List "xx" "x")"#);
/// ```
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    rules: Vec<Rule>,
    start: Option<String>,
}

impl GrammarBuilder {
    pub fn rule(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.rules.push(Rule {
            name: name.into(),
            expr,
        });
        self
    }

    /// Overrides the start rule, which defaults to the first rule added.
    pub fn start(mut self, name: impl Into<String>) -> Self {
        self.start = Some(name.into());
        self
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        let start = match (self.start, self.rules.first()) {
            (Some(start), _) => start,
            (None, Some(first)) => first.name.clone(),
            (None, None) => return Err(GrammarError::NoRules),
        };

        let mut by_name = HashMap::with_capacity(self.rules.len());
        for (i, rule) in self.rules.iter().enumerate() {
            if by_name.insert(rule.name.clone(), i).is_some() {
                return Err(GrammarError::DuplicateRule {
                    rule: rule.name.clone(),
                });
            }
        }

        let grammar = Grammar {
            rules: self.rules,
            by_name,
            start,
        };
        let report = validate::validate(&grammar);
        for warning in &report.warnings {
            debug!("grammar warning: {}", warning);
        }
        if let Some(error) = report.errors.into_iter().next() {
            return Err(error);
        }
        debug!(
            "built grammar with {} rules, start rule '{}'",
            grammar.rules.len(),
            grammar.start
        );
        Ok(grammar)
    }
}
