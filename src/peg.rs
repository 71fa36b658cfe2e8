//! Packrat evaluation of a [`Grammar`] over one input string.
//!
//! Every `(rule, alternative offset, position)` triple is evaluated at most
//! once per [`Packrat`]; later references reuse the stored result, success
//! or failure. A reference that re-enters a triple still being evaluated
//! (left recursion) fails instead of looping.
//!
//! Evaluation recurses once per nested expression, so nesting is bounded:
//! past [`DEFAULT_DEPTH_LIMIT`] nested evaluations (or the limit set with
//! [`Packrat::with_depth_limit`]) a parse stops with
//! [`ParseError::TooDeep`] instead of exhausting the stack.
//!
//! ## Values
//!
//! Matching yields a list of values alongside the end position:
//! - terminals yield nothing;
//! - sequences, choices and repetitions pass on their members' values;
//! - lookaheads yield nothing;
//! - `%e` yields the values of `e` when those contain a node, and otherwise
//!   one text value holding exactly what `e` consumed;
//! - a node wrapper yields one node holding the values of its body;
//! - a rule reference yields the referenced rule's values only where it
//!   appears inside `%` in the referencing rule, and nothing elsewhere.

use log::{debug, trace};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::ast::{Child, Node, Span};
use crate::errors::{to_source_span, ParseError, SourceArc, SourceContext};
use crate::grammar::source::quote_class;
use crate::grammar::{Expr, Grammar};
use crate::memo::{CacheStats, MemoCache};

/// Nested evaluations allowed before a parse gives up.
pub const DEFAULT_DEPTH_LIMIT: usize = 1000;

// ============================================================================
// MATCH RESULTS
// ============================================================================

/// A successful match: where it stopped and what it captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub end: usize,
    pub values: Vec<Child>,
}

impl Match {
    fn empty(end: usize) -> Self {
        Self {
            end,
            values: Vec::new(),
        }
    }
}

/// Cache key of a rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoKey {
    pub rule: usize,
    pub skip: usize,
    pub position: usize,
}

#[derive(Debug, Clone)]
enum Memo {
    InProgress,
    Done(Option<Arc<Match>>),
}

/// Counters describing how much work a [`Packrat`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackratStats {
    /// Rule bodies actually evaluated.
    pub evaluations: usize,
    /// Results stored, including failures.
    pub entries: usize,
    pub cache: CacheStats,
}

/// The farthest position any terminal failed at, and what it wanted there.
#[derive(Debug, Default)]
struct Farthest {
    position: usize,
    expected: BTreeSet<String>,
}

impl Farthest {
    fn describe(&self) -> String {
        match self.expected.len() {
            0 => "end of input".to_string(),
            1 => self.expected.iter().cloned().collect(),
            _ => {
                let all: Vec<&str> = self.expected.iter().map(String::as_str).collect();
                format!("one of {}", all.join(", "))
            }
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// A packrat parser for one grammar and one input.
///
/// # Examples
///
/// ```rust
/// use fixedpoint::grammar::Grammar;
/// use fixedpoint::peg::Packrat;
///
/// let meta = Grammar::meta();
/// let mut packrat = Packrat::new(meta, "start <- 'x'");
/// let tree = packrat.parse("Definition").unwrap();
/// assert_eq!(tree.to_string(), r#"(Definition (Label "start") (String "x"))"#);
///
/// let mut at_end = Packrat::new(meta, "ab");
/// assert!(at_end.match_rule("EOF", 2).unwrap().is_some());
/// assert!(at_end.match_rule("EOF", 1).unwrap().is_none());
/// ```
pub struct Packrat<'g, 'i> {
    grammar: &'g Grammar,
    input: &'i str,
    source_name: String,
    cache: MemoCache<MemoKey, Memo>,
    farthest: Farthest,
    predicate_depth: usize,
    evaluations: usize,
    depth: usize,
    depth_limit: usize,
    /// Where the depth limit was hit, while unwinding.
    too_deep: Option<usize>,
}

impl<'g, 'i> Packrat<'g, 'i> {
    pub fn new(grammar: &'g Grammar, input: &'i str) -> Self {
        Self {
            grammar,
            input,
            source_name: "<input>".to_string(),
            cache: MemoCache::new(),
            farthest: Farthest::default(),
            predicate_depth: 0,
            evaluations: 0,
            depth: 0,
            depth_limit: DEFAULT_DEPTH_LIMIT,
            too_deep: None,
        }
    }

    /// Caps how deeply evaluations may nest.
    pub fn with_depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = limit;
        self
    }

    pub fn depth_limit(&self) -> usize {
        self.depth_limit
    }

    /// Names the input in error reports.
    pub fn named(mut self, name: &str) -> Self {
        self.source_name = name.to_string();
        self
    }

    pub fn input(&self) -> &'i str {
        self.input
    }

    /// Parses the whole input with `rule`.
    ///
    /// The tree is the single node the rule produced, or else a node of the
    /// rule's name holding whatever values it produced.
    pub fn parse(&mut self, rule: &str) -> Result<Node, ParseError> {
        let warm = !self.cache.is_empty();
        let outcome = self.match_rule(rule, 0)?;
        match outcome {
            None => {
                let farthest = self.failure_report(rule, warm);
                let at = farthest.position;
                debug!("rule '{}' failed; farthest failure at {}", rule, at);
                Err(ParseError::NoMatch {
                    rule: rule.to_string(),
                    expected: farthest.describe(),
                    src: self.source(),
                    span: to_source_span(Span::new(at, at)),
                })
            }
            Some(m) if m.end < self.input.len() => {
                let farthest = self.failure_report(rule, warm);
                let expected = if farthest.position >= m.end {
                    farthest.describe()
                } else {
                    "end of input".to_string()
                };
                debug!("rule '{}' stopped at {} of {}", rule, m.end, self.input.len());
                Err(ParseError::Incomplete {
                    rule: rule.to_string(),
                    consumed: m.end,
                    expected,
                    src: self.source(),
                    span: to_source_span(Span::new(m.end, self.input.len())),
                })
            }
            Some(m) => {
                let stats = self.stats();
                debug!(
                    "rule '{}' matched {} bytes ({} evaluations, {} cache hits)",
                    rule, m.end, stats.evaluations, stats.cache.hits
                );
                Ok(root_node(rule, &m))
            }
        }
    }

    /// Evaluates `rule` at `position` without requiring it to reach the end.
    ///
    /// `Ok(None)` means the rule does not match there. Positions past the end
    /// of the input or inside a character never match.
    pub fn match_rule(&mut self, rule: &str, position: usize) -> Result<Option<Arc<Match>>, ParseError> {
        if self.grammar.rule_index(rule).is_none() {
            return Err(ParseError::UnknownRule {
                rule: rule.to_string(),
            });
        }
        if !self.input.is_char_boundary(position) {
            return Ok(None);
        }
        self.farthest = Farthest::default();
        let outcome = self.apply(rule, 0, position);
        if let Some(at) = self.too_deep.take() {
            // Failures recorded while unwinding are not real.
            self.cache.clear();
            debug!("rule '{}' nested past {} evaluations at {}", rule, self.depth_limit, at);
            return Err(ParseError::TooDeep {
                rule: rule.to_string(),
                limit: self.depth_limit,
                src: self.source(),
                span: to_source_span(Span::new(at, at)),
            });
        }
        Ok(outcome)
    }

    /// True if `rule` has been evaluated at `position` (and is therefore
    /// cached).
    pub fn evaluated(&self, rule: &str, position: usize) -> bool {
        self.grammar.rule_index(rule).map_or(false, |id| {
            self.cache.contains(&MemoKey {
                rule: id,
                skip: 0,
                position,
            })
        })
    }

    pub fn stats(&self) -> PackratStats {
        PackratStats {
            evaluations: self.evaluations,
            entries: self.cache.len(),
            cache: self.cache.stats(),
        }
    }

    /// Forgets every stored result.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.farthest = Farthest::default();
        self.evaluations = 0;
    }

    fn source(&self) -> SourceArc {
        SourceContext::new(self.source_name.clone(), self.input).to_named_source()
    }

    /// The farthest failure of the last top-level call. Cache hits record no
    /// terminal failures, so a call answered from a warm cache is replayed
    /// on a fresh engine to find it.
    fn failure_report(&mut self, rule: &str, warm: bool) -> Farthest {
        if !warm {
            return std::mem::take(&mut self.farthest);
        }
        let mut fresh = Packrat::new(self.grammar, self.input).with_depth_limit(self.depth_limit);
        // A replay that hits the limit still leaves its farthest failure.
        let _ = fresh.match_rule(rule, 0);
        fresh.farthest
    }

    /// Enters one level of nesting, or records where the limit was hit.
    fn descend(&mut self, position: usize) -> bool {
        if self.too_deep.is_some() {
            return false;
        }
        if self.depth >= self.depth_limit {
            trace!("depth limit {} reached at {}", self.depth_limit, position);
            self.too_deep = Some(position);
            return false;
        }
        self.depth += 1;
        true
    }

    // ------------------------------------------------------------------------
    // Rule application
    // ------------------------------------------------------------------------

    fn apply(&mut self, name: &str, skip: usize, position: usize) -> Option<Arc<Match>> {
        if !self.descend(position) {
            return None;
        }
        let result = self.apply_rule(name, skip, position);
        self.depth -= 1;
        result
    }

    fn apply_rule(&mut self, name: &str, skip: usize, position: usize) -> Option<Arc<Match>> {
        let grammar = self.grammar;
        let id = grammar.rule_index(name)?;
        let key = MemoKey {
            rule: id,
            skip,
            position,
        };
        match self.cache.get(&key) {
            Some(Memo::Done(result)) => {
                trace!("cache hit {}:{} at {}", name, skip, position);
                return result.clone();
            }
            Some(Memo::InProgress) => {
                trace!("left recursion through {}:{} at {}", name, skip, position);
                return None;
            }
            None => {}
        }

        self.cache.insert(key, Memo::InProgress);
        self.evaluations += 1;
        trace!("eval {}:{} at {}", name, skip, position);

        let body = &grammar.rules()[id].expr;
        let result = match (skip, body) {
            (0, body) => self.eval(body, position, false),
            (_, Expr::Choice(alternatives)) => alternatives
                .iter()
                .skip(skip)
                .find_map(|alternative| self.eval(alternative, position, false)),
            _ => None,
        };
        let result = result.map(Arc::new);
        self.cache.insert(key, Memo::Done(result.clone()));
        result
    }

    // ------------------------------------------------------------------------
    // Expression evaluation
    // ------------------------------------------------------------------------

    fn eval(&mut self, expr: &'g Expr, position: usize, in_argument: bool) -> Option<Match> {
        if !self.descend(position) {
            return None;
        }
        let m = self.eval_expr(expr, position, in_argument);
        self.depth -= 1;
        m
    }

    fn eval_expr(&mut self, expr: &'g Expr, position: usize, in_argument: bool) -> Option<Match> {
        match expr {
            Expr::Choice(alternatives) => alternatives
                .iter()
                .find_map(|alternative| self.eval(alternative, position, in_argument)),
            Expr::Sequence(items) => {
                let mut end = position;
                let mut values = Vec::new();
                for item in items {
                    let m = self.eval(item, end, in_argument)?;
                    end = m.end;
                    values.extend(m.values);
                }
                Some(Match { end, values })
            }
            Expr::ZeroOrOne(e) => self
                .eval(e, position, in_argument)
                .or_else(|| Some(Match::empty(position))),
            Expr::ZeroOrMore(e) => Some(self.repeat(e, Match::empty(position), in_argument)),
            Expr::OneOrMore(e) => {
                let first = self.eval(e, position, in_argument)?;
                Some(self.repeat(e, first, in_argument))
            }
            Expr::Lookahead(e) => {
                self.predicate_depth += 1;
                let m = self.eval(e, position, in_argument);
                self.predicate_depth -= 1;
                m.map(|_| Match::empty(position))
            }
            Expr::NotLookahead(e) => {
                self.predicate_depth += 1;
                let m = self.eval(e, position, in_argument);
                self.predicate_depth -= 1;
                match m {
                    Some(_) => None,
                    None => Some(Match::empty(position)),
                }
            }
            Expr::Argument(e) => {
                let m = self.eval(e, position, true)?;
                let values = if m.values.iter().any(Child::is_node) {
                    merge_texts(m.values)
                } else {
                    vec![Child::Text(self.input[position..m.end].to_string())]
                };
                Some(Match { end: m.end, values })
            }
            Expr::Node { kind, expr } => {
                let m = self.eval(expr, position, false)?;
                let node = Node::spanned(kind.clone(), m.values, Span::new(position, m.end));
                Some(Match {
                    end: m.end,
                    values: vec![Child::from(node)],
                })
            }
            Expr::Label(name) => self.reference(name, 0, position, in_argument),
            Expr::Index { rule, skip } => self.reference(rule, *skip, position, in_argument),
            Expr::String(text) => {
                if self.input[position..].starts_with(text.as_str()) {
                    Some(Match::empty(position + text.len()))
                } else {
                    self.expected(position, || format!("{:?}", text));
                    None
                }
            }
            Expr::CharClass(items) => match self.input[position..].chars().next() {
                Some(c) if items.iter().any(|item| item.contains(c)) => {
                    Some(Match::empty(position + c.len_utf8()))
                }
                _ => {
                    self.expected(position, || quote_class(items));
                    None
                }
            },
            Expr::Dot => match self.input[position..].chars().next() {
                Some(c) => Some(Match::empty(position + c.len_utf8())),
                None => {
                    self.expected(position, || "any character".to_string());
                    None
                }
            },
        }
    }

    fn reference(&mut self, name: &str, skip: usize, position: usize, in_argument: bool) -> Option<Match> {
        let m = self.apply(name, skip, position)?;
        if in_argument {
            Some(Match::clone(&m))
        } else {
            Some(Match::empty(m.end))
        }
    }

    /// Greedy repetition after `first`. Stops after a match that consumed
    /// nothing.
    fn repeat(&mut self, e: &'g Expr, first: Match, in_argument: bool) -> Match {
        let Match { mut end, mut values } = first;
        while let Some(m) = self.eval(e, end, in_argument) {
            let advanced = m.end > end;
            end = m.end;
            values.extend(m.values);
            if !advanced {
                break;
            }
        }
        Match { end, values }
    }

    fn expected(&mut self, position: usize, what: impl FnOnce() -> String) {
        if self.predicate_depth > 0 || position < self.farthest.position {
            return;
        }
        if position > self.farthest.position {
            self.farthest.position = position;
            self.farthest.expected.clear();
        }
        self.farthest.expected.insert(what());
    }
}

/// Joins adjacent text values into one.
fn merge_texts(values: Vec<Child>) -> Vec<Child> {
    let mut merged: Vec<Child> = Vec::with_capacity(values.len());
    for value in values {
        match (merged.last_mut(), value) {
            (Some(Child::Text(previous)), Child::Text(text)) => previous.push_str(&text),
            (_, value) => merged.push(value),
        }
    }
    merged
}

fn root_node(rule: &str, m: &Match) -> Node {
    match m.values.as_slice() {
        [Child::Node(node)] => Node::clone(node),
        values => Node::spanned(rule, values.to_vec(), Span::new(0, m.end)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node;

    fn grammar(source: &str) -> Grammar {
        Grammar::from_source(source).unwrap()
    }

    #[test]
    fn ordered_choice_never_tries_later_alternatives_after_a_match() {
        let g = grammar("start <- A / B\nA <- 'x'\nB <- 'x'");
        let mut packrat = Packrat::new(&g, "x");
        packrat.parse("start").unwrap();
        assert!(packrat.evaluated("A", 0));
        assert!(!packrat.evaluated("B", 0));
    }

    #[test]
    fn repeated_references_hit_the_cache() {
        let g = grammar("start <- A 'y' / A 'z'\nA <- 'x'+");
        let mut packrat = Packrat::new(&g, "xxz");
        packrat.parse("start").unwrap();
        let stats = packrat.stats();
        assert_eq!(stats.evaluations, 2);
        assert!(stats.cache.hits >= 1);

        packrat.clear();
        assert_eq!(packrat.stats(), PackratStats::default());
    }

    #[test]
    fn left_recursion_fails_instead_of_looping() {
        let g = grammar("E <- E '+' 'n' / 'n'");
        assert_eq!(g.parse("n").unwrap().kind, "E");
        assert!(g.parse("n+n").is_err());
    }

    #[test]
    fn argument_without_nodes_captures_the_consumed_text() {
        let g = grammar("%Word <- ' '* %([a-z]+ [0-9]*) ' '*");
        let tree = g.parse("  abc12 ").unwrap();
        assert_eq!(tree.without_spans(), node!("Word", "abc12"));
        assert_eq!(tree.span, Some(Span::new(0, 8)));
    }

    #[test]
    fn argument_with_nodes_keeps_values_and_merges_texts() {
        let g = grammar("%Pair <- %(%'a' %'b' %Inner)\n%Inner <- 'c'");
        let tree = g.parse("abc").unwrap();
        assert_eq!(tree.without_spans(), node!("Pair", "ab", node!("Inner")));
    }

    #[test]
    fn references_outside_arguments_yield_nothing() {
        let g = grammar("%List <- Item (',' %Item)*\n%Item <- [a-z]");
        let tree = g.parse("a,b,c").unwrap();
        assert_eq!(tree.without_spans(), node!("List", node!("Item"), node!("Item")));
    }

    #[test]
    fn empty_repetition_body_terminates() {
        let g = grammar("start <- ('a'?)* 'b'");
        assert!(g.parse("aab").is_ok());
        assert!(g.parse("b").is_ok());
    }

    #[test]
    fn lookahead_consumes_nothing() {
        let g = grammar("start <- &'a' %[a-z] !'x' .");
        assert_eq!(g.parse("ab").unwrap().without_spans(), node!("start", "a"));
        assert!(g.parse("ax").is_err());
        assert!(g.parse("ba").is_err());
    }

    #[test]
    fn index_skips_leading_alternatives() {
        let g = grammar("start <- %E:1\nE <- 'a' / 'b' / 'c'");
        assert!(g.parse("a").is_err());
        assert_eq!(g.parse("c").unwrap().without_spans(), node!("start", "c"));
    }

    #[test]
    fn incomplete_match_reports_position() {
        let g = grammar("start <- 'ab'");
        match g.parse("abc").unwrap_err() {
            ParseError::Incomplete { consumed, .. } => assert_eq!(consumed, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn no_match_reports_the_farthest_expectation() {
        let g = grammar("start <- 'a' 'b' / 'a' 'c'");
        match g.parse("ad").unwrap_err() {
            ParseError::NoMatch { expected, span, .. } => {
                assert_eq!(span.offset(), 1);
                assert_eq!(expected, r#"one of "b", "c""#);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_rule_is_an_error() {
        let g = grammar("start <- 'a'");
        assert!(matches!(
            Packrat::new(&g, "a").parse("nope"),
            Err(ParseError::UnknownRule { .. })
        ));
    }

    #[test]
    fn nesting_past_the_depth_limit_is_an_error() {
        let g = grammar("%P <- '(' %P ')' / %'x'");
        let input = format!("{}x{}", "(".repeat(10), ")".repeat(10));
        let mut packrat = Packrat::new(&g, &input).with_depth_limit(20);
        match packrat.parse("P").unwrap_err() {
            ParseError::TooDeep { limit, span, .. } => {
                assert_eq!(limit, 20);
                assert!(span.offset() < 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(packrat.stats().entries, 0);

        let tree = Packrat::new(&g, &input).parse("P").unwrap();
        assert_eq!(tree.kind, "P");
    }

    #[test]
    fn each_parse_reports_its_own_farthest_failure() {
        let g = grammar("a <- 'xyz'\nb <- 'q'");
        let mut packrat = Packrat::new(&g, "xyw");
        let expected = |err: ParseError| match err {
            ParseError::NoMatch { expected, .. } => expected,
            other => panic!("unexpected error: {other:?}"),
        };
        assert_eq!(expected(packrat.parse("a").unwrap_err()), r#""xyz""#);
        assert_eq!(expected(packrat.parse("b").unwrap_err()), r#""q""#);
        // Answered from the cache, but reported the same way.
        assert_eq!(expected(packrat.parse("a").unwrap_err()), r#""xyz""#);
    }

    #[test]
    fn wildcard_consumes_one_character_not_one_byte() {
        let g = grammar("start <- %. %.");
        assert_eq!(g.parse("éa").unwrap().without_spans(), node!("start", "é", "a"));
    }
}
