//! Eager grammar checks.
//!
//! Everything that would make evaluation ill-defined is an error and stops
//! [`GrammarBuilder::build`](super::GrammarBuilder::build). Things that are
//! legal but probably unintended are warnings, which the builder only logs.

use std::collections::{HashSet, VecDeque};

use crate::errors::GrammarError;

use super::{ClassItem, Expr, Grammar};

// =====================
// Core Data Structures
// =====================

#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<GrammarError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

// =====================
// Traits
// =====================

pub trait ValidationReporter {
    fn report_error(&mut self, error: GrammarError);
    fn report_warning(&mut self, message: impl Into<String>);
}

impl ValidationReporter for ValidationResult {
    fn report_error(&mut self, error: GrammarError) {
        self.errors.push(error);
    }

    fn report_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

// =====================
// Public API
// =====================

/// Runs every check over the grammar.
pub fn validate(grammar: &Grammar) -> ValidationResult {
    let mut result = ValidationResult::new();
    GrammarValidators::check_start_rule(grammar, &mut result);
    GrammarValidators::check_expressions(grammar, &mut result);
    GrammarValidators::check_references(grammar, &mut result);
    GrammarValidators::check_reachability(grammar, &mut result);
    GrammarValidators::check_direct_left_recursion(grammar, &mut result);
    result
}

/// Each validator focuses on a single concern.
pub struct GrammarValidators;

impl GrammarValidators {
    pub fn check_start_rule(grammar: &Grammar, result: &mut impl ValidationReporter) {
        if grammar.rule(grammar.start()).is_none() {
            result.report_error(GrammarError::UnknownStartRule {
                rule: grammar.start().to_string(),
            });
        }
    }

    /// Empty choices, sequences and classes, and inverted class ranges.
    pub fn check_expressions(grammar: &Grammar, result: &mut impl ValidationReporter) {
        for rule in grammar.rules() {
            walk(&rule.expr, &mut |expr| {
                let empty = match expr {
                    Expr::Choice(items) | Expr::Sequence(items) => items.is_empty(),
                    Expr::CharClass(items) => items.is_empty(),
                    _ => false,
                };
                if empty {
                    result.report_error(GrammarError::EmptyExpression {
                        rule: rule.name.clone(),
                        kind: expr.kind().to_string(),
                    });
                }
                if let Expr::CharClass(items) = expr {
                    for item in items {
                        if let ClassItem::Range(start, end) = *item {
                            if start > end {
                                result.report_error(GrammarError::InvalidCharRange {
                                    rule: rule.name.clone(),
                                    start,
                                    end,
                                });
                            }
                        }
                    }
                }
            });
        }
    }

    /// Every label and index must name a defined rule; an index must point
    /// into the alternatives of a rule whose body is an ordered choice.
    pub fn check_references(grammar: &Grammar, result: &mut impl ValidationReporter) {
        for rule in grammar.rules() {
            walk(&rule.expr, &mut |expr| match expr {
                Expr::Label(target) if grammar.rule(target).is_none() => {
                    result.report_error(GrammarError::UndefinedRule {
                        rule: rule.name.clone(),
                        target: target.clone(),
                    });
                }
                Expr::Index { rule: target, skip } => match grammar.rule(target).map(|r| &r.expr) {
                    None => result.report_error(GrammarError::UndefinedRule {
                        rule: rule.name.clone(),
                        target: target.clone(),
                    }),
                    Some(Expr::Choice(alternatives)) if *skip >= alternatives.len() => {
                        result.report_error(GrammarError::IndexOutOfRange {
                            rule: rule.name.clone(),
                            target: target.clone(),
                            index: *skip,
                            alternatives: alternatives.len(),
                        })
                    }
                    Some(Expr::Choice(_)) => {}
                    Some(_) => result.report_error(GrammarError::IndexTargetNotChoice {
                        rule: rule.name.clone(),
                        target: target.clone(),
                    }),
                },
                _ => {}
            });
        }
    }

    /// Rules the start rule can never reach.
    pub fn check_reachability(grammar: &Grammar, result: &mut impl ValidationReporter) {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([grammar.start().to_string()]);
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(rule) = grammar.rule(&name) {
                walk(&rule.expr, &mut |expr| match expr {
                    Expr::Label(target) | Expr::Index { rule: target, .. } => {
                        queue.push_back(target.clone())
                    }
                    _ => {}
                });
            }
        }
        for rule in grammar.rules() {
            if !seen.contains(&rule.name) {
                result.report_warning(format!(
                    "rule '{}' is unreachable from '{}'",
                    rule.name,
                    grammar.start()
                ));
            }
        }
    }

    /// A rule that refers to itself before consuming anything can never
    /// match through that reference.
    pub fn check_direct_left_recursion(grammar: &Grammar, result: &mut impl ValidationReporter) {
        for rule in grammar.rules() {
            if leftmost_references(&rule.expr).contains(&rule.name.as_str()) {
                result.report_warning(format!(
                    "rule '{}' is left-recursive; the recursive alternative never matches",
                    rule.name
                ));
            }
        }
    }
}

// =====================
// Helpers
// =====================

fn walk<'e>(expr: &'e Expr, visit: &mut impl FnMut(&'e Expr)) {
    visit(expr);
    for operand in expr.operands() {
        walk(operand, visit);
    }
}

/// Rule names that can be evaluated at the starting position of `expr`.
/// Only the first member of a sequence is considered.
fn leftmost_references(expr: &Expr) -> Vec<&str> {
    match expr {
        Expr::Label(name) | Expr::Index { rule: name, .. } => vec![name.as_str()],
        Expr::Choice(items) => items.iter().flat_map(leftmost_references).collect(),
        Expr::Sequence(items) => items.first().map(leftmost_references).unwrap_or_default(),
        Expr::String(_) | Expr::CharClass(_) | Expr::Dot => vec![],
        other => other.operands().into_iter().flat_map(leftmost_references).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_of(builder: crate::grammar::GrammarBuilder) -> GrammarError {
        builder.build().unwrap_err()
    }

    #[test]
    fn undefined_reference_is_an_error() {
        let err = errors_of(Grammar::builder().rule("a", Expr::label("Missing")));
        assert_eq!(
            err,
            GrammarError::UndefinedRule {
                rule: "a".into(),
                target: "Missing".into()
            }
        );
    }

    #[test]
    fn index_must_target_a_choice_within_range() {
        let err = errors_of(
            Grammar::builder()
                .rule("a", Expr::index("b", 2))
                .rule("b", Expr::choice(vec![Expr::lit("x"), Expr::lit("y")])),
        );
        assert!(matches!(err, GrammarError::IndexOutOfRange { index: 2, alternatives: 2, .. }));

        let err = errors_of(
            Grammar::builder()
                .rule("a", Expr::index("b", 0))
                .rule("b", Expr::lit("x")),
        );
        assert!(matches!(err, GrammarError::IndexTargetNotChoice { .. }));
    }

    #[test]
    fn empty_and_inverted_classes_are_errors() {
        let err = errors_of(Grammar::builder().rule("a", Expr::class(vec![])));
        assert!(matches!(err, GrammarError::EmptyExpression { .. }));

        let err = errors_of(Grammar::builder().rule("a", Expr::class(vec![ClassItem::Range('z', 'a')])));
        assert!(matches!(err, GrammarError::InvalidCharRange { start: 'z', end: 'a', .. }));
    }

    #[test]
    fn unreachable_and_left_recursive_rules_are_warnings() {
        let grammar = Grammar::builder()
            .rule("a", Expr::choice(vec![Expr::seq(vec![Expr::label("a"), Expr::lit("x")]), Expr::lit("x")]))
            .rule("orphan", Expr::lit("y"))
            .build()
            .unwrap();
        let result = validate(&grammar);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings.iter().any(|w| w.contains("orphan")));
        assert!(result.warnings.iter().any(|w| w.contains("left-recursive")));
    }

    #[test]
    fn meta_grammar_has_no_warnings() {
        assert!(validate(Grammar::meta()).warnings.is_empty());
    }
}
