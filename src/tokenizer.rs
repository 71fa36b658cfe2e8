//! Regex-union tokenizer.
//!
//! An ordered table of `(name, pattern)` rules drives two operations:
//! [`Tokenizer::tokenize`] scans the input with one alternation of every
//! pattern, in table order, and [`Tokenizer::identify`] names a token after
//! the first rule whose pattern matches the whole token. The two are kept
//! separate on purpose; [`Tokenizer::check_agreement`] reports where they
//! disagree.

use log::debug;
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::ast::Span;
use crate::errors::{to_source_span, SourceContext, TokenizerError};

#[derive(Debug, Clone)]
struct TokenRule {
    name: String,
    pattern: String,
    anchored: Regex,
}

/// A classified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token<'a> {
    pub kind: String,
    pub text: &'a str,
    pub span: Span,
}

/// A scanned token together with the rule whose branch of the union
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scanned<'a> {
    pub text: &'a str,
    pub span: Span,
    rule: usize,
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    rules: Vec<TokenRule>,
    case_insensitive: bool,
    union: Option<Regex>,
    /// Capture group of each rule inside `union`.
    groups: Vec<usize>,
}

impl Tokenizer {
    /// Builds a tokenizer from an ordered rule table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fixedpoint::tokenizer::Tokenizer;
    /// let t = Tokenizer::new([("ws", r"\s+"), ("word", r"\w+"), ("punct", r"[^\w\s]")], false).unwrap();
    /// assert_eq!(t.tokenize("Hi, you"), vec!["Hi", ",", " ", "you"]);
    /// assert_eq!(t.identify("you"), Some("word"));
    /// assert_eq!(t.identify(", "), None);
    /// ```
    pub fn new<I, N, P>(rules: I, case_insensitive: bool) -> Result<Self, TokenizerError>
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<String>,
    {
        let mut tokenizer = Self {
            rules: Vec::new(),
            case_insensitive,
            union: None,
            groups: Vec::new(),
        };
        tokenizer.add(rules)?;
        Ok(tokenizer)
    }

    /// Adds rules after the existing ones. A rule whose name is already
    /// defined replaces the old pattern in place, keeping its position.
    ///
    /// Either every rule is added or, on an invalid pattern, none is.
    pub fn add<I, N, P>(&mut self, rules: I) -> Result<(), TokenizerError>
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<String>,
    {
        let mut table = self.rules.clone();
        for (name, pattern) in rules {
            let rule = self.compile(name.into(), pattern.into())?;
            match table.iter_mut().find(|r| r.name == rule.name) {
                Some(existing) => *existing = rule,
                None => table.push(rule),
            }
        }
        let (union, groups) = self.build_union(&table)?;
        self.rules = table;
        self.union = union;
        self.groups = groups;
        debug!("tokenizer holds {} rules", self.rules.len());
        Ok(())
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Every non-empty match of the rule union, left to right. Text that no
    /// rule matches is skipped silently.
    pub fn tokenize<'a>(&self, input: &'a str) -> Vec<&'a str> {
        self.scan(input).into_iter().map(|s| s.text).collect()
    }

    /// Like [`tokenize`](Self::tokenize), keeping spans and producing rules.
    pub fn scan<'a>(&self, input: &'a str) -> Vec<Scanned<'a>> {
        let Some(union) = &self.union else {
            return Vec::new();
        };
        union
            .captures_iter(input)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                if whole.as_str().is_empty() {
                    return None;
                }
                let rule = self.groups.iter().position(|&g| caps.get(g).is_some())?;
                Some(Scanned {
                    text: whole.as_str(),
                    span: Span::new(whole.start(), whole.end()),
                    rule,
                })
            })
            .collect()
    }

    /// Name of the first rule whose pattern matches the entire token.
    pub fn identify(&self, token: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.anchored.is_match(token))
            .map(|r| r.name.as_str())
    }

    /// Name of the rule whose branch of the union produced a scanned token.
    pub fn produced_by(&self, scanned: &Scanned<'_>) -> &str {
        &self.rules[scanned.rule].name
    }

    /// Tokenizes and identifies, requiring the tokens to cover the whole
    /// input and every token to be classifiable.
    pub fn classify<'a>(&self, input: &'a str) -> Result<Vec<Token<'a>>, TokenizerError> {
        self.classify_named("<input>", input)
    }

    pub fn classify_named<'a>(&self, name: &str, input: &'a str) -> Result<Vec<Token<'a>>, TokenizerError> {
        let source = || SourceContext::new(name, input).to_named_source();
        let mut tokens = Vec::new();
        let mut covered = 0;
        for scanned in self.scan(input) {
            if scanned.span.start > covered {
                return Err(TokenizerError::UnmatchedInput {
                    src: source(),
                    span: to_source_span(Span::new(covered, scanned.span.start)),
                });
            }
            let kind = self
                .identify(scanned.text)
                .ok_or_else(|| TokenizerError::UnclassifiedToken {
                    token: scanned.text.to_string(),
                    src: source(),
                    span: to_source_span(scanned.span),
                })?;
            tokens.push(Token {
                kind: kind.to_string(),
                text: scanned.text,
                span: scanned.span,
            });
            covered = scanned.span.end;
        }
        if covered < input.len() {
            return Err(TokenizerError::UnmatchedInput {
                src: source(),
                span: to_source_span(Span::new(covered, input.len())),
            });
        }
        Ok(tokens)
    }

    /// Checks that, for every token of `input`, the rule that identifies it
    /// is the rule that produced it.
    pub fn check_agreement(&self, input: &str) -> Result<(), TokenizerError> {
        let source = || SourceContext::anonymous(input).to_named_source();
        for scanned in self.scan(input) {
            let produced_by = self.produced_by(&scanned);
            match self.identify(scanned.text) {
                None => {
                    return Err(TokenizerError::UnclassifiedToken {
                        token: scanned.text.to_string(),
                        src: source(),
                        span: to_source_span(scanned.span),
                    })
                }
                Some(identified) if identified != produced_by => {
                    return Err(TokenizerError::Disagreement {
                        token: scanned.text.to_string(),
                        produced_by: produced_by.to_string(),
                        identified_as: identified.to_string(),
                        src: source(),
                        span: to_source_span(scanned.span),
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn regex(&self, rule: &str, pattern: &str) -> Result<Regex, TokenizerError> {
        RegexBuilder::new(pattern)
            .case_insensitive(self.case_insensitive)
            .build()
            .map_err(|source| TokenizerError::InvalidPattern {
                rule: rule.to_string(),
                source,
            })
    }

    fn compile(&self, name: String, pattern: String) -> Result<TokenRule, TokenizerError> {
        let anchored = self.regex(&name, &format!("^(?:{})$", pattern))?;
        Ok(TokenRule {
            name,
            pattern,
            anchored,
        })
    }

    fn build_union(&self, table: &[TokenRule]) -> Result<(Option<Regex>, Vec<usize>), TokenizerError> {
        if table.is_empty() {
            return Ok((None, Vec::new()));
        }
        let mut groups = Vec::with_capacity(table.len());
        let mut next_group = 1;
        for rule in table {
            groups.push(next_group);
            // One group for the rule itself plus the groups inside it.
            next_group += rule.anchored.captures_len();
        }
        let source = table
            .iter()
            .map(|r| format!("({})", r.pattern))
            .collect::<Vec<_>>()
            .join("|");
        let union = self.regex("<union>", &source)?;
        Ok((Some(union), groups))
    }
}
