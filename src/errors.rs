//! fixedpoint error handling
//!
//! One error enum per failure domain, each deriving `thiserror::Error` and
//! `miette::Diagnostic`, and one umbrella [`FixedpointError`] that forwards
//! both transparently. Ordinary match failures inside the PEG engine are not
//! errors and never show up here.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::ast::Span;

// Type aliases for clarity and brevity
pub type SourceArc = Arc<NamedSource<String>>;

// ============================================================================
// SOURCE CONTEXT
// ============================================================================

/// Names the text an error points into.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Source context for text that came from no file.
    pub fn anonymous(content: impl Into<String>) -> Self {
        Self::new("<input>", content)
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> SourceArc {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

pub fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::from((span.start, span.len()))
}

// ============================================================================
// GRAMMAR CONSTRUCTION
// ============================================================================

/// A grammar table that cannot be evaluated. Raised eagerly when the grammar
/// is built, never during a parse.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum GrammarError {
    #[error("rule '{rule}' references undefined rule '{target}'")]
    #[diagnostic(
        code(fixedpoint::grammar::undefined_rule),
        help("define the missing rule or fix the reference")
    )]
    UndefinedRule { rule: String, target: String },

    #[error("rule '{rule}' is defined more than once")]
    #[diagnostic(code(fixedpoint::grammar::duplicate_rule))]
    DuplicateRule { rule: String },

    #[error("rule '{rule}' indexes alternative {index} of '{target}', which has {alternatives}")]
    #[diagnostic(code(fixedpoint::grammar::index_out_of_range))]
    IndexOutOfRange {
        rule: String,
        target: String,
        index: usize,
        alternatives: usize,
    },

    #[error("rule '{rule}' indexes '{target}', whose body is not an ordered choice")]
    #[diagnostic(code(fixedpoint::grammar::index_target))]
    IndexTargetNotChoice { rule: String, target: String },

    #[error("rule '{rule}' contains an empty {kind}")]
    #[diagnostic(code(fixedpoint::grammar::empty_expression))]
    EmptyExpression { rule: String, kind: String },

    #[error("rule '{rule}' has a malformed {kind} expression: {reason}")]
    #[diagnostic(code(fixedpoint::grammar::malformed_expression))]
    MalformedExpression {
        rule: String,
        kind: String,
        reason: String,
    },

    #[error("rule '{rule}' has an inverted character range '{start}-{end}'")]
    #[diagnostic(code(fixedpoint::grammar::char_range))]
    InvalidCharRange { rule: String, start: char, end: char },

    #[error("start rule '{rule}' is not defined")]
    #[diagnostic(code(fixedpoint::grammar::unknown_start))]
    UnknownStartRule { rule: String },

    #[error("grammar defines no rules")]
    #[diagnostic(code(fixedpoint::grammar::no_rules))]
    NoRules,
}

// ============================================================================
// TOKENIZER
// ============================================================================

#[derive(Debug, Error, Diagnostic)]
pub enum TokenizerError {
    #[error("rule '{rule}' has an invalid pattern")]
    #[diagnostic(code(fixedpoint::tokenizer::invalid_pattern))]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("token '{token}' matches no rule")]
    #[diagnostic(
        code(fixedpoint::tokenizer::unclassified),
        help("the unioned pattern and the per-rule patterns disagree; check the rule table")
    )]
    UnclassifiedToken {
        token: String,
        #[source_code]
        src: SourceArc,
        #[label("unclassified token")]
        span: SourceSpan,
    },

    #[error("input is not covered by any rule")]
    #[diagnostic(code(fixedpoint::tokenizer::unmatched))]
    UnmatchedInput {
        #[source_code]
        src: SourceArc,
        #[label("no rule matches here")]
        span: SourceSpan,
    },

    #[error("token '{token}' was produced by rule '{produced_by}' but identifies as '{identified_as}'")]
    #[diagnostic(
        code(fixedpoint::tokenizer::disagreement),
        help("reorder the rules so the earlier rule wins in both places")
    )]
    Disagreement {
        token: String,
        produced_by: String,
        identified_as: String,
        #[source_code]
        src: SourceArc,
        #[label("classified inconsistently")]
        span: SourceSpan,
    },
}

// ============================================================================
// PARSING
// ============================================================================

/// Failure of a top-level parse. Raised only at the API boundary; inside the
/// engine a failed match is ordinary control data.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("rule '{rule}' does not match; expected {expected}")]
    #[diagnostic(code(fixedpoint::parse::no_match))]
    NoMatch {
        rule: String,
        expected: String,
        #[source_code]
        src: SourceArc,
        #[label("parsing stopped here")]
        span: SourceSpan,
    },

    #[error("rule '{rule}' matched only the first {consumed} bytes; expected {expected}")]
    #[diagnostic(
        code(fixedpoint::parse::incomplete),
        help("the start rule must consume the whole input")
    )]
    Incomplete {
        rule: String,
        consumed: usize,
        expected: String,
        #[source_code]
        src: SourceArc,
        #[label("unparsed input starts here")]
        span: SourceSpan,
    },

    #[error("rule '{rule}' nests more than {limit} evaluations deep")]
    #[diagnostic(
        code(fixedpoint::parse::too_deep),
        help("the input nests too deeply for this grammar; raise the limit with `Packrat::with_depth_limit`")
    )]
    TooDeep {
        rule: String,
        limit: usize,
        #[source_code]
        src: SourceArc,
        #[label("nesting limit reached here")]
        span: SourceSpan,
    },

    #[error("no rule named '{rule}'")]
    #[diagnostic(code(fixedpoint::parse::unknown_rule))]
    UnknownRule { rule: String },
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("cannot read '{path}'")]
    #[diagnostic(code(fixedpoint::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rule table")]
    #[diagnostic(code(fixedpoint::config::yaml))]
    Yaml {
        #[source]
        source: serde_yaml::Error,
    },
}

// ============================================================================
// UMBRELLA
// ============================================================================

#[derive(Debug, Error, Diagnostic)]
pub enum FixedpointError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot serialize output")]
    #[diagnostic(code(fixedpoint::output::serialize))]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T, E = FixedpointError> = std::result::Result<T, E>;
