//! # fixedpoint
//!
//! Two parsing front ends over plain text:
//!
//! - [`tokenizer`]: an ordered table of named regular expressions that splits
//!   input into tokens and names each token after the first rule matching it
//!   whole;
//! - [`peg`]: a memoizing (packrat) evaluator for parsing expression
//!   grammars, building uniform [`ast::Node`] trees.
//!
//! Grammars are ordinary data ([`grammar::Grammar`]). The grammar of grammar
//! sources is itself one of them ([`grammar::Grammar::meta`]), so grammar
//! files are parsed by the same engine that runs them.
//!
//! ```rust
//! use fixedpoint::grammar::Grammar;
//!
//! let g = Grammar::from_source("%Sum <- %Num ('+' %Num)*\n%Num <- [0-9]+").unwrap();
//! assert_eq!(g.parse("1+20").unwrap().to_string(), r#"(Sum (Num) (Num))"#);
//! ```

pub mod ast;
pub mod cli;
pub mod config;
pub mod decorate;
pub mod errors;
pub mod grammar;
pub mod memo;
pub mod peg;
pub mod tokenizer;

pub use crate::ast::{Child, Node, Span};
pub use crate::errors::{FixedpointError, Result};
pub use crate::grammar::{Expr, Grammar};
pub use crate::peg::Packrat;
pub use crate::tokenizer::Tokenizer;
