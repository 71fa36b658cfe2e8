//! Defines the command-line arguments and subcommands for the fixedpoint CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "fixedpoint",
    version,
    about = "Regex tokenizers and a self-describing packrat PEG parser."
)]
pub struct FixedpointArgs {
    /// Raise the log level (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Split a file into classified tokens.
    Tokenize {
        /// YAML rule table.
        #[arg(long)]
        rules: PathBuf,
        /// The file to tokenize.
        #[arg(required = true)]
        file: PathBuf,
        /// Print tokens as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print a file with each token decorated by its kind.
    Highlight {
        /// YAML rule table.
        #[arg(long)]
        rules: PathBuf,
        /// The file to highlight.
        #[arg(required = true)]
        file: PathBuf,
        /// Emit HTML spans instead of terminal colors.
        #[arg(long)]
        html: bool,
    },
    /// Parse a file with a PEG grammar and print the tree.
    Parse {
        /// Grammar source file.
        #[arg(long)]
        grammar: PathBuf,
        /// The file to parse.
        #[arg(required = true)]
        file: PathBuf,
        /// Rule to start from instead of the grammar's first rule.
        #[arg(long)]
        rule: Option<String>,
        #[arg(long, value_enum, default_value_t = TreeFormat::Tree)]
        format: TreeFormat,
    },
    /// Print the meta-grammar as grammar source.
    Meta {
        /// Re-parse the printed source and check it rebuilds the same grammar.
        #[arg(long)]
        check: bool,
    },
}

/// How `parse` prints the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TreeFormat {
    /// Indented outline.
    Tree,
    /// The tree itself as JSON.
    Json,
    /// Graph payload (nodes and edges) as JSON.
    Graph,
    /// Graphviz DOT.
    Dot,
}
