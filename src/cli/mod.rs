//! The fixedpoint Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use clap::Parser;
use log::debug;
use miette::Report;
use std::path::Path;
use std::process;

use crate::ast::export::Graph;
use crate::cli::args::{Command, FixedpointArgs, TreeFormat};
use crate::config::{self, TokenizerConfig};
use crate::decorate::{self, HtmlBuffer};
use crate::errors::Result;
use crate::grammar::Grammar;
use crate::peg::Packrat;

pub mod args;
pub mod logger;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = FixedpointArgs::parse();
    logger::init(args.verbose);

    // Dispatch to the appropriate subcommand handler.
    let result = match args.command {
        Command::Tokenize { rules, file, json } => handle_tokenize(&rules, &file, json),
        Command::Highlight { rules, file, html } => handle_highlight(&rules, &file, html),
        Command::Parse {
            grammar,
            file,
            rule,
            format,
        } => handle_parse(&grammar, &file, rule.as_deref(), format),
        Command::Meta { check } => handle_meta(check),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            let report = Report::new(e);
            eprintln!("{report:?}");
            process::exit(1);
        }
    }
}

// ============================================================================
// SUBCOMMAND HANDLERS
// ============================================================================
//
// Each handler returns whether the command succeeded; errors carry their own
// diagnostics.

fn handle_tokenize(rules: &Path, file: &Path, json: bool) -> Result<bool> {
    let tokenizer = TokenizerConfig::load(rules)?.build()?;
    let source = config::read_source(file)?;
    let tokens = tokenizer.classify_named(&source.name, &source.content)?;
    debug!("{} tokens in {}", tokens.len(), source.name);
    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    } else {
        output::print_tokens(&tokens);
    }
    Ok(true)
}

fn handle_highlight(rules: &Path, file: &Path, html: bool) -> Result<bool> {
    let tokenizer = TokenizerConfig::load(rules)?.build()?;
    let source = config::read_source(file)?;
    if let Some(extent) = decorate::Extent::measure(&source.content) {
        debug!("{} needs {} columns by {} rows", source.name, extent.cols, extent.rows);
    }
    if html {
        let mut buffer = HtmlBuffer::new();
        decorate::render(&tokenizer, &source.content, &mut buffer)?;
        println!("<pre>{}</pre>", buffer.as_str());
    } else {
        let mut sink = output::TerminalSink::stdout();
        decorate::render(&tokenizer, &source.content, &mut sink)?;
    }
    Ok(true)
}

fn handle_parse(grammar: &Path, file: &Path, rule: Option<&str>, format: TreeFormat) -> Result<bool> {
    let grammar = config::load_grammar(grammar)?;
    let source = config::read_source(file)?;
    let rule = rule.unwrap_or(grammar.start());
    let tree = Packrat::new(&grammar, &source.content)
        .named(&source.name)
        .parse(rule)?;
    match format {
        TreeFormat::Tree => print!("{}", tree.pretty()),
        TreeFormat::Json => println!("{}", serde_json::to_string_pretty(&tree)?),
        TreeFormat::Graph => println!("{}", Graph::from_node(&tree).to_json()?),
        TreeFormat::Dot => print!("{}", Graph::from_node(&tree).to_dot()),
    }
    Ok(true)
}

fn handle_meta(check: bool) -> Result<bool> {
    let meta = Grammar::meta();
    let printed = meta.to_source()?;
    if !check {
        print!("{}", printed);
        return Ok(true);
    }
    let reparsed = Grammar::from_source(&printed)?;
    let reprinted = reparsed.to_source()?;
    let same = reparsed == *meta;
    output::print_check(&printed, &reprinted, meta.len(), same);
    Ok(same)
}
