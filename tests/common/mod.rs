//! # Fixture loading shared by the integration tests
//!
//! Grammar fixtures are `.peg` files whose leading comments list inputs the
//! grammar must accept (`# accept: ...`) and reject (`# reject: ...`). Rule
//! table fixtures are the YAML the CLI reads, plus one `example` token per
//! rule.

#![allow(dead_code)]

use serde::Deserialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

pub fn fixture(relative: &str) -> PathBuf {
    fixtures_dir().join(relative)
}

/// Every file with the given extension under `fixtures/<dir>`, sorted.
fn discover(dir: &str, extension: &str) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(fixtures_dir().join(dir))
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.path().extension().map_or(false, |x| x == extension))
        .map(|e| e.into_path())
        .collect();
    paths.sort();
    assert!(!paths.is_empty(), "no .{extension} fixtures under {dir}");
    paths
}

// ============================================================================
// GRAMMAR FIXTURES
// ============================================================================

#[derive(Debug, Clone)]
pub struct GrammarCase {
    pub path: PathBuf,
    pub source: String,
    pub accept: Vec<String>,
    pub reject: Vec<String>,
}

pub fn grammar_cases() -> Vec<GrammarCase> {
    discover("grammars", "peg")
        .into_iter()
        .map(|path| {
            let source = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
            let mut accept = Vec::new();
            let mut reject = Vec::new();
            for line in source.lines() {
                if let Some(input) = line.strip_prefix("# accept: ") {
                    accept.push(input.to_string());
                } else if let Some(input) = line.strip_prefix("# reject: ") {
                    reject.push(input.to_string());
                }
            }
            GrammarCase {
                path,
                source,
                accept,
                reject,
            }
        })
        .collect()
}

// ============================================================================
// RULE TABLE FIXTURES
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RuleFixture {
    pub name: String,
    pub pattern: String,
    pub example: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableFixture {
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(default)]
    pub case_insensitive: bool,
    pub rules: Vec<RuleFixture>,
}

impl TableFixture {
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.rules
            .iter()
            .map(|r| (r.name.clone(), r.pattern.clone()))
            .collect()
    }
}

pub fn rule_tables() -> Vec<TableFixture> {
    discover("rules", "yaml")
        .into_iter()
        .map(|path| {
            let text = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
            let mut table: TableFixture = serde_yaml::from_str(&text)
                .unwrap_or_else(|e| panic!("bad fixture {}: {e}", path.display()));
            table.path = path;
            table
        })
        .collect()
}
