// CLI end-to-end tests: every subcommand against the fixtures, and miette
// rendering of failures.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

use common::fixture;

fn fixedpoint() -> Command {
    Command::cargo_bin("fixedpoint").unwrap()
}

#[test]
fn meta_check_reports_a_fixed_point() {
    fixedpoint()
        .args(["meta", "--check"])
        .assert()
        .success()
        .stdout(contains("reproduces itself"));
}

#[test]
fn meta_prints_the_grammar_source() {
    fixedpoint()
        .arg("meta")
        .assert()
        .success()
        .stdout(contains("%start <- Spacing %Definition+ EOF").and(contains("EOF <- !.")));
}

#[test]
fn parse_prints_the_tree_outline() {
    fixedpoint()
        .arg("parse")
        .arg("--grammar")
        .arg(fixture("grammars/arith.peg"))
        .arg(fixture("inputs/expr.txt"))
        .assert()
        .success()
        .stdout(contains("Sum @0..5").and(contains("MulOp")));
}

#[test]
fn parse_exports_graph_json_and_dot() {
    fixedpoint()
        .arg("parse")
        .arg("--grammar")
        .arg(fixture("grammars/arith.peg"))
        .arg(fixture("inputs/expr.txt"))
        .args(["--format", "graph"])
        .assert()
        .success()
        .stdout(contains("\"directed\": true").and(contains("\"shape\": \"box\"")));

    fixedpoint()
        .arg("parse")
        .arg("--grammar")
        .arg(fixture("grammars/arith.peg"))
        .arg(fixture("inputs/expr.txt"))
        .args(["--format", "dot"])
        .assert()
        .success()
        .stdout(contains("digraph ast {").and(contains("n1 -> n2;")));
}

#[test]
fn parse_from_another_rule() {
    fixedpoint()
        .arg("parse")
        .arg("--grammar")
        .arg(fixture("grammars/arith.peg"))
        .arg(fixture("inputs/expr.txt"))
        .args(["--rule", "Number", "--format", "json"])
        .assert()
        .failure()
        .stderr(contains("fixedpoint::parse::incomplete"));
}

#[test]
fn parse_failure_is_a_miette_diagnostic() {
    fixedpoint()
        .arg("parse")
        .arg("--grammar")
        .arg(fixture("grammars/arith.peg"))
        .arg(fixture("inputs/bad_expr.txt"))
        .assert()
        .failure()
        .stderr(contains("fixedpoint::parse").and(contains("bad_expr.txt")));
}

#[test]
fn tokenize_lists_classified_tokens() {
    fixedpoint()
        .arg("tokenize")
        .arg("--rules")
        .arg(fixture("rules/code.yaml"))
        .arg(fixture("inputs/code.txt"))
        .arg("--json")
        .assert()
        .success()
        .stdout(contains("\"kind\": \"number\"").and(contains("\"text\": \"3.14\"")));
}

#[test]
fn tokenize_rejects_uncovered_input() {
    fixedpoint()
        .arg("tokenize")
        .arg("--rules")
        .arg(fixture("rules/code.yaml"))
        .arg(fixture("inputs/bad_code.txt"))
        .assert()
        .failure()
        .stderr(contains("fixedpoint::tokenizer::unmatched"));
}

#[test]
fn highlight_emits_html_spans() {
    fixedpoint()
        .arg("highlight")
        .arg("--rules")
        .arg(fixture("rules/code.yaml"))
        .arg(fixture("inputs/code.txt"))
        .arg("--html")
        .assert()
        .success()
        .stdout(contains("<span class=\"number\">3.14</span>").and(contains("<pre>")));
}

#[test]
fn missing_rule_file_names_the_path() {
    fixedpoint()
        .arg("tokenize")
        .arg("--rules")
        .arg(fixture("rules/missing.yaml"))
        .arg(fixture("inputs/code.txt"))
        .assert()
        .failure()
        .stderr(contains("fixedpoint::config::io").and(contains("missing.yaml")));
}

#[test]
fn verbose_flag_enables_debug_logging() {
    fixedpoint()
        .args(["-v", "meta"])
        .assert()
        .success()
        .stderr(contains("DEBUG"));
}
