mod common;

use fixedpoint::config::TokenizerConfig;
use fixedpoint::errors::TokenizerError;
use fixedpoint::Tokenizer;

use common::rule_tables;

fn build(table: &common::TableFixture) -> Tokenizer {
    Tokenizer::new(table.pairs(), table.case_insensitive)
        .unwrap_or_else(|e| panic!("{}: {e}", table.path.display()))
}

#[test]
fn concatenated_examples_tokenize_back_into_the_examples() {
    for table in rule_tables() {
        let tokenizer = build(&table);
        let input: String = table.rules.iter().map(|r| r.example.as_str()).collect();
        let expected: Vec<&str> = table.rules.iter().map(|r| r.example.as_str()).collect();
        assert_eq!(tokenizer.tokenize(&input), expected, "{}", table.path.display());

        let kinds: Vec<_> = tokenizer
            .classify(&input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect();
        let names: Vec<_> = table.rules.iter().map(|r| r.name.clone()).collect();
        assert_eq!(kinds, names, "{}", table.path.display());
    }
}

#[test]
fn every_example_token_is_identified_by_its_rule() {
    for table in rule_tables() {
        let tokenizer = build(&table);
        for rule in &table.rules {
            assert_eq!(tokenizer.identify(&rule.example), Some(rule.name.as_str()));
        }
    }
}

#[test]
fn tokens_and_identification_agree_on_fixture_inputs() {
    for table in rule_tables() {
        let tokenizer = build(&table);
        let input: String = table.rules.iter().map(|r| r.example.as_str()).collect();
        tokenizer.check_agreement(&input).unwrap();
        for token in tokenizer.tokenize(&input) {
            assert!(tokenizer.identify(token).is_some(), "{token:?} unidentified");
        }
    }
}

#[test]
fn adding_no_rules_changes_nothing() {
    for table in rule_tables() {
        let mut tokenizer = build(&table);
        let input: String = table.rules.iter().map(|r| r.example.as_str()).collect();
        let before = tokenizer.tokenize(&input).join("|");

        tokenizer.add(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(tokenizer.tokenize(&input).join("|"), before);
        for rule in &table.rules {
            assert_eq!(tokenizer.identify(&rule.example), Some(rule.name.as_str()));
        }
    }
}

#[test]
fn empty_input_tokenizes_to_nothing() {
    for table in rule_tables() {
        let tokenizer = build(&table);
        assert!(tokenizer.tokenize("").is_empty());
        assert!(tokenizer.classify("").unwrap().is_empty());
    }
}

#[test]
fn redefining_a_rule_keeps_its_priority() {
    let mut tokenizer = Tokenizer::new([("kw", "if"), ("id", "[a-z]+")], false).unwrap();
    assert_eq!(tokenizer.tokenize("iffy"), vec!["if", "fy"]);

    // Redefined in place, `kw` still comes before `id`.
    tokenizer.add([("kw", r"if\b")]).unwrap();
    assert_eq!(tokenizer.tokenize("iffy if"), vec!["iffy", "if"]);
    assert_eq!(tokenizer.identify("if"), Some("kw"));
    tokenizer.check_agreement("iffy if").unwrap();
}

#[test]
fn config_builds_the_same_tokenizer_as_the_table() {
    let path = common::fixture("rules/code.yaml");
    let config = TokenizerConfig::load(&path).unwrap();
    let tokenizer = config.build().unwrap();
    let tokens = tokenizer.classify("x = 3.14 # pi").unwrap();
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind.as_str()).collect();
    assert_eq!(kinds, vec!["ident", "space", "op", "space", "number", "space", "comment"]);
}

#[test]
fn strict_classification_rejects_uncovered_text() {
    let config = TokenizerConfig::load(&common::fixture("rules/code.yaml")).unwrap();
    let tokenizer = config.build().unwrap();
    match tokenizer.classify("x ? y").unwrap_err() {
        TokenizerError::UnmatchedInput { span, .. } => {
            assert_eq!(span.offset(), 2);
            assert_eq!(span.len(), 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
