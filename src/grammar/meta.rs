//! The meta-grammar: the grammar of grammar sources, written as a node table.
//!
//! Parsing [`Grammar::to_source`](super::Grammar::to_source) of this grammar
//! with this grammar rebuilds it exactly; see `tests/meta_grammar.rs`.

use crate::ast::Node;
use crate::node;

use super::Grammar;

fn index(rule: &str, skip: &str) -> Node {
    node!("Index", node!("Label", rule), skip)
}

fn label(rule: &str) -> Node {
    node!("Label", rule)
}

fn arg(n: Node) -> Node {
    node!("Argument", n)
}

/// `name <- 'text' Spacing`, the shape of every operator token.
fn token(text: &str) -> Node {
    node!("Sequence", node!("String", text), label("Spacing"))
}

fn class_item() -> Node {
    node!(
        "Choice",
        arg(node!("Sequence", label("Char"), node!("String", "-"), label("Char"))),
        arg(label("Char"))
    )
}

fn quoted(quote: &str) -> Node {
    node!(
        "Sequence",
        node!("String", quote),
        arg(node!(
            "ZeroOrMore",
            node!("Sequence", node!("NotLookahead", node!("String", quote)), label("Char"))
        )),
        node!("String", quote)
    )
}

/// The meta-grammar rule table, in definition order. `start` comes first.
pub fn table() -> Vec<(&'static str, Node)> {
    vec![
        (
            "start",
            node!(
                "Node",
                "start",
                node!(
                    "Sequence",
                    label("Spacing"),
                    arg(node!("OneOrMore", label("Definition"))),
                    label("EOF")
                )
            ),
        ),
        (
            "Definition",
            node!(
                "Node",
                "Definition",
                node!(
                    "Sequence",
                    arg(node!("Choice", label("Label"), label("Node"))),
                    label("LEFTARROW"),
                    arg(label("ParseExpr"))
                )
            ),
        ),
        (
            "ParseExpr",
            node!(
                "Choice",
                arg(label("Choice")),
                arg(label("Sequence")),
                node!(
                    "Choice",
                    arg(label("Lookahead")),
                    arg(label("NotLookahead")),
                    arg(label("Argument"))
                ),
                node!(
                    "Choice",
                    arg(label("ZeroOrOne")),
                    arg(label("ZeroOrMore")),
                    arg(label("OneOrMore"))
                ),
                arg(label("Primary"))
            ),
        ),
        (
            "Choice",
            node!(
                "Node",
                "Choice",
                node!(
                    "Sequence",
                    arg(index("ParseExpr", "1")),
                    node!(
                        "OneOrMore",
                        node!("Sequence", label("SLASH"), arg(index("ParseExpr", "1")))
                    )
                )
            ),
        ),
        (
            "Sequence",
            node!(
                "Node",
                "Sequence",
                node!(
                    "Sequence",
                    arg(index("ParseExpr", "2")),
                    node!("OneOrMore", arg(index("ParseExpr", "2")))
                )
            ),
        ),
        ("Lookahead", prefix("Lookahead", "AMP")),
        ("NotLookahead", prefix("NotLookahead", "BANG")),
        ("Argument", prefix("Argument", "ARG")),
        ("ZeroOrOne", suffix("ZeroOrOne", "QUESTION")),
        ("ZeroOrMore", suffix("ZeroOrMore", "STAR")),
        ("OneOrMore", suffix("OneOrMore", "PLUS")),
        (
            "Primary",
            node!(
                "Choice",
                node!("Sequence", label("OPEN"), arg(label("ParseExpr")), label("CLOSE")),
                arg(label("Index")),
                node!(
                    "Sequence",
                    arg(label("Label")),
                    node!("NotLookahead", label("LEFTARROW"))
                ),
                arg(label("String")),
                arg(label("CharClass")),
                arg(label("Dot"))
            ),
        ),
        (
            "Node",
            node!("Node", "Node", node!("Sequence", label("ARG"), arg(label("Label")))),
        ),
        (
            "Index",
            node!(
                "Node",
                "Index",
                node!(
                    "Sequence",
                    arg(label("Label")),
                    node!("String", ":"),
                    arg(node!("OneOrMore", node!("CharClass", "0-9"))),
                    label("Spacing")
                )
            ),
        ),
        (
            "Label",
            node!(
                "Node",
                "Label",
                node!(
                    "Sequence",
                    arg(node!(
                        "Sequence",
                        node!("CharClass", "a-z", "A-Z", "_"),
                        node!("ZeroOrMore", node!("CharClass", "a-z", "A-Z", "_", "0-9"))
                    )),
                    label("Spacing")
                )
            ),
        ),
        (
            "Spacing",
            node!("ZeroOrMore", node!("Choice", label("SPACE"), label("Comment"))),
        ),
        (
            "Comment",
            node!(
                "Sequence",
                node!("String", "#"),
                node!(
                    "ZeroOrMore",
                    node!("Sequence", node!("NotLookahead", label("EOL")), node!("Dot"))
                ),
                node!("Choice", label("EOL"), label("EOF"))
            ),
        ),
        ("LEFTARROW", token("<-")),
        ("SLASH", token("/")),
        ("ARG", token("%")),
        ("AMP", token("&")),
        ("BANG", token("!")),
        ("QUESTION", token("?")),
        ("STAR", token("*")),
        ("PLUS", token("+")),
        (
            "OPEN",
            node!("Sequence", arg(node!("String", "(")), label("Spacing")),
        ),
        ("CLOSE", token(")")),
        ("Dot", node!("Node", "Dot", token("."))),
        (
            "SPACE",
            node!("Choice", node!("String", " "), node!("String", "\t"), label("EOL")),
        ),
        (
            "EOL",
            node!(
                "Choice",
                node!("String", "\r\n"),
                node!("String", "\r"),
                node!("String", "\n")
            ),
        ),
        ("EOF", node!("NotLookahead", node!("Dot"))),
        (
            "CharClass",
            node!(
                "Node",
                "CharClass",
                node!(
                    "Sequence",
                    node!("String", "["),
                    class_item(),
                    node!(
                        "ZeroOrMore",
                        node!("Sequence", node!("NotLookahead", node!("String", "]")), class_item())
                    ),
                    node!("String", "]"),
                    label("Spacing")
                )
            ),
        ),
        (
            "String",
            node!(
                "Node",
                "String",
                node!(
                    "Sequence",
                    node!("Choice", quoted("\""), quoted("'")),
                    label("Spacing")
                )
            ),
        ),
        (
            "Char",
            arg(node!(
                "Choice",
                node!(
                    "Sequence",
                    node!("String", "\\"),
                    node!("CharClass", "]", "[", "n", "r", "t", "'", "\"", "\\")
                ),
                node!(
                    "Sequence",
                    node!("String", "\\"),
                    node!("CharClass", "0-2"),
                    node!("CharClass", "0-7"),
                    node!("CharClass", "0-7")
                ),
                node!(
                    "Sequence",
                    node!("String", "\\"),
                    node!("CharClass", "0-7"),
                    node!("ZeroOrOne", node!("CharClass", "0-7"))
                ),
                node!(
                    "Sequence",
                    node!("NotLookahead", node!("String", "\\")),
                    node!("Dot")
                )
            )),
        ),
    ]
}

fn prefix(kind: &str, operator: &str) -> Node {
    node!(
        "Node",
        kind,
        node!("Sequence", label(operator), arg(index("ParseExpr", "3")))
    )
}

fn suffix(kind: &str, operator: &str) -> Node {
    node!(
        "Node",
        kind,
        node!("Sequence", arg(index("ParseExpr", "4")), label(operator))
    )
}

/// Builds the meta-grammar. Prefer the shared instance from
/// [`Grammar::meta`].
pub(crate) fn grammar() -> Grammar {
    match Grammar::from_table(table()) {
        Ok(grammar) => grammar,
        // The table is a constant; a failure here is a bug in this file.
        Err(err) => panic!("meta-grammar table is invalid: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Expr;

    #[test]
    fn table_builds_with_start_first() {
        let g = Grammar::meta();
        assert_eq!(g.start(), "start");
        assert_eq!(g.len(), table().len());
        assert_eq!(g.rules()[1].name, "Definition");
    }

    #[test]
    fn parse_expr_alternatives_follow_precedence() {
        let g = Grammar::meta();
        let Some(Expr::Choice(alternatives)) = g.rule("ParseExpr").map(|r| &r.expr) else {
            panic!("ParseExpr must be a choice");
        };
        assert_eq!(alternatives.len(), 5);
        assert_eq!(alternatives[0], Expr::arg(Expr::label("Choice")));
        assert_eq!(alternatives[4], Expr::arg(Expr::label("Primary")));
    }

    #[test]
    fn char_rule_accepts_escapes() {
        let g = Grammar::meta();
        for input in ["a", "\\n", "\\]", "\\101", "\\7", "\\07"] {
            let tree = g.parse_rule("Char", input).unwrap();
            assert_eq!(tree.text(), input, "{input}");
        }
    }
}
