//! Grammar source text: printing a [`Grammar`] back to the notation the
//! meta-grammar reads, and decoding the escapes that notation uses.
//!
//! The printer inserts parentheses only where precedence requires them:
//!
//! | level | forms             |
//! |-------|-------------------|
//! | 1     | `a / b`           |
//! | 2     | `a b`             |
//! | 3     | `&a` `!a` `%a`    |
//! | 4     | `a?` `a*` `a+`    |
//! | 5     | names, literals   |

use std::fmt::Write;

use crate::errors::GrammarError;

use super::{ClassItem, Expr, Grammar, Rule};

// ============================================================================
// PRINTING
// ============================================================================

impl Grammar {
    /// Prints the grammar as source text, one definition per line.
    ///
    /// A rule whose whole body is a node wrapper of its own name prints as
    /// `%Name <- ...`. Node wrappers anywhere else have no source notation
    /// and are reported as malformed.
    pub fn to_source(&self) -> Result<String, GrammarError> {
        let mut out = String::new();
        for rule in self.rules() {
            out.push_str(&rule_source(rule)?);
            out.push('\n');
        }
        Ok(out)
    }
}

fn rule_source(rule: &Rule) -> Result<String, GrammarError> {
    match &rule.expr {
        Expr::Node { kind, expr } if *kind == rule.name => {
            Ok(format!("%{} <- {}", rule.name, print(&rule.name, expr, 0)?))
        }
        expr => Ok(format!("{} <- {}", rule.name, print(&rule.name, expr, 0)?)),
    }
}

fn level(expr: &Expr) -> u8 {
    match expr {
        Expr::Choice(_) => 1,
        Expr::Sequence(_) => 2,
        Expr::Lookahead(_) | Expr::NotLookahead(_) | Expr::Argument(_) => 3,
        Expr::ZeroOrOne(_) | Expr::ZeroOrMore(_) | Expr::OneOrMore(_) => 4,
        _ => 5,
    }
}

fn print(rule: &str, expr: &Expr, min_level: u8) -> Result<String, GrammarError> {
    let join = |items: &[Expr], sep: &str, child_level: u8| -> Result<String, GrammarError> {
        let parts = items
            .iter()
            .map(|item| print(rule, item, child_level))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parts.join(sep))
    };

    let text = match expr {
        Expr::Choice(alternatives) => join(alternatives, " / ", 2)?,
        Expr::Sequence(items) => join(items, " ", 3)?,
        Expr::Lookahead(e) => format!("&{}", print(rule, e, 4)?),
        Expr::NotLookahead(e) => format!("!{}", print(rule, e, 4)?),
        Expr::Argument(e) => format!("%{}", print(rule, e, 4)?),
        Expr::ZeroOrOne(e) => format!("{}?", print(rule, e, 5)?),
        Expr::ZeroOrMore(e) => format!("{}*", print(rule, e, 5)?),
        Expr::OneOrMore(e) => format!("{}+", print(rule, e, 5)?),
        Expr::Label(name) => name.clone(),
        Expr::Index { rule: target, skip } => format!("{}:{}", target, skip),
        Expr::String(text) => quote_string(text),
        Expr::CharClass(items) => quote_class(items),
        Expr::Dot => ".".to_string(),
        Expr::Node { kind, .. } => {
            return Err(GrammarError::MalformedExpression {
                rule: rule.to_string(),
                kind: "Node".to_string(),
                reason: format!("a '{}' node wrapper can only be a rule's whole body", kind),
            })
        }
    };

    if level(expr) < min_level {
        Ok(format!("({})", text))
    } else {
        Ok(text)
    }
}

fn escape_char(out: &mut String, c: char) {
    match c {
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\\' => out.push_str("\\\\"),
        c if c.is_control() && (c as u32) < 0o300 => {
            let _ = write!(out, "\\{:03o}", c as u32);
        }
        c => out.push(c),
    }
}

fn quote_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        if c == '\'' {
            out.push_str("\\'");
        } else {
            escape_char(&mut out, c);
        }
    }
    out.push('\'');
    out
}

fn class_char(out: &mut String, c: char) {
    match c {
        ']' => out.push_str("\\]"),
        '[' => out.push_str("\\["),
        '-' => out.push_str("\\055"),
        c => escape_char(out, c),
    }
}

pub(crate) fn quote_class(items: &[ClassItem]) -> String {
    let mut out = String::from("[");
    for item in items {
        match *item {
            ClassItem::Char(c) => class_char(&mut out, c),
            ClassItem::Range(lo, hi) => {
                class_char(&mut out, lo);
                out.push('-');
                class_char(&mut out, hi);
            }
        }
    }
    out.push(']');
    out
}

// ============================================================================
// ESCAPES
// ============================================================================

/// Decodes the escapes of string and class literals: `\n \r \t`, the quoted
/// characters `\' \" \\ \[ \]`, and octal codes of one to three digits.
///
/// A backslash that starts no escape is kept as it is.
///
/// # Examples
///
/// ```rust
/// use fixedpoint::grammar::source::unescape;
/// assert_eq!(unescape(r"a\tb"), "a\tb");
/// assert_eq!(unescape(r"\055"), "-");
/// assert_eq!(unescape(r"\7"), "\u{7}");
/// ```
pub fn unescape(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' || i + 1 == chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let next = chars[i + 1];
        match next {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '\'' | '"' | '\\' | '[' | ']' => out.push(next),
            '0'..='7' => {
                let octal = |k: usize| chars.get(k).filter(|c| ('0'..='7').contains(*c)).copied();
                let digits: String = if next <= '2' && octal(i + 2).is_some() && octal(i + 3).is_some() {
                    chars[i + 1..i + 4].iter().collect()
                } else if octal(i + 2).is_some() {
                    chars[i + 1..i + 3].iter().collect()
                } else {
                    next.to_string()
                };
                let decoded = u32::from_str_radix(&digits, 8).ok().and_then(char::from_u32);
                match decoded {
                    Some(c) => out.push(c),
                    None => {
                        out.push('\\');
                        out.push_str(&digits);
                    }
                }
                i += 1 + digits.len();
                continue;
            }
            _ => {
                out.push('\\');
                out.push(next);
            }
        }
        i += 2;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printed(expr: Expr) -> String {
        print("r", &expr, 0).unwrap()
    }

    #[test]
    fn parentheses_only_where_precedence_needs_them() {
        let e = Expr::seq(vec![
            Expr::choice(vec![Expr::lit("a"), Expr::lit("b")]),
            Expr::star(Expr::seq(vec![Expr::label("x"), Expr::label("y")])),
            Expr::not(Expr::opt(Expr::Dot)),
        ]);
        assert_eq!(printed(e), "('a' / 'b') (x y)* !.?");
    }

    #[test]
    fn prefix_operand_is_parenthesized_only_below_suffix_level() {
        assert_eq!(printed(Expr::arg(Expr::plus(Expr::label("a")))), "%a+");
        assert_eq!(printed(Expr::arg(Expr::not(Expr::label("a")))), "%(!a)");
        assert_eq!(printed(Expr::plus(Expr::arg(Expr::label("a")))), "(%a)+");
    }

    #[test]
    fn nested_choice_keeps_its_parentheses() {
        let e = Expr::choice(vec![
            Expr::label("a"),
            Expr::choice(vec![Expr::label("b"), Expr::label("c")]),
        ]);
        assert_eq!(printed(e), "a / (b / c)");
    }

    #[test]
    fn literals_are_escaped() {
        assert_eq!(quote_string("it's\n"), r"'it\'s\n'");
        assert_eq!(quote_string("\\"), r"'\\'");
        assert_eq!(quote_string("\u{1}"), r"'\001'");
        assert_eq!(
            quote_class(&[ClassItem::Char(']'), ClassItem::Char('-'), ClassItem::Range('a', 'z')]),
            r"[\]\055a-z]"
        );
    }

    #[test]
    fn nested_node_wrapper_is_malformed() {
        let err = print("r", &Expr::seq(vec![Expr::node("X", Expr::Dot), Expr::Dot]), 0).unwrap_err();
        assert!(matches!(err, GrammarError::MalformedExpression { .. }));
    }

    #[test]
    fn unescape_follows_the_char_rule() {
        assert_eq!(unescape(r#"\'\"\\\[\]"#), "'\"\\[]");
        assert_eq!(unescape(r"\101"), "A");
        assert_eq!(unescape(r"\377"), "\u{1f}7");
        assert_eq!(unescape(r"\08"), "\u{0}8");
        assert_eq!(unescape(r"\q"), r"\q");
        assert_eq!(unescape("\\"), "\\");
    }
}
