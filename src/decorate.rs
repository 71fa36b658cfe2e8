//! Token decoration: feeding classified tokens to a display surface.
//!
//! [`render`] walks the input once, handing each classified token to a
//! [`DecorationSink`] and any text between tokens to the same sink as plain
//! text, so the sink always sees the whole input in order.

use unicode_width::UnicodeWidthChar;

use crate::errors::{to_source_span, SourceContext, TokenizerError};
use crate::tokenizer::Tokenizer;

// ============================================================================
// SINKS
// ============================================================================

/// Receives decorated text in input order.
pub trait DecorationSink {
    /// A token the tokenizer classified as `kind`.
    fn token(&mut self, kind: &str, text: &str);
    /// Text no rule matched.
    fn plain(&mut self, text: &str);
}

/// Collects HTML markup: one `<span class="kind">` per token.
#[derive(Debug, Default)]
pub struct HtmlBuffer {
    pub buffer: String,
}

impl HtmlBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }
}

impl DecorationSink for HtmlBuffer {
    fn token(&mut self, kind: &str, text: &str) {
        self.buffer.push_str("<span class=\"");
        escape_html(&mut self.buffer, kind);
        self.buffer.push_str("\">");
        escape_html(&mut self.buffer, text);
        self.buffer.push_str("</span>");
    }

    fn plain(&mut self, text: &str) {
        escape_html(&mut self.buffer, text);
    }
}

fn escape_html(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

/// Decorates `input`, returning the number of tokens written.
///
/// A token that no rule identifies is an error; nothing after it is
/// written.
///
/// # Examples
///
/// ```rust
/// use fixedpoint::decorate::{render, HtmlBuffer};
/// use fixedpoint::tokenizer::Tokenizer;
///
/// let t = Tokenizer::new([("num", "[0-9]+"), ("op", r"[+*]")], false).unwrap();
/// let mut html = HtmlBuffer::new();
/// assert_eq!(render(&t, "1 + 2", &mut html).unwrap(), 3);
/// assert_eq!(
///     html.as_str(),
///     r#"<span class="num">1</span> <span class="op">+</span> <span class="num">2</span>"#
/// );
/// ```
pub fn render(tokenizer: &Tokenizer, input: &str, sink: &mut impl DecorationSink) -> Result<usize, TokenizerError> {
    let mut written = 0;
    let mut covered = 0;
    for scanned in tokenizer.scan(input) {
        if scanned.span.start > covered {
            sink.plain(&input[covered..scanned.span.start]);
        }
        let kind = tokenizer
            .identify(scanned.text)
            .ok_or_else(|| TokenizerError::UnclassifiedToken {
                token: scanned.text.to_string(),
                src: SourceContext::anonymous(input).to_named_source(),
                span: to_source_span(scanned.span),
            })?;
        sink.token(kind, scanned.text);
        written += 1;
        covered = scanned.span.end;
    }
    if covered < input.len() {
        sink.plain(&input[covered..]);
    }
    Ok(written)
}

// ============================================================================
// EXTENT
// ============================================================================

/// Display size a decorated text needs, in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub cols: usize,
    pub rows: usize,
}

impl Extent {
    /// `None` for empty input: empty text forces no size at all.
    ///
    /// Otherwise one column more than the widest line, with tabs advancing
    /// to the next multiple of 8, and two rows more than the line count.
    pub fn measure(input: &str) -> Option<Extent> {
        if input.is_empty() {
            return None;
        }
        let lines: Vec<&str> = input.split('\n').collect();
        let widest = lines.iter().map(|line| line_width(line)).max().unwrap_or(0);
        Some(Extent {
            cols: widest + 1,
            rows: lines.len() + 2,
        })
    }
}

fn line_width(line: &str) -> usize {
    line.trim_end_matches('\r').chars().fold(0, |col, c| match c {
        '\t' => col + 8 - col % 8,
        c => col + c.width().unwrap_or(0),
    })
}
