//! Handles all user-facing output for the CLI.
//!
//! Pretty-printing, colorizing, diffs and JSON all live here so every
//! subcommand prints the same way.

use difference::{Changeset, Difference};
use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::decorate::DecorationSink;
use crate::tokenizer::Token;

// ============================================================================
// OUTPUT SINKS
// ============================================================================

const PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Green,
    Color::Yellow,
    Color::Magenta,
    Color::Blue,
    Color::Red,
];

/// Picks a stable color for a token kind.
fn kind_color(kind: &str) -> Color {
    let hash = kind
        .bytes()
        .fold(0usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
    PALETTE[hash % PALETTE.len()]
}

/// Writes decorated text to a terminal, one color per token kind.
pub struct TerminalSink {
    stream: StandardStream,
}

impl TerminalSink {
    pub fn stdout() -> Self {
        Self {
            stream: StandardStream::stdout(color_choice(atty::Stream::Stdout)),
        }
    }
}

impl DecorationSink for TerminalSink {
    fn token(&mut self, kind: &str, text: &str) {
        let _ = self.stream.set_color(ColorSpec::new().set_fg(Some(kind_color(kind))));
        let _ = write!(self.stream, "{}", text);
        let _ = self.stream.reset();
    }

    fn plain(&mut self, text: &str) {
        let _ = write!(self.stream, "{}", text);
    }
}

/// Colors only when the stream is a terminal.
pub fn color_choice(stream: atty::Stream) -> ColorChoice {
    if atty::is(stream) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

// ============================================================================
// CORE OUTPUT FUNCTIONS
// ============================================================================

/// Prints one token per line: span, kind and the token text quoted.
pub fn print_tokens(tokens: &[Token<'_>]) {
    let mut stdout = StandardStream::stdout(color_choice(atty::Stream::Stdout));
    for token in tokens {
        let _ = write!(stdout, "{:>5}..{:<5} ", token.span.start, token.span.end);
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(kind_color(&token.kind))).set_bold(true));
        let _ = write!(stdout, "{:<12}", token.kind);
        let _ = stdout.reset();
        let _ = writeln!(stdout, " {:?}", token.text);
    }
}

/// Prints the meta-grammar self check: a success line, or the diff between
/// the printed source and its reprint.
pub fn print_check(original: &str, reprinted: &str, rules: usize, same: bool) {
    let mut stdout = StandardStream::stdout(color_choice(atty::Stream::Stdout));
    if same {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
        let _ = writeln!(stdout, "meta-grammar reproduces itself ({} rules)", rules);
        let _ = stdout.reset();
        return;
    }
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
    let _ = writeln!(stdout, "--- meta-grammar does not reproduce itself ---");
    let _ = stdout.reset();
    let changeset = Changeset::new(original, reprinted, "\n");
    print_diff(&mut stdout, &changeset.diffs);
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn print_diff(stdout: &mut StandardStream, diffs: &[Difference]) {
    for diff in diffs {
        match diff {
            Difference::Same(ref x) => {
                let _ = stdout.reset();
                let _ = writeln!(stdout, " {}", x);
            }
            Difference::Add(ref x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
                let _ = writeln!(stdout, "+{}", x);
            }
            Difference::Rem(ref x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
                let _ = writeln!(stdout, "-{}", x);
            }
        }
    }
    let _ = stdout.reset();
}
