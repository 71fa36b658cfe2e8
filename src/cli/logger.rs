//! Stderr logger behind the `log` facade.
//!
//! Default level shows warnings only; each `-v` raises it one step.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::Write;
use termcolor::{Color, ColorSpec, StandardStream, WriteColor};

use crate::cli::output::color_choice;

struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = StandardStream::stderr(color_choice(atty::Stream::Stderr));
        let color = match record.level() {
            Level::Error => Color::Red,
            Level::Warn => Color::Yellow,
            Level::Info => Color::Green,
            Level::Debug => Color::Cyan,
            Level::Trace => Color::Magenta,
        };
        let _ = stderr.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
        let _ = write!(stderr, "[{:<5}]", record.level());
        let _ = stderr.reset();
        let _ = writeln!(stderr, " {}: {}", record.target(), record.args());
    }

    fn flush(&self) {}
}

pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Installs the logger. A second call keeps the first logger.
pub fn init(verbosity: u8) {
    let level = level_for(verbosity);
    if log::set_boxed_logger(Box::new(StderrLogger { level })).is_ok() {
        log::set_max_level(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0), LevelFilter::Warn);
        assert_eq!(level_for(1), LevelFilter::Debug);
        assert_eq!(level_for(7), LevelFilter::Trace);
    }
}
