//! One-line status messages on stderr.

use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Success,
    Info,
    Warning,
    Error,
}

/// Glyph and (for problems) message colouring for one status line.
fn status_line(level: Level, message: &str) -> String {
    match level {
        Level::Success => format!("{} {}", "✓".green().bold(), message),
        Level::Info => format!("{} {}", "ℹ".blue().bold(), message),
        Level::Warning => format!("{} {}", "⚠".yellow().bold(), message.yellow()),
        Level::Error => format!("{} {}", "✗".red().bold(), message.red()),
    }
}

pub fn success(message: &str) {
    eprintln!("{}", status_line(Level::Success, message));
}

pub fn info(message: &str) {
    eprintln!("{}", status_line(Level::Info, message));
}

/// Soft problems: the build went on.
pub fn warning(message: &str) {
    eprintln!("{}", status_line(Level::Warning, message));
}

pub fn error(message: &str) {
    eprintln!("{}", status_line(Level::Error, message));
}
