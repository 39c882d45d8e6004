//! Terminal status output.
//!
//! Status lines go to stderr with a coloured glyph; build summaries list
//! each finished task with its duration.
//!
//! ```no_run
//! use kiln_cli::ui;
//!
//! ui::init_colors(false);
//! ui::success("Build complete");
//! ui::error("Failed to read kiln.toml");
//! ```

mod format;
mod messages;

pub use format::{format_duration, format_size, print_build_summary, task_list};
pub use messages::{error, info, success, warning};

/// Check if color output should be enabled.
///
/// `NO_COLOR` disables colors, `FORCE_COLOR` enables them, otherwise they
/// follow whether stderr is a terminal.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    console::user_attended_stderr()
}

/// Apply the color decision to `console` output on stderr.
pub fn init_colors(no_color: bool) {
    console::set_colors_enabled_stderr(!no_color && should_use_color());
}
