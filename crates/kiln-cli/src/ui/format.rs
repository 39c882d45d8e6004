//! Formatting utilities for sizes, durations, summaries and the task list.

use console::Term;
use kiln_graph::TaskGraph;
use owo_colors::OwoColorize;
use std::fmt::Write as _;
use std::time::Duration;

/// Format file size in human-readable format.
///
/// ```
/// use kiln_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1024), "1.00 KB");
/// assert_eq!(format_size(1_048_576), "1.00 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format duration in human-readable format.
///
/// ```
/// use std::time::Duration;
/// use kiln_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Print a build summary table to stderr.
///
/// Each entry is `(task, output size if the task has one bundle, duration)`;
/// the footer shows the total output size and the wall time of the run.
pub fn print_build_summary(entries: &[(String, Option<u64>, Duration)], elapsed: Duration) {
    let width = Term::stderr().size().1 as usize;
    let rule = "─".repeat(width.clamp(20, 80));

    eprintln!("\n{}", "Build Summary".bold().underline());
    eprintln!("{}", rule);

    for (name, size, duration) in entries {
        let size_str = size.map(format_size).unwrap_or_default();
        eprintln!(
            "  {} {} {} {}",
            "▸".blue(),
            name.bright_white().bold(),
            size_str.dimmed(),
            format!("({})", format_duration(*duration)).dimmed()
        );
    }

    eprintln!("{}", rule);

    let total_size: u64 = entries.iter().filter_map(|(_, size, _)| *size).sum();
    eprintln!(
        "  {} {} in {}",
        "Total:".bold(),
        format_size(total_size).green(),
        format_duration(elapsed).green()
    );
}

/// One line per task in declaration order: `name <- prerequisites`.
pub fn task_list(graph: &TaskGraph) -> String {
    let width = graph.tasks().map(|spec| spec.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for spec in graph.tasks() {
        if spec.deps.is_empty() {
            let _ = writeln!(out, "{}", spec.name);
        } else {
            let _ = writeln!(
                out,
                "{:width$}  <- {}",
                spec.name,
                spec.deps.join(", "),
                width = width
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_graph::TaskSpec;

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1_073_741_824), "1.00 GB");
    }

    #[test]
    fn test_format_duration_boundaries() {
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1000)), "1.00s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m 0s");
    }

    #[test]
    fn test_task_list() {
        let graph = TaskGraph::builder()
            .task(TaskSpec::composite("js", Vec::<String>::new()))
            .task(TaskSpec::composite("css", Vec::<String>::new()))
            .task(TaskSpec::composite("html", ["js", "css"]))
            .build()
            .unwrap();

        assert_eq!(task_list(&graph), "js\ncss\nhtml  <- js, css\n");
    }

    #[test]
    fn test_print_build_summary() {
        print_build_summary(
            &[
                ("js".to_string(), Some(15_234), Duration::from_millis(450)),
                ("lint".to_string(), None, Duration::from_millis(20)),
            ],
            Duration::from_millis(470),
        );
    }
}
