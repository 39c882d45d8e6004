//! One-shot runs: `kiln`, `kiln js css`, `kiln --release`.

use kiln_graph::ExecutionReport;
use kiln_pipeline::tasks::{CSS, HTML, JS};
use kiln_pipeline::{BuildMode, NoopReload, PathConfig, Pipeline};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::Cli;
use crate::commands::watch;
use crate::config::Project;
use crate::error::Result;
use crate::ui;

/// Execute the requested tasks.
///
/// Watch targets and `--watch` hand over to [`watch::execute`]. Task errors
/// that are reported but not propagated (compile errors, lint findings)
/// leave the exit code at 0.
///
/// # Errors
///
/// Returns errors for invalid configuration, unknown tasks and any task
/// that fails outright.
pub async fn execute(args: Cli) -> Result<()> {
    let project = Project::load(&args)?;
    let targets = args.targets();

    if args.is_watching() {
        return watch::execute(project, &args, &targets).await;
    }

    let mode = BuildMode::new(args.release, false);
    if !args.quiet {
        ui::info(&format!(
            "Running {} ({})",
            targets.join(", "),
            mode.label()
        ));
    }

    let pipeline = Pipeline::new(project.path_config(), mode, Arc::new(NoopReload))?;
    let report = pipeline.run(&targets).await?;

    report_outcome(pipeline.paths(), &report, args.quiet);
    Ok(())
}

/// Print the summary for a finished run. Soft errors were already logged
/// by the tasks that hit them; only their count is repeated here.
pub(crate) fn report_outcome(paths: &PathConfig, report: &ExecutionReport, quiet: bool) {
    if quiet {
        return;
    }

    ui::print_build_summary(&summary_entries(paths, report), report.elapsed);

    let errors = report.soft_errors().len();
    if errors == 0 {
        ui::success(&format!(
            "Finished in {}",
            ui::format_duration(report.elapsed)
        ));
    } else {
        ui::warning(&format!(
            "Finished in {} with {} error(s)",
            ui::format_duration(report.elapsed),
            errors
        ));
    }
}

/// `(task, bundle size, duration)` for every finished task.
#[allow(clippy::disallowed_methods)]
fn summary_entries(
    paths: &PathConfig,
    report: &ExecutionReport,
) -> Vec<(String, Option<u64>, Duration)> {
    report
        .records
        .iter()
        .map(|(name, record)| {
            let size = bundle_of(paths, name)
                .and_then(|path| std::fs::metadata(path).ok())
                .map(|meta| meta.len());
            (name.clone(), size, record.duration)
        })
        .collect()
}

fn bundle_of(paths: &PathConfig, task: &str) -> Option<PathBuf> {
    match task {
        JS => Some(paths.script_bundle_path()),
        CSS => Some(paths.style_bundle_path()),
        HTML => Some(paths.html_output_path()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use kiln_graph::{TaskOutcome, TaskRecord};
    use tempfile::TempDir;

    #[test]
    fn test_summary_entries_report_bundle_sizes() {
        let temp = TempDir::new().unwrap();
        let paths = PathConfig::new(temp.path());
        std::fs::create_dir_all(paths.out_root().join("css")).unwrap();
        std::fs::write(paths.style_bundle_path(), "body{margin:0}").unwrap();

        let mut report = ExecutionReport::default();
        for name in [CSS, "lib"] {
            report.records.insert(
                name.to_string(),
                TaskRecord {
                    outcome: TaskOutcome::Completed,
                    duration: Duration::from_millis(5),
                },
            );
        }

        let entries = summary_entries(&paths, &report);
        assert_eq!(entries[0], (CSS.to_string(), Some(14), Duration::from_millis(5)));
        assert_eq!(entries[1].1, None);
    }
}
