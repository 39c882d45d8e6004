//! `kiln --list`.

use kiln_pipeline::{BuildMode, NoopReload, Pipeline};
use std::sync::Arc;

use crate::cli::Cli;
use crate::config::Project;
use crate::error::Result;
use crate::ui;

/// Print every task with its prerequisites, in declaration order.
pub fn execute(args: &Cli) -> Result<()> {
    let project = Project::load(args)?;
    let pipeline = Pipeline::new(
        project.path_config(),
        BuildMode::new(args.release, false),
        Arc::new(NoopReload),
    )?;

    print!("{}", ui::task_list(pipeline.graph()));
    Ok(())
}
