//! kiln - task-graph build pipeline for browser applications.
//!
//! Parses arguments, installs logging and dispatches to the command runner.

use clap::Parser;
use kiln_cli::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = if args.list {
        commands::list_execute(&args)
    } else {
        commands::run_execute(args).await
    };

    result.map_err(error::cli_error_to_miette)
}
