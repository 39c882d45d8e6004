//! `kiln watch` and `kiln dev`.
//!
//! Orchestrates the long-running lifecycle:
//! - File watching, started before the initial build
//! - Initial build of the requested targets
//! - Serialized, coalesced rebuilds
//! - For `dev`: the live-reload server and the backend process
//! - Graceful shutdown on Ctrl+C

use kiln_pipeline::{NoopReload, ReloadSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use crate::cli::Cli;
use crate::commands::run::report_outcome;
use crate::config::Project;
use crate::dev::{Backend, DevServer, DevServerState};
use crate::error::Result;
use crate::ui;
use crate::watch::{FileWatcher, WatchController};

/// Build, then rebuild on every change until Ctrl+C.
///
/// # Errors
///
/// Returns errors for controller, watcher or server startup failures.
/// Build failures, including in the initial build, are logged and the
/// process keeps watching.
pub async fn execute(project: Project, args: &Cli, targets: &[String]) -> Result<()> {
    let dev = args.is_dev();
    let paths = project.path_config();
    let out_root = project.out_root();

    let state = dev.then(|| {
        Arc::new(DevServerState::new(
            out_root.clone(),
            project.config.dev.backend_port,
        ))
    });
    let reload: Arc<dyn ReloadSink> = match &state {
        Some(state) => state.clone(),
        None => Arc::new(NoopReload),
    };

    let mut controller = WatchController::new(
        paths,
        args.release,
        reload,
        Duration::from_millis(project.config.watch.debounce_ms),
    )?;

    // Changes saved during the initial build queue up for the first cycle.
    let (watcher, mut changes) = FileWatcher::new(project.root.clone(), ignore_patterns(&project))?;

    ui::info(&format!(
        "Initial build of {} ({})",
        targets.join(", "),
        controller.pipeline().mode().label()
    ));
    match controller.initial_build(targets).await {
        Ok(report) => report_outcome(controller.pipeline().paths(), &report, args.quiet),
        Err(e) => ui::error(&format!("Initial build failed: {}", e)),
    }

    ui::info(&format!(
        "Watching for changes in: {}",
        watcher.root().display()
    ));

    let Some(state) = state else {
        ui::info("Press Ctrl+C to stop");
        controller.run(&mut changes, shutdown_on_ctrl_c()).await;
        ui::success("Watch stopped");
        return Ok(());
    };

    let dev_config = &project.config.dev;
    let listener = DevServer::bind(dev_config.port).await?;
    let server = DevServer::new(state)?;
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = server.serve(listener).await {
            ui::error(&e.to_string());
        }
    });
    ui::success(&format!(
        "Development server running at http://127.0.0.1:{}",
        dev_config.port
    ));

    let backend = match Backend::spawn(
        &dev_config.backend_command,
        &dev_config.backend_args,
        &out_root,
        dev_config.backend_port,
    ) {
        Ok(backend) => {
            ui::info(&format!(
                "Backend '{}' on port {}",
                dev_config.backend_command, dev_config.backend_port
            ));
            Some(backend)
        }
        Err(e) => {
            ui::warning(&format!("{}; proxied requests will fail", e));
            None
        }
    };

    ui::info("Press Ctrl+C to stop");
    let shutdown = async {
        tokio::select! {
            _ = signal::ctrl_c() => ui::info("Shutting down development server..."),
            _ = &mut server_handle => ui::warning("Server task completed unexpectedly"),
        }
    };
    controller.run(&mut changes, shutdown).await;

    if let Some(backend) = backend {
        backend.stop().await;
    }
    server_handle.abort();
    ui::success("Development server stopped");
    Ok(())
}

async fn shutdown_on_ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        ui::warning(&format!("Failed to listen for Ctrl+C: {}", e));
        std::future::pending::<()>().await;
    }
}

/// The output directory plus the configured ignore list.
fn ignore_patterns(project: &Project) -> Vec<String> {
    let out_dir = project.config.out_dir.to_string_lossy().replace('\\', "/");
    let mut patterns = vec![out_dir];
    patterns.extend(project.config.watch.ignore.iter().cloned());
    patterns
}
