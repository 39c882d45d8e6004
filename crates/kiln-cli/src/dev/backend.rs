//! Backend process supervised alongside the dev server.

use std::path::Path;
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{CliError, Result};
use crate::ui;

/// A running backend. Dropping it without [`Backend::stop`] leaves the
/// process to be killed with the runtime.
pub struct Backend {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Backend {
    /// Start `program args..` in `cwd` with `PORT` set to `port`.
    pub fn spawn(program: &str, args: &[String], cwd: &Path, port: u16) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .env("PORT", port.to_string())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CliError::Server(format!("Failed to start backend '{}': {}", program, e))
            })?;

        tracing::debug!(
            "Backend '{} {}' started in {} (pid {:?})",
            program,
            args.join(" "),
            cwd.display(),
            child.id()
        );

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) if status.success() => ui::info("Backend exited"),
                    Ok(status) => ui::warning(&format!("Backend exited with {}", status)),
                    Err(e) => ui::warning(&format!("Lost track of the backend: {}", e)),
                },
                _ = stop_rx => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!("Failed to stop backend: {}", e);
                    }
                }
            }
        });

        Ok(Self {
            stop: Some(stop_tx),
            task,
        })
    }

    /// Whether the process has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Kill the process and wait for it.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!("Backend supervisor failed: {}", e);
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let err = Backend::spawn("kiln-no-such-program", &[], Path::new("."), 3011)
            .err()
            .unwrap();
        assert!(err.to_string().contains("kiln-no-such-program"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_kills_running_backend() {
        let backend = Backend::spawn("sleep", &["30".to_string()], Path::new("."), 3011).unwrap();
        assert!(!backend.is_finished());

        tokio::time::timeout(Duration::from_secs(5), backend.stop())
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_backend_sees_port() {
        let temp = tempfile::TempDir::new().unwrap();
        let backend = Backend::spawn(
            "sh",
            &["-c".to_string(), "echo $PORT > port.txt".to_string()],
            temp.path(),
            4321,
        )
        .unwrap();

        for _ in 0..50 {
            if backend.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        backend.stop().await;

        let port = std::fs::read_to_string(temp.path().join("port.txt")).unwrap();
        assert_eq!(port.trim(), "4321");
    }
}
