//! Build mode flags shared by every task.

/// Immutable build mode, fixed for one invocation and handed to every task
/// constructor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildMode {
    /// Minify bundles and HTML.
    pub release: bool,
    /// Long-lived watch process: keep caches warm across rebuilds.
    pub watch: bool,
}

impl BuildMode {
    pub fn new(release: bool, watch: bool) -> Self {
        Self { release, watch }
    }

    /// Short label for log lines.
    pub fn label(&self) -> &'static str {
        match (self.release, self.watch) {
            (true, true) => "release, watch",
            (true, false) => "release",
            (false, true) => "debug, watch",
            (false, false) => "debug",
        }
    }
}
