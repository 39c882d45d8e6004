//! Live-reload signals emitted by build tasks.

use parking_lot::Mutex;
use serde::Serialize;

/// What browsers connected to the dev server should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReloadSignal {
    /// Reload the whole page.
    FullReload,
    /// Swap the stylesheet served at `path` in place.
    InjectCss { path: String },
}

/// Receiver of reload signals.
pub trait ReloadSink: Send + Sync {
    fn send(&self, signal: ReloadSignal);
}

/// Discards every signal. Used for one-shot builds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReload;

impl ReloadSink for NoopReload {
    fn send(&self, _signal: ReloadSignal) {}
}

/// Collects signals until they are drained.
#[derive(Debug, Default)]
pub struct ReloadBuffer {
    signals: Mutex<Vec<ReloadSignal>>,
}

impl ReloadBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every buffered signal, oldest first.
    pub fn drain(&self) -> Vec<ReloadSignal> {
        std::mem::take(&mut *self.signals.lock())
    }
}

impl ReloadSink for ReloadBuffer {
    fn send(&self, signal: ReloadSignal) {
        let mut signals = self.signals.lock();
        if !signals.contains(&signal) {
            signals.push(signal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_dedupes_and_drains() {
        let buffer = ReloadBuffer::new();
        let css = ReloadSignal::InjectCss {
            path: "/css/site.css".into(),
        };
        buffer.send(css.clone());
        buffer.send(css.clone());
        buffer.send(ReloadSignal::FullReload);

        assert_eq!(buffer.drain(), vec![css, ReloadSignal::FullReload]);
        assert!(buffer.drain().is_empty());
    }
}
