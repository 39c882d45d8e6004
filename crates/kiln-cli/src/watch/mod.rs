//! Watch mode: file events in, serialized rebuilds and reload signals out.

mod controller;
mod watcher;

pub use controller::{Batch, ReloadKind, Subscription, WatchController, WatchState, subscriptions};
pub use watcher::{FileChange, FileWatcher};
