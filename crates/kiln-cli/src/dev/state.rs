//! Shared state for the development server.
//!
//! Tracks connected live-reload clients and the directories requests are
//! served from. The state is also the [`ReloadSink`] the watch controller
//! forwards finished rebuilds to.

use kiln_pipeline::{ReloadSignal, ReloadSink};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Connected SSE clients by id.
pub type ClientRegistry = Arc<RwLock<HashMap<usize, mpsc::Sender<String>>>>;

/// Shared dev server state.
pub type SharedState = Arc<DevServerState>;

/// Messages queued per client before further signals are dropped.
const CLIENT_BUFFER: usize = 100;

pub struct DevServerState {
    /// Connected SSE clients
    pub clients: ClientRegistry,
    next_client_id: RwLock<usize>,
    /// Directory static files are served from
    out_dir: PathBuf,
    /// Port of the backend unmatched requests are proxied to
    backend_port: u16,
}

impl DevServerState {
    pub fn new(out_dir: PathBuf, backend_port: u16) -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            next_client_id: RwLock::new(0),
            out_dir,
            backend_port,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn backend_port(&self) -> u16 {
        self.backend_port
    }

    /// Register a new SSE client.
    ///
    /// # Returns
    ///
    /// Client ID and receiver for serialized signals
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = {
            let mut next_id = self.next_client_id.write();
            let id = *next_id;
            *next_id += 1;
            id
        };

        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.clients.write().insert(id, tx);

        (id, rx)
    }

    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Send a signal to every client, dropping clients that went away.
    pub fn broadcast(&self, signal: &ReloadSignal) {
        let json = match serde_json::to_string(signal) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize reload signal: {}", e);
                return;
            }
        };

        let clients = self.clients.read().clone();
        let mut failed_ids = Vec::new();

        for (id, tx) in clients {
            match tx.try_send(json.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug!("Client {} is not keeping up; dropped {}", id, json);
                }
                Err(TrySendError::Closed(_)) => failed_ids.push(id),
            }
        }

        for id in failed_ids {
            debug!("Client {} disconnected", id);
            self.unregister_client(id);
        }
    }
}

impl ReloadSink for DevServerState {
    fn send(&self, signal: ReloadSignal) {
        self.broadcast(&signal);
    }
}
