//! Development server module.
//!
//! - Static serving of the output directory with the reload client injected
//! - Live reload over Server-Sent Events
//! - Proxy to the backend process for everything else

pub mod backend;
pub mod server;
pub mod state;

pub use backend::Backend;
pub use server::{DevServer, LIVERELOAD_PATH, LIVERELOAD_SCRIPT_PATH, inject_reload_script};
pub use state::{ClientRegistry, DevServerState, SharedState};
