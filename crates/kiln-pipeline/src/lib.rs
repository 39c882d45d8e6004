//! # kiln-pipeline
//!
//! The build tasks of a kiln project and the graph that wires them together.
//!
//! | Task        | Does                                                        |
//! |-------------|-------------------------------------------------------------|
//! | `lint`      | style checks over script sources                            |
//! | `js`        | TypeScript entry to one browser bundle plus source map      |
//! | `css`       | stylesheet entry to one bundled stylesheet plus source map  |
//! | `lib`       | copies vendor runtime files                                 |
//! | `templates` | copies component templates                                  |
//! | `html`      | composes the page, referencing the built bundles            |
//! | `server`    | copies the backend entry                                    |
//! | `server-js` | transpiles backend modules one by one                       |
//!
//! `default`, `watch` and `dev` are composites.
//!
//! ## Quick Start
//!
//! ```no_run
//! use kiln_pipeline::{BuildMode, NoopReload, PathConfig, Pipeline};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(
//!     PathConfig::new("."),
//!     BuildMode::new(true, false),
//!     Arc::new(NoopReload),
//! )?;
//! let report = pipeline.run(&["default"]).await?;
//! println!("built in {:?}", report.elapsed);
//! # Ok(()) }
//! ```
//!
//! Compile errors in script or style sources never fail a run: the task logs
//! them, keeps the previous output on disk and completes with errors.

pub mod artifact;
pub mod copy;
pub mod error;
pub mod glob;
pub mod html;
pub mod lint;
pub mod mode;
pub mod paths;
pub mod reload;
pub mod script;
pub mod style;
pub mod tasks;

pub use artifact::{Artifact, OutputFile};
pub use error::{PipelineError, Result};
pub use mode::BuildMode;
pub use paths::{CopySet, PathConfig};
pub use reload::{NoopReload, ReloadBuffer, ReloadSignal, ReloadSink};
pub use script::{CacheStats, ScriptCache};
pub use tasks::Pipeline;
