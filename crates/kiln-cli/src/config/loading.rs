use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};
use kiln_pipeline::PathConfig;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};

/// Default configuration file name, looked up in the project root.
pub const CONFIG_FILE: &str = "kiln.toml";

/// A loaded, validated project.
#[derive(Debug, Clone)]
pub struct Project {
    /// Canonical project root
    pub root: PathBuf,
    /// Configuration file that was read, if any
    pub config_file: Option<PathBuf>,
    pub config: KilnConfig,
}

impl Project {
    /// Resolve the project root from `--cwd` and load its configuration.
    pub fn load(args: &Cli) -> Result<Self> {
        let root = match &args.cwd {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        if !root.is_dir() {
            return Err(ConfigError::ProjectNotFound(root).into());
        }
        let root = root.canonicalize()?;

        let config_file = resolve_config_file(&root, args.config.as_deref())?;
        let config = KilnConfig::load(config_file.as_deref(), args)?;
        config.validate()?;

        Ok(Self {
            root,
            config_file,
            config,
        })
    }

    /// Paths handed to the pipeline.
    pub fn path_config(&self) -> PathConfig {
        self.config.path_config(&self.root)
    }

    /// Absolute output directory.
    pub fn out_root(&self) -> PathBuf {
        self.path_config().out_root()
    }
}

/// An explicit `--config` must exist (relative paths are resolved against
/// the project root); otherwise `kiln.toml` is used when present.
fn resolve_config_file(root: &Path, explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => {
            let path = root.join(path);
            if path.is_file() {
                Ok(Some(path))
            } else {
                Err(ConfigError::NotFound(path).into())
            }
        }
        None => {
            let path = root.join(CONFIG_FILE);
            Ok(path.is_file().then_some(path))
        }
    }
}

impl KilnConfig {
    /// Merge defaults, the config file, `KILN_*` variables and CLI flags.
    pub fn load(config_file: Option<&Path>, args: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("KILN_").split("__"));

        if let Some(out_dir) = &args.out_dir {
            figment = figment.merge(Serialized::default("out_dir", out_dir));
        }
        if let Some(port) = args.port {
            figment = figment.merge(Serialized::default("dev.port", port));
        }

        figment.extract().map_err(|e| {
            let field = if e.path.is_empty() {
                "configuration".to_string()
            } else {
                e.path.join(".")
            };
            ConfigError::InvalidValue {
                field,
                value: e.kind.to_string(),
                hint: format!("Check {} syntax and field types", CONFIG_FILE),
            }
            .into()
        })
    }
}
