#![allow(clippy::disallowed_methods)]

#[cfg(test)]
mod tests {
    use crate::cli::Cli;
    use crate::config::{CONFIG_FILE, KilnConfig, Project};
    use crate::error::{CliError, ConfigError};
    use clap::Parser;
    use serial_test::serial;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn args(extra: &[&str], root: &Path) -> Cli {
        let mut argv = vec!["kiln".to_string(), "--cwd".to_string()];
        argv.push(root.display().to_string());
        argv.extend(extra.iter().map(|s| s.to_string()));
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_match_pipeline_layout() {
        let config = KilnConfig::default();
        let paths = config.path_config(Path::new("/project"));
        assert_eq!(paths, kiln_pipeline::PathConfig::new("/project"));
        assert_eq!(config.dev.port, 8003);
        assert_eq!(config.dev.backend_port, 3011);
        assert_eq!(config.watch.debounce_ms, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let text = toml::to_string(&KilnConfig::default()).unwrap();
        let parsed: KilnConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, KilnConfig::default());
    }

    #[test]
    #[serial]
    fn test_file_overrides_defaults_per_key() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "out_dir = \"public\"\n\n[script]\nentry = \"src/boot.ts\"\n\n[dev]\nport = 9000\n",
        )
        .unwrap();

        let project = Project::load(&args(&[], temp.path())).unwrap();
        assert_eq!(project.config.out_dir, PathBuf::from("public"));
        assert_eq!(project.config.script.entry, PathBuf::from("src/boot.ts"));
        assert_eq!(project.config.script.bundle, PathBuf::from("app/bundle.js"));
        assert_eq!(project.config.dev.port, 9000);
        assert_eq!(project.config.dev.backend_port, 3011);
        assert!(project.out_root().ends_with("public"));
    }

    #[test]
    #[serial]
    fn test_env_and_cli_precedence() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "[dev]\nport = 9000\n").unwrap();

        unsafe { std::env::set_var("KILN_DEV__PORT", "9100") };
        let from_env = Project::load(&args(&[], temp.path()));
        let from_cli = Project::load(&args(&["--port", "9200"], temp.path()));
        unsafe { std::env::remove_var("KILN_DEV__PORT") };

        assert_eq!(from_env.unwrap().config.dev.port, 9100);
        assert_eq!(from_cli.unwrap().config.dev.port, 9200);
    }

    #[test]
    #[serial]
    fn test_unknown_field_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "[script]\nentri = \"x.ts\"\n").unwrap();

        let err = Project::load(&args(&[], temp.path())).unwrap_err();
        assert!(matches!(
            err,
            CliError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_missing_explicit_config() {
        let temp = TempDir::new().unwrap();
        let err = Project::load(&args(&["--config", "ci.toml"], temp.path())).unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_missing_project_directory() {
        let err = Project::load(&args(&[], Path::new("/definitely/not/here"))).unwrap_err();
        assert!(matches!(
            err,
            CliError::Config(ConfigError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = KilnConfig::default();
        config.dev.backend_port = config.dev.port;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ConflictingOptions(_))
        ));

        let mut config = KilnConfig::default();
        config.out_dir = PathBuf::from(".");
        assert!(config.validate().is_err());

        let mut config = KilnConfig::default();
        config.style.targets = vec!["netscape 4".to_string()];
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("style.targets"));

        let mut config = KilnConfig::default();
        config.dev.port = 0;
        assert!(config.validate().is_err());
    }
}
