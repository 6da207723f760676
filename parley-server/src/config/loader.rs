//! Configuration loader

use std::net::SocketAddr;
use std::path::Path;

use parley_utils::{config_file, ParleyError, Result};

use super::AppConfig;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default location
    pub fn load() -> Result<AppConfig> {
        let path = config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(AppConfig::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| ParleyError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<AppConfig> {
        toml::from_str(content).map_err(|e| ParleyError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        config
            .server
            .listen_addr
            .parse::<SocketAddr>()
            .map_err(|e| {
                ParleyError::config(format!(
                    "listen_addr '{}' is not a socket address: {}",
                    config.server.listen_addr, e
                ))
            })?;

        if config.logging.filter.trim().is_empty() {
            return Err(ParleyError::config("logging.filter must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CONFIG_TOML;
    use tempfile::tempdir;

    #[test]
    fn test_load_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(
            &path,
            r#"
            [server]
            listen_addr = "127.0.0.1:7100"
            "#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:7100");
        // Missing sections fall back to defaults
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_load_missing_path_is_read_error() {
        let dir = tempdir().unwrap();
        let result = ConfigLoader::load_from_path(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ParleyError::FileRead { .. })));
    }

    #[test]
    fn test_default_toml_matches_defaults() {
        let parsed = ConfigLoader::parse(DEFAULT_CONFIG_TOML, Path::new("default.toml")).unwrap();
        assert_eq!(parsed, AppConfig::default());
        assert!(ConfigLoader::validate(&parsed).is_ok());
    }

    #[test]
    fn test_validate_bad_listen_addr() {
        let mut config = AppConfig::default();
        config.server.listen_addr = "not-an-address".into();

        let result = ConfigLoader::validate(&config);
        assert!(matches!(result, Err(ParleyError::Config(_))));
    }

    #[test]
    fn test_validate_empty_filter() {
        let mut config = AppConfig::default();
        config.logging.filter = "  ".into();

        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = ConfigLoader::parse("invalid { toml", Path::new("test.toml"));
        assert!(matches!(result, Err(ParleyError::ConfigInvalid { .. })));
    }
}
