//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::BroadcastConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Read a TOML configuration file. Missing sections fall back to defaults.
pub fn load_file(path: &Path) -> Result<BroadcastConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Base configuration for a command: the file when given, defaults
/// otherwise, with RPC credentials completed from the environment.
///
/// Flags are applied by the caller afterwards, then validated.
pub fn load_base(path: Option<&Path>) -> Result<BroadcastConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => BroadcastConfig::default(),
    };
    config.rpc.apply_env();
    Ok(config)
}

/// Turn a validation result into a [`ConfigError`].
pub fn check(errors: Vec<ValidationError>) -> Result<(), ConfigError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::validate_server;
    use std::io::Write;

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [rpc]
            url = "http://127.0.0.1:18232"
            user = "juno"

            [server]
            listen = "0.0.0.0:9000"

            [poll]
            interval_ms = 250
            "#
        )
        .unwrap();

        let config = load_file(file.path()).unwrap();
        assert_eq!(config.rpc.url, "http://127.0.0.1:18232");
        assert_eq!(config.rpc.user, "juno");
        assert_eq!(config.server.listen, "0.0.0.0:9000");
        assert_eq!(config.poll.interval_ms, 250);
        assert!(check(validate_server(&config)).is_ok());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rpc\nurl = 1").unwrap();
        let err = load_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("Parse error"));
    }

    #[test]
    fn test_validation_error_display() {
        let err = check(validate_server(&BroadcastConfig {
            server: crate::config::ServerConfig {
                listen: String::new(),
                ..Default::default()
            },
            ..Default::default()
        }))
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("server.listen: listen is required"));
        assert!(msg.contains("; "));
    }
}
