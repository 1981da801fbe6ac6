//! Configuration loading for roomsync clients.
//!
//! Configuration is loaded from a TOML file:
//!
//! ```toml
//! [session]
//! user_id = "@alice:example.org"
//!
//! [history]
//! page_size = 20
//! ```

use roomsync_types::UserId;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration for a client session.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Session configuration.
    pub session: SessionConfig,
    /// History retrieval configuration.
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// The syncing user. Used to derive room display names.
    pub user_id: UserId,
}

/// History retrieval configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Events requested per history page (default: 20).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    20
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl ClientConfig {
    /// Configuration for `user_id` with default history settings.
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            session: SessionConfig {
                user_id: user_id.into(),
            },
            history: HistoryConfig::default(),
        }
    }

    /// Set the history page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.history.page_size = page_size;
        self
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, Path::new("<inline>"))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.page_size == 0 {
            return Err(ConfigError::Invalid(
                "history.page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value parsed but is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn new_config_uses_defaults() {
        let config = ClientConfig::new("@alice:example.org");
        assert_eq!(config.session.user_id, UserId::new("@alice:example.org"));
        assert_eq!(config.history.page_size, 20);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[session]
user_id = "@alice:example.org"

[history]
page_size = 50
"#;

        let config = ClientConfig::from_toml(toml).unwrap();
        assert_eq!(config.session.user_id.as_str(), "@alice:example.org");
        assert_eq!(config.history.page_size, 50);
    }

    #[test]
    fn missing_history_section_uses_defaults() {
        let toml = r#"
[session]
user_id = "@bob:example.org"
"#;
        let config = ClientConfig::from_toml(toml).unwrap();
        assert_eq!(config.history.page_size, 20);
    }

    #[test]
    fn empty_history_section_uses_defaults() {
        let toml = r#"
[session]
user_id = "@bob:example.org"
[history]
"#;
        let config = ClientConfig::from_toml(toml).unwrap();
        assert_eq!(config.history.page_size, 20);
    }

    #[test]
    fn missing_user_id_is_parse_error() {
        let result = ClientConfig::from_toml("[session]\n");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let toml = r#"
[session]
user_id = "@bob:example.org"
[history]
page_size = 0
"#;
        let result = ClientConfig::from_toml(toml);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nuser_id = \"@carol:example.org\"").unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.session.user_id.as_str(), "@carol:example.org");
    }

    #[test]
    fn from_file_missing_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ClientConfig::from_file(&dir.path().join("absent.toml"));

        match result {
            Err(ConfigError::ReadError { path, .. }) => {
                assert!(path.ends_with("absent.toml"));
            }
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[test]
    fn builder_overrides_page_size() {
        let config = ClientConfig::new("@a:hs").with_page_size(5);
        assert_eq!(config.history.page_size, 5);
        assert!(config.validate().is_ok());
    }
}
