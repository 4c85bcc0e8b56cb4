use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LyricsyncConfig {
    #[serde(default)]
    pub lrclib: LrclibConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LrclibConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    "https://lrclib.net/api".to_string()
}

fn default_user_agent() -> String {
    format!(
        "lyricsync v{} (https://github.com/lyricsync/lyricsync)",
        env!("CARGO_PKG_VERSION")
    )
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_max_retries() -> u32 {
    3
}

impl Default for LrclibConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Nudge size for bulk shift commands
    #[serde(default = "default_shift_step_ms")]
    pub shift_step_ms: i64,
}

const fn default_shift_step_ms() -> i64 {
    200
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            shift_step_ms: default_shift_step_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Overrides the default database location
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured database path, or the default under the config directory
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(crate::paths::lyrics_db_path)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `lyricsync.log` in the config directory
    #[serde(default)]
    pub enabled: bool,
}

impl LyricsyncConfig {
    /// Load config from file or create template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template on
    /// first run, or an error if the file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        let config_path = crate::paths::config_path();

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound { path: config_path });
        }

        Self::load_from(&config_path)
    }

    /// Load config from an explicit path
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, cannot be parsed or fails validation.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate config text
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is out of range.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.lrclib.base_url.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "lrclib.base_url must not be empty".to_string(),
            });
        }
        if self.lrclib.timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "lrclib.timeout_secs must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

const CONFIG_TEMPLATE: &str = r##"# Lyricsync Configuration
# ~/.config/lyricsync/config.toml

[lrclib]
base_url = "https://lrclib.net/api"
# Sent with every request; LRCLIB asks clients to identify themselves
# user_agent = "lyricsync (https://github.com/lyricsync/lyricsync)"
timeout_secs = 10
max_retries = 3

[editor]
# Step used by `lyricsync shift` nudges, in milliseconds
shift_step_ms = 200

[storage]
# Defaults to ~/.config/lyricsync/lyrics.db
# database_path = "/path/to/lyrics.db"

[logging]
# Also write logs to ~/.config/lyricsync/lyricsync.log
enabled = false
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config = LyricsyncConfig::parse(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.lrclib.base_url, "https://lrclib.net/api");
        assert_eq!(config.lrclib.timeout_secs, 10);
        assert_eq!(config.lrclib.max_retries, 3);
        assert_eq!(config.editor.shift_step_ms, 200);
        assert!(config.storage.database_path.is_none());
        assert!(!config.logging.enabled);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = LyricsyncConfig::parse("").unwrap();
        assert_eq!(config.editor.shift_step_ms, 200);
        assert!(config.lrclib.user_agent.starts_with("lyricsync v"));
    }

    #[test]
    fn test_partial_section() {
        let config = LyricsyncConfig::parse(
            r#"
            [lrclib]
            base_url = "http://localhost:3000/api"

            [storage]
            database_path = "/tmp/lyrics.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.lrclib.base_url, "http://localhost:3000/api");
        assert_eq!(config.lrclib.timeout_secs, 10);
        assert_eq!(
            config.storage.database_path(),
            PathBuf::from("/tmp/lyrics.db")
        );
    }

    #[test]
    fn test_rejects_empty_base_url() {
        let err = LyricsyncConfig::parse("[lrclib]\nbase_url = \"\"").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = LyricsyncConfig::parse("[lrclib]\ntimeout_secs = 0").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_malformed_toml() {
        let err = LyricsyncConfig::parse("[lrclib").unwrap_err();
        assert!(matches!(err, CoreError::ConfigParseError(_)));
    }

    #[test]
    fn test_load_from_missing_path() {
        let err = LyricsyncConfig::load_from(Path::new("/nonexistent/lyricsync.toml")).unwrap_err();
        assert!(matches!(err, CoreError::ConfigNotFound { .. }));
    }
}
