//! Where lyricsync keeps its files.
//!
//! Everything lives in one directory, `~/.config/lyricsync/`: the TOML
//! config, the SQLite lyrics store and the optional log file. The store
//! location can be overridden with `[storage] database_path`.

use std::path::PathBuf;

/// Directory name under `~/.config/`
pub const CONFIG_DIR_NAME: &str = "lyricsync";

/// Written from the config template on first run
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default SQLite store for fetched and edited lyrics
pub const LYRICS_DB_FILE_NAME: &str = "lyrics.db";

/// Truncated on each run when `[logging] enabled = true`
pub const LOG_FILE_NAME: &str = "lyricsync.log";

/// `~/.config/lyricsync/`, or `./.config/lyricsync/` when there is no home
/// directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Default path read by `LyricsyncConfig::load_or_create`
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Lyrics store used when `[storage] database_path` is unset
#[must_use]
pub fn lyrics_db_path() -> PathBuf {
    config_dir().join(LYRICS_DB_FILE_NAME)
}

#[must_use]
pub fn log_file_path() -> PathBuf {
    config_dir().join(LOG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_share_config_dir() {
        let dir = config_dir();
        assert!(dir.ends_with(".config/lyricsync"));
        assert_eq!(config_path().parent(), Some(dir.as_path()));
        assert_eq!(lyrics_db_path().parent(), Some(dir.as_path()));
        assert_eq!(log_file_path().file_name().and_then(|n| n.to_str()), Some("lyricsync.log"));
    }
}
