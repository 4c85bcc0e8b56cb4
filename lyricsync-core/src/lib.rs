pub mod acquisition;
pub mod config;
pub mod document;
pub mod edit;
pub mod embed;
pub mod error;
pub mod lint;
pub mod lrc;
pub mod paths;
pub mod playback;
pub mod provider;
pub mod session;
pub mod store;
pub mod sync;
pub mod time;
pub mod track;

pub use acquisition::{build_submission, fetch, publish, FetchedLyrics};
pub use config::{EditorConfig, LoggingConfig, LrclibConfig, LyricsyncConfig, StorageConfig};
pub use document::{LyricLine, LyricsSource, MetadataTag, SyncedLines, TimedDocument};
pub use embed::{embed_lyrics, EmbeddedLyrics, MP4_SYNCED_LYRICS_KEY, SYNCED_LYRICS_KEY};
pub use error::{AcquisitionError, CoreError, EditError, ParseError, RepositoryError};
pub use lint::{has_blocking, pre_publish_lint, Finding, FindingKind, Severity};
pub use lrc::{format_timestamp, parse_timestamp, plain_text_from_synced, INSTRUMENTAL_MARKER};
pub use paths::{
    config_dir, config_path, log_file_path, lyrics_db_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
    LOG_FILE_NAME, LYRICS_DB_FILE_NAME,
};
pub use playback::{AudioTransport, PlaybackClock};
pub use provider::{LookupResult, LyricsRepository, Submission};
pub use session::{EditingSession, FetchCompletion, FetchOutcome, FetchTicket};
pub use store::{LyricsStore, SqliteLyricsStore, StoredLyrics};
pub use sync::{SyncController, SyncEvent, SEEK_THRESHOLD_MS};
pub use time::DurationExt;
pub use track::TrackIdentity;

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
