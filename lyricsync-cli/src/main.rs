mod commands;

use clap::{Args, Parser, Subcommand};
use lyricsync_core::{CoreError, LyricsyncConfig, TrackIdentity};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "lyricsync", version, about = "Synced lyrics editor and LRCLIB client")]
struct Cli {
    /// Override config file path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Fetch lyrics for a track, store them and print them as LRC.
    Fetch {
        #[command(flatten)]
        track: TrackArgs,
        /// Ignore stored lyrics and ask the repository again.
        #[arg(long)]
        refresh: bool,
    },
    /// Print the line active at a playback position.
    Show {
        file: PathBuf,
        /// Playback position in milliseconds.
        #[arg(long)]
        at: i64,
        /// Lines of context around the active line.
        #[arg(long, default_value_t = 2)]
        context: usize,
    },
    /// Check a lyrics file before publishing.
    Lint { file: PathBuf },
    /// Shift every timestamp in a file.
    Shift {
        file: PathBuf,
        /// Offset in milliseconds (negative moves lines earlier).
        #[arg(
            long,
            allow_hyphen_values = true,
            required_unless_present = "steps",
            conflicts_with = "steps"
        )]
        by: Option<i64>,
        /// Offset in editor steps (`[editor] shift_step_ms`).
        #[arg(long, allow_hyphen_values = true)]
        steps: Option<i64>,
        /// Overwrite the file instead of printing the result.
        #[arg(long)]
        write: bool,
    },
    /// Lint a lyrics file and publish it to LRCLIB.
    Publish {
        file: PathBuf,
        #[command(flatten)]
        track: TrackArgs,
    },
    /// Write a lyrics file into an audio file's tags.
    Embed {
        file: PathBuf,
        /// Audio file to tag (MP3, FLAC, Ogg, Opus, M4A and others).
        #[arg(long)]
        audio: PathBuf,
    },
    /// Follow a lyrics file against a simulated playback clock.
    Sync {
        file: PathBuf,
        /// Start position in milliseconds.
        #[arg(long, default_value_t = 0)]
        from: u64,
    },
}

#[derive(Debug, Args)]
pub(crate) struct TrackArgs {
    #[arg(long)]
    artist: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    album: Option<String>,
    /// Track duration in seconds.
    #[arg(long)]
    duration: Option<u64>,
}

impl TrackArgs {
    fn identity(&self) -> TrackIdentity {
        let mut track = TrackIdentity::new(&self.title, &self.artist);
        if let Some(ref album) = self.album {
            track = track.with_album(album);
        }
        if let Some(secs) = self.duration {
            track = track.with_duration(Duration::from_secs(secs));
        }
        track
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load config before tracing so the file layer can be honoured
    let loaded = load_config(cli.config.as_deref());
    let file_logging_enabled = loaded.as_ref().is_ok_and(|(c, _)| c.logging.enabled);
    init_tracing(file_logging_enabled);

    let config = match loaded {
        Ok((config, created)) => {
            if let Some(path) = created {
                info!("Created config template at {}; using defaults", path.display());
            }
            config
        }
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match commands::run(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Load the config, returning the template path when one was just written.
fn load_config(path: Option<&Path>) -> Result<(LyricsyncConfig, Option<PathBuf>), CoreError> {
    if let Some(path) = path {
        return LyricsyncConfig::load_from(path).map(|c| (c, None));
    }
    match LyricsyncConfig::load_or_create() {
        Ok(config) => Ok((config, None)),
        Err(CoreError::ConfigNotFound { path }) => Ok((LyricsyncConfig::default(), Some(path))),
        Err(e) => Err(e),
    }
}

/// Initialize tracing with stderr output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = lyricsync_core::paths::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_shift_negative() {
        let cli = Cli::try_parse_from(["lyricsync", "shift", "song.lrc", "--by", "-250"]).unwrap();
        let Command::Shift { by, steps, write, .. } = cli.command else {
            unreachable!("parsed as another command");
        };
        assert_eq!(by, Some(-250));
        assert_eq!(steps, None);
        assert!(!write);
    }

    #[test]
    fn test_shift_requires_offset() {
        assert!(Cli::try_parse_from(["lyricsync", "shift", "song.lrc"]).is_err());
        assert!(
            Cli::try_parse_from(["lyricsync", "shift", "song.lrc", "--by", "1", "--steps", "2"])
                .is_err()
        );
    }

    #[test]
    fn test_parse_embed() {
        let cli =
            Cli::try_parse_from(["lyricsync", "embed", "song.lrc", "--audio", "song.flac"]).unwrap();
        let Command::Embed { file, audio } = cli.command else {
            unreachable!("parsed as another command");
        };
        assert_eq!(file, PathBuf::from("song.lrc"));
        assert_eq!(audio, PathBuf::from("song.flac"));

        assert!(Cli::try_parse_from(["lyricsync", "embed", "song.lrc"]).is_err());
    }

    #[test]
    fn test_track_args_identity() {
        let cli = Cli::try_parse_from([
            "lyricsync",
            "--config",
            "/tmp/c.toml",
            "fetch",
            "--artist",
            "Artist",
            "--title",
            "Song",
            "--duration",
            "200",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        let Command::Fetch { track, refresh } = cli.command else {
            unreachable!("parsed as another command");
        };
        let identity = track.identity();
        assert_eq!(identity.title, "Song");
        assert_eq!(identity.duration_secs(), Some(200));
        assert!(identity.album.is_none());
        assert!(!refresh);
    }
}
