//! Writing lyrics into audio file tags.
//!
//! Plain lyrics go to the format's standard lyrics field (ID3v2 `USLT`,
//! Vorbis `LYRICS`, MP4 `©lyr`). Synced LRC text goes to a custom item so
//! players that only understand plain lyrics are unaffected.

use crate::document::TimedDocument;
use crate::error::{CoreError, Result};
use crate::lrc::plain_text_from_synced;
use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag, TagType};
use std::path::Path;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "lyricsync::embed";

/// Custom item holding raw LRC text (ID3v2 `TXXX`, Vorbis comment)
pub const SYNCED_LYRICS_KEY: &str = "LRCLIB_LRC";

/// Freeform MP4 atom holding raw LRC text
pub const MP4_SYNCED_LYRICS_KEY: &str = "----:com.lrclib:lrc";

/// Lyrics to write into a file's tag. `None` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedLyrics {
    pub plain: Option<String>,
    pub synced: Option<String>,
}

impl EmbeddedLyrics {
    /// Synced documents embed their LRC and the plain text derived from it.
    /// Instrumental documents clear both fields.
    #[must_use]
    pub fn from_document(doc: &TimedDocument) -> Self {
        if doc.is_instrumental() {
            return Self::default();
        }

        if doc.is_synced() {
            let synced = doc.to_lrc();
            return Self {
                plain: non_blank(&plain_text_from_synced(&synced)),
                synced: Some(synced),
            };
        }

        Self {
            plain: doc.plain_text().and_then(non_blank),
            synced: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plain.is_none() && self.synced.is_none()
    }
}

fn non_blank(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn synced_key(tag_type: TagType) -> ItemKey {
    match tag_type {
        TagType::Mp4Ilst => ItemKey::Unknown(MP4_SYNCED_LYRICS_KEY.to_string()),
        _ => ItemKey::Unknown(SYNCED_LYRICS_KEY.to_string()),
    }
}

/// Replace every item under `key` with `value`, or remove it.
///
/// Returns false when the tag format has no mapping for `key` and the value
/// was not stored.
fn set_or_clear(tag: &mut Tag, key: ItemKey, value: Option<&str>) -> bool {
    tag.remove_key(&key);
    match value {
        Some(value) => tag.insert_text(key, value.to_string()),
        None => true,
    }
}

fn tag_error(path: &Path, reason: impl std::fmt::Display) -> CoreError {
    CoreError::Tag {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Write `lyrics` into the primary tag of the audio file at `path`,
/// creating the tag when the file has none.
///
/// # Errors
///
/// Returns [`CoreError::Tag`] if the file is not a supported audio format
/// or the tag cannot be written.
pub fn embed_lyrics(path: &Path, lyrics: &EmbeddedLyrics) -> Result<()> {
    let mut tagged_file = Probe::open(path)
        .map_err(|e| tag_error(path, e))?
        .guess_file_type()
        .map_err(|e| tag_error(path, e))?
        .read()
        .map_err(|e| tag_error(path, e))?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.primary_tag().is_none() {
        debug!(target: LOG_TARGET, "Creating {tag_type:?} tag for {}", path.display());
        let _ = tagged_file.insert_tag(Tag::new(tag_type));
    }
    let Some(tag) = tagged_file.primary_tag_mut() else {
        return Err(tag_error(path, format!("{tag_type:?} tags are not supported")));
    };

    if !set_or_clear(tag, ItemKey::Lyrics, lyrics.plain.as_deref()) {
        warn!(target: LOG_TARGET, "{tag_type:?} tag cannot hold plain lyrics");
    }
    if !set_or_clear(tag, synced_key(tag_type), lyrics.synced.as_deref()) {
        warn!(target: LOG_TARGET, "{tag_type:?} tag cannot hold synced lyrics");
    }

    tagged_file
        .save_to_path(path, WriteOptions::default())
        .map_err(|e| tag_error(path, e))?;

    info!(
        target: LOG_TARGET,
        "Embedded lyrics into {} (plain: {}, synced: {})",
        path.display(),
        lyrics.plain.is_some(),
        lyrics.synced.is_some()
    );
    Ok(())
}
