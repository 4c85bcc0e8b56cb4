//! Timed lyric document model.
//!
//! A [`TimedDocument`] is an ordered sequence of [`LyricLine`]s plus an
//! optional plain-text rendition and an instrumental flag. Edits may leave the
//! line sequence unsorted; [`TimedDocument::commit`] restores timestamp order
//! and hands out a [`SyncedLines`] view, which is the only thing playback
//! lookups accept.

use crate::error::EditError;
use crate::time::millis_to_duration;
use std::time::Duration;

/// A single timed lyric line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    /// Offset from track start in milliseconds. Only negative inside an
    /// uncommitted shift preview.
    pub timestamp_ms: i64,
    /// Line text; empty marks a musical pause.
    pub text: String,
}

impl LyricLine {
    #[must_use]
    pub fn new(timestamp_ms: i64, text: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            text: text.into(),
        }
    }

    /// Start time as a `Duration`, clamped at zero.
    #[must_use]
    pub fn start_time(&self) -> Duration {
        millis_to_duration(self.timestamp_ms)
    }
}

/// Where a document's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LyricsSource {
    #[default]
    LocalEdit,
    DownloadedSynced,
    DownloadedPlain,
    DownloadedInstrumental,
}

impl LyricsSource {
    /// Stable identifier used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalEdit => "local_edit",
            Self::DownloadedSynced => "downloaded_synced",
            Self::DownloadedPlain => "downloaded_plain",
            Self::DownloadedInstrumental => "downloaded_instrumental",
        }
    }

    #[must_use]
    pub fn from_tag(s: &str) -> Option<Self> {
        match s {
            "local_edit" => Some(Self::LocalEdit),
            "downloaded_synced" => Some(Self::DownloadedSynced),
            "downloaded_plain" => Some(Self::DownloadedPlain),
            "downloaded_instrumental" => Some(Self::DownloadedInstrumental),
            _ => None,
        }
    }
}

impl std::fmt::Display for LyricsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque LRC ID tag such as `[ar:Artist]`, kept in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTag {
    pub key: String,
    pub value: String,
}

/// A timed lyric document for one track.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimedDocument {
    pub(crate) lines: Vec<LyricLine>,
    pub(crate) plain_text: Option<String>,
    pub(crate) is_instrumental: bool,
    pub(crate) metadata: Vec<MetadataTag>,
    pub source: LyricsSource,
    /// Set by every edit, cleared by [`TimedDocument::commit`].
    pub(crate) pending: bool,
}

impl TimedDocument {
    /// Empty document for a track that has no lyrics yet.
    #[must_use]
    pub fn new_blank() -> Self {
        Self::default()
    }

    /// Document for a track with no lyrics by design.
    #[must_use]
    pub fn instrumental() -> Self {
        Self {
            is_instrumental: true,
            ..Self::default()
        }
    }

    /// Untimed document holding only plain lyrics.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            plain_text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Synced document from lines in any order; lines are committed on creation.
    #[must_use]
    pub fn synced(lines: Vec<LyricLine>) -> Self {
        let mut doc = Self {
            lines,
            pending: true,
            ..Self::default()
        };
        doc.commit();
        doc
    }

    #[must_use]
    pub fn with_source(mut self, source: LyricsSource) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn line(&self, index: usize) -> Option<&LyricLine> {
        self.lines.get(index)
    }

    #[must_use]
    pub fn plain_text(&self) -> Option<&str> {
        self.plain_text.as_deref()
    }

    #[must_use]
    pub const fn is_instrumental(&self) -> bool {
        self.is_instrumental
    }

    #[must_use]
    pub fn metadata(&self) -> &[MetadataTag] {
        &self.metadata
    }

    /// Look up an ID tag value by key (case-insensitive).
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|tag| tag.key.eq_ignore_ascii_case(key))
            .map(|tag| tag.value.as_str())
    }

    /// True when the document has timed lines.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        !self.lines.is_empty()
    }

    /// True when the document has only untimed text.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        self.lines.is_empty() && self.plain_text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// No lines, no plain text and not instrumental.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.is_instrumental && !self.is_synced() && !self.is_plain()
    }

    /// Whether edits are waiting for [`TimedDocument::commit`].
    #[must_use]
    pub const fn has_pending_edits(&self) -> bool {
        self.pending
    }

    /// Mark the track instrumental, dropping any lines and plain text.
    pub fn set_instrumental(&mut self) {
        self.lines.clear();
        self.plain_text = None;
        self.is_instrumental = true;
        self.pending = false;
    }

    /// Replace the plain-text rendition. Clears the instrumental flag.
    pub fn set_plain_text(&mut self, text: Option<String>) {
        self.plain_text = text;
        if self.plain_text.is_some() {
            self.is_instrumental = false;
        }
    }

    /// Plain lyrics for display or publishing: the line texts joined with
    /// newlines for a synced document, otherwise `plain_text`.
    #[must_use]
    pub fn plain_rendition(&self) -> String {
        if self.lines.is_empty() {
            return self.plain_text.clone().unwrap_or_default();
        }
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Restore timestamp order (stable on ties) and clamp stray negatives,
    /// returning the committed view.
    pub fn commit(&mut self) -> SyncedLines<'_> {
        if self.pending {
            for line in &mut self.lines {
                line.timestamp_ms = line.timestamp_ms.max(0);
            }
            self.lines.sort_by_key(|l| l.timestamp_ms);
            self.pending = false;
        }
        SyncedLines { lines: &self.lines }
    }

    /// Committed view, or `None` while edits are pending.
    #[must_use]
    pub fn synced_lines(&self) -> Option<SyncedLines<'_>> {
        (!self.pending).then_some(SyncedLines { lines: &self.lines })
    }

    pub(crate) fn check_index(&self, index: usize) -> Result<(), EditError> {
        if index < self.lines.len() {
            Ok(())
        } else {
            Err(EditError::IndexOutOfRange {
                index,
                len: self.lines.len(),
            })
        }
    }
}

/// Borrowed line sequence guaranteed sorted by timestamp with no negatives.
#[derive(Debug, Clone, Copy)]
pub struct SyncedLines<'a> {
    lines: &'a [LyricLine],
}

impl<'a> SyncedLines<'a> {
    #[must_use]
    pub const fn as_slice(&self) -> &'a [LyricLine] {
        self.lines
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a LyricLine> {
        self.lines.get(index)
    }
}
