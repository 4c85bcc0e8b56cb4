use crate::time::DurationExt;
use std::fmt;
use std::time::Duration;

/// Identifies the track a lyrics document belongs to.
///
/// Used to query and publish to lyrics repositories, as the storage key, and
/// to tag in-flight fetches so stale results can be discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackIdentity {
    /// Library-specific identifier (e.g. database row or file path)
    pub id: Option<String>,
    /// Track title
    pub title: String,
    /// Artist name(s)
    pub artist: String,
    /// Album name (optional)
    pub album: Option<String>,
    /// Track duration (used for matching and required for publishing)
    pub duration: Option<Duration>,
}

impl TrackIdentity {
    /// Create a new track identity
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration: None,
        }
    }

    /// Set library identifier
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set album name
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Duration in whole seconds, as lyrics repositories expect it.
    #[must_use]
    pub fn duration_secs(&self) -> Option<u32> {
        self.duration.map(|d| d.as_secs_u32())
    }

    /// Stable storage key: the library id when known, otherwise the
    /// normalized `artist|title|album` triple.
    #[must_use]
    pub fn key(&self) -> String {
        if let Some(ref id) = self.id {
            return format!("id:{id}");
        }
        format!(
            "meta:{}|{}|{}",
            normalize(&self.artist),
            normalize(&self.title),
            self.album.as_deref().map(normalize).unwrap_or_default()
        )
    }
}

impl fmt::Display for TrackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

/// Lowercase, turn punctuation into spaces, drop apostrophes and collapse
/// whitespace, so "Don't Stop (Live)" and "dont stop live" match.
fn normalize(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '\'' | '\u{2019}'))
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_identity_builder() {
        let track = TrackIdentity::new("Song", "Artist")
            .with_album("Album")
            .with_duration(Duration::from_millis(183_600));

        assert_eq!(track.title, "Song");
        assert_eq!(track.album.as_deref(), Some("Album"));
        assert_eq!(track.duration_secs(), Some(183));
        assert_eq!(track.to_string(), "Artist - Song");
    }

    #[test]
    fn test_key_prefers_id() {
        let track = TrackIdentity::new("Song", "Artist").with_id("/music/song.flac");
        assert_eq!(track.key(), "id:/music/song.flac");
    }

    #[test]
    fn test_key_normalizes_metadata() {
        let a = TrackIdentity::new("Don't Stop (Live)", "The  Band");
        let b = TrackIdentity::new("dont stop live", "the band");
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key(), "meta:the band|dont stop live|");
    }

    #[test]
    fn test_key_includes_album() {
        let a = TrackIdentity::new("Song", "Artist").with_album("One");
        let b = TrackIdentity::new("Song", "Artist").with_album("Two");
        assert_ne!(a.key(), b.key());
    }
}
