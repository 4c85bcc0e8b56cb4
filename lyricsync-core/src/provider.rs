use crate::error::RepositoryError;
use crate::track::TrackIdentity;
use async_trait::async_trait;

/// Raw lyrics returned by a repository for one track.
///
/// Texts are unparsed; acquisition decides which form to use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupResult {
    /// LRC-formatted synced lyrics
    pub synced: Option<String>,
    /// Plain text lyrics
    pub plain: Option<String>,
    /// Repository reports the track as instrumental
    pub instrumental: bool,
    /// Repository-specific record ID (e.g. LRCLIB's numeric ID as string)
    pub provider_id: Option<String>,
}

impl LookupResult {
    /// Nothing usable came back
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.instrumental
            && self.synced.as_deref().map_or(true, |s| s.trim().is_empty())
            && self.plain.as_deref().map_or(true, |s| s.trim().is_empty())
    }
}

/// Payload sent to a repository when publishing.
///
/// Both fields empty means the track is submitted as instrumental.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub synced_text: String,
    pub plain_text: String,
}

impl Submission {
    #[must_use]
    pub fn is_instrumental(&self) -> bool {
        self.synced_text.is_empty() && self.plain_text.is_empty()
    }
}

/// Remote lyrics repository
#[async_trait]
pub trait LyricsRepository: Send + Sync {
    /// Repository name, for logs and error messages
    fn name(&self) -> &'static str;

    /// Look up lyrics for a track. A miss is `Ok` with an empty result.
    async fn lookup(&self, track: &TrackIdentity) -> Result<LookupResult, RepositoryError>;

    /// Submit lyrics for a track.
    async fn submit(
        &self,
        track: &TrackIdentity,
        submission: &Submission,
    ) -> Result<(), RepositoryError>;
}
