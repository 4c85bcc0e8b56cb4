//! Fetch and publish policy on top of a [`LyricsRepository`].

use crate::document::{LyricsSource, TimedDocument};
use crate::error::AcquisitionError;
use crate::lint::{has_blocking, pre_publish_lint, Finding};
use crate::provider::{LookupResult, LyricsRepository, Submission};
use crate::track::TrackIdentity;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "lyricsync::acquisition";

/// A fetched document with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedLyrics {
    pub document: TimedDocument,
    /// Repository name
    pub provider: &'static str,
    /// Repository-specific record ID, if reported
    pub provider_id: Option<String>,
}

/// Fetch lyrics for `track`, taking the first usable tier:
/// synced, then plain, then the instrumental signal.
///
/// A synced variant that fails to parse or carries no timed lines falls
/// through to the next tier.
///
/// # Errors
///
/// [`AcquisitionError::NotFound`] when no tier is usable, or
/// [`AcquisitionError::Repository`] with the repository's failure unchanged.
pub async fn fetch(
    repo: &dyn LyricsRepository,
    track: &TrackIdentity,
) -> Result<FetchedLyrics, AcquisitionError> {
    info!(target: LOG_TARGET, "Fetching lyrics for {track} from {}", repo.name());

    let result = repo.lookup(track).await?;
    let provider_id = result.provider_id.clone();

    let Some(document) = select_tier(&result) else {
        info!(target: LOG_TARGET, "No lyrics found for {track} on {}", repo.name());
        return Err(AcquisitionError::NotFound {
            track: track.to_string(),
        });
    };

    info!(
        target: LOG_TARGET,
        "Found {} lyrics for {track} ({} lines, provider_id: {:?})",
        document.source,
        document.len(),
        provider_id
    );

    Ok(FetchedLyrics {
        document,
        provider: repo.name(),
        provider_id,
    })
}

fn select_tier(result: &LookupResult) -> Option<TimedDocument> {
    if result.is_empty() {
        return None;
    }

    if let Some(synced) = non_blank(result.synced.as_deref()) {
        match TimedDocument::parse(synced) {
            Ok(doc) if doc.is_synced() => {
                return Some(doc.with_source(LyricsSource::DownloadedSynced));
            }
            Ok(doc) if doc.is_instrumental() => {
                return Some(doc.with_source(LyricsSource::DownloadedInstrumental));
            }
            Ok(_) => {
                warn!(target: LOG_TARGET, "Synced lyrics have no timed lines, trying plain");
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Synced lyrics unusable ({e}), trying plain");
            }
        }
    }

    if let Some(plain) = non_blank(result.plain.as_deref()) {
        return Some(TimedDocument::plain(plain.trim()).with_source(LyricsSource::DownloadedPlain));
    }

    result
        .instrumental
        .then(|| TimedDocument::instrumental().with_source(LyricsSource::DownloadedInstrumental))
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

/// Build the repository payload for a document.
///
/// Synced documents send the LRC text and its plain rendition, plain
/// documents send only plain text and instrumental documents send neither.
#[must_use]
pub fn build_submission(doc: &TimedDocument) -> Submission {
    if doc.is_instrumental() {
        Submission::default()
    } else if doc.is_synced() {
        Submission {
            synced_text: doc.to_lrc(),
            plain_text: doc.plain_rendition(),
        }
    } else {
        Submission {
            synced_text: String::new(),
            plain_text: doc.plain_rendition(),
        }
    }
}

/// Lint `doc` and submit it for `track`.
///
/// Returns the advisory findings for operator review. Lint is re-run here
/// even if the caller already did so, and nothing is sent while a blocking
/// finding exists.
///
/// # Errors
///
/// [`AcquisitionError::Blocked`] with every finding when any is blocking, or
/// [`AcquisitionError::Repository`] if the submission fails.
pub async fn publish(
    repo: &dyn LyricsRepository,
    track: &TrackIdentity,
    doc: &TimedDocument,
) -> Result<Vec<Finding>, AcquisitionError> {
    let findings = pre_publish_lint(doc);
    if has_blocking(&findings) {
        warn!(
            target: LOG_TARGET,
            "Refusing to publish {track}: {} lint finding(s)",
            findings.len()
        );
        return Err(AcquisitionError::Blocked { findings });
    }

    let submission = build_submission(doc);
    debug!(
        target: LOG_TARGET,
        "Submitting {track} to {} (synced: {}, instrumental: {})",
        repo.name(),
        !submission.synced_text.is_empty(),
        submission.is_instrumental()
    );
    repo.submit(track, &submission).await?;
    info!(target: LOG_TARGET, "Published lyrics for {track} to {}", repo.name());

    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryError;
    use crate::lint::FindingKind;
    use crate::lrc::INSTRUMENTAL_MARKER;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeRepository {
        result: Result<LookupResult, RepositoryError>,
        submitted: Mutex<Vec<Submission>>,
    }

    impl FakeRepository {
        fn returning(result: LookupResult) -> Self {
            Self {
                result: Ok(result),
                submitted: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                result: Err(RepositoryError::Unavailable {
                    provider: "fake".into(),
                    reason: "connection refused".into(),
                }),
                submitted: Mutex::new(Vec::new()),
            }
        }

        fn submissions(&self) -> Vec<Submission> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LyricsRepository for FakeRepository {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn lookup(&self, _track: &TrackIdentity) -> Result<LookupResult, RepositoryError> {
            self.result.clone()
        }

        async fn submit(
            &self,
            _track: &TrackIdentity,
            submission: &Submission,
        ) -> Result<(), RepositoryError> {
            self.result.clone()?;
            self.submitted.lock().unwrap().push(submission.clone());
            Ok(())
        }
    }

    fn track() -> TrackIdentity {
        TrackIdentity::new("Song", "Artist")
    }

    fn all_tiers() -> LookupResult {
        LookupResult {
            synced: Some("[00:01.00]Hello".into()),
            plain: Some("Hello".into()),
            instrumental: true,
            provider_id: Some("42".into()),
        }
    }

    #[tokio::test]
    async fn test_fetch_prefers_synced() {
        let repo = FakeRepository::returning(all_tiers());
        let fetched = fetch(&repo, &track()).await.unwrap();

        assert!(fetched.document.is_synced());
        assert_eq!(fetched.document.source, LyricsSource::DownloadedSynced);
        assert_eq!(fetched.provider, "fake");
        assert_eq!(fetched.provider_id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_plain() {
        let repo = FakeRepository::returning(LookupResult {
            plain: Some("Just words\n".into()),
            ..LookupResult::default()
        });
        let doc = fetch(&repo, &track()).await.unwrap().document;

        assert!(doc.is_plain());
        assert_eq!(doc.plain_text(), Some("Just words"));
        assert_eq!(doc.source, LyricsSource::DownloadedPlain);
    }

    #[tokio::test]
    async fn test_fetch_unusable_synced_falls_through() {
        let repo = FakeRepository::returning(LookupResult {
            synced: Some("no timestamps here".into()),
            plain: Some("Plain words".into()),
            ..LookupResult::default()
        });
        let doc = fetch(&repo, &track()).await.unwrap().document;
        assert_eq!(doc.plain_text(), Some("Plain words"));

        let repo = FakeRepository::returning(LookupResult {
            synced: Some("   \n".into()),
            instrumental: true,
            ..LookupResult::default()
        });
        let doc = fetch(&repo, &track()).await.unwrap().document;
        assert!(doc.is_instrumental());
    }

    #[tokio::test]
    async fn test_fetch_instrumental() {
        let repo = FakeRepository::returning(LookupResult {
            instrumental: true,
            ..LookupResult::default()
        });
        let doc = fetch(&repo, &track()).await.unwrap().document;
        assert!(doc.is_instrumental());
        assert_eq!(doc.source, LyricsSource::DownloadedInstrumental);

        let repo = FakeRepository::returning(LookupResult {
            synced: Some(INSTRUMENTAL_MARKER.into()),
            ..LookupResult::default()
        });
        let doc = fetch(&repo, &track()).await.unwrap().document;
        assert!(doc.is_instrumental());
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let repo = FakeRepository::returning(LookupResult::default());
        let err = fetch(&repo, &track()).await.unwrap_err();
        assert_eq!(
            err,
            AcquisitionError::NotFound {
                track: "Artist - Song".into()
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_surfaces_repository_error() {
        let repo = FakeRepository::failing();
        let err = fetch(&repo, &track()).await.unwrap_err();
        assert!(matches!(
            err,
            AcquisitionError::Repository(RepositoryError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_publish_synced_sends_both_texts() {
        let repo = FakeRepository::returning(LookupResult::default());
        let doc = TimedDocument::parse("[00:01.00]Hello\n[00:02.00]World").unwrap();

        let advisory = publish(&repo, &track(), &doc).await.unwrap();
        assert!(advisory.is_empty());
        assert_eq!(
            repo.submissions(),
            vec![Submission {
                synced_text: "[00:01.00]Hello\n[00:02.00]World".into(),
                plain_text: "Hello\nWorld".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_publish_plain_and_instrumental() {
        let repo = FakeRepository::returning(LookupResult::default());
        publish(&repo, &track(), &TimedDocument::plain("Words"))
            .await
            .unwrap();
        publish(&repo, &track(), &TimedDocument::instrumental())
            .await
            .unwrap();

        let sent = repo.submissions();
        assert_eq!(sent[0].synced_text, "");
        assert_eq!(sent[0].plain_text, "Words");
        assert!(sent[1].is_instrumental());
    }

    #[tokio::test]
    async fn test_publish_blocked_never_submits() {
        let repo = FakeRepository::returning(LookupResult::default());
        let err = publish(&repo, &track(), &TimedDocument::new_blank())
            .await
            .unwrap_err();

        assert!(matches!(err, AcquisitionError::Blocked { ref findings } if findings.len() == 1));
        assert!(repo.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_publish_blocked_on_out_of_order_edit() {
        let repo = FakeRepository::returning(LookupResult::default());
        let mut doc = TimedDocument::parse("[00:01.00]A\n[00:02.00]B").unwrap();
        doc.set_timestamp(1, 500).unwrap();

        let err = publish(&repo, &track(), &doc).await.unwrap_err();
        let AcquisitionError::Blocked { findings } = err else {
            unreachable!("publish should be blocked");
        };
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::OrderingViolation);
        assert_eq!(findings[0].line, Some(1));
        assert!(repo.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_publish_returns_advisory_findings() {
        let repo = FakeRepository::returning(LookupResult::default());
        let doc = TimedDocument::parse("[00:01.00]la\n[00:01.00]la").unwrap();

        let advisory = publish(&repo, &track(), &doc).await.unwrap();
        assert_eq!(advisory.len(), 1);
        assert!(!advisory[0].is_blocking());
        assert_eq!(repo.submissions().len(), 1);
    }
}
