pub mod challenge;

use async_trait::async_trait;
use challenge::Challenge;
use lyricsync_core::{
    LookupResult, LrclibConfig, LyricsRepository, RepositoryError, Submission, TrackIdentity,
    INSTRUMENTAL_MARKER,
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "lyricsync::lrclib";
const PROVIDER: &str = "lrclib";

/// Duration tolerance for matching (±2 seconds)
const DURATION_TOLERANCE_SECS: f64 = 2.0;

/// Calculate a score for duration matching (lower is better).
/// Returns 0 for exact matches, higher values for larger differences.
/// Capped at `i32::MAX` to prevent overflow.
#[allow(clippy::cast_possible_truncation)]
fn duration_score(actual: Option<f64>, expected: Option<u32>, scale: f64) -> i32 {
    match (actual, expected) {
        (Some(d), Some(q)) => {
            let diff = (d - f64::from(q)).abs() * scale;
            if diff > f64::from(i32::MAX) {
                i32::MAX
            } else {
                diff as i32
            }
        }
        _ => 50, // Default score when duration is unknown
    }
}

fn unavailable(reason: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Unavailable {
        provider: PROVIDER.to_string(),
        reason: reason.to_string(),
    }
}

/// Record returned by the LRCLIB get and search endpoints.
/// Unused fields are ignored by serde.
#[derive(Debug, Clone, Deserialize)]
struct LrclibRecord {
    id: i64,
    #[serde(rename = "artistName")]
    artist_name: String,
    duration: Option<f64>,
    #[serde(default)]
    instrumental: bool,
    #[serde(rename = "plainLyrics")]
    plain_lyrics: Option<String>,
    #[serde(rename = "syncedLyrics")]
    synced_lyrics: Option<String>,
}

impl LrclibRecord {
    fn has_lyrics(&self) -> bool {
        self.synced_lyrics.is_some() || self.plain_lyrics.is_some()
    }

    fn into_lookup(self) -> LookupResult {
        let synced = non_blank(self.synced_lyrics);
        let plain = non_blank(self.plain_lyrics);
        let instrumental = self.instrumental || synced.as_deref() == Some(INSTRUMENTAL_MARKER);

        LookupResult {
            synced,
            plain,
            instrumental,
            provider_id: Some(self.id.to_string()),
        }
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Pick the best search hit: synced lyrics first, then closest duration.
fn best_match(
    records: Vec<LrclibRecord>,
    duration_secs: Option<u32>,
    scale: f64,
) -> Option<LrclibRecord> {
    records
        .into_iter()
        .filter(LrclibRecord::has_lyrics)
        .min_by_key(|r| {
            let sync_score = if r.synced_lyrics.is_some() { 0 } else { 100 };
            sync_score + duration_score(r.duration, duration_secs, scale)
        })
}

/// Keep only records within ±2 seconds of the expected duration.
fn within_tolerance(records: Vec<LrclibRecord>, duration_secs: Option<u32>) -> Vec<LrclibRecord> {
    let Some(expected) = duration_secs else {
        return records;
    };
    let expected = f64::from(expected);
    records
        .into_iter()
        .filter(|r| {
            r.duration
                .is_some_and(|d| (d - expected).abs() <= DURATION_TOLERANCE_SECS)
        })
        .collect()
}

/// Body of `POST /publish`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishRequest<'a> {
    track_name: &'a str,
    artist_name: &'a str,
    album_name: &'a str,
    duration: u32,
    plain_lyrics: &'a str,
    synced_lyrics: &'a str,
}

/// Error body LRCLIB sends with 4xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// LRCLIB.net lyrics repository
pub struct LrclibRepository {
    client: ClientWithMiddleware,
    base_url: String,
}

impl LrclibRepository {
    /// Create a repository against the public LRCLIB instance with default
    /// timeout and retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, RepositoryError> {
        Self::from_config(&LrclibConfig::default())
    }

    /// Create a repository from the `[lrclib]` config section.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_config(config: &LrclibConfig) -> Result<Self, RepositoryError> {
        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(&config.user_agent)
            .build()
            .map_err(unavailable)?;

        // Wrap with retry middleware (exponential backoff)
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Option<T>, RepositoryError> {
        debug!(target: LOG_TARGET, "LRCLIB GET: {url}");

        let response = self.client.get(url).send().await.map_err(unavailable)?;
        let status = response.status();
        debug!(target: LOG_TARGET, "LRCLIB response status: {status}");

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            warn!(target: LOG_TARGET, "LRCLIB returned status: {status}");
            return Err(unavailable(format!("LRCLIB returned status: {status}")));
        }

        response.json().await.map(Some).map_err(unavailable)
    }

    /// Exact match on artist, track, album and duration
    async fn get_exact(&self, track: &TrackIdentity) -> Result<Option<LrclibRecord>, RepositoryError> {
        let mut url = format!(
            "{}/get?artist_name={}&track_name={}",
            self.base_url,
            urlencoding::encode(&track.artist),
            urlencoding::encode(&track.title)
        );
        if let Some(ref album) = track.album {
            let _ = write!(url, "&album_name={}", urlencoding::encode(album));
        }
        if let Some(duration) = track.duration_secs() {
            let _ = write!(url, "&duration={duration}");
        }

        self.get_json(&url).await
    }

    /// Search by track name only and match duration within ±2 seconds
    async fn search_by_track_name(
        &self,
        track: &TrackIdentity,
    ) -> Result<Option<LrclibRecord>, RepositoryError> {
        let url = format!(
            "{}/search?track_name={}",
            self.base_url,
            urlencoding::encode(&track.title)
        );

        let results: Vec<LrclibRecord> = self.get_json(&url).await?.unwrap_or_default();
        let filtered = within_tolerance(results, track.duration_secs());
        Ok(best_match(filtered, track.duration_secs(), 10.0))
    }

    /// Free-text search on "artist title"
    async fn search_fallback(
        &self,
        track: &TrackIdentity,
    ) -> Result<Option<LrclibRecord>, RepositoryError> {
        let query = format!("{} {}", track.artist, track.title);
        let url = format!(
            "{}/search?q={}",
            self.base_url,
            urlencoding::encode(&query)
        );

        let results: Vec<LrclibRecord> = self.get_json(&url).await?.unwrap_or_default();
        Ok(best_match(results, track.duration_secs(), 1.0))
    }

    async fn request_challenge(&self) -> Result<Challenge, RepositoryError> {
        let url = format!("{}/request-challenge", self.base_url);
        debug!(target: LOG_TARGET, "LRCLIB POST: {url}");

        let response = self.client.post(&url).send().await.map_err(unavailable)?;
        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!(
                "LRCLIB challenge request returned status: {status}"
            )));
        }
        response.json().await.map_err(unavailable)
    }
}

#[async_trait]
impl LyricsRepository for LrclibRepository {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn lookup(&self, track: &TrackIdentity) -> Result<LookupResult, RepositoryError> {
        info!(
            target: LOG_TARGET,
            "Fetching lyrics from LRCLIB for: {track} (duration: {:?}s)",
            track.duration_secs()
        );

        let record = match self.get_exact(track).await? {
            Some(record) => Some(record),
            None => {
                info!(target: LOG_TARGET, "LRCLIB exact match not found, searching by track name");
                match self.search_by_track_name(track).await? {
                    Some(record) => Some(record),
                    None => {
                        info!(target: LOG_TARGET, "No match by track name, trying full search");
                        self.search_fallback(track).await?
                    }
                }
            }
        };

        match record {
            Some(record) => {
                info!(
                    target: LOG_TARGET,
                    "LRCLIB match (id: {}, artist: {}, duration: {:?})",
                    record.id,
                    record.artist_name,
                    record.duration
                );
                Ok(record.into_lookup())
            }
            None => {
                info!(target: LOG_TARGET, "LRCLIB has no lyrics for {track}");
                Ok(LookupResult::default())
            }
        }
    }

    async fn submit(
        &self,
        track: &TrackIdentity,
        submission: &Submission,
    ) -> Result<(), RepositoryError> {
        let Some(duration) = track.duration_secs() else {
            return Err(RepositoryError::InvalidRequest {
                provider: PROVIDER.to_string(),
                reason: "track duration is required to publish".to_string(),
            });
        };

        info!(target: LOG_TARGET, "Requesting publish challenge for {track}");
        let challenge = self.request_challenge().await?;

        let solving = challenge.clone();
        let nonce = tokio::task::spawn_blocking(move || challenge::solve(&solving))
            .await
            .map_err(unavailable)?
            .map_err(|e| unavailable(format!("invalid challenge target: {e}")))?;
        debug!(target: LOG_TARGET, "Solved publish challenge with nonce {nonce}");

        let body = PublishRequest {
            track_name: &track.title,
            artist_name: &track.artist,
            album_name: track.album.as_deref().unwrap_or_default(),
            duration,
            plain_lyrics: &submission.plain_text,
            synced_lyrics: &submission.synced_text,
        };

        let url = format!("{}/publish", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("X-Publish-Token", challenge.publish_token(&nonce))
            .json(&body)
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        if status.is_success() {
            info!(target: LOG_TARGET, "Published lyrics for {track} to LRCLIB");
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let reason = serde_json_message(&text).unwrap_or(text);
        warn!(target: LOG_TARGET, "LRCLIB rejected publish ({status}): {reason}");
        Err(RepositoryError::Rejected {
            provider: PROVIDER.to_string(),
            status: status.as_u16(),
            reason,
        })
    }
}

fn serde_json_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body).ok().map(|e| e.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(json: &str) -> Vec<LrclibRecord> {
        serde_json::from_str(json).unwrap()
    }

    const SEARCH_RESULTS: &str = r#"[
        {"id": 1, "trackName": "Song", "artistName": "Cover Band", "duration": 240.0,
         "instrumental": false, "plainLyrics": "words", "syncedLyrics": null},
        {"id": 2, "trackName": "Song", "artistName": "Artist", "duration": 201.0,
         "instrumental": false, "plainLyrics": "words", "syncedLyrics": "[00:01.00]words"},
        {"id": 3, "trackName": "Song", "artistName": "Artist", "duration": 200.0,
         "instrumental": false, "plainLyrics": "words", "syncedLyrics": null},
        {"id": 4, "trackName": "Song", "artistName": "Nobody", "duration": 200.0,
         "instrumental": true, "plainLyrics": null, "syncedLyrics": null}
    ]"#;

    #[test]
    fn test_duration_score() {
        assert_eq!(duration_score(Some(200.0), Some(200), 10.0), 0);
        assert_eq!(duration_score(Some(201.5), Some(200), 10.0), 15);
        assert_eq!(duration_score(None, Some(200), 10.0), 50);
        assert_eq!(duration_score(Some(1e12), Some(0), 10.0), i32::MAX);
    }

    #[test]
    fn test_tolerance_filter() {
        let filtered = within_tolerance(records(SEARCH_RESULTS), Some(200));
        let ids: Vec<_> = filtered.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);

        assert_eq!(within_tolerance(records(SEARCH_RESULTS), None).len(), 4);
    }

    #[test]
    fn test_best_match_prefers_synced() {
        let best = best_match(records(SEARCH_RESULTS), Some(200), 10.0).unwrap();
        assert_eq!(best.id, 2);
    }

    #[test]
    fn test_best_match_skips_records_without_lyrics() {
        let only_instrumental = records(
            r#"[{"id": 4, "artistName": "A", "duration": 200.0, "instrumental": true,
                 "plainLyrics": null, "syncedLyrics": null}]"#,
        );
        assert!(best_match(only_instrumental, Some(200), 1.0).is_none());
    }

    #[test]
    fn test_into_lookup() {
        let record: LrclibRecord = serde_json::from_str(
            r#"{"id": 77, "artistName": "A", "duration": 180.0, "instrumental": false,
                "plainLyrics": "  Hello  \n", "syncedLyrics": "  "}"#,
        )
        .unwrap();
        let lookup = record.into_lookup();

        assert_eq!(lookup.synced, None);
        assert_eq!(lookup.plain.as_deref(), Some("Hello"));
        assert!(!lookup.instrumental);
        assert_eq!(lookup.provider_id.as_deref(), Some("77"));
    }

    #[test]
    fn test_marker_counts_as_instrumental() {
        let record: LrclibRecord = serde_json::from_str(
            r#"{"id": 5, "artistName": "A", "duration": null,
                "plainLyrics": null, "syncedLyrics": "[au: instrumental]"}"#,
        )
        .unwrap();
        assert!(record.into_lookup().instrumental);
    }

    #[test]
    fn test_publish_request_shape() {
        let body = PublishRequest {
            track_name: "Song",
            artist_name: "Artist",
            album_name: "",
            duration: 200,
            plain_lyrics: "Hello",
            synced_lyrics: "[00:01.00]Hello",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["trackName"], "Song");
        assert_eq!(json["artistName"], "Artist");
        assert_eq!(json["albumName"], "");
        assert_eq!(json["duration"], 200);
        assert_eq!(json["plainLyrics"], "Hello");
        assert_eq!(json["syncedLyrics"], "[00:01.00]Hello");
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"code": 400, "name": "IncorrectPublishToken", "message": "The provided publish token is incorrect"}"#;
        assert_eq!(
            serde_json_message(body).as_deref(),
            Some("The provided publish token is incorrect")
        );
        assert_eq!(serde_json_message("<html>"), None);
    }

    #[tokio::test]
    async fn test_submit_requires_duration() {
        let repo = LrclibRepository::new().unwrap();
        let err = repo
            .submit(&TrackIdentity::new("Song", "Artist"), &Submission::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidRequest { .. }));
    }

    #[test]
    fn test_from_config_trims_base_url() {
        let config = LrclibConfig {
            base_url: "http://localhost:3000/api/".to_string(),
            ..LrclibConfig::default()
        };
        let repo = LrclibRepository::from_config(&config).unwrap();
        assert_eq!(repo.base_url, "http://localhost:3000/api");
    }
}
