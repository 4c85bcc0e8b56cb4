//! Editing session: one track, its document and everything that touches it.
//!
//! The session is the single writer for its document. Fetches run as
//! separate tasks and hand their result back through
//! [`EditingSession::complete_fetch`], the only place a fetched document
//! replaces the current one. Every fetch is tagged with the track and a
//! generation counter so results for a track the session has since left are
//! dropped instead of applied.

use crate::acquisition::{self, FetchedLyrics};
use crate::document::{LyricsSource, TimedDocument};
use crate::error::{AcquisitionError, EditError, Result};
use crate::playback::AudioTransport;
use crate::provider::LyricsRepository;
use crate::store::LyricsStore;
use crate::sync::{SyncController, SyncEvent};
use crate::track::TrackIdentity;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "lyricsync::session";

/// Tags an in-flight fetch with the session state it was started for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub track: TrackIdentity,
    pub generation: u64,
}

/// Result of a fetch task, ready to be handed back to the session
#[derive(Debug)]
pub struct FetchCompletion {
    pub ticket: FetchTicket,
    pub result: std::result::Result<FetchedLyrics, AcquisitionError>,
}

/// What [`EditingSession::complete_fetch`] did with a result
#[derive(Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The fetched document replaced the current one
    Applied,
    /// The session moved on; the result was dropped
    Stale,
    /// The fetch failed; the current document is untouched
    Failed(AcquisitionError),
}

pub struct EditingSession {
    track: TrackIdentity,
    document: TimedDocument,
    saved: TimedDocument,
    controller: SyncController,
    dirty: bool,
    generation: u64,
    in_flight: Option<CancellationToken>,
}

impl EditingSession {
    /// Start a session for `track` with a blank document
    #[must_use]
    pub fn new(track: TrackIdentity) -> Self {
        Self::with_document(track, TimedDocument::new_blank())
    }

    /// Start a session for `track` around an existing document
    #[must_use]
    pub fn with_document(track: TrackIdentity, document: TimedDocument) -> Self {
        Self {
            track,
            saved: document.clone(),
            document,
            controller: SyncController::new(),
            dirty: false,
            generation: 0,
            in_flight: None,
        }
    }

    #[must_use]
    pub const fn track(&self) -> &TrackIdentity {
        &self.track
    }

    #[must_use]
    pub const fn document(&self) -> &TimedDocument {
        &self.document
    }

    /// Whether the document has changes not yet saved
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub const fn active_line(&self) -> Option<usize> {
        self.controller.active_line()
    }

    /// Apply an edit to the document. On success the document becomes a
    /// local edit and the session is marked dirty; on error nothing changes.
    ///
    /// # Errors
    ///
    /// Returns whatever the edit returns.
    pub fn edit<T>(
        &mut self,
        f: impl FnOnce(&mut TimedDocument) -> std::result::Result<T, EditError>,
    ) -> std::result::Result<T, EditError> {
        let value = f(&mut self.document)?;
        self.document.source = LyricsSource::LocalEdit;
        self.dirty = true;
        Ok(value)
    }

    /// Shift every line by `delta_ms`
    pub fn shift_all(&mut self, delta_ms: i64) {
        self.document.shift_all(delta_ms);
        self.document.source = LyricsSource::LocalEdit;
        self.dirty = true;
    }

    /// Feed a playback position to the sync controller.
    pub fn tick(&mut self, position_ms: i64, events: &mut Vec<SyncEvent>) {
        self.controller.tick(&mut self.document, position_ms, events);
    }

    /// Seek the transport to line `index`.
    ///
    /// # Errors
    ///
    /// [`EditError::IndexOutOfRange`] if there is no such line.
    pub fn seek_to_line(
        &mut self,
        index: usize,
        transport: &dyn AudioTransport,
    ) -> std::result::Result<i64, EditError> {
        self.controller.seek_to_line(&mut self.document, index, transport)
    }

    /// Replace the document with the stored copy for this track.
    ///
    /// Returns `false` and leaves the document alone when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the stored text does not parse.
    pub async fn load(&mut self, store: &dyn LyricsStore) -> Result<bool> {
        let Some(stored) = store.load_raw(&self.track).await? else {
            debug!(target: LOG_TARGET, "No stored lyrics for {}", self.track);
            return Ok(false);
        };

        let document = TimedDocument::parse(&stored.content)?.with_source(stored.source);
        info!(
            target: LOG_TARGET,
            "Loaded {} lyrics for {} ({} lines)",
            document.source,
            self.track,
            document.len()
        );
        self.replace_document(document);
        self.saved = self.document.clone();
        self.dirty = false;
        Ok(true)
    }

    /// Commit pending edits and persist the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails. The session stays dirty.
    pub async fn save(&mut self, store: &dyn LyricsStore) -> Result<()> {
        self.document.commit();
        let raw = self.document.to_lrc();
        store
            .save_raw(&self.track, &raw, self.document.source)
            .await?;

        info!(target: LOG_TARGET, "Saved lyrics for {}", self.track);
        self.saved = self.document.clone();
        self.dirty = false;
        Ok(())
    }

    /// Discard unsaved changes, restoring the last loaded or saved document.
    pub fn revert(&mut self) {
        if self.dirty {
            debug!(target: LOG_TARGET, "Reverting unsaved changes for {}", self.track);
        }
        self.replace_document(self.saved.clone());
        self.dirty = false;
    }

    /// Move the session to another track. Cancels any in-flight fetch and
    /// starts from a blank document; unsaved changes are dropped.
    pub fn switch_track(&mut self, track: TrackIdentity) {
        if self.dirty {
            warn!(
                target: LOG_TARGET,
                "Switching away from {} with unsaved changes",
                self.track
            );
        }
        self.cancel_fetch();
        self.generation = self.generation.wrapping_add(1);
        info!(target: LOG_TARGET, "Switching track: {} -> {track}", self.track);

        self.track = track;
        self.saved = TimedDocument::new_blank();
        self.replace_document(TimedDocument::new_blank());
        self.dirty = false;
    }

    /// Start a fetch for the current track. Any earlier fetch is cancelled
    /// and its result will be reported stale.
    pub fn begin_fetch(&mut self) -> (FetchTicket, CancellationToken) {
        self.cancel_fetch();
        self.generation = self.generation.wrapping_add(1);

        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());
        let ticket = FetchTicket {
            track: self.track.clone(),
            generation: self.generation,
        };
        debug!(
            target: LOG_TARGET,
            "Starting fetch for {} (generation {})",
            ticket.track,
            ticket.generation
        );
        (ticket, token)
    }

    /// Cancel the in-flight fetch, if any
    pub fn cancel_fetch(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }

    /// Run a fetch on a tokio task.
    ///
    /// Yields `None` if `token` is cancelled before the repository answers.
    pub fn spawn_fetch(
        repo: Arc<dyn LyricsRepository>,
        ticket: FetchTicket,
        token: CancellationToken,
    ) -> JoinHandle<Option<FetchCompletion>> {
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(target: LOG_TARGET, "Fetch for {} cancelled", ticket.track);
                    None
                }
                result = acquisition::fetch(repo.as_ref(), &ticket.track) => {
                    Some(FetchCompletion { ticket, result })
                }
            }
        })
    }

    /// Apply a finished fetch if it still belongs to this session's current
    /// track and is the latest one started.
    pub fn complete_fetch(&mut self, completion: FetchCompletion) -> FetchOutcome {
        let FetchCompletion { ticket, result } = completion;
        if ticket.track != self.track || ticket.generation != self.generation {
            debug!(
                target: LOG_TARGET,
                "Dropping stale fetch for {} (generation {}, current {})",
                ticket.track,
                ticket.generation,
                self.generation
            );
            return FetchOutcome::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(fetched) => {
                self.replace_document(fetched.document);
                self.dirty = true;
                FetchOutcome::Applied
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Fetch for {} failed: {e}", self.track);
                FetchOutcome::Failed(e)
            }
        }
    }

    fn replace_document(&mut self, document: TimedDocument) {
        self.document = document;
        self.controller.reset();
    }
}
