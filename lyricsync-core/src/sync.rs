//! Playback position to active lyric line.
//!
//! Lookups run on every position tick, so they binary search the committed
//! line sequence instead of scanning it, and never allocate.

use crate::document::{SyncedLines, TimedDocument};
use crate::error::EditError;
use crate::playback::AudioTransport;
use std::ops::Range;
use tracing::{debug, trace};

/// Position jump (either direction) treated as a seek rather than drift.
pub const SEEK_THRESHOLD_MS: i64 = 2000;

impl SyncedLines<'_> {
    /// Index of the last line with `timestamp_ms <= position_ms`.
    ///
    /// `None` before the first line or for an empty document. Among lines
    /// sharing a timestamp the last one wins.
    #[must_use]
    pub fn active_line_index(&self, position_ms: i64) -> Option<usize> {
        self.as_slice()
            .partition_point(|line| line.timestamp_ms <= position_ms)
            .checked_sub(1)
    }

    /// Timestamp to seek to when the user picks line `index`.
    ///
    /// # Errors
    ///
    /// [`EditError::IndexOutOfRange`] if there is no such line.
    pub fn seek_target_for(&self, index: usize) -> Result<i64, EditError> {
        self.get(index)
            .map(|line| line.timestamp_ms)
            .ok_or(EditError::IndexOutOfRange {
                index,
                len: self.len(),
            })
    }

    /// Range of line indices to display around `index`.
    #[must_use]
    pub fn visible_window(&self, index: Option<usize>, before: usize, after: usize) -> Range<usize> {
        let current = index.unwrap_or(0);
        let start = current.saturating_sub(before).min(self.len());
        let end = current.saturating_add(after).saturating_add(1).min(self.len());
        start..end
    }
}

/// Events emitted by the sync controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// The highlighted line changed
    ActiveLineChanged {
        index: Option<usize>,
        position_ms: i64,
    },
    /// Position jumped relative to the previous tick
    SeekDetected { from_ms: i64, to_ms: i64 },
}

/// Tracks the active line for one editing session.
///
/// Holds no reference to the document; each tick reads the latest committed
/// state, so edits show up on the next tick without any notification.
#[derive(Debug, Default)]
pub struct SyncController {
    active: Option<usize>,
    last_position_ms: Option<i64>,
}

impl SyncController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently highlighted line, as of the last tick.
    #[must_use]
    pub const fn active_line(&self) -> Option<usize> {
        self.active
    }

    /// Forget tick history, e.g. after switching tracks.
    pub fn reset(&mut self) {
        self.active = None;
        self.last_position_ms = None;
    }

    /// Process a position report.
    ///
    /// Commits pending edits first, then recomputes the active line from
    /// scratch so backward seeks are handled like any other tick. Events are
    /// pushed into `events` only when something changed.
    pub fn tick(&mut self, doc: &mut TimedDocument, position_ms: i64, events: &mut Vec<SyncEvent>) {
        if let Some(previous) = self.last_position_ms {
            let jump = position_ms.saturating_sub(previous);
            if !(0..=SEEK_THRESHOLD_MS).contains(&jump) {
                trace!("Seek detected: {previous}ms -> {position_ms}ms");
                events.push(SyncEvent::SeekDetected {
                    from_ms: previous,
                    to_ms: position_ms,
                });
            }
        }
        self.last_position_ms = Some(position_ms);

        let index = doc.commit().active_line_index(position_ms);
        if index != self.active {
            trace!("Active line {:?} -> {:?} at {position_ms}ms", self.active, index);
            self.active = index;
            events.push(SyncEvent::ActiveLineChanged { index, position_ms });
        }
    }

    /// Seek the transport to the start of line `index` and highlight it
    /// right away. The jump is not reported as a seek on the next tick.
    ///
    /// # Errors
    ///
    /// [`EditError::IndexOutOfRange`] if there is no such line.
    pub fn seek_to_line(
        &mut self,
        doc: &mut TimedDocument,
        index: usize,
        transport: &dyn AudioTransport,
    ) -> Result<i64, EditError> {
        let view = doc.commit();
        let target = view.seek_target_for(index)?;
        debug!("Seeking to line {index} at {target}ms");
        transport.seek(target);
        self.active = view.active_line_index(target);
        self.last_position_ms = Some(target);
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LyricLine;
    use std::sync::Mutex;

    struct FakeTransport {
        seeks: Mutex<Vec<i64>>,
    }

    impl AudioTransport for FakeTransport {
        fn position_ms(&self) -> i64 {
            0
        }

        fn seek(&self, position_ms: i64) {
            if let Ok(mut seeks) = self.seeks.lock() {
                seeks.push(position_ms);
            }
        }
    }

    fn scenario() -> TimedDocument {
        TimedDocument::parse("[00:01.00]Hello\n[00:03.50]World\n[00:02.00]Between").unwrap()
    }

    #[test]
    fn test_active_line_scenario() {
        let mut doc = scenario();
        let view = doc.commit();
        assert_eq!(view.active_line_index(2500), Some(1));
        assert_eq!(view.get(1).map(|l| l.text.as_str()), Some("Between"));
        assert_eq!(view.active_line_index(500), None);
        assert_eq!(view.active_line_index(1000), Some(0));
        assert_eq!(view.active_line_index(999_999), Some(2));
    }

    #[test]
    fn test_active_line_empty_document() {
        let mut doc = TimedDocument::new_blank();
        assert_eq!(doc.commit().active_line_index(1000), None);
    }

    #[test]
    fn test_tie_break_picks_last_equal() {
        let doc = TimedDocument::synced(vec![
            LyricLine::new(0, "intro"),
            LyricLine::new(1000, "a"),
            LyricLine::new(1000, "b"),
            LyricLine::new(1000, "c"),
            LyricLine::new(2000, "d"),
        ]);
        let view = doc.synced_lines().unwrap();
        assert_eq!(view.active_line_index(1000), Some(3));
        assert_eq!(view.active_line_index(1999), Some(3));
        assert_eq!(view.active_line_index(999), Some(0));
    }

    #[test]
    fn test_active_line_is_monotone() {
        let doc = TimedDocument::synced(
            (0..50)
                .map(|i| LyricLine::new((i / 3) * 700, format!("line {i}")))
                .collect(),
        );
        let view = doc.synced_lines().unwrap();
        let mut previous = None;
        for position in (-500..40_000).step_by(37) {
            let current = view.active_line_index(position);
            assert!(current >= previous, "regressed at {position}ms");
            previous = current;
        }
    }

    #[test]
    fn test_seek_target_for() {
        let mut doc = scenario();
        let view = doc.commit();
        assert_eq!(view.seek_target_for(2), Ok(3500));
        assert_eq!(
            view.seek_target_for(3),
            Err(EditError::IndexOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn test_visible_window() {
        let doc = TimedDocument::synced((0..5).map(|i| LyricLine::new(i * 1000, "x")).collect());
        let view = doc.synced_lines().unwrap();
        assert_eq!(view.visible_window(Some(1), 1, 1), 0..3);
        assert_eq!(view.visible_window(Some(0), 2, 1), 0..2);
        assert_eq!(view.visible_window(Some(4), 1, 3), 3..5);
        assert_eq!(view.visible_window(None, 0, 1), 0..2);
    }

    #[test]
    fn test_tick_emits_only_on_change() {
        let mut doc = scenario();
        let mut controller = SyncController::new();
        let mut events = Vec::new();

        controller.tick(&mut doc, 100, &mut events);
        assert!(events.is_empty());

        controller.tick(&mut doc, 1100, &mut events);
        assert_eq!(
            events,
            vec![SyncEvent::ActiveLineChanged {
                index: Some(0),
                position_ms: 1100
            }]
        );

        events.clear();
        controller.tick(&mut doc, 1200, &mut events);
        assert!(events.is_empty());
        assert_eq!(controller.active_line(), Some(0));
    }

    #[test]
    fn test_tick_handles_backward_seek() {
        let mut doc = scenario();
        let mut controller = SyncController::new();
        let mut events = Vec::new();

        controller.tick(&mut doc, 3600, &mut events);
        assert_eq!(controller.active_line(), Some(2));

        events.clear();
        controller.tick(&mut doc, 1500, &mut events);
        assert_eq!(controller.active_line(), Some(0));
        assert!(events.contains(&SyncEvent::SeekDetected {
            from_ms: 3600,
            to_ms: 1500
        }));
    }

    #[test]
    fn test_tick_sees_latest_edits() {
        let mut doc = scenario();
        let mut controller = SyncController::new();
        let mut events = Vec::new();

        controller.tick(&mut doc, 2500, &mut events);
        assert_eq!(controller.active_line(), Some(1));

        // Move "Hello" after the current position; tick commits implicitly
        doc.set_timestamp(0, 3000).unwrap();
        controller.tick(&mut doc, 2600, &mut events);
        assert!(!doc.has_pending_edits());
        assert_eq!(controller.active_line(), Some(0));
        assert_eq!(doc.lines()[0].text, "Between");
    }

    #[test]
    fn test_seek_to_line() {
        let mut doc = scenario();
        let mut controller = SyncController::new();
        let transport = FakeTransport {
            seeks: Mutex::new(Vec::new()),
        };

        assert_eq!(controller.seek_to_line(&mut doc, 1, &transport), Ok(2000));
        assert!(controller.seek_to_line(&mut doc, 7, &transport).is_err());
        assert_eq!(*transport.seeks.lock().unwrap(), vec![2000]);
        assert_eq!(controller.active_line(), Some(1));

        let mut events = Vec::new();
        controller.tick(&mut doc, 2050, &mut events);
        assert!(events.is_empty());
    }
}
