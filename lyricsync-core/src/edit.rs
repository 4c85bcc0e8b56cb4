//! Edit operations on a [`TimedDocument`].
//!
//! Every operation is all-or-nothing: on error the document is unchanged.
//! Successful edits mark the document as pending; lines stay where they were
//! put until [`TimedDocument::commit`] re-sorts them, so "insert below the
//! cursor" keeps working while the user is typing.

use crate::document::{LyricLine, TimedDocument};
use crate::error::EditError;
use tracing::debug;

impl TimedDocument {
    /// Insert a line at `index` (not necessarily its sorted position).
    ///
    /// # Errors
    ///
    /// [`EditError::IndexOutOfRange`] if `index > len`,
    /// [`EditError::NegativeTimestamp`] if `timestamp_ms < 0`.
    pub fn insert_line(
        &mut self,
        index: usize,
        timestamp_ms: i64,
        text: impl Into<String>,
    ) -> Result<(), EditError> {
        if index > self.lines.len() {
            return Err(EditError::IndexOutOfRange {
                index,
                len: self.lines.len(),
            });
        }
        if timestamp_ms < 0 {
            return Err(EditError::NegativeTimestamp {
                index,
                timestamp_ms,
            });
        }

        self.lines.insert(index, LyricLine::new(timestamp_ms, text));
        self.is_instrumental = false;
        self.pending = true;
        Ok(())
    }

    /// Remove the line at `index`, returning it.
    ///
    /// # Errors
    ///
    /// [`EditError::IndexOutOfRange`] if there is no such line.
    pub fn delete_line(&mut self, index: usize) -> Result<LyricLine, EditError> {
        self.check_index(index)?;
        self.pending = true;
        Ok(self.lines.remove(index))
    }

    /// Replace the text of the line at `index`.
    ///
    /// # Errors
    ///
    /// [`EditError::IndexOutOfRange`] if there is no such line.
    pub fn set_text(&mut self, index: usize, text: impl Into<String>) -> Result<(), EditError> {
        self.check_index(index)?;
        self.lines[index].text = text.into();
        Ok(())
    }

    /// Replace the timestamp of the line at `index`.
    ///
    /// # Errors
    ///
    /// [`EditError::IndexOutOfRange`] if there is no such line,
    /// [`EditError::NegativeTimestamp`] if `timestamp_ms < 0`.
    pub fn set_timestamp(&mut self, index: usize, timestamp_ms: i64) -> Result<(), EditError> {
        self.check_index(index)?;
        if timestamp_ms < 0 {
            return Err(EditError::NegativeTimestamp {
                index,
                timestamp_ms,
            });
        }
        self.lines[index].timestamp_ms = timestamp_ms;
        self.pending = true;
        Ok(())
    }

    /// Add `delta_ms` to every timestamp.
    ///
    /// Lines that would move before the start of the track are clamped to
    /// zero rather than rejected. This is lossy at the boundary: lines that
    /// were distinct but both clamp to zero become equal, and shifting back
    /// later will not separate them again.
    pub fn shift_all(&mut self, delta_ms: i64) {
        let mut clamped = 0usize;
        for line in &mut self.lines {
            let shifted = line.timestamp_ms.saturating_add(delta_ms);
            if shifted < 0 {
                clamped += 1;
            }
            line.timestamp_ms = shifted.max(0);
        }
        if clamped > 0 {
            debug!("Shift by {delta_ms}ms clamped {clamped} line(s) to 00:00.00");
        }
        self.pending = true;
    }
}
