use crate::time::DurationExt;
use std::time::{Duration, Instant};

/// Audio transport the lyrics view follows.
///
/// Only reads position and requests seeks; transport state stays with the
/// player.
pub trait AudioTransport: Send + Sync {
    /// Current playback position in milliseconds. Monotonic while playing,
    /// may jump on seek.
    fn position_ms(&self) -> i64;

    /// Ask the player to seek to `position_ms`.
    fn seek(&self, position_ms: i64);
}

/// Last position reported by the transport, for interpolating between reports
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    /// Whether music is currently playing
    pub is_playing: bool,
    /// Reported playback position
    pub position: Duration,
    /// Total track duration
    pub duration: Duration,
    /// When the position was reported
    pub updated_at: Instant,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            is_playing: false,
            position: Duration::ZERO,
            duration: Duration::ZERO,
            updated_at: Instant::now(),
        }
    }
}

impl PlaybackClock {
    #[must_use]
    pub fn new(is_playing: bool, position: Duration, duration: Duration) -> Self {
        Self {
            is_playing,
            position,
            duration,
            updated_at: Instant::now(),
        }
    }

    /// Record a fresh report from the transport.
    pub fn report(&mut self, is_playing: bool, position: Duration) {
        self.is_playing = is_playing;
        self.position = position;
        self.updated_at = Instant::now();
    }

    /// Get interpolated position based on time elapsed since last report
    #[must_use]
    pub fn interpolated_position(&self) -> Duration {
        if !self.is_playing {
            return self.position;
        }

        let interpolated = self.position + self.updated_at.elapsed();

        // Clamp to track duration when known
        if self.duration.is_zero() {
            interpolated
        } else {
            interpolated.min(self.duration)
        }
    }

    /// Interpolated position in milliseconds, for active-line lookups.
    #[must_use]
    pub fn position_ms(&self) -> i64 {
        self.interpolated_position().as_millis_i64()
    }
}
