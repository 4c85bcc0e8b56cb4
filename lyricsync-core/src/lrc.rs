//! LRC codec: raw timed text to [`TimedDocument`] and back.

use crate::document::{LyricLine, MetadataTag, TimedDocument};
use crate::error::ParseError;
use tracing::warn;

/// Line emitted for, and recognized as, an instrumental track.
pub const INSTRUMENTAL_MARKER: &str = "[au: instrumental]";

/// Standard LRC ID tag keys. Other `[word: text]` lines are lyric text,
/// such as section headers in plain lyrics.
const ID_TAG_KEYS: &[&str] = &[
    "ar", "al", "ti", "au", "by", "length", "offset", "re", "tool", "ve", "la", "id",
];

impl TimedDocument {
    /// Parse an LRC string into a `TimedDocument`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Empty`] when the input has neither timed lines,
    /// plain text nor an instrumental marker.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        Self::parse_with(input, false)
    }

    /// Parse an LRC string, treating content-free input as instrumental when
    /// the caller already knows the track is instrumental.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Empty`] when the input has no usable content and
    /// `instrumental` is false.
    pub fn parse_with(input: &str, instrumental: bool) -> Result<Self, ParseError> {
        let mut metadata = Vec::new();
        let mut lines = Vec::new();
        let mut plain_lines: Vec<&str> = Vec::new();
        let mut marker_seen = false;

        for raw in input.lines() {
            let line = raw.trim();
            if line.is_empty() {
                // Keep stanza breaks inside plain text
                if !plain_lines.is_empty() {
                    plain_lines.push("");
                }
                continue;
            }

            if is_instrumental_marker(line) {
                marker_seen = true;
                continue;
            }

            if let Some(tag) = parse_id_tag(line) {
                metadata.push(tag);
                continue;
            }

            let (timestamps, text) = split_timestamps(line);
            if timestamps.is_empty() {
                if !text.is_empty() {
                    plain_lines.push(text);
                }
                continue;
            }

            // One line per tag for multi-timestamp lines
            for timestamp_ms in timestamps {
                lines.push(LyricLine::new(timestamp_ms, text));
            }
        }

        while plain_lines.last().is_some_and(|l| l.is_empty()) {
            plain_lines.pop();
        }
        let plain_text = (!plain_lines.is_empty()).then(|| plain_lines.join("\n"));

        if lines.is_empty() && plain_text.is_none() {
            if marker_seen || instrumental {
                let mut doc = Self::instrumental();
                doc.metadata = metadata;
                return Ok(doc);
            }
            return Err(ParseError::Empty);
        }

        // Stable, so equal timestamps keep input order
        lines.sort_by_key(|l| l.timestamp_ms);

        Ok(Self {
            lines,
            plain_text,
            metadata,
            ..Self::default()
        })
    }

    /// Serialize back to LRC text.
    ///
    /// Pending edits are serialized in committed order without mutating the
    /// document. Plain text is only emitted for documents without timed lines;
    /// untimed lines alongside timed ones are dropped with a warning.
    #[must_use]
    pub fn to_lrc(&self) -> String {
        if self.is_instrumental {
            return INSTRUMENTAL_MARKER.to_string();
        }

        if let (false, Some(plain)) = (self.lines.is_empty(), self.plain_text.as_deref()) {
            warn!(
                "Dropping {} untimed line(s) from synced lyrics",
                plain.lines().filter(|l| !l.trim().is_empty()).count()
            );
        }

        let mut output: Vec<String> = self
            .metadata
            .iter()
            .map(|tag| format!("[{}:{}]", tag.key, tag.value))
            .collect();

        if self.lines.is_empty() {
            if let Some(ref plain) = self.plain_text {
                output.push(plain.clone());
            }
            return output.join("\n");
        }

        let mut ordered: Vec<&LyricLine> = self.lines.iter().collect();
        if self.pending {
            ordered.sort_by_key(|l| l.timestamp_ms.max(0));
        }

        for line in ordered {
            output.push(format!(
                "[{}]{}",
                format_timestamp(line.timestamp_ms),
                line.text
            ));
        }

        output.join("\n")
    }
}

/// Derive plain lyrics from synced LRC text by dropping tags and timestamps.
#[must_use]
pub fn plain_text_from_synced(input: &str) -> String {
    TimedDocument::parse(input)
        .map(|doc| doc.plain_rendition())
        .unwrap_or_default()
}

/// Format milliseconds as an LRC timestamp (mm:ss.xx), clamping negatives to zero.
#[must_use]
pub fn format_timestamp(timestamp_ms: i64) -> String {
    let ms = timestamp_ms.max(0);
    let total_secs = ms / 1000;
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    let hundredths = (ms % 1000) / 10;

    format!("{minutes:02}:{seconds:02}.{hundredths:02}")
}

/// Parse a timestamp like "01:02.34", "01:02.345", "01:02" or "01:02:34"
/// into milliseconds.
///
/// The fractional field is scaled by its digit count: tenths, hundredths or
/// milliseconds. Digits past the third are truncated.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();
    let mut parts = s.splitn(2, ':');
    let minutes = parse_digits(parts.next()?)?;
    let rest = parts.next()?;

    // Accept both "." and ":" before the fraction
    let (seconds, fraction) = match rest.find(['.', ':']) {
        Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
        None => (rest, None),
    };

    if seconds.len() > 2 {
        return None;
    }
    let seconds = parse_digits(seconds)?;
    if seconds >= 60 {
        return None;
    }

    let fraction_ms = match fraction {
        None => 0,
        Some(frac) => {
            let digits = parse_digits(frac)?;
            match frac.len() {
                1 => digits * 100,
                2 => digits * 10,
                3 => digits,
                _ => parse_digits(&frac[..3])?,
            }
        }
    };

    minutes
        .checked_mul(60_000)?
        .checked_add(seconds * 1000)?
        .checked_add(fraction_ms)
}

/// Parse a non-empty run of ASCII digits.
fn parse_digits(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn is_instrumental_marker(line: &str) -> bool {
    let Some(inner) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) else {
        return false;
    };
    let Some((key, value)) = inner.split_once(':') else {
        return false;
    };
    key.trim().eq_ignore_ascii_case("au") && value.trim().eq_ignore_ascii_case("instrumental")
}

/// Parse an ID tag like [ti:Title] or [ar:Artist].
///
/// The whole line must be the tag and the key must be one of
/// [`ID_TAG_KEYS`], so timestamps and bracketed lyric text like
/// `[Verse 2: Guest]` are never mistaken for metadata.
fn parse_id_tag(line: &str) -> Option<MetadataTag> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    if inner.contains(']') {
        return None;
    }
    let (key, value) = inner.split_once(':')?;
    let key = key.trim();
    if !ID_TAG_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key)) {
        return None;
    }
    Some(MetadataTag {
        key: key.to_string(),
        value: value.trim().to_string(),
    })
}

/// Split leading timestamp tags from the line text.
///
/// Malformed timestamp-like tags are dropped individually; a bracket that
/// does not start with a digit ends the tag run and stays part of the text.
fn split_timestamps(line: &str) -> (Vec<i64>, &str) {
    let mut timestamps = Vec::new();
    let mut remaining = line;

    while remaining.starts_with('[') {
        let Some(end) = remaining.find(']') else {
            break;
        };
        let content = &remaining[1..end];

        if let Some(timestamp_ms) = parse_timestamp(content) {
            timestamps.push(timestamp_ms);
        } else if !content.starts_with(|c: char| c.is_ascii_digit()) {
            break;
        }
        remaining = remaining[end + 1..].trim_start();
    }

    (timestamps, remaining.trim())
}
