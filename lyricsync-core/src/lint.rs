//! Pre-publish validation.
//!
//! Re-checks ordering and non-negativity even though the edit engine keeps
//! them, because documents may arrive from storage or other tools.

use crate::document::TimedDocument;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingKind {
    /// No lines, no plain text and not instrumental
    EmptyContent,
    /// Timestamp is negative or earlier than the line before it
    OrderingViolation,
    /// Same timestamp and text as the line before it
    DuplicateLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Publishing must not proceed
    Blocking,
    /// Shown for review, does not stop publishing
    Advisory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: FindingKind,
    /// Offending line index, when the finding is about one line
    pub line: Option<usize>,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    fn new(kind: FindingKind, line: Option<usize>, message: impl Into<String>) -> Self {
        let severity = match kind {
            FindingKind::EmptyContent | FindingKind::OrderingViolation => Severity::Blocking,
            FindingKind::DuplicateLine => Severity::Advisory,
        };
        Self {
            kind,
            line,
            severity,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Blocking => "error",
            Severity::Advisory => "warning",
        };
        match self.line {
            Some(line) => write!(f, "{severity}: line {}: {}", line + 1, self.message),
            None => write!(f, "{severity}: {}", self.message),
        }
    }
}

/// True if any finding stops publishing.
#[must_use]
pub fn has_blocking(findings: &[Finding]) -> bool {
    findings.iter().any(Finding::is_blocking)
}

/// Validate a document before it is submitted. Never mutates.
#[must_use]
pub fn pre_publish_lint(doc: &TimedDocument) -> Vec<Finding> {
    let mut findings = Vec::new();

    if doc.is_empty() {
        findings.push(Finding::new(
            FindingKind::EmptyContent,
            None,
            "Lyrics are empty; add lines, plain text or mark the track instrumental",
        ));
        return findings;
    }

    let lines = doc.lines();
    for (index, line) in lines.iter().enumerate() {
        if line.timestamp_ms < 0 {
            findings.push(Finding::new(
                FindingKind::OrderingViolation,
                Some(index),
                format!("Timestamp {}ms is negative", line.timestamp_ms),
            ));
            continue;
        }

        let Some(previous) = index.checked_sub(1).map(|i| &lines[i]) else {
            continue;
        };

        if line.timestamp_ms < previous.timestamp_ms {
            findings.push(Finding::new(
                FindingKind::OrderingViolation,
                Some(index),
                format!(
                    "Timestamp {}ms is earlier than the previous line ({}ms)",
                    line.timestamp_ms, previous.timestamp_ms
                ),
            ));
        } else if line.timestamp_ms == previous.timestamp_ms && line.text == previous.text {
            findings.push(Finding::new(
                FindingKind::DuplicateLine,
                Some(index),
                "Duplicate of the previous line",
            ));
        }
    }

    findings
}
