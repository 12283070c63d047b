//! Typed history entries and their one-line text form.
//!
//! ```text
//! 2026-10-19T08:15:30.123Z: SUCCESS: Backup created at /backups/backup-2026-10-19T08-15-30-120Z.tar.gz, HASH: 2d07...1fe3
//! 2026-10-19T09:15:30.004Z: FAILED: archiver exited with exit status: 2
//! 2026-10-19T10:15:30.871Z: SKIPPED: No changes detected
//! ```

use crate::fs::fingerprint::{Fingerprint, InvalidFingerprint};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const SUCCESS_PREFIX: &str = "Backup created at ";
const HASH_MARKER: &str = ", HASH: ";
const SKIPPED_DETAIL: &str = "No changes detected";

/// Outcome tag of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failed,
    Skipped,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::Failed => "FAILED",
            Status::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One run outcome. Only `Success` carries a fingerprint, so failed runs
/// never become the new baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEntry {
    Success {
        artifact: PathBuf,
        fingerprint: Fingerprint,
    },
    Failed {
        detail: String,
    },
    Skipped,
}

impl HistoryEntry {
    pub fn status(&self) -> Status {
        match self {
            HistoryEntry::Success { .. } => Status::Success,
            HistoryEntry::Failed { .. } => Status::Failed,
            HistoryEntry::Skipped => Status::Skipped,
        }
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        match self {
            HistoryEntry::Success { fingerprint, .. } => Some(fingerprint),
            _ => None,
        }
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryEntry::Success {
                artifact,
                fingerprint,
            } => write!(
                f,
                "{}: {}{}{}{}",
                Status::Success,
                SUCCESS_PREFIX,
                artifact.display(),
                HASH_MARKER,
                fingerprint
            ),
            HistoryEntry::Failed { detail } => write!(f, "{}: {}", Status::Failed, detail),
            HistoryEntry::Skipped => write!(f, "{}: {}", Status::Skipped, SKIPPED_DETAIL),
        }
    }
}

/// A history entry as persisted: the append timestamp plus the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub entry: HistoryEntry,
}

impl LogLine {
    pub fn new(timestamp: DateTime<Utc>, entry: HistoryEntry) -> Self {
        Self { timestamp, entry }
    }
}

/// ISO-8601 form used for log timestamps, e.g. `2026-10-19T08:15:30.123Z`.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", format_timestamp(&self.timestamp), self.entry)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseLineError {
    #[error("missing timestamp separator")]
    MissingTimestamp,

    #[error("invalid timestamp {0:?}")]
    BadTimestamp(String),

    #[error("unknown status {0:?}")]
    UnknownStatus(String),

    #[error("SUCCESS entry without HASH")]
    MissingHash,

    #[error(transparent)]
    BadHash(#[from] InvalidFingerprint),
}

impl FromStr for LogLine {
    type Err = ParseLineError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (timestamp, rest) = line
            .split_once(": ")
            .ok_or(ParseLineError::MissingTimestamp)?;
        let timestamp = DateTime::parse_from_rfc3339(timestamp.trim())
            .map_err(|_| ParseLineError::BadTimestamp(timestamp.to_string()))?
            .with_timezone(&Utc);

        let (status, detail) = match rest.split_once(": ") {
            Some((status, detail)) => (status, Some(detail)),
            None => (rest, None),
        };

        let entry = match status.trim() {
            "SUCCESS" => {
                let detail = detail.ok_or(ParseLineError::MissingHash)?;
                // Split on the last marker so artifact paths may contain it.
                let (artifact, hash) = detail
                    .rsplit_once(HASH_MARKER)
                    .ok_or(ParseLineError::MissingHash)?;
                let artifact = artifact.strip_prefix(SUCCESS_PREFIX).unwrap_or(artifact);
                HistoryEntry::Success {
                    artifact: PathBuf::from(artifact),
                    fingerprint: hash.trim().parse()?,
                }
            }
            "FAILED" => HistoryEntry::Failed {
                detail: detail.unwrap_or_default().to_string(),
            },
            "SKIPPED" => HistoryEntry::Skipped,
            other => return Err(ParseLineError::UnknownStatus(other.to_string())),
        };

        Ok(LogLine { timestamp, entry })
    }
}
