//! Turns a "backup" decision into an artifact and a history entry.

use super::archiver::{ArchiveError, Archiver};
use crate::engine::RunOutcome;
use crate::fs::fingerprint::Fingerprint;
use crate::history::entry::format_timestamp;
use crate::history::{HistoryEntry, HistoryStore};
use crate::utils::errors::{Result, TriggerError};
use chrono::{DateTime, Utc};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

/// Artifact file name for a run started at `timestamp`.
///
/// Colons and periods are replaced with hyphens, e.g.
/// `backup-2026-10-19T08-15-30-123Z.tar.gz`. Two runs within the same
/// millisecond get the same name.
pub fn artifact_name(timestamp: &DateTime<Utc>, extension: &str) -> String {
    let stamp = format_timestamp(timestamp).replace([':', '.'], "-");
    format!("backup-{}.{}", stamp, extension)
}

fn has_line_break(path: &Path) -> bool {
    path.to_string_lossy().chars().any(|c| c == '\r' || c == '\n')
}

pub struct ArchiveProducer<A> {
    archiver: A,
    timeout: Option<Duration>,
}

impl<A: Archiver> ArchiveProducer<A> {
    pub fn new(archiver: A) -> Self {
        Self {
            archiver,
            timeout: None,
        }
    }

    /// Kill the archiver and record a failure if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Archive `source` into a new timestamped file under `destination` and
    /// append the outcome to `history`.
    ///
    /// # Errors
    /// * `TriggerError::DestinationUnwritable` - `destination` could not be
    ///   created. Nothing is run and nothing is logged.
    /// * `TriggerError::HistoryWrite` - the outcome could not be recorded.
    ///
    /// An archiver failure is not an error here: it is recorded as a FAILED
    /// entry without a fingerprint and returned as `RunOutcome::Failed`.
    pub async fn produce(
        &self,
        history: &HistoryStore,
        source: &Path,
        destination: &Path,
        fingerprint: Fingerprint,
    ) -> Result<RunOutcome> {
        // The artifact path is written into a single history line.
        if has_line_break(destination) {
            return Err(TriggerError::DestinationUnwritable {
                path: destination.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "path contains a line break"),
            });
        }

        tokio::fs::create_dir_all(destination)
            .await
            .map_err(|source| TriggerError::DestinationUnwritable {
                path: destination.to_path_buf(),
                source,
            })?;

        let artifact = destination.join(artifact_name(&Utc::now(), self.archiver.extension()));
        info!(
            "Archiving {} into {}",
            source.display(),
            artifact.display()
        );

        match self.run_archiver(source, &artifact).await {
            Ok(()) => {
                history
                    .append(&HistoryEntry::Success {
                        artifact: artifact.clone(),
                        fingerprint,
                    })
                    .await?;
                info!("Backup created at {}", artifact.display());
                Ok(RunOutcome::Succeeded { artifact })
            }
            Err(e) => {
                // History entries are single lines.
                let detail = e.to_string().replace(['\r', '\n'], " ");
                error!("Backup of {} failed: {}", source.display(), detail);
                history
                    .append(&HistoryEntry::Failed {
                        detail: detail.clone(),
                    })
                    .await?;
                Ok(RunOutcome::Failed { detail })
            }
        }
    }

    async fn run_archiver(
        &self,
        source: &Path,
        artifact: &Path,
    ) -> std::result::Result<(), ArchiveError> {
        match self.timeout {
            Some(limit) => {
                // Dropping the archive future drops (and kills) the child.
                let attempt = self.archiver.archive(source, artifact);
                match tokio::time::timeout(limit, attempt).await {
                    Ok(result) => result,
                    Err(_) => Err(ArchiveError::TimedOut(limit)),
                }
            }
            None => self.archiver.archive(source, artifact).await,
        }
    }
}
