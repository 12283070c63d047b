//! Change detection and the skip/backup decision.
//!
//! One invocation performs at most one fingerprint computation, one history
//! read and one archive attempt, in that order.

use crate::config::Config;
use crate::executor::{ArchiveProducer, Archiver, TarArchiver};
use crate::fs::fingerprint::{compute_fingerprint, Fingerprint};
use crate::history::{HistoryEntry, HistoryStore};
use crate::utils::errors::Result;
use std::path::PathBuf;
use tracing::info;

/// What to do with a freshly computed fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Skip,
    Backup,
}

/// Skip only when the new fingerprint equals the last recorded one. No
/// recorded fingerprint always means backup.
pub fn decide(new: &Fingerprint, last: Option<&Fingerprint>) -> Decision {
    if last == Some(new) {
        Decision::Skip
    } else {
        Decision::Backup
    }
}

/// Terminal outcome of a run that was not aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Skipped,
    Succeeded { artifact: PathBuf },
    Failed { detail: String },
}

impl RunOutcome {
    /// The single human-readable console line for this outcome.
    pub fn status_line(&self) -> String {
        match self {
            RunOutcome::Skipped => "No changes detected. Skipping backup.".to_string(),
            RunOutcome::Succeeded { artifact } => {
                format!("Backup successful: {}", artifact.display())
            }
            RunOutcome::Failed { detail } => format!("Backup failed: {}", detail),
        }
    }
}

pub struct BackupEngine<A> {
    source: PathBuf,
    destination: PathBuf,
    history: HistoryStore,
    producer: ArchiveProducer<A>,
}

impl BackupEngine<TarArchiver> {
    /// Engine wired to the external archiver and log file named in `config`.
    pub fn from_config(config: &Config, source: PathBuf, destination: PathBuf) -> Self {
        let archiver = TarArchiver::new(config.archive.program.clone(), config.archive.compression);
        let producer = ArchiveProducer::new(archiver).with_timeout(config.archive.timeout());
        Self::new(
            source,
            destination,
            HistoryStore::new(config.history.log_file.clone()),
            producer,
        )
    }
}

impl<A: Archiver> BackupEngine<A> {
    pub fn new(
        source: PathBuf,
        destination: PathBuf,
        history: HistoryStore,
        producer: ArchiveProducer<A>,
    ) -> Self {
        Self {
            source,
            destination,
            history,
            producer,
        }
    }

    /// Run one backup cycle.
    ///
    /// # Errors
    /// Fatal conditions only: unreadable source, uncreatable destination, or
    /// a history log that cannot be appended to. Archiver failures are
    /// recorded and returned as `RunOutcome::Failed`.
    pub async fn run(&self) -> Result<RunOutcome> {
        let fingerprint = compute_fingerprint(&self.source)?;
        let last = self.history.read_last_fingerprint().await;

        info!(
            "Fingerprint of {}: {} (last recorded: {})",
            self.source.display(),
            fingerprint,
            last.as_ref().map(Fingerprint::as_str).unwrap_or("none")
        );

        match decide(&fingerprint, last.as_ref()) {
            Decision::Skip => {
                self.history.append(&HistoryEntry::Skipped).await?;
                info!("No changes in {}, skipping backup", self.source.display());
                Ok(RunOutcome::Skipped)
            }
            Decision::Backup => {
                self.producer
                    .produce(&self.history, &self.source, &self.destination, fingerprint)
                    .await
            }
        }
    }
}
