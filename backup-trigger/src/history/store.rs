//! File-backed history store.
//!
//! Lines are only ever appended. Nothing in this module truncates, rewrites
//! or rotates the log.

use super::entry::{HistoryEntry, LogLine};
use crate::fs::fingerprint::Fingerprint;
use crate::utils::errors::{Result, TriggerError};
use chrono::Utc;
use std::io;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Append-only history log at an explicit path.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Fingerprint carried by the most recent SUCCESS entry.
    ///
    /// Returns `None` when the log does not exist, holds no SUCCESS entry,
    /// or cannot be read. An unreadable log is reported and otherwise treated
    /// as "no prior backup" so the caller takes a fresh one. Lines that do
    /// not parse, including ones with invalid UTF-8, are skipped.
    pub async fn read_last_fingerprint(&self) -> Option<Fingerprint> {
        let content = match self.read_lossy().await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No history log at {}", self.path.display());
                return None;
            }
            Err(e) => {
                warn!(
                    "History log {} is unreadable, assuming no prior backup: {}",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        let lines: Vec<&str> = content.lines().collect();
        for (idx, line) in lines.iter().enumerate().rev() {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<LogLine>() {
                Ok(parsed) => {
                    if let Some(fingerprint) = parsed.entry.fingerprint() {
                        return Some(fingerprint.clone());
                    }
                }
                Err(e) => {
                    warn!(
                        "Ignoring malformed history line {} in {}: {}",
                        idx + 1,
                        self.path.display(),
                        e
                    );
                }
            }
        }

        None
    }

    /// Every parseable entry in file order. A missing log yields no entries.
    pub async fn entries(&self) -> io::Result<Vec<LogLine>> {
        let content = match self.read_lossy().await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| line.parse().ok())
            .collect())
    }

    /// Append one newline-terminated entry stamped with the current time.
    ///
    /// Creates the log file, and any missing parent directories, on first use.
    pub async fn append(&self, entry: &HistoryEntry) -> Result<LogLine> {
        let line = LogLine::new(Utc::now(), entry.clone());

        self.write_line(&line)
            .await
            .map_err(|source| TriggerError::HistoryWrite {
                path: self.path.clone(),
                source,
            })?;

        debug!("Appended to {}: {}", self.path.display(), line);
        Ok(line)
    }

    /// Invalid UTF-8 only spoils the lines it occurs on.
    async fn read_lossy(&self) -> io::Result<String> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn write_line(&self, line: &LogLine) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", line).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HASH_A: &str = "2d076fe37a4902fb2cfdfe13d2e4a3f8483f4535c353dbf3d05b76be3b501fe3";
    const HASH_B: &str = "fd316f73f4bc03f2fd02c3962f73c43353c64723828e78b5ce38170efd83429a";

    fn success(path: &str, hash: &str) -> HistoryEntry {
        HistoryEntry::Success {
            artifact: PathBuf::from(path),
            fingerprint: hash.parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_missing_log_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::new(temp_dir.path().join("backup_log.txt"));
        assert_eq!(store.read_last_fingerprint().await, None);
        assert!(store.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_log_without_hash_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::new(temp_dir.path().join("backup_log.txt"));

        store.append(&HistoryEntry::Skipped).await.unwrap();
        store
            .append(&HistoryEntry::Failed {
                detail: "tar command failed".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(store.read_last_fingerprint().await, None);
    }

    #[tokio::test]
    async fn test_latest_success_wins_over_later_entries() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::new(temp_dir.path().join("backup_log.txt"));

        store.append(&success("/b/1.tar.gz", HASH_A)).await.unwrap();
        store.append(&success("/b/2.tar.gz", HASH_B)).await.unwrap();
        store.append(&HistoryEntry::Skipped).await.unwrap();
        store
            .append(&HistoryEntry::Failed {
                detail: "boom".to_string(),
            })
            .await
            .unwrap();

        let last = store.read_last_fingerprint().await.unwrap();
        assert_eq!(last.as_str(), HASH_B);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("backup_log.txt");
        fs::write(
            &path,
            format!(
                "2024-01-01T00:00:00.000Z: SUCCESS: Backup created at /b/1.tar.gz, HASH: {}\n\
                 this line was not written by us\n\
                 \n\
                 2024-01-02T00:00:00.000Z: SUCCESS: Backup created at /b/2.tar.gz, HASH: nothex\n",
                HASH_A
            ),
        )
        .unwrap();

        let store = HistoryStore::new(&path);
        let last = store.read_last_fingerprint().await.unwrap();
        assert_eq!(last.as_str(), HASH_A);
        assert_eq!(store.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_keeps_older_success() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("backup_log.txt");

        let store = HistoryStore::new(&path);
        store.append(&success("/b/1.tar.gz", HASH_A)).await.unwrap();

        let mut content = fs::read(&path).unwrap();
        content.extend_from_slice(b"\xff\xfe garbage\n");
        fs::write(&path, content).unwrap();
        store.append(&HistoryEntry::Skipped).await.unwrap();

        assert_eq!(store.read_last_fingerprint().await.unwrap().as_str(), HASH_A);
        assert_eq!(store.entries().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_binary_log_degrades_to_absent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("backup_log.txt");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let store = HistoryStore::new(&path);
        assert_eq!(store.read_last_fingerprint().await, None);
    }

    #[tokio::test]
    async fn test_log_path_is_directory_degrades_to_absent() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::new(temp_dir.path());
        assert_eq!(store.read_last_fingerprint().await, None);
    }

    #[tokio::test]
    async fn test_append_preserves_existing_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("backup_log.txt");
        fs::write(&path, "legacy line\n").unwrap();

        let store = HistoryStore::new(&path);
        let written = store.append(&HistoryEntry::Skipped).await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("legacy line\n{}\n", written));
        assert!(content.ends_with(": SKIPPED: No changes detected\n"));
    }

    #[tokio::test]
    async fn test_append_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs/nested/backup_log.txt");

        let store = HistoryStore::new(&path);
        store.append(&success("/b/1.tar.gz", HASH_A)).await.unwrap();

        assert!(path.exists());
        assert_eq!(store.read_last_fingerprint().await.unwrap().as_str(), HASH_A);
    }

    #[tokio::test]
    async fn test_append_to_unwritable_path_fails() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"a file, not a directory").unwrap();

        let store = HistoryStore::new(blocker.join("backup_log.txt"));
        let err = store.append(&HistoryEntry::Skipped).await.unwrap_err();
        assert!(matches!(err, TriggerError::HistoryWrite { .. }));
    }

    #[tokio::test]
    async fn test_entries_round_trip_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::new(temp_dir.path().join("backup_log.txt"));

        let first = store.append(&success("/b/1.tar.gz", HASH_A)).await.unwrap();
        let second = store.append(&HistoryEntry::Skipped).await.unwrap();

        let entries = store.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry, first.entry);
        assert_eq!(entries[1].entry, second.entry);
    }
}
