//! Directory fingerprinting.
//!
//! A fingerprint only covers the names of a directory's immediate entries:
//! files and subdirectories, not recursive, not content-based. Renaming,
//! adding or removing a top-level entry changes it; editing a file in place
//! does not.

use crate::utils::errors::{Result, TriggerError};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;
use walkdir::WalkDir;

/// Length of a rendered fingerprint (SHA-256 as lowercase hex).
pub const FINGERPRINT_LEN: usize = 64;

/// Separator placed between sorted entry names before hashing.
const NAME_SEPARATOR: &str = ",";

/// Hex-encoded SHA-256 digest of a directory's sorted top-level entry names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a set of entry names. Order of `names` does not matter.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort_unstable();

        let mut hasher = Sha256::new();
        hasher.update(names.join(NAME_SEPARATOR).as_bytes());
        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when a string is not a 64-character lowercase hex digest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid fingerprint: {0:?}")]
pub struct InvalidFingerprint(pub String);

impl FromStr for Fingerprint {
    type Err = InvalidFingerprint;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let valid = s.len() == FINGERPRINT_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Fingerprint(s.to_string()))
        } else {
            Err(InvalidFingerprint(s.to_string()))
        }
    }
}

/// List the immediate entry names of `dir`.
fn list_entry_names(dir: &Path) -> io::Result<Vec<String>> {
    let metadata = std::fs::metadata(dir)?;
    if !metadata.is_dir() {
        return Err(io::Error::other("not a directory"));
    }

    let mut names = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false);

    for entry in walker {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    Ok(names)
}

/// Compute the fingerprint of a directory's top-level entries.
///
/// # Errors
/// * `TriggerError::DirectoryUnreadable` - the directory is missing, is not a
///   directory, or cannot be listed. There is no partial fingerprint.
pub fn compute_fingerprint(dir: &Path) -> Result<Fingerprint> {
    let names = list_entry_names(dir).map_err(|source| TriggerError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    tracing::debug!("Fingerprinting {} ({} entries)", dir.display(), names.len());

    Ok(Fingerprint::from_names(names))
}
