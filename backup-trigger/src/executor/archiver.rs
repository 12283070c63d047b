//! External archiver invocation.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Why an archive attempt did not produce an artifact. Recorded as a
/// FAILED history entry, never propagated as a fatal error.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("archiver exited with {status}{detail}")]
    Exit { status: ExitStatus, detail: String },

    #[error("archiver timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

/// Compression applied by the archiver (gzip, zstd, none)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Gzip,
    Zstd,
    None,
}

impl Compression {
    /// tar flags that create an archive written to the following `-f` operand
    fn tar_flags(&self) -> &'static [&'static str] {
        match self {
            Compression::Gzip => &["-czf"],
            Compression::Zstd => &["--zstd", "-cf"],
            Compression::None => &["-cf"],
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Compression::Gzip => "tar.gz",
            Compression::Zstd => "tar.zst",
            Compression::None => "tar",
        }
    }
}

/// Something that can write the full tree under `source` into `artifact`.
pub trait Archiver {
    /// File extension of produced artifacts, without the leading dot.
    fn extension(&self) -> &str;

    fn archive(
        &self,
        source: &Path,
        artifact: &Path,
    ) -> impl Future<Output = Result<(), ArchiveError>> + Send;
}

/// Runs `tar` (or a compatible program) as a child process:
/// `<program> <flags> <artifact> -C <source> .`
#[derive(Debug, Clone)]
pub struct TarArchiver {
    program: String,
    compression: Compression,
}

impl TarArchiver {
    pub fn new(program: impl Into<String>, compression: Compression) -> Self {
        Self {
            program: program.into(),
            compression,
        }
    }

    fn command(&self, source: &Path, artifact: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.compression.tar_flags())
            .arg(artifact)
            .arg("-C")
            .arg(source)
            .arg(".")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for TarArchiver {
    fn default() -> Self {
        Self::new("tar", Compression::default())
    }
}

impl Archiver for TarArchiver {
    fn extension(&self) -> &str {
        self.compression.extension()
    }

    async fn archive(&self, source: &Path, artifact: &Path) -> Result<(), ArchiveError> {
        debug!(
            "Running {} for {} -> {}",
            self.program,
            source.display(),
            artifact.display()
        );

        let output = self
            .command(source, artifact)
            .output()
            .await
            .map_err(|source| ArchiveError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|line| format!(": {}", line))
            .unwrap_or_default();

        Err(ArchiveError::Exit {
            status: output.status,
            detail,
        })
    }
}
