//! Archive production - runs the external archiver and records the outcome.
//!
//! Only invoked after the engine decided a backup is needed. The outcome
//! entry is appended strictly after the archiver process has settled.

pub mod archiver;
pub mod producer;

pub use archiver::{ArchiveError, Archiver, Compression, TarArchiver};
pub use producer::{artifact_name, ArchiveProducer};
