//! Custom error types for the backup trigger.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot read directory {}: {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot create destination {}: {source}", path.display())]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot append to history log {}: {source}", path.display())]
    HistoryWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TriggerError>;
