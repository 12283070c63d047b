//! Backup Trigger Library
//!
//! Archives a directory only when its top-level entries changed since the
//! last successful backup, recording every run in an append-only log.

pub mod config;
pub mod engine;
pub mod executor;
pub mod fs;
pub mod history;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use engine::{decide, BackupEngine, Decision, RunOutcome};
pub use fs::Fingerprint;
pub use history::{HistoryEntry, HistoryStore};
pub use utils::{Result, TriggerError};
