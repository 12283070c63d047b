//! Append-only backup history.
//!
//! The history log is both the audit trail and the only persistent state:
//! the last known fingerprint is whatever the newest SUCCESS line carries.

pub mod entry;
pub mod store;

pub use entry::{HistoryEntry, LogLine, ParseLineError, Status};
pub use store::HistoryStore;
