//! Utility modules for the backup trigger.

pub mod errors;
pub mod logger;

pub use errors::{Result, TriggerError};
