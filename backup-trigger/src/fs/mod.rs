//! File system helpers for the backup trigger.

pub mod fingerprint;

pub use fingerprint::{compute_fingerprint, Fingerprint};
