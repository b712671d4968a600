//! Error types for breaktime-core.
//!
//! Only `InvalidConfiguration` is ever surfaced to a caller of the scheduler.
//! Probe and persistence failures are recovered where they happen and logged.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Break threshold outside the accepted 15..=120 minute range
    #[error("Invalid break threshold: {minutes} minutes (expected 15-120)")]
    InvalidConfiguration { minutes: u32 },

    /// The activity probe could not determine idle time
    #[error("Activity probe unavailable: {0}")]
    ProbeUnavailable(String),

    /// Settings could not be read or written
    #[error("Settings persistence failed for {path}: {reason}")]
    PersistenceFailure { path: PathBuf, reason: String },

    /// IPC transport or protocol errors
    #[error("IPC error: {0}")]
    Ipc(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
