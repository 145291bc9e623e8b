//! Error types for MIRAGE replication

use thiserror::Error;

/// Core MIRAGE errors
///
/// Only construction and decoding are fallible. Anything that can go wrong
/// while ticking (starvation, stale or duplicated snapshots, overflow) is
/// absorbed by the playback layer instead of being reported here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MirageError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Wire errors
    #[error("Invalid wire format: {0}")]
    InvalidWireFormat(String),

    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },
}

impl MirageError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        MirageError::InvalidConfig(msg.into())
    }
}

/// Result type for MIRAGE operations
pub type MirageResult<T> = Result<T, MirageError>;
