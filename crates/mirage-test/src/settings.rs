//! Loading replication settings for harness runs

use std::fs;
use std::path::Path;

use mirage_core::{MirageError, ReplicaConfig, ReplicationSettings};
use thiserror::Error;

/// Errors raised while preparing a harness run
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error(transparent)]
    Mirage(#[from] MirageError),

    #[error("Usage: {0}")]
    Usage(String),
}

pub type HarnessResult<T> = Result<T, HarnessError>;

/// Parse and validate JSON settings; missing fields take their defaults
pub fn parse_settings(json: &str) -> HarnessResult<ReplicaConfig> {
    let settings: ReplicationSettings = serde_json::from_str(json)?;
    Ok(settings.validate()?)
}

/// Read settings from a JSON file
pub fn load_settings(path: impl AsRef<Path>) -> HarnessResult<ReplicaConfig> {
    let json = fs::read_to_string(path)?;
    parse_settings(&json)
}
