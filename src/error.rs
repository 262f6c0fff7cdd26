//! Error types for configuration, data loading and input dispatch

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Invalid or unreadable configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot parse {key}={value:?}: {reason}")]
    Parse {
        key: String,
        value: String,
        reason: String,
    },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("cannot read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("malformed config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unknown preset '{0}' (expected fast, slow, web or desktop)")]
    UnknownPreset(String),
}

/// Missing, empty or unreadable input table. Fatal before any input is sent.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("empty file: {}", .0.display())]
    Empty(PathBuf),
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("unknown encoding '{0}'")]
    UnknownEncoding(String),
    #[error("file is not valid {encoding}")]
    Decode { encoding: &'static str },
}

/// Failure reported by the synthetic input backend
#[derive(Debug, Error)]
#[error("{0}")]
pub struct InputError(pub String);

/// What raised an abort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortKind {
    /// Pointer parked in the reserved screen corner
    Failsafe,
    /// Ctrl+C from the operator
    Interrupt,
}

impl fmt::Display for AbortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortKind::Failsafe => write!(f, "failsafe triggered"),
            AbortKind::Interrupt => write!(f, "interrupted by user"),
        }
    }
}

/// Failure of a single sequencer action
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("aborted: {0}")]
    Abort(AbortKind),
    #[error("input dispatch failed: {0}")]
    Dispatch(#[from] InputError),
    #[error("{action} method '{method}' is not supported")]
    Unsupported {
        action: &'static str,
        method: &'static str,
    },
}

impl ActionError {
    pub fn abort_kind(&self) -> Option<AbortKind> {
        match self {
            ActionError::Abort(kind) => Some(*kind),
            _ => None,
        }
    }
}
