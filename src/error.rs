//! Error types for each pipeline stage.
//!
//! Per-item errors (`FetchError`, `CheckError`) never leave a tick; they are
//! converted into outcomes by the stage that produced them. Only
//! `ConfigError` aborts a tick.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure to obtain performances from one theater source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} uses unsupported content encoding '{encoding}'")]
    UnsupportedEncoding { url: String, encoding: String },

    #[error("could not decode response body from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network { .. } | FetchError::Timeout { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::InvalidUrl { .. }
            | FetchError::UnsupportedEncoding { .. }
            | FetchError::Decode { .. } => false,
        }
    }
}

/// Failure while rendering or inspecting a ticket page.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("performance has no ticket URL")]
    NoTicketUrl,

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("rendering {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("browser unavailable: {0}")]
    Browser(String),

    #[error("tick budget exhausted before check started")]
    BudgetExhausted,
}

impl CheckError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckError::Navigation { .. } | CheckError::Timeout { .. }
        )
    }
}

/// Failure to read or write the persisted monitor state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("could not serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("state I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure reported by a notifier; the batch is not committed.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),

    #[error("notification rejected: HTTP {0}")]
    Rejected(u16),
}

/// Configuration problems. These are the only errors that abort a tick.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no theater sources configured")]
    NoSources,

    #[error("no target titles configured")]
    NoTitles,

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
