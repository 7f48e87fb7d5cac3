//! Agent Gate error types

use crate::manifest::ManifestError;
use thiserror::Error;

/// Agent Gate error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An agent with the same identifier is already registered
    #[error("Configuration conflict: {0}")]
    Conflict(String),

    /// Manifest failed validation
    #[error("Invalid manifest: {0}")]
    InvalidManifest(#[from] ManifestError),

    /// Rule condition could not be compiled
    #[error("Invalid urlRegex in rule {index}: {source}")]
    InvalidRule {
        /// Position of the rule in the manifest
        index: usize,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },

    /// Remote agent sent something outside the wire protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Identity collaborator error
    #[error("Auth error: {0}")]
    Auth(String),

    /// Agent list storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error (network failure or non-2xx status)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// True for problems fixed by editing configuration or a manifest
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::Conflict(_) | Error::InvalidManifest(_) | Error::InvalidRule { .. }
        )
    }

    /// True for failures talking to the remote agent, which may succeed on retry
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Protocol(_))
    }
}

/// Result type alias for Agent Gate operations
pub type Result<T> = std::result::Result<T, Error>;
