//! Error types for the configuration stores

use std::path::PathBuf;
use thiserror::Error;

/// Error type for store operations
#[derive(Debug, Error)]
pub enum Error {
    /// Named host block is not present in the reservation file
    #[error("host not found: {0}")]
    NotFound(String),

    /// A host block with this name already exists
    #[error("host already exists: {0}")]
    AlreadyExists(String),

    /// Host name is not a single token
    #[error("invalid host name: {0:?}")]
    InvalidName(String),

    /// Interface name is empty or would break the quoted list
    #[error("invalid interface name: {0:?}")]
    InvalidInterface(String),

    /// Address family other than v4/v6
    #[error("invalid interface type: {0}, must be v4 or v6")]
    InvalidFamily(String),

    /// Backing file could not be read or written
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io { .. })
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;
