//! State store error types

use std::path::PathBuf;
use thiserror::Error;

/// State store errors
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unable to construct [{backend}] state store: {message}")]
    Construction { backend: String, message: String },

    #[error("Cluster [{cluster}] not found in state store")]
    NotFound { cluster: String },

    #[error("Stored definition for cluster [{cluster}] is corrupt: {message}")]
    Corrupt { cluster: String, message: String },

    #[error("Unable to encode definition for cluster [{cluster}]: {message}")]
    Encode { cluster: String, message: String },

    #[error("Missing git commit identity: {0}")]
    MissingIdentity(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("git command failed: {0}")]
    Git(String),

    #[error("Object storage error: {0}")]
    ObjectStorage(String),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification of a [`StateError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateErrorKind {
    InvalidArgument,
    Construction,
    NotFound,
    Corrupt,
    Remote,
    /// The backend could not complete the operation (I/O, git, network, auth)
    Backend,
}

impl StateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> StateErrorKind {
        match self {
            StateError::InvalidArgument(_) => StateErrorKind::InvalidArgument,
            StateError::Construction { .. } => StateErrorKind::Construction,
            StateError::NotFound { .. } => StateErrorKind::NotFound,
            StateError::Corrupt { .. } => StateErrorKind::Corrupt,
            StateError::Remote(_) => StateErrorKind::Remote,
            StateError::Encode { .. }
            | StateError::MissingIdentity(_)
            | StateError::Git(_)
            | StateError::ObjectStorage(_)
            | StateError::Io { .. } => StateErrorKind::Backend,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == StateErrorKind::NotFound
    }
}

pub type Result<T> = std::result::Result<T, StateError>;
