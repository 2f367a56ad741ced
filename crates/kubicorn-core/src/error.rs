//! Workflow error types

use kubicorn_state::{StateError, StateErrorKind};
use thiserror::Error;

/// Workflow errors
///
/// Every variant names the cluster and the step that failed. `Commit` and
/// `Purge` are partial successes: resources were already destroyed when
/// they are returned.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unable to construct state store for cluster [{cluster}]: {source}")]
    BackendConstruction {
        cluster: String,
        #[source]
        source: StateError,
    },

    #[error("Cluster [{cluster}] not found in state store")]
    NotFound { cluster: String },

    #[error("Unable to get cluster [{cluster}]: {source}")]
    Load {
        cluster: String,
        #[source]
        source: StateError,
    },

    #[error("Unable to destroy resources for cluster [{cluster}]: {source:#}")]
    Reconcile {
        cluster: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "Unable to save state store for cluster [{cluster}]: {source}\n\
         Resources were already destroyed; the stored definition is stale until delete is rerun"
    )]
    Commit {
        cluster: String,
        #[source]
        source: StateError,
    },

    #[error(
        "Unable to remove state store for cluster [{cluster}]: {source}\n\
         Resources were destroyed and the final state was committed; rerun with --purge to retry"
    )]
    Purge {
        cluster: String,
        #[source]
        source: StateError,
    },

    #[error("Unable to acquire credential agent: {source:#}")]
    Agent {
        #[source]
        source: anyhow::Error,
    },

    #[error("Unable to initialize cluster [{cluster}]: {source:#}")]
    Init {
        cluster: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unable to extract kubeconfig for cluster [{cluster}]: {source:#}")]
    Extract {
        cluster: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Failure category reported by a workflow
///
/// Push rejections are a store failure, not a workflow step: they surface as
/// [`StateErrorKind::Remote`] through [`WorkflowError::store_kind`] under the
/// `Commit` or `Purge` step that hit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    BackendConstruction,
    NotFound,
    Corrupt,
    Load,
    Reconcile,
    Commit,
    Purge,
    Init,
    Extract,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "invalid-argument"),
            ErrorKind::BackendConstruction => write!(f, "backend-construction"),
            ErrorKind::NotFound => write!(f, "not-found"),
            ErrorKind::Corrupt => write!(f, "corrupt"),
            ErrorKind::Load => write!(f, "load"),
            ErrorKind::Reconcile => write!(f, "reconcile"),
            ErrorKind::Commit => write!(f, "commit"),
            ErrorKind::Purge => write!(f, "purge"),
            ErrorKind::Init => write!(f, "init"),
            ErrorKind::Extract => write!(f, "extract"),
        }
    }
}

impl WorkflowError {
    /// Map a factory failure onto the workflow taxonomy
    pub(crate) fn construction(cluster: &str, source: StateError) -> Self {
        match source {
            StateError::InvalidArgument(message) => WorkflowError::InvalidArgument(message),
            source => WorkflowError::BackendConstruction {
                cluster: cluster.to_string(),
                source,
            },
        }
    }

    /// Map a load failure; undecodable snapshots keep their own kind
    pub(crate) fn load(cluster: &str, source: StateError) -> Self {
        WorkflowError::Load {
            cluster: cluster.to_string(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            WorkflowError::BackendConstruction { .. } => ErrorKind::BackendConstruction,
            WorkflowError::NotFound { .. } => ErrorKind::NotFound,
            WorkflowError::Load { source, .. } => match source.kind() {
                StateErrorKind::Corrupt => ErrorKind::Corrupt,
                _ => ErrorKind::Load,
            },
            WorkflowError::Reconcile { .. } => ErrorKind::Reconcile,
            WorkflowError::Commit { .. } => ErrorKind::Commit,
            WorkflowError::Purge { .. } => ErrorKind::Purge,
            WorkflowError::Init { .. } => ErrorKind::Init,
            WorkflowError::Agent { .. } | WorkflowError::Extract { .. } => ErrorKind::Extract,
        }
    }

    /// Kind of the underlying store failure, when there is one
    ///
    /// A git push failure during commit reports `Commit` from [`kind`] and
    /// `Remote` from here.
    ///
    /// [`kind`]: WorkflowError::kind
    pub fn store_kind(&self) -> Option<StateErrorKind> {
        match self {
            WorkflowError::BackendConstruction { source, .. }
            | WorkflowError::Load { source, .. }
            | WorkflowError::Commit { source, .. }
            | WorkflowError::Purge { source, .. } => Some(source.kind()),
            _ => None,
        }
    }

    /// Whether an irreversible side effect happened before the failure
    pub fn is_partial_success(&self) -> bool {
        matches!(self.kind(), ErrorKind::Commit | ErrorKind::Purge)
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
