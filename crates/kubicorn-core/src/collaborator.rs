//! Collaborators the workflows delegate domain work to
//!
//! None of these touch the state store; only the workflows do.

use async_trait::async_trait;
use kubicorn_state::ClusterDefinition;
use std::path::{Path, PathBuf};

/// Runtime parameters handed to the reconciler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeParameters {
    /// Profile from `$HOME/.aws/credentials`
    pub aws_profile: Option<String>,
}

/// Translates a cluster definition into cloud operations
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Destroy the live resources described by `cluster`
    ///
    /// Returns the definition reflecting post-destroy reality. An error means
    /// the teardown did not complete; resources may be partially gone.
    async fn destroy(
        &self,
        cluster: ClusterDefinition,
        params: &RuntimeParameters,
    ) -> anyhow::Result<ClusterDefinition>;
}

/// Normalizes a loaded definition and resolves defaults
#[async_trait]
pub trait Initializer: Send + Sync {
    async fn init(&self, cluster: ClusterDefinition) -> anyhow::Result<ClusterDefinition>;
}

/// Pulls connection credentials from a live cluster into local configuration
#[async_trait]
pub trait ConfigExtractor: Send + Sync {
    /// Returns the path of the configuration file that was written
    async fn extract(
        &self,
        cluster: &ClusterDefinition,
        agent: &dyn AgentSession,
    ) -> anyhow::Result<PathBuf>;
}

/// An acquired credential-agent session
///
/// Released when dropped.
pub trait AgentSession: Send + Sync {
    /// Socket that SSH clients should use for this session
    fn socket(&self) -> &Path;
}

/// Source of credential-agent sessions
#[async_trait]
pub trait CredentialAgent: Send + Sync {
    async fn acquire(&self) -> anyhow::Result<Box<dyn AgentSession>>;
}
