//! Commit identity resolution for the git backend

use crate::error::{Result, StateError};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Author/committer identity recorded on git commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

impl CommitIdentity {
    /// Build an identity, rejecting blank fields
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        let name = name.into().trim().to_string();
        let email = email.into().trim().to_string();
        if name.is_empty() {
            return Err(StateError::MissingIdentity("user.name is empty".to_string()));
        }
        if email.is_empty() {
            return Err(StateError::MissingIdentity("user.email is empty".to_string()));
        }
        Ok(Self { name, email })
    }
}

/// Resolves the identity used for git commits
///
/// Called at commit time, not at construction, so a store can be built and
/// read without an identity configured.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve_identity(&self) -> Result<CommitIdentity>;
}

/// Reads `user.name` and `user.email` from the caller's git configuration
#[derive(Debug, Clone, Default)]
pub struct GitConfigIdentity;

impl GitConfigIdentity {
    pub fn new() -> Self {
        Self
    }

    async fn get(&self, key: &str) -> Result<String> {
        let output = Command::new("git")
            .args(["config", "--get", key])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| StateError::MissingIdentity(format!("unable to run git: {}", e)))?;

        if !output.status.success() {
            return Err(StateError::MissingIdentity(format!(
                "{} is not set in git config",
                key
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl IdentityProvider for GitConfigIdentity {
    async fn resolve_identity(&self) -> Result<CommitIdentity> {
        let name = self.get("user.name").await?;
        let email = self.get("user.email").await?;
        CommitIdentity::new(name, email)
    }
}

/// Fixed identity, for callers that already know who is committing
#[derive(Debug, Clone)]
pub struct StaticIdentity(CommitIdentity);

impl StaticIdentity {
    pub fn new(identity: CommitIdentity) -> Self {
        Self(identity)
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn resolve_identity(&self) -> Result<CommitIdentity> {
        Ok(self.0.clone())
    }
}
