//! Git-versioned JSON state store
//!
//! The base path is a git working tree with one tracked file per cluster
//! (`<name>/cluster.json`). Every commit is recorded locally under the
//! resolved identity and then pushed to `origin`.
//!
//! A push failure after a successful local commit is reported as
//! [`StateError::Remote`]; the local commit is kept and goes out with the
//! next successful push. Non-fast-forward rejections land here too, and the
//! caller has to reload, reapply and commit again.

use crate::cluster::{ClusterDefinition, Encoding};
use crate::error::{Result, StateError};
use crate::fs::ClusterFile;
use crate::identity::{CommitIdentity, IdentityProvider};
use crate::store::{Backend, StateStore};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::sync::Arc;
use tokio::process::Command;

const REMOTE_NAME: &str = "origin";

/// git CLI wrapper bound to one working tree
#[derive(Debug, Clone)]
struct GitCli {
    repo: PathBuf,
}

impl GitCli {
    fn new(repo: PathBuf) -> Self {
        Self { repo }
    }

    /// Run a git command and return its raw output, whatever the exit status
    async fn output(&self, args: &[&str]) -> Result<Output> {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.repo);
        cmd.args(["-c", "commit.gpgsign=false"]);
        cmd.args(args);
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: git -C {} {}", self.repo.display(), args.join(" "));

        cmd.output()
            .await
            .map_err(|e| StateError::Git(format!("unable to run git: {}", e)))
    }

    /// Run a git command and return stdout, failing on a non-zero exit
    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args).await?;
        if !output.status.success() {
            return Err(StateError::Git(format!(
                "git {}: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Commit only what is staged under `path`
    ///
    /// Changes staged for other clusters stay in the index untouched.
    async fn commit(&self, identity: &CommitIdentity, message: &str, path: &str) -> Result<()> {
        let name = format!("user.name={}", identity.name);
        let email = format!("user.email={}", identity.email);
        self.run(&[
            "-c", &name, "-c", &email, "commit", "-q", "-m", message, "--", path,
        ])
        .await?;
        Ok(())
    }

    /// Whether HEAD points at a commit
    async fn has_head(&self) -> Result<bool> {
        let output = self
            .output(&["rev-parse", "--verify", "-q", "HEAD"])
            .await?;
        Ok(output.status.success())
    }

    /// Whether anything under `path` is staged relative to HEAD
    async fn has_staged_changes(&self, path: &str) -> Result<bool> {
        let output = self
            .output(&["diff", "--cached", "--quiet", "--", path])
            .await?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(StateError::Git(format!(
                "git diff --cached: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }

    async fn push(&self) -> Result<()> {
        let output = self.output(&["push", "-q", REMOTE_NAME, "HEAD"]).await?;
        if !output.status.success() {
            return Err(StateError::Remote(format!(
                "push to {} failed: {}",
                REMOTE_NAME,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// JSON state store versioned in a git repository
pub struct JsonGitStore {
    file: ClusterFile,
    git: GitCli,
    base_path: PathBuf,
    remote: String,
    identity: Arc<dyn IdentityProvider>,
}

impl JsonGitStore {
    /// Create a git store; an empty remote is rejected here
    pub fn new(
        base_path: impl Into<PathBuf>,
        cluster_name: impl Into<String>,
        remote: impl Into<String>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        let remote = remote.into();
        if remote.trim().is_empty() {
            return Err(StateError::InvalidArgument(
                "Empty GitRemote url. Must specify the link to the remote git repo".to_string(),
            ));
        }

        let base_path = base_path.into();
        Ok(Self {
            file: ClusterFile::new(base_path.clone(), cluster_name.into(), Encoding::Json),
            git: GitCli::new(base_path.clone()),
            base_path,
            remote,
            identity,
        })
    }

    pub fn path(&self) -> PathBuf {
        self.file.path()
    }

    async fn repository_exists(&self) -> Result<bool> {
        let git_dir = self.base_path.join(".git");
        tokio::fs::try_exists(&git_dir)
            .await
            .map_err(|e| StateError::io(&git_dir, e))
    }

    /// Initialize the working tree and point `origin` at the configured remote
    async fn ensure_repository(&self) -> Result<()> {
        if !self.repository_exists().await? {
            tokio::fs::create_dir_all(&self.base_path)
                .await
                .map_err(|e| StateError::io(&self.base_path, e))?;
            self.git.run(&["init", "-q"]).await?;
            tracing::debug!("Initialized git repository at {}", self.base_path.display());
        }

        let current = self.git.output(&["remote", "get-url", REMOTE_NAME]).await?;
        if !current.status.success() {
            self.git
                .run(&["remote", "add", REMOTE_NAME, &self.remote])
                .await?;
        } else if String::from_utf8_lossy(&current.stdout).trim() != self.remote {
            self.git
                .run(&["remote", "set-url", REMOTE_NAME, &self.remote])
                .await?;
        }
        Ok(())
    }

    fn relative_file(&self) -> String {
        self.file.relative_path().to_string_lossy().into_owned()
    }
}

#[async_trait]
impl StateStore for JsonGitStore {
    fn backend(&self) -> Backend {
        Backend::Git
    }

    fn cluster_name(&self) -> &str {
        self.file.cluster_name()
    }

    async fn exists(&self) -> Result<bool> {
        self.file.exists().await
    }

    async fn get_cluster(&self) -> Result<ClusterDefinition> {
        self.file.read().await
    }

    async fn commit(&self, cluster: &ClusterDefinition) -> Result<()> {
        // Resolve before touching disk so a missing identity writes nothing
        let identity = self.identity.resolve_identity().await?;
        self.ensure_repository().await?;
        self.file.write(cluster).await?;

        let relative = self.relative_file();
        self.git.run(&["add", "--", &relative]).await?;

        if self.git.has_staged_changes(&relative).await? {
            self.git
                .commit(
                    &identity,
                    &format!("Commit cluster [{}]", cluster.name),
                    &relative,
                )
                .await?;
            tracing::debug!("Committed cluster [{}]", cluster.name);
        } else {
            tracing::debug!("Cluster [{}] unchanged, nothing to commit", cluster.name);
        }

        self.git.push().await
    }

    async fn destroy(&self) -> Result<()> {
        if !self.repository_exists().await? {
            return self.file.remove().await;
        }
        self.ensure_repository().await?;

        // The index alone is not enough: an earlier attempt may have staged
        // the removal and then failed to commit or push.
        let name = self.file.cluster_name().to_string();
        let tracked = !self
            .git
            .run(&["ls-files", "--", &name])
            .await?
            .trim()
            .is_empty();
        if tracked || self.git.has_staged_changes(&name).await? {
            let identity = self.identity.resolve_identity().await?;
            if tracked {
                self.git.run(&["rm", "-r", "-q", "--", &name]).await?;
            }
            // Nothing left to record when the file was staged but never committed
            if self.git.has_staged_changes(&name).await? {
                self.git
                    .commit(&identity, &format!("Purge cluster [{}]", name), &name)
                    .await?;
                tracing::debug!("Committed purge of cluster [{}]", name);
            }
        }
        self.file.remove().await?;

        // Also delivers a purge commit whose push failed last time
        if self.git.has_head().await? {
            self.git.push().await?;
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        self.file.list().await
    }
}
