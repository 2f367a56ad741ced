pub mod fake_s3;

use async_trait::async_trait;
use kubicorn_state::{
    ClusterDefinition, CommitIdentity, IdentityProvider, StateError, StaticIdentity,
};
use serde_json::json;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

pub fn identity() -> Arc<dyn IdentityProvider> {
    Arc::new(StaticIdentity::new(
        CommitIdentity::new("Kubicorn Test", "test@kubicorn.io").unwrap(),
    ))
}

#[allow(dead_code)]
pub struct NoIdentity;

#[async_trait]
impl IdentityProvider for NoIdentity {
    async fn resolve_identity(&self) -> kubicorn_state::Result<CommitIdentity> {
        Err(StateError::MissingIdentity("user.name is not set in git config".to_string()))
    }
}

/// Create a bare repository usable as a push target
#[allow(dead_code)]
pub fn init_bare_remote(path: &Path) {
    let status = Command::new("git")
        .args(["init", "--bare", "-q"])
        .arg(path)
        .status()
        .unwrap();
    assert!(status.success());
}

/// Number of commits reachable from any ref in `git_dir`
#[allow(dead_code)]
pub fn commit_count(git_dir: &Path) -> usize {
    let output = Command::new("git")
        .arg("--git-dir")
        .arg(git_dir)
        .args(["log", "--oneline", "--all"])
        .output()
        .unwrap();
    String::from_utf8_lossy(&output.stdout).lines().count()
}

/// Paths in the tree of HEAD in `git_dir`
#[allow(dead_code)]
pub fn head_files(git_dir: &Path) -> Vec<String> {
    let output = Command::new("git")
        .arg("--git-dir")
        .arg(git_dir)
        .args(["ls-tree", "-r", "--name-only", "HEAD"])
        .output()
        .unwrap();
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

/// Install a pre-commit hook that rejects every commit
#[cfg(unix)]
#[allow(dead_code)]
pub fn reject_commits(repo: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let hook = repo.join(".git").join("hooks").join("pre-commit");
    std::fs::create_dir_all(hook.parent().unwrap()).unwrap();
    std::fs::write(&hook, "#!/bin/sh\necho 'commits are frozen' >&2\nexit 1\n").unwrap();
    std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
#[allow(dead_code)]
pub fn allow_commits(repo: &Path) {
    std::fs::remove_file(repo.join(".git").join("hooks").join("pre-commit")).unwrap();
}

pub fn sample_cluster(name: &str) -> ClusterDefinition {
    ClusterDefinition::new(name)
        .with_cloud("aws")
        .with_spec("ssh", json!({ "user": "ubuntu", "port": 22 }))
        .with_spec(
            "serverPools",
            json!([
                { "name": "master", "count": 1, "size": "t2.medium" },
                { "name": "node", "count": 3, "size": "t2.large" }
            ]),
        )
        .with_spec("kubernetesApi", json!({ "endpoint": "203.0.113.10", "port": "443" }))
}
