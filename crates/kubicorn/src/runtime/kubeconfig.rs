//! Kubeconfig extraction over SSH
//!
//! The remote `~/.kube/config` is merged into the local file: `clusters`,
//! `contexts` and `users` entries replace local entries of the same name and
//! `current-context` follows the remote. The local file is replaced with a
//! rename, so a failed run leaves it as it was.

use anyhow::{Context, bail};
use async_trait::async_trait;
use kubicorn_core::{AgentSession, ConfigExtractor};
use kubicorn_state::ClusterDefinition;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

const MERGED_SECTIONS: [&str; 3] = ["clusters", "contexts", "users"];

pub struct KubeconfigExtractor {
    path: PathBuf,
    ssh: String,
}

impl KubeconfigExtractor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ssh: "ssh".to_string(),
        }
    }

    pub fn with_ssh(mut self, program: impl Into<String>) -> Self {
        self.ssh = program.into();
        self
    }

    /// Read the kubeconfig from the cluster's API host
    async fn fetch(
        &self,
        cluster: &ClusterDefinition,
        agent: &dyn AgentSession,
    ) -> anyhow::Result<String> {
        let host = cluster
            .spec_value::<String>("/kubernetesApi/endpoint")
            .filter(|host| !host.trim().is_empty())
            .with_context(|| format!("cluster [{}] has no kubernetes API endpoint", cluster.name))?;
        let user = cluster
            .spec_value::<String>("/ssh/user")
            .unwrap_or_else(|| "root".to_string());
        let port = cluster.spec_value::<u16>("/ssh/port").unwrap_or(22);

        let mut cmd = Command::new(&self.ssh);
        cmd.args(["-o", "StrictHostKeyChecking=no", "-o", "BatchMode=yes"]);
        cmd.arg("-p").arg(port.to_string());
        if let Some(key) = cluster.spec_value::<String>("/ssh/privateKeyPath") {
            cmd.arg("-i").arg(key);
        }
        cmd.arg(format!("{}@{}", user, host));
        cmd.arg("cat ~/.kube/config");
        cmd.env("SSH_AUTH_SOCK", agent.socket());
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} {}@{} cat ~/.kube/config", self.ssh, user, host);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("unable to run {}", self.ssh))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn load_local(&self) -> anyhow::Result<Option<Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => serde_yaml::from_str(&content)
                .map(Some)
                .with_context(|| format!("unable to parse {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("unable to read {}", self.path.display())),
        }
    }

    /// Merge `remote` into the local kubeconfig and replace the file
    async fn install(&self, remote: &str) -> anyhow::Result<()> {
        let remote: Value =
            serde_yaml::from_str(remote).context("remote kubeconfig is not valid YAML")?;
        let merged = merge(self.load_local().await?, remote)?;
        let content = serde_yaml::to_string(&merged)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("unable to create {}", parent.display()))?;
        }
        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, content)
            .await
            .with_context(|| format!("unable to write {}", tmp.display()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("unable to replace {}", self.path.display()));
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigExtractor for KubeconfigExtractor {
    async fn extract(
        &self,
        cluster: &ClusterDefinition,
        agent: &dyn AgentSession,
    ) -> anyhow::Result<PathBuf> {
        let remote = self.fetch(cluster, agent).await?;
        self.install(&remote).await?;
        tracing::info!("Wrote kubeconfig to {}", self.path.display());
        Ok(self.path.clone())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

fn empty_config() -> Value {
    let mut config = Mapping::new();
    config.insert("apiVersion".into(), "v1".into());
    config.insert("kind".into(), "Config".into());
    for section in MERGED_SECTIONS {
        config.insert(section.into(), Value::Sequence(Vec::new()));
    }
    Value::Mapping(config)
}

fn merge(local: Option<Value>, remote: Value) -> anyhow::Result<Value> {
    let Value::Mapping(mut merged) = local.unwrap_or_else(empty_config) else {
        bail!("local kubeconfig is not a mapping");
    };
    let Value::Mapping(remote) = remote else {
        bail!("remote kubeconfig is not a mapping");
    };

    for section in MERGED_SECTIONS {
        let incoming = remote
            .get(section)
            .and_then(Value::as_sequence)
            .cloned()
            .unwrap_or_default();

        let entries = merged
            .entry(section.into())
            .or_insert_with(|| Value::Sequence(Vec::new()));
        if !entries.is_sequence() {
            *entries = Value::Sequence(Vec::new());
        }
        if let Value::Sequence(list) = entries {
            for item in incoming {
                let existing = item
                    .get("name")
                    .and_then(|name| list.iter().position(|e| e.get("name") == Some(name)));
                match existing {
                    Some(index) => list[index] = item,
                    None => list.push(item),
                }
            }
        }
    }

    if let Some(context) = remote.get("current-context") {
        merged.insert("current-context".into(), context.clone());
    }

    Ok(Value::Mapping(merged))
}
