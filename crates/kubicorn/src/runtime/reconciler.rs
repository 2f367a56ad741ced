//! Provider plugin reconciler
//!
//! Cloud work is done by an external `kubicorn-<cloud>` executable. The
//! definition is written to its stdin as JSON and the post-destroy definition
//! is read back from its stdout.

use anyhow::{Context, bail};
use async_trait::async_trait;
use kubicorn_core::{Reconciler, RuntimeParameters};
use kubicorn_state::ClusterDefinition;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct PluginReconciler {
    prefix: String,
}

impl PluginReconciler {
    pub fn new() -> Self {
        Self::with_prefix("kubicorn-")
    }

    /// Plugins are looked up as `<prefix><cloud>`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn plugin_for(&self, cluster: &ClusterDefinition) -> anyhow::Result<String> {
        match cluster.cloud.as_deref().map(str::trim) {
            Some(cloud) if !cloud.is_empty() => Ok(format!("{}{}", self.prefix, cloud)),
            _ => bail!("cluster [{}] has no cloud provider", cluster.name),
        }
    }
}

#[async_trait]
impl Reconciler for PluginReconciler {
    async fn destroy(
        &self,
        cluster: ClusterDefinition,
        params: &RuntimeParameters,
    ) -> anyhow::Result<ClusterDefinition> {
        let program = self.plugin_for(&cluster)?;
        let input = serde_json::to_vec(&cluster)?;

        let mut cmd = Command::new(&program);
        cmd.arg("destroy");
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        if let Some(profile) = &params.aws_profile {
            cmd.env("AWS_PROFILE", profile);
        }

        tracing::debug!("Running: {} destroy", program);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("unable to run provider plugin {}", program))?;

        // stdin is written while stdout drains, or a plugin that answers as it
        // reads stalls on a full pipe
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&input).await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        match fed {
            // The plugin may exit without reading everything; its status decides
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            fed => fed.with_context(|| format!("unable to write to provider plugin {}", program))?,
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} destroy failed: {}", program, stderr.trim());
        }

        let destroyed: ClusterDefinition = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("{} returned an invalid cluster definition", program))?;
        if destroyed.name != cluster.name {
            bail!(
                "{} returned cluster [{}] for [{}]",
                program,
                destroyed.name,
                cluster.name
            );
        }

        Ok(destroyed)
    }
}
