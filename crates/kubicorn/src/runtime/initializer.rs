//! Default SSH settings for loaded definitions

use anyhow::bail;
use async_trait::async_trait;
use kubicorn_core::Initializer;
use kubicorn_state::ClusterDefinition;
use serde_json::Value;
use std::path::PathBuf;

const DEFAULT_SSH_USER: &str = "root";
const DEFAULT_SSH_PORT: u16 = 22;

pub struct DefaultsInitializer {
    home: PathBuf,
}

impl DefaultsInitializer {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }
}

#[async_trait]
impl Initializer for DefaultsInitializer {
    async fn init(&self, mut cluster: ClusterDefinition) -> anyhow::Result<ClusterDefinition> {
        let endpoint = cluster
            .spec_value::<String>("/kubernetesApi/endpoint")
            .unwrap_or_default();
        if endpoint.trim().is_empty() {
            bail!("cluster [{}] has no kubernetes API endpoint", cluster.name);
        }

        if cluster.spec_value::<String>("/ssh/user").is_none() {
            cluster.set_spec_field("ssh", "user", Value::from(DEFAULT_SSH_USER));
        }
        if cluster.spec_value::<u16>("/ssh/port").is_none() {
            cluster.set_spec_field("ssh", "port", Value::from(DEFAULT_SSH_PORT));
        }

        // Key paths written as `~/.ssh/id_rsa` are resolved against the home directory
        let key = cluster
            .spec_value::<String>("/ssh/privateKeyPath")
            .unwrap_or_else(|| "~/.ssh/id_rsa".to_string());
        let key = match key.strip_prefix("~/") {
            Some(rest) => self.home.join(rest),
            None => PathBuf::from(key),
        };
        cluster.set_spec_field(
            "ssh",
            "privateKeyPath",
            Value::from(key.to_string_lossy().into_owned()),
        );

        Ok(cluster)
    }
}
