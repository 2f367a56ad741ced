//! Cluster definition model and its on-disk encodings

use crate::error::{Result, StateError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Serialized description of a cluster's desired/observed infrastructure
///
/// The `spec` tree is opaque to the state store: providers and reconcilers
/// decide its shape. Only `name` is interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDefinition {
    /// Cluster name, unique within one backend and location
    pub name: String,

    /// Provider tag (e.g., "aws", "digitalocean")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,

    /// Provider and resource descriptions
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub spec: Map<String, Value>,
}

impl ClusterDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cloud: None,
            spec: Map::new(),
        }
    }

    pub fn with_cloud(mut self, cloud: impl Into<String>) -> Self {
        self.cloud = Some(cloud.into());
        self
    }

    pub fn with_spec(mut self, key: impl Into<String>, value: Value) -> Self {
        self.spec.insert(key.into(), value);
        self
    }

    /// Look up a value by JSON pointer relative to `spec` (e.g., "/ssh/user")
    pub fn spec_value<T: serde::de::DeserializeOwned>(&self, pointer: &str) -> Option<T> {
        let root = Value::Object(self.spec.clone());
        root.pointer(pointer)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value at a top-level section key, creating the section if needed
    pub fn set_spec_field(&mut self, section: &str, key: &str, value: Value) {
        let entry = self
            .spec
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), value);
        }
    }
}

/// Reject names that are empty or would escape the store's base location
pub fn validate_cluster_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(StateError::InvalidArgument(
            "Empty name. Must specify the name of the cluster".to_string(),
        ));
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StateError::InvalidArgument(format!(
            "Invalid cluster name [{}]: must not contain path separators",
            name
        )));
    }
    Ok(())
}

/// Encoding used for a stored snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Yaml,
    Json,
}

impl Encoding {
    pub fn file_name(&self) -> &'static str {
        match self {
            Encoding::Yaml => "cluster.yaml",
            Encoding::Json => "cluster.json",
        }
    }

    pub fn encode(&self, cluster: &ClusterDefinition) -> Result<Vec<u8>> {
        let encoded = match self {
            Encoding::Yaml => serde_yaml::to_string(cluster).map_err(|e| e.to_string()),
            Encoding::Json => serde_json::to_string_pretty(cluster).map_err(|e| e.to_string()),
        };
        encoded
            .map(String::into_bytes)
            .map_err(|message| StateError::Encode {
                cluster: cluster.name.clone(),
                message,
            })
    }

    /// Decode a snapshot and check that it describes `expected_name`
    pub fn decode(&self, expected_name: &str, bytes: &[u8]) -> Result<ClusterDefinition> {
        let corrupt = |message: String| StateError::Corrupt {
            cluster: expected_name.to_string(),
            message,
        };

        let cluster: ClusterDefinition = match self {
            Encoding::Yaml => serde_yaml::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?,
            Encoding::Json => serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?,
        };

        if cluster.name.is_empty() {
            return Err(corrupt("definition has an empty name".to_string()));
        }
        if cluster.name != expected_name {
            return Err(corrupt(format!(
                "definition is named [{}]",
                cluster.name
            )));
        }
        Ok(cluster)
    }
}
