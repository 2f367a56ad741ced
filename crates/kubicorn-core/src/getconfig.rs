//! Kubeconfig retrieval for an existing cluster

use crate::collaborator::{ConfigExtractor, CredentialAgent, Initializer};
use crate::error::{Result, WorkflowError};
use kubicorn_state::{StateStoreConfig, StoreOpener};
use std::path::PathBuf;

/// Inputs of a getconfig run
#[derive(Debug, Clone)]
pub struct GetConfigOptions {
    pub name: String,
    pub store: StateStoreConfig,
}

/// Load a stored cluster and write its kubeconfig locally
///
/// Read-only with respect to the state store.
pub struct GetConfigWorkflow<'a> {
    stores: &'a dyn StoreOpener,
    agent: &'a dyn CredentialAgent,
    initializer: &'a dyn Initializer,
    extractor: &'a dyn ConfigExtractor,
}

impl<'a> GetConfigWorkflow<'a> {
    pub fn new(
        stores: &'a dyn StoreOpener,
        agent: &'a dyn CredentialAgent,
        initializer: &'a dyn Initializer,
        extractor: &'a dyn ConfigExtractor,
    ) -> Self {
        Self {
            stores,
            agent,
            initializer,
            extractor,
        }
    }

    /// Returns the path of the kubeconfig that was written
    pub async fn run(&self, options: &GetConfigOptions) -> Result<PathBuf> {
        // Held for the rest of the run and released on every exit path
        let session = self
            .agent
            .acquire()
            .await
            .map_err(|source| WorkflowError::Agent { source })?;

        let name = options.name.as_str();
        if name.trim().is_empty() {
            return Err(WorkflowError::InvalidArgument(
                "Empty name. Must specify the name of the cluster to get config".to_string(),
            ));
        }

        let store = self
            .stores
            .open(&options.store, name)
            .map_err(|e| WorkflowError::construction(name, e))?;

        let expected = store.get_cluster().await.map_err(|e| {
            if e.is_not_found() {
                WorkflowError::NotFound {
                    cluster: name.to_string(),
                }
            } else {
                WorkflowError::load(name, e)
            }
        })?;
        tracing::info!("Loaded cluster: {}", expected.name);

        let cluster = self
            .initializer
            .init(expected)
            .await
            .map_err(|source| WorkflowError::Init {
                cluster: name.to_string(),
                source,
            })?;

        let path = self
            .extractor
            .extract(&cluster, session.as_ref())
            .await
            .map_err(|source| WorkflowError::Extract {
                cluster: name.to_string(),
                source,
            })?;
        tracing::debug!("Wrote kubeconfig to {}", path.display());

        Ok(path)
    }
}
