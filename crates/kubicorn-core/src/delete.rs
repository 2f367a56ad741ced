//! Cluster deletion
//!
//! ```text
//! Idle → Validated → Loaded → Destroying → Committed → [Purging → Purged] → Done
//! ```
//!
//! Any step can fail, and a failure aborts every later step. Nothing is
//! rolled back: resource destruction is irreversible.

use crate::collaborator::{Reconciler, RuntimeParameters};
use crate::error::{Result, WorkflowError};
use kubicorn_state::{StateStoreConfig, StoreOpener};

/// Inputs of a delete run
#[derive(Debug, Clone)]
pub struct DeleteOptions {
    pub name: String,
    pub store: StateStoreConfig,
    /// Remove the stored definition after the resources are gone
    pub purge: bool,
    pub runtime: RuntimeParameters,
}

/// How a successful delete ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Nothing stored under the name; no writes were made
    NotFound,
    /// Resources destroyed and the resulting state committed
    Deleted { purged: bool },
}

/// Destroy a cluster's resources and persist what is left
pub struct DeleteWorkflow<'a> {
    stores: &'a dyn StoreOpener,
    reconciler: &'a dyn Reconciler,
}

impl<'a> DeleteWorkflow<'a> {
    pub fn new(stores: &'a dyn StoreOpener, reconciler: &'a dyn Reconciler) -> Self {
        Self { stores, reconciler }
    }

    pub async fn run(&self, options: &DeleteOptions) -> Result<DeleteOutcome> {
        let name = options.name.as_str();
        if name.trim().is_empty() {
            return Err(WorkflowError::InvalidArgument(
                "Empty name. Must specify the name of the cluster to delete".to_string(),
            ));
        }

        let store = self
            .stores
            .open(&options.store, name)
            .map_err(|e| WorkflowError::construction(name, e))?;

        // A transient failure here is an error, never "absent"
        let exists = store
            .exists()
            .await
            .map_err(|e| WorkflowError::load(name, e))?;
        if !exists {
            tracing::info!("Cluster [{}] does not exist", name);
            return Ok(DeleteOutcome::NotFound);
        }

        let expected = store
            .get_cluster()
            .await
            .map_err(|e| WorkflowError::load(name, e))?;
        tracing::info!("Loaded cluster: {}", expected.name);

        // On failure the store still describes the pre-destroy state, so a
        // rerun starts from what was last known to exist.
        tracing::info!("Destroying resources for cluster [{}]", name);
        let destroyed = self
            .reconciler
            .destroy(expected, &options.runtime)
            .await
            .map_err(|source| WorkflowError::Reconcile {
                cluster: name.to_string(),
                source,
            })?;

        store.commit(&destroyed).await.map_err(|source| {
            tracing::warn!("Resources for cluster [{}] are destroyed but state was not saved", name);
            WorkflowError::Commit {
                cluster: name.to_string(),
                source,
            }
        })?;
        tracing::info!("Saved state for cluster [{}]", name);

        if options.purge {
            store.destroy().await.map_err(|source| {
                tracing::warn!("Resources for cluster [{}] are destroyed but purge failed", name);
                WorkflowError::Purge {
                    cluster: name.to_string(),
                    source,
                }
            })?;
            tracing::info!("Purged cluster [{}] from state store", name);
        }

        Ok(DeleteOutcome::Deleted {
            purged: options.purge,
        })
    }
}
