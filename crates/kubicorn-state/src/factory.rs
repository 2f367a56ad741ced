//! Backend selection
//!
//! The only place that branches on [`Backend`]. Workflows ask a
//! [`StoreOpener`] for a store and never name a concrete backend.

use crate::cluster::validate_cluster_name;
use crate::error::Result;
use crate::fs::{FileSystemStore, JsonFileSystemStore};
use crate::git::JsonGitStore;
use crate::identity::IdentityProvider;
use crate::s3::S3Store;
use crate::store::{Backend, StateStore, StateStoreConfig};
use std::sync::Arc;

/// Construct the configured backend bound to `cluster_name`
///
/// Backend preconditions (git remote, s3 endpoint and bucket) are checked
/// here and reported as `InvalidArgument`.
pub fn open_store(
    config: &StateStoreConfig,
    cluster_name: &str,
    identity: Arc<dyn IdentityProvider>,
) -> Result<Box<dyn StateStore>> {
    validate_cluster_name(cluster_name)?;

    let store: Box<dyn StateStore> = match config.backend {
        Backend::Fs => Box::new(FileSystemStore::new(&config.path, cluster_name)),
        Backend::JsonFs => Box::new(JsonFileSystemStore::new(&config.path, cluster_name)),
        Backend::Git => Box::new(JsonGitStore::new(
            &config.path,
            cluster_name,
            config.git.remote.clone(),
            identity,
        )?),
        Backend::S3 => Box::new(S3Store::new(&config.s3, &config.path, cluster_name)?),
    };

    tracing::info!("Selected [{}] state store", config.backend);
    Ok(store)
}

/// Source of state stores for a workflow
pub trait StoreOpener: Send + Sync {
    fn open(&self, config: &StateStoreConfig, cluster_name: &str) -> Result<Box<dyn StateStore>>;
}

/// [`StoreOpener`] backed by [`open_store`]
#[derive(Clone)]
pub struct BackendFactory {
    identity: Arc<dyn IdentityProvider>,
}

impl BackendFactory {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }
}

impl StoreOpener for BackendFactory {
    fn open(&self, config: &StateStoreConfig, cluster_name: &str) -> Result<Box<dyn StateStore>> {
        open_store(config, cluster_name, self.identity.clone())
    }
}
