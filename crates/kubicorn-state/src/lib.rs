//! Kubicorn cluster state store
//!
//! Pluggable persistence for cluster definitions. Every backend implements
//! the same [`StateStore`] contract:
//!
//! - `exists` is side-effect-free; `Ok(false)` means definitely absent
//! - `get_cluster` fails with `NotFound` or `Corrupt`
//! - `commit` replaces the previous snapshot wholesale
//! - `destroy` is idempotent
//!
//! # Backends
//!
//! - **fs**: `<path>/<name>/cluster.yaml`, no versioning
//! - **jsonfs**: `<path>/<name>/cluster.json`, no versioning
//! - **git**: `<name>/cluster.json` tracked in a repository at `<path>`,
//!   pushed to a remote after every commit
//! - **s3**: object `<prefix>/<name>/cluster.json` in an S3-compatible bucket
//!
//! # Example
//!
//! ```ignore
//! use kubicorn_state::{open_store, Backend, GitConfigIdentity, StateStoreConfig};
//! use std::sync::Arc;
//!
//! let config = StateStoreConfig::new(Backend::Fs, "./_state");
//! let store = open_store(&config, "prod", Arc::new(GitConfigIdentity::new()))?;
//! if store.exists().await? {
//!     let cluster = store.get_cluster().await?;
//! }
//! ```

pub mod cluster;
pub mod error;
pub mod factory;
pub mod fs;
pub mod git;
pub mod identity;
pub mod s3;
pub mod store;

// Re-exports
pub use cluster::{ClusterDefinition, Encoding, validate_cluster_name};
pub use error::{Result, StateError, StateErrorKind};
pub use factory::{BackendFactory, StoreOpener, open_store};
pub use fs::{FileSystemStore, JsonFileSystemStore};
pub use git::JsonGitStore;
pub use identity::{CommitIdentity, GitConfigIdentity, IdentityProvider, StaticIdentity};
pub use s3::S3Store;
pub use store::{Backend, GitOptions, S3Options, StateStore, StateStoreConfig};
