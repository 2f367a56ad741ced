//! State store trait definition and configuration

use crate::cluster::ClusterDefinition;
use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::str::FromStr;

/// Persistence abstraction for one cluster definition
///
/// A store is bound to exactly one `(backend, location, cluster name)` triple.
/// All backends (fs, jsonfs, git, s3) implement this trait.
///
/// Concurrent use of the same cluster name from separate processes is not
/// serialized: local backends are last-writer-wins, git rejects
/// non-fast-forward pushes, and s3 follows the provider's consistency model.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Backend this store was built for
    fn backend(&self) -> Backend;

    /// Name of the cluster this store is bound to
    fn cluster_name(&self) -> &str;

    /// Whether a snapshot exists
    ///
    /// `Ok(false)` means definitely absent. Failing to determine presence
    /// (permissions, network, auth) is an error, never `false`.
    async fn exists(&self) -> Result<bool>;

    /// Load the stored definition
    ///
    /// Fails with `NotFound` when there is no snapshot and `Corrupt` when the
    /// payload cannot be decoded into a well-formed definition.
    async fn get_cluster(&self) -> Result<ClusterDefinition>;

    /// Persist a complete snapshot, replacing any prior one
    async fn commit(&self, cluster: &ClusterDefinition) -> Result<()>;

    /// Remove the snapshot and any backend-local artifacts. Idempotent.
    async fn destroy(&self) -> Result<()>;

    /// Names of all clusters stored at this store's location
    async fn list(&self) -> Result<Vec<String>>;
}

/// State store backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Fs,
    JsonFs,
    Git,
    S3,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Fs => "fs",
            Backend::JsonFs => "jsonfs",
            Backend::Git => "git",
            Backend::S3 => "s3",
        }
    }

    /// Whether the store location is a local filesystem path
    pub fn is_local(&self) -> bool {
        !matches!(self, Backend::S3)
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fs" => Ok(Backend::Fs),
            "jsonfs" => Ok(Backend::JsonFs),
            "git" => Ok(Backend::Git),
            "s3" => Ok(Backend::S3),
            other => Err(format!(
                "unknown state store [{}]: expected one of fs, jsonfs, git, s3",
                other
            )),
        }
    }
}

/// Git backend parameters
#[derive(Debug, Clone, Default)]
pub struct GitOptions {
    /// Remote URL pushed to after every commit
    pub remote: String,
}

/// Object storage backend parameters
#[derive(Debug, Clone)]
pub struct S3Options {
    /// Endpoint host (with optional port), or a full URL
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Use https when the endpoint carries no scheme
    pub ssl: bool,
}

impl Default for S3Options {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            bucket: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            ssl: true,
        }
    }
}

/// Everything needed to select and construct a backend
///
/// Assembled once at the process boundary; nothing below it reads the
/// environment.
#[derive(Debug, Clone, Default)]
pub struct StateStoreConfig {
    pub backend: Backend,
    /// Base path for local backends, key prefix for s3
    pub path: PathBuf,
    pub git: GitOptions,
    pub s3: S3Options,
}

impl StateStoreConfig {
    pub fn new(backend: Backend, path: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_git(mut self, git: GitOptions) -> Self {
        self.git = git;
        self
    }

    pub fn with_s3(mut self, s3: S3Options) -> Self {
        self.s3 = s3;
        self
    }
}
