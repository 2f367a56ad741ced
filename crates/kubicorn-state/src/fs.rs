//! Filesystem backends
//!
//! Both backends keep one directory per cluster under the base path:
//!
//! ```text
//! <base>/<name>/cluster.yaml   (fs)
//! <base>/<name>/cluster.json   (jsonfs)
//! ```
//!
//! Commits write a temporary file and rename it over the snapshot, so a
//! reader sees either the old or the new definition. There is no locking;
//! concurrent writers to the same name are last-writer-wins.

use crate::cluster::{ClusterDefinition, Encoding};
use crate::error::{Result, StateError};
use crate::store::{Backend, StateStore};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// One cluster's snapshot file on local disk
#[derive(Debug, Clone)]
pub(crate) struct ClusterFile {
    base_path: PathBuf,
    cluster_name: String,
    encoding: Encoding,
}

impl ClusterFile {
    pub(crate) fn new(base_path: PathBuf, cluster_name: String, encoding: Encoding) -> Self {
        Self {
            base_path,
            cluster_name,
            encoding,
        }
    }

    pub(crate) fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Directory holding this cluster's artifacts
    pub(crate) fn dir(&self) -> PathBuf {
        self.base_path.join(&self.cluster_name)
    }

    /// Path of the snapshot, relative to the base path
    pub(crate) fn relative_path(&self) -> PathBuf {
        Path::new(&self.cluster_name).join(self.encoding.file_name())
    }

    pub(crate) fn path(&self) -> PathBuf {
        self.base_path.join(self.relative_path())
    }

    fn temp_path(&self) -> PathBuf {
        self.dir()
            .join(format!(".{}.tmp", self.encoding.file_name()))
    }

    pub(crate) async fn exists(&self) -> Result<bool> {
        let path = self.path();
        fs::try_exists(&path)
            .await
            .map_err(|e| StateError::io(&path, e))
    }

    pub(crate) async fn read(&self) -> Result<ClusterDefinition> {
        let path = self.path();
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StateError::NotFound {
                    cluster: self.cluster_name.clone(),
                });
            }
            Err(e) => return Err(StateError::io(&path, e)),
        };

        let cluster = self.encoding.decode(&self.cluster_name, &bytes)?;
        tracing::debug!("Read cluster [{}] from {}", self.cluster_name, path.display());
        Ok(cluster)
    }

    pub(crate) async fn write(&self, cluster: &ClusterDefinition) -> Result<()> {
        if cluster.name != self.cluster_name {
            return Err(StateError::InvalidArgument(format!(
                "store is bound to cluster [{}] but was given [{}]",
                self.cluster_name, cluster.name
            )));
        }

        let bytes = self.encoding.encode(cluster)?;
        let dir = self.dir();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StateError::io(&dir, e))?;

        let temp = self.temp_path();
        fs::write(&temp, &bytes)
            .await
            .map_err(|e| StateError::io(&temp, e))?;

        let path = self.path();
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StateError::io(&path, e));
        }

        tracing::debug!("Wrote cluster [{}] to {}", self.cluster_name, path.display());
        Ok(())
    }

    pub(crate) async fn remove(&self) -> Result<()> {
        let dir = self.dir();
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::debug!("Removed {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateError::io(&dir, e)),
        }
    }

    /// Names of sibling clusters that have a snapshot in this encoding
    pub(crate) async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StateError::io(&self.base_path, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StateError::io(&self.base_path, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StateError::io(entry.path(), e))?;
            if file_type.is_file() {
                continue;
            }
            let snapshot = entry.path().join(self.encoding.file_name());
            if fs::try_exists(&snapshot)
                .await
                .map_err(|e| StateError::io(&snapshot, e))?
            {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// YAML-encoded filesystem store
pub struct FileSystemStore {
    file: ClusterFile,
}

impl FileSystemStore {
    pub fn new(base_path: impl Into<PathBuf>, cluster_name: impl Into<String>) -> Self {
        Self {
            file: ClusterFile::new(base_path.into(), cluster_name.into(), Encoding::Yaml),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.file.path()
    }
}

#[async_trait]
impl StateStore for FileSystemStore {
    fn backend(&self) -> Backend {
        Backend::Fs
    }

    fn cluster_name(&self) -> &str {
        self.file.cluster_name()
    }

    async fn exists(&self) -> Result<bool> {
        self.file.exists().await
    }

    async fn get_cluster(&self) -> Result<ClusterDefinition> {
        self.file.read().await
    }

    async fn commit(&self, cluster: &ClusterDefinition) -> Result<()> {
        self.file.write(cluster).await
    }

    async fn destroy(&self) -> Result<()> {
        self.file.remove().await
    }

    async fn list(&self) -> Result<Vec<String>> {
        self.file.list().await
    }
}

/// JSON-encoded filesystem store
pub struct JsonFileSystemStore {
    file: ClusterFile,
}

impl JsonFileSystemStore {
    pub fn new(base_path: impl Into<PathBuf>, cluster_name: impl Into<String>) -> Self {
        Self {
            file: ClusterFile::new(base_path.into(), cluster_name.into(), Encoding::Json),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.file.path()
    }
}

#[async_trait]
impl StateStore for JsonFileSystemStore {
    fn backend(&self) -> Backend {
        Backend::JsonFs
    }

    fn cluster_name(&self) -> &str {
        self.file.cluster_name()
    }

    async fn exists(&self) -> Result<bool> {
        self.file.exists().await
    }

    async fn get_cluster(&self) -> Result<ClusterDefinition> {
        self.file.read().await
    }

    async fn commit(&self, cluster: &ClusterDefinition) -> Result<()> {
        self.file.write(cluster).await
    }

    async fn destroy(&self) -> Result<()> {
        self.file.remove().await
    }

    async fn list(&self) -> Result<Vec<String>> {
        self.file.list().await
    }
}
