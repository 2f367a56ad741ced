//! In-memory store and recording collaborators for workflow tests

use crate::collaborator::{
    AgentSession, ConfigExtractor, CredentialAgent, Initializer, Reconciler, RuntimeParameters,
};
use async_trait::async_trait;
use kubicorn_state::{
    Backend, ClusterDefinition, StateError, StateStore, StateStoreConfig, StoreOpener,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct MemoryState {
    pub snapshot: Option<ClusterDefinition>,
    pub committed: Vec<ClusterDefinition>,
    pub destroys: usize,
    pub fail_exists: bool,
    pub fail_commit: bool,
    pub fail_destroy: bool,
}

/// Shared handle to one in-memory cluster snapshot
#[derive(Clone, Default)]
pub struct MemoryStores {
    pub state: Arc<Mutex<MemoryState>>,
}

impl MemoryStores {
    pub fn with_cluster(cluster: ClusterDefinition) -> Self {
        let stores = Self::default();
        stores.state.lock().unwrap().snapshot = Some(cluster);
        stores
    }

    pub fn snapshot(&self) -> Option<ClusterDefinition> {
        self.state.lock().unwrap().snapshot.clone()
    }

    pub fn committed(&self) -> Vec<ClusterDefinition> {
        self.state.lock().unwrap().committed.clone()
    }

    pub fn destroys(&self) -> usize {
        self.state.lock().unwrap().destroys
    }

    pub fn writes(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.committed.len() + state.destroys
    }
}

impl StoreOpener for MemoryStores {
    fn open(
        &self,
        _config: &StateStoreConfig,
        cluster_name: &str,
    ) -> kubicorn_state::Result<Box<dyn StateStore>> {
        Ok(Box::new(MemoryStore {
            name: cluster_name.to_string(),
            state: self.state.clone(),
        }))
    }
}

struct MemoryStore {
    name: String,
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl StateStore for MemoryStore {
    fn backend(&self) -> Backend {
        Backend::Fs
    }

    fn cluster_name(&self) -> &str {
        &self.name
    }

    async fn exists(&self) -> kubicorn_state::Result<bool> {
        let state = self.state.lock().unwrap();
        if state.fail_exists {
            return Err(StateError::ObjectStorage("connection reset".to_string()));
        }
        Ok(state.snapshot.is_some())
    }

    async fn get_cluster(&self) -> kubicorn_state::Result<ClusterDefinition> {
        self.state
            .lock()
            .unwrap()
            .snapshot
            .clone()
            .ok_or_else(|| StateError::NotFound {
                cluster: self.name.clone(),
            })
    }

    async fn commit(&self, cluster: &ClusterDefinition) -> kubicorn_state::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_commit {
            return Err(StateError::Remote("non-fast-forward".to_string()));
        }
        state.committed.push(cluster.clone());
        state.snapshot = Some(cluster.clone());
        Ok(())
    }

    async fn destroy(&self) -> kubicorn_state::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_destroy {
            return Err(StateError::Git("permission denied".to_string()));
        }
        state.destroys += 1;
        state.snapshot = None;
        Ok(())
    }

    async fn list(&self) -> kubicorn_state::Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state.snapshot.iter().map(|c| c.name.clone()).collect())
    }
}

pub fn cluster(name: &str) -> ClusterDefinition {
    ClusterDefinition::new(name)
        .with_cloud("aws")
        .with_spec("serverPools", json!([{ "name": "master", "count": 1 }]))
}

/// Reconciler that empties `serverPools`, or fails
#[derive(Default)]
pub struct RecordingReconciler {
    pub calls: Mutex<Vec<(ClusterDefinition, RuntimeParameters)>>,
    pub fail: bool,
}

impl RecordingReconciler {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn destroyed(cluster: &ClusterDefinition) -> ClusterDefinition {
        cluster.clone().with_spec("serverPools", json!([]))
    }
}

#[async_trait]
impl Reconciler for RecordingReconciler {
    async fn destroy(
        &self,
        cluster: ClusterDefinition,
        params: &RuntimeParameters,
    ) -> anyhow::Result<ClusterDefinition> {
        self.calls
            .lock()
            .unwrap()
            .push((cluster.clone(), params.clone()));
        if self.fail {
            anyhow::bail!("instance i-0abc termination failed");
        }
        Ok(Self::destroyed(&cluster))
    }
}

#[derive(Default)]
pub struct RecordingInitializer {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl RecordingInitializer {
    pub fn initialized(cluster: &ClusterDefinition) -> ClusterDefinition {
        cluster.clone().with_spec("ssh", json!({ "user": "root", "port": 22 }))
    }
}

#[async_trait]
impl Initializer for RecordingInitializer {
    async fn init(&self, cluster: ClusterDefinition) -> anyhow::Result<ClusterDefinition> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("cluster has no kubernetes API endpoint");
        }
        Ok(Self::initialized(&cluster))
    }
}

#[derive(Default)]
pub struct RecordingExtractor {
    pub calls: Mutex<Vec<(ClusterDefinition, PathBuf)>>,
    pub fail: bool,
}

#[async_trait]
impl ConfigExtractor for RecordingExtractor {
    async fn extract(
        &self,
        cluster: &ClusterDefinition,
        agent: &dyn AgentSession,
    ) -> anyhow::Result<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .push((cluster.clone(), agent.socket().to_path_buf()));
        if self.fail {
            anyhow::bail!("ssh: connect to host 203.0.113.10 port 22: Connection refused");
        }
        Ok(PathBuf::from("/home/kubicorn/.kube/config"))
    }
}

/// Agent whose sessions count their own release
#[derive(Default)]
pub struct CountingAgent {
    pub acquired: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
    pub fail: bool,
}

impl CountingAgent {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

struct CountingSession {
    socket: PathBuf,
    released: Arc<AtomicUsize>,
}

impl AgentSession for CountingSession {
    fn socket(&self) -> &Path {
        &self.socket
    }
}

impl Drop for CountingSession {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialAgent for CountingAgent {
    async fn acquire(&self) -> anyhow::Result<Box<dyn AgentSession>> {
        if self.fail {
            anyhow::bail!("ssh-agent not available");
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingSession {
            socket: PathBuf::from("/tmp/kubicorn-agent.sock"),
            released: self.released.clone(),
        }))
    }
}
