//! SSH agent sessions
//!
//! A caller that already runs an agent (`SSH_AUTH_SOCK`) gets that socket
//! back. Otherwise a private `ssh-agent -D` is started on a socket in a
//! temporary directory; dropping the session kills it and removes the
//! directory.

use anyhow::{Context, bail};
use async_trait::async_trait;
use kubicorn_core::{AgentSession, CredentialAgent};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::{Child, Command};

const SOCKET_POLL_INTERVAL: Duration = Duration::from_millis(20);
const SOCKET_POLL_ATTEMPTS: usize = 100;

pub struct SshAgent {
    existing: Option<PathBuf>,
}

impl SshAgent {
    pub fn new(existing: Option<PathBuf>) -> Self {
        Self { existing }
    }

    /// Reuse the agent advertised by `SSH_AUTH_SOCK`, if any
    pub fn from_env() -> Self {
        let existing = std::env::var_os("SSH_AUTH_SOCK")
            .filter(|sock| !sock.is_empty())
            .map(PathBuf::from);
        Self::new(existing)
    }

    async fn spawn() -> anyhow::Result<SpawnedSession> {
        let dir = tempfile::Builder::new()
            .prefix("kubicorn-agent")
            .tempdir()
            .context("unable to create ssh-agent socket directory")?;
        let socket = dir.path().join("agent.sock");

        tracing::debug!("Running: ssh-agent -D -a {}", socket.display());

        let mut child = Command::new("ssh-agent")
            .arg("-D")
            .arg("-a")
            .arg(&socket)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("unable to start ssh-agent")?;

        for _ in 0..SOCKET_POLL_ATTEMPTS {
            if socket.exists() {
                return Ok(SpawnedSession {
                    socket,
                    _child: Mutex::new(child),
                    _dir: dir,
                });
            }
            if let Some(status) = child.try_wait()? {
                bail!("ssh-agent exited early ({})", status);
            }
            tokio::time::sleep(SOCKET_POLL_INTERVAL).await;
        }

        bail!("ssh-agent did not create {}", socket.display())
    }
}

#[async_trait]
impl CredentialAgent for SshAgent {
    async fn acquire(&self) -> anyhow::Result<Box<dyn AgentSession>> {
        if let Some(socket) = &self.existing {
            if socket.exists() {
                tracing::debug!("Using ssh-agent at {}", socket.display());
                return Ok(Box::new(ExistingSession {
                    socket: socket.clone(),
                }));
            }
            tracing::warn!(
                "SSH_AUTH_SOCK points at missing socket {}, starting a private agent",
                socket.display()
            );
        }

        Ok(Box::new(Self::spawn().await?))
    }
}

struct ExistingSession {
    socket: PathBuf,
}

impl AgentSession for ExistingSession {
    fn socket(&self) -> &Path {
        &self.socket
    }
}

// Field order matters: the agent is killed before its directory is removed.
struct SpawnedSession {
    socket: PathBuf,
    _child: Mutex<Child>,
    _dir: TempDir,
}

impl AgentSession for SpawnedSession {
    fn socket(&self) -> &Path {
        &self.socket
    }
}
