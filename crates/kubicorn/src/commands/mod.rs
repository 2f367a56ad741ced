pub mod delete;
pub mod getconfig;
pub mod list;

use kubicorn_state::{BackendFactory, GitConfigIdentity};
use std::sync::Arc;

/// Store factory used by every command
pub fn backend_factory() -> BackendFactory {
    BackendFactory::new(Arc::new(GitConfigIdentity::new()))
}
