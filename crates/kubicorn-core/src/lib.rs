//! Kubicorn cluster workflows
//!
//! The `delete` and `getconfig` workflows coordinate a [`StoreOpener`] with
//! the collaborators that do the cloud-facing work. The workflows are the
//! only code that writes to a state store.
//!
//! [`StoreOpener`]: kubicorn_state::StoreOpener

pub mod collaborator;
pub mod delete;
pub mod error;
pub mod getconfig;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use collaborator::{
    AgentSession, ConfigExtractor, CredentialAgent, Initializer, Reconciler, RuntimeParameters,
};
pub use delete::{DeleteOptions, DeleteOutcome, DeleteWorkflow};
pub use error::{ErrorKind, Result, WorkflowError};
pub use getconfig::{GetConfigOptions, GetConfigWorkflow};
