//! Concrete collaborators wired into the workflows by the CLI

pub mod agent;
pub mod initializer;
pub mod kubeconfig;
pub mod reconciler;

pub use agent::SshAgent;
pub use initializer::DefaultsInitializer;
pub use kubeconfig::KubeconfigExtractor;
pub use reconciler::PluginReconciler;
