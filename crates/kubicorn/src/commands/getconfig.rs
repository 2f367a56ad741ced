use crate::config::expand_home;
use crate::runtime::{DefaultsInitializer, KubeconfigExtractor, SshAgent};
use colored::Colorize;
use kubicorn_core::{GetConfigOptions, GetConfigWorkflow};
use kubicorn_state::StateStoreConfig;
use std::path::PathBuf;

pub async fn handle(
    name: String,
    store: StateStoreConfig,
    kubeconfig: Option<PathBuf>,
) -> anyhow::Result<()> {
    let home = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;
    let kubeconfig = kubeconfig
        .map(|path| expand_home(&path))
        .unwrap_or_else(|| home.join(".kube").join("config"));

    let stores = super::backend_factory();
    let agent = SshAgent::from_env();
    let initializer = DefaultsInitializer::new(&home);
    let extractor = KubeconfigExtractor::new(kubeconfig);
    let options = GetConfigOptions { name, store };

    let path = GetConfigWorkflow::new(&stores, &agent, &initializer, &extractor)
        .run(&options)
        .await?;

    println!(
        "{}",
        format!("✓ Applied kubeconfig for [{}]", options.name).green()
    );
    println!("  {}", path.display().to_string().cyan());
    Ok(())
}
