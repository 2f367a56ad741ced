use colored::Colorize;
use kubicorn_state::{StateStoreConfig, StoreOpener};

// Listing is a property of the location; the bound name is never read.
const LIST_HANDLE: &str = "kubicorn";

pub async fn handle(store: StateStoreConfig) -> anyhow::Result<()> {
    let stores = super::backend_factory();
    let names = stores.open(&store, LIST_HANDLE)?.list().await?;

    if names.is_empty() {
        println!("{}", "No clusters found".yellow());
        return Ok(());
    }

    println!("{}", format!("Clusters ({}):", names.len()).bold());
    for name in names {
        println!("  • {}", name.cyan());
    }
    Ok(())
}
