use crate::runtime::PluginReconciler;
use colored::Colorize;
use kubicorn_core::{DeleteOptions, DeleteOutcome, DeleteWorkflow, RuntimeParameters};
use kubicorn_state::StateStoreConfig;

pub async fn handle(
    name: String,
    store: StateStoreConfig,
    purge: bool,
    aws_profile: Option<String>,
) -> anyhow::Result<()> {
    let stores = super::backend_factory();
    let reconciler = PluginReconciler::new();
    let options = DeleteOptions {
        name,
        store,
        purge,
        runtime: RuntimeParameters { aws_profile },
    };

    match DeleteWorkflow::new(&stores, &reconciler).run(&options).await? {
        DeleteOutcome::NotFound => {}
        DeleteOutcome::Deleted { purged } => {
            println!(
                "{}",
                format!("✓ Deleted cluster [{}]", options.name).green()
            );
            if purged {
                println!(
                    "{}",
                    format!("✓ Purged [{}] from the state store", options.name).green()
                );
            }
        }
    }

    Ok(())
}
