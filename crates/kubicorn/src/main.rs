mod commands;
mod config;
mod runtime;

use clap::{Parser, Subcommand};
use config::StoreArgs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kubicorn", version)]
#[command(
    about = "Create, manage, and tear down Kubernetes infrastructure in the cloud",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete a Kubernetes cluster
    Delete {
        /// Cluster name
        #[arg(env = "KUBICORN_NAME")]
        name: Option<String>,
        /// Remove the cluster from the state store after deleting its resources
        #[arg(short, long)]
        purge: bool,
        /// AWS profile to use from $HOME/.aws/credentials
        #[arg(long = "aws-profile", env = "KUBICORN_AWS_PROFILE")]
        aws_profile: Option<String>,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Manage Kubernetes configuration
    Getconfig {
        /// Cluster name
        #[arg(env = "KUBICORN_NAME")]
        name: Option<String>,
        /// Kubeconfig file to merge into (default $HOME/.kube/config)
        #[arg(long, env = "KUBICORN_KUBECONFIG")]
        kubeconfig: Option<PathBuf>,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// List clusters in the state store
    List {
        #[command(flatten)]
        store: StoreArgs,
    },
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version go to stdout and exit 0
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(cli).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Delete {
            name,
            purge,
            aws_profile,
            store,
        } => {
            commands::delete::handle(
                name.unwrap_or_default(),
                store.to_config()?,
                purge,
                aws_profile,
            )
            .await
        }
        Commands::Getconfig {
            name,
            kubeconfig,
            store,
        } => {
            commands::getconfig::handle(name.unwrap_or_default(), store.to_config()?, kubeconfig)
                .await
        }
        Commands::List { store } => commands::list::handle(store.to_config()?).await,
    }
}
