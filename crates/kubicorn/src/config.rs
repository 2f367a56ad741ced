//! State store flags shared by every subcommand

use clap::{ArgAction, Args};
use kubicorn_state::{Backend, GitOptions, S3Options, StateStoreConfig};
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// State store type to use for the cluster (fs, jsonfs, git, s3)
    #[arg(
        short = 's',
        long = "state-store",
        env = "KUBICORN_STATE_STORE",
        default_value = "fs"
    )]
    pub state_store: Backend,

    /// State store path (key prefix for s3)
    #[arg(
        short = 'S',
        long = "state-store-path",
        env = "KUBICORN_STATE_STORE_PATH",
        default_value = "./_state"
    )]
    pub state_store_path: PathBuf,

    /// Git remote url pushed to by the git state store
    #[arg(long = "git-config", env = "KUBICORN_GIT_CONFIG", default_value = "")]
    pub git_remote: String,

    /// S3 access key
    #[arg(long = "s3-access", env = "KUBICORN_S3_ACCESS_KEY", default_value = "")]
    pub s3_access_key: String,

    /// S3 secret key
    #[arg(
        long = "s3-secret",
        env = "KUBICORN_S3_SECRET_KEY",
        default_value = "",
        hide_env_values = true
    )]
    pub s3_secret_key: String,

    /// S3 endpoint (host[:port] or url)
    #[arg(long = "s3-endpoint", env = "KUBICORN_S3_ENDPOINT", default_value = "")]
    pub s3_endpoint: String,

    /// Use https for the S3 endpoint
    #[arg(
        long = "s3-ssl",
        env = "KUBICORN_S3_SSL",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub s3_ssl: bool,

    /// S3 bucket name
    #[arg(long = "s3-bucket", env = "KUBICORN_S3_BUCKET", default_value = "")]
    pub s3_bucket: String,
}

impl StoreArgs {
    /// Resolve flags into the store configuration
    ///
    /// Local backends get an absolute base path; the s3 prefix is used as given.
    pub fn to_config(&self) -> anyhow::Result<StateStoreConfig> {
        let path = if self.state_store.is_local() {
            absolute(&expand_home(&self.state_store_path))?
        } else {
            self.state_store_path.clone()
        };

        Ok(StateStoreConfig::new(self.state_store, path)
            .with_git(GitOptions {
                remote: self.git_remote.clone(),
            })
            .with_s3(S3Options {
                endpoint: self.s3_endpoint.clone(),
                bucket: self.s3_bucket.clone(),
                access_key: self.s3_access_key.clone(),
                secret_key: self.s3_secret_key.clone(),
                ssl: self.s3_ssl,
            }))
    }
}

/// Replace a leading `~` with the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| anyhow::anyhow!("Unable to resolve current directory: {}", e))?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        store: StoreArgs,
    }

    fn parse(args: &[&str]) -> StoreArgs {
        let mut argv = vec!["kubicorn"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().store
    }

    #[test]
    fn test_local_path_is_made_absolute() {
        let args = parse(&["-s", "jsonfs", "-S", "state"]);
        let config = args.to_config().unwrap();
        assert_eq!(config.backend, Backend::JsonFs);
        assert!(config.path.is_absolute());
        assert!(config.path.ends_with("state"));
    }

    #[test]
    fn test_s3_prefix_is_kept() {
        let args = parse(&[
            "--state-store",
            "s3",
            "--state-store-path",
            "clusters/prod",
            "--s3-endpoint",
            "minio:9000",
            "--s3-bucket",
            "state",
            "--s3-ssl",
            "false",
        ]);
        let config = args.to_config().unwrap();
        assert_eq!(config.path, PathBuf::from("clusters/prod"));
        assert_eq!(config.s3.endpoint, "minio:9000");
        assert_eq!(config.s3.bucket, "state");
        assert!(!config.s3.ssl);
    }

    #[test]
    fn test_git_remote_flag() {
        let args = parse(&["-s", "git", "--git-config", "git@example.com:org/state.git"]);
        let config = args.to_config().unwrap();
        assert_eq!(config.git.remote, "git@example.com:org/state.git");
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let result = TestCli::try_parse_from(["kubicorn", "-s", "etcd"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_expand_home() {
        let plain = Path::new("/var/lib/kubicorn");
        assert_eq!(expand_home(plain), plain);

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/state")), home.join("state"));
        }
    }
}
