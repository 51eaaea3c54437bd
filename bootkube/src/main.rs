//! Command line entrypoint: `bootkube --asset-dir <dir>`
use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use bootkube::{
    config::{parse_duration, ApiSource, BootstrapConfig, INSECURE_API_ADDR},
    create_assets,
    progress::Stdout,
    ConflictPolicy,
};
use kube::Client;
use tracing::*;
use tracing_subscriber::EnvFilter;

/// Create the self-hosted control plane assets against a temporary apiserver
#[derive(clap::Parser, Debug)]
#[command(name = "bootkube", version)]
struct App {
    /// Directory holding the manifests to create
    #[arg(long, env = "BOOTKUBE_ASSET_DIR")]
    asset_dir: PathBuf,

    /// Overall deadline for the apiserver to come up and the assets to be created
    #[arg(long, value_parser = parse_duration, default_value = "20m")]
    timeout: Duration,

    /// Time between polling attempts
    #[arg(long, value_parser = parse_duration, default_value = "5s")]
    interval: Duration,

    /// Address of the apiserver, used when no kubeconfig is given
    #[arg(long, default_value = INSECURE_API_ADDR, conflicts_with = "kubeconfig")]
    apiserver: http::Uri,

    /// Kubeconfig to reach the apiserver with instead of the insecure address
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Count assets that already exist and keep going, instead of stopping at the first one
    #[arg(long)]
    skip_existing: bool,
}

impl App {
    fn source(&self) -> ApiSource {
        match &self.kubeconfig {
            Some(path) => ApiSource::Kubeconfig(path.clone()),
            None => ApiSource::Insecure(self.apiserver.clone()),
        }
    }

    fn bootstrap_config(&self) -> BootstrapConfig {
        BootstrapConfig {
            interval: self.interval,
            timeout: self.timeout,
            conflicts: if self.skip_existing {
                ConflictPolicy::Skip
            } else {
                ConflictPolicy::Finish
            },
            ..BootstrapConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let app: App = clap::Parser::parse();

    let config = app.source().client_config().await?;
    let namespace = config.default_namespace.clone();
    info!(apiserver = %config.cluster_url, asset_dir = %app.asset_dir.display(), "starting bootstrap");
    let client = Client::try_from(config).context("failed to build client")?;

    let applied = create_assets(client, &namespace, &app.asset_dir, app.bootstrap_config(), Stdout).await?;
    info!(created = applied.created, existing = applied.existing, "bootstrap complete");
    Ok(())
}
