//! Bootstraps a self-hosted Kubernetes control plane from a directory of manifests
//!
//! A temporary control plane is started on the bootstrap node, then the manifests describing the
//! self-hosted control plane are created against it. [`create_assets`] waits for the apiserver
//! to answer, then creates every asset, with the cluster DNS service first.
//!
//! ```no_run
//! use bootkube::{create_assets, config::BootstrapConfig, progress::Stdout};
//! use kube::{Client, Config};
//!
//! # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::new("http://127.0.0.1:8080".parse()?);
//! let ns = config.default_namespace.clone();
//! let client = Client::try_from(config)?;
//! let applied = create_assets(client, &ns, "/assets/manifests", BootstrapConfig::default(), Stdout).await?;
//! println!("created {} assets", applied.created);
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod apply;
pub mod bootstrap;
pub mod cluster;
pub mod config;
pub mod manifest;
pub mod poll;
pub mod progress;

pub use apply::{Applied, ApplyError, AssetApplier, AssetCreator, AssetLoader, ConflictPolicy};
pub use bootstrap::{create_assets, BootstrapError, Orchestrator, Phase, ReadinessProbe};
pub use cluster::{KubeCluster, ManifestLoader};
pub use config::{ApiSource, BootstrapConfig};

/// Re-exports from `bootkube-core`
pub use bootkube_core as core;

#[cfg(test)] mod mock_tests;
