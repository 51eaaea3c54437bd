//! The two-phase bootstrap: wait for the apiserver, then create assets
use std::{convert::Infallible, fmt::Display, future::Future, path::PathBuf};

use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::{
    apply::{Applied, ApplyError, AssetApplier, AssetCreator, AssetLoader},
    cluster::{KubeCluster, ManifestLoader},
    config::BootstrapConfig,
    poll::{poll_until, Attempt, PollError},
    progress::ProgressSink,
};

/// A lightweight "is the apiserver reachable" check
pub trait ReadinessProbe {
    /// Why the check failed; only ever logged
    type Error: Display;

    /// Fetch the server version
    fn server_version(&self) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Where an [`Orchestrator`] is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Not started
    Pending,
    /// Polling the apiserver for readiness
    WaitingForApi,
    /// Polling the apply phase
    Applying,
    /// All assets are in place
    Done,
    /// A phase timed out or hit a fatal error
    Failed,
}

/// Terminal failure of a bootstrap
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// The apiserver did not become reachable before the deadline
    #[error("API Server unavailable")]
    ApiUnavailable(#[source] PollError<Infallible>),

    /// The apply phase timed out or failed fatally
    #[error("Failed to create assets")]
    CreateAssets(#[source] PollError<ApplyError>),
}

impl BootstrapError {
    /// The apply failure behind this error, if the apply phase was reached
    pub fn apply_error(&self) -> Option<&ApplyError> {
        match self {
            BootstrapError::ApiUnavailable(_) => None,
            BootstrapError::CreateAssets(err) => err.cause(),
        }
    }

    /// Whether a deadline ran out, as opposed to a fatal error
    pub fn is_timeout(&self) -> bool {
        match self {
            BootstrapError::ApiUnavailable(err) => err.is_timeout(),
            BootstrapError::CreateAssets(err) => err.is_timeout(),
        }
    }
}

/// Sequences readiness polling and asset creation under one overall deadline
///
/// The time spent waiting for the apiserver is deducted from the deadline of the apply
/// phase. Neither phase is ever re-entered.
pub struct Orchestrator<C, L, P> {
    cluster: C,
    loader: L,
    progress: P,
    config: BootstrapConfig,
    phase: Phase,
}

impl<C, L, P> Orchestrator<C, L, P>
where
    C: ReadinessProbe + AssetCreator,
    L: AssetLoader,
    P: ProgressSink,
{
    /// Orchestrator over the given collaborators
    pub fn new(cluster: C, loader: L, progress: P, config: BootstrapConfig) -> Self {
        Self {
            cluster,
            loader,
            progress,
            config,
            phase: Phase::Pending,
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The progress sink
    pub fn progress(&self) -> &P {
        &self.progress
    }

    /// Run both phases to completion
    ///
    /// # Errors
    ///
    /// [`BootstrapError::ApiUnavailable`] if the apiserver never answered in time, and
    /// [`BootstrapError::CreateAssets`] if applying timed out or failed with a fatal error.
    pub async fn run(&mut self) -> Result<Applied, BootstrapError> {
        let start = Instant::now();
        let interval = self.config.interval;

        self.phase = Phase::WaitingForApi;
        info!(timeout = ?self.config.timeout, "waiting for api-server");
        self.progress.line("Waiting for api-server...");
        let cluster = &self.cluster;
        let ready = poll_until(interval, self.config.timeout, move || async move {
            match cluster.server_version().await {
                Ok(()) => Attempt::Done(()),
                Err(err) => {
                    warn!(error = %err, "Unable to determine api-server version");
                    Attempt::Retry(None)
                }
            }
        })
        .await;
        if let Err(err) = ready {
            self.phase = Phase::Failed;
            return Err(BootstrapError::ApiUnavailable(err));
        }

        self.phase = Phase::Applying;
        let remaining = self.config.timeout.saturating_sub(start.elapsed());
        info!(remaining = ?remaining, "creating assets");
        self.progress.line("Creating self-hosted assets...");
        let applier = AssetApplier::new(&self.loader, &self.cluster, &self.progress, &self.config.priority)
            .conflicts(self.config.conflicts);
        let applier = &applier;
        let applied = poll_until(interval, remaining, move || async move {
            match applier.apply().await {
                Ok(applied) => Attempt::Done(applied),
                Err(err) if err.is_retryable() => {
                    warn!(
                        error = %err,
                        cause = ?err.create_error().map(ToString::to_string),
                        "Error creating assets, retrying"
                    );
                    Attempt::Retry(Some(err))
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        cause = ?err.create_error().map(ToString::to_string),
                        "Error creating assets"
                    );
                    Attempt::Abort(err)
                }
            }
        })
        .await;

        match applied {
            Ok(applied) => {
                self.phase = Phase::Done;
                info!(created = applied.created, existing = applied.existing, "assets in place");
                Ok(applied)
            }
            Err(err) => {
                self.phase = Phase::Failed;
                Err(BootstrapError::CreateAssets(err))
            }
        }
    }
}

/// Create every asset in `asset_dir` against the apiserver behind `client`
///
/// Blocks until the assets are in place, the deadline in `config` passes, or a fatal error
/// occurs. Namespaced assets without a namespace go to `default_namespace`.
pub async fn create_assets<P: ProgressSink>(
    client: kube::Client,
    default_namespace: &str,
    asset_dir: impl Into<PathBuf>,
    config: BootstrapConfig,
    progress: P,
) -> Result<Applied, BootstrapError> {
    let loader = ManifestLoader::new(client.clone(), asset_dir).default_namespace(default_namespace);
    Orchestrator::new(KubeCluster::new(client), loader, progress, config)
        .run()
        .await
}
