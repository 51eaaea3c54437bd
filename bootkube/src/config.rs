//! Bootstrap settings and apiserver connection configuration
use std::{path::PathBuf, str::FromStr, time::Duration};

use bootkube_core::PriorityKey;
use kube::config::{KubeConfigOptions, Kubeconfig, KubeconfigError};
use thiserror::Error;

use crate::apply::ConflictPolicy;

/// Address of the apiserver's insecure port on the bootstrap node
pub const INSECURE_API_ADDR: &str = "http://127.0.0.1:8080";

/// Time between polling attempts
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Overall deadline for both phases
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Settings for an [`Orchestrator`](crate::Orchestrator)
#[derive(Clone, Debug)]
pub struct BootstrapConfig {
    /// Time between polling attempts, in both phases
    pub interval: Duration,
    /// Overall deadline, split across the readiness and apply phases
    pub timeout: Duration,
    /// The asset created before all others
    pub priority: PriorityKey,
    /// How existing assets are handled
    pub conflicts: ConflictPolicy,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            priority: PriorityKey::default(),
            conflicts: ConflictPolicy::default(),
        }
    }
}

/// How to reach the apiserver
#[derive(Clone, Debug)]
pub enum ApiSource {
    /// An unauthenticated address, such as the insecure port
    Insecure(http::Uri),
    /// A kubeconfig file, using its current context
    Kubeconfig(PathBuf),
}

impl Default for ApiSource {
    fn default() -> Self {
        ApiSource::Insecure(http::Uri::from_static(INSECURE_API_ADDR))
    }
}

/// Failure to build a client configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The kubeconfig could not be read or used
    #[error("failed to load kubeconfig {}", .path.display())]
    Kubeconfig {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        source: KubeconfigError,
    },
}

/// Longest duration accepted by [`parse_duration`]
pub const MAX_DURATION: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Failure to parse a duration flag
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DurationError {
    /// Not a duration in the Kubernetes format
    #[error("invalid duration: {0}")]
    Invalid(String),
    /// Durations cannot go backwards
    #[error("duration must not be negative")]
    Negative,
    /// Larger than [`MAX_DURATION`]
    #[error("duration must not exceed 100 years")]
    TooLong,
}

/// Parse a duration written like `20m`, `1h30m` or `2.5s`
///
/// The format is the one of [`kube::core::Duration`]; negative and overly long values are
/// rejected.
pub fn parse_duration(text: &str) -> Result<Duration, DurationError> {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if text.starts_with('-') || unsigned.contains('-') {
        return Err(DurationError::Negative);
    }
    // upper bound on the value with every number counted in hours, the largest unit
    let hours: f64 = unsigned
        .split(|c: char| c.is_alphabetic())
        .filter_map(|n| n.parse::<f64>().ok())
        .sum();
    if hours * 3600.0 > MAX_DURATION.as_secs_f64() {
        return Err(DurationError::TooLong);
    }

    let parsed = kube::core::Duration::from_str(text).map_err(|err| DurationError::Invalid(err.to_string()))?;
    if parsed.is_negative() {
        return Err(DurationError::Negative);
    }
    Ok(parsed.into())
}

impl ApiSource {
    /// Build the client configuration for this source
    pub async fn client_config(&self) -> Result<kube::Config, ConfigError> {
        match self {
            ApiSource::Insecure(uri) => Ok(kube::Config::new(uri.clone())),
            ApiSource::Kubeconfig(path) => {
                let err = |source| ConfigError::Kubeconfig {
                    path: path.clone(),
                    source,
                };
                let kubeconfig = Kubeconfig::read_from(path).map_err(err)?;
                kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(err)
            }
        }
    }
}
