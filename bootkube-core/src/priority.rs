//! Creation ordering for assets
//!
//! Service cluster IPs are handed out first-come first-served, so the DNS service has to
//! be created before any other service can claim the address kubelets were configured
//! with. [`prioritize`] moves that one asset to the front and leaves everything else alone.
use thiserror::Error;

use crate::asset::Asset;

/// Name of the cluster DNS service
pub const DNS_SERVICE_NAME: &str = "kube-dns";
/// Singular resource name of services
pub const SERVICE_KIND: &str = "service";

/// Identifies the asset that must be created first
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PriorityKey {
    /// Object name
    pub name: String,
    /// Singular resource name, e.g. `service`
    pub kind: String,
}

impl PriorityKey {
    /// Key for an arbitrary name and singular kind
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

impl Default for PriorityKey {
    fn default() -> Self {
        Self::new(DNS_SERVICE_NAME, SERVICE_KIND)
    }
}

/// The priority asset was not part of the input
///
/// Never fatal: the input order is still usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("asset not found: {kind} {name}")]
pub struct PriorityMissing {
    /// Name that was looked for
    pub name: String,
    /// Kind that was looked for
    pub kind: String,
}

/// Output of [`prioritize`]
#[derive(Debug)]
pub struct Prioritized {
    /// Assets in creation order
    pub assets: Vec<Asset>,
    /// Set when no asset matched the key; `assets` is then the unmodified input
    pub missing: Option<PriorityMissing>,
}

/// Move the first asset matching `key` to the front of `assets`
///
/// This is a stable partition: all other assets keep their relative order.
/// If nothing matches, the input is returned as-is together with a [`PriorityMissing`].
pub fn prioritize(mut assets: Vec<Asset>, key: &PriorityKey) -> Prioritized {
    match assets.iter().position(|a| a.matches(key)) {
        Some(idx) => {
            assets[..=idx].rotate_right(1);
            Prioritized { assets, missing: None }
        }
        None => Prioritized {
            assets,
            missing: Some(PriorityMissing {
                name: key.name.clone(),
                kind: key.kind.clone(),
            }),
        },
    }
}
