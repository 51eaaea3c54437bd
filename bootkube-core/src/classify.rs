//! Classification of asset creation failures
//!
//! Two independent questions are asked of every failed create:
//!
//! - [`is_retryable`]: is this the expected transient state of a control plane that is
//!   still coming up? Only a not-found of the system namespace itself qualifies.
//! - [`is_fatal`]: is this anything other than an "already exists" conflict?
//!
//! Retryability is checked first; a retryable error is also fatal by the second rule.
use thiserror::Error;

use crate::status::{Status, StatusExt};

/// The reserved namespace that must exist before most assets can be created
pub const SYSTEM_NAMESPACE: &str = "kube-system";

/// Plural resource name of namespaces, as reported in `Status` details
const NAMESPACES: &str = "namespaces";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single create call
#[derive(Error, Debug)]
pub enum CreateError {
    /// The apiserver answered with a failure `Status`
    #[error("ApiError: {}: {}", .0.message, .0.reason)]
    Api(Box<Status>),

    /// The request could not be built, sent, or its response read
    #[error("request failed: {0}")]
    Request(#[source] BoxError),
}

impl CreateError {
    /// Wrap a non-API failure
    pub fn request(err: impl Into<BoxError>) -> Self {
        CreateError::Request(err.into())
    }

    /// The apiserver `Status`, if the server answered
    pub fn status(&self) -> Option<&Status> {
        match self {
            CreateError::Api(status) => Some(status),
            CreateError::Request(_) => None,
        }
    }

    /// Whether the object being created is already present
    pub fn is_already_exists(&self) -> bool {
        self.status().is_some_and(Status::reports_already_exists)
    }

    /// Whether the target of the create was not found
    pub fn is_not_found(&self) -> bool {
        self.status().is_some_and(Status::reports_not_found)
    }
}

/// Whether `err` is the system namespace not existing yet
///
/// This is expected while the namespace propagates through a fresh control plane,
/// so polling continues. Every other not-found points at something genuinely missing.
pub fn is_retryable(err: &CreateError) -> bool {
    match err.status() {
        Some(status) if status.reports_not_found() => {
            status.target() == Some((NAMESPACES, SYSTEM_NAMESPACE))
        }
        _ => false,
    }
}

/// Whether `err` must abort the apply phase
///
/// "Already exists" is the only failure that is never fatal.
pub fn is_fatal(err: &CreateError) -> bool {
    !err.is_already_exists()
}
