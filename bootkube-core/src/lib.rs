//! Building blocks for bootstrapping a self-hosted Kubernetes control plane
//!
//! This crate contains the client-free pieces of the bootstrapper:
//!
//! - [`asset`] with the [`Asset`] type describing one manifest-derived object
//! - [`priority`] for forcing one designated asset to the front of the creation order
//! - [`status`] for reading the API [`Status`](status::Status) returned by failed requests
//! - [`classify`] for deciding whether a creation failure is transient, expected or fatal
//!
//! The runtime that drives these against a live apiserver lives in the `bootkube` crate.

pub mod asset;
pub use asset::{Asset, Placement, SourceRef};

pub mod classify;
pub use classify::CreateError;

pub mod priority;
pub use priority::{prioritize, Prioritized, PriorityKey, PriorityMissing};

pub mod status;
pub use status::{Status, StatusExt};

#[cfg(any(test, feature = "testing"))]
#[doc(hidden)]
pub mod test_util;
