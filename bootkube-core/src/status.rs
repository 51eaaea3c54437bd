//! Reading failure [`Status`] objects returned by the apiserver
pub use kube_core::response::{Status, StatusCause, StatusDetails};

/// Reason set on `Status` objects when the target does not exist
pub const REASON_NOT_FOUND: &str = "NotFound";
/// Reason set on `Status` objects when the object being created is already present
pub const REASON_ALREADY_EXISTS: &str = "AlreadyExists";

/// Synthesize a failure status for an error response whose body was not a `Status` object
///
/// The reason is derived from the HTTP code where the apiserver would have set one.
pub fn from_code(code: u16, message: &str) -> Status {
    let reason = match code {
        404 => REASON_NOT_FOUND,
        409 => REASON_ALREADY_EXISTS,
        _ => "",
    };
    Status::failure(message, reason).with_code(code)
}

/// Failure predicates over a [`Status`]
pub trait StatusExt {
    /// Whether the target of the request was not found
    fn reports_not_found(&self) -> bool;

    /// Whether the object being created already exists
    fn reports_already_exists(&self) -> bool;

    /// The `(kind, name)` pair from the details block, if both are set
    ///
    /// For not-found errors the kind is the plural resource name, e.g. `namespaces`.
    fn target(&self) -> Option<(&str, &str)>;
}

impl StatusExt for Status {
    fn reports_not_found(&self) -> bool {
        self.reason == REASON_NOT_FOUND
    }

    fn reports_already_exists(&self) -> bool {
        self.reason == REASON_ALREADY_EXISTS
    }

    fn target(&self) -> Option<(&str, &str)> {
        let details = self.details.as_ref()?;
        if details.kind.is_empty() || details.name.is_empty() {
            return None;
        }
        Some((&details.kind, &details.name))
    }
}
