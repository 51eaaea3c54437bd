//! Fixtures shared by the tests of this and dependent crates
use crate::{status::Status, Asset, CreateError, Placement, SourceRef};
use kube_core::{dynamic::ApiResource, response::StatusDetails, DynamicObject, GroupVersionKind};

/// A core group resource
pub fn resource(kind: &str, plural: &str) -> ApiResource {
    ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk("", "v1", kind), plural)
}

/// An asset in `kube-system` read from `/assets/<name>.yaml`
pub fn asset(name: &str, kind: &str, plural: &str) -> Asset {
    let ar = resource(kind, plural);
    let payload = DynamicObject::new(name, &ar).within("kube-system");
    let source = SourceRef::new(format!("/assets/{name}.yaml"), 0);
    Asset::new(payload, ar, Placement::Namespaced("kube-system".into()), source)
}

/// A failure status naming its target in the details block
pub fn status(reason: &str, code: u16, kind: &str, name: &str) -> CreateError {
    let details = StatusDetails {
        name: name.into(),
        group: String::new(),
        kind: kind.into(),
        uid: String::new(),
        causes: vec![],
        retry_after_seconds: 0,
    };
    let message = format!("{kind} \"{name}\" {reason}");
    CreateError::Api(Box::new(
        Status::failure(&message, reason).with_code(code).with_details(details),
    ))
}

/// The conflict returned for a service that is already present
pub fn exists(name: &str) -> CreateError {
    status("AlreadyExists", 409, "services", name)
}
