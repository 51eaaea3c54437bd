//! Manifest-derived resource descriptors
use std::{fmt, path::PathBuf};

use kube_core::{dynamic::ApiResource, DynamicObject};

use crate::priority::PriorityKey;

/// Where an [`Asset`] is created
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Created inside the named namespace
    Namespaced(String),
    /// Created at cluster scope
    Cluster,
}

impl Placement {
    /// The target namespace, if any
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Placement::Namespaced(ns) => Some(ns),
            Placement::Cluster => None,
        }
    }
}

/// Provenance of an asset: the manifest file and the document index within it
///
/// Only used to annotate errors.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceRef {
    /// File the asset was decoded from
    pub path: PathBuf,
    /// Zero-based index of the YAML document inside `path`
    pub document: usize,
}

impl SourceRef {
    /// Reference a document in a manifest file
    pub fn new(path: impl Into<PathBuf>, document: usize) -> Self {
        Self {
            path: path.into(),
            document,
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.path.display(), self.document)
    }
}

/// One resource to be created against the apiserver
///
/// The `resource` field is the kind discriminator: every asset goes through the same
/// creation call, which uses it to address the right collection.
#[derive(Clone, Debug)]
pub struct Asset {
    /// Object name, unique within its kind and namespace
    pub name: String,
    /// Resolved api resource (group, version, kind, plural)
    pub resource: ApiResource,
    /// Target scope for creation
    pub placement: Placement,
    /// The object exactly as decoded from the manifest
    pub payload: DynamicObject,
    /// Where the asset came from
    pub source: SourceRef,
    /// The object returned by the apiserver once created
    pub created: Option<DynamicObject>,
}

impl Asset {
    /// Build an asset from a decoded object
    ///
    /// The name is taken from the payload's `metadata.name`, falling back to
    /// `metadata.generateName` for objects that let the apiserver pick one.
    pub fn new(payload: DynamicObject, resource: ApiResource, placement: Placement, source: SourceRef) -> Self {
        let name = payload
            .metadata
            .name
            .clone()
            .or_else(|| payload.metadata.generate_name.clone())
            .unwrap_or_default();
        Self {
            name,
            resource,
            placement,
            payload,
            source,
            created: None,
        }
    }

    /// Namespace the asset is created in, if it is namespaced
    pub fn namespace(&self) -> Option<&str> {
        self.placement.namespace()
    }

    /// The plural resource name, e.g. `services`
    pub fn plural(&self) -> &str {
        &self.resource.plural
    }

    /// The plural resource name with one trailing `s` removed, e.g. `service`
    ///
    /// Used both for display and for matching against a [`PriorityKey`].
    pub fn singular(&self) -> &str {
        let plural = self.plural();
        plural.strip_suffix('s').unwrap_or(plural)
    }

    /// Whether this asset is the one identified by `key`
    pub fn matches(&self, key: &PriorityKey) -> bool {
        self.name == key.name && self.singular() == key.kind
    }

    /// Record the object the apiserver returned from a successful create
    pub fn refresh(&mut self, created: DynamicObject) {
        self.created = Some(created);
    }

    /// Whether [`refresh`](Self::refresh) has been called
    pub fn is_created(&self) -> bool {
        self.created.is_some()
    }
}
