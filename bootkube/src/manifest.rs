//! Reading and decoding manifest directories
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use bootkube_core::SourceRef;
use kube::api::{DynamicObject, GroupVersionKind};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// File extensions picked up from the manifest directory
const EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Failure to produce the asset sequence
///
/// Always fatal: the apply phase is not retried after a load error.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The manifest directory could not be listed
    #[error("failed to read manifest directory {}", .path.display())]
    ReadDir {
        /// Directory being listed
        path: PathBuf,
        /// Underlying io error
        source: io::Error,
    },

    /// A manifest file could not be read
    #[error("failed to read manifest {}", .path.display())]
    ReadFile {
        /// File being read
        path: PathBuf,
        /// Underlying io error
        source: io::Error,
    },

    /// A document is not valid YAML, or not shaped like a Kubernetes object
    #[error("failed to decode {source_ref}")]
    Decode {
        /// Offending document
        source_ref: SourceRef,
        /// Underlying decode error
        source: serde_yaml::Error,
    },

    /// The apiserver does not know the kind of a document
    #[error("unable to resolve {kind} in {api_version} for {source_ref}")]
    Discovery {
        /// `apiVersion` of the document
        api_version: String,
        /// `kind` of the document
        kind: String,
        /// First document that needed it
        source_ref: SourceRef,
        /// Underlying discovery error
        source: kube::Error,
    },
}

/// One decoded document that still needs its resource resolved
#[derive(Clone, Debug)]
pub struct Manifest {
    /// The object as written in the file
    pub object: DynamicObject,
    /// Parsed from the object's `apiVersion` and `kind`
    pub gvk: GroupVersionKind,
    /// Where the document came from
    pub source: SourceRef,
}

/// Decode every manifest file directly inside `dir`
///
/// Files are read in lexical order of their names; subdirectories are not descended into.
pub fn read_dir(dir: &Path) -> Result<Vec<Manifest>, LoadError> {
    let read_dir_err = |source| LoadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let path = entry.map_err(read_dir_err)?.path();
        if path.is_file() && is_manifest(&path) {
            paths.push(path);
        } else {
            debug!(path = %path.display(), "ignoring non-manifest entry");
        }
    }
    paths.sort();

    let mut manifests = Vec::new();
    for path in paths {
        let text = fs::read_to_string(&path).map_err(|source| LoadError::ReadFile {
            path: path.clone(),
            source,
        })?;
        manifests.extend(decode(&path, &text)?);
    }
    Ok(manifests)
}

fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext))
}

/// Decode a (possibly multi-document) YAML or JSON text
///
/// Empty documents are skipped. Documents without a usable `apiVersion`/`kind` are logged
/// and skipped; invalid YAML is an error.
pub fn decode(path: &Path, text: &str) -> Result<Vec<Manifest>, LoadError> {
    let mut manifests = Vec::new();
    for (document, de) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let source = SourceRef::new(path, document);
        let value = serde_yaml::Value::deserialize(de).map_err(|err| LoadError::Decode {
            source_ref: source.clone(),
            source: err,
        })?;
        if value.is_null() {
            continue;
        }
        let object: DynamicObject = serde_yaml::from_value(value).map_err(|err| LoadError::Decode {
            source_ref: source.clone(),
            source: err,
        })?;
        let gvk = object
            .types
            .as_ref()
            .and_then(|tm| GroupVersionKind::try_from(tm).ok())
            .filter(|gvk| !gvk.version.is_empty() && !gvk.kind.is_empty());
        let Some(gvk) = gvk else {
            warn!(%source, "skipping document without a usable apiVersion/kind");
            continue;
        };
        manifests.push(Manifest { object, gvk, source });
    }
    Ok(manifests)
}
