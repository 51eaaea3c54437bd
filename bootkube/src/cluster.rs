//! Collaborators backed by a live apiserver
use std::{collections::HashMap, path::PathBuf};

use bootkube_core::{status, Asset, CreateError, Placement, Status};
use http_body_util::BodyExt;
use kube::{
    api::{ApiResource, DynamicObject, GroupVersionKind, PostParams, Request, Resource},
    client::Body,
    discovery::{self, ApiCapabilities, Scope},
    Client,
};
use tracing::{debug, trace};

use crate::{
    apply::{AssetCreator, AssetLoader},
    bootstrap::ReadinessProbe,
    manifest::{self, LoadError},
};

/// Readiness checks and object creation through a [`Client`]
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Wrap a client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The wrapped client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl ReadinessProbe for KubeCluster {
    type Error = kube::Error;

    async fn server_version(&self) -> Result<(), kube::Error> {
        let info = self.client.apiserver_version().await?;
        debug!(version = %info.git_version, platform = %info.platform, "apiserver responded");
        Ok(())
    }
}

impl AssetCreator for KubeCluster {
    /// POST the payload to the asset's collection
    ///
    /// This goes below [`kube::Api`] so that failure `Status` bodies keep their `details`.
    async fn create(&self, asset: &Asset) -> Result<DynamicObject, CreateError> {
        let url = DynamicObject::url_path(&asset.resource, asset.namespace());
        let data = serde_json::to_vec(&asset.payload).map_err(CreateError::request)?;
        let req = Request::new(url)
            .create(&PostParams::default(), data)
            .map_err(CreateError::request)?;
        trace!(uri = %req.uri(), name = %asset.name, "creating");

        let res = self
            .client
            .send(req.map(Body::from))
            .await
            .map_err(CreateError::request)?;
        let code = res.status();
        let body = res
            .into_body()
            .collect()
            .await
            .map_err(CreateError::request)?
            .to_bytes();

        if code.is_client_error() || code.is_server_error() {
            let mut failure = serde_json::from_slice::<Status>(&body)
                .unwrap_or_else(|_| status::from_code(code.as_u16(), &String::from_utf8_lossy(&body)));
            if failure.code == 0 {
                failure.code = code.as_u16();
            }
            if failure.reason.is_empty() {
                failure.reason = status::from_code(code.as_u16(), "").reason;
            }
            debug!(code = failure.code, reason = %failure.reason, name = %asset.name, "create failed");
            return Err(CreateError::Api(Box::new(failure)));
        }
        serde_json::from_slice(&body).map_err(CreateError::request)
    }
}

/// Loads assets from a manifest directory, resolving kinds through discovery
pub struct ManifestLoader {
    client: Client,
    dir: PathBuf,
    default_namespace: String,
}

impl ManifestLoader {
    /// Loader for the manifests directly inside `dir`, defaulting to the `default` namespace
    pub fn new(client: Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dir: dir.into(),
            default_namespace: "default".into(),
        }
    }

    /// Namespace for namespaced documents that do not name one
    #[must_use]
    pub fn default_namespace(mut self, ns: impl Into<String>) -> Self {
        self.default_namespace = ns.into();
        self
    }
}

impl AssetLoader for ManifestLoader {
    /// Read the directory and resolve every document to an api resource
    ///
    /// Each distinct kind is resolved once per load. Namespaced documents that name no
    /// namespace go to the configured default namespace.
    async fn load(&self) -> Result<Vec<Asset>, LoadError> {
        let manifests = manifest::read_dir(&self.dir)?;
        let mut resolved: HashMap<GroupVersionKind, (ApiResource, ApiCapabilities)> = HashMap::new();
        let mut assets = Vec::with_capacity(manifests.len());
        for m in manifests {
            let (ar, caps) = match resolved.get(&m.gvk) {
                Some(hit) => hit.clone(),
                None => {
                    let hit = discovery::pinned_kind(&self.client, &m.gvk).await.map_err(|source| {
                        LoadError::Discovery {
                            api_version: m.gvk.api_version(),
                            kind: m.gvk.kind.clone(),
                            source_ref: m.source.clone(),
                            source,
                        }
                    })?;
                    resolved.insert(m.gvk.clone(), hit.clone());
                    hit
                }
            };
            let placement = match caps.scope {
                Scope::Cluster => Placement::Cluster,
                Scope::Namespaced => Placement::Namespaced(
                    m.object
                        .metadata
                        .namespace
                        .clone()
                        .unwrap_or_else(|| self.default_namespace.clone()),
                ),
            };
            assets.push(Asset::new(m.object, ar, placement, m.source));
        }
        debug!(count = assets.len(), dir = %self.dir.display(), "loaded assets");
        Ok(assets)
    }
}
