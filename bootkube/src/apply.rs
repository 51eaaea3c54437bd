//! Creating the prioritized asset sequence
use std::future::Future;

use bootkube_core::{classify, prioritize, Asset, CreateError, Prioritized, PriorityKey, SourceRef};
use kube::api::DynamicObject;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{manifest::LoadError, progress::ProgressSink};

/// Supplies the unordered asset sequence for one apply attempt
pub trait AssetLoader {
    /// Load and decode every asset
    fn load(&self) -> impl Future<Output = Result<Vec<Asset>, LoadError>>;
}

/// The creation call against the apiserver
pub trait AssetCreator {
    /// Create `asset.payload` in the asset's namespace, returning the stored object
    fn create(&self, asset: &Asset) -> impl Future<Output = Result<DynamicObject, CreateError>>;
}

impl<L: AssetLoader + ?Sized> AssetLoader for &L {
    fn load(&self) -> impl Future<Output = Result<Vec<Asset>, LoadError>> {
        (**self).load()
    }
}

impl<C: AssetCreator + ?Sized> AssetCreator for &C {
    fn create(&self, asset: &Asset) -> impl Future<Output = Result<DynamicObject, CreateError>> {
        (**self).create(asset)
    }
}

/// What to do when an asset already exists
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Treat the whole apply phase as complete and create nothing further
    #[default]
    Finish,
    /// Count the asset as existing and carry on with the next one
    Skip,
}

/// Failure of one apply attempt
#[derive(Error, Debug)]
pub enum ApplyError {
    /// The asset sequence could not be loaded
    #[error("failed to load assets")]
    Load(#[source] LoadError),

    /// The apiserver rejected an asset
    #[error("error when creating \"{source_ref}\"")]
    Create {
        /// Asset provenance
        source_ref: SourceRef,
        /// Underlying failure
        #[source]
        source: CreateError,
    },

    /// The manifests yielded nothing to create
    #[error("no objects passed to create")]
    NothingCreated,
}

impl ApplyError {
    /// The creation failure, if this error came from the apiserver call
    pub fn create_error(&self) -> Option<&CreateError> {
        match self {
            ApplyError::Create { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether polling should try the apply phase again
    ///
    /// Only the transient not-found of the system namespace qualifies; see [`classify::is_retryable`].
    pub fn is_retryable(&self) -> bool {
        self.create_error().is_some_and(classify::is_retryable)
    }
}

/// Result of a successful apply attempt
#[derive(Debug, Default)]
pub struct Applied {
    /// Assets in the order they were attempted, with created objects refreshed in
    pub assets: Vec<Asset>,
    /// Number of assets created by this attempt
    pub created: usize,
    /// Number of assets skipped because they already existed
    pub existing: usize,
    /// Set when an existing asset ended the phase under [`ConflictPolicy::Finish`]
    pub finished_early: bool,
}

/// Creates every asset in priority order
pub struct AssetApplier<'a, L, C, P> {
    loader: &'a L,
    creator: &'a C,
    progress: &'a P,
    priority: &'a PriorityKey,
    conflicts: ConflictPolicy,
}

impl<'a, L, C, P> AssetApplier<'a, L, C, P>
where
    L: AssetLoader,
    C: AssetCreator,
    P: ProgressSink,
{
    /// Applier with the default [`ConflictPolicy`]
    pub fn new(loader: &'a L, creator: &'a C, progress: &'a P, priority: &'a PriorityKey) -> Self {
        Self {
            loader,
            creator,
            progress,
            priority,
            conflicts: ConflictPolicy::default(),
        }
    }

    /// Choose how already existing assets are handled
    #[must_use]
    pub fn conflicts(mut self, policy: ConflictPolicy) -> Self {
        self.conflicts = policy;
        self
    }

    /// Load, prioritize and create all assets once
    ///
    /// # Errors
    ///
    /// Load failures are returned unchanged. A failed create is annotated with the asset's
    /// source and returned without attempting later assets. If nothing was created (and
    /// nothing already existed), [`ApplyError::NothingCreated`] is returned.
    pub async fn apply(&self) -> Result<Applied, ApplyError> {
        let assets = self.loader.load().await.map_err(ApplyError::Load)?;
        let Prioritized { assets, missing } = prioritize(assets, self.priority);
        if let Some(missing) = missing {
            warn!(error = %missing, "Asset ordering failed");
        }

        let mut applied = Applied {
            assets,
            ..Applied::default()
        };
        for asset in &mut applied.assets {
            match self.creator.create(asset).await {
                Ok(obj) => {
                    asset.refresh(obj);
                    applied.created += 1;
                    info!(name = %asset.name, kind = %asset.singular(), namespace = ?asset.namespace(), "created");
                    self.progress
                        .line(&format!("\tcreated {:>23} {}", asset.name, asset.singular()));
                }
                Err(err) if !classify::is_fatal(&err) => match self.conflicts {
                    ConflictPolicy::Finish => {
                        debug!(name = %asset.name, kind = %asset.singular(), "asset exists, assuming assets are in place");
                        applied.finished_early = true;
                        break;
                    }
                    ConflictPolicy::Skip => {
                        info!(name = %asset.name, kind = %asset.singular(), "asset exists, skipping");
                        applied.existing += 1;
                    }
                },
                Err(source) => {
                    return Err(ApplyError::Create {
                        source_ref: asset.source.clone(),
                        source,
                    });
                }
            }
        }

        if !applied.finished_early && applied.created + applied.existing == 0 {
            return Err(ApplyError::NothingCreated);
        }
        Ok(applied)
    }
}
