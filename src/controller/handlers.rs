//! Create and release the resources that back a claim.
//!
//! Creation goes through [`retry_mutate`]: "already exists" aborts the loop
//! and is handed back to the caller (the reconcile is requeued from outside),
//! anything else is logged and retried until the timeout.
//!
//! Release is not retried. The ConfigMap and Secret are owned by the claim, so
//! dropping their finalizer is enough for the garbage collector to remove
//! them. The ObjectBucket has no owner and is deleted by name.

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::{Resource, ResourceExt};
use tracing::{debug, info, instrument, warn};

use crate::config::ProvisionerConfig;
use crate::controller::error::{Error, Result, is_already_exists, is_not_found};
use crate::controller::retry::{Attempt, retry_mutate};
use crate::crd::{Authentication, Endpoint, ObjectBucket, ObjectBucketClaim};
use crate::resources::common::{add_finalizer, remove_finalizer};
use crate::resources::{build_config_map, build_credentials_secret};
use crate::store::ObjectStore;

/// Namespace-qualified display name
fn display_name<K: Resource>(obj: &K) -> String {
    let meta = obj.meta();
    let name = meta.name.as_deref().unwrap_or_default();
    match meta.namespace.as_deref() {
        Some(ns) => format!("{}/{}", ns, name),
        None => name.to_string(),
    }
}

/// Issue a single create under the retry policy
async fn create_with_retry<K, S>(
    obj: &K,
    kind: &'static str,
    store: &S,
    config: &ProvisionerConfig,
) -> Result<K>
where
    K: Resource + Send + Sync,
    S: ObjectStore<K> + ?Sized,
{
    let name = display_name(obj);
    let operation = format!("create {} {}", kind, name);

    retry_mutate(&config.retry, &operation, move || {
        let name = name.clone();
        async move {
            match store.create(obj).await {
                Ok(created) => Attempt::Done(created),
                // Someone already created it; don't spam the logs, let the
                // reconcile be requeued instead
                Err(e) if is_already_exists(&e) => {
                    Attempt::Abort(Error::AlreadyExists { kind, name, source: e })
                }
                Err(e) => {
                    warn!(kind, name = %name, error = %e, "Create failed, probably not fatal, retrying");
                    Attempt::Retry(Some(Error::KubeError(e)))
                }
            }
        }
    })
    .await
}

/// Create the ObjectBucket. The finalizer is ensured before the first call.
#[instrument(skip_all, fields(name = %bucket.name_any()))]
pub async fn create_object_bucket<S>(
    mut bucket: ObjectBucket,
    store: &S,
    config: &ProvisionerConfig,
) -> Result<ObjectBucket>
where
    S: ObjectStore<ObjectBucket> + ?Sized,
{
    info!("Creating ObjectBucket");
    add_finalizer(&mut bucket.metadata, &config.finalizer());
    create_with_retry(&bucket, "ObjectBucket", store, config).await
}

/// Build and create the credentials Secret for a claim
#[instrument(skip_all)]
pub async fn create_secret<S>(
    claim: Option<&ObjectBucketClaim>,
    auth: Option<&Authentication>,
    store: &S,
    config: &ProvisionerConfig,
) -> Result<Secret>
where
    S: ObjectStore<Secret> + ?Sized,
{
    let secret = build_credentials_secret(claim, auth, config)?;
    info!(secret = %display_name(&secret), "Creating credentials Secret");
    create_with_retry(&secret, "Secret", store, config).await
}

/// Build and create the connection info ConfigMap for a claim
#[instrument(skip_all)]
pub async fn create_config_map<S>(
    claim: Option<&ObjectBucketClaim>,
    endpoint: Option<&Endpoint>,
    store: &S,
    config: &ProvisionerConfig,
) -> Result<ConfigMap>
where
    S: ObjectStore<ConfigMap> + ?Sized,
{
    let config_map = build_config_map(endpoint, claim, config)?;
    info!(config_map = %display_name(&config_map), "Creating ConfigMap");
    create_with_retry(&config_map, "ConfigMap", store, config).await
}

/// Strip the finalizer and write the object back once
async fn release_owned<K, S>(obj: &K, store: &S, config: &ProvisionerConfig) -> Result<()>
where
    K: Resource + Clone + Send + Sync,
    S: ObjectStore<K> + ?Sized,
{
    let mut released = obj.clone();
    remove_finalizer(released.meta_mut(), &config.finalizer());
    store.replace(&released).await?;
    Ok(())
}

/// Release the ConfigMap. It is garbage collected once its finalizer is gone
/// because its owner reference points at the claim.
#[instrument(skip_all)]
pub async fn release_config_map<S>(
    config_map: Option<&ConfigMap>,
    store: &S,
    config: &ProvisionerConfig,
) -> Result<()>
where
    S: ObjectStore<ConfigMap> + ?Sized,
{
    let Some(config_map) = config_map else {
        debug!("Got no ConfigMap, skipping");
        return Ok(());
    };

    debug!(
        name = %display_name(config_map),
        "ConfigMap is garbage collected after its finalizer is removed"
    );
    release_owned(config_map, store, config).await
}

/// Release the credentials Secret; same lifecycle as the ConfigMap
#[instrument(skip_all)]
pub async fn release_secret<S>(
    secret: Option<&Secret>,
    store: &S,
    config: &ProvisionerConfig,
) -> Result<()>
where
    S: ObjectStore<Secret> + ?Sized,
{
    let Some(secret) = secret else {
        info!("Got no Secret, skipping");
        return Ok(());
    };

    debug!(
        name = %display_name(secret),
        "Secret is garbage collected after its finalizer is removed"
    );
    release_owned(secret, store, config).await
}

/// Remove the ObjectBucket's finalizer, then delete it.
///
/// A bucket that vanished before the delete landed counts as deleted.
#[instrument(skip_all)]
pub async fn delete_object_bucket<S>(
    bucket: Option<&ObjectBucket>,
    store: &S,
    config: &ProvisionerConfig,
) -> Result<()>
where
    S: ObjectStore<ObjectBucket> + ?Sized,
{
    let Some(bucket) = bucket else {
        return Ok(());
    };

    debug!(name = %bucket.name_any(), "Deleting ObjectBucket after its finalizer is removed");
    let mut released = bucket.clone();
    remove_finalizer(&mut released.metadata, &config.finalizer());
    let updated = store.replace(&released).await?;

    match store.delete(&updated).await {
        Ok(()) => Ok(()),
        Err(e) if is_not_found(&e) => {
            warn!(
                name = %updated.name_any(),
                "ObjectBucket vanished before we could delete it, skipping"
            );
            Ok(())
        }
        Err(e) => Err(Error::DeleteFailed {
            name: updated.name_any(),
            source: e,
        }),
    }
}
