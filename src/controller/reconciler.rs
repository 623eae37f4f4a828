//! Reconciliation logic for ObjectBucketClaim resources
//!
//! A live claim is driven to `Bound`: the bucket is provisioned (or the
//! existing ObjectBucket reused), then the Secret and ConfigMap are created
//! and both phases are written. A claim being deleted releases the Secret and
//! ConfigMap, deletes the ObjectBucket, and finally drops the claim's own
//! finalizer.

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::ResourceExt;
use kube::runtime::controller::Action;
use tracing::{debug, error, info, instrument, warn};

use crate::controller::context::Context;
use crate::controller::error::{BackoffConfig, Error, Result, is_not_found};
use crate::controller::handlers::{
    create_config_map, create_object_bucket, create_secret, delete_object_bucket,
    release_config_map, release_secret,
};
use crate::controller::phase::{set_bucket_phase, set_claim_phase};
use crate::crd::{BucketPhase, ObjectBucket, ObjectBucketClaim, ReclaimPolicy};
use crate::provisioner::{BucketOptions, Provisioner};
use crate::resources::common::{
    add_finalizer, claim_key, has_finalizer, object_bucket_name, remove_finalizer,
};
use crate::resources::{bucket_name_for, prepare_object_bucket};
use crate::store::ObjectStore;

/// Fetch an object, mapping 404 to `None`
async fn get_optional<K, S>(store: &S, namespace: Option<&str>, name: &str) -> Result<Option<K>>
where
    K: Send + Sync,
    S: ObjectStore<K> + ?Sized,
{
    match store.get(namespace, name).await {
        Ok(obj) => Ok(Some(obj)),
        Err(e) if is_not_found(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Main reconciliation function
#[instrument(skip(claim, ctx), fields(name = %claim.name_any(), namespace = claim.namespace().unwrap_or_default()))]
pub async fn reconcile<P>(claim: Arc<ObjectBucketClaim>, ctx: Arc<Context<P>>) -> Result<Action>
where
    P: Provisioner,
{
    let (ns, name) = claim_key(&claim)?;
    info!("Reconciling ObjectBucketClaim");

    if claim.metadata.deletion_timestamp.is_some() {
        return handle_deletion(&claim, &ctx, &ns, &name).await;
    }

    let finalizer = ctx.config.finalizer();
    if !has_finalizer(&claim.metadata, &finalizer) {
        let mut updated = (*claim).clone();
        add_finalizer(&mut updated.metadata, &finalizer);
        ctx.clientset.claims.replace(&updated).await?;
        info!("Added finalizer to {}/{}", ns, name);
        return Ok(Action::requeue(Duration::from_secs(1)));
    }

    match claim.phase() {
        BucketPhase::Pending => {}
        phase => {
            debug!(phase = %phase, "Nothing to do for claim");
            return Ok(Action::await_change());
        }
    }

    match provision_claim(&claim, &ctx, &ns, &name).await {
        Ok(()) => {
            info!("Claim {}/{} bound", ns, name);
            Ok(Action::await_change())
        }
        Err(e) if e.is_retryable() => Err(e),
        Err(e) => {
            error!("Provisioning failed permanently: {}", e);
            // The Pending write above moved the resourceVersion on
            let latest = match ctx.clientset.claims.get(Some(&ns), &name).await {
                Ok(latest) => latest,
                Err(get_err) => {
                    debug!(error = %get_err, "Could not re-read claim, using cached copy");
                    (*claim).clone()
                }
            };
            if let Err(phase_err) =
                set_claim_phase(&*ctx.clientset.claims, latest, BucketPhase::Failed, &ctx.config)
                    .await
            {
                warn!("Could not mark claim failed: {}", phase_err);
            }
            Err(e)
        }
    }
}

/// Error policy for the controller.
///
/// The attempt count is not tracked across reconciles, so a retryable error
/// always waits the first backoff step (`initial_delay` with jitter) and a
/// permanent one waits `max_delay`.
pub fn error_policy<P>(claim: Arc<ObjectBucketClaim>, error: &Error, _ctx: Arc<Context<P>>) -> Action {
    let name = claim.name_any();
    let delay = BackoffConfig::default().delay_for_error(error, 0);

    if error.is_retryable() {
        warn!(
            "Retryable error for {}: {:?}, requeuing in {:?}",
            name, error, delay
        );
    } else {
        error!(
            "Non-retryable error for {}: {:?}, requeuing in {:?} for manual intervention",
            name, error, delay
        );
    }

    Action::requeue(delay)
}

/// Drive a pending claim to `Bound`. Every step tolerates work left behind
/// by an earlier, interrupted pass.
async fn provision_claim<P>(
    claim: &ObjectBucketClaim,
    ctx: &Context<P>,
    ns: &str,
    name: &str,
) -> Result<()>
where
    P: Provisioner,
{
    let config = &ctx.config;
    let clientset = &ctx.clientset;

    let claim = if claim.status.is_none() {
        set_claim_phase(&*clientset.claims, claim.clone(), BucketPhase::Pending, config).await?
    } else {
        claim.clone()
    };

    let bucket = ensure_object_bucket(&claim, ctx, ns, name).await?;
    let connection = bucket
        .spec
        .connection
        .clone()
        .ok_or(Error::MissingObjectKey("ObjectBucket.spec.connection"))?;

    match create_secret(
        Some(&claim),
        Some(&connection.authentication),
        &*clientset.secrets,
        config,
    )
    .await
    {
        Ok(_) => {}
        Err(Error::AlreadyExists { .. }) => debug!("Secret {}/{} already exists", ns, name),
        Err(e) => return Err(e),
    }

    match create_config_map(
        Some(&claim),
        Some(&connection.endpoint),
        &*clientset.config_maps,
        config,
    )
    .await
    {
        Ok(_) => {}
        Err(Error::AlreadyExists { .. }) => debug!("ConfigMap {}/{} already exists", ns, name),
        Err(e) => return Err(e),
    }

    if bucket.phase() != BucketPhase::Bound {
        set_bucket_phase(&*clientset.buckets, bucket, BucketPhase::Bound, config).await?;
    }
    set_claim_phase(&*clientset.claims, claim, BucketPhase::Bound, config).await?;

    Ok(())
}

/// Return the claim's ObjectBucket, provisioning and creating it if needed
async fn ensure_object_bucket<P>(
    claim: &ObjectBucketClaim,
    ctx: &Context<P>,
    ns: &str,
    name: &str,
) -> Result<ObjectBucket>
where
    P: Provisioner,
{
    let buckets = &*ctx.clientset.buckets;
    let ob_name = object_bucket_name(ns, name);

    if let Some(existing) = get_optional::<ObjectBucket, _>(buckets, None, &ob_name).await? {
        debug!("Reusing ObjectBucket {}", ob_name);
        return Ok(existing);
    }

    let options = BucketOptions {
        bucket_name: bucket_name_for(claim)?,
        object_bucket_name: ob_name.clone(),
        storage_class_name: claim.spec.storage_class_name.clone(),
        parameters: claim.spec.additional_config.clone(),
        claim: claim.clone(),
    };
    info!(bucket = %options.bucket_name, "Provisioning bucket");
    let provisioned = ctx.provisioner.provision(&options).await?;
    let bucket = prepare_object_bucket(provisioned, claim, &ctx.config)?;

    match create_object_bucket(bucket.clone(), buckets, &ctx.config).await {
        Ok(created) => Ok(created),
        Err(Error::AlreadyExists { .. }) => Ok(buckets.get(None, &ob_name).await?),
        Err(e) => {
            // Nothing records the provisioned bucket yet; the next pass would
            // provision another one
            warn!(bucket = %options.bucket_name, error = %e, "Releasing unrecorded bucket");
            if let Err(delete_err) = ctx.provisioner.delete(&bucket).await {
                warn!(
                    bucket = %options.bucket_name,
                    error = %delete_err,
                    "Could not release unrecorded bucket"
                );
            }
            Err(e)
        }
    }
}

/// Handle deletion of an ObjectBucketClaim
async fn handle_deletion<P>(
    claim: &ObjectBucketClaim,
    ctx: &Context<P>,
    ns: &str,
    name: &str,
) -> Result<Action>
where
    P: Provisioner,
{
    info!("Handling deletion of {}/{}", ns, name);
    let config = &ctx.config;
    let clientset = &ctx.clientset;
    let finalizer = config.finalizer();

    // Only touch dependents that still carry our finalizer
    let config_map = get_optional::<ConfigMap, _>(&*clientset.config_maps, Some(ns), name)
        .await?
        .filter(|cm| has_finalizer(&cm.metadata, &finalizer));
    release_config_map(config_map.as_ref(), &*clientset.config_maps, config).await?;

    let secret = get_optional::<Secret, _>(&*clientset.secrets, Some(ns), name)
        .await?
        .filter(|s| has_finalizer(&s.metadata, &finalizer));
    release_secret(secret.as_ref(), &*clientset.secrets, config).await?;

    let ob_name = object_bucket_name(ns, name);
    if let Some(bucket) = get_optional::<ObjectBucket, _>(&*clientset.buckets, None, &ob_name).await? {
        let bucket = set_bucket_phase(&*clientset.buckets, bucket, BucketPhase::Released, config)
            .await?;
        if bucket.spec.reclaim_policy == ReclaimPolicy::Delete {
            info!("Deleting physical bucket for {}", ob_name);
            ctx.provisioner.delete(&bucket).await?;
        }
        delete_object_bucket(Some(&bucket), &*clientset.buckets, config).await?;
    }

    if has_finalizer(&claim.metadata, &finalizer) {
        let mut latest = match set_claim_phase(
            &*clientset.claims,
            claim.clone(),
            BucketPhase::Released,
            config,
        )
        .await
        {
            Ok(updated) => updated,
            Err(e) => {
                warn!("Could not mark claim released: {}", e);
                claim.clone()
            }
        };
        remove_finalizer(&mut latest.metadata, &finalizer);
        match clientset.claims.replace(&latest).await {
            Ok(_) => info!("Removed finalizer from {}/{}", ns, name),
            Err(e) if is_not_found(&e) => debug!("Claim {}/{} already gone", ns, name),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(Action::await_change())
}
