//! Phase updates for claims and buckets
//!
//! The phase is written into the in-memory status and the status is then
//! replaced under the retry policy. Every failure is treated as transient:
//! a resourceVersion conflict from a concurrent writer is expected, and the
//! surrounding reconcile refetches state on its next pass.

use kube::{Resource, ResourceExt};
use tracing::{debug, instrument, warn};

use crate::config::ProvisionerConfig;
use crate::controller::error::{Error, Result};
use crate::controller::retry::{Attempt, retry_mutate};
use crate::crd::{
    BucketPhase, ObjectBucket, ObjectBucketClaim, ObjectBucketClaimStatus, ObjectBucketStatus,
};
use crate::store::ObjectStore;

async fn update_status_with_retry<K, S>(
    obj: &K,
    phase: &BucketPhase,
    store: &S,
    config: &ProvisionerConfig,
) -> Result<K>
where
    K: Resource + Send + Sync,
    S: ObjectStore<K> + ?Sized,
{
    let name = match obj.meta().namespace.as_deref() {
        Some(ns) => format!("{}/{}", ns, obj.name_any()),
        None => obj.name_any(),
    };
    let operation = format!("update phase of {} to {}", name, phase);

    retry_mutate(&config.retry, &operation, move || async move {
        match store.replace_status(obj).await {
            Ok(updated) => Attempt::Done(updated),
            Err(e) => {
                debug!(error = %e, "Phase update failed, retrying");
                Attempt::Retry(Some(Error::KubeError(e)))
            }
        }
    })
    .await
    .map_err(|e| Error::PhaseUpdateFailed {
        name,
        phase: phase.to_string(),
        source: Box::new(e),
    })
}

fn warn_if_off_lattice(name: &str, current: &BucketPhase, next: &BucketPhase) {
    if !current.can_transition_to(next) {
        warn!(
            name = %name,
            from = %current,
            to = %next,
            "Unexpected phase transition"
        );
    }
}

/// Set and persist the claim's phase
#[instrument(skip_all, fields(name = %claim.name_any(), phase = %phase))]
pub async fn set_claim_phase<S>(
    store: &S,
    mut claim: ObjectBucketClaim,
    phase: BucketPhase,
    config: &ProvisionerConfig,
) -> Result<ObjectBucketClaim>
where
    S: ObjectStore<ObjectBucketClaim> + ?Sized,
{
    warn_if_off_lattice(&claim.name_any(), &claim.phase(), &phase);
    claim
        .status
        .get_or_insert_with(ObjectBucketClaimStatus::default)
        .phase = phase.clone();
    update_status_with_retry(&claim, &phase, store, config).await
}

/// Set and persist the bucket's phase
#[instrument(skip_all, fields(name = %bucket.name_any(), phase = %phase))]
pub async fn set_bucket_phase<S>(
    store: &S,
    mut bucket: ObjectBucket,
    phase: BucketPhase,
    config: &ProvisionerConfig,
) -> Result<ObjectBucket>
where
    S: ObjectStore<ObjectBucket> + ?Sized,
{
    warn_if_off_lattice(&bucket.name_any(), &bucket.phase(), &phase);
    bucket
        .status
        .get_or_insert_with(ObjectBucketStatus::default)
        .phase = phase.clone();
    update_status_with_retry(&bucket, &phase, store, config).await
}
