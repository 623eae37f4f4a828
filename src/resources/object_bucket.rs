//! ObjectBucket preparation and bucket naming

use kube::ResourceExt;
use rand::Rng;

use crate::config::ProvisionerConfig;
use crate::controller::error::{Error, Result};
use crate::crd::{ClaimReference, ObjectBucket, ObjectBucketClaim};
use crate::resources::common::{add_finalizer, claim_key, object_bucket_name, standard_labels};

/// Length of the random suffix appended to `generateBucketName`
const GENERATED_SUFFIX_LEN: usize = 5;

/// Resolve the physical bucket name for a claim.
///
/// `spec.bucketName` wins; otherwise `spec.generateBucketName` is extended
/// with a random lowercase suffix. A claim with neither is rejected.
pub fn bucket_name_for(claim: &ObjectBucketClaim) -> Result<String> {
    if let Some(name) = claim.spec.bucket_name.as_deref().filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }
    match claim
        .spec
        .generate_bucket_name
        .as_deref()
        .filter(|p| !p.is_empty())
    {
        Some(prefix) => Ok(format!("{}-{}", prefix, random_suffix(GENERATED_SUFFIX_LEN))),
        None => Err(Error::InvalidArgument(format!(
            "claim {} sets neither bucketName nor generateBucketName",
            claim.name_any()
        ))),
    }
}

fn random_suffix(len: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// Stamp a provisioner-returned bucket with what the controller relies on:
/// the derived `obc-<namespace>-<name>` name, the finalizer, a reference back
/// to the claim, and the claim's storage class when the provisioner left it
/// unset.
///
/// No owner reference is added; the bucket is cluster scoped and is deleted
/// explicitly on teardown.
pub fn prepare_object_bucket(
    mut bucket: ObjectBucket,
    claim: &ObjectBucketClaim,
    config: &ProvisionerConfig,
) -> Result<ObjectBucket> {
    let (namespace, name) = claim_key(claim)?;

    bucket.metadata.name = Some(object_bucket_name(&namespace, &name));
    bucket.metadata.namespace = None;
    bucket
        .metadata
        .labels
        .get_or_insert_with(Default::default)
        .extend(standard_labels(&name, &config.provisioner_name));
    add_finalizer(&mut bucket.metadata, &config.finalizer());

    bucket.spec.claim_ref = Some(ClaimReference {
        namespace,
        name,
        uid: claim.metadata.uid.clone(),
    });
    if bucket.spec.storage_class_name.is_none() {
        bucket.spec.storage_class_name = claim.spec.storage_class_name.clone();
    }

    Ok(bucket)
}
