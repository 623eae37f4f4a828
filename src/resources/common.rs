//! Common utilities for Kubernetes resource generation
//!
//! Shared helpers used by every generator so that finalizers, owner
//! references and labels look the same on all generated objects.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::ResourceExt;

use crate::controller::error::{Error, Result};
use crate::crd::ObjectBucketClaim;

/// API version for the ObjectBucketClaim CRD
pub const API_VERSION: &str = "objectbucket.io/v1alpha1";

/// Kind for the ObjectBucketClaim CRD
pub const KIND: &str = "ObjectBucketClaim";

/// Generate an owner reference pointing at a claim
///
/// Namespaced children carrying this reference are garbage collected once the
/// claim is gone and their own finalizer has been removed.
pub fn owner_reference(claim: &ObjectBucketClaim) -> OwnerReference {
    OwnerReference {
        api_version: API_VERSION.to_string(),
        kind: KIND.to_string(),
        name: claim.name_any(),
        uid: claim.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Name of the ObjectBucket bound to a claim: `obc-<namespace>-<name>`
pub fn object_bucket_name(namespace: &str, claim_name: &str) -> String {
    format!("obc-{}-{}", namespace, claim_name)
}

/// Namespace and name of a claim, or `InvalidArgument` when either is unset
pub fn claim_key(claim: &ObjectBucketClaim) -> Result<(String, String)> {
    let name = claim
        .metadata
        .name
        .clone()
        .ok_or_else(|| Error::InvalidArgument("claim has no name".to_string()))?;
    let namespace = claim.namespace().ok_or_else(|| {
        Error::InvalidArgument(format!("claim {} has no namespace", name))
    })?;
    Ok((namespace, name))
}

/// Standard labels for resources generated for a claim
pub fn standard_labels(claim_name: &str, provisioner_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "app.kubernetes.io/managed-by".to_string(),
            provisioner_name.to_string(),
        ),
        (
            "objectbucket.io/claim".to_string(),
            claim_name.to_string(),
        ),
    ])
}

pub fn has_finalizer(meta: &ObjectMeta, finalizer: &str) -> bool {
    meta.finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == finalizer))
}

/// Add the finalizer unless it is already present
pub fn add_finalizer(meta: &mut ObjectMeta, finalizer: &str) {
    if !has_finalizer(meta, finalizer) {
        meta.finalizers
            .get_or_insert_with(Vec::new)
            .push(finalizer.to_string());
    }
}

/// Drop every occurrence of the finalizer, leaving others untouched
pub fn remove_finalizer(meta: &mut ObjectMeta, finalizer: &str) {
    if let Some(finalizers) = meta.finalizers.as_mut() {
        finalizers.retain(|f| f != finalizer);
    }
}
