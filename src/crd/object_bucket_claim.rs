//! ObjectBucketClaim CRD definition
//!
//! A claim is the user-facing request for a bucket. Creating one causes the
//! controller to provision a bucket and expose it to workloads in the claim's
//! namespace through a ConfigMap (connection info) and a Secret (credentials),
//! both named after the claim.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::BucketPhase;

/// ObjectBucketClaim is the Schema for the objectbucketclaims API
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "objectbucket.io",
    version = "v1alpha1",
    kind = "ObjectBucketClaim",
    plural = "objectbucketclaims",
    shortname = "obc",
    namespaced,
    status = "ObjectBucketClaimStatus",
    printcolumn = r#"{"name":"Storage-Class", "type":"string", "jsonPath":".spec.storageClassName"}"#,
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ObjectBucketClaimSpec {
    /// StorageClass naming the provisioner that serves this claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,

    /// Exact bucket name to request. Takes precedence over `generateBucketName`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,

    /// Prefix for a generated bucket name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_bucket_name: Option<String>,

    /// Provisioner specific parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_config: BTreeMap<String, String>,
}

/// Status of the ObjectBucketClaim resource
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectBucketClaimStatus {
    #[serde(default)]
    pub phase: BucketPhase,
}

impl ObjectBucketClaim {
    /// Current phase, `Pending` when no status has been written yet
    pub fn phase(&self) -> BucketPhase {
        self.status
            .as_ref()
            .map(|s| s.phase.clone())
            .unwrap_or_default()
    }
}
