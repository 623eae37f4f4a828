//! ObjectBucket CRD definition
//!
//! An ObjectBucket is the cluster-scoped record of a provisioned bucket. It
//! refers back to its claim but carries no owner reference (claims are
//! namespaced, buckets are not), so it is never garbage collected and must be
//! deleted explicitly during teardown.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Secret key holding the access key id when static keys are used
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";

/// Secret key holding the secret access key when static keys are used
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

/// ObjectBucket is the Schema for the objectbuckets API
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "objectbucket.io",
    version = "v1alpha1",
    kind = "ObjectBucket",
    plural = "objectbuckets",
    shortname = "ob",
    status = "ObjectBucketStatus",
    printcolumn = r#"{"name":"Storage-Class", "type":"string", "jsonPath":".spec.storageClassName"}"#,
    printcolumn = r#"{"name":"Claim-Namespace", "type":"string", "jsonPath":".spec.claimRef.namespace"}"#,
    printcolumn = r#"{"name":"Claim-Name", "type":"string", "jsonPath":".spec.claimRef.name"}"#,
    printcolumn = r#"{"name":"Reclaim-Policy", "type":"string", "jsonPath":".spec.reclaimPolicy"}"#,
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ObjectBucketSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,

    /// What happens to the physical bucket when the claim goes away
    #[serde(default)]
    pub reclaim_policy: ReclaimPolicy,

    /// The claim this bucket is bound to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_ref: Option<ClaimReference>,

    /// Connection details reported by the provisioner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<Connection>,
}

/// Back-reference from a bucket to its claim
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReference {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// Reclaim policy for the physical bucket
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
pub enum ReclaimPolicy {
    /// Delete the physical bucket along with the claim
    #[default]
    Delete,
    /// Keep the physical bucket after the claim is gone
    Retain,
}

/// Everything a workload needs to reach the bucket
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub endpoint: Endpoint,
    #[serde(default)]
    pub authentication: Authentication,
}

/// Network location of a bucket
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub bucket_host: String,
    pub bucket_port: i32,
    pub bucket_name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub sub_region: String,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_config: BTreeMap<String, String>,
}

/// Static access keys
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeys {
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Authentication material for a bucket. Both parts are optional; an empty
/// value means anonymous access.
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_keys: Option<AccessKeys>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_state: BTreeMap<String, String>,
}

impl Authentication {
    /// Flatten into the key/value pairs stored in the credentials Secret.
    ///
    /// Additional state is applied after the access keys and wins on collision.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        if let Some(keys) = &self.access_keys {
            map.insert(AWS_ACCESS_KEY_ID.to_string(), keys.access_key_id.clone());
            map.insert(
                AWS_SECRET_ACCESS_KEY.to_string(),
                keys.secret_access_key.clone(),
            );
        }
        for (k, v) in &self.additional_state {
            map.insert(k.clone(), v.clone());
        }
        map
    }
}

/// Status of the ObjectBucket resource
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectBucketStatus {
    #[serde(default)]
    pub phase: BucketPhase,
}

impl ObjectBucket {
    /// Current phase, `Pending` when no status has been written yet
    pub fn phase(&self) -> BucketPhase {
        self.status
            .as_ref()
            .map(|s| s.phase.clone())
            .unwrap_or_default()
    }
}

/// Lifecycle phase shared by claims and buckets
///
/// ```text
/// Pending -> Bound -> Released
///    \         |
///     `---> Failed
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq, Hash)]
pub enum BucketPhase {
    /// Waiting for the bucket to be provisioned
    #[default]
    Pending,
    /// Bucket provisioned and connection info published
    Bound,
    /// Claim deleted, bucket released
    Released,
    /// Provisioning failed
    Failed,
}

impl BucketPhase {
    /// Whether moving from `self` to `next` stays on the phase lattice.
    /// Rewriting the current phase is always allowed.
    pub fn can_transition_to(&self, next: &BucketPhase) -> bool {
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (BucketPhase::Pending, BucketPhase::Bound)
                | (BucketPhase::Pending, BucketPhase::Failed)
                | (BucketPhase::Bound, BucketPhase::Released)
                | (BucketPhase::Bound, BucketPhase::Failed)
        )
    }
}

impl std::fmt::Display for BucketPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BucketPhase::Pending => write!(f, "Pending"),
            BucketPhase::Bound => write!(f, "Bound"),
            BucketPhase::Released => write!(f, "Released"),
            BucketPhase::Failed => write!(f, "Failed"),
        }
    }
}
