//! Storage backend capability
//!
//! The controller never talks to a storage backend itself. A crate user
//! implements [`Provisioner`] for their backend and hands it to
//! [`run_controller`](crate::run_controller).

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::controller::error::Result;
use crate::crd::{ObjectBucket, ObjectBucketClaim};

/// Everything the backend needs to provision a bucket for a claim
#[derive(Clone, Debug)]
pub struct BucketOptions {
    /// Physical bucket name, already resolved from the claim
    pub bucket_name: String,
    /// Name the ObjectBucket record will be stored under
    pub object_bucket_name: String,
    pub storage_class_name: Option<String>,
    /// Provisioner specific parameters from the claim
    pub parameters: BTreeMap<String, String>,
    pub claim: ObjectBucketClaim,
}

#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Provision a bucket and describe it.
    ///
    /// The returned ObjectBucket should carry the connection (endpoint and
    /// authentication). Name, finalizer and claim reference are filled in by
    /// the controller.
    async fn provision(&self, options: &BucketOptions) -> Result<ObjectBucket>;

    /// Remove the physical bucket. Only called for the `Delete` reclaim policy.
    async fn delete(&self, bucket: &ObjectBucket) -> Result<()>;
}
