//! Test fixtures and builders for claims, buckets and connection descriptors
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let claim = create_test_claim("my-claim", "ns");
//! let claim = ObjectBucketClaimBuilder::new("my-claim", "ns")
//!     .with_generate_bucket_name("photos")
//!     .with_storage_class("s3-buckets")
//!     .build();
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bucket_provisioner::crd::{
    AccessKeys, Authentication, Connection, Endpoint, ObjectBucket, ObjectBucketClaim,
    ObjectBucketClaimSpec, ObjectBucketSpec, ReclaimPolicy,
};
use bucket_provisioner::{BucketOptions, Error, Provisioner, ProvisionerConfig, Result};
use kube::core::ObjectMeta;

// =============================================================================
// Convenience Functions for Simple Test Cases
// =============================================================================

/// Claim `namespace/name` requesting a bucket called `b1`
pub fn create_test_claim(name: &str, namespace: &str) -> ObjectBucketClaim {
    ObjectBucketClaimBuilder::new(name, namespace)
        .with_bucket_name("b1")
        .with_uid("claim-uid-12345")
        .build()
}

/// The endpoint used throughout the end-to-end scenarios
pub fn create_test_endpoint() -> Endpoint {
    Endpoint {
        bucket_host: "s3.example.com".to_string(),
        bucket_port: 443,
        bucket_name: "b1".to_string(),
        region: "us-east".to_string(),
        sub_region: String::new(),
        ssl: true,
        additional_config: BTreeMap::new(),
    }
}

pub fn create_test_auth() -> Authentication {
    Authentication {
        access_keys: Some(AccessKeys {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI".to_string(),
        }),
        additional_state: BTreeMap::new(),
    }
}

/// A bucket as a provisioner would hand it back, before the controller
/// stamps name, finalizer and claim reference onto it
pub fn create_provisioned_bucket(endpoint: Endpoint, auth: Authentication) -> ObjectBucket {
    ObjectBucket {
        metadata: ObjectMeta::default(),
        spec: ObjectBucketSpec {
            storage_class_name: None,
            reclaim_policy: ReclaimPolicy::Delete,
            claim_ref: None,
            connection: Some(Connection {
                endpoint,
                authentication: auth,
            }),
        },
        status: None,
    }
}

/// Fast retry budget for tests running on a paused clock
pub fn test_config() -> ProvisionerConfig {
    ProvisionerConfig::default().with_retry(Duration::from_secs(1), Duration::from_secs(5))
}

// =============================================================================
// ObjectBucketClaim Builder
// =============================================================================

#[allow(dead_code)]
pub struct ObjectBucketClaimBuilder {
    name: String,
    namespace: String,
    uid: Option<String>,
    finalizers: Option<Vec<String>>,
    spec: ObjectBucketClaimSpec,
}

#[allow(dead_code)]
impl ObjectBucketClaimBuilder {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            uid: None,
            finalizers: None,
            spec: ObjectBucketClaimSpec::default(),
        }
    }

    pub fn with_uid(mut self, uid: &str) -> Self {
        self.uid = Some(uid.to_string());
        self
    }

    pub fn with_finalizer(mut self, finalizer: &str) -> Self {
        self.finalizers
            .get_or_insert_with(Vec::new)
            .push(finalizer.to_string());
        self
    }

    pub fn with_bucket_name(mut self, name: &str) -> Self {
        self.spec.bucket_name = Some(name.to_string());
        self
    }

    pub fn with_generate_bucket_name(mut self, prefix: &str) -> Self {
        self.spec.generate_bucket_name = Some(prefix.to_string());
        self
    }

    pub fn with_storage_class(mut self, class: &str) -> Self {
        self.spec.storage_class_name = Some(class.to_string());
        self
    }

    pub fn with_config(mut self, key: &str, value: &str) -> Self {
        self.spec
            .additional_config
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> ObjectBucketClaim {
        ObjectBucketClaim {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(self.namespace),
                uid: self.uid,
                finalizers: self.finalizers,
                ..Default::default()
            },
            spec: self.spec,
            status: None,
        }
    }
}

// =============================================================================
// Provisioner fake
// =============================================================================

/// Provisioner returning a fixed connection and counting calls
#[allow(dead_code)]
pub struct FakeProvisioner {
    pub endpoint: Endpoint,
    pub auth: Authentication,
    pub reclaim_policy: ReclaimPolicy,
    pub fail_provision: bool,
    pub provision_calls: AtomicU32,
    pub delete_calls: AtomicU32,
}

#[allow(dead_code)]
impl FakeProvisioner {
    pub fn new() -> Self {
        Self {
            endpoint: create_test_endpoint(),
            auth: create_test_auth(),
            reclaim_policy: ReclaimPolicy::Delete,
            fail_provision: false,
            provision_calls: AtomicU32::new(0),
            delete_calls: AtomicU32::new(0),
        }
    }

    pub fn retaining() -> Self {
        Self {
            reclaim_policy: ReclaimPolicy::Retain,
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_provision: true,
            ..Self::new()
        }
    }

    pub fn provision_count(&self) -> u32 {
        self.provision_calls.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> u32 {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provisioner for FakeProvisioner {
    async fn provision(&self, options: &BucketOptions) -> Result<ObjectBucket> {
        self.provision_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_provision {
            return Err(Error::ProvisionerError(format!(
                "backend refused bucket {}",
                options.bucket_name
            )));
        }
        let mut bucket = create_provisioned_bucket(
            Endpoint {
                bucket_name: options.bucket_name.clone(),
                ..self.endpoint.clone()
            },
            self.auth.clone(),
        );
        bucket.spec.reclaim_policy = self.reclaim_policy.clone();
        Ok(bucket)
    }

    async fn delete(&self, _bucket: &ObjectBucket) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
