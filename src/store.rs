//! Object store abstraction over the Kubernetes API
//!
//! The protocol functions only need create/get/replace/delete for four
//! resource kinds. [`ObjectStore`] captures exactly that, so the protocol
//! can run against the real API server ([`KubeStore`]) or an in-memory fake
//! in tests. Errors stay as [`kube::Error`] so callers classify them with
//! [`is_already_exists`](crate::controller::error::is_already_exists) and
//! [`is_not_found`](crate::controller::error::is_not_found).

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::crd::{ObjectBucket, ObjectBucketClaim};

/// Synchronous-per-call CRUD over one resource kind.
///
/// The namespace for `create`, `replace`, `replace_status` and `delete` is
/// taken from the object's own metadata.
#[async_trait]
pub trait ObjectStore<K>: Send + Sync
where
    K: Send + Sync,
{
    async fn get(&self, namespace: Option<&str>, name: &str) -> Result<K, kube::Error>;

    async fn create(&self, obj: &K) -> Result<K, kube::Error>;

    /// Full update, checked against the object's resourceVersion
    async fn replace(&self, obj: &K) -> Result<K, kube::Error>;

    /// Update of the status subresource, checked against resourceVersion
    async fn replace_status(&self, obj: &K) -> Result<K, kube::Error>;

    async fn delete(&self, obj: &K) -> Result<(), kube::Error>;
}

/// [`ObjectStore`] backed by `kube::Api`
pub struct KubeStore<K> {
    client: Client,
    api_for: fn(Client, Option<&str>) -> Api<K>,
}

impl<K> KubeStore<K>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    /// Store for a namespaced kind
    pub fn namespaced(client: Client) -> Self {
        Self {
            client,
            api_for: |client, ns| match ns {
                Some(ns) => Api::namespaced(client, ns),
                None => Api::default_namespaced(client),
            },
        }
    }
}

impl<K> KubeStore<K>
where
    K: Resource<Scope = k8s_openapi::ClusterResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    /// Store for a cluster-scoped kind
    pub fn cluster(client: Client) -> Self {
        Self {
            client,
            api_for: |client, _| Api::all(client),
        }
    }
}

impl<K> KubeStore<K> {
    fn api(&self, namespace: Option<&str>) -> Api<K> {
        (self.api_for)(self.client.clone(), namespace)
    }
}

#[async_trait]
impl<K> ObjectStore<K> for KubeStore<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Debug + Send + Sync + 'static,
    <K as Resource>::DynamicType: Default,
{
    async fn get(&self, namespace: Option<&str>, name: &str) -> Result<K, kube::Error> {
        self.api(namespace).get(name).await
    }

    async fn create(&self, obj: &K) -> Result<K, kube::Error> {
        self.api(obj.meta().namespace.as_deref())
            .create(&PostParams::default(), obj)
            .await
    }

    async fn replace(&self, obj: &K) -> Result<K, kube::Error> {
        self.api(obj.meta().namespace.as_deref())
            .replace(&obj.name_any(), &PostParams::default(), obj)
            .await
    }

    async fn replace_status(&self, obj: &K) -> Result<K, kube::Error> {
        let data = serde_json::to_vec(obj).map_err(kube::Error::SerdeError)?;
        self.api(obj.meta().namespace.as_deref())
            .replace_status(&obj.name_any(), &PostParams::default(), data)
            .await
    }

    async fn delete(&self, obj: &K) -> Result<(), kube::Error> {
        self.api(obj.meta().namespace.as_deref())
            .delete(&obj.name_any(), &DeleteParams::default())
            .await
            .map(|_| ())
    }
}

/// The four stores the controller works with
#[derive(Clone)]
pub struct Clientset {
    pub claims: Arc<dyn ObjectStore<ObjectBucketClaim>>,
    pub buckets: Arc<dyn ObjectStore<ObjectBucket>>,
    pub config_maps: Arc<dyn ObjectStore<ConfigMap>>,
    pub secrets: Arc<dyn ObjectStore<Secret>>,
}

impl Clientset {
    pub fn new(client: Client) -> Self {
        Self {
            claims: Arc::new(KubeStore::<ObjectBucketClaim>::namespaced(client.clone())),
            buckets: Arc::new(KubeStore::<ObjectBucket>::cluster(client.clone())),
            config_maps: Arc::new(KubeStore::<ConfigMap>::namespaced(client.clone())),
            secrets: Arc::new(KubeStore::<Secret>::namespaced(client)),
        }
    }
}
