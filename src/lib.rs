pub mod config;
pub mod controller;
pub mod crd;
pub mod provisioner;
pub mod resources;
pub mod store;

pub use config::{ProvisionerConfig, RetryPolicy};
pub use controller::{Context, Error, Result, error_policy, reconcile};
pub use crd::{BucketPhase, ObjectBucket, ObjectBucketClaim};
pub use provisioner::{BucketOptions, Provisioner};
pub use store::{Clientset, KubeStore, ObjectStore};

use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::runtime::Controller;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;

/// Helper to create a namespaced or cluster-wide API based on scope.
fn scoped_api<T>(client: Client, namespace: Option<&str>) -> Api<T>
where
    T: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <T as Resource>::DynamicType: Default,
    T: Clone + DeserializeOwned + std::fmt::Debug,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Run the claim controller (cluster-wide).
///
/// Watches ObjectBucketClaim resources and the ConfigMaps and Secrets they own,
/// and reconciles each claim with `provisioner` as the storage backend.
/// The configuration is validated before anything starts.
pub async fn run_controller<P>(
    client: Client,
    provisioner: P,
    config: ProvisionerConfig,
) -> Result<()>
where
    P: Provisioner + 'static,
{
    run_controller_scoped(client, provisioner, config, None).await
}

/// Run the claim controller with optional namespace scoping.
///
/// When `namespace` is `Some(ns)`, only claims in that namespace are watched.
/// ObjectBuckets are cluster scoped and always addressed cluster-wide.
pub async fn run_controller_scoped<P>(
    client: Client,
    provisioner: P,
    config: ProvisionerConfig,
    namespace: Option<&str>,
) -> Result<()>
where
    P: Provisioner + 'static,
{
    config.validate()?;

    let scope_msg = namespace.unwrap_or("cluster-wide");
    tracing::info!(
        provisioner = %config.provisioner_name,
        finalizer = %config.finalizer(),
        "Starting controller for ObjectBucketClaim resources (scope: {})",
        scope_msg
    );

    let ctx = Arc::new(Context::new(
        Clientset::new(client.clone()),
        provisioner,
        config,
    ));

    let claims: Api<ObjectBucketClaim> = scoped_api(client.clone(), namespace);
    let configmaps: Api<ConfigMap> = scoped_api(client.clone(), namespace);
    let secrets: Api<Secret> = scoped_api(client, namespace);

    let watcher_config = WatcherConfig::default().any_semantic();

    Controller::new(claims, watcher_config.clone())
        .owns(configmaps, watcher_config.clone())
        .owns(secrets, watcher_config)
        .run(reconcile::<P>, error_policy::<P>, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    tracing::debug!("Reconciled: {}", obj.name);
                }
                Err(e) => {
                    // Watch events for dependents can arrive after the claim
                    // is gone; those are expected.
                    let is_not_found = matches!(
                        &e,
                        kube::runtime::controller::Error::ReconcilerFailed(err, _) if err.is_not_found()
                    );
                    if is_not_found {
                        tracing::debug!("Object no longer exists (likely deleted): {:?}", e);
                    } else {
                        tracing::error!("Reconciliation error: {:?}", e);
                    }
                }
            }
        })
        .await;

    tracing::error!("Controller stream ended unexpectedly");
    Ok(())
}
