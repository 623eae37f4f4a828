//! Connection info ConfigMap for a bound claim

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;
use kube::core::ObjectMeta;

use crate::config::ProvisionerConfig;
use crate::controller::error::{Error, Result};
use crate::crd::{Endpoint, ObjectBucketClaim};
use crate::resources::common::{claim_key, owner_reference, standard_labels};

pub const BUCKET_NAME: &str = "BUCKET_NAME";
pub const BUCKET_HOST: &str = "BUCKET_HOST";
pub const BUCKET_PORT: &str = "BUCKET_PORT";
pub const BUCKET_REGION: &str = "BUCKET_REGION";
pub const BUCKET_SUBREGION: &str = "BUCKET_SUBREGION";
pub const BUCKET_SSL: &str = "BUCKET_SSL";

/// Generate the ConfigMap exposing `endpoint` to workloads in the claim's
/// namespace.
///
/// The ConfigMap shares the claim's name, carries the provisioner finalizer so
/// it is not deleted by accident, and is owned by the claim so it is garbage
/// collected once the claim is deleted and the finalizer removed.
pub fn build_config_map(
    endpoint: Option<&Endpoint>,
    claim: Option<&ObjectBucketClaim>,
    config: &ProvisionerConfig,
) -> Result<ConfigMap> {
    let endpoint = endpoint.ok_or_else(|| {
        Error::InvalidArgument("cannot construct ConfigMap, got nil Endpoint".to_string())
    })?;
    let claim = claim.ok_or_else(|| {
        Error::InvalidArgument("cannot construct ConfigMap, got nil ObjectBucketClaim".to_string())
    })?;
    let (namespace, name) = claim_key(claim)?;

    let data = BTreeMap::from([
        (BUCKET_NAME.to_string(), endpoint.bucket_name.clone()),
        (BUCKET_HOST.to_string(), endpoint.bucket_host.clone()),
        (BUCKET_PORT.to_string(), endpoint.bucket_port.to_string()),
        (BUCKET_SSL.to_string(), endpoint.ssl.to_string()),
        (BUCKET_REGION.to_string(), endpoint.region.clone()),
        (BUCKET_SUBREGION.to_string(), endpoint.sub_region.clone()),
    ]);

    Ok(ConfigMap {
        metadata: ObjectMeta {
            labels: Some(standard_labels(&name, &config.provisioner_name)),
            name: Some(name),
            namespace: Some(namespace),
            finalizers: Some(vec![config.finalizer()]),
            owner_references: Some(vec![owner_reference(claim)]),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    })
}
