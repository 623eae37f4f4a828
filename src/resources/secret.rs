use k8s_openapi::api::core::v1::Secret;
use kube::core::ObjectMeta;

use crate::config::ProvisionerConfig;
use crate::controller::error::{Error, Result};
use crate::crd::{Authentication, ObjectBucketClaim};
use crate::resources::common::{claim_key, owner_reference, standard_labels};

/// Generate the credentials Secret for a claim
///
/// The Secret is produced even when `auth` flattens to an empty map, so that
/// anonymous access is still visible to workloads as an existing, empty Secret.
pub fn build_credentials_secret(
    claim: Option<&ObjectBucketClaim>,
    auth: Option<&Authentication>,
    config: &ProvisionerConfig,
) -> Result<Secret> {
    let claim = claim.ok_or_else(|| {
        Error::InvalidArgument("ObjectBucketClaim required to generate secret".to_string())
    })?;
    let auth = auth.ok_or_else(|| {
        Error::InvalidArgument("got nil Authentication, nothing to do".to_string())
    })?;
    let (namespace, name) = claim_key(claim)?;

    Ok(Secret {
        metadata: ObjectMeta {
            labels: Some(standard_labels(&name, &config.provisioner_name)),
            name: Some(name),
            namespace: Some(namespace),
            finalizers: Some(vec![config.finalizer()]),
            owner_references: Some(vec![owner_reference(claim)]),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        string_data: Some(auth.to_map()),
        ..Default::default()
    })
}
