// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for the resource builders and the phase lattice
//!
//! These tests use proptest to generate random claims and connection
//! descriptors and verify that:
//! 1. Builders never panic and are deterministic (same input = same output)
//! 2. Every generated dependent carries exactly one finalizer and one owner
//! 3. Bucket naming follows the claim's request
//! 4. Terminal phases never transition anywhere else

use std::collections::BTreeMap;
use std::time::Duration;

use proptest::prelude::*;

use bucket_provisioner::crd::{
    AccessKeys, Authentication, BucketPhase, Connection, Endpoint, ObjectBucket,
    ObjectBucketClaim, ObjectBucketClaimSpec, ObjectBucketSpec,
};
use bucket_provisioner::resources::config_map::{BUCKET_HOST, BUCKET_NAME, BUCKET_PORT, BUCKET_SSL};
use bucket_provisioner::resources::{
    build_config_map, build_credentials_secret, bucket_name_for, object_bucket_name,
    prepare_object_bucket,
};
use bucket_provisioner::{Error, ProvisionerConfig};
use kube::ResourceExt;
use kube::core::ObjectMeta;

// =============================================================================
// Helpers
// =============================================================================

fn claim(name: &str, namespace: &str, spec: ObjectBucketClaimSpec) -> ObjectBucketClaim {
    ObjectBucketClaim {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some("uid-1".to_string()),
            ..Default::default()
        },
        spec,
        status: None,
    }
}

fn provisioned(endpoint: Endpoint, authentication: Authentication) -> ObjectBucket {
    ObjectBucket {
        metadata: ObjectMeta::default(),
        spec: ObjectBucketSpec {
            connection: Some(Connection {
                endpoint,
                authentication,
            }),
            ..Default::default()
        },
        status: None,
    }
}

// =============================================================================
// Strategy generators
// =============================================================================

/// Generate a DNS-1123 label (shrinks toward short names)
fn dns_label() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,20}[a-z0-9]"
}

fn endpoint() -> impl Strategy<Value = Endpoint> {
    (
        "[a-z0-9.-]{1,30}",
        1..=65535i32,
        dns_label(),
        "[a-z0-9-]{0,12}",
        "[a-z0-9-]{0,12}",
        any::<bool>(),
    )
        .prop_map(|(host, port, bucket, region, sub_region, ssl)| Endpoint {
            bucket_host: host,
            bucket_port: port,
            bucket_name: bucket,
            region,
            sub_region,
            ssl,
            additional_config: BTreeMap::new(),
        })
}

fn authentication() -> impl Strategy<Value = Authentication> {
    (
        proptest::option::of(("[A-Z0-9]{16,20}", "[A-Za-z0-9/+]{20,40}")),
        proptest::collection::btree_map("[A-Z_]{1,12}", "[a-z0-9]{0,16}", 0..4),
    )
        .prop_map(|(keys, additional_state)| Authentication {
            access_keys: keys.map(|(id, secret)| AccessKeys {
                access_key_id: id,
                secret_access_key: secret,
            }),
            additional_state,
        })
}

fn phase() -> impl Strategy<Value = BucketPhase> {
    prop_oneof![
        Just(BucketPhase::Pending),
        Just(BucketPhase::Bound),
        Just(BucketPhase::Released),
        Just(BucketPhase::Failed),
    ]
}

// =============================================================================
// Builder properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: the ConfigMap mirrors the endpoint and is deterministic
    #[test]
    fn prop_config_map_mirrors_endpoint(
        name in dns_label(),
        namespace in dns_label(),
        endpoint in endpoint(),
    ) {
        let claim = claim(&name, &namespace, Default::default());
        let config = ProvisionerConfig::default();

        let cm = build_config_map(Some(&endpoint), Some(&claim), &config).unwrap();
        let again = build_config_map(Some(&endpoint), Some(&claim), &config).unwrap();
        prop_assert_eq!(&cm, &again);

        let data = cm.data.clone().unwrap();
        prop_assert_eq!(data.len(), 6);
        prop_assert_eq!(&data[BUCKET_NAME], &endpoint.bucket_name);
        prop_assert_eq!(&data[BUCKET_HOST], &endpoint.bucket_host);
        prop_assert_eq!(&data[BUCKET_PORT], &endpoint.bucket_port.to_string());
        prop_assert_eq!(&data[BUCKET_SSL], &endpoint.ssl.to_string());

        prop_assert_eq!(cm.name_any(), name);
        prop_assert_eq!(cm.finalizers().len(), 1);
        prop_assert_eq!(cm.owner_references().len(), 1);
        prop_assert_eq!(cm.owner_references()[0].controller, Some(true));
    }

    /// Property: the Secret holds exactly the flattened credentials
    #[test]
    fn prop_secret_holds_flattened_credentials(
        name in dns_label(),
        namespace in dns_label(),
        auth in authentication(),
    ) {
        let claim = claim(&name, &namespace, Default::default());
        let config = ProvisionerConfig::default();

        let secret = build_credentials_secret(Some(&claim), Some(&auth), &config).unwrap();

        prop_assert_eq!(secret.string_data.clone().unwrap(), auth.to_map());
        prop_assert_eq!(secret.namespace(), Some(namespace));
        prop_assert_eq!(secret.finalizers().len(), 1);
        prop_assert_eq!(secret.owner_references().len(), 1);
    }

    /// Property: additional state wins over access keys on a key collision
    #[test]
    fn prop_additional_state_overrides_access_keys(value in "[a-z0-9]{1,16}") {
        let auth = Authentication {
            access_keys: Some(AccessKeys {
                access_key_id: "id".to_string(),
                secret_access_key: "secret".to_string(),
            }),
            additional_state: BTreeMap::from([("AWS_ACCESS_KEY_ID".to_string(), value.clone())]),
        };

        let map = auth.to_map();
        prop_assert_eq!(map.len(), 2);
        prop_assert_eq!(&map["AWS_ACCESS_KEY_ID"], &value);
    }

    /// Property: preparing a bucket twice still yields one finalizer
    #[test]
    fn prop_prepare_object_bucket_is_idempotent(
        name in dns_label(),
        namespace in dns_label(),
        endpoint in endpoint(),
        auth in authentication(),
    ) {
        let claim = claim(&name, &namespace, Default::default());
        let config = ProvisionerConfig::default();

        let once = prepare_object_bucket(provisioned(endpoint, auth), &claim, &config).unwrap();
        let twice = prepare_object_bucket(once.clone(), &claim, &config).unwrap();

        prop_assert_eq!(once.name_any(), object_bucket_name(&namespace, &name));
        prop_assert_eq!(twice.finalizers(), once.finalizers());
        prop_assert_eq!(twice.finalizers().len(), 1);
        prop_assert!(twice.owner_references().is_empty());
        prop_assert_eq!(twice.namespace(), None);
    }

    /// Property: generated bucket names are the prefix plus a 5 character suffix
    #[test]
    fn prop_generated_bucket_name(prefix in dns_label()) {
        let claim = claim("c", "ns", ObjectBucketClaimSpec {
            generate_bucket_name: Some(prefix.clone()),
            ..Default::default()
        });

        let name = bucket_name_for(&claim).unwrap();
        let expected = format!("{}-", prefix);
        prop_assert!(name.starts_with(&expected));
        prop_assert_eq!(name.len(), prefix.len() + 6);
    }

    /// Property: an explicit bucket name is used verbatim
    #[test]
    fn prop_explicit_bucket_name(bucket in dns_label(), prefix in proptest::option::of(dns_label())) {
        let claim = claim("c", "ns", ObjectBucketClaimSpec {
            bucket_name: Some(bucket.clone()),
            generate_bucket_name: prefix,
            ..Default::default()
        });

        prop_assert_eq!(bucket_name_for(&claim).unwrap(), bucket);
    }
}

// =============================================================================
// Phase and config properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: every phase may be rewritten to itself
    #[test]
    fn prop_phase_transition_is_reflexive(phase in phase()) {
        prop_assert!(phase.can_transition_to(&phase));
    }

    /// Property: Released and Failed are terminal
    #[test]
    fn prop_terminal_phases_stay_put(next in phase()) {
        for terminal in [BucketPhase::Released, BucketPhase::Failed] {
            prop_assert_eq!(terminal.can_transition_to(&next), terminal == next);
        }
    }

    /// Property: a retry timeout shorter than the interval is rejected
    #[test]
    fn prop_short_timeout_rejected(interval in 2..=60u64, shortfall in 1..=1000u64) {
        let timeout = Duration::from_millis(interval * 1000 - shortfall.min(interval * 1000 - 1));
        let config = ProvisionerConfig::default()
            .with_retry(Duration::from_secs(interval), timeout);

        prop_assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
