pub mod context;
pub mod error;
pub mod handlers;
pub mod phase;
pub mod reconciler;
pub mod retry;

pub use context::Context;
pub use error::{BackoffConfig, Error, Result, is_already_exists, is_not_found};
pub use handlers::{
    create_config_map, create_object_bucket, create_secret, delete_object_bucket,
    release_config_map, release_secret,
};
pub use phase::{set_bucket_phase, set_claim_phase};
pub use reconciler::{error_policy, reconcile};
pub use retry::{Attempt, retry_mutate};
