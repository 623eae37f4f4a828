pub mod common;
pub mod config_map;
pub mod object_bucket;
pub mod secret;

pub use common::{API_VERSION, KIND, object_bucket_name, owner_reference, standard_labels};
pub use config_map::build_config_map;
pub use object_bucket::{bucket_name_for, prepare_object_bucket};
pub use secret::build_credentials_secret;
