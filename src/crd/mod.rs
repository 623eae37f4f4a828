mod object_bucket;
mod object_bucket_claim;

pub use object_bucket::*;
pub use object_bucket_claim::*;
