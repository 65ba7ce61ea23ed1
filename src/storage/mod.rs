pub mod fs;
pub mod location;

use anyhow::Result;
use async_trait::async_trait;

pub use fs::FsObjectStore;
pub use location::StorageLocation;

/// Object storage used to materialize reports.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Copy an object within one bucket. An existing destination is overwritten.
    async fn copy_object(&self, bucket: &str, source_key: &str, destination_key: &str)
        -> Result<()>;
}
