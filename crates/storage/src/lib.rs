//! Storage for published wind tiles.
//!
//! - [`ObjectStorage`]: S3/MinIO or local filesystem object store
//! - [`Publisher`]: uploads a run's local artifacts

pub mod error;
pub mod object_store;
pub mod publish;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig, StoragePath};
pub use error::{Result, StorageError};
pub use publish::{ObjectStorePublisher, Publisher};
