//! Blob storage for voucher attachments, backed by Apache OpenDAL.
//!
//! The ledger only keeps the locator a store hands back. Anything that can
//! persist bytes under a key implements [`BlobStore`]:
//! - [`OpenDalStore`] for S3-compatible buckets or the local filesystem
//! - [`MemoryBlobStore`] for tests and throwaway setups

mod config;
mod error;
mod service;

pub use config::{StorageConfig, StorageProvider};
pub use error::StorageError;
pub use service::{
    AttachmentKind, BlobStore, MemoryBlobStore, OpenDalStore, attachment_key, sanitize_filename,
};
