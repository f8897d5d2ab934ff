//! Blob store failures.
//!
//! None of these reach an API caller: a failed upload leaves the voucher
//! unchanged and is only logged.

use thiserror::Error;

/// Why a blob could not be stored.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Upload is larger than `storage.max_file_size`.
    #[error("attachment of {size} bytes exceeds the {max} byte limit")]
    TooLarge {
        /// Upload size.
        size: u64,
        /// Configured limit.
        max: u64,
    },

    /// The `storage` settings cannot build a backend.
    #[error("storage is misconfigured: {0}")]
    Misconfigured(String),

    /// The backend rejected the write.
    #[error("blob store write failed: {0}")]
    Backend(String),
}

impl StorageError {
    /// Settings error.
    #[must_use]
    pub fn misconfigured(msg: impl Into<String>) -> Self {
        Self::Misconfigured(msg.into())
    }

    /// Backend error.
    #[must_use]
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        Self::Backend(err.to_string())
    }
}
