//! Blob store implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use opendal::{Operator, services};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::config::{StorageConfig, StorageProvider};
use super::error::StorageError;

/// Which voucher field an uploaded file is stamped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    /// Supporting document (`attachment`).
    Supporting,
    /// Signed approval (`approval_attachment`).
    Approval,
}

impl AttachmentKind {
    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "attachment" | "supporting" => Some(Self::Supporting),
            "approval" | "approval_attachment" => Some(Self::Approval),
            _ => None,
        }
    }

    /// Path segment used in storage keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Supporting => "attachment",
            Self::Approval => "approval",
        }
    }
}

/// Persists attachment bytes and returns a locator.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key` and returns the locator to keep on the voucher.
    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// Storage key for a voucher attachment.
///
/// Format: `vouchers/{voucher_id}/{kind}/{unique}-{sanitized_filename}`
#[must_use]
pub fn attachment_key(voucher_id: i64, kind: AttachmentKind, filename: &str) -> String {
    format!(
        "vouchers/{voucher_id}/{}/{}-{}",
        kind.as_str(),
        Uuid::now_v7().simple(),
        sanitize_filename(filename)
    )
}

/// Sanitize filename for storage key.
///
/// Only allows ASCII alphanumeric characters, dots, hyphens, and underscores.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// OpenDAL-backed blob store.
pub struct OpenDalStore {
    operator: Operator,
    config: StorageConfig,
}

impl OpenDalStore {
    /// Create a new store from configuration.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self { operator, config })
    }

    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);
                Operator::new(builder)
                    .map_err(|e| StorageError::misconfigured(e.to_string()))?
                    .finish()
            }
            StorageProvider::LocalFs { root } => {
                let root = root
                    .to_str()
                    .ok_or_else(|| StorageError::misconfigured("invalid path"))?;
                Operator::new(services::Fs::default().root(root))
                    .map_err(|e| StorageError::misconfigured(e.to_string()))?
                    .finish()
            }
        };
        Ok(operator)
    }

    /// Get the storage provider name.
    #[must_use]
    pub const fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }
}

#[async_trait]
impl BlobStore for OpenDalStore {
    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let size = bytes.len() as u64;
        if size > self.config.max_file_size {
            return Err(StorageError::TooLarge {
                size,
                max: self.config.max_file_size,
            });
        }

        self.operator
            .write_with(key, bytes)
            .content_type(content_type)
            .await?;

        Ok(format!("{}://{key}", self.provider_name()))
    }
}

/// In-memory blob store.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, (Vec<u8>, String)>>>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bytes stored under `key`.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(key).map(|(bytes, _)| bytes.clone())
    }

    /// Number of stored blobs.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    /// Returns true when nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.blobs
            .write()
            .await
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(format!("memory://{key}"))
    }
}
