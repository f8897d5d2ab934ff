//! Storage configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use vouchledger_shared::config::StorageSettings;

use super::error::StorageError;

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// S3-compatible storage: Cloudflare R2, Supabase, AWS S3, MinIO
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// Access key ID.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
        /// Region.
        region: String,
    },
    /// Local filesystem
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
}

impl StorageProvider {
    /// Create local filesystem provider.
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Get the provider name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::LocalFs { .. } => "local",
        }
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Maximum file size in bytes.
    pub max_file_size: u64,
}

impl StorageConfig {
    /// Default max file size: 10MB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

    /// Create a new storage config with default settings.
    #[must_use]
    pub const fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set maximum file size.
    #[must_use]
    pub const fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Builds a config from the `[storage]` section of the application config.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        let provider = match settings.kind.trim().to_lowercase().as_str() {
            "local" | "fs" => StorageProvider::LocalFs {
                root: PathBuf::from(settings.root.clone().unwrap_or_else(|| "./storage".into())),
            },
            "s3" => {
                let required = |value: &Option<String>, name: &str| {
                    value.clone().ok_or_else(|| {
                        StorageError::misconfigured(format!("storage.{name} is required for s3"))
                    })
                };
                StorageProvider::S3 {
                    endpoint: required(&settings.endpoint, "endpoint")?,
                    bucket: required(&settings.bucket, "bucket")?,
                    access_key_id: required(&settings.access_key_id, "access_key_id")?,
                    secret_access_key: required(&settings.secret_access_key, "secret_access_key")?,
                    region: settings.region.clone().unwrap_or_else(|| "auto".into()),
                }
            }
            other => {
                return Err(StorageError::misconfigured(format!(
                    "unknown storage kind '{other}'"
                )));
            }
        };

        Ok(Self::new(provider).with_max_file_size(settings.max_file_size))
    }
}
