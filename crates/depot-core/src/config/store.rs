//! Object store and upload configuration.

use serde::{Deserialize, Serialize};

/// Top-level object store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Object store backend: "s3" or "memory" (dev/test).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Maximum upload size in bytes (default 5 GB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: i64,
    /// Target chunk size in bytes for chunked uploads (default 5 MB).
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: i64,
    /// Lifetime of presigned single-shot upload URLs in seconds.
    #[serde(default = "default_presign_expiry")]
    pub presign_expiry_seconds: u64,
    /// S3-compatible remote store configuration.
    #[serde(default)]
    pub s3: S3StoreConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            max_upload_size_bytes: default_max_upload(),
            chunk_size_bytes: default_chunk_size(),
            presign_expiry_seconds: default_presign_expiry(),
            s3: S3StoreConfig::default(),
        }
    }
}

/// S3-compatible object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3StoreConfig {
    /// S3 endpoint URL (for non-AWS services like MinIO). Empty uses AWS.
    #[serde(default)]
    pub endpoint: String,
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// S3 bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Access key ID (empty falls back to the ambient credential chain).
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
    /// Use path-style addressing (required for MinIO).
    #[serde(default)]
    pub force_path_style: bool,
}

impl Default for S3StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: default_region(),
            bucket: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            force_path_style: false,
        }
    }
}

fn default_provider() -> String {
    "s3".to_string()
}

fn default_max_upload() -> i64 {
    5_368_709_120 // 5 GB
}

fn default_chunk_size() -> i64 {
    5_242_880 // 5 MB
}

fn default_presign_expiry() -> u64 {
    3600
}

fn default_region() -> String {
    "us-east-1".to_string()
}
