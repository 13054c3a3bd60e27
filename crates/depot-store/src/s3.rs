//! S3-compatible object store client.
//!
//! Thin protocol wrapper over `aws-sdk-s3`: single-shot and multipart
//! operations plus presigned URL generation. No business logic.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::Bytes;
use tracing::debug;

use depot_core::config::store::S3StoreConfig;
use depot_core::error::AppError;
use depot_core::result::AppResult;
use depot_core::traits::storage::{ObjectMeta, ObjectStore, RemotePart};

/// Object store backed by an S3-compatible service.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Create a new S3 store from configuration.
    ///
    /// An empty endpoint uses AWS proper; a custom endpoint with
    /// `force_path_style` targets MinIO-style services. Empty credentials
    /// fall back to the ambient AWS credential chain.
    pub async fn new(config: &S3StoreConfig) -> AppResult<Self> {
        if config.bucket.is_empty() {
            return Err(AppError::configuration("S3 bucket name must not be empty"));
        }

        tracing::info!(
            endpoint = %config.endpoint,
            region = %config.region,
            bucket = %config.bucket,
            "Initializing S3 object store"
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .force_path_style(config.force_path_style);

        if !config.endpoint.is_empty() {
            builder = builder.endpoint_url(&config.endpoint);
        }

        if !config.access_key.is_empty() && !config.secret_key.is_empty() {
            builder = builder.credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "static",
            ));
        } else {
            let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(config.region.clone()))
                .load()
                .await;
            if let Some(provider) = sdk_config.credentials_provider() {
                builder = builder.credentials_provider(provider.clone());
            }
        }

        Ok(Self {
            client: S3Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn put(&self, key: &str, data: Bytes) -> AppResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| AppError::storage(format!("S3 put failed for '{key}': {e}")))?;

        debug!(key, "Object stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Bytes> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let err = e.into_service_error();
                if err.is_no_such_key() {
                    AppError::not_found(format!("Object '{key}' not found"))
                } else {
                    AppError::storage(format!("S3 get failed for '{key}': {err}"))
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::storage(format!("S3 body read failed for '{key}': {e}")))?;
        Ok(data.into_bytes())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::storage(format!("S3 delete failed for '{key}': {e}")))?;

        debug!(key, "Object deleted");
        Ok(())
    }

    async fn head(&self, key: &str) -> AppResult<Option<ObjectMeta>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => Ok(Some(ObjectMeta {
                key: key.to_string(),
                size_bytes: response.content_length().unwrap_or(0),
                etag: response.e_tag().map(String::from),
                last_modified: response
                    .last_modified()
                    .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
            })),
            Err(e) => {
                let err = e.into_service_error();
                if err.is_not_found() {
                    Ok(None)
                } else {
                    Err(AppError::storage(format!(
                        "S3 head failed for '{key}': {err}"
                    )))
                }
            }
        }
    }

    async fn list(&self, prefix: &str) -> AppResult<Vec<ObjectMeta>> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(token) = &continuation {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| AppError::storage(format!("S3 list failed for '{prefix}': {e}")))?;

            for obj in response.contents() {
                objects.push(ObjectMeta {
                    key: obj.key().unwrap_or_default().to_string(),
                    size_bytes: obj.size().unwrap_or(0),
                    etag: obj.e_tag().map(String::from),
                    last_modified: obj
                        .last_modified()
                        .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
                });
            }

            continuation = response.next_continuation_token().map(String::from);
            if continuation.is_none() {
                break;
            }
        }

        Ok(objects)
    }

    async fn presign_put(&self, key: &str, expires_in: Duration) -> AppResult<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| AppError::storage(format!("Invalid presign expiry: {e}")))?;

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| AppError::storage(format!("S3 presign failed for '{key}': {e}")))?;

        Ok(request.uri().to_string())
    }

    async fn create_multipart(&self, key: &str) -> AppResult<String> {
        let response = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::storage(format!("S3 multipart create failed for '{key}': {e}"))
            })?;

        let session_id = response
            .upload_id()
            .ok_or_else(|| AppError::storage("S3 returned no multipart upload id"))?
            .to_string();

        debug!(key, session_id = %session_id, "Multipart session opened");
        Ok(session_id)
    }

    async fn upload_part(
        &self,
        key: &str,
        session_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> AppResult<RemotePart> {
        let response = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(session_id)
            .part_number(part_number)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                AppError::storage(format!(
                    "S3 part {part_number} upload failed for '{key}': {e}"
                ))
            })?;

        let etag = response
            .e_tag()
            .ok_or_else(|| AppError::storage(format!("S3 returned no ETag for part {part_number}")))?
            .to_string();

        Ok(RemotePart { part_number, etag })
    }

    async fn complete_multipart(
        &self,
        key: &str,
        session_id: &str,
        parts: &[RemotePart],
    ) -> AppResult<()> {
        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(&p.etag)
                    .build()
            })
            .collect();

        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(session_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| {
                AppError::storage(format!("S3 multipart complete failed for '{key}': {e}"))
            })?;

        debug!(key, session_id, parts = parts.len(), "Multipart session finalized");
        Ok(())
    }

    async fn abort_multipart(&self, key: &str, session_id: &str) -> AppResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(session_id)
            .send()
            .await
            .map_err(|e| {
                AppError::storage(format!("S3 multipart abort failed for '{key}': {e}"))
            })?;

        debug!(key, session_id, "Multipart session aborted");
        Ok(())
    }
}
