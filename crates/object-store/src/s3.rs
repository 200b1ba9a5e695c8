//! S3 / MinIO backend.

use std::error::Error as StdError;

use async_stream::try_stream;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream as S3ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};

use common::prelude::{
    BucketInfo, ByteStream, ListObjectsRequest, ObjectInfo, ObjectMetadata, ObjectStream, Store,
    StoreEntry, StoreError,
};
use common::store::{collect_exact, EntryStream};

use crate::config::{endpoint_url, DEFAULT_REGION};

/// Page size cap imposed by S3.
const MAX_PAGE_KEYS: usize = 1000;

const NOT_FOUND_CODES: &[&str] = &["NoSuchKey", "NoSuchBucket", "NotFound"];

#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    region: String,
}

impl S3Store {
    /// Build a client with static credentials and path-style addressing.
    pub async fn connect(
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        region: Option<&str>,
        ssl: bool,
    ) -> Self {
        let region = region.unwrap_or(DEFAULT_REGION).to_string();
        let credentials = aws_sdk_s3::config::Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            "bucketeer",
        );
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .endpoint_url(endpoint_url(endpoint, ssl))
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            region,
        }
    }

    fn page<'a>(
        &'a self,
        request: ListObjectsRequest,
    ) -> impl Stream<Item = Result<StoreEntry, StoreError>> + Send + 'a {
        try_stream! {
            let mut continuation_token: Option<String> = None;
            let mut taken = 0;

            loop {
                let page_size = (request.max_keys - taken).clamp(1, MAX_PAGE_KEYS);
                let mut req = self
                    .client
                    .list_objects_v2()
                    .bucket(&request.bucket)
                    .max_keys(page_size as i32)
                    .set_continuation_token(continuation_token.take());
                if !request.prefix.is_empty() {
                    req = req.prefix(&request.prefix);
                }
                if !request.delimiter.is_empty() {
                    req = req.delimiter(&request.delimiter);
                }

                let resp = req
                    .send()
                    .await
                    .map_err(|e| sdk_error("list objects", &request.bucket, e))?;

                let mut entries: Vec<StoreEntry> = resp
                    .common_prefixes()
                    .iter()
                    .filter_map(|p| p.prefix())
                    .map(StoreEntry::common_prefix)
                    .collect();
                for obj in resp.contents() {
                    let Some(key) = obj.key() else {
                        continue;
                    };
                    entries.push(StoreEntry {
                        key: key.to_string(),
                        is_common_prefix: false,
                        size: obj.size().map(|s| s.max(0) as u64),
                        last_modified: obj.last_modified().and_then(to_chrono),
                        content_type: None,
                        etag: obj.e_tag().map(str::to_string),
                    });
                }
                entries.sort_by(|a, b| a.key.cmp(&b.key));

                for entry in entries {
                    if taken >= request.max_keys {
                        break;
                    }
                    taken += 1;
                    yield entry;
                }

                if taken >= request.max_keys || resp.is_truncated() != Some(true) {
                    break;
                }
                continuation_token = resp.next_continuation_token().map(str::to_string);
                if continuation_token.is_none() {
                    break;
                }
            }
        }
    }
}

fn to_chrono(t: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(t.secs(), t.subsec_nanos())
}

/// Map an SDK failure onto the store contract.
fn sdk_error<E, R>(context: &str, target: &str, err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    if let Some(code) = err.code() {
        if NOT_FOUND_CODES.contains(&code) {
            return StoreError::NotFound(target.to_string());
        }
    }
    StoreError::unavailable(format!(
        "{} {}: {}",
        context,
        target,
        DisplayErrorContext(&err)
    ))
}

fn body_stream(body: S3ByteStream) -> ByteStream {
    futures::stream::unfold(Some(body), |body| async move {
        let mut body = body?;
        match body.try_next().await {
            Ok(Some(chunk)) => Some((Ok(chunk), Some(body))),
            Ok(None) => None,
            Err(e) => Some((Err(StoreError::with_source("object body read failed", e)), None)),
        }
    })
    .boxed()
}

#[async_trait]
impl Store for S3Store {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StoreError> {
        let resp = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| sdk_error("list buckets", "*", e))?;
        Ok(resp
            .buckets()
            .iter()
            .filter_map(|b| {
                Some(BucketInfo {
                    name: b.name()?.to_string(),
                    created_at: b.creation_date().and_then(to_chrono),
                })
            })
            .collect())
    }

    fn list_objects(&self, request: ListObjectsRequest) -> EntryStream<'_> {
        self.page(request).boxed()
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo, StoreError> {
        let target = format!("{}/{}", bucket, key);
        let resp = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    StoreError::NotFound(target.clone())
                } else {
                    sdk_error("head object", &target, e)
                }
            })?;
        Ok(ObjectInfo {
            key: key.to_string(),
            size: resp.content_length().unwrap_or(0).max(0) as u64,
            content_type: resp
                .content_type()
                .unwrap_or(mime_guess::mime::APPLICATION_OCTET_STREAM.as_ref())
                .to_string(),
            last_modified: resp.last_modified().and_then(to_chrono),
            etag: resp.e_tag().map(str::to_string),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectStream, StoreError> {
        let target = format!("{}/{}", bucket, key);
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("get object", &target, e))?;
        let info = ObjectInfo {
            key: key.to_string(),
            size: resp.content_length().unwrap_or(0).max(0) as u64,
            content_type: resp
                .content_type()
                .unwrap_or(mime_guess::mime::APPLICATION_OCTET_STREAM.as_ref())
                .to_string(),
            last_modified: resp.last_modified().and_then(to_chrono),
            etag: resp.e_tag().map(str::to_string),
        };
        Ok(ObjectStream {
            info,
            body: body_stream(resp.body),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        size: u64,
        metadata: ObjectMetadata,
    ) -> Result<(), StoreError> {
        let target = format!("{}/{}", bucket, key);
        // PutObject needs a replayable body; a single-chunk upload is
        // handed over without copying.
        let data = collect_exact(body, size).await?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(size as i64)
            .body(S3ByteStream::from(data))
            .set_content_type(metadata.content_type)
            .set_content_encoding(metadata.content_encoding)
            .set_content_disposition(metadata.content_disposition)
            .set_content_language(metadata.content_language)
            .send()
            .await
            .map_err(|e| sdk_error("put object", &target, e))?;
        tracing::debug!(%target, size, "object stored");
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let target = format!("{}/{}", bucket, key);
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("delete object", &target, e))?;
        Ok(())
    }

    async fn create_bucket(&self, name: &str) -> Result<(), StoreError> {
        let mut req = self.client.create_bucket().bucket(name);
        if self.region != DEFAULT_REGION {
            req = req.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        req.send()
            .await
            .map_err(|e| sdk_error("create bucket", name, e))?;
        tracing::info!(bucket = name, "bucket created");
        Ok(())
    }

    async fn delete_bucket(&self, name: &str) -> Result<(), StoreError> {
        self.client
            .delete_bucket()
            .bucket(name)
            .send()
            .await
            .map_err(|e| sdk_error("delete bucket", name, e))?;
        tracing::info!(bucket = name, "bucket deleted");
        Ok(())
    }
}
