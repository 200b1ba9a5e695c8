//! The object-store contract.
//!
//! Backends (in-memory, local filesystem, S3) implement [`Store`]; the
//! listing adapter and the console only ever see this trait.

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::Serialize;

/// Delimiter used for every hierarchical listing.
pub const DELIMITER: &str = "/";

/// Stream of object content.
pub type ByteStream = BoxStream<'static, Result<Bytes, StoreError>>;

/// Stream of raw listing entries, in store order.
pub type EntryStream<'a> = BoxStream<'a, Result<StoreEntry, StoreError>>;

/// Errors reported by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The bucket or key does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A bucket name or key the backend cannot hold unchanged
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// An upload body did not match its declared size
    #[error("expected {expected} bytes, received {received}")]
    SizeMismatch { expected: u64, received: u64 },

    /// Network, auth or backend failure
    #[error("{message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketInfo {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Arguments of a prefix-scoped listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListObjectsRequest {
    pub bucket: String,
    /// Raw store prefix (no leading separator, empty for the root)
    pub prefix: String,
    /// Group keys at the next occurrence of this string; empty lists recursively
    pub delimiter: String,
    /// Upper bound on the number of entries the caller will consume
    pub max_keys: usize,
}

/// One raw item of a listing, as the store reports it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreEntry {
    pub key: String,
    pub is_common_prefix: bool,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
}

impl StoreEntry {
    pub fn common_prefix(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            is_common_prefix: true,
            ..Default::default()
        }
    }

    pub fn object(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size: Some(size),
            ..Default::default()
        }
    }
}

/// Metadata of a single object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub content_type: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

/// HTTP-style metadata supplied on upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_disposition: Option<String>,
    pub content_language: Option<String>,
}

/// Object content plus its metadata.
pub struct ObjectStream {
    pub info: ObjectInfo,
    pub body: ByteStream,
}

impl Debug for ObjectStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStream")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Store: Debug + Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StoreError>;

    /// Open a lazy listing. Dropping the stream must stop any further reads
    /// against the backend.
    fn list_objects(&self, request: ListObjectsRequest) -> EntryStream<'_>;

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo, StoreError>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectStream, StoreError>;

    /// Store `size` bytes read from `body` under `key`.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        size: u64,
        metadata: ObjectMetadata,
    ) -> Result<(), StoreError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    async fn create_bucket(&self, name: &str) -> Result<(), StoreError>;

    async fn delete_bucket(&self, name: &str) -> Result<(), StoreError>;
}

/// Pass `body` through unchanged, failing as soon as it runs past `size`
/// bytes or ends short of it.
pub fn exact_size(body: ByteStream, size: u64) -> ByteStream {
    use futures::StreamExt;

    futures::stream::unfold(Some((body, 0u64)), move |state| async move {
        let Some((mut body, received)) = state else {
            return None;
        };
        match body.next().await {
            Some(Ok(chunk)) => {
                let received = received + chunk.len() as u64;
                if received > size {
                    let err = StoreError::SizeMismatch {
                        expected: size,
                        received,
                    };
                    Some((Err(err), None))
                } else {
                    Some((Ok(chunk), Some((body, received))))
                }
            }
            Some(Err(e)) => Some((Err(e), None)),
            None if received != size => {
                let err = StoreError::SizeMismatch {
                    expected: size,
                    received,
                };
                Some((Err(err), None))
            }
            None => None,
        }
    })
    .boxed()
}

/// Drain a byte stream, failing unless exactly `size` bytes arrive. A body
/// that arrives in one chunk is returned without copying.
pub async fn collect_exact(body: ByteStream, size: u64) -> Result<Bytes, StoreError> {
    use futures::TryStreamExt;

    let mut chunks: Vec<Bytes> = exact_size(body, size).try_collect().await?;
    if chunks.len() == 1 {
        if let Some(chunk) = chunks.pop() {
            return Ok(chunk);
        }
    }
    let mut buf = bytes::BytesMut::with_capacity(size as usize);
    for chunk in chunks {
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, TryStreamExt};

    fn chunks(parts: &[&'static str]) -> ByteStream {
        let items: Vec<Result<Bytes, StoreError>> = parts
            .iter()
            .map(|p| Ok(Bytes::from_static(p.as_bytes())))
            .collect();
        futures::stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn test_collect_exact() {
        let data = collect_exact(chunks(&["hello ", "world"]), 11).await.unwrap();
        assert_eq!(&data[..], b"hello world");
    }

    #[tokio::test]
    async fn test_collect_single_chunk_is_not_copied() {
        let chunk = Bytes::from_static(b"hello");
        let ptr = chunk.as_ptr();
        let body = futures::stream::once(async move { Ok(chunk) }).boxed();

        let data = collect_exact(body, 5).await.unwrap();
        assert_eq!(data.as_ptr(), ptr);
    }

    #[tokio::test]
    async fn test_collect_short_body() {
        let err = collect_exact(chunks(&["abc"]), 5).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::SizeMismatch {
                expected: 5,
                received: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_exact_size_passes_chunks_through() {
        let seen: Vec<Bytes> = exact_size(chunks(&["ab", "cd", "e"]), 5)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen.concat(), b"abcde");
    }

    #[tokio::test]
    async fn test_exact_size_stops_at_overflow() {
        let mut body = exact_size(chunks(&["abc", "def", "ghi"]), 4);
        assert_eq!(&body.next().await.unwrap().unwrap()[..], b"abc");
        let err = body.next().await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            StoreError::SizeMismatch {
                expected: 4,
                received: 6
            }
        ));
        assert!(body.next().await.is_none());
    }
}
