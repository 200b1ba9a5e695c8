use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::store::{
    exact_size, BucketInfo, EntryStream, ListObjectsRequest, ObjectInfo, ObjectMetadata,
    ObjectStream, Store, StoreEntry, StoreError,
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    metadata: ObjectMetadata,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Bucket {
    created_at: Option<DateTime<Utc>>,
    objects: BTreeMap<String, StoredObject>,
}

/// Store double.
///
/// Listings come back in key order with delimiter grouping, like S3. The
/// `max_keys` hint is ignored on purpose so callers must bound consumption
/// themselves. Every entry handed out by a listing counts as one read.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    buckets: Mutex<BTreeMap<String, Bucket>>,
    scripted: Mutex<Option<Vec<StoreEntry>>>,
    failure: Mutex<Option<String>>,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
    list_calls: AtomicUsize,
    list_reads: Arc<AtomicUsize>,
    put_chunks: AtomicUsize,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_bucket(&self, name: &str) {
        self.buckets
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Bucket {
                created_at: Some(Utc::now()),
                objects: BTreeMap::new(),
            });
    }

    /// Insert an object, creating the bucket if needed.
    pub fn insert_object(&self, bucket: &str, key: &str, data: &[u8]) {
        self.insert_bucket(bucket);
        let mut buckets = self.buckets.lock();
        if let Some(b) = buckets.get_mut(bucket) {
            b.objects.insert(
                key.to_string(),
                StoredObject {
                    data: Bytes::copy_from_slice(data),
                    metadata: ObjectMetadata::default(),
                    last_modified: Utc::now(),
                },
            );
        }
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.buckets
            .lock()
            .get(bucket)
            .is_some_and(|b| b.objects.contains_key(key))
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.lock().contains_key(bucket)
    }

    /// Serve exactly these entries from every listing, whatever the bucket.
    pub fn script_listing(&self, entries: Vec<StoreEntry>) {
        *self.scripted.lock() = Some(entries);
    }

    /// Make every operation fail as unavailable.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    /// Cancel `token` when the listing hands out its `reads`-th entry.
    pub fn cancel_after(&self, reads: usize, token: CancellationToken) {
        *self.cancel_after.lock() = Some((reads, token));
    }

    /// Number of listings opened.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of entries handed out across all listings.
    pub fn list_reads(&self) -> usize {
        self.list_reads.load(Ordering::SeqCst)
    }

    /// Number of body chunks the last successful upload arrived in.
    pub fn last_put_chunks(&self) -> usize {
        self.put_chunks.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        match self.failure.lock().as_ref() {
            Some(message) => Err(StoreError::unavailable(message.clone())),
            None => Ok(()),
        }
    }

    fn group(request: &ListObjectsRequest, bucket: &Bucket) -> Vec<StoreEntry> {
        let mut entries = Vec::new();
        let mut last_prefix: Option<String> = None;

        for (key, object) in bucket.objects.range(request.prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&request.prefix) else {
                break;
            };

            if !request.delimiter.is_empty() {
                if let Some(pos) = rest.find(&request.delimiter) {
                    let common = format!(
                        "{}{}",
                        request.prefix,
                        &rest[..pos + request.delimiter.len()]
                    );
                    if last_prefix.as_deref() != Some(common.as_str()) {
                        entries.push(StoreEntry::common_prefix(common.clone()));
                        last_prefix = Some(common);
                    }
                    continue;
                }
            }

            entries.push(StoreEntry {
                key: key.clone(),
                is_common_prefix: false,
                size: Some(object.data.len() as u64),
                last_modified: Some(object.last_modified),
                content_type: object.metadata.content_type.clone(),
                etag: None,
            });
        }

        entries
    }

    fn info(key: &str, object: &StoredObject) -> ObjectInfo {
        ObjectInfo {
            key: key.to_string(),
            size: object.data.len() as u64,
            content_type: object
                .metadata
                .content_type
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            last_modified: Some(object.last_modified),
            etag: None,
        }
    }

    fn object(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        let buckets = self.buckets.lock();
        let b = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NotFound(bucket.to_string()))?;
        b.objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

#[async_trait]
impl Store for ScriptedStore {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StoreError> {
        self.check_failure()?;
        Ok(self
            .buckets
            .lock()
            .iter()
            .map(|(name, b)| BucketInfo {
                name: name.clone(),
                created_at: b.created_at,
            })
            .collect())
    }

    fn list_objects(&self, request: ListObjectsRequest) -> EntryStream<'_> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let items: Vec<Result<StoreEntry, StoreError>> = if let Err(e) = self.check_failure() {
            vec![Err(e)]
        } else if let Some(scripted) = self.scripted.lock().clone() {
            scripted.into_iter().map(Ok).collect()
        } else {
            match self.buckets.lock().get(&request.bucket) {
                Some(bucket) => Self::group(&request, bucket).into_iter().map(Ok).collect(),
                None => vec![Err(StoreError::NotFound(request.bucket.clone()))],
            }
        };

        let reads = self.list_reads.clone();
        let cancel_after = self.cancel_after.lock().clone();
        futures::stream::iter(items)
            .map(move |item| {
                let n = reads.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some((after, token)) = &cancel_after {
                    if n == *after {
                        token.cancel();
                    }
                }
                item
            })
            .boxed()
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo, StoreError> {
        self.check_failure()?;
        let object = self.object(bucket, key)?;
        Ok(Self::info(key, &object))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectStream, StoreError> {
        self.check_failure()?;
        let object = self.object(bucket, key)?;
        let info = Self::info(key, &object);
        let body = futures::stream::once(async move { Ok(object.data) }).boxed();
        Ok(ObjectStream { info, body })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: crate::store::ByteStream,
        size: u64,
        metadata: ObjectMetadata,
    ) -> Result<(), StoreError> {
        self.check_failure()?;
        if !self.has_bucket(bucket) {
            return Err(StoreError::NotFound(bucket.to_string()));
        }
        let chunks: Vec<Bytes> = exact_size(body, size).try_collect().await?;
        self.put_chunks.store(chunks.len(), Ordering::SeqCst);
        let data = Bytes::from(chunks.concat());

        let mut buckets = self.buckets.lock();
        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NotFound(bucket.to_string()))?;
        b.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                metadata,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut buckets = self.buckets.lock();
        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NotFound(bucket.to_string()))?;
        b.objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn create_bucket(&self, name: &str) -> Result<(), StoreError> {
        self.check_failure()?;
        if self.has_bucket(name) {
            return Err(StoreError::unavailable(format!(
                "bucket {} already exists",
                name
            )));
        }
        self.insert_bucket(name);
        Ok(())
    }

    async fn delete_bucket(&self, name: &str) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut buckets = self.buckets.lock();
        match buckets.get(name) {
            None => Err(StoreError::NotFound(name.to_string())),
            Some(b) if !b.objects.is_empty() => Err(StoreError::unavailable(format!(
                "bucket {} is not empty",
                name
            ))),
            Some(_) => {
                buckets.remove(name);
                Ok(())
            }
        }
    }
}
