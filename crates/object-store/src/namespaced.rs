//! Buckets on top of a single `object_store::ObjectStore`.
//!
//! Each bucket is the first path segment of the underlying store, so
//! `docs/a/b.txt` is key `a/b.txt` in bucket `docs`. The in-memory flavour
//! keeps a registry of buckets (with creation time) because empty buckets have
//! no objects to show for themselves; the local flavour uses top-level
//! directories.
//!
//! Bucket names and keys are used as location text verbatim. Anything that
//! `Path` would encode or normalise (empty segments, `.` or `..`, control
//! characters) is refused rather than stored under a different name, so a
//! listed key always opens the object it names.

use std::collections::BTreeMap;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt, TryStreamExt};
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, GetResult, ObjectMeta, ObjectStore,
    PutMultipartOpts, WriteMultipart,
};
use parking_lot::RwLock;
use tracing::{debug, info};

use common::prelude::{
    BucketInfo, ByteStream, ListObjectsRequest, ObjectInfo, ObjectMetadata, ObjectStream, Store,
    StoreEntry, StoreError,
};
use common::store::{exact_size, EntryStream, DELIMITER};

use crate::error::{io_error, store_error, BackendError, Result};

/// Parts uploaded concurrently per object.
const UPLOAD_CONCURRENCY: usize = 4;

#[derive(Debug)]
enum Buckets {
    Memory(RwLock<BTreeMap<String, DateTime<Utc>>>),
    Local(PathBuf),
}

#[derive(Debug)]
pub struct NamespacedStore {
    inner: Arc<dyn ObjectStore>,
    buckets: Buckets,
}

impl NamespacedStore {
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
            buckets: Buckets::Memory(RwLock::new(BTreeMap::new())),
        }
    }

    /// Serve buckets from the directories under `root`, creating it if needed.
    pub async fn local(root: &FsPath) -> Result<Self> {
        tokio::fs::create_dir_all(root).await?;
        let root = tokio::fs::canonicalize(root).await?;
        let inner = LocalFileSystem::new_with_prefix(&root)
            .map_err(|e| BackendError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(inner),
            buckets: Buckets::Local(root),
        })
    }

    /// Parse `raw` as a location, refusing anything `Path` would rewrite.
    fn exact_path(raw: &str) -> Option<Path> {
        Path::parse(raw).ok().filter(|path| path.as_ref() == raw)
    }

    fn location(bucket: &str, key: &str) -> std::result::Result<Path, StoreError> {
        Self::exact_path(&format!("{}/{}", bucket, key))
            .ok_or_else(|| StoreError::InvalidName(key.to_string()))
    }

    /// Strip `bucket/` from an underlying location.
    fn relative<'a>(bucket: &str, location: &'a str) -> Option<&'a str> {
        location
            .strip_prefix(bucket)
            .and_then(|rest| rest.strip_prefix(DELIMITER))
    }

    fn bucket_path(name: &str) -> std::result::Result<Path, StoreError> {
        if name.is_empty() || name.contains(DELIMITER) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Self::exact_path(name).ok_or_else(|| StoreError::InvalidName(name.to_string()))
    }

    async fn ensure_bucket(&self, bucket: &str) -> std::result::Result<(), StoreError> {
        Self::bucket_path(bucket)?;
        let exists = match &self.buckets {
            Buckets::Memory(registry) => {
                let registry = registry.read();
                registry.contains_key(bucket)
            }
            Buckets::Local(root) => match tokio::fs::metadata(root.join(bucket)).await {
                Ok(meta) => meta.is_dir(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                Err(e) => return Err(io_error(bucket, e)),
            },
        };
        if exists {
            Ok(())
        } else {
            Err(StoreError::NotFound(bucket.to_string()))
        }
    }

    async fn is_bucket_empty(&self, bucket: &str) -> std::result::Result<bool, StoreError> {
        let prefix = Self::bucket_path(bucket)?;
        let first = self
            .inner
            .list(Some(&prefix))
            .try_next()
            .await
            .map_err(store_error)?;
        Ok(first.is_none())
    }

    fn object_entry(bucket: &str, meta: ObjectMeta) -> Option<StoreEntry> {
        let key = Self::relative(bucket, meta.location.as_ref())?.to_string();
        Some(StoreEntry {
            content_type: guess_content_type(&key),
            key,
            is_common_prefix: false,
            size: Some(meta.size as u64),
            last_modified: Some(meta.last_modified),
            etag: meta.e_tag,
        })
    }

    /// Lazy recursive walk below `full`, no grouping.
    fn walk<'a>(
        &'a self,
        request: ListObjectsRequest,
        dir: Path,
        full: String,
    ) -> impl Stream<Item = std::result::Result<StoreEntry, StoreError>> + Send + 'a {
        try_stream! {
            let mut listing = self.inner.list(Some(&dir));
            let mut taken = 0;
            while taken < request.max_keys {
                let Some(meta) = listing.next().await else {
                    break;
                };
                let meta = meta.map_err(store_error)?;
                if !meta.location.as_ref().starts_with(full.as_str()) {
                    continue;
                }
                if let Some(entry) = Self::object_entry(&request.bucket, meta) {
                    taken += 1;
                    yield entry;
                }
            }
        }
    }

    /// One level below `full`, grouped at the delimiter, in key order.
    fn level<'a>(
        &'a self,
        request: ListObjectsRequest,
        dir: Path,
        full: String,
    ) -> impl Stream<Item = std::result::Result<StoreEntry, StoreError>> + Send + 'a {
        try_stream! {
            let listing = self
                .inner
                .list_with_delimiter(Some(&dir))
                .await
                .map_err(store_error)?;

            let mut entries = Vec::new();
            for prefix in listing.common_prefixes {
                let location = format!("{}{}", prefix.as_ref(), DELIMITER);
                if !location.starts_with(full.as_str()) {
                    continue;
                }
                if let Some(key) = Self::relative(&request.bucket, &location) {
                    entries.push(StoreEntry::common_prefix(key));
                }
            }
            for meta in listing.objects {
                if !meta.location.as_ref().starts_with(full.as_str()) {
                    continue;
                }
                if let Some(entry) = Self::object_entry(&request.bucket, meta) {
                    entries.push(entry);
                }
            }
            entries.sort_by(|a, b| a.key.cmp(&b.key));

            for entry in entries.into_iter().take(request.max_keys) {
                yield entry;
            }
        }
    }

    fn listing<'a>(
        &'a self,
        request: ListObjectsRequest,
    ) -> impl Stream<Item = std::result::Result<StoreEntry, StoreError>> + Send + 'a {
        try_stream! {
            self.ensure_bucket(&request.bucket).await?;

            // The underlying store lists whole path segments, so start from the
            // directory part of the prefix and match the rest textually.
            let full = format!("{}/{}", request.bucket, request.prefix);
            let dir = full
                .rsplit_once(DELIMITER)
                .map_or(full.as_str(), |(dir, _)| dir);
            // No storable key lives below a directory `Path` cannot hold.
            let dir = Self::exact_path(dir);
            debug!(bucket = %request.bucket, prefix = %request.prefix, "listing objects");

            if request.delimiter != DELIMITER && !request.delimiter.is_empty() {
                Err::<(), _>(StoreError::unavailable(format!(
                    "unsupported delimiter: {:?}",
                    request.delimiter
                )))?;
            } else if let Some(dir) = dir {
                if request.delimiter.is_empty() {
                    let mut entries = Box::pin(self.walk(request, dir, full));
                    while let Some(entry) = entries.next().await {
                        yield entry?;
                    }
                } else {
                    let mut entries = Box::pin(self.level(request, dir, full));
                    while let Some(entry) = entries.next().await {
                        yield entry?;
                    }
                }
            }
        }
    }

    fn attributes(&self, metadata: ObjectMetadata) -> Attributes {
        let mut attributes = Attributes::new();
        // The local filesystem cannot keep attributes.
        if matches!(self.buckets, Buckets::Local(_)) {
            return attributes;
        }
        let pairs = [
            (Attribute::ContentType, metadata.content_type),
            (Attribute::ContentEncoding, metadata.content_encoding),
            (Attribute::ContentDisposition, metadata.content_disposition),
            (Attribute::ContentLanguage, metadata.content_language),
        ];
        for (attribute, value) in pairs {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                attributes.insert(attribute, AttributeValue::from(value));
            }
        }
        attributes
    }

    fn info(key: &str, result: &GetResult) -> ObjectInfo {
        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|v| {
                let s: &str = v.as_ref();
                s.to_string()
            })
            .or_else(|| guess_content_type(key))
            .unwrap_or_else(|| mime_guess::mime::APPLICATION_OCTET_STREAM.to_string());
        ObjectInfo {
            key: key.to_string(),
            size: result.meta.size as u64,
            content_type,
            last_modified: Some(result.meta.last_modified),
            etag: result.meta.e_tag.clone(),
        }
    }

    /// Remove every empty directory below `bucket_dir`, deepest first.
    async fn remove_empty_dirs(bucket_dir: &FsPath) -> std::io::Result<()> {
        let mut pending = vec![bucket_dir.to_path_buf()];
        let mut found = Vec::new();
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_dir() {
                    pending.push(entry.path());
                    found.push(entry.path());
                }
            }
        }
        for dir in found.iter().rev() {
            // Fails harmlessly on anything that is not empty.
            let _ = tokio::fs::remove_dir(dir).await;
        }
        Ok(())
    }

    /// Remove a bucket directory without touching its contents. Anything that
    /// landed after the emptiness check keeps the directory, and the bucket.
    async fn remove_bucket_dir(root: &FsPath, name: &str) -> std::result::Result<(), StoreError> {
        let bucket_dir = root.join(name);
        Self::remove_empty_dirs(&bucket_dir)
            .await
            .map_err(|e| io_error(name, e))?;
        match tokio::fs::remove_dir(&bucket_dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(io_error(name, e)),
            Err(e) => {
                debug!(bucket = name, error = %e, "bucket directory kept");
                Err(StoreError::with_source(
                    format!("bucket {} is not empty", name),
                    e,
                ))
            }
        }
    }

    /// Remove directories left empty by a delete, up to the bucket directory.
    async fn prune_empty_dirs(root: &FsPath, bucket: &str, key: &str) {
        let bucket_dir = root.join(bucket);
        let mut dir = bucket_dir.join(key);
        while dir.pop() && dir.starts_with(&bucket_dir) && dir != bucket_dir {
            if tokio::fs::remove_dir(&dir).await.is_err() {
                break;
            }
        }
    }
}

fn guess_content_type(key: &str) -> Option<String> {
    mime_guess::from_path(key).first().map(|m| m.to_string())
}

#[async_trait]
impl Store for NamespacedStore {
    async fn list_buckets(&self) -> std::result::Result<Vec<BucketInfo>, StoreError> {
        match &self.buckets {
            Buckets::Memory(registry) => {
                let registry = registry.read();
                Ok(registry
                    .iter()
                    .map(|(name, created_at)| BucketInfo {
                        name: name.clone(),
                        created_at: Some(*created_at),
                    })
                    .collect())
            }
            Buckets::Local(root) => {
                let mut dir = tokio::fs::read_dir(root)
                    .await
                    .map_err(|e| io_error("list buckets", e))?;
                let mut buckets = Vec::new();
                while let Some(entry) = dir
                    .next_entry()
                    .await
                    .map_err(|e| io_error("list buckets", e))?
                {
                    let meta = entry
                        .metadata()
                        .await
                        .map_err(|e| io_error("list buckets", e))?;
                    if !meta.is_dir() {
                        continue;
                    }
                    let created_at = meta
                        .created()
                        .or_else(|_| meta.modified())
                        .ok()
                        .map(DateTime::<Utc>::from);
                    buckets.push(BucketInfo {
                        name: entry.file_name().to_string_lossy().into_owned(),
                        created_at,
                    });
                }
                buckets.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(buckets)
            }
        }
    }

    fn list_objects(&self, request: ListObjectsRequest) -> EntryStream<'_> {
        self.listing(request).boxed()
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> std::result::Result<ObjectInfo, StoreError> {
        self.ensure_bucket(bucket).await?;
        let location = Self::location(bucket, key)?;
        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        let result = self
            .inner
            .get_opts(&location, options)
            .await
            .map_err(store_error)?;
        Ok(Self::info(key, &result))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> std::result::Result<ObjectStream, StoreError> {
        self.ensure_bucket(bucket).await?;
        let location = Self::location(bucket, key)?;
        let result = self
            .inner
            .get(&location)
            .await
            .map_err(store_error)?;
        let info = Self::info(key, &result);
        let body = result.into_stream().map_err(store_error).boxed();
        Ok(ObjectStream { info, body })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        size: u64,
        metadata: ObjectMetadata,
    ) -> std::result::Result<(), StoreError> {
        self.ensure_bucket(bucket).await?;
        let location = Self::location(bucket, key)?;

        let options = PutMultipartOpts {
            attributes: self.attributes(metadata),
            ..Default::default()
        };
        let upload = self
            .inner
            .put_multipart_opts(&location, options)
            .await
            .map_err(store_error)?;

        // Nothing is visible under the key until `finish`, so a failed body
        // leaves any previous object in place.
        let mut writer = WriteMultipart::new(upload);
        let mut body = exact_size(body, size);
        while let Some(chunk) = body.next().await {
            let written = match chunk {
                Ok(chunk) => match writer.wait_for_capacity(UPLOAD_CONCURRENCY).await {
                    Ok(()) => {
                        writer.put(chunk);
                        Ok(())
                    }
                    Err(e) => Err(store_error(e)),
                },
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                if let Err(abort) = writer.abort().await {
                    debug!(bucket, key, error = %abort, "aborting upload failed");
                }
                return Err(e);
            }
        }
        writer.finish().await.map_err(store_error)?;

        debug!(bucket, key, size, "object stored");
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> std::result::Result<(), StoreError> {
        self.ensure_bucket(bucket).await?;
        let location = Self::location(bucket, key)?;
        self.inner
            .delete(&location)
            .await
            .map_err(store_error)?;
        if let Buckets::Local(root) = &self.buckets {
            Self::prune_empty_dirs(root, bucket, key).await;
        }
        Ok(())
    }

    async fn create_bucket(&self, name: &str) -> std::result::Result<(), StoreError> {
        Self::bucket_path(name)?;
        match &self.buckets {
            Buckets::Memory(registry) => {
                let mut registry = registry.write();
                if registry.contains_key(name) {
                    return Err(StoreError::unavailable(format!(
                        "bucket {} already exists",
                        name
                    )));
                }
                registry.insert(name.to_string(), Utc::now());
            }
            Buckets::Local(root) => match tokio::fs::create_dir(root.join(name)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    return Err(StoreError::unavailable(format!(
                        "bucket {} already exists",
                        name
                    )));
                }
                Err(e) => return Err(io_error(name, e)),
            },
        }
        info!(bucket = name, "bucket created");
        Ok(())
    }

    async fn delete_bucket(&self, name: &str) -> std::result::Result<(), StoreError> {
        self.ensure_bucket(name).await?;
        if !self.is_bucket_empty(name).await? {
            return Err(StoreError::unavailable(format!(
                "bucket {} is not empty",
                name
            )));
        }
        match &self.buckets {
            Buckets::Memory(registry) => {
                registry.write().remove(name);
            }
            Buckets::Local(root) => Self::remove_bucket_dir(root, name).await?,
        }
        info!(bucket = name, "bucket deleted");
        Ok(())
    }
}
